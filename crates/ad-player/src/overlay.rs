//! Non-linear overlay display.
//!
//! The overlay container lives inside the player interface and is reused
//! across displays of the same player. It sits centered above the control
//! bar and follows the bar as it shows and hides.

use std::sync::Arc;

use tracing::debug;

use crate::context::SlotCompletion;
use crate::events::{PageEvent, PlayerEvent};
use crate::host::{ControlBarState, ElementKind, OverlayLayout, PageElement, Transition};
use crate::model::NonLinearCreative;
use crate::selection::select_from;

/// Place a `width` x `height` overlay given the control bar state.
pub fn overlay_layout(width: f64, height: f64, bar: ControlBarState, margin: f64) -> OverlayLayout {
    let bottom = if bar.visible {
        bar.height + margin
    } else {
        margin
    };
    OverlayLayout {
        width,
        height,
        left_percent: 50.0,
        margin_left: -width / 2.0,
        bottom,
    }
}

pub(crate) fn display_overlay(completion: &SlotCompletion, variants: &[NonLinearCreative]) {
    let ctx = completion.ctx();
    let Some(variant) = select_from(ctx.random.as_ref(), variants) else {
        return;
    };
    let overlay_id = ctx.overlay_id();
    let close_id = ctx.element_id("overlay_close");
    let width = f64::from(variant.width);
    let height = f64::from(variant.height);
    let margin = ctx.config.overlay_margin_px;

    if !ctx.page.has_element(&overlay_id) {
        debug!(id = %overlay_id, "Creating overlay container");
        ctx.page.insert_element(
            PageElement::new(&overlay_id, ElementKind::Overlay)
                .with_style(&variant.css)
                .with_style_entry("position", "absolute")
                .with_style_entry("z-index", "1"),
        );
    }

    let layout = overlay_layout(width, height, ctx.player.control_bar(), margin);
    ctx.page.apply_layout(&overlay_id, &layout, Transition::Immediate);
    ctx.page.fade_in(&overlay_id);
    ctx.page.set_html(&overlay_id, &variant.markup);
    ctx.page.insert_element(
        PageElement::new(&close_id, ElementKind::CloseButton)
            .with_parent(&overlay_id)
            .with_text("x")
            .with_style_entry("top", "0")
            .with_style_entry("right", "0")
            .with_style_entry("position", "absolute")
            .with_style_entry("cursor", "pointer"),
    );

    let close = {
        let page = Arc::downgrade(&ctx.page);
        let overlay_id = overlay_id.clone();
        ctx.page.events().listen(move |event| {
            let PageEvent::Click { element_id } = event;
            if *element_id != close_id {
                return;
            }
            if let Some(page) = page.upgrade() {
                debug!("Overlay dismissed by user");
                page.fade_out(&overlay_id);
            }
        })
    };
    completion.attach_subscription(close);

    let follow_bar = {
        let page = Arc::downgrade(&ctx.page);
        let overlay_id = overlay_id.clone();
        ctx.player.events().listen(move |event| {
            let bar = match event {
                PlayerEvent::ControlBarShown { height } => ControlBarState {
                    visible: true,
                    height: *height,
                },
                PlayerEvent::ControlBarHidden => ControlBarState::default(),
                _ => return,
            };
            let Some(page) = page.upgrade() else {
                return;
            };
            if page.has_element(&overlay_id) {
                let layout = overlay_layout(width, height, bar, margin);
                page.apply_layout(&overlay_id, &layout, Transition::Animated);
            }
        })
    };
    completion.attach_subscription(follow_bar);

    let page = Arc::clone(&ctx.page);
    completion.on_done(move || page.fade_out(&overlay_id));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_above_visible_control_bar() {
        let bar = ControlBarState {
            visible: true,
            height: 36.0,
        };
        let layout = overlay_layout(468.0, 60.0, bar, 10.0);
        assert_eq!(layout.left_percent, 50.0);
        assert_eq!(layout.margin_left, -234.0);
        assert_eq!(layout.bottom, 46.0);
    }

    #[test]
    fn test_layout_near_bottom_without_control_bar() {
        let bar = ControlBarState {
            visible: false,
            height: 36.0,
        };
        let layout = overlay_layout(300.0, 50.0, bar, 10.0);
        assert_eq!(layout.bottom, 10.0);
        assert_eq!(layout.width, 300.0);
        assert_eq!(layout.height, 50.0);
    }
}
