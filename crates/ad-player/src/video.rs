//! Linear video ad playback.
//!
//! Plays the creative either by switching the primary surface's source or, in
//! sibling mode, on a secondary surface layered over the paused primary. Once
//! the ad surface is ready the display binds tracking, the countdown notice
//! and the skip control; the ad ending, a skip, a failed switch or a vanished
//! surface all end the slot.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::context::{PlayerContext, SlotCompletion};
use crate::error::Result;
use crate::events::{PageEvent, PlayerEvent, Propagation, Subscription, SurfaceEvent};
use crate::host::{ElementKind, HostPlayer, PageElement, PageInterface, PlaybackSurface};
use crate::model::{AdCreative, SkipControl, SlotNotice, StyleMap, TrackingEvent, VideoFile};
use crate::task::{FirstTick, ScheduledTask};
use crate::tracking::TrackingEventDispatcher;

type SharedSubscription = Arc<Mutex<Option<Subscription>>>;

/// Base styling shared by the notice and the skip control.
fn helper_style() -> StyleMap {
    [
        ("position", "absolute"),
        ("color", "#FFF"),
        ("font-weight", "bold"),
        ("text-shadow", "1px 1px 1px #000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Render the countdown notice.
///
/// The first `$1` becomes the remaining whole seconds, or `...` while the
/// duration is unknown. Overruns show `0`.
pub fn render_notice(template: &str, duration: f64, position: f64) -> String {
    let remaining = (duration - position).round();
    let value = if remaining.is_finite() {
        // Also folds `-0.0`.
        let remaining = if remaining > 0.0 { remaining } else { 0.0 };
        format!("{remaining:.0}")
    } else {
        "...".to_string()
    };
    template.replacen("$1", &value, 1)
}

/// Integer prefix of a CSS length (`"12px"` -> 12).
fn parse_css_int(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let end = value
        .char_indices()
        .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    value[..end].parse().ok()
}

/// Click-through binding on the player surface.
#[derive(Clone, Default)]
struct ClickThrough {
    binding: SharedSubscription,
}

impl ClickThrough {
    /// First click opens `url` and suppresses the default action; later clicks
    /// pass through. Every click forces the control bar on screen until the
    /// next play.
    fn bind(&self, player: &Arc<dyn HostPlayer>, page: &Arc<dyn PageInterface>, url: String) {
        let weak_player = Arc::downgrade(player);
        let page = Arc::downgrade(page);
        let clicked = AtomicBool::new(false);
        let restore: SharedSubscription = Arc::default();

        let subscription = player.events().subscribe(move |event| {
            if *event != PlayerEvent::Click {
                return Propagation::Continue;
            }
            let Some(player) = weak_player.upgrade() else {
                return Propagation::Continue;
            };
            player.show_control_bar(true);
            arm_restore_hover(&player, &restore);

            if clicked.swap(true, Ordering::SeqCst) {
                return Propagation::Continue;
            }
            info!(url = %url, "Opening ad click-through");
            if let Some(page) = page.upgrade() {
                page.open_window(&url);
            }
            Propagation::Stop
        });
        *self.binding.lock() = Some(subscription);
    }

    fn unbind(&self) {
        let binding = self.binding.lock().take();
        drop(binding);
    }
}

/// Restore the control bar hover behaviour on the next `Play`, once.
fn arm_restore_hover(player: &Arc<dyn HostPlayer>, holder: &SharedSubscription) {
    let mut armed = holder.lock();
    if armed.is_some() {
        return;
    }
    let weak_player = Arc::downgrade(player);
    let one_shot = Arc::clone(holder);
    *armed = Some(player.events().listen(move |event| {
        if *event != PlayerEvent::Play {
            return;
        }
        let Some(subscription) = one_shot.lock().take() else {
            return;
        };
        drop(subscription);
        if let Some(player) = weak_player.upgrade() {
            player.restore_controls_hover();
        }
    }));
}

struct VideoDisplay {
    completion: SlotCompletion,
    click: ClickThrough,
    tracking_events: Vec<TrackingEvent>,
}

pub(crate) fn display_video(completion: &SlotCompletion, creative: &AdCreative) {
    let ctx = completion.ctx().clone();
    let Some(source) = ctx.player.compatible_source(&creative.video_files) else {
        warn!(
            files = creative.video_files.len(),
            "No ad video source compatible with the player, skipping"
        );
        completion.complete();
        return;
    };

    let click = ClickThrough::default();
    if let Some(url) = creative.click_through.clone() {
        click.bind(&ctx.player, &ctx.page, url);
    }
    {
        let click = click.clone();
        completion.on_done(move || click.unbind());
    }

    let display = VideoDisplay {
        completion: completion.clone(),
        click,
        tracking_events: creative.tracking_events.clone(),
    };
    let sibling = ctx.config.enable_video_sibling;
    debug!(url = %source.url, format = %source.format, sibling, "Starting ad video");

    let task = ScheduledTask::spawn(move |token| async move {
        let loaded = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            loaded = display.load(&source, sibling) => loaded,
        };
        match loaded {
            Ok(surface) => display.on_ready(surface),
            Err(e) => {
                warn!(error = %e, "Ad video failed to load");
                display.click.unbind();
                display.completion.complete();
            }
        }
    });
    completion.attach_task(task);
}

impl VideoDisplay {
    async fn load(&self, source: &VideoFile, sibling: bool) -> Result<Arc<dyn PlaybackSurface>> {
        let player = &self.completion.ctx().player;
        if !sibling {
            return player.switch_source(source).await;
        }

        player.hide_spinner();
        // Let a pending pause on the primary surface propagate first.
        tokio::task::yield_now().await;

        if let Some(primary) = player.playback_surface() {
            primary.pause();
            primary.set_visible(false);
        }
        player.enter_ad_mode();

        let surface = player.sibling_surface()?;
        surface.load(&source.url);
        surface.play();
        Ok(surface)
    }

    fn on_ready(&self, surface: Arc<dyn PlaybackSurface>) {
        if !self.completion.is_active() {
            debug!("Slot ended before the ad surface was ready");
            return;
        }
        let ctx = self.completion.ctx();
        info!(surface = surface.id(), "Ad source ready, binding tracking");

        // Tracking binds first so `complete` goes out before the slot ends.
        let dispatcher = Arc::new(TrackingEventDispatcher::new(
            self.tracking_events.clone(),
            Arc::clone(&ctx.beacons),
        ));
        let on_detached = {
            let done = self.completion.clone();
            move || done.complete()
        };
        let (sampler, listener) = dispatcher
            .bind(&surface, ctx.config.monitor_rate(), on_detached)
            .into_parts();
        self.completion.attach_task(sampler);
        self.completion.attach_subscription(listener);

        let ended = {
            let done = self.completion.clone();
            let click = self.click.clone();
            surface.events().listen(move |event| {
                if *event == SurfaceEvent::Ended {
                    debug!("Ad video ended");
                    click.unbind();
                    done.complete();
                }
            })
        };
        self.completion.attach_subscription(ended);

        let slot = self.completion.slot();
        if let Some(notice) = &slot.notice {
            let refresh = show_notice(ctx, notice, &surface);
            self.completion.attach_task(refresh);
        }
        if let Some(skip) = &slot.skip_control {
            let subscription = self.show_skip(ctx, skip);
            self.completion.attach_subscription(subscription);
        }
    }

    fn show_skip(&self, ctx: &PlayerContext, skip: &SkipControl) -> Subscription {
        let skip_id = ctx.skip_id();
        let mut element = PageElement::new(&skip_id, ElementKind::SkipButton)
            .with_text(&skip.text)
            .with_style(&helper_style())
            .with_style_entry("cursor", "pointer")
            .with_style(&skip.css);

        // Lift the control above the control bar.
        if let Some(bottom) = element.style.get("bottom").and_then(|b| parse_css_int(b)) {
            let lifted = bottom as f64 + ctx.player.control_bar().height;
            element.style.insert("bottom".to_string(), format!("{lifted}px"));
        }
        ctx.page.insert_element(element);

        let done = self.completion.clone();
        let click = self.click.clone();
        ctx.page.events().listen(move |event| {
            let PageEvent::Click { element_id } = event;
            if *element_id == skip_id {
                info!("Ad skipped by user");
                click.unbind();
                done.complete();
            }
        })
    }
}

/// Insert the countdown notice and keep it current until it is removed.
fn show_notice(
    ctx: &PlayerContext,
    notice: &SlotNotice,
    surface: &Arc<dyn PlaybackSurface>,
) -> ScheduledTask {
    let notice_id = ctx.notice_id();
    ctx.page.insert_element(
        PageElement::new(&notice_id, ElementKind::Notice)
            .with_style(&helper_style())
            .with_style_entry("font-size", "90%")
            .with_style(&notice.css),
    );

    let page = Arc::downgrade(&ctx.page);
    let surface = Arc::downgrade(surface);
    let template = notice.text.clone();
    ScheduledTask::poll(ctx.config.monitor_rate(), FirstTick::Immediately, move || {
        let (Some(page), Some(surface)) = (page.upgrade(), surface.upgrade()) else {
            return ControlFlow::Break(());
        };
        let text = render_notice(&template, surface.duration(), surface.current_time());
        if page.set_text(&notice_id, &text) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    })
}
