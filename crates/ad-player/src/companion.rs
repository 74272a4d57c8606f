//! Companion banner rendering.

use std::collections::HashSet;

use serde_json::json;
use tracing::debug;

use crate::host::{HostPlayer, PageInterface};
use crate::model::{Companion, CompanionTarget, SlotType};

/// Cross-boundary event carrying a companion fill for embedding pages.
pub const UPDATE_COMPANION_EVENT: &str = "AdSupport_UpdateCompanion";

/// Render companions into size-matching targets.
///
/// Each target is filled at most once; companions without an exactly sized
/// free target are skipped. Returns the ids of filled targets in fill order.
pub(crate) fn display_companions(
    player: &dyn HostPlayer,
    page: &dyn PageInterface,
    companions: &[Companion],
    targets: &[CompanionTarget],
    slot_type: SlotType,
) -> Vec<String> {
    let mut filled: HashSet<&str> = HashSet::new();
    let mut order = Vec::new();

    for companion in companions {
        for target in targets {
            if filled.contains(target.element_id.as_str()) || !target.fits(companion) {
                continue;
            }
            if page.has_element(&target.element_id) {
                page.set_html(&target.element_id, &companion.markup);
            }
            player.notify_external(
                UPDATE_COMPANION_EVENT,
                json!({
                    "elementid": target.element_id,
                    "html": companion.markup,
                }),
            );
            debug!(
                target = %target.element_id,
                width = companion.width,
                height = companion.height,
                slot_type = %slot_type,
                "Filled companion target"
            );
            filled.insert(target.element_id.as_str());
            order.push(target.element_id.clone());
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessPage, HeadlessPlayer};

    fn companion(width: u32, height: u32, markup: &str) -> Companion {
        Companion {
            width,
            height,
            markup: markup.to_string(),
        }
    }

    #[test]
    fn test_only_matching_target_is_filled() {
        let player = HeadlessPlayer::new("p", 60.0, 10.0);
        let page = HeadlessPage::new();
        page.add_container("side");

        let filled = display_companions(
            &player,
            &page,
            &[companion(300, 250, "<a>box</a>"), companion(728, 90, "<a>leader</a>")],
            &[CompanionTarget::new("side", 300, 250)],
            SlotType::Linear,
        );

        assert_eq!(filled, vec!["side"]);
        assert_eq!(page.html("side").as_deref(), Some("<a>box</a>"));
        let notifications = player.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].0, UPDATE_COMPANION_EVENT);
        assert_eq!(notifications[0].1["elementid"], "side");
        assert_eq!(notifications[0].1["html"], "<a>box</a>");
    }

    #[test]
    fn test_target_is_not_filled_twice() {
        let player = HeadlessPlayer::new("p", 60.0, 10.0);
        let page = HeadlessPage::new();
        page.add_container("side");

        let filled = display_companions(
            &player,
            &page,
            &[companion(300, 250, "first"), companion(300, 250, "second")],
            &[CompanionTarget::new("side", 300, 250)],
            SlotType::Linear,
        );

        assert_eq!(filled.len(), 1);
        assert_eq!(page.html("side").as_deref(), Some("first"));
    }

    #[test]
    fn test_remote_target_still_notified() {
        let player = HeadlessPlayer::new("p", 60.0, 10.0);
        let page = HeadlessPage::new();

        let filled = display_companions(
            &player,
            &page,
            &[companion(160, 600, "sky")],
            &[CompanionTarget::new("remote", 160, 600)],
            SlotType::Overlay,
        );

        assert_eq!(filled, vec!["remote"]);
        assert!(page.element("remote").is_none());
        assert_eq!(player.notifications().len(), 1);
    }

    #[test]
    fn test_one_companion_fills_every_matching_target() {
        let player = HeadlessPlayer::new("p", 60.0, 10.0);
        let page = HeadlessPage::new();

        let filled = display_companions(
            &player,
            &page,
            &[companion(300, 250, "box")],
            &[
                CompanionTarget::new("a", 300, 250),
                CompanionTarget::new("b", 300, 250),
            ],
            SlotType::Linear,
        );
        assert_eq!(filled, vec!["a", "b"]);
    }

    proptest::proptest! {
        #[test]
        fn prop_fills_never_exceed_targets(
            companion_sizes in proptest::collection::vec((0u32..3, 0u32..3), 0..12),
            target_sizes in proptest::collection::vec((0u32..3, 0u32..3), 0..6),
        ) {
            let player = HeadlessPlayer::new("p", 60.0, 10.0);
            let page = HeadlessPage::new();
            let companions: Vec<_> = companion_sizes
                .iter()
                .map(|&(w, h)| companion(w, h, "c"))
                .collect();
            let targets: Vec<_> = target_sizes
                .iter()
                .enumerate()
                .map(|(i, &(w, h))| CompanionTarget::new(format!("t{i}"), w, h))
                .collect();

            let filled = display_companions(&player, &page, &companions, &targets, SlotType::Linear);

            proptest::prop_assert!(filled.len() <= targets.len());
            let unique: HashSet<&String> = filled.iter().collect();
            proptest::prop_assert_eq!(unique.len(), filled.len());
            proptest::prop_assert_eq!(player.notifications().len(), filled.len());
        }
    }
}
