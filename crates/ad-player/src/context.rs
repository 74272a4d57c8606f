//! Shared collaborator context and the single slot completion path.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::beacon::BeaconSender;
use crate::config::AdPlayerConfig;
use crate::events::Subscription;
use crate::host::{HostPlayer, PageInterface};
use crate::selection::RandomSource;
use crate::slot::{AdSlot, CycleId};
use crate::task::ScheduledTask;

/// Collaborators injected into every display subsystem.
pub(crate) struct PlayerContext {
    pub(crate) player: Arc<dyn HostPlayer>,
    pub(crate) page: Arc<dyn PageInterface>,
    pub(crate) beacons: Arc<dyn BeaconSender>,
    pub(crate) random: Arc<dyn RandomSource>,
    pub(crate) config: AdPlayerConfig,
}

impl PlayerContext {
    /// Page element id scoped to this player instance.
    pub(crate) fn element_id(&self, suffix: &str) -> String {
        format!("{}_{}", self.player.id(), suffix)
    }

    pub(crate) fn notice_id(&self) -> String {
        self.element_id("ad_notice")
    }

    pub(crate) fn skip_id(&self) -> String {
        self.element_id("ad_skipBtn")
    }

    pub(crate) fn overlay_id(&self) -> String {
        self.element_id("overlay")
    }

    /// Remove the ad sibling and show the primary surface again.
    pub(crate) fn restore_player(&self) {
        self.player.remove_sibling_surface();
        if let Some(primary) = self.player.playback_surface() {
            primary.set_visible(true);
        }
    }
}

/// Completion handle for one display cycle.
///
/// Every subsystem that can decide the display is over holds a clone. The first
/// [`complete`](Self::complete) runs cleanup; later calls are no-ops.
///
/// The runtime current at creation is kept so completion can be triggered by
/// host events raised on threads outside it.
#[derive(Clone)]
pub(crate) struct SlotCompletion {
    slot: Arc<AdSlot>,
    cycle: CycleId,
    ctx: Arc<PlayerContext>,
    runtime: Option<Handle>,
}

impl SlotCompletion {
    pub(crate) fn new(slot: Arc<AdSlot>, cycle: CycleId, ctx: Arc<PlayerContext>) -> Self {
        Self {
            slot,
            cycle,
            ctx,
            runtime: Handle::try_current().ok(),
        }
    }

    pub(crate) fn slot(&self) -> &AdSlot {
        &self.slot
    }

    pub(crate) fn ctx(&self) -> &Arc<PlayerContext> {
        &self.ctx
    }

    pub(crate) fn is_active(&self) -> bool {
        self.slot.is_cycle_active(self.cycle)
    }

    pub(crate) fn on_done(&self, done: impl FnOnce() + Send + 'static) {
        self.slot.push_done_function(self.cycle, Box::new(done));
    }

    pub(crate) fn attach_task(&self, task: ScheduledTask) {
        self.slot.attach_task(self.cycle, task);
    }

    pub(crate) fn attach_subscription(&self, subscription: Subscription) {
        self.slot.attach_subscription(self.cycle, subscription);
    }

    /// End the display cycle.
    ///
    /// Order: cancel timers and bindings, restore the player, remove notice
    /// and skip elements, drain done functions in registration order, clear
    /// `currently_displayed`, then fire the done callbacks after the grace delay.
    pub(crate) fn complete(&self) {
        let Some(mut cycle) = self.slot.take_cycle(self.cycle) else {
            debug!(cycle = %self.cycle, "Slot already completed, ignoring");
            return;
        };
        info!(
            cycle = %self.cycle,
            slot_type = %self.slot.slot_type,
            "Ad slot playback done"
        );

        cycle.release_bindings();
        self.ctx.restore_player();
        self.ctx.page.remove_element(&self.ctx.notice_id());
        self.ctx.page.remove_element(&self.ctx.skip_id());

        for done in cycle.done_functions.drain(..) {
            done();
        }
        self.slot.mark_idle();

        let callbacks = std::mem::take(&mut cycle.done_callbacks);
        let delay = self.ctx.config.done_grace_delay();
        let cycle_id = self.cycle;
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!(cycle = %cycle_id, "No runtime for the grace delay, invoking done callbacks now");
            for callback in callbacks {
                callback();
            }
            return;
        };
        runtime.spawn(async move {
            // Let end-of-playback listeners elsewhere finish first.
            tokio::time::sleep(delay).await;
            debug!(cycle = %cycle_id, callbacks = callbacks.len(), "Invoking done callbacks");
            for callback in callbacks {
                callback();
            }
        });
    }
}
