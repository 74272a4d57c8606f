//! Ad slot orchestration.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::beacon::BeaconSender;
use crate::companion::display_companions;
use crate::config::AdPlayerConfig;
use crate::context::{PlayerContext, SlotCompletion};
use crate::duration::monitor_display_duration;
use crate::host::{HostPlayer, PageInterface};
use crate::model::{AdCreative, SlotType};
use crate::overlay::display_overlay;
use crate::selection::{RandomSource, ThreadRandom, select_from};
use crate::slot::{AdSlot, DoneCallback, SlotEntry};
use crate::video::display_video;

/// Displays ad slots on one host player.
///
/// Collaborators are injected once; each [`display`](Self::display) call
/// selects a creative, dispatches it to the display subsystems and funnels
/// every way the display can end into a single idempotent completion.
///
/// Must be used from within a Tokio runtime: timers, source switching and the
/// done-callback grace delay run as spawned tasks.
#[derive(Clone)]
pub struct AdPlayer {
    ctx: Arc<PlayerContext>,
}

impl std::fmt::Debug for AdPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdPlayer")
            .field("player", &self.ctx.player.id())
            .field("config", &self.ctx.config)
            .finish()
    }
}

impl AdPlayer {
    pub fn new(
        player: Arc<dyn HostPlayer>,
        page: Arc<dyn PageInterface>,
        beacons: Arc<dyn BeaconSender>,
        config: AdPlayerConfig,
    ) -> Self {
        Self::with_random_source(player, page, beacons, config, Arc::new(ThreadRandom))
    }

    /// Like [`new`](Self::new) with an explicit source for creative selection.
    pub fn with_random_source(
        player: Arc<dyn HostPlayer>,
        page: Arc<dyn PageInterface>,
        beacons: Arc<dyn BeaconSender>,
        config: AdPlayerConfig,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            ctx: Arc::new(PlayerContext {
                player,
                page,
                beacons,
                random,
                config,
            }),
        }
    }

    pub fn config(&self) -> &AdPlayerConfig {
        &self.ctx.config
    }

    /// Display `slot` and call `done` once it is over.
    ///
    /// Re-invoking on a slot that is still displayed ends the running display;
    /// both callbacks fire. When there is nothing to show (no creatives, or a
    /// creative without video and no `display_duration`) `done` runs before
    /// this returns and the player is left untouched.
    pub fn display<F>(&self, slot: &Arc<AdSlot>, done: F, display_duration: Option<Duration>)
    where
        F: FnOnce() + Send + 'static,
    {
        info!(
            slot_type = %slot.slot_type,
            ads = slot.ads.len(),
            "Displaying ad slot"
        );

        // A zero duration means "no duration".
        let display_duration = display_duration.filter(|d| !d.is_zero());

        let done = match slot.enter(Box::new(done)) {
            SlotEntry::Busy(cycle) => {
                debug!(cycle = %cycle, "Slot already displayed, completing it");
                SlotCompletion::new(Arc::clone(slot), cycle, Arc::clone(&self.ctx)).complete();
                return;
            }
            SlotEntry::Idle(done) => done,
        };

        let Some(creative) = select_from(self.ctx.random.as_ref(), &slot.ads) else {
            debug!("Slot has no ads");
            done();
            return;
        };
        if display_duration.is_none() && !creative.has_video() {
            debug!("Creative has no video and no display duration");
            done();
            return;
        }

        let cycle = slot.begin_cycle(done);
        let completion = SlotCompletion::new(Arc::clone(slot), cycle, Arc::clone(&self.ctx));
        self.dispatch(&completion, creative, display_duration);
    }

    fn dispatch(
        &self,
        completion: &SlotCompletion,
        creative: &AdCreative,
        display_duration: Option<Duration>,
    ) {
        let slot = completion.slot();

        if let Some(duration) = display_duration {
            monitor_display_duration(completion, duration);
        }
        if creative.has_video() && slot.slot_type != SlotType::Overlay {
            display_video(completion, creative);
        }
        if !creative.companions.is_empty() && !slot.companion_targets.is_empty() {
            display_companions(
                self.ctx.player.as_ref(),
                self.ctx.page.as_ref(),
                &creative.companions,
                &slot.companion_targets,
                slot.slot_type,
            );
        }
        if !creative.non_linear.is_empty() && slot.slot_type == SlotType::Overlay {
            display_overlay(completion, &creative.non_linear);
        }

        let mut seen = HashSet::new();
        for url in creative.impressions.iter().filter(|u| seen.insert(u.as_str())) {
            debug!(url = %url, "Sending impression beacon");
            self.ctx.beacons.send(url);
        }
    }

    /// [`display`](Self::display) and wait for the done callback.
    pub async fn display_and_wait(&self, slot: &Arc<AdSlot>, display_duration: Option<Duration>) {
        let (tx, rx) = oneshot::channel();
        let done: DoneCallback = Box::new(move || {
            let _ = tx.send(());
        });
        self.display(slot, done, display_duration);
        // The sender is only dropped unsent if the runtime shuts down.
        let _ = rx.await;
    }
}
