//! Fixed-duration display monitor.

use std::ops::ControlFlow;
use std::time::Duration;

use tracing::debug;

use crate::context::SlotCompletion;
use crate::task::{FirstTick, ScheduledTask};

/// Ends the display once the primary surface has played past `duration`
/// from the moment monitoring started, or as soon as the surface is gone.
///
/// Elapsed time is measured on the surface clock, not on wall time, so a
/// paused player holds the slot open.
pub(crate) fn monitor_display_duration(completion: &SlotCompletion, duration: Duration) {
    let ctx = completion.ctx().clone();
    let Some(surface) = ctx.player.playback_surface() else {
        debug!("No playback surface to monitor, completing slot");
        completion.complete();
        return;
    };
    let start_time = surface.current_time();
    let limit = duration.as_secs_f64();
    debug!(start_time, limit, "Monitoring display duration");

    let done = completion.clone();
    let task = ScheduledTask::poll(ctx.config.monitor_rate(), FirstTick::Immediately, move || {
        let elapsed = match ctx.player.playback_surface() {
            Some(surface) if surface.is_attached() => surface.current_time() - start_time,
            _ => {
                debug!("Playback surface disappeared during display");
                done.complete();
                return ControlFlow::Break(());
            }
        };
        if elapsed > limit {
            debug!(elapsed, limit, "Display duration reached");
            done.complete();
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    completion.attach_task(task);
}
