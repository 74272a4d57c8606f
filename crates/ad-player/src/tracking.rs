//! Quartile and lifecycle tracking.
//!
//! Maps playback samples and surface lifecycle events to creative beacons.
//! Every event name fires at most once per dispatcher unless forced; `pause`
//! and `resume` are always forced.
//!
//! Supported: `start`, `firstQuartile`, `midpoint`, `thirdQuartile`,
//! `complete`, `pause`, `resume`, `rewind`. Other VAST events (mute,
//! fullscreen, expand, ...) are never fired.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::beacon::BeaconSender;
use crate::events::{Subscription, SurfaceEvent};
use crate::host::PlaybackSurface;
use crate::model::{TrackingEvent, TrackingEventName};
use crate::task::{FirstTick, ScheduledTask};

#[derive(Debug, Default)]
struct TrackerState {
    sent: HashSet<TrackingEventName>,
    last_position: f64,
}

/// Deduplicating beacon dispatcher for one display cycle.
pub struct TrackingEventDispatcher {
    events: Vec<TrackingEvent>,
    beacons: Arc<dyn BeaconSender>,
    state: Mutex<TrackerState>,
}

impl std::fmt::Debug for TrackingEventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingEventDispatcher")
            .field("events", &self.events.len())
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl TrackingEventDispatcher {
    pub fn new(events: Vec<TrackingEvent>, beacons: Arc<dyn BeaconSender>) -> Self {
        Self {
            events,
            beacons,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Fire every beacon registered for `name`.
    ///
    /// Returns the number of beacons sent. Names without a configured beacon
    /// are dropped silently.
    pub fn fire(&self, name: TrackingEventName, force: bool) -> usize {
        let first_time = self.state.lock().sent.insert(name);
        if !first_time && !force {
            return 0;
        }

        let mut sent = 0;
        for event in self.events.iter().filter(|e| e.event_name == name) {
            debug!(event = %name, url = %event.beacon_url, "Sending tracking beacon");
            self.beacons.send(&event.beacon_url);
            sent += 1;
        }
        sent
    }

    pub fn has_fired(&self, name: TrackingEventName) -> bool {
        self.state.lock().sent.contains(&name)
    }

    /// Feed one playback sample (seconds).
    ///
    /// `thirdQuartile` fires past two-thirds (`duration / 1.5`), not
    /// three-quarters.
    pub fn sample(&self, position: f64, duration: f64) {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut state.last_position, position)
        };

        if position < previous {
            self.fire(TrackingEventName::Rewind, false);
        }
        if position > 0.0 {
            self.fire(TrackingEventName::Start, false);
        }
        if position > duration / 4.0 {
            self.fire(TrackingEventName::FirstQuartile, false);
        }
        if position > duration / 2.0 {
            self.fire(TrackingEventName::Midpoint, false);
        }
        if position > duration / 1.5 {
            self.fire(TrackingEventName::ThirdQuartile, false);
        }
    }

    /// A seek landed at `position`; fires `rewind` if it went backwards from
    /// the last sample.
    pub fn seeked(&self, position: f64) {
        let last = self.state.lock().last_position;
        if position < last {
            self.fire(TrackingEventName::Rewind, false);
        }
    }

    /// Bind to a surface: sample it every `period` and translate its lifecycle
    /// events.
    ///
    /// `on_detached` runs once if the surface disappears while sampling. On
    /// `Ended` the dispatcher fires `complete`, stops sampling and ignores any
    /// later surface events.
    pub fn bind<F>(
        self: &Arc<Self>,
        surface: &Arc<dyn PlaybackSurface>,
        period: Duration,
        on_detached: F,
    ) -> TrackingBinding
    where
        F: Fn() + Send + 'static,
    {
        let sampler = {
            let dispatcher = Arc::clone(self);
            let surface = Arc::downgrade(surface);
            ScheduledTask::poll(period, FirstTick::AfterPeriod, move || {
                match surface.upgrade().filter(|s| s.is_attached()) {
                    Some(surface) => {
                        dispatcher.sample(surface.current_time(), surface.duration());
                        ControlFlow::Continue(())
                    }
                    None => {
                        debug!("Tracked surface is gone, stopping sampler");
                        on_detached();
                        ControlFlow::Break(())
                    }
                }
            })
        };

        let listener = {
            let dispatcher = Arc::clone(self);
            let token = sampler.token().clone();
            let weak_surface = Arc::downgrade(surface);
            surface.events().listen(move |event| {
                if token.is_cancelled() {
                    return;
                }
                match event {
                    SurfaceEvent::Ended => {
                        dispatcher.fire(TrackingEventName::Complete, false);
                        token.cancel();
                    }
                    SurfaceEvent::Pause => {
                        dispatcher.fire(TrackingEventName::Pause, true);
                    }
                    SurfaceEvent::Play => {
                        dispatcher.fire(TrackingEventName::Resume, true);
                    }
                    SurfaceEvent::Seeked => {
                        if let Some(surface) = weak_surface.upgrade() {
                            dispatcher.seeked(surface.current_time());
                        }
                    }
                }
            })
        };

        TrackingBinding { sampler, listener }
    }
}

/// Sampler task and surface listener of a bound dispatcher.
#[derive(Debug)]
pub struct TrackingBinding {
    sampler: ScheduledTask,
    listener: Subscription,
}

impl TrackingBinding {
    /// False once `complete` fired or the binding was cancelled.
    pub fn is_active(&self) -> bool {
        !self.sampler.is_cancelled()
    }

    pub fn into_parts(self) -> (ScheduledTask, Subscription) {
        (self.sampler, self.listener)
    }
}
