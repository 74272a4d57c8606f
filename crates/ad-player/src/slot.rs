//! Ad slot and display cycle state.
//!
//! An [`AdSlot`] is the placement opportunity handed to
//! [`AdPlayer::display`](crate::AdPlayer::display). While a creative is shown the
//! slot owns one [`DisplayCycle`]: the cleanup work, timers and bindings that
//! must be released exactly once when the display ends.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::events::Subscription;
use crate::model::{AdCreative, CompanionTarget, SkipControl, SlotNotice, SlotType};
use crate::task::ScheduledTask;

/// Caller notification that the slot finished displaying.
pub type DoneCallback = Box<dyn FnOnce() + Send + 'static>;

/// Cleanup work registered by a display subsystem.
pub type DoneFn = Box<dyn FnOnce() + Send + 'static>;

/// Identity of one display cycle on a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CycleId(u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a running display holds until completion.
#[derive(Default)]
pub(crate) struct DisplayCycle {
    pub(crate) done_functions: Vec<DoneFn>,
    pub(crate) done_callbacks: Vec<DoneCallback>,
    pub(crate) tasks: Vec<ScheduledTask>,
    pub(crate) subscriptions: Vec<Subscription>,
}

impl DisplayCycle {
    /// Cancel timers and unbind listeners.
    pub(crate) fn release_bindings(&mut self) {
        for task in self.tasks.drain(..) {
            task.cancel();
        }
        self.subscriptions.clear();
    }
}

#[derive(Default)]
struct SlotState {
    currently_displayed: bool,
    next_cycle: u64,
    active: Option<(CycleId, DisplayCycle)>,
}

impl fmt::Debug for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SlotState");
        s.field("currently_displayed", &self.currently_displayed);
        if let Some((id, cycle)) = &self.active {
            s.field("cycle", id)
                .field("done_functions", &cycle.done_functions.len())
                .field("tasks", &cycle.tasks.len())
                .field("subscriptions", &cycle.subscriptions.len());
        }
        s.finish()
    }
}

/// Outcome of entering [`AdPlayer::display`](crate::AdPlayer::display).
pub(crate) enum SlotEntry {
    /// Nothing is displayed; the caller keeps its callback.
    Idle(DoneCallback),
    /// A cycle is running; the callback joined it.
    Busy(CycleId),
}

/// A placement opportunity (linear break or overlay window).
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdSlot {
    #[serde(rename = "type", default)]
    pub slot_type: SlotType,
    #[serde(default)]
    pub ads: Vec<AdCreative>,
    #[serde(default)]
    pub companion_targets: Vec<CompanionTarget>,
    #[serde(default)]
    pub notice: Option<SlotNotice>,
    #[serde(default, alias = "skipBtn")]
    pub skip_control: Option<SkipControl>,
    #[serde(skip)]
    state: Mutex<SlotState>,
}

impl AdSlot {
    pub fn new(slot_type: SlotType, ads: Vec<AdCreative>) -> Self {
        Self {
            slot_type,
            ads,
            ..Default::default()
        }
    }

    pub fn with_companion_targets(mut self, targets: Vec<CompanionTarget>) -> Self {
        self.companion_targets = targets;
        self
    }

    pub fn with_notice(mut self, notice: SlotNotice) -> Self {
        self.notice = Some(notice);
        self
    }

    pub fn with_skip_control(mut self, skip: SkipControl) -> Self {
        self.skip_control = Some(skip);
        self
    }

    /// Parse a slot document from the metadata resolver.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// True between creative selection and completion.
    pub fn is_currently_displayed(&self) -> bool {
        self.state.lock().currently_displayed
    }

    /// Id of the running cycle, if any.
    pub fn active_cycle(&self) -> Option<CycleId> {
        self.state.lock().active.as_ref().map(|(id, _)| *id)
    }

    pub(crate) fn enter(&self, callback: DoneCallback) -> SlotEntry {
        let mut state = self.state.lock();
        let displayed = state.currently_displayed;
        match state.active.as_mut() {
            Some((id, cycle)) if displayed => {
                cycle.done_callbacks.push(callback);
                SlotEntry::Busy(*id)
            }
            _ => SlotEntry::Idle(callback),
        }
    }

    pub(crate) fn begin_cycle(&self, callback: DoneCallback) -> CycleId {
        let mut state = self.state.lock();
        state.next_cycle += 1;
        let id = CycleId(state.next_cycle);
        let cycle = DisplayCycle {
            done_callbacks: vec![callback],
            ..Default::default()
        };
        state.active = Some((id, cycle));
        state.currently_displayed = true;
        id
    }

    /// Run `f` against the cycle if it is still the active one.
    fn with_cycle<R>(&self, id: CycleId, f: impl FnOnce(&mut DisplayCycle) -> R) -> Option<R> {
        let mut state = self.state.lock();
        match state.active.as_mut() {
            Some((active, cycle)) if *active == id => Some(f(cycle)),
            _ => None,
        }
    }

    /// Register cleanup work. Runs it at once if the cycle already ended.
    pub(crate) fn push_done_function(&self, id: CycleId, done: DoneFn) {
        let mut pending = Some(done);
        self.with_cycle(id, |cycle| {
            if let Some(done) = pending.take() {
                cycle.done_functions.push(done);
            }
        });
        if let Some(done) = pending {
            done();
        }
    }

    /// Hand a task to the cycle. Cancels it if the cycle already ended.
    pub(crate) fn attach_task(&self, id: CycleId, task: ScheduledTask) {
        let mut pending = Some(task);
        self.with_cycle(id, |cycle| {
            if let Some(task) = pending.take() {
                cycle.tasks.push(task);
            }
        });
        if let Some(task) = pending {
            task.cancel();
        }
    }

    /// Hand a binding to the cycle. Unbinds it if the cycle already ended.
    pub(crate) fn attach_subscription(&self, id: CycleId, subscription: Subscription) {
        let mut pending = Some(subscription);
        self.with_cycle(id, |cycle| {
            if let Some(subscription) = pending.take() {
                cycle.subscriptions.push(subscription);
            }
        });
        drop(pending);
    }

    pub(crate) fn is_cycle_active(&self, id: CycleId) -> bool {
        self.with_cycle(id, |_| ()).is_some()
    }

    /// Detach the cycle for completion. Only the first caller gets it.
    pub(crate) fn take_cycle(&self, id: CycleId) -> Option<DisplayCycle> {
        let mut state = self.state.lock();
        match state.active.take() {
            Some((active, cycle)) if active == id => Some(cycle),
            other => {
                state.active = other;
                None
            }
        }
    }

    /// Clear `currently_displayed` once cleanup has drained.
    pub(crate) fn mark_idle(&self) {
        let mut state = self.state.lock();
        if state.active.is_none() {
            state.currently_displayed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn noop() -> DoneCallback {
        Box::new(|| {})
    }

    #[test]
    fn test_slot_from_json() {
        let slot = AdSlot::from_json_str(
            r#"{
                "type": "overlay",
                "ads": [{"nonLinear": [{"width": 468, "height": 60, "html": "<b>ad</b>"}]}],
                "companionTargets": [{"elementid": "side", "width": 300, "height": 250}],
                "skipBtn": {"text": "Skip ad"}
            }"#,
        )
        .unwrap();
        assert_eq!(slot.slot_type, SlotType::Overlay);
        assert_eq!(slot.ads.len(), 1);
        assert_eq!(slot.companion_targets[0].element_id, "side");
        assert_eq!(slot.skip_control.as_ref().unwrap().text, "Skip ad");
        assert!(!slot.is_currently_displayed());
    }

    #[test]
    fn test_take_cycle_only_once() {
        let slot = AdSlot::default();
        let id = slot.begin_cycle(noop());
        assert!(slot.is_currently_displayed());

        assert!(slot.take_cycle(id).is_some());
        assert!(slot.take_cycle(id).is_none());
        // Flag stays set until cleanup drained.
        assert!(slot.is_currently_displayed());
        slot.mark_idle();
        assert!(!slot.is_currently_displayed());
    }

    #[test]
    fn test_stale_cycle_cannot_take_new_one() {
        let slot = AdSlot::default();
        let first = slot.begin_cycle(noop());
        slot.take_cycle(first);
        slot.mark_idle();

        let second = slot.begin_cycle(noop());
        assert_ne!(first, second);
        assert!(slot.take_cycle(first).is_none());
        assert_eq!(slot.active_cycle(), Some(second));
    }

    #[test]
    fn test_enter_busy_joins_callback() {
        let slot = AdSlot::default();
        assert!(matches!(slot.enter(noop()), SlotEntry::Idle(_)));

        let id = slot.begin_cycle(noop());
        match slot.enter(noop()) {
            SlotEntry::Busy(joined) => assert_eq!(joined, id),
            SlotEntry::Idle(_) => panic!("slot should be busy"),
        }
        let cycle = slot.take_cycle(id).unwrap();
        assert_eq!(cycle.done_callbacks.len(), 2);
    }

    #[test]
    fn test_late_done_function_runs_immediately() {
        let slot = AdSlot::default();
        let id = slot.begin_cycle(noop());
        slot.take_cycle(id);

        let ran = Arc::new(AtomicU32::new(0));
        let counter = ran.clone();
        slot.push_done_function(
            id,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_done_functions_keep_registration_order() {
        let slot = AdSlot::default();
        let id = slot.begin_cycle(noop());
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            slot.push_done_function(id, Box::new(move || order.lock().push(i)));
        }
        assert!(slot.is_cycle_active(id));
        let mut cycle = slot.take_cycle(id).unwrap();
        assert!(!slot.is_cycle_active(id));
        for done in cycle.done_functions.drain(..) {
            done();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }
}
