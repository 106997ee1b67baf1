//! Flat finite state machines
//!
//! Sequenced motion (intro phases, reveal lifecycles) is modeled as a
//! small statechart: states and events are plain `u32` constants, and
//! transitions are declared up front through a builder. Machines live
//! in an [`FsmRuntime`] slotmap and are addressed by [`FsmId`].

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

/// State identifier within a machine
pub type StateId = u32;

/// Event identifier within a machine
pub type EventId = u32;

new_key_type! {
    /// Handle to a machine inside an [`FsmRuntime`]
    pub struct FsmId;
}

/// A single declared transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: StateId,
    pub event: EventId,
    pub to: StateId,
}

/// Immutable transition table plus current state
#[derive(Clone, Debug)]
pub struct StateMachine {
    current: StateId,
    transitions: SmallVec<[Transition; 8]>,
}

impl StateMachine {
    /// Start declaring a machine with the given initial state
    pub fn builder(initial: StateId) -> StateMachineBuilder {
        StateMachineBuilder {
            initial,
            transitions: SmallVec::new(),
        }
    }

    /// Current state
    pub fn current(&self) -> StateId {
        self.current
    }

    /// Feed an event; returns the new state if a transition matched
    ///
    /// Unmatched events leave the machine where it is and return `None`.
    pub fn send(&mut self, event: EventId) -> Option<StateId> {
        let next = self
            .transitions
            .iter()
            .find(|t| t.from == self.current && t.event == event)
            .map(|t| t.to)?;
        self.current = next;
        Some(next)
    }
}

/// Builder for [`StateMachine`]
pub struct StateMachineBuilder {
    initial: StateId,
    transitions: SmallVec<[Transition; 8]>,
}

impl StateMachineBuilder {
    /// Declare that `event` moves the machine from `from` to `to`
    pub fn on(mut self, from: StateId, event: EventId, to: StateId) -> Self {
        self.transitions.push(Transition { from, event, to });
        self
    }

    pub fn build(self) -> StateMachine {
        StateMachine {
            current: self.initial,
            transitions: self.transitions,
        }
    }
}

/// Owns all live machines
#[derive(Default)]
pub struct FsmRuntime {
    machines: SlotMap<FsmId, StateMachine>,
}

impl FsmRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a machine and get its handle
    pub fn create(&mut self, machine: StateMachine) -> FsmId {
        self.machines.insert(machine)
    }

    /// Remove a machine
    pub fn destroy(&mut self, id: FsmId) {
        self.machines.remove(id);
    }

    /// Feed an event to one machine
    ///
    /// Returns the new state when a transition fired, `None` when the
    /// event didn't match or the machine no longer exists.
    pub fn send(&mut self, id: FsmId, event: EventId) -> Option<StateId> {
        self.machines.get_mut(id)?.send(event)
    }

    /// Current state of a machine
    pub fn current_state(&self, id: FsmId) -> Option<StateId> {
        self.machines.get(id).map(|m| m.current())
    }

    /// Number of live machines
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: u32 = 0;
    const ACTIVE: u32 = 1;
    const DONE: u32 = 2;

    const GO: u32 = 0;
    const FINISH: u32 = 1;

    fn toggle() -> StateMachine {
        StateMachine::builder(IDLE)
            .on(IDLE, GO, ACTIVE)
            .on(ACTIVE, GO, IDLE)
            .build()
    }

    #[test]
    fn test_basic_transitions() {
        let mut fsm = toggle();
        assert_eq!(fsm.current(), IDLE);
        assert_eq!(fsm.send(GO), Some(ACTIVE));
        assert_eq!(fsm.send(GO), Some(IDLE));
    }

    #[test]
    fn test_unmatched_event_is_ignored() {
        let mut fsm = toggle();
        assert_eq!(fsm.send(FINISH), None);
        assert_eq!(fsm.current(), IDLE);
    }

    #[test]
    fn test_forward_only_chain() {
        // A chain with no backward transitions can never regress.
        let mut fsm = StateMachine::builder(IDLE)
            .on(IDLE, GO, ACTIVE)
            .on(ACTIVE, FINISH, DONE)
            .build();

        assert_eq!(fsm.send(FINISH), None);
        assert_eq!(fsm.send(GO), Some(ACTIVE));
        assert_eq!(fsm.send(GO), None);
        assert_eq!(fsm.send(FINISH), Some(DONE));
        assert_eq!(fsm.send(GO), None);
        assert_eq!(fsm.current(), DONE);
    }

    #[test]
    fn test_runtime_create_send_destroy() {
        let mut runtime = FsmRuntime::new();
        let id = runtime.create(toggle());
        assert_eq!(runtime.len(), 1);
        assert_eq!(runtime.current_state(id), Some(IDLE));

        assert_eq!(runtime.send(id, GO), Some(ACTIVE));
        assert_eq!(runtime.current_state(id), Some(ACTIVE));

        runtime.destroy(id);
        assert_eq!(runtime.current_state(id), None);
        assert_eq!(runtime.send(id, GO), None);
        assert!(runtime.is_empty());
    }
}
