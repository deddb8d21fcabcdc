/*!
 * Lane behavior state machine
 *
 * Tracks the discrete driving state of the ego vehicle and records the
 * transitions between states. Self-transitions are silent: they are neither
 * logged nor recorded.
 */

use std::collections::VecDeque;
use std::fmt;

use tracing::info;

use crate::common::Direction;

/// Number of transitions kept in the history
const HISTORY_LIMIT: usize = 64;

/// Discrete driving state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsmState {
    KeepLane,
    PrepareLaneChange,
    LaneChangeLeft,
    LaneChangeRight,
}

impl FsmState {
    pub fn lane_change(direction: Direction) -> Self {
        match direction {
            Direction::Left => FsmState::LaneChangeLeft,
            Direction::Right => FsmState::LaneChangeRight,
        }
    }

    /// Human readable explanation of what the vehicle does in this state
    pub fn description(self) -> &'static str {
        match self {
            FsmState::KeepLane => "keep lane",
            FsmState::PrepareLaneChange => "front car too close, slowing down and looking for a gap",
            FsmState::LaneChangeLeft => "changing lane to the left",
            FsmState::LaneChangeRight => "changing lane to the right",
        }
    }
}

impl fmt::Display for FsmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FsmState::KeepLane => "KeepLane",
            FsmState::PrepareLaneChange => "PrepareLaneChange",
            FsmState::LaneChangeLeft => "LaneChangeLeft",
            FsmState::LaneChangeRight => "LaneChangeRight",
        };
        write!(f, "{}", name)
    }
}

/// Represents a transition in the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub src_state: FsmState,
    pub dst_state: FsmState,
}

impl Transition {
    pub fn new(src_state: FsmState, dst_state: FsmState) -> Self {
        Transition {
            src_state,
            dst_state,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> --> <{}>", self.src_state, self.dst_state)
    }
}

/// Main State Machine implementation
#[derive(Debug, Clone)]
pub struct StateMachine {
    name: String,
    current_state: FsmState,
    transition_history: VecDeque<Transition>,
}

impl StateMachine {
    /// Create a new state machine
    pub fn new(name: &str, initial_state: FsmState) -> Self {
        StateMachine {
            name: name.to_string(),
            current_state: initial_state,
            transition_history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_state(&self) -> FsmState {
        self.current_state
    }

    /// Move to `dst_state`; returns the transition if the state actually changed
    pub fn transition_to(&mut self, dst_state: FsmState) -> Option<Transition> {
        if self.current_state == dst_state {
            return None;
        }

        let transition = Transition::new(self.current_state, dst_state);
        info!(
            "|{}| transitioning from <{}> to <{}>: {}",
            self.name,
            transition.src_state,
            transition.dst_state,
            dst_state.description()
        );

        if self.transition_history.len() == HISTORY_LIMIT {
            self.transition_history.pop_front();
        }
        self.transition_history.push_back(transition);
        self.current_state = dst_state;

        Some(transition)
    }

    /// Most recent transitions, oldest first
    pub fn transition_history(&self) -> impl Iterator<Item = &Transition> {
        self.transition_history.iter()
    }
}
