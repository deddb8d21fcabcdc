// Mission planning module

pub mod behavior_planner;
pub mod lane_cost;
pub mod state_machine;

pub use behavior_planner::{BehaviorConfig, BehaviorDecision, BehaviorPlanner, BehaviorState};
pub use lane_cost::lane_change_cost;
pub use state_machine::{FsmState, StateMachine, Transition};
