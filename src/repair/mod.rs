//! Candidate repair: the multi-round loop and its single-round sibling.

pub mod engine;
pub mod history;
pub mod single;

#[cfg(test)]
mod tests;

pub use engine::{
    run_repair_loop, Capabilities, CandidateState, LoopReport, RepairSettings, DEFAULT_MAX_ROUNDS,
};
pub use history::{CandidateRecord, RepairEntry};
pub use single::{single_round_repair, FixedResult};
