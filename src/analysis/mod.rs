// src/analysis/mod.rs
// Expected-move arithmetic and trade rules

pub mod range;
pub mod recommendation;

pub use range::{round_dp, ExpectedMove, MoveMethod, RangeLevels};
pub use recommendation::{classify, confidence_for, recommend, Proximity, SignalParams};
