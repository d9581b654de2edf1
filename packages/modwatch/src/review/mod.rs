//! Human-in-the-loop review: rendering the review surface and applying
//! operator decisions.

pub mod render;
pub mod workflow;

pub use render::ReviewNotifier;
pub use workflow::{BulkDecision, DecisionOutcome, ReviewDecision, ReviewWorkflow};
