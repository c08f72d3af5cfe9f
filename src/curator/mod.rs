//! Suggestion curation engine.
//!
//! Tallies sentiment reactions on each forum post's origin message,
//! applies the approval policy and greenlights qualifying threads.

pub mod policy;
pub mod record;
pub mod run;
pub mod tags;
pub mod tally;

pub use policy::{ApprovalPolicy, Decision};
pub use record::CurationRecord;
pub use run::{CandidateFailure, CurationRunResult, Curator};
pub use tally::{ReactionSentiment, SentimentTally};
