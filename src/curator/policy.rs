//! Approval policy: decides whether a tallied thread is greenlit.

use crate::curator::tally::SentimentTally;
use crate::platform::TagRef;

/// Tag names that mark a thread as already finalized.
pub const FINALIZED_TAG_NAMES: [&str; 2] = ["Greenlit", "Docced"];

/// Outcome of evaluating one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
    /// Thread already carries a finalized tag; only re-synced.
    AlreadyFinalized,
}

/// Thresholds a tally must meet to be approved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApprovalPolicy {
    pub minimum_agree_threshold: u32,
    pub minimum_approval_percentage: f64,
}

impl ApprovalPolicy {
    pub fn new(minimum_agree_threshold: u32, minimum_approval_percentage: f64) -> Self {
        Self {
            minimum_agree_threshold,
            minimum_approval_percentage,
        }
    }

    /// Approve or reject on the tally alone.
    pub fn decide(&self, tally: &SentimentTally) -> Decision {
        if tally.agree >= self.minimum_agree_threshold
            && approval_ratio(tally) >= self.minimum_approval_percentage
        {
            Decision::Approve
        } else {
            Decision::Reject
        }
    }

    /// Full decision for a thread: finalized tags short-circuit the thresholds.
    pub fn evaluate(&self, tags: &[TagRef], tally: &SentimentTally) -> Decision {
        if is_finalized(tags) {
            Decision::AlreadyFinalized
        } else {
            self.decide(tally)
        }
    }
}

/// Agree share of agree + disagree, in percent. 100 when nobody disagrees.
pub fn approval_ratio(tally: &SentimentTally) -> f64 {
    if tally.disagree == 0 {
        return 100.0;
    }
    let agree = f64::from(tally.agree);
    let disagree = f64::from(tally.disagree);
    agree / (agree + disagree) * 100.0
}

/// Whether any tag is one of the finalized tag names (exact match).
pub fn is_finalized(tags: &[TagRef]) -> bool {
    tags.iter()
        .any(|tag| FINALIZED_TAG_NAMES.contains(&tag.name.as_str()))
}
