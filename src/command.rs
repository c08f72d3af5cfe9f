//! The `curate` command: runs the curator for one forum and summarizes the result.

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{error, info};

use crate::curator::{CurationRunResult, Curator};
use crate::error::{CurationError, Result};

/// What the invoking user is told after a curation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurateReply {
    NoGreenlitMessages,
    GreenlitMessages(usize),
    DatabaseNotConnected,
    Aborted(String),
}

impl CurateReply {
    pub fn from_run(result: &CurationRunResult) -> Self {
        match &result.aborted {
            Some(CurationError::StorageUnavailable) => Self::DatabaseNotConnected,
            Some(e) => Self::Aborted(e.to_string()),
            None if result.records.is_empty() => Self::NoGreenlitMessages,
            None => Self::GreenlitMessages(result.records.len()),
        }
    }
}

impl fmt::Display for CurateReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoGreenlitMessages => write!(f, "No suggestions were greenlit."),
            Self::GreenlitMessages(count) => write!(f, "Greenlit {count} suggestion(s)."),
            Self::DatabaseNotConnected => {
                write!(f, "The database is not connected, curation was skipped.")
            }
            Self::Aborted(reason) => write!(f, "Curation failed: {reason}"),
        }
    }
}

/// Curate the forum with id `channel_id` and build the reply.
pub async fn curate_command(
    curator: &Curator,
    channel_id: &str,
    read_only: bool,
) -> Result<(CurateReply, CurationRunResult)> {
    let result = curator.curate_by_id(channel_id, read_only).await?;
    let reply = CurateReply::from_run(&result);
    info!(
        channel_id,
        read_only,
        greenlit = result.records.len(),
        "Curate command finished: {reply}"
    );
    Ok((reply, result))
}

/// Run the command in the background; the reply arrives on the receiver.
pub fn spawn_curate_command(
    curator: Arc<Curator>,
    channel_id: String,
    read_only: bool,
) -> oneshot::Receiver<Result<CurateReply>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let outcome = curate_command(&curator, &channel_id, read_only)
            .await
            .map(|(reply, _)| reply);
        if let Err(e) = &outcome {
            error!(channel_id = %channel_id, error = %e, "Curate command failed");
        }
        let _ = tx.send(outcome);
    });
    rx
}
