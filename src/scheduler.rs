//! Scheduled curation over every configured forum, driven by a cron
//! expression.
//!
//! Forums are curated one after another; a forum that can't be resolved
//! is logged and skipped until the next tick.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::curator::Curator;
use crate::error::ConfigError;

/// Parse a cron expression (seconds field included).
pub fn parse_schedule(expr: &str) -> Result<Schedule, ConfigError> {
    Schedule::from_str(expr).map_err(|e| ConfigError::InvalidValue {
        key: "CURATOR_SCHEDULE".into(),
        message: format!("invalid cron: {e}"),
    })
}

/// Next fire time after now.
pub fn next_fire(schedule: &Schedule) -> Option<DateTime<Utc>> {
    schedule.upcoming(Utc).next()
}

/// Totals for one scheduled pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub channels: usize,
    pub greenlit: usize,
    pub failed_channels: usize,
}

/// Curate each forum in turn.
pub async fn run_scheduled_pass(
    curator: &Curator,
    forum_ids: &[String],
    read_only: bool,
) -> PassSummary {
    let mut summary = PassSummary::default();

    for forum_id in forum_ids {
        match curator.curate_by_id(forum_id, read_only).await {
            Ok(result) if result.aborted.is_none() => {
                summary.channels += 1;
                summary.greenlit += result.records.len();
            }
            Ok(result) => {
                summary.failed_channels += 1;
                warn!(forum_id = %forum_id, reason = ?result.aborted, "Scheduled curation aborted");
            }
            Err(e) => {
                summary.failed_channels += 1;
                warn!(forum_id = %forum_id, error = %e, "Scheduled curation skipped forum");
            }
        }
    }

    summary
}

/// Spawn the scheduled curation loop.
pub fn spawn_curation_loop(
    curator: Arc<Curator>,
    forum_ids: Vec<String>,
    schedule: Schedule,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(forums = forum_ids.len(), "Scheduled curation loop started");

        loop {
            let Some(next) = next_fire(&schedule) else {
                error!("Curation schedule has no upcoming fire time, stopping loop");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let summary = run_scheduled_pass(&curator, &forum_ids, false).await;
            info!(
                channels = summary.channels,
                greenlit = summary.greenlit,
                failed = summary.failed_channels,
                "Scheduled curation pass complete"
            );
        }
    })
}
