//! Curation run orchestrator.
//!
//! A run validates its inputs, enumerates the forum's threads and then
//! walks them one at a time. Only validation and enumeration can abort the
//! run; anything that goes wrong for a single thread is logged, recorded
//! in `failures`, and the run moves on.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::{CuratorConfig, EmojiConfig};
use crate::curator::policy::{ApprovalPolicy, Decision, approval_ratio};
use crate::curator::record::{CurationRecord, build_record};
use crate::curator::tags::apply_greenlit;
use crate::curator::tally::SentimentTally;
use crate::error::{CurationError, PlatformError};
use crate::metrics::Metrics;
use crate::platform::{CandidateThread, ForumChannel, ForumPlatform, TagRef};
use crate::store::CurationStore;

/// A thread that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    pub thread_id: String,
    pub thread_name: String,
    pub reason: String,
}

/// Result of one curation run.
#[derive(Debug)]
pub struct CurationRunResult {
    pub run_id: Uuid,
    pub channel_id: String,
    pub channel_name: String,
    pub read_only: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Records for threads greenlit by this run.
    pub records: Vec<CurationRecord>,
    /// Already-finalized threads re-synced into storage.
    pub resynced: usize,
    /// Threads that did not meet the thresholds.
    pub rejected: usize,
    /// Threads that qualified but were left alone because the run was read-only.
    pub dry_run_approvals: usize,
    pub failures: Vec<CandidateFailure>,
    /// Set when validation or enumeration aborted the run.
    pub aborted: Option<CurationError>,
}

impl CurationRunResult {
    fn start(run_id: Uuid, channel: &ForumChannel, read_only: bool) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            channel_id: channel.id.clone(),
            channel_name: channel.name.clone(),
            read_only,
            start_time: now,
            end_time: now,
            records: Vec::new(),
            resynced: 0,
            rejected: 0,
            dry_run_approvals: 0,
            failures: Vec::new(),
            aborted: None,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }
}

/// What happened to a single thread.
#[derive(Debug)]
enum ThreadOutcome {
    Resynced,
    Rejected,
    DryRun,
    Greenlit(CurationRecord),
}

/// Inputs resolved once per run by validation.
struct RunContext {
    emoji: EmojiConfig,
    greenlit: TagRef,
    policy: ApprovalPolicy,
}

/// Drives curation runs against injected collaborators.
pub struct Curator {
    platform: Arc<dyn ForumPlatform>,
    store: Arc<dyn CurationStore>,
    metrics: Arc<dyn Metrics>,
    config: CuratorConfig,
}

impl Curator {
    pub fn new(
        platform: Arc<dyn ForumPlatform>,
        store: Arc<dyn CurationStore>,
        metrics: Arc<dyn Metrics>,
        config: CuratorConfig,
    ) -> Self {
        Self {
            platform,
            store,
            metrics,
            config,
        }
    }

    pub fn config(&self) -> &CuratorConfig {
        &self.config
    }

    /// Resolve a forum channel by id and curate it.
    pub async fn curate_by_id(
        &self,
        channel_id: &str,
        read_only: bool,
    ) -> Result<CurationRunResult, PlatformError> {
        let channel = self
            .platform
            .get_forum_channel(channel_id)
            .await?
            .ok_or_else(|| PlatformError::ChannelNotFound {
                id: channel_id.to_string(),
            })?;
        Ok(self.curate(&channel, read_only).await)
    }

    /// Run one curation pass over `channel`.
    pub async fn curate(&self, channel: &ForumChannel, read_only: bool) -> CurationRunResult {
        let run_id = Uuid::new_v4();
        let span = info_span!("curation_run", %run_id, channel = %channel.name, read_only);
        self.run(run_id, channel, read_only).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, channel: &ForumChannel, read_only: bool) -> CurationRunResult {
        let mut result = CurationRunResult::start(run_id, channel, read_only);
        let timer = self.metrics.start_timer(&channel.name);

        let (ctx, threads) = match self.prepare(channel).await {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(error = %e, "Couldn't curate forum channel {} ({})", channel.name, channel.id);
                result.aborted = Some(e);
                result.end_time = Utc::now();
                timer.observe_duration();
                return result;
            }
        };

        info!(count = threads.len(), "Found {} forum post(s)", threads.len());
        self.metrics
            .increment_counter(&channel.name, threads.len() as u64);

        for (index, thread) in threads.iter().enumerate() {
            info!(
                thread_id = %thread.id,
                "[{}/{}] Curating thread '{}'",
                index + 1,
                threads.len(),
                thread.name
            );

            match self.curate_thread(&ctx, channel, thread, read_only).await {
                Ok(ThreadOutcome::Greenlit(record)) => result.records.push(record),
                Ok(ThreadOutcome::Resynced) => result.resynced += 1,
                Ok(ThreadOutcome::Rejected) => result.rejected += 1,
                Ok(ThreadOutcome::DryRun) => result.dry_run_approvals += 1,
                Err(e) => {
                    warn!(thread_id = %thread.id, error = %e, "Failed to curate thread '{}'", thread.name);
                    result.failures.push(CandidateFailure {
                        thread_id: thread.id.clone(),
                        thread_name: thread.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        result.end_time = Utc::now();
        let elapsed = timer.observe_duration();
        info!(
            greenlit = result.records.len(),
            resynced = result.resynced,
            rejected = result.rejected,
            failed = result.failures.len(),
            "Curated forum channel {} ({}) in {}ms",
            channel.name,
            channel.id,
            elapsed.as_millis()
        );
        result
    }

    /// Validate and enumerate. Any error here aborts the run.
    async fn prepare(
        &self,
        channel: &ForumChannel,
    ) -> Result<(RunContext, Vec<CandidateThread>), CurationError> {
        let ctx = self.validate(channel).await?;
        info!("Curating forum channel: {} (Channel ID: {})", channel.name, channel.id);

        let (open, archived) = futures::future::try_join(
            self.platform.list_open_threads(channel),
            self.platform.list_archived_public_threads(channel),
        )
        .await
        .map_err(|source| CurationError::ChannelUnavailable {
            channel_id: channel.id.clone(),
            source,
        })?;

        Ok((ctx, candidate_threads(open, archived)))
    }

    async fn validate(&self, channel: &ForumChannel) -> Result<RunContext, CurationError> {
        if !self.store.is_connected().await {
            return Err(CurationError::StorageUnavailable);
        }

        let emoji = self
            .config
            .emoji
            .clone()
            .ok_or(CurationError::MissingEmojiConfig)?;

        let greenlit = self
            .platform
            .resolve_tag_by_name(channel, &self.config.greenlit_tag, true)
            .await
            .map_err(|source| CurationError::ChannelUnavailable {
                channel_id: channel.id.clone(),
                source,
            })?
            .ok_or_else(|| CurationError::GreenlitTagMissing {
                tag: self.config.greenlit_tag.clone(),
                channel_name: channel.name.clone(),
                channel_id: channel.id.clone(),
            })?;

        Ok(RunContext {
            emoji,
            greenlit,
            policy: ApprovalPolicy::new(
                self.config.minimum_agree_threshold,
                self.config.minimum_approval_percentage,
            ),
        })
    }

    async fn curate_thread(
        &self,
        ctx: &RunContext,
        channel: &ForumChannel,
        thread: &CandidateThread,
        read_only: bool,
    ) -> Result<ThreadOutcome, CurationError> {
        let message = self.platform.get_first_message(thread).await?.ok_or_else(|| {
            CurationError::MissingOriginMessage {
                thread_name: thread.name.clone(),
                thread_id: thread.id.clone(),
            }
        })?;

        debug!(message_id = %message.id, "Checking reaction counts");
        let reactions = self.platform.get_reactions(&message).await?;
        let tally = SentimentTally::from_reactions(&reactions, &ctx.emoji);

        match ctx.policy.evaluate(&thread.tags, &tally) {
            Decision::AlreadyFinalized => {
                info!(thread_id = %thread.id, "Thread '{}' is already greenlit/docced", thread.name);
                let record = build_record(
                    self.platform.as_ref(),
                    channel,
                    &message,
                    thread,
                    tally,
                    &ctx.emoji.agree_emoji_id,
                )
                .await?;
                self.store.upsert_curation_record(&record).await?;
                Ok(ThreadOutcome::Resynced)
            }
            Decision::Reject => {
                info!(
                    thread_id = %thread.id,
                    agree = tally.agree,
                    neutral = tally.neutral,
                    disagree = tally.disagree,
                    ratio = approval_ratio(&tally),
                    "Thread '{}' does not meet the minimum requirements to be greenlit",
                    thread.name
                );
                Ok(ThreadOutcome::Rejected)
            }
            Decision::Approve => {
                info!(
                    thread_id = %thread.id,
                    agree = tally.agree,
                    disagree = tally.disagree,
                    ratio = approval_ratio(&tally),
                    "Thread '{}' meets the minimum requirements to be greenlit",
                    thread.name
                );

                if read_only {
                    info!(thread_id = %thread.id, "Skipping thread '{}', curator is read-only", thread.name);
                    return Ok(ThreadOutcome::DryRun);
                }

                let tags = apply_greenlit(self.platform.as_ref(), thread, &ctx.greenlit)
                    .await
                    .map_err(|source| CurationError::TagUpdate {
                        thread_id: thread.id.clone(),
                        source,
                    })?;
                info!(thread_id = %thread.id, "Thread '{}' has been greenlit", thread.name);

                let greenlit_thread = CandidateThread {
                    tags,
                    ..thread.clone()
                };
                let record = build_record(
                    self.platform.as_ref(),
                    channel,
                    &message,
                    &greenlit_thread,
                    tally,
                    &ctx.emoji.agree_emoji_id,
                )
                .await?;
                Ok(ThreadOutcome::Greenlit(record))
            }
        }
    }
}

/// Open and archived listings merged, de-duplicated by id (first wins) and
/// narrowed to open, unlocked threads.
pub fn candidate_threads(
    open: Vec<CandidateThread>,
    archived: Vec<CandidateThread>,
) -> Vec<CandidateThread> {
    let mut seen = HashSet::new();
    open.into_iter()
        .chain(archived)
        .filter(|t| seen.insert(t.id.clone()))
        .filter(CandidateThread::is_open)
        .collect()
}
