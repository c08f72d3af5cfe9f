//! Chat-platform abstraction: forum snapshots and the adapter trait.
//!
//! The curator only ever sees immutable snapshots (`ForumChannel`,
//! `CandidateThread`, `Message`) handed out by a `ForumPlatform`; every
//! remote read or write goes through the trait.

pub mod discord;

use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PlatformError;

pub use discord::DiscordPlatform;

/// A tag from a forum channel's tag vocabulary.
///
/// Equality is by `id`; `name` is only used for human-readable matching.
#[derive(Debug, Clone, Eq)]
pub struct TagRef {
    pub id: String,
    pub name: String,
}

impl TagRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl PartialEq for TagRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for TagRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A forum channel and its tag vocabulary.
#[derive(Debug, Clone)]
pub struct ForumChannel {
    pub id: String,
    pub name: String,
    pub guild_id: Option<String>,
    pub available_tags: Vec<TagRef>,
}

impl ForumChannel {
    /// Find a tag in the vocabulary by name.
    pub fn tag_by_name(&self, name: &str, ignore_case: bool) -> Option<&TagRef> {
        self.available_tags.iter().find(|tag| {
            if ignore_case {
                tag.name.eq_ignore_ascii_case(name)
            } else {
                tag.name == name
            }
        })
    }

    /// Alpha forums are recognised by name.
    pub fn is_alpha(&self) -> bool {
        self.name.to_lowercase().contains("alpha")
    }
}

/// Snapshot of a forum thread taken at enumeration time.
#[derive(Debug, Clone)]
pub struct CandidateThread {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    pub guild_id: Option<String>,
    pub locked: bool,
    pub archived: bool,
    pub tags: Vec<TagRef>,
    pub origin_message_id: String,
    pub created_at: DateTime<Utc>,
}

impl CandidateThread {
    /// Only open, unlocked threads are evaluated.
    pub fn is_open(&self) -> bool {
        !self.locked && !self.archived
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }
}

/// The emoji on a reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emoji {
    Custom { id: String, name: String },
    Unicode(String),
}

impl Emoji {
    pub fn custom_id(&self) -> Option<&str> {
        match self {
            Emoji::Custom { id, .. } => Some(id),
            Emoji::Unicode(_) => None,
        }
    }
}

/// One aggregated reaction on a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub emoji: Emoji,
    pub count: u32,
}

/// A thread's origin message.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    pub content: String,
    pub jump_url: String,
    pub reactions: Vec<Reaction>,
}

/// Everything the curator needs from the chat platform.
#[async_trait]
pub trait ForumPlatform: Send + Sync {
    /// Look up a forum channel. `None` if the id is unknown or not a forum.
    async fn get_forum_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<ForumChannel>, PlatformError>;

    /// Threads currently active in the forum.
    async fn list_open_threads(
        &self,
        channel: &ForumChannel,
    ) -> Result<Vec<CandidateThread>, PlatformError>;

    /// Public threads that have been archived.
    async fn list_archived_public_threads(
        &self,
        channel: &ForumChannel,
    ) -> Result<Vec<CandidateThread>, PlatformError>;

    /// The first message in the thread's history, if any.
    async fn get_first_message(
        &self,
        thread: &CandidateThread,
    ) -> Result<Option<Message>, PlatformError>;

    /// Reactions on a message.
    async fn get_reactions(&self, message: &Message) -> Result<Vec<Reaction>, PlatformError> {
        Ok(message.reactions.clone())
    }

    /// Ids of the users who reacted to `message` with the given custom emoji.
    async fn get_reacting_users(
        &self,
        message: &Message,
        emoji_id: &str,
    ) -> Result<Vec<String>, PlatformError>;

    /// Resolve a tag in the channel's vocabulary.
    async fn resolve_tag_by_name(
        &self,
        channel: &ForumChannel,
        name: &str,
        ignore_case: bool,
    ) -> Result<Option<TagRef>, PlatformError> {
        Ok(channel.tag_by_name(name, ignore_case).cloned())
    }

    async fn set_archived(
        &self,
        thread: &CandidateThread,
        archived: bool,
    ) -> Result<(), PlatformError>;

    async fn set_tags(&self, thread: &CandidateThread, tags: &[TagRef])
    -> Result<(), PlatformError>;
}
