//! In-memory `ForumPlatform` for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::error::PlatformError;
use crate::platform::{
    CandidateThread, Emoji, ForumChannel, ForumPlatform, Message, Reaction, TagRef,
};

/// A mutation the curator asked the platform to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    SetArchived(String, bool),
    SetTags(String, Vec<String>),
}

#[derive(Default)]
struct FakeState {
    open: Vec<CandidateThread>,
    archived: Vec<CandidateThread>,
    messages: HashMap<String, Message>,
    voters: HashMap<(String, String), Vec<String>>,
    failing_messages: HashSet<String>,
    failing_tags: HashSet<String>,
    failing_archive: HashSet<(String, bool)>,
    archived_flags: HashMap<String, bool>,
    calls: Vec<PlatformCall>,
}

pub struct FakePlatform {
    channel: ForumChannel,
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new(channel: ForumChannel) -> Self {
        Self {
            channel,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Add a thread to the active listing, with its origin message.
    pub fn add_open(&self, thread: CandidateThread, message: Option<Message>) {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = message {
            state.messages.insert(thread.id.clone(), message);
        }
        state.open.push(thread);
    }

    /// Add a thread to the archived listing, with its origin message.
    pub fn add_archived(&self, thread: CandidateThread, message: Option<Message>) {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = message {
            state.messages.insert(thread.id.clone(), message);
        }
        state.archived.push(thread);
    }

    pub fn set_voters(&self, message_id: &str, emoji_id: &str, users: &[&str]) {
        self.state.lock().unwrap().voters.insert(
            (message_id.to_string(), emoji_id.to_string()),
            users.iter().map(|u| u.to_string()).collect(),
        );
    }

    pub fn fail_first_message(&self, thread_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_messages
            .insert(thread_id.to_string());
    }

    pub fn fail_set_tags(&self, thread_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_tags
            .insert(thread_id.to_string());
    }

    /// Make `set_archived(thread, archived)` fail for this exact flag value.
    pub fn fail_set_archived(&self, thread_id: &str, archived: bool) {
        self.state
            .lock()
            .unwrap()
            .failing_archive
            .insert((thread_id.to_string(), archived));
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Archived flag after the recorded `set_archived` calls.
    pub fn is_archived(&self, thread_id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .archived_flags
            .get(thread_id)
            .copied()
            .unwrap_or(false)
    }
}

#[async_trait]
impl ForumPlatform for FakePlatform {
    async fn get_forum_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<ForumChannel>, PlatformError> {
        Ok((channel_id == self.channel.id).then(|| self.channel.clone()))
    }

    async fn list_open_threads(
        &self,
        _channel: &ForumChannel,
    ) -> Result<Vec<CandidateThread>, PlatformError> {
        Ok(self.state.lock().unwrap().open.clone())
    }

    async fn list_archived_public_threads(
        &self,
        _channel: &ForumChannel,
    ) -> Result<Vec<CandidateThread>, PlatformError> {
        Ok(self.state.lock().unwrap().archived.clone())
    }

    async fn get_first_message(
        &self,
        thread: &CandidateThread,
    ) -> Result<Option<Message>, PlatformError> {
        let state = self.state.lock().unwrap();
        if state.failing_messages.contains(&thread.id) {
            return Err(PlatformError::RequestFailed {
                endpoint: format!("/channels/{}/messages", thread.id),
                reason: "boom".into(),
            });
        }
        Ok(state.messages.get(&thread.id).cloned())
    }

    async fn get_reacting_users(
        &self,
        message: &Message,
        emoji_id: &str,
    ) -> Result<Vec<String>, PlatformError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .voters
            .get(&(message.id.clone(), emoji_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn set_archived(
        &self,
        thread: &CandidateThread,
        archived: bool,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(PlatformCall::SetArchived(thread.id.clone(), archived));
        if state.failing_archive.contains(&(thread.id.clone(), archived)) {
            return Err(PlatformError::ThreadUpdateFailed {
                thread_id: thread.id.clone(),
                reason: format!("archived={archived} rejected"),
            });
        }
        state.archived_flags.insert(thread.id.clone(), archived);
        Ok(())
    }

    async fn set_tags(
        &self,
        thread: &CandidateThread,
        tags: &[TagRef],
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(PlatformCall::SetTags(
            thread.id.clone(),
            tags.iter().map(|t| t.id.clone()).collect(),
        ));
        if state.failing_tags.contains(&thread.id) {
            return Err(PlatformError::ThreadUpdateFailed {
                thread_id: thread.id.clone(),
                reason: "tags rejected".into(),
            });
        }
        Ok(())
    }
}

/// Forum `100` with tags Greenlit (1), Docced (2) and Reviewed (3).
pub fn forum(name: &str) -> ForumChannel {
    ForumChannel {
        id: "100".into(),
        name: name.into(),
        guild_id: Some("1".into()),
        available_tags: vec![
            TagRef::new("1", "Greenlit"),
            TagRef::new("2", "Docced"),
            TagRef::new("3", "Reviewed"),
        ],
    }
}

/// Open, untagged thread in forum `100`.
pub fn thread(id: &str, name: &str) -> CandidateThread {
    CandidateThread {
        id: id.into(),
        name: name.into(),
        parent_id: "100".into(),
        guild_id: Some("1".into()),
        locked: false,
        archived: false,
        tags: Vec::new(),
        origin_message_id: id.into(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

/// Origin message with custom-emoji reactions given as `(emoji_id, count)`.
pub fn message_with(id: &str, reactions: &[(&str, u32)]) -> Message {
    Message {
        id: id.into(),
        channel_id: id.into(),
        author_id: "42".into(),
        content: format!("suggestion {id}"),
        jump_url: format!("https://discord.com/channels/1/{id}/{id}"),
        reactions: reactions
            .iter()
            .map(|(emoji_id, count)| Reaction {
                emoji: Emoji::Custom {
                    id: emoji_id.to_string(),
                    name: format!("e{emoji_id}"),
                },
                count: *count,
            })
            .collect(),
    }
}
