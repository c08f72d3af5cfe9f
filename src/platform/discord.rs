//! Discord REST adapter for `ForumPlatform`.
//!
//! Talks to the HTTP API directly with reqwest and converts the wire
//! objects into the curator's snapshots. Rate-limited requests are retried
//! after the server-provided delay.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::PlatformConfig;
use crate::error::PlatformError;
use crate::platform::{
    CandidateThread, Emoji, ForumChannel, ForumPlatform, Message, Reaction, TagRef,
};

/// First second of 2015, the Discord snowflake epoch.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Channel type of a forum channel.
const GUILD_FORUM: u8 = 15;

/// Page size for archived threads and reaction users.
const PAGE_LIMIT: usize = 100;

const MAX_RATE_LIMIT_RETRIES: u32 = 3;

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiChannel {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    available_tags: Vec<ApiTag>,
}

#[derive(Debug, Deserialize)]
struct ApiTag {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiThread {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    applied_tags: Vec<String>,
    #[serde(default)]
    thread_metadata: Option<ApiThreadMetadata>,
}

#[derive(Debug, Deserialize)]
struct ApiThreadMetadata {
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    locked: bool,
    #[serde(default)]
    archive_timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiThreadList {
    threads: Vec<ApiThread>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    id: String,
    channel_id: String,
    #[serde(default)]
    content: String,
    author: ApiUser,
    #[serde(default)]
    reactions: Vec<ApiReaction>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiReaction {
    count: u32,
    emoji: ApiEmoji,
}

#[derive(Debug, Deserialize)]
struct ApiEmoji {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

// ── Adapter ─────────────────────────────────────────────────────────

/// Discord platform adapter authenticated with a bot token.
pub struct DiscordPlatform {
    api_base: String,
    client: reqwest::Client,
}

impl DiscordPlatform {
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        let mut auth = HeaderValue::from_str(&format!("Bot {}", config.bot_token.expose_secret()))
            .map_err(|e| PlatformError::RequestFailed {
                endpoint: "client".into(),
                reason: format!("invalid bot token header: {e}"),
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("forum-curator/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PlatformError::RequestFailed {
                endpoint: "client".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// Query parameters are form-encoded, so cursors like `+00:00` survive.
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, self.api_url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
    }

    /// Send a request, waiting out rate limits. 404 yields `Ok(None)`.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Option<reqwest::Response>, PlatformError> {
        let mut attempts = 0;
        loop {
            let resp = self
                .request(method.clone(), path, query, body)
                .send().await.map_err(|e| PlatformError::RequestFailed {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })?;

            match resp.status() {
                status if status.is_success() => return Ok(Some(resp)),
                StatusCode::NOT_FOUND => return Ok(None),
                StatusCode::TOO_MANY_REQUESTS if attempts < MAX_RATE_LIMIT_RETRIES => {
                    attempts += 1;
                    let wait = resp
                        .json::<RateLimitBody>()
                        .await
                        .map(|b| b.retry_after)
                        .unwrap_or(1.0);
                    tracing::warn!(endpoint = path, retry_after = wait, "Rate limited, retrying");
                    tokio::time::sleep(Duration::from_secs_f64(wait.max(0.0))).await;
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    return Err(PlatformError::RateLimited {
                        endpoint: path.to_string(),
                    });
                }
                status => {
                    let text = resp.text().await.unwrap_or_default();
                    return Err(PlatformError::RequestFailed {
                        endpoint: path.to_string(),
                        reason: format!("{status}: {text}"),
                    });
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, PlatformError> {
        let Some(resp) = self.send(Method::GET, path, query, None).await? else {
            return Ok(None);
        };
        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| PlatformError::InvalidResponse {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn patch_thread(
        &self,
        thread: &CandidateThread,
        body: serde_json::Value,
    ) -> Result<(), PlatformError> {
        let path = format!("/channels/{}", thread.id);
        match self.send(Method::PATCH, &path, &[], Some(&body)).await? {
            Some(_) => Ok(()),
            None => Err(PlatformError::ThreadUpdateFailed {
                thread_id: thread.id.clone(),
                reason: "thread not found".into(),
            }),
        }
    }
}

#[async_trait]
impl ForumPlatform for DiscordPlatform {
    async fn get_forum_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<ForumChannel>, PlatformError> {
        let channel: Option<ApiChannel> = self
            .get_json(&format!("/channels/{channel_id}"), &[])
            .await?;
        Ok(channel.and_then(forum_from_api))
    }

    async fn list_open_threads(
        &self,
        channel: &ForumChannel,
    ) -> Result<Vec<CandidateThread>, PlatformError> {
        let guild_id = channel
            .guild_id
            .as_deref()
            .ok_or_else(|| PlatformError::InvalidResponse {
                endpoint: format!("/channels/{}", channel.id),
                reason: "forum channel has no guild".into(),
            })?;

        let path = format!("/guilds/{guild_id}/threads/active");
        let list: ApiThreadList = self.get_json(&path, &[]).await?.unwrap_or(ApiThreadList {
            threads: Vec::new(),
            has_more: false,
        });

        Ok(list
            .threads
            .into_iter()
            .filter(|t| t.parent_id.as_deref() == Some(channel.id.as_str()))
            .map(|t| thread_from_api(t, channel))
            .collect())
    }

    async fn list_archived_public_threads(
        &self,
        channel: &ForumChannel,
    ) -> Result<Vec<CandidateThread>, PlatformError> {
        let mut threads = Vec::new();
        let mut before: Option<String> = None;

        let path = format!("/channels/{}/threads/archived/public", channel.id);

        loop {
            let mut query = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(ts) = &before {
                query.push(("before", ts.clone()));
            }

            let Some(page) = self.get_json::<ApiThreadList>(&path, &query).await? else {
                break;
            };

            before = page
                .threads
                .last()
                .and_then(|t| t.thread_metadata.as_ref())
                .and_then(|m| m.archive_timestamp.clone());
            let has_more = page.has_more;
            threads.extend(page.threads.into_iter().map(|t| thread_from_api(t, channel)));

            if !has_more || before.is_none() {
                break;
            }
        }

        Ok(threads)
    }

    async fn get_first_message(
        &self,
        thread: &CandidateThread,
    ) -> Result<Option<Message>, PlatformError> {
        let path = format!("/channels/{}/messages", thread.id);
        let query = [("after", "0".to_string()), ("limit", "1".to_string())];
        let messages: Vec<ApiMessage> = self.get_json(&path, &query).await?.unwrap_or_default();
        Ok(messages
            .into_iter()
            .next()
            .map(|m| message_from_api(m, thread.guild_id.as_deref())))
    }

    async fn get_reacting_users(
        &self,
        message: &Message,
        emoji_id: &str,
    ) -> Result<Vec<String>, PlatformError> {
        // The reactions endpoint wants `name:id` for custom emoji.
        let Some(name) = message.reactions.iter().find_map(|r| match &r.emoji {
            Emoji::Custom { id, name } if id.eq_ignore_ascii_case(emoji_id) => Some(name.clone()),
            _ => None,
        }) else {
            return Ok(Vec::new());
        };

        let path = format!(
            "/channels/{}/messages/{}/reactions/{name}:{emoji_id}",
            message.channel_id, message.id
        );
        let mut users = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut query = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(last) = &after {
                query.push(("after", last.clone()));
            }

            let page: Vec<ApiUser> = self.get_json(&path, &query).await?.unwrap_or_default();
            let page_len = page.len();
            after = page.last().map(|u| u.id.clone());
            users.extend(page.into_iter().map(|u| u.id));

            if page_len < PAGE_LIMIT {
                break;
            }
        }

        Ok(users)
    }

    async fn set_archived(
        &self,
        thread: &CandidateThread,
        archived: bool,
    ) -> Result<(), PlatformError> {
        self.patch_thread(thread, serde_json::json!({ "archived": archived }))
            .await
    }

    async fn set_tags(
        &self,
        thread: &CandidateThread,
        tags: &[TagRef],
    ) -> Result<(), PlatformError> {
        let ids: Vec<&str> = tags.iter().map(|t| t.id.as_str()).collect();
        self.patch_thread(thread, serde_json::json!({ "applied_tags": ids }))
            .await
    }
}

// ── Conversions ─────────────────────────────────────────────────────

/// Creation time encoded in a snowflake id.
fn snowflake_timestamp(id: &str) -> DateTime<Utc> {
    id.parse::<u64>()
        .ok()
        .and_then(|raw| {
            let millis = (raw >> 22) as i64 + DISCORD_EPOCH_MS;
            Utc.timestamp_millis_opt(millis).single()
        })
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn jump_url(guild_id: Option<&str>, channel_id: &str, message_id: &str) -> String {
    format!(
        "https://discord.com/channels/{}/{channel_id}/{message_id}",
        guild_id.unwrap_or("@me")
    )
}

fn forum_from_api(channel: ApiChannel) -> Option<ForumChannel> {
    if channel.kind != GUILD_FORUM {
        return None;
    }
    Some(ForumChannel {
        name: channel.name.unwrap_or_else(|| channel.id.clone()),
        id: channel.id,
        guild_id: channel.guild_id,
        available_tags: channel
            .available_tags
            .into_iter()
            .map(|t| TagRef::new(t.id, t.name))
            .collect(),
    })
}

fn thread_from_api(thread: ApiThread, channel: &ForumChannel) -> CandidateThread {
    let tags = thread
        .applied_tags
        .iter()
        .map(|id| {
            channel
                .available_tags
                .iter()
                .find(|t| &t.id == id)
                .cloned()
                .unwrap_or_else(|| TagRef::new(id.clone(), String::new()))
        })
        .collect();
    let (archived, locked) = thread
        .thread_metadata
        .as_ref()
        .map(|m| (m.archived, m.locked))
        .unwrap_or((false, false));

    CandidateThread {
        name: thread.name.unwrap_or_default(),
        parent_id: thread.parent_id.unwrap_or_else(|| channel.id.clone()),
        guild_id: thread.guild_id.or_else(|| channel.guild_id.clone()),
        locked,
        archived,
        tags,
        // A forum post's starter message shares the thread's id.
        origin_message_id: thread.id.clone(),
        created_at: snowflake_timestamp(&thread.id),
        id: thread.id,
    }
}

fn message_from_api(message: ApiMessage, guild_id: Option<&str>) -> Message {
    let reactions = message
        .reactions
        .into_iter()
        .map(|r| Reaction {
            emoji: match r.emoji.id {
                Some(id) => Emoji::Custom {
                    id,
                    name: r.emoji.name.unwrap_or_default(),
                },
                None => Emoji::Unicode(r.emoji.name.unwrap_or_default()),
            },
            count: r.count,
        })
        .collect();

    Message {
        jump_url: jump_url(guild_id, &message.channel_id, &message.id),
        id: message.id,
        channel_id: message.channel_id,
        author_id: message.author.id,
        content: message.content,
        reactions,
    }
}
