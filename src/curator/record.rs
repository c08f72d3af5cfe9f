//! The persisted outcome for a greenlit or docced thread.

use serde::{Deserialize, Serialize};

use crate::curator::tally::SentimentTally;
use crate::error::PlatformError;
use crate::platform::{CandidateThread, ForumChannel, ForumPlatform, Message};

/// Durable decision record, upserted by `message_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurationRecord {
    pub message_id: String,
    pub author_id: String,
    pub suggestion_url: String,
    pub suggestion_title: String,
    pub suggestion_timestamp_millis: i64,
    pub suggestion_content: String,
    /// Tag names at decision time.
    pub tags: Vec<String>,
    pub agrees: u32,
    pub neutrals: u32,
    pub disagrees: u32,
    pub is_alpha_channel: bool,
    pub positive_voter_ids: Vec<String>,
}

impl CurationRecord {
    /// Assemble a record from already-fetched pieces.
    pub fn new(
        channel: &ForumChannel,
        message: &Message,
        thread: &CandidateThread,
        tally: SentimentTally,
        positive_voter_ids: Vec<String>,
    ) -> Self {
        Self {
            message_id: message.id.clone(),
            author_id: message.author_id.clone(),
            suggestion_url: message.jump_url.clone(),
            suggestion_title: thread.name.clone(),
            suggestion_timestamp_millis: thread.created_at.timestamp_millis(),
            suggestion_content: message.content.clone(),
            tags: thread.tag_names(),
            agrees: tally.agree,
            neutrals: tally.neutral,
            disagrees: tally.disagree,
            is_alpha_channel: channel.is_alpha(),
            positive_voter_ids,
        }
    }
}

/// Build a record, resolving the agree voters through the platform.
///
/// Used for both the already-finalized and the freshly approved path.
pub async fn build_record(
    platform: &dyn ForumPlatform,
    channel: &ForumChannel,
    message: &Message,
    thread: &CandidateThread,
    tally: SentimentTally,
    agree_emoji_id: &str,
) -> Result<CurationRecord, PlatformError> {
    let voters = platform.get_reacting_users(message, agree_emoji_id).await?;
    Ok(CurationRecord::new(channel, message, thread, tally, voters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::TagRef;
    use crate::testing::{FakePlatform, forum, message_with, thread};

    #[test]
    fn record_snapshots_thread_and_message() {
        let channel = forum("alpha-suggestions");
        let mut t = thread("500", "More pets");
        t.tags = vec![TagRef::new("1", "Greenlit"), TagRef::new("3", "Reviewed")];
        let message = message_with("500", &[("agree", 3)]);
        let tally = SentimentTally {
            agree: 3,
            neutral: 1,
            disagree: 0,
        };

        let record = CurationRecord::new(&channel, &message, &t, tally, vec!["u1".into()]);

        assert_eq!(record.message_id, "500");
        assert_eq!(record.suggestion_title, "More pets");
        assert_eq!(record.suggestion_timestamp_millis, t.created_at.timestamp_millis());
        assert_eq!(record.tags, vec!["Greenlit", "Reviewed"]);
        assert_eq!((record.agrees, record.neutrals, record.disagrees), (3, 1, 0));
        assert!(record.is_alpha_channel);
        assert_eq!(record.positive_voter_ids, vec!["u1"]);
    }

    #[test]
    fn record_serializes_camel_case() {
        let channel = forum("suggestions");
        let t = thread("500", "More pets");
        let message = message_with("500", &[]);
        let record =
            CurationRecord::new(&channel, &message, &t, SentimentTally::default(), vec![]);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("messageId").is_some());
        assert!(json.get("suggestionTimestampMillis").is_some());
        assert_eq!(json["isAlphaChannel"], false);
    }

    #[tokio::test]
    async fn build_record_fetches_agree_voters() {
        let platform = FakePlatform::new(forum("suggestions"));
        let message = message_with("500", &[("agree", 2)]);
        platform.set_voters("500", "agree", &["u1", "u2"]);
        let t = thread("500", "More pets");

        let record = build_record(
            &platform,
            &forum("suggestions"),
            &message,
            &t,
            SentimentTally {
                agree: 2,
                neutral: 0,
                disagree: 0,
            },
            "agree",
        )
        .await
        .unwrap();

        assert_eq!(record.positive_voter_ids, vec!["u1", "u2"]);
    }
}
