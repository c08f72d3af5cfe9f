//! Sentiment tally over a message's custom-emoji reactions.

use crate::config::EmojiConfig;
use crate::platform::Reaction;

/// Sentiment a reaction expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionSentiment {
    Agree,
    Neutral,
    Disagree,
}

impl ReactionSentiment {
    /// Map a reaction to a sentiment. Unicode and unknown emoji yield `None`.
    pub fn of(reaction: &Reaction, emoji: &EmojiConfig) -> Option<Self> {
        let id = reaction.emoji.custom_id()?;
        if id.eq_ignore_ascii_case(&emoji.agree_emoji_id) {
            Some(Self::Agree)
        } else if id.eq_ignore_ascii_case(&emoji.neutral_emoji_id) {
            Some(Self::Neutral)
        } else if id.eq_ignore_ascii_case(&emoji.disagree_emoji_id) {
            Some(Self::Disagree)
        } else {
            None
        }
    }
}

/// Reaction counts per sentiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentTally {
    pub agree: u32,
    pub neutral: u32,
    pub disagree: u32,
}

impl SentimentTally {
    /// Sum reaction counts for the three configured emoji.
    pub fn from_reactions(reactions: &[Reaction], emoji: &EmojiConfig) -> Self {
        reactions
            .iter()
            .fold(Self::default(), |mut tally, reaction| {
                let slot = match ReactionSentiment::of(reaction, emoji) {
                    Some(ReactionSentiment::Agree) => &mut tally.agree,
                    Some(ReactionSentiment::Neutral) => &mut tally.neutral,
                    Some(ReactionSentiment::Disagree) => &mut tally.disagree,
                    None => return tally,
                };
                *slot = slot.saturating_add(reaction.count);
                tally
            })
    }
}
