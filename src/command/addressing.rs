//! Deciding whether a PRIVMSG is meant for the bot.

/// How a command reached the bot, which decides where replies go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    /// Private message to the bot; replies go back to the sender.
    Direct,
    /// `"<nick>: ..."` in a channel; replies go to the channel, prefixed.
    Mention { channel: String },
}

/// A PRIVMSG addressed to the bot, with the command text extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addressed {
    pub sender: String,
    pub addressing: Addressing,
    pub text: String,
}

impl Addressed {
    /// Classify a PRIVMSG from `sender` to `target` given the bot's current
    /// nickname. Returns `None` for channel chatter not addressed to us.
    pub fn classify(sender: &str, target: &str, text: &str, nickname: &str) -> Option<Self> {
        let direct = target == nickname;
        let mention = text
            .strip_prefix(nickname)
            .and_then(|rest| rest.strip_prefix(':'));

        let text = match (mention, direct) {
            (Some(rest), _) => rest.trim(),
            (None, true) => text.trim(),
            (None, false) => return None,
        };

        let addressing = if direct {
            Addressing::Direct
        } else {
            Addressing::Mention {
                channel: target.to_string(),
            }
        };

        Some(Self {
            sender: sender.to_string(),
            addressing,
            text: text.to_string(),
        })
    }

    /// Where replies are sent.
    pub fn reply_target(&self) -> &str {
        match &self.addressing {
            Addressing::Direct => &self.sender,
            Addressing::Mention { channel } => channel,
        }
    }

    /// Format one reply line for [`Self::reply_target`].
    pub fn format_reply(&self, line: &str) -> String {
        match self.addressing {
            Addressing::Direct => line.to_string(),
            Addressing::Mention { .. } => format!("{}: {}", self.sender, line),
        }
    }
}
