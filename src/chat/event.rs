//! Inbound chat events and tokenization.

/// A chat participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Stable user id.
    pub id: String,

    /// Display name.
    pub full_name: String,

    /// Known email addresses, most relevant first.
    pub emails: Vec<String>,
}

impl User {
    /// Creates a user without emails.
    #[must_use]
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            emails: Vec::new(),
        }
    }

    /// Adds an email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into());
        self
    }

    /// Last word of the display name, used for sorting listings.
    #[must_use]
    pub fn last_name(&self) -> &str {
        self.full_name
            .split_whitespace()
            .last()
            .unwrap_or(&self.full_name)
    }
}

/// A conversation (room, channel, or direct chat).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// Stable conversation id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Current participants.
    pub users: Vec<User>,
}

impl Conversation {
    /// Creates a conversation with the given participants.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, users: Vec<User>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            users,
        }
    }
}

/// A message received from the transport.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    /// Who sent the message.
    pub user: User,

    /// Where it was sent.
    pub conversation: Conversation,

    /// Raw message text.
    pub text: String,
}

impl ChatEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(user: User, conversation: Conversation, text: impl Into<String>) -> Self {
        Self {
            user,
            conversation,
            text: text.into(),
        }
    }

    /// Id of the conversation the message came from.
    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation.id
    }
}

/// Splits message text into whitespace-separated tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_owned).collect()
}

/// Returns the tokens of `text` if it is a command, i.e. its first token
/// starts with `marker` and has something after it.
#[must_use]
pub fn command_tokens(text: &str, marker: char) -> Option<Vec<String>> {
    let tokens = tokenize(text);
    let first = tokens.first()?;
    let name = first.strip_prefix(marker)?;
    if name.is_empty() {
        return None;
    }
    Some(tokens)
}
