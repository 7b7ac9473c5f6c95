use serde::{Deserialize, Serialize};

/// Who wrote a transcript entry. Serialized as a plain string so persisted
/// history stays readable and forward-compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Author {
    User,
    Assistant,
}

impl Author {
    pub fn as_str(self) -> &'static str {
        match self {
            Author::User => "user",
            Author::Assistant => "assistant",
        }
    }

    /// Role string sent on the wire. Both backends use the same two roles.
    pub fn wire_role(self) -> &'static str {
        self.as_str()
    }

    pub fn is_user(self) -> bool {
        self == Author::User
    }

    pub fn is_assistant(self) -> bool {
        self == Author::Assistant
    }
}

impl AsRef<str> for Author {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Author {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Author::User),
            "assistant" => Ok(Author::Assistant),
            _ => Err(format!("invalid message author: {value}")),
        }
    }
}

impl TryFrom<String> for Author {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Author> for String {
    fn from(value: Author) -> Self {
        value.as_str().to_string()
    }
}

/// One transcript entry. Never mutated after creation; conversations are
/// updated by replacing their message sequence wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub author: Author,
}

impl Message {
    pub fn new(author: Author, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Author::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Author::Assistant, text)
    }

    pub fn is_user(&self) -> bool {
        self.author.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.author.is_assistant()
    }
}
