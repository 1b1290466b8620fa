//! Node record: one prompt/response exchange.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::clock::now;
use crate::record::Record;

/// Speaker of a text segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub role: Role,
    pub text: String,
}

/// Token statistics for one side of the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub role: Role,
    /// Tokens.
    pub count: u64,
    /// Seconds.
    pub duration: f64,
    /// Tokens per second.
    pub rate: f64,
}

impl Usage {
    pub fn new(role: Role, count: u64, duration: f64) -> Self {
        let rate = if duration > 0.0 {
            count as f64 / duration
        } else {
            0.0
        };
        Self {
            role,
            count,
            duration,
            rate,
        }
    }
}

/// Whether this node has been folded into a flow summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub updated: bool,
    pub last_built: DateTime<FixedOffset>,
}

/// A stored exchange.
///
/// Content is fixed at creation; only [`tags`](Node::tags) and
/// [`summary`](Node::summary) change afterwards. `id` and `timestamp` lead
/// the document so header extraction can stop early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub timestamp: DateTime<FixedOffset>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub usage: Vec<Usage>,
    pub summary: Summary,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Node {
    /// Build a node from fresh content, normalising every segment.
    pub fn from_new(id: impl Into<String>, new: NewNode) -> Self {
        let timestamp = now();
        Self {
            id: id.into(),
            timestamp,
            model: new.model,
            segments: new
                .segments
                .into_iter()
                .map(|s| Segment {
                    role: s.role,
                    text: normalize(&s.text),
                })
                .collect(),
            usage: new.usage,
            summary: Summary {
                updated: false,
                last_built: timestamp,
            },
            tags: new.tags,
        }
    }

    /// Text of the first segment spoken by `role`.
    pub fn text_of(&self, role: Role) -> Option<&str> {
        self.segments
            .iter()
            .find(|s| s.role == role)
            .map(|s| s.text.as_str())
    }
}

impl Record for Node {
    const KIND: &'static str = "node";
    const EXTENSION: &'static str = "yaml";
    const TIMESTAMP_KEY: &'static str = "timestamp";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    fn encode(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn decode(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Content for a node about to be created.
#[derive(Debug, Clone, Default)]
pub struct NewNode {
    pub model: String,
    pub segments: Vec<Segment>,
    pub usage: Vec<Usage>,
    pub tags: Vec<String>,
}

impl NewNode {
    /// A user prompt and the assistant's response.
    pub fn exchange(prompt: &str, response: &str, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            segments: vec![
                Segment {
                    role: Role::User,
                    text: prompt.to_string(),
                },
                Segment {
                    role: Role::Assistant,
                    text: response.to_string(),
                },
            ],
            ..Self::default()
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage.push(usage);
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags.extend(tags);
        self
    }
}

/// Strip trailing whitespace and unify line endings to `\n`.
pub fn normalize(text: &str) -> String {
    text.trim_end().replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a\r\nb\rc  \n\n"), "a\nb\nc");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("  leading kept"), "  leading kept");
    }

    #[test]
    fn test_from_new_normalises_segments() {
        let node = Node::from_new("n1", NewNode::exchange("hi\r\n", "hello\r\nthere  ", "gpt"));
        assert_eq!(node.text_of(Role::User), Some("hi"));
        assert_eq!(node.text_of(Role::Assistant), Some("hello\nthere"));
        assert_eq!(node.text_of(Role::System), None);
        assert!(!node.summary.updated);
        assert_eq!(node.summary.last_built, node.timestamp);
    }

    #[test]
    fn test_usage_rate() {
        assert_eq!(Usage::new(Role::User, 100, 4.0).rate, 25.0);
        assert_eq!(Usage::new(Role::Assistant, 10, 0.0).rate, 0.0);
    }

    #[test]
    fn test_document_leads_with_header() {
        let node = Node::from_new(
            "n1",
            NewNode::exchange("q", "a", "m").with_usage(Usage::new(Role::User, 3, 1.0)),
        );
        let text = node.encode().unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id: n1"));
        assert!(lines.next().unwrap().starts_with("timestamp: "));
        assert!(text.contains("role: assistant"));

        assert_eq!(Node::decode(&text).unwrap(), node);
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::System.to_string(), "system");
    }
}
