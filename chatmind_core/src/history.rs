//! Stored conversation rows and the character-budget window over them.

use serde::{Deserialize, Serialize};

/// Author of a stored turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(anyhow::anyhow!("unknown message role: {s}")),
        }
    }
}

impl From<MessageRole> for crate::Role {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Self::User,
            MessageRole::Assistant => Self::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: i64,
    pub chat_id: String,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub role: MessageRole,
    pub content: String,
    /// Epoch seconds.
    pub ts: i64,
}

impl StoredMessage {
    /// `ROLE(name): content`, falling back to the role for anonymous rows.
    #[must_use]
    pub fn render(&self) -> String {
        let name = self.username.as_deref().unwrap_or(self.role.as_str());
        format!(
            "{}({name}): {}",
            self.role.as_str().to_uppercase(),
            self.content
        )
    }
}

/// Which end of the row window survives when it overflows the budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKeep {
    /// Accumulate from the oldest row forward; the newest rows are dropped.
    #[default]
    Oldest,
    /// Accumulate from the newest row backward; the oldest rows are dropped.
    Newest,
}

/// How many rows to fetch and how many rendered characters to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentWindow {
    pub row_limit: usize,
    pub char_budget: usize,
    pub keep: BudgetKeep,
}

impl RecentWindow {
    pub const DEFAULT_ROW_LIMIT: usize = 300;

    #[must_use]
    pub const fn new(row_limit: usize, char_budget: usize) -> Self {
        Self {
            row_limit,
            char_budget,
            keep: BudgetKeep::Oldest,
        }
    }

    #[must_use]
    pub const fn with_keep(mut self, keep: BudgetKeep) -> Self {
        self.keep = keep;
        self
    }

    /// Trim ascending rows to the character budget.
    ///
    /// Rows are accumulated until the running rendered length reaches the
    /// budget; the row that crosses it is kept, so the result overshoots by
    /// at most one line.
    #[must_use]
    pub fn apply(&self, ascending: Vec<StoredMessage>) -> Vec<StoredMessage> {
        let mut total = 0_usize;
        match self.keep {
            BudgetKeep::Oldest => {
                let mut kept = Vec::new();
                for message in ascending {
                    total += message.render().chars().count();
                    kept.push(message);
                    if total >= self.char_budget {
                        break;
                    }
                }
                kept
            }
            BudgetKeep::Newest => {
                let mut kept = Vec::new();
                for message in ascending.into_iter().rev() {
                    total += message.render().chars().count();
                    kept.push(message);
                    if total >= self.char_budget {
                        break;
                    }
                }
                kept.reverse();
                kept
            }
        }
    }
}

impl Default for RecentWindow {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROW_LIMIT, 6000)
    }
}

/// One rendered line per message, newline separated.
#[must_use]
pub fn render_lines(messages: &[StoredMessage]) -> String {
    messages
        .iter()
        .map(StoredMessage::render)
        .collect::<Vec<_>>()
        .join("\n")
}
