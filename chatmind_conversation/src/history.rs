//! Context assembly from stored history.
//!
//! The model sees the chat's latest summary followed by a character-bounded
//! window of recent messages.

use chatmind_core::{ConversationStore, RecentWindow, render_lines};
use std::sync::Arc;
use tracing::warn;

/// Separator between the summary and the recent-message lines.
pub const RECENT_SEPARATOR: &str = "\n--- Recent:\n";

/// Builds the text context for one chat.
#[derive(Clone)]
pub struct ContextAssembler {
    store: Arc<dyn ConversationStore>,
    window: RecentWindow,
}

impl ContextAssembler {
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, window: RecentWindow) -> Self {
        Self { store, window }
    }

    #[must_use]
    pub const fn window(&self) -> RecentWindow {
        self.window
    }

    /// Summary and recent lines joined by [`RECENT_SEPARATOR`].
    ///
    /// Either half may be missing, in which case the other is returned on
    /// its own; a failed read counts as missing.
    pub async fn build(&self, chat_id: &str) -> String {
        let summary = match self.store.latest_summary(chat_id).await {
            Ok(summary) => summary.filter(|s| !s.trim().is_empty()),
            Err(e) => {
                warn!("Summary read failed for chat {chat_id}, continuing without it: {e}");
                None
            }
        };

        let recent = match self.store.recent_messages(chat_id, self.window).await {
            Ok(rows) if !rows.is_empty() => Some(render_lines(&rows)),
            Ok(_) => None,
            Err(e) => {
                warn!("Recent messages read failed for chat {chat_id}, continuing without them: {e}");
                None
            }
        };

        match (summary, recent) {
            (Some(summary), Some(recent)) => format!("{summary}{RECENT_SEPARATOR}{recent}"),
            (Some(only), None) | (None, Some(only)) => only,
            (None, None) => String::new(),
        }
    }
}
