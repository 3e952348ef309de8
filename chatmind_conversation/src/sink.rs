use async_trait::async_trait;

/// Where replies and error notices go.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn emit(&self, chat_id: &str, text: &str) -> anyhow::Result<()>;

    /// Signal that a reply is being generated. Best effort.
    async fn typing(&self, _chat_id: &str) {}
}
