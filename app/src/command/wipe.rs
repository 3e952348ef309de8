use chatmind_core::ConversationStore;

use super::init_common_components;

/// Input for the Wipe command.
#[derive(Debug, Clone)]
pub struct WipeInput {
    pub chat_id: String,
}

/// Strategy for deleting one chat's messages and summaries.
#[derive(Debug, Clone, Copy)]
pub struct WipeStrategy;

impl super::CommandStrategy for WipeStrategy {
    type Input = WipeInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components().await?;
        let before = common.store.message_count(&input.chat_id).await?;
        common.store.wipe(&input.chat_id).await?;
        println!("Wiped chat {} ({before} messages)", input.chat_id);
        Ok(())
    }
}
