//! Model invocation with retry, backoff and cancellation.

use chatmind_core::{ChatMessage, GatewayError, LLMProvider};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::retry::{Jitter, RandomJitter, RetryPolicy, Sleeper, TokioSleeper};

/// Wraps an [`LLMProvider`] with a [`RetryPolicy`].
pub struct ModelGateway<P> {
    provider: P,
    model: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    jitter: Arc<dyn Jitter>,
}

impl<P: LLMProvider> ModelGateway<P> {
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(RandomJitter),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: Arc<dyn Jitter>) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// `[system persona, optional system context block, user turn]`.
    ///
    /// A blank context produces no context block.
    #[must_use]
    pub fn compose(persona: &str, context: Option<&str>, user_turn: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(persona)];
        if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
            messages.push(ChatMessage::system(format!(
                "Chat memory (summary and recent messages):\n{context}"
            )));
        }
        messages.push(ChatMessage::user(user_turn));
        messages
    }

    /// Send `messages` to the model, retrying per the policy.
    ///
    /// # Returns
    /// The generated text with surrounding whitespace removed. An empty
    /// completion counts as a failed attempt.
    pub async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, GatewayError> {
        debug!(
            "Invoking model {} with {} messages",
            self.model,
            messages.len()
        );
        let text = self
            .policy
            .run(self.sleeper.as_ref(), self.jitter.as_ref(), move || async move {
                let response = self.provider.chat(messages, &self.model).await?;
                let text = response.content.trim();
                if text.is_empty() {
                    Err(GatewayError::Fatal("model returned an empty completion".into()))
                } else {
                    Ok(text.to_string())
                }
            })
            .await?;
        info!("Model {} replied with {} chars", self.model, text.len());
        Ok(text)
    }

    /// Like [`invoke`](Self::invoke) but abandons the call, including any
    /// pending retry sleep, once `cancel` fires.
    pub async fn invoke_cancellable(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<String, GatewayError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(GatewayError::Cancelled),
            result = self.invoke(messages) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::FixedJitter;
    use async_trait::async_trait;
    use chatmind_core::{LLMResponse, Role};
    use std::sync::Mutex;
    use std::time::Duration;

    struct Scripted {
        replies: Mutex<Vec<Result<String, GatewayError>>>,
        seen_models: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<String, GatewayError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                seen_models: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for Scripted {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            model: &str,
        ) -> Result<LLMResponse, GatewayError> {
            self.seen_models.lock().unwrap().push(model.to_string());
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(GatewayError::Fatal("script exhausted".into())));
            next.map(|content| LLMResponse {
                content,
                usage: None,
            })
        }

        fn get_default_model(&self) -> &'static str {
            "scripted"
        }
    }

    struct NoSleep;

    #[async_trait]
    impl Sleeper for NoSleep {
        async fn sleep(&self, _delay: Duration) {}
    }

    fn gateway(replies: Vec<Result<String, GatewayError>>) -> ModelGateway<Scripted> {
        ModelGateway::new(Scripted::new(replies), "test-model")
            .with_sleeper(Arc::new(NoSleep))
            .with_jitter(Arc::new(FixedJitter(0.0)))
    }

    #[test]
    fn compose_orders_persona_context_user() {
        let messages = ModelGateway::<Scripted>::compose("persona", Some("notes"), "question");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "persona");
        assert_eq!(messages[1].role, Role::System);
        assert!(messages[1].content.ends_with("notes"));
        assert_eq!(messages[2].role, Role::User);
        assert_eq!(messages[2].content, "question");
    }

    #[test]
    fn compose_skips_blank_context() {
        assert_eq!(ModelGateway::<Scripted>::compose("p", Some("  "), "q").len(), 2);
        assert_eq!(ModelGateway::<Scripted>::compose("p", None, "q").len(), 2);
    }

    #[tokio::test]
    async fn invoke_trims_output_and_uses_model() {
        let gateway = gateway(vec![Ok("  answer \n".to_string())]);
        let text = gateway.invoke(&[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(text, "answer");
        assert_eq!(
            *gateway.provider.seen_models.lock().unwrap(),
            vec!["test-model".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_completion_is_retried() {
        let gateway = gateway(vec![Ok("   ".to_string()), Ok("second".to_string())]);
        let text = gateway.invoke(&[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(text, "second");
    }

    #[tokio::test]
    async fn exhausting_attempts_is_terminal() {
        let failures = (0..6)
            .map(|_| Err(GatewayError::RateLimited("429".into())))
            .collect();
        let gateway = gateway(failures);
        let err = gateway.invoke(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(err.is_terminal());
        assert_eq!(gateway.provider.seen_models.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_call() {
        let gateway = gateway(vec![Ok("never".to_string())]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = gateway
            .invoke_cancellable(&[ChatMessage::user("hi")], &cancel)
            .await;
        assert_eq!(result, Err(GatewayError::Cancelled));
    }
}
