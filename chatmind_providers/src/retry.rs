use async_trait::async_trait;
use chatmind_core::GatewayError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Real wall-clock sleeping on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Source of jitter samples in `[0.0, 1.0)`.
pub trait Jitter: Send + Sync {
    fn sample(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn sample(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Always returns the same sample.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// Bounded retry with exponential backoff for rate limits and transient
/// failures and a fixed pause for everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Pause after an error that is neither rate limited nor transient.
    pub fixed_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_backoff: Duration::from_millis(800),
            max_backoff: Duration::from_secs(8),
            fixed_delay: Duration::from_millis(1200),
        }
    }
}

impl RetryPolicy {
    /// Backoff before jitter for the `step`-th backoff retry (zero based).
    #[must_use]
    pub fn backoff(&self, step: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(1_u32 << step.min(31))
            .min(self.max_backoff)
    }

    /// Delay before the next attempt. `step` only advances on backoff
    /// errors; `jitter` is clamped into `[0.0, 1.0]`.
    #[must_use]
    pub fn delay_for(&self, err: &GatewayError, step: u32, jitter: f64) -> Duration {
        if err.wants_backoff() {
            let base = self.backoff(step);
            base + base.mul_f64(jitter.clamp(0.0, 1.0))
        } else {
            self.fixed_delay
        }
    }

    /// Run `operation` until it succeeds, returns a terminal error, or the
    /// attempt budget is spent.
    ///
    /// # Returns
    /// The first success, or [`GatewayError::Exhausted`] carrying the last
    /// error once `max_attempts` attempts have failed.
    pub async fn run<F, Fut, T>(
        &self,
        sleeper: &dyn Sleeper,
        jitter: &dyn Jitter,
        mut operation: F,
    ) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut step = 0_u32;
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_terminal() => return Err(err),
                Err(err) => err,
            };

            if attempt >= max_attempts {
                warn!("Model request failed (attempt {attempt}/{max_attempts}): {err}. Giving up");
                return Err(GatewayError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.delay_for(&err, step, jitter.sample());
            if err.wants_backoff() {
                step += 1;
            }
            warn!(
                "Model request failed (attempt {attempt}/{max_attempts}): {err}. Retrying after {:.2}s...",
                delay.as_secs_f64()
            );
            sleeper.sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records requested delays instead of sleeping.
    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    async fn run_scripted(
        policy: &RetryPolicy,
        sleeper: &RecordingSleeper,
        jitter: f64,
        failures: Vec<GatewayError>,
    ) -> (Result<&'static str, GatewayError>, usize) {
        let attempts = Arc::new(AtomicUsize::new(0));
        let script = Arc::new(failures);
        let result = policy
            .run(sleeper, &FixedJitter(jitter), || {
                let attempts = attempts.clone();
                let script = script.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    script.get(n).cloned().map_or(Ok("done"), Err)
                }
            })
            .await;
        (result, attempts.load(Ordering::SeqCst))
    }

    fn transient() -> GatewayError {
        GatewayError::Transient("503".to_string())
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let steps: Vec<u128> = (0..7).map(|s| policy.backoff(s).as_millis()).collect();
        assert_eq!(steps, vec![800, 1600, 3200, 6400, 8000, 8000, 8000]);
    }

    #[test]
    fn jitter_adds_at_most_one_backoff_unit() {
        let policy = RetryPolicy::default();
        let err = GatewayError::RateLimited("429".to_string());
        assert_eq!(policy.delay_for(&err, 1, 0.0), Duration::from_millis(1600));
        assert_eq!(policy.delay_for(&err, 1, 0.5), Duration::from_millis(2400));
        assert_eq!(policy.delay_for(&err, 1, 7.0), Duration::from_millis(3200));
    }

    #[test]
    fn other_errors_use_fixed_delay() {
        let policy = RetryPolicy::default();
        let err = GatewayError::Fatal("bad request".to_string());
        assert_eq!(policy.delay_for(&err, 3, 0.9), Duration::from_millis(1200));
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt_without_sleeping() {
        let sleeper = RecordingSleeper::default();
        let (result, attempts) =
            run_scripted(&RetryPolicy::default(), &sleeper, 0.0, Vec::new()).await;
        assert_eq!(result, Ok("done"));
        assert_eq!(attempts, 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let policy = RetryPolicy::default();
        for k in 1..6 {
            let sleeper = RecordingSleeper::default();
            let (result, attempts) =
                run_scripted(&policy, &sleeper, 0.0, vec![transient(); k]).await;

            assert_eq!(result, Ok("done"));
            assert_eq!(attempts, k + 1);
            let delays = sleeper.delays.lock().unwrap().clone();
            assert_eq!(delays.len(), k);
            assert!(delays.windows(2).all(|w| w[0] <= w[1]));
            assert!(delays.iter().all(|d| *d <= Duration::from_secs(8)));
        }
    }

    #[tokio::test]
    async fn jittered_delays_stay_within_two_backoff_units() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();
        let (result, _) = run_scripted(&policy, &sleeper, 0.99, vec![transient(); 5]).await;

        assert_eq!(result, Ok("done"));
        let delays = sleeper.delays.lock().unwrap().clone();
        for (step, delay) in (0_u32..).zip(delays) {
            let base = policy.backoff(step);
            assert!(delay >= base && delay < base * 2);
        }
    }

    #[tokio::test]
    async fn gives_up_after_six_attempts() {
        let sleeper = RecordingSleeper::default();
        let (result, attempts) =
            run_scripted(&RetryPolicy::default(), &sleeper, 0.0, vec![transient(); 6]).await;

        assert_eq!(attempts, 6);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 5);
        match result {
            Err(GatewayError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 6);
                assert_eq!(*last, transient());
            }
            other => panic!("expected exhausted error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mixed_errors_only_advance_backoff_on_transient() {
        let sleeper = RecordingSleeper::default();
        let failures = vec![
            transient(),
            GatewayError::Fatal("400".to_string()),
            transient(),
        ];
        let (result, _) = run_scripted(&RetryPolicy::default(), &sleeper, 0.0, failures).await;

        assert_eq!(result, Ok("done"));
        let delays: Vec<u128> = sleeper
            .delays
            .lock()
            .unwrap()
            .iter()
            .map(Duration::as_millis)
            .collect();
        assert_eq!(delays, vec![800, 1200, 1600]);
    }

    #[tokio::test]
    async fn cancellation_is_not_retried() {
        let sleeper = RecordingSleeper::default();
        let (result, attempts) = run_scripted(
            &RetryPolicy::default(),
            &sleeper,
            0.0,
            vec![GatewayError::Cancelled],
        )
        .await;
        assert_eq!(result, Err(GatewayError::Cancelled));
        assert_eq!(attempts, 1);
    }
}
