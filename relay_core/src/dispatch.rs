//! Multi-credential completion dispatch.
//!
//! The pool is walked in fixed order on every call. Only quota failures move
//! on to the next credential; any other failure ends the attempt.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    ChatMessage, CompletionClient, CompletionRequest, Error, Pacer, Result, UpstreamError,
};

pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 256;

/// An upstream API credential bound to its own client handle.
#[derive(Clone)]
pub struct Credential {
    label: String,
    client: Arc<dyn CompletionClient>,
}

impl Credential {
    pub fn new(label: impl Into<String>, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            label: label.into(),
            client,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Ordered, non-empty set of credentials. The first entry is the primary.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    pub fn new(credentials: Vec<Credential>) -> Result<Self> {
        if credentials.is_empty() {
            return Err(Error::ConfigMissing(
                "at least one upstream API key is required".to_string(),
            ));
        }
        Ok(Self { credentials })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }
}

pub struct CompletionDispatcher {
    pool: CredentialPool,
    pacer: Arc<dyn Pacer>,
    model: String,
}

impl CompletionDispatcher {
    pub fn new(pool: CredentialPool, pacer: Arc<dyn Pacer>, model: impl Into<String>) -> Self {
        Self {
            pool,
            pacer,
            model: model.into(),
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub const fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// Obtain one completion for `messages`.
    ///
    /// The pacing delay is charged once, before the first credential is tried.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.pacer.pause().await;

        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let last = self.pool.len() - 1;
        for (index, credential) in self.pool.iter().enumerate() {
            match credential.client.complete(&request).await {
                Ok(response) => {
                    info!("Completion served by API {}", credential.label);
                    if let Some(usage) = response.usage {
                        debug!(
                            "Token usage: prompt={} completion={} total={}",
                            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                        );
                    }
                    return Ok(response.content);
                }
                Err(UpstreamError::Quota(message)) => {
                    let err = Error::QuotaExceeded { index, message };
                    if index == last {
                        warn!("{err}; no credentials left");
                        return Err(Error::PoolExhausted {
                            attempts: self.pool.len(),
                        });
                    }
                    warn!("{err}; trying next credential");
                }
                Err(UpstreamError::Other(message)) => {
                    return Err(Error::Upstream { index, message });
                }
            }
        }

        Err(Error::PoolExhausted {
            attempts: self.pool.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LLMResponse, NoDelay};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        outcome: std::result::Result<&'static str, UpstreamError>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                outcome: Ok(text),
                calls: AtomicUsize::new(0),
            })
        }

        fn quota() -> Arc<Self> {
            Arc::new(Self {
                outcome: Err(UpstreamError::Quota("429".to_string())),
                calls: AtomicUsize::new(0),
            })
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self {
                outcome: Err(UpstreamError::Other("401 unauthorized".to_string())),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for Scripted {
        async fn complete(
            &self,
            request: &CompletionRequest<'_>,
        ) -> std::result::Result<LLMResponse, UpstreamError> {
            assert!((request.temperature - TEMPERATURE).abs() < f32::EPSILON);
            assert_eq!(request.max_tokens, MAX_TOKENS);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone().map(|text| LLMResponse {
                content: text.to_string(),
                usage: None,
            })
        }
    }

    fn dispatcher(clients: &[Arc<Scripted>]) -> CompletionDispatcher {
        let credentials = clients
            .iter()
            .enumerate()
            .map(|(i, c)| Credential::new(format!("key #{}", i + 1), c.clone()))
            .collect();
        CompletionDispatcher::new(
            CredentialPool::new(credentials).unwrap(),
            Arc::new(NoDelay),
            "test-model",
        )
    }

    fn history() -> Vec<ChatMessage> {
        vec![ChatMessage::system("sys"), ChatMessage::user("Alice: hi")]
    }

    #[test]
    fn empty_pool_is_a_config_error() {
        let err = CredentialPool::new(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn primary_success_skips_the_rest() {
        let clients = [Scripted::ok("first"), Scripted::ok("second")];
        let result = dispatcher(&clients).complete(&history()).await.unwrap();
        assert_eq!(result, "first");
        assert_eq!(clients[0].calls(), 1);
        assert_eq!(clients[1].calls(), 0);
    }

    #[tokio::test]
    async fn quota_fails_over_in_order_and_stops_at_first_success() {
        let clients = [
            Scripted::quota(),
            Scripted::quota(),
            Scripted::ok("third"),
            Scripted::ok("fourth"),
        ];
        let result = dispatcher(&clients).complete(&history()).await.unwrap();
        assert_eq!(result, "third");
        assert_eq!(
            clients.iter().map(|c| c.calls()).collect::<Vec<_>>(),
            vec![1, 1, 1, 0]
        );
    }

    #[tokio::test]
    async fn all_quota_exhausts_the_pool() {
        let clients = [Scripted::quota(), Scripted::quota(), Scripted::quota()];
        let err = dispatcher(&clients).complete(&history()).await.unwrap_err();
        assert!(matches!(err, Error::PoolExhausted { attempts: 3 }));
        assert!(clients.iter().all(|c| c.calls() == 1));
    }

    #[tokio::test]
    async fn other_failure_is_not_failed_over() {
        let clients = [Scripted::quota(), Scripted::broken(), Scripted::ok("unused")];
        let err = dispatcher(&clients).complete(&history()).await.unwrap_err();
        assert!(matches!(err, Error::Upstream { index: 1, .. }));
        assert_eq!(clients[2].calls(), 0);
    }

    #[tokio::test]
    async fn every_call_restarts_from_the_primary() {
        let clients = [Scripted::quota(), Scripted::ok("backup")];
        let dispatcher = dispatcher(&clients);
        dispatcher.complete(&history()).await.unwrap();
        dispatcher.complete(&history()).await.unwrap();
        assert_eq!(clients[0].calls(), 2);
        assert_eq!(clients[1].calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_is_charged_once_per_call() {
        let clients = [Scripted::quota(), Scripted::quota(), Scripted::ok("late")];
        let credentials = clients
            .iter()
            .map(|c| Credential::new("key", c.clone() as Arc<dyn CompletionClient>))
            .collect();
        let pacer = crate::HumanPacer::new(
            std::time::Duration::from_secs(5),
            std::time::Duration::from_secs(5),
        );
        let dispatcher = CompletionDispatcher::new(
            CredentialPool::new(credentials).unwrap(),
            Arc::new(pacer),
            "test-model",
        );
        let started = tokio::time::Instant::now();
        dispatcher.complete(&history()).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= std::time::Duration::from_secs(5));
        assert!(elapsed < std::time::Duration::from_secs(6));
    }
}
