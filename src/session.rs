//! Session/token store — the single authoritative holder of the bearer
//! credential and the in-flight pairing challenge.
//!
//! Both front ends share one instance via `AppState`, so a credential minted
//! through the REST surface authorizes tool invocations and vice versa, and
//! invalidation triggered by one request is visible to every request that
//! starts after it. No network access happens here.

use std::sync::Arc;

use tokio::sync::RwLock;

/// Challenge issued by the upstream app, waiting to be exchanged for a token.
#[derive(Debug, Clone)]
pub struct PendingChallenge {
    pub challenge_id: String,
    /// Code displayed in the Anytype window (not always echoed back).
    pub code: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    credential: Option<String>,
    challenge: Option<PendingChallenge>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    /// Empty store — the gateway starts unauthenticated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a configured credential (API key or app key).
    pub fn seeded(token: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState {
                credential: Some(token.into()),
                challenge: None,
            })),
        }
    }

    /// Replace the stored credential unconditionally. Does not verify it.
    pub async fn set_credential(&self, token: impl Into<String>) {
        self.inner.write().await.credential = Some(token.into());
    }

    pub async fn current_credential(&self) -> Option<String> {
        self.inner.read().await.credential.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.credential.is_some()
    }

    /// Clear the stored credential. Idempotent.
    pub async fn invalidate(&self) {
        let mut state = self.inner.write().await;
        if state.credential.take().is_some() {
            tracing::info!("session: credential invalidated");
        }
    }

    /// Record a freshly issued challenge, replacing any previous one.
    pub async fn begin_challenge(&self, challenge: PendingChallenge) {
        self.inner.write().await.challenge = Some(challenge);
    }

    /// The challenge currently awaiting exchange, if any. The challenge is
    /// kept until an exchange succeeds so a mistyped code can be retried.
    pub async fn pending_challenge(&self) -> Option<PendingChallenge> {
        self.inner.read().await.challenge.clone()
    }

    /// Called on a successful exchange — the challenge is consumed exactly once.
    pub async fn clear_challenge(&self) {
        self.inner.write().await.challenge = None;
    }
}
