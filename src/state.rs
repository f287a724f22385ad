// Application state shared by both front-end adapters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use reqwest::Client;

use crate::anytype::AnytypeClient;
use crate::anytype::transport::{HttpTransport, Transport};
use crate::config::Settings;
use crate::session::SessionStore;

/// Central application state. Clone-friendly — every field is an Arc or
/// cheaply cloneable. Both the REST handlers and the MCP tool server hold the
/// same `anytype` façade and therefore the same session store.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub anytype: AnytypeClient,
    pub start_time: Instant,
    /// `true` once the startup credential check has finished (or was skipped).
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");

        let transport = Arc::new(HttpTransport::new(client, settings.api_url.clone()));
        Self::with_transport(settings, transport)
    }

    /// Build state around an arbitrary transport. Integration tests inject
    /// stub transports through this.
    pub fn with_transport(settings: Settings, transport: Arc<dyn Transport>) -> Self {
        let session = match settings.startup_credential() {
            Some(token) => {
                tracing::info!("session: seeded from configured credential");
                SessionStore::seeded(token)
            }
            None => SessionStore::new(),
        };

        let anytype = AnytypeClient::new(transport, session, settings.app_name.clone());

        Self {
            settings: Arc::new(settings),
            anytype,
            start_time: Instant::now(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Relaxed);
        tracing::info!("Gateway marked as READY");
    }
}
