//! Environment configuration, loaded once at startup.
//!
//! Two authentication flows are recognized:
//! - `ANYTYPE_API_KEY` — a long-lived key; the session store starts
//!   authenticated with it.
//! - `ANYTYPE_SESSION_TOKEN` + `ANYTYPE_APP_KEY` — a pairing-derived pair;
//!   the app key seeds the store.
//!
//! With neither set, the gateway starts unauthenticated and the interactive
//! display-code flow mints the credential.

use anyhow::Context;

const DEFAULT_API_URL: &str = "http://localhost:31009";
const DEFAULT_APP_NAME: &str = "anytype-gateway";
const DEFAULT_PORT: u16 = 8082;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the local Anytype application's HTTP API.
    pub api_url: String,
    pub api_key: Option<String>,
    pub session_token: Option<String>,
    pub app_key: Option<String>,
    /// App name shown in the Anytype pairing dialog.
    pub app_name: String,
    pub port: u16,
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url = env_opt("ANYTYPE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        url::Url::parse(&api_url)
            .with_context(|| format!("ANYTYPE_API_URL is not a valid URL: {api_url}"))?;

        let port = match env_opt("PORT") {
            Some(p) => p.parse().with_context(|| format!("PORT is not a number: {p}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: env_opt("ANYTYPE_API_KEY"),
            session_token: env_opt("ANYTYPE_SESSION_TOKEN"),
            app_key: env_opt("ANYTYPE_APP_KEY"),
            app_name: env_opt("ANYTYPE_APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            port,
        })
    }

    /// Credential the session store is seeded with at startup, if any.
    /// A long-lived API key wins over the session-token/app-key pair.
    pub fn startup_credential(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            return Some(key.clone());
        }
        match (&self.session_token, &self.app_key) {
            (Some(_), Some(app_key)) => Some(app_key.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Settings {
        Settings {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            session_token: None,
            app_key: None,
            app_name: DEFAULT_APP_NAME.to_string(),
            port: DEFAULT_PORT,
        }
    }

    #[test]
    fn api_key_seeds_credential() {
        let mut s = base();
        s.api_key = Some("key-1".into());
        assert_eq!(s.startup_credential().as_deref(), Some("key-1"));
    }

    #[test]
    fn session_pair_seeds_app_key() {
        let mut s = base();
        s.session_token = Some("sess".into());
        s.app_key = Some("app".into());
        assert_eq!(s.startup_credential().as_deref(), Some("app"));
    }

    #[test]
    fn app_key_alone_does_not_seed() {
        let mut s = base();
        s.app_key = Some("app".into());
        assert_eq!(s.startup_credential(), None);
    }

    #[test]
    fn api_key_wins_over_pair() {
        let mut s = base();
        s.api_key = Some("key-1".into());
        s.session_token = Some("sess".into());
        s.app_key = Some("app".into());
        assert_eq!(s.startup_credential().as_deref(), Some("key-1"));
    }
}
