//! Récupération du texte brut d'un document de description.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use ureq::Agent;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("Unsupported location scheme: {0}")]
    UnsupportedScheme(String),
}

/// Source du texte brut des documents de description.
pub trait DocumentFetcher: Send + Sync {
    fn fetch(&self, location: &Url) -> Result<String, FetchError>;
}

/// Fetcher HTTP bloquant, basé sur `ureq`.
#[derive(Debug, Clone)]
pub struct HttpDocumentFetcher {
    timeout: Duration,
}

impl HttpDocumentFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl DocumentFetcher for HttpDocumentFetcher {
    fn fetch(&self, location: &Url) -> Result<String, FetchError> {
        if !matches!(location.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(location.scheme().to_string()));
        }

        debug!("Fetching description document at {}", location);

        let config = Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build();
        let agent: Agent = config.into();

        let response = agent.get(location.as_str()).call()?;
        let mut body = response.into_body();
        Ok(body.read_to_string()?)
    }
}
