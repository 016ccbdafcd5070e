//! Streamer-name suggestions from the server's HTTP side channel.
//!
//! Lookups never touch connection or lock state. Failures degrade to an empty
//! suggestion list.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::presenter::Presenter;
use crate::view::UiEvent;

#[derive(Debug, Clone)]
pub struct SuggestionClient {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl SuggestionClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: config.search_url()?,
            timeout: config.connect_timeout,
        })
    }

    #[must_use]
    pub fn request_url(&self, term: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("term", term);
        url
    }

    /// `GET <endpoint>?term=<term>` answering a JSON array of names.
    pub async fn lookup(&self, term: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(self.request_url(term))
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::Protocol(format!(
                "suggestion lookup failed with status {status}"
            )));
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Tracks the term currently being typed so late answers for older terms are dropped.
#[derive(Debug, Clone)]
pub struct SuggestionTracker {
    current: Option<String>,
    limit: usize,
}

impl SuggestionTracker {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            current: None,
            limit,
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Term to look up, or `None` when the input is blank and the list was hidden.
    pub fn begin(&mut self, term: &str, out: &mut Vec<UiEvent>) -> Option<String> {
        let term = term.trim();
        if term.is_empty() {
            self.current = None;
            out.push(UiEvent::HideSuggestions);
            return None;
        }
        self.current = Some(term.to_string());
        Some(term.to_string())
    }

    /// Returns whether the answer was current and rendered.
    pub fn complete(
        &mut self,
        term: &str,
        result: Result<Vec<String>>,
        out: &mut Vec<UiEvent>,
    ) -> bool {
        if self.current.as_deref() != Some(term) {
            debug!(term, "dropping stale suggestions");
            return false;
        }
        match result {
            Ok(mut names) if !names.is_empty() => {
                names.truncate(self.limit);
                out.push(UiEvent::Suggestions(names));
            }
            Ok(_) => out.push(UiEvent::HideSuggestions),
            Err(error) => {
                debug!(error = %error, "suggestion lookup failed");
                out.push(UiEvent::HideSuggestions);
            }
        }
        true
    }
}

impl Presenter {
    /// Start a lookup for the typed term; `None` means no request should be made.
    pub fn suggest(&mut self, term: &str) -> Option<String> {
        self.suggestions.begin(term, &mut self.core.effects.ui)
    }

    pub fn on_suggestions(&mut self, term: &str, result: Result<Vec<String>>) -> bool {
        self.suggestions
            .complete(term, result, &mut self.core.effects.ui)
    }
}
