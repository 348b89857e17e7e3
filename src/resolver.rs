//! Search-index location discovery.
//!
//! The generator has published its index under several names over the years.
//! Candidates are probed in priority order with HEAD requests; the first one that
//! answers with a success status wins. Probing is sequential: the contract is
//! "first match in priority order", so candidates are never checked concurrently.

use crate::config::{Config, VERSION_PLACEHOLDER};
use crate::error::ResolutionError;
use reqwest::{Client, Url};
use std::time::Duration;

/// Finds the search-index URL for a release.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: Client,
    doc_root: Url,
    candidates: Vec<String>,
    probe_timeout: Duration,
}

impl Resolver {
    pub fn new(
        client: Client,
        doc_root: Url,
        candidates: Vec<String>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            client,
            doc_root,
            candidates,
            probe_timeout,
        }
    }

    pub fn from_config(client: Client, config: &Config) -> crate::error::Result<Self> {
        Ok(Self::new(
            client,
            config.doc_root_url()?,
            config.candidates.clone(),
            config.probe_timeout(),
        ))
    }

    /// Absolute candidate URLs for `version`, in probe order.
    ///
    /// Templates that cannot be joined onto the root are returned as `Err` with the
    /// rendered text so they still show up in the attempted list.
    pub fn candidate_urls(&self, version: &str) -> Vec<Result<Url, String>> {
        self.candidates
            .iter()
            .map(|template| {
                let relative = template.replace(VERSION_PLACEHOLDER, version);
                self.doc_root.join(&relative).map_err(|_| relative)
            })
            .collect()
    }

    /// Probe each candidate in order and return the first that exists.
    pub async fn resolve(&self, version: &str) -> Result<Url, ResolutionError> {
        let mut attempted = Vec::with_capacity(self.candidates.len());

        for candidate in self.candidate_urls(version) {
            let url = match candidate {
                Ok(url) => url,
                Err(rendered) => {
                    tracing::warn!(candidate = %rendered, "Skipping candidate that is not a valid URL");
                    attempted.push(rendered);
                    continue;
                }
            };

            if self.exists(&url).await {
                tracing::info!(%url, version, "Resolved search index");
                return Ok(url);
            }
            attempted.push(url.to_string());
        }

        tracing::warn!(version, tried = attempted.len(), "No search index candidate found");
        Err(ResolutionError {
            version: version.to_string(),
            attempted,
        })
    }

    /// HEAD request; any failure or non-success status counts as "does not exist".
    async fn exists(&self, url: &Url) -> bool {
        let response = self
            .client
            .head(url.clone())
            .timeout(self.probe_timeout)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::debug!(%url, status = response.status().as_u16(), "Candidate not found");
                false
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "Candidate probe failed");
                false
            }
        }
    }
}
