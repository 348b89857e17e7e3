//! Search-index download.

use crate::error::FetchError;
use reqwest::{Client, Url};

/// Downloads the raw text of a resolved index URL. No retries: callers re-run
/// resolution, which may land on a different candidate.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_payload_bytes: u64,
}

impl Fetcher {
    pub const fn new(client: Client, max_payload_bytes: u64) -> Self {
        Self {
            client,
            max_payload_bytes,
        }
    }

    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let network = |e: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            cause: e.to_string(),
        };

        let mut response = self.client.get(url.clone()).send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_payload_bytes,
        };

        // Fail before reading anything when the server announces the size.
        if response
            .content_length()
            .is_some_and(|len| len > self.max_payload_bytes)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(network)? {
            if (body.len() + chunk.len()) as u64 > self.max_payload_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(%url, bytes = body.len(), "Fetched search index");

        String::from_utf8(body).map_err(|e| FetchError::Body {
            url: url.to_string(),
            cause: e.to_string(),
        })
    }
}
