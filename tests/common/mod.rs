//! Shared fixtures for integration tests.
//!
//! Every test gets its own [`MockDocs`]: a local HTTP server standing in for the
//! documentation host, plus a pipeline configured against it. Nothing touches the
//! network or the user's config and data directories.

use stddoc_mcp::store::MemoryStore;
use stddoc_mcp::{Config, DocSession, DocState};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const VERSION: &str = "1.92.0";

/// A small but complete index script: one populated crate and one empty crate.
pub const PAYLOAD: &str = r#"var searchIndex = {};
searchIndex["std"] = [
    ["collections", "hash_map", "HashMap", "vec", "Vec", "VecDeque", "swap", "println!", "u32", "Entry"],
    "AADADDFOPL",
    [null, 0, 1, null, 2, 2, 3, null, null, 1],
    [["collections", null], ["hash_map", 0], ["vec", null], ["mem", null]]
];
searchIndex["proc_macro"] = [];
if (typeof exports !== 'undefined') { exports.searchIndex = searchIndex; }
"#;

/// Relative location the default candidate list reaches third.
pub const THIRD_CANDIDATE: &str = "/search-index-1.92.0.js";

/// A mock documentation host with a pipeline pointed at it.
#[allow(dead_code)] // Helpers used across different integration test crates
pub struct MockDocs {
    pub server: MockServer,
    pub config: Config,
}

#[allow(dead_code)] // Helpers used across different integration test crates
impl MockDocs {
    /// Start an empty server. Every path answers 404 until mocks are mounted.
    pub async fn start() -> Self {
        stddoc_mcp::tracing::init();

        let server = MockServer::start().await;
        let config = Config {
            doc_root: format!("{}/", server.uri()),
            probe_timeout_ms: 1_000,
            fetch_timeout_secs: 5,
            ..Config::default()
        };
        Self { server, config }
    }

    /// Start a server hosting [`PAYLOAD`] at the third default candidate.
    pub async fn with_index() -> Self {
        let docs = Self::start().await;
        docs.mount_head(THIRD_CANDIDATE, 200).await;
        docs.mount_get(THIRD_CANDIDATE, ResponseTemplate::new(200).set_body_string(PAYLOAD))
            .await;
        docs
    }

    pub fn root(&self) -> &str {
        &self.config.doc_root
    }

    /// Absolute URL on the mock server for a path starting with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    pub async fn mount_head(&self, route: &str, status: u16) {
        Mock::given(method("HEAD"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_get(&self, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    pub fn state(&self) -> Arc<DocState> {
        Arc::new(DocState::from_config(&self.config).expect("Failed to build pipeline"))
    }

    pub fn session(&self) -> DocSession {
        DocSession::new(self.state(), VERSION, Arc::new(MemoryStore::new()))
            .expect("Failed to open session")
    }
}
