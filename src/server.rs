//! MCP server exposing symbol search over the decoded index.

use crate::search::{MAX_RESULTS, search, top_level_modules};
use crate::session::{DocSession, Snapshot};
use crate::types::DocItem;
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_handler, tool_router,
};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    /// Text to find in fully-qualified paths (case-insensitive)
    pub query: String,
    /// Maximum number of results to return (default and maximum: 100)
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ItemRequest {
    /// Documentation URL of the item, as shown in search results
    pub url: String,
}

/// MCP Server for standard library symbol lookup
#[derive(Clone)]
pub struct DocServer {
    session: Arc<DocSession>,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for DocServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocServer")
            .field("session", &self.session)
            .finish()
    }
}

#[tool_router]
impl DocServer {
    pub fn new(session: Arc<DocSession>) -> Self {
        Self {
            session,
            tool_router: Self::tool_router(),
        }
    }

    pub fn session(&self) -> &Arc<DocSession> {
        &self.session
    }

    #[tool(
        description = "Search standard library documentation symbols by path substring. Exact name matches rank first, then name prefix matches. An empty query returns favorites, recent items and top-level modules."
    )]
    async fn search(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> std::result::Result<String, String> {
        if request.query.is_empty() {
            return Ok(self.browse_text().await);
        }

        let snapshot = self.ready_snapshot().await?;
        let limit = request.limit.unwrap_or(MAX_RESULTS).min(MAX_RESULTS);
        let results = search(snapshot.items(), &request.query);

        if results.is_empty() {
            return Ok(format!("No results found for '{}'.", request.query));
        }

        let mut out = format!("Results for '{}' ({}):\n\n", request.query, results.len().min(limit));
        for item in results.into_iter().take(limit) {
            self.write_item(&mut out, item).await;
        }
        Ok(out)
    }

    #[tool(description = "Show favorites, recently opened items and top-level standard library modules.")]
    async fn browse(&self) -> std::result::Result<String, String> {
        Ok(self.browse_text().await)
    }

    #[tool(description = "Report whether the index is loading, the last error, and decode statistics.")]
    async fn status(&self) -> std::result::Result<String, String> {
        let snapshot = self.session.snapshot().await;
        let version = self.session.version();
        let mut out = format!("Version: {}\nLoading: {}\n", version, snapshot.loading);

        if let Some(url) = self.session.doc_state().resolved_url(version).await {
            let _ = writeln!(out, "Index: {}", url);
        }
        if let Some(stats) = snapshot.stats() {
            let _ = writeln!(
                out,
                "Crates: {}\nItems: {}\nSkipped (no page): {}",
                stats.crates, stats.items, stats.unresolvable
            );
            for (code, count) in &stats.substituted_kinds {
                let _ = writeln!(out, "Unknown kind code '{}': {}", code, count);
            }
        }
        if let Some(error) = &snapshot.error {
            let _ = writeln!(out, "Error: {}", error);
        }
        Ok(out)
    }

    #[tool(description = "Discard the cached index and fetch it again.")]
    async fn refresh(&self) -> std::result::Result<String, String> {
        self.session
            .refresh()
            .await
            .await
            .map_err(|e| format!("Refresh task failed: {}", e))?;

        let snapshot = self.session.snapshot().await;
        match &snapshot.error {
            Some(error) => Err(format!("Refresh failed: {}", error)),
            None => Ok(format!("Index reloaded: {} items.", snapshot.items().len())),
        }
    }

    #[tool(description = "Add an item to favorites, or remove it if it already is one.")]
    async fn toggle_favorite(
        &self,
        Parameters(ItemRequest { url }): Parameters<ItemRequest>,
    ) -> std::result::Result<String, String> {
        let item = self.lookup(&url).await?;
        let added = self
            .session
            .toggle_favorite(&item)
            .await
            .map_err(|e| format!("Failed to save favorites: {:#}", e))?;

        Ok(if added {
            format!("Added {} to favorites.", item.path)
        } else {
            format!("Removed {} from favorites.", item.path)
        })
    }

    #[tool(description = "Mark an item as opened (adds it to recent items) and return its documentation URL.")]
    async fn open_item(
        &self,
        Parameters(ItemRequest { url }): Parameters<ItemRequest>,
    ) -> std::result::Result<String, String> {
        let item = self.lookup(&url).await?;
        self.session
            .item_opened(&item)
            .await
            .map_err(|e| format!("Failed to save recent items: {:#}", e))?;
        Ok(format!("{} ({})\n{}", item.path, item.kind, item.url))
    }
}

impl DocServer {
    /// Snapshot with items, waiting for a load if none has succeeded yet.
    async fn ready_snapshot(&self) -> std::result::Result<Snapshot, String> {
        let snapshot = self.session.snapshot().await;
        if snapshot.index.is_some() {
            return Ok(snapshot);
        }

        let snapshot = self.session.load_now().await;
        match (&snapshot.index, &snapshot.error) {
            (Some(_), _) => Ok(snapshot),
            (None, Some(error)) => Err(format!("Failed to load the documentation index: {}", error)),
            (None, None) => Err("Documentation index is still loading, try again shortly".to_string()),
        }
    }

    async fn lookup(&self, url: &str) -> std::result::Result<DocItem, String> {
        self.session
            .find_item(url)
            .await
            .ok_or_else(|| format!("No item with URL '{}'. Search for it first.", url))
    }

    async fn write_item(&self, out: &mut String, item: &DocItem) {
        let star = if self.session.is_favorite(&item.url).await {
            " ★"
        } else {
            ""
        };
        let _ = writeln!(out, "• {} ({}){}\n  {}", item.path, item.kind, star, item.url);
    }

    async fn browse_text(&self) -> String {
        let mut out = String::new();

        let favorites = self.session.favorites().await;
        if !favorites.is_empty() {
            out.push_str("Favorites:\n");
            for item in &favorites {
                self.write_item(&mut out, item).await;
            }
            out.push('\n');
        }

        let recents = self.session.recents().await;
        if !recents.is_empty() {
            out.push_str("Recent:\n");
            for item in &recents {
                self.write_item(&mut out, item).await;
            }
            out.push('\n');
        }

        let snapshot = self.session.snapshot().await;
        let modules = top_level_modules(snapshot.items());
        if !modules.is_empty() {
            out.push_str("Standard Library Modules:\n");
            for item in modules {
                self.write_item(&mut out, item).await;
            }
        }

        if out.is_empty() {
            if snapshot.loading {
                out.push_str("Documentation index is loading.");
            } else {
                out.push_str("Search for Rust documentation.");
            }
        }
        out
    }
}

#[tool_handler]
impl ServerHandler for DocServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::from_build_env())
            .with_instructions(
                "stddoc-mcp: search Rust standard library documentation symbols. \
                 Use search with a name or path fragment (e.g. 'Vec', 'hash_map'), \
                 open_item to record a visit, and toggle_favorite to pin items."
                    .to_string(),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::MemoryStore;
    use crate::worker::DocState;
    use assert2::{check, let_assert};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAYLOAD: &str = r#"searchIndex["std"] = [
        ["fs", "File", "vec", "Vec", "os", "unix"],
        "ADADAA",
        [null, 0, null, 1, null, 2],
        [["fs", null], ["vec", null], ["os", null]]
    ];"#;

    async fn server(host: &MockServer) -> DocServer {
        Mock::given(method("HEAD"))
            .and(path("/search-index.js"))
            .respond_with(ResponseTemplate::new(200))
            .mount(host)
            .await;
        Mock::given(method("GET"))
            .and(path("/search-index.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAYLOAD))
            .mount(host)
            .await;

        let config = Config {
            doc_root: format!("{}/", host.uri()),
            ..Config::default()
        };
        let state = Arc::new(DocState::from_config(&config).unwrap());
        let session = DocSession::new(state, "1.92.0", Arc::new(MemoryStore::new())).unwrap();
        DocServer::new(Arc::new(session))
    }

    fn request(query: &str, limit: Option<usize>) -> Parameters<SearchRequest> {
        Parameters(SearchRequest {
            query: query.to_string(),
            limit,
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_search_loads_on_demand() {
        let host = MockServer::start().await;
        let server = server(&host).await;

        let output = server.search(request("vec", None)).await.unwrap();
        check!(output.starts_with("Results for 'vec' (2)"));
        check!(output.find("std::vec (module)") < output.find("std::vec::Vec (struct)"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_search_respects_limit() {
        let host = MockServer::start().await;
        let server = server(&host).await;

        let output = server.search(request("std", Some(1))).await.unwrap();
        check!(output.matches("• ").count() == 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_query_browses() {
        let host = MockServer::start().await;
        let server = server(&host).await;
        server.session().load_now().await;

        let vec_url = format!("{}/std/vec/struct.Vec.html", host.uri());
        server
            .toggle_favorite(Parameters(ItemRequest { url: vec_url.clone() }))
            .await
            .unwrap();
        server
            .open_item(Parameters(ItemRequest { url: vec_url }))
            .await
            .unwrap();

        let output = server.search(request("", None)).await.unwrap();
        check!(output.starts_with("Favorites:\n• std::vec::Vec (struct) ★"));
        check!(output.contains("Recent:\n• std::vec::Vec"));
        check!(output.contains("std::fs (module)"));
        check!(!output.contains("std::os::unix"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_url_is_rejected() {
        let host = MockServer::start().await;
        let server = server(&host).await;

        let_assert!(
            Err(message) = server
                .open_item(Parameters(ItemRequest {
                    url: "https://example.com/nope".to_string()
                }))
                .await
        );
        check!(message.contains("No item with URL"));
    }
}
