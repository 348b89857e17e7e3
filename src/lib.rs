pub mod config;
pub mod decode;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod resolver;
pub mod search;
pub mod server;
pub mod session;
pub mod store;
pub mod tracing;
pub mod types;
pub mod worker;

pub use config::Config;
pub use decode::{DecodeStats, DecodedIndex, decode};
pub use error::{DecodeError, FetchError, PipelineError, ResolutionError};
pub use fetcher::Fetcher;
pub use resolver::Resolver;
pub use server::DocServer;
pub use session::{DocSession, Snapshot};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{DocItem, ItemKind};
pub use worker::DocState;
