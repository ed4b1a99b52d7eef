pub mod access;
pub mod admin;
pub mod allowlist;
pub mod auth;
pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod gateway;
pub mod kinds;
pub mod logger;
pub mod query;
pub mod seed;
pub mod server;
pub mod settings;
pub mod store;
pub mod utils;

pub use access::{AccessLevel, AccessPolicy, CallerContext, PermissionFilter};
pub use admin::AdminConfig;
pub use allowlist::{ALLOWED_FIELDS_KEY, AllowList, AllowListStore};
pub use errors::{DbError, SearchError};
pub use gateway::{AllowListOverride, SearchGateway, SearchRequest};
pub use kinds::{CollectionAdapter, CollectionKind, CollectionRegistry};
pub use settings::{FileSettings, MemorySettings, Settings, SettingsBackend};
pub use store::DocumentStore;

/// Initializes logging from the `MONGO_SEARCH_LOG_*` environment variables.
///
/// Call once before serving; a second call fails because a logger is already set.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a logger is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::configure_from_env()
}
