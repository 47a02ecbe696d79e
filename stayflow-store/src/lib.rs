pub mod app_config;
pub mod pending;

pub use app_config::Config;
pub use pending::{FilePendingStore, MemoryPendingStore};
