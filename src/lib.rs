pub mod cache;
pub mod config;
pub mod dates;
pub mod engine;
pub mod error;
pub mod query;
pub mod store;
pub mod task;

// Convenience re-exports
pub use cache::{CacheStatus, ViewCache};
pub use config::{AppConfig, UserPrefs};
pub use engine::{EngineMessage, TodoEngine};
pub use error::{Result, TodoError};
pub use query::{QuerySpec, ViewName};
pub use store::http::HostClient;
pub use store::memory::MemoryStore;
pub use store::BlockStore;
pub use task::{Marker, Priority, Task};
