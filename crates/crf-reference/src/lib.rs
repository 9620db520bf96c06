#![deny(unsafe_code)]

pub mod access;
pub mod config;
pub mod error;
pub mod memory;
pub mod query;
pub mod registry;
pub mod source;

pub use crate::access::DataAccess;
pub use crate::config::EngineConfig;
pub use crate::error::{ConfigError, ReferenceError};
pub use crate::memory::{HistoryDocument, InMemoryReferences, RecordedValue};
pub use crate::query::{Lookup, Query, Scope};
pub use crate::registry::EntityRegistry;
pub use crate::source::ReferenceSource;
