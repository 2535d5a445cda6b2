//! Typed async repositories over heterogeneous data sources.
//! Raw source payloads flow through a bidirectional mapper into typed entities.

pub mod logging;
pub mod mapper;
pub mod model;
pub mod repo;

pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use mapper::pipeline::Mapper;
pub use mapper::transform::{FnTransform, Omit, Rename, Stringify, Transform};
pub use model::entity::{raw_map, Entity, MapperError, MapperResult, RawMap, Record};
pub use repo::memory::{MemorySource, MemorySourceError};
pub use repo::operation::Operation;
pub use repo::repository::{BindingError, RepoError, RepoResult, Repository};
pub use repo::source::{FnSource, Source, SourceError, SourceResult, UnsupportedOperation};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
