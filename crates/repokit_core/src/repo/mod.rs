//! Repository facade over pluggable sources.
//!
//! # Responsibility
//! - Bind canonical CRUD operations to source providers.
//! - Expose async, arity-correct, typed results to callers.
//!
//! # Invariants
//! - Each operation is bound to at most one source.
//! - Sources see slugs and raw ids; callers see typed entities only.

pub mod memory;
pub mod operation;
pub mod repository;
pub mod source;
