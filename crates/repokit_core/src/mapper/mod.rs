//! Bidirectional mapping between raw source payloads and typed entities.
//!
//! # Responsibility
//! - Hold the ordered transform pipeline for one entity type.
//! - Normalize source results to a single instance or a sequence.
//!
//! # Invariants
//! - The mapper knows nothing about sources or asynchrony.
//! - Transforms are registered during setup and never removed.

pub mod pipeline;
pub mod transform;
