//! Typed entity model shared by the mapper and the repository.
//!
//! # Responsibility
//! - Define the raw payload shape exchanged with sources.
//! - Define the `Entity` contract typed instances implement.
//!
//! # Invariants
//! - A fresh instance is always `T::default()`.
//! - Raw payloads are plain JSON values; no schema is enforced here.

pub mod entity;
