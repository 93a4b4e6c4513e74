//! Repository layer over the document store.
//!
//! # Responsibility
//! - Give typed access to documents with store-independent semantics.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`Missing`, `Contention`) in
//!   addition to store transport errors.

pub mod counter_repo;
