//! Test-only adapters that live inside the domain crate for convenience.
//!
//! These are intended purely for unit testing and local demos. The persistent
//! store lives in the `sqlite-adapter` crate.

pub mod memory_store;
