//! Test utilities
//!
//! Manual mock implementations and test fixtures for unit testing.
//!
//! One in-memory store implements every repository port so services built
//! from several repositories share the same data, and multi-table writes stay
//! atomic under its single lock.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
