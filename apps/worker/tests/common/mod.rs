//! Common test utilities for worker integration tests
//!
//! This module provides shared test infrastructure for integration tests,
//! including test fixtures, mock jobs, and helper functions.

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
