//! Common test utilities for API integration tests
//!
//! This module provides shared test infrastructure for integration tests,
//! including fixtures for the daily playlist job and helpers for driving
//! routers with `tower::ServiceExt::oneshot`.

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
