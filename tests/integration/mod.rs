//! Integration test suite for ABM
//!
//! End-to-end tests exercising the public API and the `abm` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: The `abm` binary against temporary bundle directories
//! - **concurrency**: Many threads serving requests from one engine
//! - **graph**: Cycle rejection, dependency ordering and trees
//! - **loading**: JSON definitions, loader precedence and cross-bundle merging
//! - **pipeline**: Location selection, processing, caching and aggregation

mod cli;
mod concurrency;
mod graph;
mod loading;
mod pipeline;
