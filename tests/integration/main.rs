//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! orchestrator end-to-end.

mod common;
mod crawl_tests;
mod politeness_tests;
mod queue_tests;
mod shutdown_tests;
