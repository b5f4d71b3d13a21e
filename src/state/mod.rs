//! State module for tracking crawl progress
//!
//! This module provides state management for jobs and domains during a crawl.
//!
//! # Components
//!
//! - `JobStatus`: Lifecycle of an individual crawl job (pending, processing, completed, failed)
//! - `DomainState`: Per-origin request history for minute/hour windows and spacing

mod domain_state;
mod job_state;

// Re-export main types
pub use domain_state::DomainState;
pub use job_state::JobStatus;
