//! pr-reviewer: LLM-assisted GitHub pull request review (library crate).
//!
//! Re-exports public modules for the binary and integration tests.

pub mod config;
pub mod llm;
pub mod pr;
pub mod report;
pub mod retry;
pub mod review;
