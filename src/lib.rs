//! Library root — the binary entry point is `src/main.rs`; integration tests
//! under `tests/` drive the tools and storage through this crate.

pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod subsystems;
pub mod supervisor;
