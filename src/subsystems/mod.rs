//! Subsystem modules for the nutrition bot.

pub mod agents;
pub mod comms;
pub mod llm;
pub mod runtime;
pub mod storage;
pub mod tools;
