//! Core conversion logic — extraction, translation, assembly, optimization.

pub mod assembler;
pub mod guard;
pub mod notify;
pub mod optimizer;
pub mod pipeline;
pub mod search;
pub mod types;
