//! Traspaso — Chef-to-Ansible migration core.
//!
//! Rule-driven resource conversion, search-query translation, playbook
//! optimization, and conversion audit scoring. Consumes raw resource
//! records extracted upstream; produces task/handler/inventory artifacts
//! for an external YAML emitter.

pub mod audit;
pub mod core;
pub mod rules;
