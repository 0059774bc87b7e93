//! Depwatch auditor - the discovery, parsing, merging, resolution and
//! reporting pipeline plus its orchestration.

pub mod audit;
pub mod config;
pub mod executor;
pub mod fleet;
pub mod host;
pub mod locator;
pub mod merge;
pub mod parser;
pub mod registry;
pub mod reporter;
pub mod resolver;
