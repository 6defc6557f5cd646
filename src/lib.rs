//! Stepwise library crate
//!
//! Stepwise records chains of reasoning one step at a time: linear steps,
//! revisions of earlier steps, and named branches that fork from a step.
//! History is append-only and cleared only on explicit reset.
//!
//! The domain core lives in [`models`]; [`api`] holds the HTTP, MCP, and
//! client adapters; [`render`] draws accepted steps on stderr; [`cli`] ties
//! it all together for the binary.

pub mod api;
pub mod cli;
pub mod models;
pub mod render;

pub use models::Core;
