//! API module
//!
//! This module provides the API functionality for the stepwise tool,
//! including the server, client, and MCP adapters.

pub mod client;
pub mod mcp;
pub mod server;

// Re-export commonly used types
pub use client::{Client, ClientConfig, ClientError};
pub use mcp::StepwiseMcpServer;
pub use server::{serve, AppState, ServerConfig};
