//! MCP front-end adapter — exposes the façade operations as callable tools.

pub mod server;

pub use server::mcp_handler;
