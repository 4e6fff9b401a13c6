//! HTTP transport layer for the Model Context Protocol
//!
//! Routes the `/mcp` endpoint, frames Server-Sent Events, and decodes the MCP headers.

pub mod handlers;
pub mod headers;
pub mod sse;
