//! Model Context Protocol (MCP) message handling
//!
//! Message classification, JSON-RPC envelopes, the engine seam used by transports,
//! and the built-in method dispatcher.

pub mod engine;
pub mod message;
pub mod rpc;
pub mod server;
