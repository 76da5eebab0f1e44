//! # docstore-mcp
//!
//! MCP (Model Context Protocol) server for managed document databases.
//!
//! This crate provides an MCP server that exposes document CRUD and query
//! operations as tools for AI agents, routing each call to one of several
//! pre-authenticated database projects. It implements the MCP protocol over
//! stdin/stdout using JSON-RPC 2.0.
//!
//! ## Features
//!
//! - **Document tools**: get/create/update/delete plus structured queries with
//!   filters, order directives, and limits
//! - **Multi-project routing**: every tool accepts an optional `project`
//!   argument; the first configured project is the default
//! - **Timestamp normalization**: wire-shaped `{seconds, nanoseconds}` values
//!   become native timestamps on both write and read paths
//!
//! ## Usage
//!
//! The server is typically run as an executable and configured in AI tools like
//! Claude Desktop:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "docstore": {
//!       "command": "/path/to/docstore-mcp",
//!       "env": { "DOCSTORE_PROJECTS": "prod-app,staging-app" }
//!     }
//!   }
//! }
//! ```
//!
//! ## Library Usage
//!
//! For testing or embedding, you can use the library API:
//!
//! ```no_run
//! use docstore_mcp::{McpServer, ProjectRegistry};
//!
//! # async fn run() {
//! let registry = ProjectRegistry::in_memory(["demo-project"], "demo-project");
//! let server = McpServer::new(registry);
//!
//! // Run the server (reads from stdin, writes to stdout)
//! // server.run().await.expect("Server error");
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod convert;
mod error;
mod query;
mod registry;
mod server;
mod store;
mod tools;

pub use config::{ProjectCredentials, Settings, CREDENTIALS_ENV, DEFAULT_PROJECT, PROJECTS_ENV};
pub use convert::{bson_to_json, json_to_bson, normalize_timestamps};
pub use error::{Result, ServerError};
pub use query::{Direction, Filter, FilterOp, OrderBy, Query};
pub use registry::ProjectRegistry;
pub use server::{JsonRpcRequest, JsonRpcResponse, McpServer};
pub use store::{memory::MemoryStore, mongo::MongoStore, DocumentStore, StoreError};
pub use tools::{ToolDef, ToolRegistry};
