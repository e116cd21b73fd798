//! edgar-mcp: MCP server for SEC EDGAR
//!
//! Exposes submissions, company facts, concepts and frames from
//! `data.sec.gov` as MCP tools and resources.
//!
//! Architecture:
//! transport (stdio | HTTP+SSE) → session → McpServer → Registry → edgar-core
//!
//! Methods:
//! - initialize / ping
//! - tools/list, tools/call
//! - resources/list, resources/templates/list, resources/read

pub mod config;
pub mod events;
pub mod interaction_log;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod server;
pub mod session;
pub mod tools;
pub mod transport;

pub use config::{Config, Limits};
pub use events::{DomainEvent, EventKind, EventPublisher};
pub use interaction_log::InteractionLog;
pub use protocol::{JsonRpcError, McpRequest, McpResponse};
pub use registry::{Registry, ToolContext, ToolError};
pub use server::McpServer;
pub use session::{Session, SessionTable};

pub const SERVER_NAME: &str = "edgar-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROTOCOL_VERSION: &str = "2024-11-05";
