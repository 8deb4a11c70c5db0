//! MCP tool implementations.

pub mod get_silver_price;
pub mod registry;

pub use registry::ToolRegistry;
