//! MCP initialization handshake.

use crate::types::{InitializeParams, InitializeResult, MCP_VERSION};

/// Handshake progress for the single stdio client.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub initialized: bool,
}

impl Handshake {
    /// Answer `initialize` with the server's fixed capabilities.
    /// A differing protocol version is logged, not rejected.
    pub fn negotiate(&self, params: InitializeParams) -> InitializeResult {
        if params.protocol_version != MCP_VERSION {
            tracing::warn!(
                "Client requested protocol version {}, server supports {}. Proceeding with server version.",
                params.protocol_version,
                MCP_VERSION
            );
        }

        tracing::info!(
            "Initialized with client: {} v{}",
            params.client_info.name,
            params.client_info.version
        );

        InitializeResult::default_result()
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
        tracing::info!("MCP handshake complete");
    }
}
