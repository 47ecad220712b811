//! Default value functions for configuration.

pub fn default_display_name() -> String {
    std::env::var("USER").unwrap_or_else(|_| "anonymous".to_string())
}

// =============================================================================
// Rendezvous Defaults
// =============================================================================

pub fn default_rendezvous_server() -> String {
    "127.0.0.1:7400".to_string()
}

pub fn default_rendezvous_listen() -> std::net::SocketAddr {
    std::net::SocketAddr::from(([0, 0, 0, 0], 7400))
}

pub fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

// =============================================================================
// Session Defaults
// =============================================================================

/// Envelopes buffered while disconnected before the oldest is evicted.
pub fn default_queue_capacity() -> usize {
    1024
}

pub fn default_connect_timeout_ms() -> u64 {
    10_000
}

pub fn default_max_line_len() -> usize {
    roomlink_proto::codec::DEFAULT_MAX_LEN
}
