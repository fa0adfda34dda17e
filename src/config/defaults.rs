//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::net::{IpAddr, Ipv4Addr};

// =============================================================================
// Bridge Defaults
// =============================================================================

pub fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

pub fn default_max_in_flight() -> usize {
    64
}

// =============================================================================
// Timeout Defaults (seconds)
// =============================================================================

pub fn default_connect_timeout() -> u64 {
    10
}

pub fn default_handshake_timeout() -> u64 {
    5
}

pub fn default_read_timeout() -> u64 {
    300
}

pub fn default_write_timeout() -> u64 {
    60
}

pub fn default_delivery_timeout() -> u64 {
    10
}

// =============================================================================
// Queue Defaults
// =============================================================================

pub fn default_queue_capacity() -> usize {
    1024
}
