//! Configuration validation.
//!
//! Validates configuration at startup; the binary refuses to run on any
//! error.

use super::Config;
use slirc_proto::ChannelExt;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("irc.host is required")]
    MissingHost,
    #[error("irc.port must be greater than 0")]
    InvalidPort,
    #[error("irc.nick is required")]
    MissingNick,
    #[error("irc.nick must not contain spaces or start with ':', got '{0}'")]
    InvalidNick(String),
    #[error("irc.channel is required")]
    MissingChannel,
    #[error("irc.channel is not a channel name: '{0}'")]
    InvalidChannel(String),
    #[error("bridge.event_url is required")]
    MissingEventUrl,
    #[error("bridge.event_url must be an http(s) URL, got '{0}'")]
    InvalidEventUrl(String),
    #[error("bridge.listen_port must be greater than 0")]
    InvalidListenPort,
    #[error("bridge.max_in_flight must be greater than 0")]
    InvalidMaxInFlight,
    #[error("timeouts.{0} must be greater than 0")]
    ZeroTimeout(&'static str),
    #[error("queues.capacity must be greater than 0")]
    InvalidQueueCapacity,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Upstream server
    let irc = &config.irc;
    if irc.host.trim().is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    if irc.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if irc.nick.is_empty() {
        errors.push(ValidationError::MissingNick);
    } else if irc.nick.contains(' ') || irc.nick.starts_with(':') {
        errors.push(ValidationError::InvalidNick(irc.nick.clone()));
    }
    if irc.channel.is_empty() {
        errors.push(ValidationError::MissingChannel);
    } else if !irc.channel.is_channel_name() {
        errors.push(ValidationError::InvalidChannel(irc.channel.clone()));
    }

    // HTTP side
    let bridge = &config.bridge;
    if bridge.event_url.trim().is_empty() {
        errors.push(ValidationError::MissingEventUrl);
    } else {
        match reqwest::Url::parse(&bridge.event_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::InvalidEventUrl(bridge.event_url.clone())),
        }
    }
    if bridge.listen_port == 0 {
        errors.push(ValidationError::InvalidListenPort);
    }
    if bridge.max_in_flight == 0 {
        errors.push(ValidationError::InvalidMaxInFlight);
    }

    let timeouts = &config.timeouts;
    for (name, secs) in [
        ("connect", timeouts.connect),
        ("handshake", timeouts.handshake),
        ("read", timeouts.read),
        ("write", timeouts.write),
        ("delivery", timeouts.delivery),
    ] {
        if secs == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    if config.queues.capacity == 0 {
        errors.push(ValidationError::InvalidQueueCapacity);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
