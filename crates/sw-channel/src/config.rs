//! Channel configuration

use serde::{Deserialize, Serialize};

use sw_protocol::DEFAULT_MAX_BODY_LEN;

/// Tunables for one channel terminal
///
/// The frame header width is a protocol constant that both ends agree on
/// out of band; it is deliberately not configurable here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Largest frame body this terminal will buffer on receive
    pub max_body_len: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_body_len: DEFAULT_MAX_BODY_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_body_limit() {
        let config = ChannelConfig::default();
        assert_eq!(config.max_body_len, DEFAULT_MAX_BODY_LEN);
    }
}
