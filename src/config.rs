use once_cell::sync::Lazy;

/// ACK | AUTO_ROUTE | EXPLORE
pub const DEFAULT_TRANSMIT_OPTIONS: u8 = 0x25;

#[derive(Debug)]
pub struct Config {
    /// Default for `Value::verify_changes` on newly created values.
    pub zwave_verify_changes: bool,
    /// Hex-dump inbound frames and outbound messages at debug level.
    pub zwave_log_frames: bool,
    /// How many times an unanswered static discovery query is issued before
    /// it is abandoned. 0 keeps asking forever.
    pub zwave_static_request_attempts: u8,
    pub zwave_transmit_options: u8,
}

impl Config {
    fn from_env() -> Self {
        let zwave_verify_changes = std::env::var("ZWAVE_VERIFY_CHANGES")
            .map(|v| v != "0")
            .unwrap_or(true);
        let zwave_log_frames = std::env::var("ZWAVE_LOG_FRAMES")
            .map(|v| v == "1")
            .unwrap_or(false);
        let zwave_static_request_attempts = std::env::var("ZWAVE_STATIC_REQUEST_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3u8);
        let zwave_transmit_options = std::env::var("ZWAVE_TRANSMIT_OPTIONS")
            .ok()
            .and_then(|s| parse_u8_maybe_hex(&s))
            .unwrap_or(DEFAULT_TRANSMIT_OPTIONS);
        Self {
            zwave_verify_changes,
            zwave_log_frames,
            zwave_static_request_attempts,
            zwave_transmit_options,
        }
    }
}

fn parse_u8_maybe_hex(s: &str) -> Option<u8> {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .map_or_else(|| s.parse().ok(), |h| u8::from_str_radix(h, 16).ok())
}

/// Global config loaded once from environment at first access.
pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

/// Convenience accessor
pub fn config() -> &'static Config {
    &GLOBAL_CONFIG
}

/// Space-separated uppercase hex, used by frame dumps and `Raw` values.
#[must_use]
pub fn hex_dump(b: &[u8]) -> String {
    b.iter()
        .map(|x| format!("{x:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmit_options_accept_hex_and_decimal() {
        assert_eq!(parse_u8_maybe_hex("0x25"), Some(0x25));
        assert_eq!(parse_u8_maybe_hex(" 37 "), Some(37));
        assert_eq!(parse_u8_maybe_hex("0x1FF"), None);
    }

    #[test]
    fn hex_dump_formats_bytes() {
        assert_eq!(hex_dump(&[0x56, 0x01, 0x0A]), "56 01 0A");
        assert_eq!(hex_dump(&[]), "");
    }
}
