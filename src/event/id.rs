//! Random identifiers for events and correlation chains.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// Prefix of every event id.
pub const EVENT_ID_PREFIX: &str = "evt_";
/// Prefix of generated correlation ids.
pub const CORRELATION_ID_PREFIX: &str = "corr_";

const ID_BYTES: usize = 16;

fn random_token() -> String {
    let mut bytes = [0u8; ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a new event id (`evt_` + 16 random bytes, base64url).
pub fn event_id() -> String {
    format!("{}{}", EVENT_ID_PREFIX, random_token())
}

/// Generate a new correlation id (`corr_` + 16 random bytes, base64url).
pub fn correlation_id() -> String {
    format!("{}{}", CORRELATION_ID_PREFIX, random_token())
}
