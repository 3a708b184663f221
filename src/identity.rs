use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

const SEPARATOR: &[u8] = b"\x1f";

/// Private channel name for an unordered pair of participants.
///
/// Direct chat and call signaling both derive their channel from this, so a
/// pair always lands in the same room no matter who initiates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomKey(String);

impl RoomKey {
    pub fn derive(a: &str, b: &str) -> RoomKey {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };

        let mut hasher = Sha256::new();
        hasher.update(first.as_bytes());
        hasher.update(SEPARATOR);
        hasher.update(second.as_bytes());

        RoomKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Participant ids are opaque, but the separator must never appear in one.
pub fn is_valid_participant(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_does_not_matter() {
        assert_eq!(RoomKey::derive("alice", "bob"), RoomKey::derive("bob", "alice"));
    }

    #[test]
    fn different_pairs_differ() {
        let ab = RoomKey::derive("alice", "bob");
        assert_ne!(ab, RoomKey::derive("alice", "carol"));
        assert_ne!(ab, RoomKey::derive("bob", "carol"));
    }

    #[test]
    fn underscores_in_ids_do_not_collide() {
        assert_ne!(RoomKey::derive("a_b", "c"), RoomKey::derive("a", "b_c"));
    }

    #[test]
    fn sha256_hex() {
        let key = RoomKey::derive("65f1c0a2", "65f1c0a3");
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(key, RoomKey::derive("65f1c0a2", "65f1c0a3"));
    }

    #[test]
    fn participant_validation() {
        assert!(is_valid_participant("65f1c0a2e4b0"));
        assert!(!is_valid_participant(""));
        assert!(!is_valid_participant("a\u{1f}b"));
    }
}
