//! Session identifier grammar and honeytoken marker
//!
//! Wire format: `GHOST-XXXX-XXXX`, each `X` drawn from uppercase letters
//! and digits with the visually confusable `I`, `O`, `0`, `1` removed.
//! The grammar is enforced with a compiled regex at every boundary; an
//! identifier that fails it is rejected before any stateful operation.
//!
//! Identifiers whose second segment is the reserved `TRAP` marker are
//! honeytokens: definitionally trap identifiers regardless of registry
//! state. Honeytoken detection is pure string matching so callers can
//! short-circuit before touching any store.

use crate::errors::{GhostError, Result};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed literal prefix of every session identifier
pub const SESSION_PREFIX: &str = "GHOST";

/// Reserved honeytoken marker: any identifier starting with this is a trap
pub const HONEYTOKEN_PREFIX: &str = "GHOST-TRAP-";

/// Unambiguous identifier alphabet (A-Z and 2-9 minus I, O, 0, 1)
pub const IDENTIFIER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length bounds for creator/accessor fingerprints
const FINGERPRINT_MIN_LEN: usize = 8;
const FINGERPRINT_MAX_LEN: usize = 128;

static SESSION_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    let pattern = Regex::new(r"^GHOST-[A-HJ-NP-Z2-9]{4}-[A-HJ-NP-Z2-9]{4}$")
        .expect("session id pattern is a valid regex");
    pattern
});

/// Returns true when the identifier carries the reserved honeytoken marker.
///
/// Pure string matching; never consults any store. Honeytokens are traps
/// even when they fail the session grammar (the marker check runs first).
pub fn is_honeytoken(id: &str) -> bool {
    id.starts_with(HONEYTOKEN_PREFIX)
}

/// Validated session identifier (`GHOST-XXXX-XXXX`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Parse and validate an identifier against the wire grammar
    pub fn parse(text: &str) -> Result<Self> {
        if SESSION_ID_PATTERN.is_match(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(GhostError::invalid_format("invalid session id"))
        }
    }

    /// Generate a random identifier from the unambiguous alphabet
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(format!(
            "{}-{}-{}",
            SESSION_PREFIX,
            random_group(rng),
            random_group(rng)
        ))
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = GhostError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Opaque creator/accessor fingerprint (8-128 characters)
///
/// The system never interprets the contents; only the length is checked so
/// a degenerate or oversized value cannot reach the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Validate and wrap a fingerprint string
    pub fn parse(text: &str) -> Result<Self> {
        if (FINGERPRINT_MIN_LEN..=FINGERPRINT_MAX_LEN).contains(&text.len()) {
            Ok(Self(text.to_string()))
        } else {
            Err(GhostError::invalid_format("invalid fingerprint"))
        }
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = GhostError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Generator for honeytoken identifiers
///
/// Honeytokens are never stored; they are minted on demand from the
/// reserved marker plus a random tail drawn from the identifier alphabet.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoneytokenGenerator;

impl HoneytokenGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self
    }

    /// Mint a fresh honeytoken identifier
    pub fn mint<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        format!("{}{}", HONEYTOKEN_PREFIX, random_group(rng))
    }
}

fn random_group<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..4)
        .map(|_| {
            let idx = rng.gen_range(0..IDENTIFIER_ALPHABET.len());
            IDENTIFIER_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn well_formed_ids_parse() {
        for id in ["GHOST-ABCD-2345", "GHOST-ZZZZ-9999", "GHOST-A2B3-C4D5"] {
            assert!(SessionId::parse(id).is_ok(), "{id} should parse");
        }
    }

    #[test]
    fn malformed_ids_fail_with_invalid_format() {
        let cases = [
            "",
            "GHOST",
            "GHOST-ABCD",
            "GHOST-ABCD-234",
            "GHOST-ABCD-23456",
            "ghost-abcd-2345",
            "GHOST-AB0D-2345", // ambiguous zero
            "GHOST-ABID-2345", // ambiguous I
            "GHOST-ABOD-2345", // ambiguous O
            "GHOST-AB1D-2345", // ambiguous one
            "SPOOK-ABCD-2345",
            "GHOST_ABCD_2345",
            "GHOST-ABCD-2345-EXTRA",
        ];
        for id in cases {
            let err = SessionId::parse(id).unwrap_err();
            assert!(
                matches!(err, GhostError::InvalidFormat { .. }),
                "{id} should be InvalidFormat"
            );
        }
    }

    #[test]
    fn generated_ids_always_match_grammar() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let id = SessionId::generate(&mut rng);
            assert!(SessionId::parse(id.as_str()).is_ok());
        }
    }

    #[test]
    fn honeytoken_prefix_is_detected_without_grammar() {
        assert!(is_honeytoken("GHOST-TRAP-AB12"));
        assert!(is_honeytoken("GHOST-TRAP-XXXX"));
        assert!(!is_honeytoken("GHOST-ABCD-2345"));
        assert!(!is_honeytoken("GHOST-TRAX-2345"));
    }

    #[test]
    fn minted_honeytokens_carry_the_marker() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let token = HoneytokenGenerator::new().mint(&mut rng);
        assert!(is_honeytoken(&token));
    }

    #[test]
    fn fingerprint_length_bounds() {
        assert!(Fingerprint::parse("short").is_err());
        assert!(Fingerprint::parse("eightchr").is_ok());
        assert!(Fingerprint::parse(&"f".repeat(128)).is_ok());
        assert!(Fingerprint::parse(&"f".repeat(129)).is_err());
    }

    #[test]
    fn session_id_serializes_as_plain_string() {
        let id = SessionId::parse("GHOST-ABCD-2345").unwrap();
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"GHOST-ABCD-2345\""
        );
    }
}
