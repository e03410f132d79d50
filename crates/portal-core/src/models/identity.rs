use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// Public address of a wallet, as handed out by the wallet provider.
///
/// Opaque to this crate: only emptiness and embedded whitespace are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub fn parse(address: &str) -> Result<Self, FeedError> {
        let trimmed = address.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(FeedError::InvalidIdentity {
                value: address.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = FeedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identity::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let id = Identity::parse("  7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU ").unwrap();
        assert_eq!(id.as_str(), "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        assert_eq!(id.short(), "7xKXtg2C");
    }

    #[test]
    fn test_parse_rejects_empty_and_inner_whitespace() {
        assert!(Identity::parse("").is_err());
        assert!(Identity::parse("   ").is_err());
        assert!(Identity::parse("abc def").is_err());
    }

    #[test]
    fn test_short_on_short_address() {
        let id = Identity::parse("A").unwrap();
        assert_eq!(id.short(), "A");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Identity = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(ok.as_str(), "abc");
        assert!(serde_json::from_str::<Identity>("\"\"").is_err());
    }
}
