use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Opaque, persistable grant to exactly one document subtree.
///
/// String form is `provider:token`, which is what hosts store in config files
/// or environment variables between runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RootCapability {
    /// Provider scheme that issued the grant ("memory", "local", ...)
    pub provider: String,
    /// Provider-issued token; meaningless outside that provider
    pub token: String,
}

impl RootCapability {
    pub fn new(provider: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            token: token.into(),
        }
    }

    /// Issue a fresh random token for `provider`.
    pub fn generate(provider: impl Into<String>) -> Self {
        Self::new(provider, uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RootCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.token)
    }
}

impl FromStr for RootCapability {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((provider, token)) if !provider.is_empty() && !token.is_empty() => {
                Ok(Self::new(provider, token))
            }
            _ => Err(ProviderError::NotGranted(format!(
                "malformed capability '{}', expected provider:token",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_capability() {
        let cap: RootCapability = "local:abc-123".parse().unwrap();
        assert_eq!(cap, RootCapability::new("local", "abc-123"));
        assert_eq!(cap.to_string(), "local:abc-123");

        assert!("local:".parse::<RootCapability>().is_err());
        assert!(":abc".parse::<RootCapability>().is_err());
        assert!("no-separator".parse::<RootCapability>().is_err());
        assert!("".parse::<RootCapability>().is_err());
    }

    #[test]
    fn test_generate_is_unique() {
        let a = RootCapability::generate("memory");
        let b = RootCapability::generate("memory");
        assert_eq!(a.provider, "memory");
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_json_roundtrip_keeps_fields() {
        let cap = RootCapability::new("local", "t1");
        let json = serde_json::to_string(&cap).unwrap();
        assert_eq!(json, r#"{"provider":"local","token":"t1"}"#);
    }
}
