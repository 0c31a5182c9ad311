//! Client roles

use serde::{Deserialize, Serialize};

/// Role a client holds within a session, fixed at join time.
///
/// Producers publish state and events; consumers receive updates and may also
/// emit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Producer,
    Consumer,
}

impl Role {
    /// Get the wire name of this role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }

    /// Parse a role from its wire name
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "producer" => Some(Self::Producer),
            "consumer" => Some(Self::Consumer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("producer"), Some(Role::Producer));
        assert_eq!(Role::parse("consumer"), Some(Role::Consumer));
        assert_eq!(Role::parse("observer"), None);
        assert_eq!(Role::parse("Producer"), None);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Producer).unwrap(), "\"producer\"");
        let role: Role = serde_json::from_str("\"consumer\"").unwrap();
        assert_eq!(role, Role::Consumer);
    }
}
