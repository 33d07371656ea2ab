use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity of a live session (UUID v7 for time-ordering).
///
/// Objects record the `SessionId` of the session they are attached to, so a
/// session can tell its own objects apart from detached ones.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Generate a new time-ordered session ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Short representation (first 8 characters of UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for SessionId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidSessionId(e.to_string()))
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.short_id())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn parse_roundtrip() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<SessionId>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidSessionId(_)));
    }

    #[test]
    fn short_id_is_8_chars() {
        assert_eq!(SessionId::new().short_id().len(), 8);
    }
}
