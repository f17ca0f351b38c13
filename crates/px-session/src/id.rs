use std::fmt;
use uuid::Uuid;

/// Random 128-bit session identifier in canonical 32-char hex form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random id. Collisions with existing files are not checked.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Decode a cookie value. Any UUID spelling is accepted (hex, hyphenated,
    /// braced, urn) and normalized; anything else yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim())
            .ok()
            .map(|uuid| Self(uuid.simple().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_32_hex_chars() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, SessionId::generate());
    }

    #[test]
    fn test_parse_normalizes_hyphenated() {
        let id = SessionId::parse("67E55044-10B1-426F-9247-BB680E5FE0C8").unwrap();
        assert_eq!(id.as_str(), "67e5504410b1426f9247bb680e5fe0c8");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SessionId::parse("").is_none());
        assert!(SessionId::parse("not-a-session").is_none());
        assert!(SessionId::parse("../../etc/passwd").is_none());
    }
}
