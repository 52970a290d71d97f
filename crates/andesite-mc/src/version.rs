//! Protocol version definitions.

/// Wire protocol version.
///
/// The engine speaks a single pinned version; the enum exists so the
/// handshake builder and any future version negotiation share one source
/// of truth for the raw number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ProtocolVersion {
    /// Protocol version 4 (Minecraft 1.7.2-1.7.5)
    V4,
}

impl ProtocolVersion {
    /// Attempt to create a `ProtocolVersion` from a raw protocol version
    /// number.
    ///
    /// Returns `None` if the version is not supported.
    #[must_use]
    pub const fn from_raw(version: i32) -> Option<Self> {
        match version {
            4 => Some(Self::V4),
            _ => None,
        }
    }

    /// Get the raw protocol version number.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::V4 => 4,
        }
    }

    /// Gets a list of human-readable version names (e.g., `["1.7.5", "1.7.2"]`).
    #[must_use]
    pub const fn names(self) -> &'static [&'static str] {
        match self {
            Self::V4 => &["1.7.5", "1.7.4", "1.7.2"],
        }
    }

    /// Gets the primary version name (e.g., "1.7.5").
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.names()[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v4() {
        let version = ProtocolVersion::from_raw(4).unwrap();
        assert_eq!(version, ProtocolVersion::V4);
        assert_eq!(version.as_raw(), 4);
        assert_eq!(version.name(), "1.7.5");
    }

    #[test]
    fn test_unknown_version() {
        assert!(ProtocolVersion::from_raw(999).is_none());
    }
}
