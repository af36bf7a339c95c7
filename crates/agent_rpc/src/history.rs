/// Opaque serialized conversation state exchanged with the server each turn.
///
/// The blob's format belongs to the agent runtime; this client only stores
/// and forwards it. Replacement is always wholesale, never a merge, and the
/// empty string is the well-defined fresh-session value. A turn that fails
/// must leave the previous blob untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionHistory {
    blob: String,
}

impl SessionHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current blob; empty means a fresh session.
    #[must_use]
    pub fn current(&self) -> &str {
        &self.blob
    }

    /// Replace the blob wholesale with the value carried by a completed turn.
    pub fn replace(&mut self, blob: String) {
        self.blob = blob;
    }

    /// Reset to the fresh-session value.
    pub fn clear(&mut self) {
        self.blob.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::SessionHistory;

    #[test]
    fn starts_as_fresh_session() {
        let history = SessionHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.current(), "");
    }

    #[test]
    fn replace_and_clear_round_trip() {
        let mut history = SessionHistory::new();
        history.replace("[{\"role\":\"user\"}]".to_string());
        assert_eq!(history.current(), "[{\"role\":\"user\"}]");

        history.clear();
        assert!(history.is_empty());
    }
}
