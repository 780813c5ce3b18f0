//! Common error types shared across crates.

use thiserror::Error;

/// Error returned by the storage collaborators (message rows, settings).
///
/// Collaborators are owned by the embedding application; these variants only
/// distinguish "could not ask" from "asked, but the answer was unusable".
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be queried.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record exists but its contents could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let e = StoreError::Unavailable("database is locked".into());
        assert!(e.to_string().contains("database is locked"));

        let e = StoreError::Corrupt("truncated blob".into());
        assert!(e.to_string().starts_with("corrupt record"));
    }
}
