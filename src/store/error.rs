//! Store error types.

/// Errors that can occur during collection store operations.
///
/// Every failure is returned as a value; the caller decides how to surface
/// it. A missing owner on a read is not an error (the collection is simply
/// empty) - `NotAuthenticated` only arises from mutations.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// Mutation attempted with no signed-in owner
    NotAuthenticated,
    /// Target document does not exist in the remote store
    NotFound(String),
    /// Remote store rejected the call (transport or server failure)
    Remote(String),
    /// Payload could not be serialized or deserialized
    Payload(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotAuthenticated => write!(f, "Not authenticated. Sign in first."),
            StoreError::NotFound(id) => write!(f, "Document not found: {}", id),
            StoreError::Remote(e) => write!(f, "Remote store error: {}", e),
            StoreError::Payload(e) => write!(f, "Payload error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}
