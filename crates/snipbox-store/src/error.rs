use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Clips must carry non-empty content.
    #[error("content is required")]
    EmptyContent,

    /// The code was never created or its entry has expired. The two cases
    /// are indistinguishable on purpose.
    #[error("clip not found or expired")]
    NotFound,

    /// The requester is not the clip's owner, or the clip has no owner and
    /// therefore no edit rights exist.
    #[error("no permission to edit this clip")]
    Forbidden,
}
