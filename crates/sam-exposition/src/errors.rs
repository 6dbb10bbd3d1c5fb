//! Rendering error types.

/// A dynamic entity could not be rendered. The entity is skipped.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LookupError {
    /// The configuration entry has no usable id.
    #[error("compressor #{position} has no iid")]
    MissingId {
        /// Position in the configuration list.
        position: usize,
    },

    /// The configuration entry has no name.
    #[error("compressor {iid} has no name")]
    MissingName {
        /// Entity id.
        iid: String,
    },
}
