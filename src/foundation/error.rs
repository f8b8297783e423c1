/// Convenience result type used by every node.
pub type NodeResult<T> = Result<T, NodeError>;

/// Error taxonomy shared by all nodes.
///
/// Every error aborts the node call that raised it; nothing is retried or partially returned.
#[derive(thiserror::Error, Debug)]
pub enum NodeError {
    /// Malformed inputs: bad shapes, out-of-range parameters, unknown options.
    #[error("validation error: {0}")]
    Validation(String),

    /// An enforced contract on the inputs does not hold (for example a latent batch that is
    /// not exactly one item).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A pixel-math expression failed to parse or compile.
    #[error("expression error: {0}")]
    Expression(String),

    /// A persisted exploration state is truncated or corrupt.
    #[error("exploration state error: {0}")]
    State(String),

    /// A persisted exploration state was written with another format version.
    #[error("incompatible exploration state version {found} (expected {expected})")]
    IncompatibleState {
        /// Version tag read from the file.
        found: u8,
        /// Version tag this build reads and writes.
        expected: u8,
    },

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NodeError {
    /// Build a [`NodeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`NodeError::Precondition`] value.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Build a [`NodeError::Expression`] value.
    pub fn expression(msg: impl Into<String>) -> Self {
        Self::Expression(msg.into())
    }

    /// Build a [`NodeError::State`] value.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Build a [`NodeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
