use thiserror::Error;

/// A structural invariant found broken by [`crate::node::validate`] or
/// [`crate::AvlTree::validate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("keys are not in strictly increasing in-order sequence")]
    OutOfOrder,

    #[error("node is unbalanced (balance factor {balance})")]
    Unbalanced { balance: i16 },

    #[error("cached height {cached} does not match actual height {actual}")]
    StaleHeight { cached: u8, actual: u8 },

    #[error("tree holds {counted} nodes but records a length of {recorded}")]
    LengthMismatch { counted: usize, recorded: usize },
}
