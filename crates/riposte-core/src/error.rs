//! Error types for combo table loading.
//!
//! Resolution itself never fails: a missing child or a candidate list with
//! no match is an ordinary "no attack" outcome. Errors only arise while
//! building a [`ComboTree`](crate::tree::ComboTree) from definitions.

use thiserror::Error;

/// Errors raised while building a combo tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComboError {
    /// A definition had no keys.
    #[error("combo definition {index} has an empty key sequence")]
    EmptySequence {
        /// Position of the definition in the input list.
        index: usize,
    },

    /// A definition table could not be used.
    #[error("invalid combo definition: {0}")]
    Definition(String),
}

/// Result alias for combo tree construction.
pub type ComboResult<T> = Result<T, ComboError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_definition() {
        let err = ComboError::EmptySequence { index: 3 };
        assert_eq!(err.to_string(), "combo definition 3 has an empty key sequence");
    }
}
