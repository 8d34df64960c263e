//! Errors raised while building a program or reading analysis options.
//!
//! The solvers themselves never fail: unresolvable dispatch and unexpected IR shapes
//! fall back to a deterministic default instead.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("unknown class `{0}`")]
    UnknownClass(String),

    #[error("class `{0}` is declared twice")]
    DuplicateClass(String),

    /// A method reference that does not resolve to any declared method.
    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    #[error("method `{subsignature}` is declared twice in `{class}`")]
    DuplicateMethod { class: String, subsignature: String },

    #[error("malformed method signature `{0}`")]
    MalformedSignature(String),

    /// A branch target that lies outside the method body.
    #[error("statement {stmt} of `{method}` jumps to {target}, but the body has {len} statements")]
    InvalidJumpTarget {
        method: String,
        stmt: usize,
        target: usize,
        len: usize,
    },

    #[error("method `{0}` has no body")]
    MissingBody(String),

    /// The main method must be static and have a body.
    #[error("`{0}` cannot be the main method")]
    InvalidMain(String),

    #[error("no entry method: set a main method or pass the `entry` option")]
    MissingEntry,

    #[error("malformed option `{0}`, expected `key:value`")]
    MalformedOption(String),

    #[error("invalid value `{value}` for option `{key}`")]
    InvalidOptionValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
