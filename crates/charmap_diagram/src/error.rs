// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors reported by the diagram language and graph model.

/// Broad category of a language error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed statement text
    Parse,
    /// Well-formed text that cannot be evaluated
    Semantic,
    /// Rejected by the host executor
    Host,
    /// The node depends on itself through its connections
    Cycle,
}

/// Error raised while parsing or evaluating a statement.
///
/// The `Display` text is the diagnostic shown against the statement's lines.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// A token that does not fit the grammar at this position
    #[error("Unexpected '{found}', expected {expected}")]
    UnexpectedToken {
        /// Text of the offending token
        found: String,
        /// What the parser was looking for
        expected: String,
    },

    /// An opening parenthesis was never closed
    #[error("Missing ')'")]
    MissingCloseParen,

    /// An opening bracket was never closed
    #[error("Missing ']'")]
    MissingCloseBracket,

    /// The statement ended in the middle of an expression
    #[error("Unexpected end of input")]
    UnexpectedEnd,

    /// A string literal without its closing quote
    #[error("Unterminated string literal")]
    UnterminatedString,

    /// A character the language has no use for
    #[error("Unexpected character '{0}'")]
    UnexpectedCharacter(char),

    /// Expressions nested beyond the parser's limit
    #[error("Expression nested deeper than {0} levels")]
    NestingTooDeep(usize),

    /// A complete expression followed by more text
    #[error("Unexpected '{0}' after end of expression")]
    TrailingInput(String),

    /// Name not bound in any enclosing scope
    #[error("Unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// Member lookup failed
    #[error("{type_name} has no member '{member}'")]
    UnknownMember {
        /// Type name of the receiver
        type_name: String,
        /// Requested member
        member: String,
    },

    /// Operator applied to unsupported operand types
    #[error("Cannot apply '{op}' to {left} and {right}")]
    InvalidOperands {
        /// Operator symbol
        op: char,
        /// Type name of the left operand
        left: String,
        /// Type name of the right operand
        right: String,
    },

    /// Element-wise vector operation on vectors of different lengths
    #[error("Vector lengths differ ({left} vs {right})")]
    VectorLengthMismatch {
        /// Length of the left vector
        left: usize,
        /// Length of the right vector
        right: usize,
    },

    /// Vector arithmetic on a vector holding something other than floats
    #[error("Operator '{op}' requires vectors of floats")]
    NonFloatVectorElement {
        /// Operator symbol
        op: char,
    },

    /// Construction call without a required parameter
    #[error("{class} requires parameter '{parameter}'")]
    MissingParameter {
        /// Class being constructed
        class: String,
        /// Missing parameter name
        parameter: String,
    },

    /// Construction call naming a parameter the class does not have
    #[error("{class} has no parameter '{parameter}'")]
    UnknownParameter {
        /// Class being constructed
        class: String,
        /// Offending parameter name
        parameter: String,
    },

    /// Construction call with positional arguments
    #[error("Arguments to {class} must be named")]
    PositionalConstruction {
        /// Class being constructed
        class: String,
    },

    /// The same name given twice in one call
    #[error("Duplicate argument '{0}'")]
    DuplicateArgument(String),

    /// Named arguments passed to a function that only takes positional ones
    #[error("Function does not accept named arguments")]
    NamedArgumentsNotAccepted,

    /// Wrong number of positional arguments
    #[error("Expected {expected} argument(s), got {found}")]
    WrongArgumentCount {
        /// Number of arguments the callee takes
        expected: usize,
        /// Number of arguments supplied
        found: usize,
    },

    /// Call syntax applied to a value that cannot be called
    #[error("Cannot call a value of type {0}")]
    NotCallable(String),

    /// `$` used more often than the node has inputs
    #[error("No more inputs")]
    NoMoreInputs,

    /// `$` used where the evaluator does not provide inputs
    #[error("Inputs are not available here")]
    InputRejected,

    /// Failure reported by host code
    #[error("{0}")]
    Host(String),

    /// `return` value of the wrong type
    #[error("Return type mismatch: expected {expected}, got {found}")]
    ReturnTypeMismatch {
        /// Type name the host asked for
        expected: String,
        /// Type name of the returned value
        found: String,
    },

    /// `return` used where the host takes no result
    #[error("Return is not accepted here")]
    ReturnNotAccepted,

    /// Node lies on or depends on a connection cycle
    #[error("Cyclic dependency detected")]
    CyclicDependency,
}

impl EvalError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnexpectedToken { .. }
            | Self::MissingCloseParen
            | Self::MissingCloseBracket
            | Self::UnexpectedEnd
            | Self::UnterminatedString
            | Self::UnexpectedCharacter(_)
            | Self::NestingTooDeep(_)
            | Self::TrailingInput(_) => ErrorKind::Parse,
            Self::ReturnTypeMismatch { .. } | Self::ReturnNotAccepted => ErrorKind::Host,
            Self::CyclicDependency => ErrorKind::Cycle,
            _ => ErrorKind::Semantic,
        }
    }

    /// Error raised from host code with a custom message
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host(message.into())
    }
}

/// Invalid operation on the diagram graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiagramError {
    /// Slot is empty or out of range
    #[error("Node not found: {0}")]
    NodeNotFound(usize),

    /// Input index beyond the node's inputs
    #[error("Node {node} has no input {input}")]
    InputOutOfRange {
        /// Node slot index
        node: usize,
        /// Requested input index
        input: usize,
    },

    /// Output index beyond the node's outputs
    #[error("Node {node} has no output {output}")]
    OutputOutOfRange {
        /// Node slot index
        node: usize,
        /// Requested output index
        output: usize,
    },
}
