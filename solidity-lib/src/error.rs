use thiserror::Error;

/// Everything that can abort the analysis of a function.
///
/// These are structural problems: the program uses a construct the model
/// does not support, or accesses something that cannot exist. Imprecision is
/// never an error, it is expressed through Top values instead. Debug
/// directives do not use this type for resolution failures, they are
/// reported as warnings and skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("undeclared variable `{0}`")]
    UndeclaredVariable(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("`{container}` has no member `{member}`")]
    UnknownMember { container: String, member: String },

    #[error("member `{member}` declared twice in `{container}`")]
    DuplicateMember { container: String, member: String },

    #[error("undefined struct `{0}`")]
    UndefinedStruct(String),

    #[error("undefined enum `{0}`")]
    UndefinedEnum(String),

    #[error("unsupported type `{0}`")]
    UnsupportedType(String),

    #[error("malformed access `{0}`")]
    MalformedAccess(String),

    #[error("`{function}` expects {expected} arguments, {given} given")]
    ArgumentCountMismatch {
        function: String,
        expected: usize,
        given: usize,
    },

    #[error("index {index} out of bounds for `{array}` of length {length}")]
    IndexOutOfBounds {
        array: String,
        index: String,
        length: u64,
    },

    #[error("negative index {index} into `{array}`")]
    NegativeIndex { array: String, index: String },

    #[error("operator `{op}` is not supported on {operands}")]
    UnsupportedOperator { op: String, operands: String },

    #[error("`{0}` cannot be assigned to")]
    NotAssignable(String),

    #[error("invalid debug directive: {0}")]
    InvalidDirective(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type Result<T> = core::result::Result<T, Error>;
