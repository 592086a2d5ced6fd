use std::borrow::Cow;

/// Errors raised while reading, writing or building structured entities.
///
/// A vetoed validation is not an error; see [`crate::SetOutcome::Rejected`].
#[arbor_derive::arbor_error]
pub enum StructError {
    /// A bracketed index addressed a child that has no positional access.
    #[error("Unexpected reference index{}: {message}", format_context(.context))]
    UnsupportedIndex { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A bracketed index addressed a collection position with no element.
    #[error("Index out of bounds{}: {message}", format_context(.context))]
    IndexOutOfBounds { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A child type name could not be resolved through the registry.
    #[error("Type resolution failed{}: {message}", format_context(.context))]
    TypeResolution { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A sub-path addressed a collection without selecting an element.
    #[error("Invalid attribute path{}: {message}", format_context(.context))]
    InvalidPath { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A value does not have the shape the target child expects.
    #[error("Unexpected value{}: {message}", format_context(.context))]
    UnexpectedValue { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Layered configuration could not be read or deserialized.
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}
