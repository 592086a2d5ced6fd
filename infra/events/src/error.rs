use std::borrow::Cow;

/// Errors that can occur while registering listeners.
#[arbor_derive::arbor_error]
pub enum EmitterError {
    /// The topic string contained no event names.
    #[error("Invalid topic{}: {message}", format_context(.context))]
    InvalidTopic { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
