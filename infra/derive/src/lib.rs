#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared across the arbor workspace. A proc-macro crate cannot
//! use its own macros, so the example below is `ignore`d; `tests/ui` compiles it.

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Declares a crate's error enum.
///
/// Every variant has named fields, one of them `context: Option<Cow<'static, str>>`.
/// A field named `source` holds the wrapped error. The macro adds:
///
/// * `#[derive(Debug, thiserror::Error)]`;
/// * `kind()`, the variant name, and `with_context()`;
/// * `From<Source>` for each `source` field;
/// * a `<Name>Ext` trait giving `.context()` to any `Result` whose error converts
///   into the enum;
/// * a module-level `format_context` for `#[error(...)]` strings.
///
/// ```rust,ignore
/// use arbor_derive::arbor_error;
/// use std::borrow::Cow;
///
/// #[arbor_error]
/// pub enum LoadError {
///     #[error("Parse error{}: {source}", format_context(.context))]
///     Parse { source: serde_json::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Missing type{}: {message}", format_context(.context))]
///     MissingType { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn parse(raw: &str) -> Result<serde_json::Value, LoadError> {
///     serde_json::from_str(raw).context("Reading registry document")
/// }
/// ```
#[proc_macro_attribute]
pub fn arbor_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
