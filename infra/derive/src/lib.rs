#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the tinybus crates.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! tinybus-derive = { path = "../derive" }
//! thiserror = "2"
//! ```

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for the error enums of the workspace.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context(..)`
///   to `Result<T, Name>` and to `Result<T, Source>` for every variant wrapping a source error.
/// * **Conversions**: Implements `From<Source>` for variants with a `source` field
///   (or a field marked `#[source]`/`#[from]`), so `?` works on upstream errors.
/// * **Formatting**: Emits a module-local `format_context` helper for `#[error(..)]` strings.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants.
/// 2. Variants wrapping a source error must also carry `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[tinybus_derive::tinybus_error]
/// pub enum LoadError {
///     #[error("Parse error{}: {source}", format_context(.context))]
///     Parse { source: std::num::ParseIntError, context: Option<Cow<'static, str>> },
///
///     #[error("Missing value{}: {message}", format_context(.context))]
///     Missing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn port(raw: &str) -> Result<u16, LoadError> {
///     Ok(raw.parse::<u16>().context("reading port")?)
/// }
/// ```
#[proc_macro_attribute]
pub fn tinybus_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}
