//! Derive macros for the mexico crate.
//!
//! Provides `#[derive(Error)]`, which implements `Display` and
//! `std::error::Error` from `#[error("...")]` attributes.

mod error;

use proc_macro::TokenStream;

/// Implements `Display` and `Error` for an error enum or struct.
///
/// Fields tagged `#[source]` must hold a boxed error and are returned from
/// `Error::source`.
#[proc_macro_derive(Error, attributes(error, source))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
