//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations.
//!
//! # Usage
//!
//! ```ignore
//! use mexico_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum MachineError {
//!     #[error("unknown opcode: {0}")]
//!     UnknownOpcode(String),
//!
//!     #[error("priority {priority}: {source}")]
//!     Execution {
//!         priority: u16,
//!         #[source]
//!         source: Box<MachineError>,
//!     },
//!
//!     #[error("stack underflow")]
//!     StackUnderflow,
//! }
//! ```
//!
//! Only the fields a message refers to are bound, so messages may leave
//! fields out.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, Ident, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (display_arms, source_arms) = match &input.data {
        Data::Enum(data_enum) => {
            let mut display_arms = Vec::with_capacity(data_enum.variants.len());
            let mut source_arms = Vec::new();
            for variant in &data_enum.variants {
                let ident = &variant.ident;
                let message = error_message(&variant.attrs, variant)?;
                let arm = Arm::build(quote!(Self::#ident), &variant.fields, &message)?;
                display_arms.push(arm.display);
                source_arms.extend(arm.source);
            }
            (display_arms, source_arms)
        }
        Data::Struct(data_struct) => {
            let message = error_message(&input.attrs, &input.ident)?;
            let arm = Arm::build(quote!(Self), &data_struct.fields, &message)?;
            (vec![arm.display], arm.source.into_iter().collect())
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    #(#display_arms)*
                }
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {
            #[allow(unreachable_patterns)]
            fn source(&self) -> ::std::option::Option<&(dyn ::std::error::Error + 'static)> {
                match self {
                    #(#source_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    })
}

/// Match arms generated for a single variant (or struct).
struct Arm {
    display: TokenStream2,
    source: Option<TokenStream2>,
}

impl Arm {
    fn build(path: TokenStream2, fields: &Fields, message: &str) -> syn::Result<Self> {
        let (format, used) = rewrite_placeholders(message);

        match fields {
            Fields::Unit => Ok(Self {
                display: quote! { #path => write!(f, #format), },
                source: None,
            }),
            Fields::Named(named) => {
                let mut bound: Vec<&Ident> = Vec::new();
                let mut source = None;
                for field in &named.named {
                    let Some(ident) = field.ident.as_ref() else {
                        continue;
                    };
                    if has_source_attr(&field.attrs) {
                        source = Some(ident);
                    }
                    if used.iter().any(|u| ident == u) {
                        bound.push(ident);
                    }
                }
                let args = used.iter().map(|u| format_ident!("{}", u));
                let display = quote! {
                    #path { #(#bound,)* .. } => write!(f, #format, #(#args = #args),*),
                };
                let source = source.map(|ident| {
                    quote! {
                        #path { #ident, .. } => {
                            let source: &(dyn ::std::error::Error + 'static) = &**#ident;
                            ::std::option::Option::Some(source)
                        }
                    }
                });
                Ok(Self { display, source })
            }
            Fields::Unnamed(unnamed) => {
                let count = unnamed.unnamed.len();
                let mut source = None;
                let bindings: Vec<TokenStream2> = unnamed
                    .unnamed
                    .iter()
                    .enumerate()
                    .map(|(i, field)| {
                        let ident = format_ident!("f{}", i);
                        if has_source_attr(&field.attrs) {
                            source = Some(i);
                        }
                        if used.iter().any(|u| *u == ident.to_string()) {
                            ident.into_token_stream()
                        } else {
                            quote!(_)
                        }
                    })
                    .collect();
                for u in &used {
                    let index = u.strip_prefix('f').and_then(|n| n.parse::<usize>().ok());
                    if index.is_none_or(|i| i >= count) {
                        return Err(syn::Error::new_spanned(
                            unnamed,
                            format!("#[error] refers to `{{{u}}}`, which is not a field"),
                        ));
                    }
                }
                let args = used.iter().map(|u| format_ident!("{}", u));
                let display = quote! {
                    #path(#(#bindings),*) => write!(f, #format, #(#args = #args),*),
                };
                let source = source.map(|i| {
                    let wildcards = (0..count).map(|j| {
                        if j == i {
                            quote!(inner)
                        } else {
                            quote!(_)
                        }
                    });
                    quote! {
                        #path(#(#wildcards),*) => {
                            let source: &(dyn ::std::error::Error + 'static) = &**inner;
                            ::std::option::Option::Some(source)
                        }
                    }
                });
                Ok(Self { display, source })
            }
        }
    }
}

fn has_source_attr(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident("source"))
}

/// Reads the string literal out of `#[error("...")]`.
fn error_message<T: ToTokens>(attrs: &[Attribute], target: &T) -> syn::Result<String> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("error")) else {
        return Err(syn::Error::new_spanned(
            target,
            "missing #[error(\"...\")] attribute",
        ));
    };

    let Meta::List(list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "expected #[error(\"message\")]",
        ));
    };

    match syn::parse2::<Lit>(list.tokens.clone()) {
        Ok(Lit::Str(lit)) => Ok(lit.value()),
        _ => Err(syn::Error::new_spanned(
            &attr.meta,
            "#[error] takes a single string literal",
        )),
    }
}

/// Rewrites positional placeholders (`{0}`) to named ones (`{f0}`) and
/// returns the rewritten format string with the distinct names it uses.
fn rewrite_placeholders(message: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(message.len() + 8);
    let mut used: Vec<String> = Vec::new();
    let mut chars = message.chars().peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        if c != '{' {
            continue;
        }
        if chars.peek() == Some(&'{') {
            out.push('{');
            chars.next();
            continue;
        }

        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next == '}' || next == ':' {
                break;
            }
            name.push(next);
            chars.next();
        }

        if !name.is_empty() && name.chars().all(|ch| ch.is_ascii_digit()) {
            name.insert(0, 'f');
        }
        out.push_str(&name);
        if !name.is_empty() && !used.contains(&name) {
            used.push(name);
        }
    }

    (out, used)
}
