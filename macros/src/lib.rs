//! Derive macros for the Listkeeper state engine
//!
//! This crate provides procedural macros to reduce boilerplate on action enums.
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Generates classification helpers for action enums
//!
//! # Example
//!
//! ```ignore
//! use listkeeper_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum AppAction {
//!     #[command]
//!     AddList { name: String },
//!
//!     #[lifecycle]
//!     Rehydrate { state: AppState },
//! }
//!
//! // Generated methods:
//! assert!(AppAction::AddList { name: "test".into() }.is_command());
//! assert_eq!(AppAction::AddList { name: "test".into() }.action_name(), "AddList");
//! assert_eq!(AppAction::COMMANDS, &["AddList"]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Variant, parse_macro_input};

/// Derive macro for Action enums
///
/// Generates helper items for action enums:
/// - `is_command()` - Returns true if this variant is a user command
/// - `is_lifecycle()` - Returns true if this variant is a lifecycle signal
/// - `action_name()` - Returns the variant name
/// - `COMMANDS` - Names of every `#[command]` variant, in declaration order
///
/// Variants with neither attribute are internal wrappers and report `false`
/// for both predicates.
///
/// # Attributes
///
/// - `#[command]` - Mark a variant as a command
/// - `#[lifecycle]` - Mark a variant as a lifecycle signal (never synced or persisted)
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - A variant has both `#[command]` and `#[lifecycle]` attributes
///
/// # Example
///
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// enum AppAction {
///     #[command]
///     DeleteList { list_index: usize },
///
///     #[command]
///     SetTheme { mode: Theme },
///
///     #[lifecycle]
///     Rehydrate { state: Box<AppState> },
///
///     Synced(Box<AppAction>),
/// }
///
/// let action = AppAction::DeleteList { list_index: 0 };
///
/// assert!(action.is_command());
/// assert!(!action.is_lifecycle());
/// assert_eq!(action.action_name(), "DeleteList");
/// ```
#[proc_macro_derive(Action, attributes(command, lifecycle))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut command_arms = Vec::new();
    let mut command_names = Vec::new();
    let mut lifecycle_arms = Vec::new();
    let mut name_arms = Vec::new();

    for variant in &data_enum.variants {
        let is_command = has_attribute(&variant.attrs, "command");
        let is_lifecycle = has_attribute(&variant.attrs, "lifecycle");

        if is_command && is_lifecycle {
            return syn::Error::new_spanned(
                variant,
                "Variant cannot be both #[command] and #[lifecycle]",
            )
            .to_compile_error()
            .into();
        }

        let pattern = variant_pattern(variant);
        let variant_name = variant.ident.to_string();

        if is_command {
            command_arms.push(quote! { #pattern => true, });
            command_names.push(variant_name.clone());
        }

        if is_lifecycle {
            lifecycle_arms.push(quote! { #pattern => true, });
        }

        name_arms.push(quote! { #pattern => #variant_name, });
    }

    let expanded = quote! {
        impl #name {
            /// Names of every command variant, in declaration order
            pub const COMMANDS: &'static [&'static str] = &[#(#command_names),*];

            /// Returns true if this action is a command
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is a lifecycle signal
            #[must_use]
            #[allow(unreachable_patterns)]
            pub const fn is_lifecycle(&self) -> bool {
                match self {
                    #(#lifecycle_arms)*
                    _ => false,
                }
            }

            /// Returns the variant name of this action
            #[must_use]
            pub const fn action_name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Match pattern that ignores the variant's fields
fn variant_pattern(variant: &Variant) -> TokenStream2 {
    let ident = &variant.ident;
    match &variant.fields {
        Fields::Named(_) => quote! { Self::#ident { .. } },
        Fields::Unnamed(_) => quote! { Self::#ident(..) },
        Fields::Unit => quote! { Self::#ident },
    }
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
