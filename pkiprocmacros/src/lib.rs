//! Procedural macros used in the definition of accessors and functional updates for the value types
//! in pathval, i.e., ValidationConfig and ValidatorState.
//!
//! Both macros are invoked inside an `impl` block of a type that derives `Clone`:
//!     ```ignore
//!     impl ValidationConfig {
//!         gets_and_withs!(explicit_policy_required, bool);
//!     }
//!     ```

use proc_macro_error::{abort_call_site, proc_macro_error};
use quote::{format_ident, quote};
use syn::parse::{Parse, ParseStream, Result};
use syn::{Ident, Token, Type};

/// Signature contains the results of parsing a with_field or gets_and_withs definition, i.e., the
/// name of a field and the corresponding type.
struct Signature {
    field_name: Ident,
    field_type: Type,
}

/// Syntax contains the components of a definition, i.e., a field name, a comma and a field type.
/// For example:
///     ```ignore
///     with_field!(working_issuer_name, Name);
///     ```
struct Syntax {
    field_name: Ident,
    _comma_token: Token!(,),
    field_type: Type,
}

impl Parse for Signature {
    fn parse(stream: ParseStream) -> Result<Self> {
        if stream.is_empty() {
            abort_call_site!("Expected a field name and a field type, i.e., with_field!(index, usize)");
        }

        let syntax = Syntax {
            field_name: stream.parse()?,
            _comma_token: stream.parse()?,
            field_type: stream.parse()?,
        };

        Ok(Signature {
            field_name: syntax.field_name,
            field_type: syntax.field_type,
        })
    }
}

fn with_tokens(signature: &Signature) -> proc_macro2::TokenStream {
    let field = &signature.field_name;
    let field_t = &signature.field_type;
    let with = format_ident!("with_{}", field);
    let with_comment = format!(
        "`{}` returns a copy of this instance with `{}` set to the given value",
        with, field
    );

    quote! {
        #[doc = #with_comment]
        #[must_use]
        pub fn #with(&self, v: #field_t) -> Self {
            Self {
                #field: v,
                ..self.clone()
            }
        }
    }
}

/// `with_field` generates a `with_<field>` function that returns a copy of `self` with one field
/// replaced.
#[proc_macro_error]
#[proc_macro]
pub fn with_field(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as Signature);
    with_tokens(&signature).into()
}

/// `gets_and_withs` generates a getter named for the field, which returns a clone of the value, and
/// a `with_<field>` function as generated by `with_field`.
#[proc_macro_error]
#[proc_macro]
pub fn gets_and_withs(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as Signature);
    let field = &signature.field_name;
    let field_t = &signature.field_type;
    let getter_comment = format!("`{}` returns the current `{}` value", field, field);
    let with = with_tokens(&signature);

    let tokens = quote! {
        #[doc = #getter_comment]
        pub fn #field(&self) -> #field_t {
            self.#field.clone()
        }
        #with
    };
    tokens.into()
}
