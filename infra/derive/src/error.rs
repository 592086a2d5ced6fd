use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, Field, Fields, Ident, Type, Variant};

/// One enum variant as the generated code sees it.
struct Case<'a> {
    ident: &'a Ident,
    source: Option<&'a Type>,
}

pub fn expand(input: DeriveInput) -> TokenStream {
    match expand_enum(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand_enum(input: &DeriveInput) -> syn::Result<TokenStream> {
    let syn::Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(&input.ident, "arbor_error expects an enum"));
    };
    let cases = data.variants.iter().map(case).collect::<syn::Result<Vec<_>>>()?;
    if cases.is_empty() {
        return Err(syn::Error::new_spanned(&input.ident, "arbor_error expects at least one variant"));
    }

    let name = &input.ident;
    let ext = format_ident!("{}Ext", name);
    let kinds = cases.iter().map(|case| {
        let ident = case.ident;
        let label = ident.to_string();
        quote! { Self::#ident { .. } => #label, }
    });
    let slots = cases.iter().map(|case| {
        let ident = case.ident;
        quote! { Self::#ident { context: slot, .. } }
    });
    let conversions = cases.iter().filter_map(|case| {
        let ident = case.ident;
        let source = case.source?;
        Some(quote! {
            #[automatically_derived]
            impl From<#source> for #name {
                fn from(source: #source) -> Self {
                    Self::#ident { source, context: None }
                }
            }
        })
    });

    Ok(quote! {
        #[allow(non_shorthand_field_patterns)]
        #[derive(Debug, ::thiserror::Error)]
        #input

        #[automatically_derived]
        impl #name {
            /// Variant name, for structured log fields and assertions.
            #[must_use]
            pub const fn kind(&self) -> &'static str {
                match self {
                    #( #kinds )*
                }
            }

            /// Replaces the context shown after the error label.
            #[must_use]
            pub fn with_context(mut self, context: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                match &mut self {
                    #( #slots )|* => *slot = Some(context.into()),
                }
                self
            }
        }

        /// Adds `.context()` to results whose error converts into this type.
        pub trait #ext<T> {
            /// Converts the error and attaches `context` to it.
            ///
            /// # Errors
            /// Returns the converted error when `self` is `Err`.
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Result<T, #name>;
        }

        #[automatically_derived]
        impl<T, E: Into<#name>> #ext<T> for Result<T, E> {
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Result<T, #name> {
                self.map_err(|err| err.into().with_context(context))
            }
        }

        #( #conversions )*

        #[allow(dead_code, clippy::ref_option)]
        fn format_context(context: &Option<std::borrow::Cow<'static, str>>) -> String {
            context.as_ref().map(|context| format!(" ({context})")).unwrap_or_default()
        }
    })
}

fn case(variant: &Variant) -> syn::Result<Case<'_>> {
    let Fields::Named(fields) = &variant.fields else {
        return Err(syn::Error::new_spanned(variant, "arbor_error variants need named fields"));
    };

    let context = named(fields.named.iter(), "context").ok_or_else(|| {
        syn::Error::new_spanned(
            &variant.ident,
            "arbor_error variants need a `context: Option<Cow<'static, str>>` field",
        )
    })?;
    if !is_option(&context.ty) {
        return Err(syn::Error::new_spanned(&context.ty, "`context` must be an `Option`"));
    }

    Ok(Case { ident: &variant.ident, source: named(fields.named.iter(), "source").map(|f| &f.ty) })
}

fn named<'a>(mut fields: impl Iterator<Item = &'a Field>, name: &str) -> Option<&'a Field> {
    fields.find(|field| field.ident.as_ref().is_some_and(|ident| ident == name))
}

fn is_option(ty: &Type) -> bool {
    matches!(ty, Type::Path(path) if path.path.segments.last().is_some_and(|seg| seg.ident == "Option"))
}
