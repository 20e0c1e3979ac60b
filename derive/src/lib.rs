//! Derive macros for the `xdr-wire` codec traits.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, Index, Meta};

/// Derive macro for the `Encode` trait.
///
/// Implements `Encode` for structs where every field implements `Encode`.
/// Fields are written in declaration order, each one routed through the
/// encoder's dispatch (so registered override codecs apply to fields too).
///
/// # Helper attributes
///
/// `#[xdr(skip)]` omits a field from the wire entirely.
///
/// # Example
///
/// ```
/// use xdr_wire::Encode;
///
/// #[derive(Encode)]
/// struct Point {
///     x: u32,
///     y: u32,
///     #[xdr(skip)]
///     dirty: bool,
/// }
/// ```
#[proc_macro_derive(Encode, attributes(xdr))]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_encode(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive macro for the `Decode` trait.
///
/// Implements `Decode` for structs where every field implements `Decode`.
/// Fields are read in declaration order into the existing field storage.
/// `#[xdr(skip)]` fields are left untouched.
///
/// # Example
///
/// ```
/// use xdr_wire::Decode;
///
/// #[derive(Decode, Default)]
/// struct Point {
///     x: u32,
///     y: u32,
/// }
/// ```
#[proc_macro_derive(Decode, attributes(xdr))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_decode(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_encode(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

    let accesses = field_accesses(input, "Encode")?;
    let enc = param_ident("enc", !accesses.is_empty());
    let body = if accesses.is_empty() {
        quote! { Ok(0) }
    } else {
        let field_writes = accesses.iter().map(|access| {
            quote! { n += enc.encode_value(&self.#access)?; }
        });
        quote! {
            let mut n = 0usize;
            #(#field_writes)*
            Ok(n)
        }
    };

    Ok(quote! {
        impl #impl_generics ::xdr_wire::Encode for #name #type_generics #where_clause {
            fn encode(&self, #enc: &mut ::xdr_wire::Encoder<'_>) -> ::xdr_wire::Result<usize> {
                #body
            }
        }
    })
}

fn expand_decode(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

    let accesses = field_accesses(input, "Decode")?;
    let dec = param_ident("dec", !accesses.is_empty());
    let body = if accesses.is_empty() {
        quote! { Ok(0) }
    } else {
        let field_reads = accesses.iter().map(|access| {
            quote! { n += dec.decode_value(&mut self.#access)?; }
        });
        quote! {
            let mut n = 0usize;
            #(#field_reads)*
            Ok(n)
        }
    };

    Ok(quote! {
        impl #impl_generics ::xdr_wire::Decode for #name #type_generics #where_clause {
            fn decode(&mut self, #dec: &mut ::xdr_wire::Decoder<'_>) -> ::xdr_wire::Result<usize> {
                #body
            }
        }
    })
}

/// Collects the access tokens (`ident` or tuple index) of every field that
/// is not marked `#[xdr(skip)]`, in declaration order.
fn field_accesses(input: &DeriveInput, trait_name: &str) -> syn::Result<Vec<TokenStream2>> {
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        Data::Enum(_) => {
            return Err(syn::Error::new_spanned(
                input,
                format!("{trait_name} derive macro does not support enums"),
            ));
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                format!("{trait_name} derive macro does not support unions"),
            ));
        }
    };

    let mut accesses = Vec::new();
    match fields {
        Fields::Named(named) => {
            for field in &named.named {
                if is_skipped(field)? {
                    continue;
                }
                let ident = field.ident.as_ref().unwrap();
                accesses.push(quote! { #ident });
            }
        }
        Fields::Unnamed(unnamed) => {
            for (i, field) in unnamed.unnamed.iter().enumerate() {
                if is_skipped(field)? {
                    continue;
                }
                let index = Index::from(i);
                accesses.push(quote! { #index });
            }
        }
        Fields::Unit => {}
    }
    Ok(accesses)
}

/// Parses the `xdr` helper attribute on a field. Only `#[xdr(skip)]` is
/// recognized.
fn is_skipped(field: &Field) -> syn::Result<bool> {
    for attr in &field.attrs {
        if !attr.path().is_ident("xdr") {
            continue;
        }
        match &attr.meta {
            Meta::List(meta_list) => {
                let nested = meta_list.parse_args::<syn::Ident>()?;
                match nested.to_string().as_str() {
                    "skip" => return Ok(true),
                    other => {
                        return Err(syn::Error::new_spanned(
                            nested,
                            format!("Unknown xdr attribute: {other}. Use 'skip'"),
                        ));
                    }
                }
            }
            Meta::Path(_) | Meta::NameValue(_) => {
                return Err(syn::Error::new_spanned(attr, "Use #[xdr(skip)]"));
            }
        }
    }
    Ok(false)
}

/// Underscore-prefixes an unused codec parameter so field-less structs do
/// not trip `unused_variables` at the expansion site.
fn param_ident(name: &str, used: bool) -> syn::Ident {
    if used {
        format_ident!("{}", name)
    } else {
        format_ident!("_{}", name)
    }
}
