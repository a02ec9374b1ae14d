// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields};

/// Values of `#[bus(...)]` on one item.
#[derive(Default)]
struct BusAttrs {
    position: Option<(u32, Span)>,
    signature: Option<String>,
}

fn bus_attrs(attrs: &[syn::Attribute]) -> syn::Result<BusAttrs> {
    let mut out = BusAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("bus") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("position") {
                let lit: syn::LitInt = meta.value()?.parse()?;
                out.position = Some((lit.base10_parse::<u32>()?, lit.span()));
                Ok(())
            } else if meta.path.is_ident("signature") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(syn::Error::new(lit.span(), "signature cannot be empty"));
                }
                out.signature = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("expected `position = N` or `signature = \"...\"`"))
            }
        })?;
    }
    Ok(out)
}

/// `#[derive(BusStruct)]`: implements `ajbus::BusType` for a struct.
///
/// Every field needs `#[bus(position = N)]`; positions must cover `0..N`
/// exactly once. A field may also carry `#[bus(signature = "...")]` to
/// override its computed signature. Position errors are compile errors.
///
/// Example:
/// ```ignore
/// use ajbus::BusStruct;
///
/// #[derive(BusStruct)]
/// struct Track {
///     #[bus(position = 1)]
///     title: String,
///     #[bus(position = 0, signature = "u")]
///     number: i32,
/// }
/// // signature: "(us)"
/// ```
#[proc_macro_derive(BusStruct, attributes(bus))]
pub fn derive_bus_struct(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_struct(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct FieldInfo {
    name: syn::Ident,
    ty: syn::Type,
    position: u32,
    signature: Option<String>,
}

fn expand_struct(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let type_name = name.to_string();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "BusStruct does not support generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Only structs with named fields are supported",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(input, "Only structs are supported")),
    };

    if fields.is_empty() {
        return Err(syn::Error::new_spanned(
            input,
            "BusStruct needs at least one field",
        ));
    }

    let mut infos: Vec<FieldInfo> = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "Field must have a name"));
        };
        let attrs = bus_attrs(&field.attrs)?;
        let Some((position, span)) = attrs.position else {
            return Err(syn::Error::new_spanned(
                field,
                format!("field `{field_name}` needs #[bus(position = N)]"),
            ));
        };
        if infos.iter().any(|f| f.position == position) {
            return Err(syn::Error::new(
                span,
                format!("position {position} is already used in `{type_name}`"),
            ));
        }
        infos.push(FieldInfo {
            name: field_name.clone(),
            ty: field.ty.clone(),
            position,
            signature: attrs.signature,
        });
    }

    infos.sort_by_key(|f| f.position);
    if let Some(missing) = (0u32..).zip(&infos).find(|(i, f)| f.position != *i).map(|(i, _)| i) {
        return Err(syn::Error::new_spanned(
            input,
            format!("positions of `{type_name}` must be contiguous from 0; {missing} is missing"),
        ));
    }

    let field_count = infos.len();

    let descriptors: Vec<_> = infos
        .iter()
        .map(|f| {
            let field_name = f.name.to_string();
            let ty = &f.ty;
            let position = f.position;
            let with_signature = f.signature.as_ref().map(|sig| quote! { .with_signature(#sig) });
            quote! {
                ::ajbus::FieldDescriptor::new(
                    #field_name,
                    <#ty as ::ajbus::BusType>::descriptor(),
                )
                .at(#position)
                #with_signature
            }
        })
        .collect();

    let to_values: Vec<_> = infos
        .iter()
        .map(|f| {
            let field_name = &f.name;
            quote! { ::ajbus::BusType::to_value(&self.#field_name) }
        })
        .collect();

    let locals: Vec<_> = infos.iter().map(|f| format_ident!("__field{}", f.position)).collect();
    let reads: Vec<_> = infos
        .iter()
        .zip(&locals)
        .map(|(f, local)| {
            let ty = &f.ty;
            quote! {
                let #local = <#ty as ::ajbus::BusType>::from_value(
                    __fields.next().unwrap_or(::ajbus::Value::Null),
                )?;
            }
        })
        .collect();
    let assigns: Vec<_> = infos
        .iter()
        .zip(&locals)
        .map(|(f, local)| {
            let field_name = &f.name;
            quote! { #field_name: #local }
        })
        .collect();

    Ok(quote! {
        impl ::ajbus::BusType for #name {
            fn descriptor() -> ::std::sync::Arc<::ajbus::TypeDescriptor> {
                ::std::sync::Arc::new(::ajbus::TypeDescriptor::structure(
                    #type_name,
                    ::std::vec![#(#descriptors),*],
                ))
            }

            fn to_value(&self) -> ::ajbus::Value {
                ::ajbus::Value::Struct {
                    type_name: ::std::string::String::from(#type_name),
                    fields: ::std::vec![#(#to_values),*],
                }
            }

            fn from_value(value: ::ajbus::Value) -> ::ajbus::Result<Self> {
                match value {
                    ::ajbus::Value::Struct { fields, .. } if fields.len() == #field_count => {
                        let mut __fields = fields.into_iter();
                        #(#reads)*
                        Ok(Self { #(#assigns),* })
                    }
                    other => Err(::ajbus::types::shape_error::<Self>(&other)),
                }
            }
        }
    })
}

/// `#[derive(BusEnum)]`: implements `ajbus::BusType` for a fieldless enum.
///
/// Constants travel as their declaration index. The wire type has to be an
/// integer and must be declared, either here with
/// `#[bus(signature = "u")]` or on every field/parameter that uses the enum.
///
/// Example:
/// ```ignore
/// use ajbus::BusEnum;
///
/// #[derive(BusEnum)]
/// #[bus(signature = "y")]
/// enum Level { Low, Mid, High }
/// ```
#[proc_macro_derive(BusEnum, attributes(bus))]
pub fn derive_bus_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_enum(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_enum(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let type_name = name.to_string();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "BusEnum does not support generic types",
        ));
    }

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(input, "Only enums are supported"));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(input, "BusEnum needs at least one variant"));
    }
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "BusEnum variants cannot carry data",
            ));
        }
    }

    let attrs = bus_attrs(&input.attrs)?;
    if let Some((_, span)) = attrs.position {
        return Err(syn::Error::new(span, "position applies to struct fields only"));
    }
    let signature = match attrs.signature {
        Some(sig) => quote! { ::std::option::Option::Some(::std::string::String::from(#sig)) },
        None => quote! { ::std::option::Option::None },
    };

    let idents: Vec<_> = data.variants.iter().map(|v| &v.ident).collect();
    let names: Vec<_> = idents.iter().map(ToString::to_string).collect();
    let ordinals: Vec<u32> = (0u32..).take(idents.len()).collect();

    Ok(quote! {
        impl ::ajbus::BusType for #name {
            fn descriptor() -> ::std::sync::Arc<::ajbus::TypeDescriptor> {
                ::std::sync::Arc::new(::ajbus::TypeDescriptor::enumeration(
                    #type_name,
                    ::std::vec![#(::std::string::String::from(#names)),*],
                    #signature,
                ))
            }

            fn to_value(&self) -> ::ajbus::Value {
                let ordinal: u32 = match self {
                    #(Self::#idents => #ordinals,)*
                };
                ::ajbus::Value::Enum {
                    type_name: ::std::string::String::from(#type_name),
                    ordinal,
                }
            }

            fn from_value(value: ::ajbus::Value) -> ::ajbus::Result<Self> {
                let ordinal = match &value {
                    ::ajbus::Value::Enum { ordinal, .. } => ::std::option::Option::Some(*ordinal),
                    _ => ::std::option::Option::None,
                };
                match ordinal {
                    #(::std::option::Option::Some(#ordinals) => Ok(Self::#idents),)*
                    _ => Err(::ajbus::types::shape_error::<Self>(&value)),
                }
            }
        }
    })
}
