//! Derive support for the CSV input documentation.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, Lit, LitStr,
    Meta, PathArguments, Type,
};

/// Describes a struct's named fields as CSV columns.
///
/// Each column takes its name from the field (honouring
/// `#[serde(rename = "...")]`), a value kind read off the field's type,
/// required-ness from whether the type is an `Option`, and its description
/// from the doc comment. Generates `csv_schema() -> &'static [CsvField]`;
/// the `CsvField` type must be in scope at the derive site.
#[proc_macro_derive(CsvSchema, attributes(serde))]
pub fn derive_csv_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => panic!("CsvSchema only supports structs with named fields"),
        },
        _ => panic!("CsvSchema only supports structs"),
    };

    let columns = named.iter().map(|field| {
        let ident = field.ident.as_ref().unwrap();
        let column = renamed(&field.attrs).unwrap_or_else(|| ident.to_string());
        let (value_ty, required) = match option_inner(&field.ty) {
            Some(inner) => (inner, false),
            None => (&field.ty, true),
        };
        let kind = value_kind(value_ty);
        let description = doc_comment(&field.attrs);
        quote! {
            CsvField {
                name: #column,
                kind: #kind,
                required: #required,
                description: #description,
            }
        }
    });

    let expanded = quote! {
        impl #name {
            pub fn csv_schema() -> &'static [CsvField] {
                &[#(#columns),*]
            }
        }
    };
    expanded.into()
}

/// CSV value kind for a field type. Anything unrecognized reads as text,
/// which is what a CSV cell is anyway.
fn value_kind(ty: &Type) -> &'static str {
    let ident = match type_ident(ty) {
        Some(ident) => ident,
        None => return "text",
    };
    match ident.as_str() {
        "NaiveDate" => "date",
        "Decimal" => "decimal",
        "u8" | "u16" | "u32" | "u64" | "i8" | "i16" | "i32" | "i64" => "integer",
        _ => "text",
    }
}

/// The inner type of `Option<T>`, when `ty` is one.
fn option_inner(ty: &Type) -> Option<&Type> {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "Option" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    for arg in &args.args {
                        if let GenericArgument::Type(inner) = arg {
                            return Some(inner);
                        }
                    }
                }
            }
        }
    }
    None
}

fn type_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

fn renamed(attrs: &[Attribute]) -> Option<String> {
    let mut name = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if let Ok(value) = meta.value() {
                // discard the values of serde items we do not model
                value.parse::<Expr>()?;
            }
            Ok(())
        });
    }
    name
}

fn doc_comment(attrs: &[Attribute]) -> String {
    let mut doc = String::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let Meta::NameValue(meta) = &attr.meta {
            if let Expr::Lit(lit) = &meta.value {
                if let Lit::Str(line) = &lit.lit {
                    if !doc.is_empty() {
                        doc.push(' ');
                    }
                    doc.push_str(line.value().trim());
                }
            }
        }
    }
    doc
}
