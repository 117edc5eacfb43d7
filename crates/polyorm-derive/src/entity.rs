//! Entity derive macro implementation.

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

/// Field-level `#[orm(...)]` options.
#[derive(Default)]
struct FieldAttr {
    is_id: bool,
    skip: bool,
    column: Option<String>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        loop {
            if input.is_empty() {
                break;
            }

            let ident: syn::Ident = input.parse()?;
            if ident == "id" {
                attr.is_id = true;
            } else if ident == "skip" {
                attr.skip = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                attr.column = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "unknown orm attribute; expected `id`, `skip` or `column = \"...\"`",
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

impl FieldAttr {
    fn from_attrs(attrs: &[syn::Attribute]) -> Result<Self> {
        let mut merged = FieldAttr::default();
        for attr in attrs {
            if !attr.path().is_ident("orm") {
                continue;
            }
            let parsed: FieldAttr = attr.parse_args()?;
            merged.is_id |= parsed.is_id;
            merged.skip |= parsed.skip;
            if parsed.column.is_some() {
                merged.column = parsed.column;
            }
        }
        Ok(merged)
    }
}

/// Struct-level `#[orm(table = "...")]`, if present.
fn get_table_name(input: &DeriveInput) -> Result<Option<String>> {
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let nested = attr.parse_args::<syn::MetaNameValue>()?;
        if !nested.path.is_ident("table") {
            return Err(syn::Error::new_spanned(
                &nested.path,
                "unknown orm attribute; expected `table = \"...\"`",
            ));
        }
        if let syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) = &nested.value
        {
            return Ok(Some(lit.value()));
        }
        return Err(syn::Error::new_spanned(
            &nested.value,
            "table name must be a string literal",
        ));
    }
    Ok(None)
}

struct MappedField<'a> {
    ident: &'a syn::Ident,
    ty: &'a syn::Type,
    property: String,
    column: String,
    is_id: bool,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let table = get_table_name(&input)?.unwrap_or_else(|| name.to_string().to_snake_case());
    let entity_name = name.to_string();

    let mut mapped = Vec::new();
    let mut skipped = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attr = FieldAttr::from_attrs(&field.attrs)?;
        if attr.skip {
            if attr.is_id {
                return Err(syn::Error::new_spanned(
                    ident,
                    "a skipped field cannot be the primary key",
                ));
            }
            skipped.push(ident);
            continue;
        }
        let property = ident.to_string();
        mapped.push(MappedField {
            ident,
            ty: &field.ty,
            column: attr.column.unwrap_or_else(|| property.clone()),
            property,
            is_id: attr.is_id,
        });
    }

    // No explicit key: a field named `id` is the key.
    if !mapped.iter().any(|f| f.is_id)
        && let Some(f) = mapped.iter_mut().find(|f| f.property == "id")
    {
        f.is_id = true;
    }

    let field_defs = mapped.iter().map(|f| {
        let property = &f.property;
        let column = &f.column;
        let is_id = f.is_id;
        let ty = f.ty;
        quote! {
            ::polyorm::FieldDef::new(
                #property,
                #column,
                #is_id,
                <#ty as ::polyorm::FieldType>::VALUE_TYPE,
                <#ty as ::polyorm::FieldType>::NULLABLE,
            )
        }
    });

    let from_record_fields = mapped.iter().map(|f| {
        let ident = f.ident;
        let column = &f.column;
        quote! { #ident: record.take_or_default(#column)? }
    });
    let default_fields = skipped.iter().map(|ident| {
        quote! { #ident: ::core::default::Default::default() }
    });

    let to_record_pushes = mapped.iter().map(|f| {
        let ident = f.ident;
        let column = &f.column;
        quote! {
            record.push(#column, ::polyorm::Value::from(::core::clone::Clone::clone(&self.#ident)));
        }
    });

    Ok(quote! {
        impl ::polyorm::Entity for #name {
            fn describe() -> ::polyorm::EntityDescriptor {
                ::polyorm::EntityDescriptor::new(
                    #entity_name,
                    #table,
                    ::std::vec![#(#field_defs),*],
                )
            }

            fn from_record(mut record: ::polyorm::Record) -> ::polyorm::OrmResult<Self> {
                ::core::result::Result::Ok(Self {
                    #(#from_record_fields,)*
                    #(#default_fields,)*
                })
            }

            fn to_record(&self) -> ::polyorm::Record {
                let mut record = ::polyorm::Record::new();
                #(#to_record_pushes)*
                record
            }

            fn metadata_slot() -> &'static ::polyorm::MetadataSlot {
                static SLOT: ::polyorm::MetadataSlot = ::polyorm::MetadataSlot::new();
                &SLOT
            }
        }
    })
}
