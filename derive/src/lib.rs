//! # Wellhead Derive Macros
//!
//! This crate provides the `AttributeRecord` derive macro for the wellhead library.
//!
//! Every drawable layer in wellhead carries a fixed, ordered list of attribute fields
//! (the columns of its attribute table and the keys of its export records).  The
//! derive turns a plain struct of `String` fields into that ordered list plus
//! by-name accessors.
//!
//! ### Example
//!
//! ```rust,ignore
//! use wellhead::AttributeRecord;
//!
//! #[derive(Default, wellhead_derive::AttributeRecord)]
//! struct Pump {
//!     #[field("Label")]
//!     label: String,
//!     #[field("pump rate")]
//!     rate: String,
//!     layers: String,
//! }
//!
//! assert_eq!(Pump::FIELDS, &["Label", "pump rate", "layers"]);
//!
//! let mut pump = Pump::default();
//! *pump.get_mut("pump rate").unwrap() = "12.5".to_string();
//! assert_eq!(pump.get("pump rate"), Some("12.5"));
//! assert_eq!(pump.get("unknown"), None);
//! ```
//!
//! Fields without a `#[field("...")]` attribute use their Rust identifier as the
//! field name.  Field order is declaration order.

#![recursion_limit = "128"]

extern crate proc_macro;
#[macro_use]
extern crate quote;
extern crate syn;

use proc_macro2::TokenStream;
use syn::{DeriveInput, parse_macro_input};

use derive_util::StructVisitor;

/// Derive the AttributeRecord trait for structs with named `String` fields.
#[proc_macro_derive(AttributeRecord, attributes(field))]
pub fn derive_attribute_record(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ty_name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match input.data {
        syn::Data::Struct(ref ds) => {
            let mut visitor = AttributeRecordVisitor;
            visitor.visit_struct(&ty_name, ds)
        }
        syn::Data::Enum(_) => {
            panic!("AttributeRecord can only be derived for structs");
        }
        syn::Data::Union(_) => {
            panic!("unions are not supported");
        }
    };

    let names = fields.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>();
    let get_arms: Vec<TokenStream> = fields
        .iter()
        .map(|(name, ident)| quote! { #name => Some(self.#ident.as_str()), })
        .collect();
    let get_mut_arms: Vec<TokenStream> = fields
        .iter()
        .map(|(name, ident)| quote! { #name => Some(&mut self.#ident), })
        .collect();

    let generated = quote! {
        impl #impl_generics wellhead::AttributeRecord for #ty_name #ty_generics #where_clause {
            const FIELDS: &'static [&'static str] = &[#(#names),*];

            fn get(&self, field: &str) -> Option<&str> {
                match field {
                    #(#get_arms)*
                    _ => None,
                }
            }

            fn get_mut(&mut self, field: &str) -> Option<&mut String> {
                match field {
                    #(#get_mut_arms)*
                    _ => None,
                }
            }
        }
    };
    generated.into()
}

///////////////////////////////////////// AttributeRecordVisitor ////////////////////////////////////////

struct AttributeRecordVisitor;

impl StructVisitor for AttributeRecordVisitor {
    type Output = Vec<(String, syn::Ident)>;

    fn visit_struct_named_fields(
        &mut self,
        _ty_name: &syn::Ident,
        _ds: &syn::DataStruct,
        fields: &syn::FieldsNamed,
    ) -> Self::Output {
        let mut result = Vec::new();
        for field in fields.named.iter() {
            if let Some(field_ident) = &field.ident {
                let name = field_name(field).unwrap_or_else(|| {
                    let ident = field_ident.to_string();
                    ident.strip_prefix("r#").unwrap_or(&ident).to_string()
                });
                result.push((name, field_ident.clone()));
            }
        }
        result
    }

    fn visit_struct_unnamed_fields(
        &mut self,
        ty_name: &syn::Ident,
        _ds: &syn::DataStruct,
        _fields: &syn::FieldsUnnamed,
    ) -> Self::Output {
        panic!("AttributeRecord requires named fields on {}", ty_name);
    }

    fn visit_struct_unit(&mut self, _ty_name: &syn::Ident, _ds: &syn::DataStruct) -> Self::Output {
        Vec::new()
    }
}

/// Reads the `#[field("name")]` override, if any.
fn field_name(field: &syn::Field) -> Option<String> {
    for attr in field.attrs.iter() {
        if attr.path.is_ident("field") {
            let lit: syn::LitStr = attr
                .parse_args()
                .unwrap_or_else(|e| panic!("#[field(...)] expects a string literal: {}", e));
            return Some(lit.value());
        }
    }
    None
}
