use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Fields, Ident, LitStr, Type, parse_macro_input, spanned::Spanned,
};

/// Derives `docket::tracking::ChangeTracked`.
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, ChangeTracked)]
/// #[tracked(table = "users")]
/// pub struct User {
///     #[tracked(id)]
///     pub id: i64,
///     pub username: String,
///     pub email: Option<String>,
///     #[tracked(audit)]
///     pub audit: AuditFields,
/// }
/// ```
///
/// Every field that is neither `id`, `audit` nor `skip` takes part in merge
/// and diff, and its type must implement `Absent` and `PartialEq`.
#[proc_macro_derive(ChangeTracked, attributes(tracked))]
pub fn derive_change_tracked(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_change_tracked(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldRole {
    Tracked,
    Id,
    Audit,
    Skip,
}

struct TrackedField {
    ident: Ident,
    ty: Type,
    role: FieldRole,
}

fn expand_change_tracked(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "ChangeTracked does not support generic structs",
        ));
    }

    let table_name = parse_table_name(&input.attrs, &struct_name)?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "ChangeTracked can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "ChangeTracked requires named fields",
            ));
        }
    };

    let mut fields = Vec::<TrackedField>::new();
    for field in named_fields.named {
        let span = field.span();
        let ident = field.ident.clone().ok_or_else(|| {
            syn::Error::new(span, "ChangeTracked requires named fields")
        })?;
        let role = parse_field_role(&field.attrs)?;
        fields.push(TrackedField {
            ident,
            ty: field.ty,
            role,
        });
    }

    let id_field = single_field(&fields, FieldRole::Id, &struct_name, "#[tracked(id)]")?;
    let audit_field = single_field(&fields, FieldRole::Audit, &struct_name, "#[tracked(audit)]")?;

    let tracked = fields
        .iter()
        .filter(|field| field.role == FieldRole::Tracked)
        .collect::<Vec<_>>();

    let merge_statements = tracked.iter().map(|field| {
        let ident = &field.ident;
        let ty = &field.ty;
        let label = ident.to_string();
        quote! {
            if !<#ty as ::docket::tracking::Absent>::is_absent(&partial.#ident)
                && partial.#ident != self.#ident
            {
                self.#ident = ::core::clone::Clone::clone(&partial.#ident);
                adopted.push(#label);
            }
        }
    });

    let diff_statements = tracked.iter().map(|field| {
        let ident = &field.ident;
        let label = ident.to_string();
        quote! {
            if self.#ident != baseline.#ident {
                changed.push(#label);
            }
        }
    });

    Ok(quote! {
        impl ::docket::tracking::ChangeTracked for #struct_name {
            const TABLE: &'static str = #table_name;

            fn id(&self) -> ::docket::core::EntityId {
                self.#id_field
            }

            fn set_id(&mut self, id: ::docket::core::EntityId) {
                self.#id_field = id;
            }

            fn audit(&self) -> &::docket::core::AuditFields {
                &self.#audit_field
            }

            fn audit_mut(&mut self) -> &mut ::docket::core::AuditFields {
                &mut self.#audit_field
            }

            fn merge_fields(&mut self, partial: &Self) -> ::std::vec::Vec<&'static str> {
                let mut adopted = ::std::vec::Vec::new();
                #(#merge_statements)*
                adopted
            }

            fn diff_fields(&self, baseline: &Self) -> ::std::vec::Vec<&'static str> {
                let mut changed = ::std::vec::Vec::new();
                #(#diff_statements)*
                changed
            }
        }
    })
}

fn single_field<'a>(
    fields: &'a [TrackedField],
    role: FieldRole,
    struct_name: &Ident,
    marker: &str,
) -> syn::Result<&'a Ident> {
    let mut matching = fields.iter().filter(|field| field.role == role);
    let Some(first) = matching.next() else {
        return Err(syn::Error::new(
            struct_name.span(),
            format!("ChangeTracked requires exactly one field marked {marker}"),
        ));
    };
    if let Some(extra) = matching.next() {
        return Err(syn::Error::new(
            extra.ident.span(),
            format!("Duplicate {marker} field"),
        ));
    }
    Ok(&first.ident)
}

fn parse_table_name(attrs: &[syn::Attribute], struct_name: &Ident) -> syn::Result<String> {
    let mut table_name = None;

    for attr in attrs {
        if !attr.path().is_ident("tracked") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                table_name = Some(lit.value());
                return Ok(());
            }

            Err(meta.error("Unsupported tracked attribute. Supported: table = \"...\""))
        })?;
    }

    table_name.ok_or_else(|| {
        syn::Error::new(
            struct_name.span(),
            "ChangeTracked requires #[tracked(table = \"...\")] on the struct",
        )
    })
}

fn parse_field_role(attrs: &[syn::Attribute]) -> syn::Result<FieldRole> {
    let mut role: Option<FieldRole> = None;

    for attr in attrs {
        if !attr.path().is_ident("tracked") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let parsed = if meta.path.is_ident("id") {
                FieldRole::Id
            } else if meta.path.is_ident("audit") {
                FieldRole::Audit
            } else if meta.path.is_ident("skip") {
                FieldRole::Skip
            } else {
                return Err(meta.error(
                    "Unsupported #[tracked(...)] field option. Supported: id, audit, skip",
                ));
            };

            if role.is_some() {
                return Err(meta.error("A field can carry only one #[tracked(...)] role"));
            }
            role = Some(parsed);
            Ok(())
        })?;
    }

    Ok(role.unwrap_or(FieldRole::Tracked))
}
