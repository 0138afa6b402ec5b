use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type, parse_macro_input};

#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_record(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct RecordOptions {
    table_name: Option<String>,
    id_accessor: Option<Ident>,
    constructors: Vec<Vec<Ident>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CryptOption {
    OneWay,
    TwoWay,
}

#[derive(Default)]
struct FieldOptions {
    identity: bool,
    skip: bool,
    crypt: Option<CryptOption>,
}

struct RecordField {
    ident: Ident,
    ty: Type,
    options: FieldOptions,
}

fn expand_record(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Record does not support generic structs",
        ));
    }

    let options = parse_record_options(&input.attrs)?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Record can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Record requires named fields",
            ));
        }
    };

    let mut fields = Vec::<RecordField>::new();
    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Record requires named fields"))?;
        let options = parse_field_options(&field.attrs)?;
        fields.push(RecordField {
            ident,
            ty: field.ty,
            options,
        });
    }

    let identity_fields: Vec<&RecordField> = fields.iter().filter(|f| f.options.identity).collect();
    if identity_fields.len() > 1 {
        return Err(syn::Error::new(
            identity_fields[1].ident.span(),
            "Record allows a single #[record(id)] field",
        ));
    }

    let stored: Vec<&RecordField> = fields.iter().filter(|f| !f.options.skip).collect();
    let skipped: Vec<&Ident> = fields
        .iter()
        .filter(|f| f.options.skip)
        .map(|f| &f.ident)
        .collect();

    let struct_name_str = struct_name.to_string();
    let table_expr = match &options.table_name {
        Some(table) => quote! { #table },
        None => quote! { ::recordgate::record::default_table_name(#struct_name_str) },
    };

    let field_descriptors = stored.iter().map(|field| {
        let name = field.ident.to_string();
        let ty = &field.ty;
        let identity = field.options.identity.then(|| quote! { .identity() });
        let crypt = field.options.crypt.map(|mode| match mode {
            CryptOption::OneWay => quote! { .crypt(::recordgate::CryptMode::OneWay) },
            CryptOption::TwoWay => quote! { .crypt(::recordgate::CryptMode::TwoWay) },
        });
        quote! {
            .field(
                ::recordgate::FieldDescriptor::new(#name, <#ty as ::recordgate::RecordValue>::field_type())
                    .nullable(<#ty as ::recordgate::RecordValue>::nullable())
                    #identity
                    #crypt
            )
        }
    });

    let accessor_descriptor = options.id_accessor.as_ref().map(|accessor| {
        let name = accessor.to_string();
        quote! { .accessor(::recordgate::AccessorDescriptor::new(#name).identity()) }
    });

    let primary_params = stored.iter().map(|field| param_descriptor(field));
    let mut extra_constructors = Vec::new();
    let mut extra_bodies = Vec::new();
    for (offset, idents) in options.constructors.iter().enumerate() {
        let mut params = Vec::new();
        let mut assignments = Vec::new();
        for ident in idents {
            let field = stored.iter().find(|f| f.ident == *ident).ok_or_else(|| {
                syn::Error::new(
                    ident.span(),
                    format!("constructor parameter '{}' is not a stored field", ident),
                )
            })?;
            let name = ident.to_string();
            let ty = &field.ty;
            params.push(param_descriptor(field));
            assignments.push(quote! {
                instance.#ident = <#ty as ::recordgate::RecordValue>::from_value(
                    ::recordgate::record::next_arg(&mut args, #struct_name_str, #name)?
                )?;
            });
        }
        let index = offset + 1;
        extra_constructors.push(quote! {
            .constructor(::recordgate::ConstructorDescriptor::new(vec![#(#params),*]))
        });
        extra_bodies.push(quote! {
            #index => {
                let mut instance = <Self as ::std::default::Default>::default();
                #(#assignments)*
                Ok(instance)
            }
        });
    }

    let stored_idents: Vec<&Ident> = stored.iter().map(|f| &f.ident).collect();
    let stored_names: Vec<String> = stored.iter().map(|f| f.ident.to_string()).collect();
    let stored_types: Vec<&Type> = stored.iter().map(|f| &f.ty).collect();

    let accessor_arm = options.id_accessor.as_ref().map(|accessor| {
        let name = accessor.to_string();
        quote! {
            #name => Ok(::recordgate::RecordValue::to_value(&self.#accessor())),
        }
    });

    let unknown_member = quote! {
        Err(::recordgate::RecordError::UnknownMember {
            type_name: #struct_name_str.to_string(),
            member: other.to_string(),
        })
    };

    Ok(quote! {
        impl ::recordgate::Record for #struct_name {
            fn descriptor() -> ::recordgate::RecordDescriptor {
                ::recordgate::RecordDescriptor::new(#struct_name_str, #table_expr)
                    #(#field_descriptors)*
                    #accessor_descriptor
                    .constructor(::recordgate::ConstructorDescriptor::new(vec![#(#primary_params),*]))
                    #(#extra_constructors)*
            }

            fn get(&self, field: &str) -> ::recordgate::Result<::recordgate::Value> {
                match field {
                    #(#stored_names => Ok(::recordgate::RecordValue::to_value(&self.#stored_idents)),)*
                    other => #unknown_member,
                }
            }

            fn set(&mut self, field: &str, value: ::recordgate::Value) -> ::recordgate::Result<()> {
                match field {
                    #(#stored_names => {
                        self.#stored_idents = <#stored_types as ::recordgate::RecordValue>::from_value(value)?;
                        Ok(())
                    })*
                    other => #unknown_member,
                }
            }

            fn call_accessor(&self, accessor: &str) -> ::recordgate::Result<::recordgate::Value> {
                match accessor {
                    #accessor_arm
                    other => #unknown_member,
                }
            }

            #[allow(unused_mut)]
            fn construct(
                constructor: usize,
                args: ::std::vec::Vec<::recordgate::Value>,
            ) -> ::recordgate::Result<Self> {
                let arity = args.len();
                let mut args = args.into_iter();
                match constructor {
                    0 => Ok(Self {
                        #(#stored_idents: <#stored_types as ::recordgate::RecordValue>::from_value(
                            ::recordgate::record::next_arg(&mut args, #struct_name_str, #stored_names)?
                        )?,)*
                        #(#skipped: ::std::default::Default::default(),)*
                    }),
                    #(#extra_bodies)*
                    _ => Err(::recordgate::RecordError::NoMatchingConstructor {
                        type_name: #struct_name_str.to_string(),
                        arity,
                    }),
                }
            }
        }
    })
}

fn param_descriptor(field: &RecordField) -> TokenStream2 {
    let name = field.ident.to_string();
    let ty = &field.ty;
    quote! { ::recordgate::ParamDescriptor::new(#name, <#ty as ::recordgate::RecordValue>::field_type()) }
}

fn parse_record_options(attrs: &[syn::Attribute]) -> syn::Result<RecordOptions> {
    let mut options = RecordOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.table_name = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("id_accessor") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                if options.id_accessor.is_some() {
                    return Err(meta.error("Record allows a single id_accessor"));
                }
                options.id_accessor = Some(Ident::new(&lit.value(), lit.span()));
                return Ok(());
            }

            if meta.path.is_ident("constructor") {
                let mut params = Vec::new();
                meta.parse_nested_meta(|param| {
                    let ident = param
                        .path
                        .get_ident()
                        .cloned()
                        .ok_or_else(|| param.error("expected a field name"))?;
                    params.push(ident);
                    Ok(())
                })?;
                options.constructors.push(params);
                return Ok(());
            }

            Err(meta.error(
                "Unsupported record attribute. Supported: table = \"...\", id_accessor = \"...\", constructor(field, ...)",
            ))
        })?;
    }

    Ok(options)
}

fn parse_field_options(attrs: &[syn::Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                options.identity = true;
                return Ok(());
            }

            if meta.path.is_ident("skip") {
                options.skip = true;
                return Ok(());
            }

            if meta.path.is_ident("crypt") {
                if meta.input.peek(syn::Token![=]) {
                    let lit: LitStr = meta.value()?.parse()?;
                    options.crypt = Some(match lit.value().as_str() {
                        "one_way" => CryptOption::OneWay,
                        "two_way" => CryptOption::TwoWay,
                        _ => {
                            return Err(syn::Error::new(
                                lit.span(),
                                "crypt must be \"one_way\" or \"two_way\"",
                            ));
                        }
                    });
                } else {
                    options.crypt = Some(CryptOption::OneWay);
                }
                return Ok(());
            }

            Err(meta.error(
                "Unsupported record field attribute. Supported: id, skip, crypt, crypt = \"one_way\" | \"two_way\"",
            ))
        })?;

        if options.skip && (options.identity || options.crypt.is_some()) {
            return Err(syn::Error::new(
                attr.span(),
                "#[record(skip)] cannot be combined with id or crypt",
            ));
        }
    }

    Ok(options)
}
