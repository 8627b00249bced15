//! `#[derive(Record)]` expansion.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{
    parse_macro_input, parse_quote, Data, DeriveInput, Field, Fields, GenericParam, Ident, Index,
    LitStr, Member, Token, Visibility,
};

/// One argument of `#[validate(...)]`.
enum ValidateArg {
    Tag(LitStr),
    Opaque,
}

impl Parse for ValidateArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            return Ok(ValidateArg::Tag(input.parse()?));
        }
        let ident: Ident = input.parse()?;
        if ident == "opaque" {
            Ok(ValidateArg::Opaque)
        } else {
            Err(syn::Error::new(ident.span(), "expected a tag string or `opaque`"))
        }
    }
}

/// Everything the expansion needs about one field.
struct FieldSpec {
    member: Member,
    name: String,
    exported: bool,
    tag: Option<LitStr>,
    opaque: bool,
    ty: syn::Type,
}

impl FieldSpec {
    fn from_field(index: usize, field: &Field) -> syn::Result<Self> {
        let (member, name) = match &field.ident {
            Some(ident) => (Member::Named(ident.clone()), ident.unraw().to_string()),
            None => (Member::Unnamed(Index::from(index)), index.to_string()),
        };

        let mut tag: Option<LitStr> = None;
        let mut opaque = false;
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("validate")) {
            let args = attr.parse_args_with(Punctuated::<ValidateArg, Token![,]>::parse_terminated)?;
            for arg in args {
                match arg {
                    ValidateArg::Opaque => opaque = true,
                    ValidateArg::Tag(lit) => {
                        if tag.is_some() {
                            return Err(syn::Error::new(lit.span(), "duplicate validate tag"));
                        }
                        tag = Some(lit);
                    }
                }
            }
        }

        Ok(Self {
            member,
            name,
            exported: matches!(field.vis, Visibility::Public(_)),
            tag,
            opaque,
            ty: field.ty.clone(),
        })
    }

    fn shape(&self, index: usize) -> TokenStream2 {
        let Self { name, exported, ty, .. } = self;
        let tag = match &self.tag {
            Some(lit) => quote!(::core::option::Option::Some(#lit)),
            None => quote!(::core::option::Option::None),
        };
        let type_shape = if self.opaque {
            quote!(::tagval_core::TypeShape::opaque())
        } else {
            quote!(<#ty as ::tagval_core::Reflect>::type_shape())
        };
        quote! {
            ::tagval_core::FieldShape::new(#index, #name, #exported, #tag, #type_shape)
        }
    }

    fn accessor(&self) -> TokenStream2 {
        let member = &self.member;
        if self.opaque {
            quote!({
                let _ = &self.#member;
                ::tagval_core::Value::Opaque
            })
        } else {
            quote!(::tagval_core::Reflect::reflect(&self.#member))
        }
    }
}

/// Entry point for `#[derive(Record)]`.
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(mut input: DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            Fields::Unnamed(unnamed) => unnamed.unnamed.iter().collect(),
            Fields::Unit => Vec::new(),
        },
        Data::Enum(data) => {
            return Err(syn::Error::new(
                data.enum_token.span,
                "Record can only be derived for structs",
            ))
        }
        Data::Union(data) => {
            return Err(syn::Error::new(
                data.union_token.span,
                "Record can only be derived for structs",
            ))
        }
    };
    let specs = fields
        .into_iter()
        .enumerate()
        .map(|(index, field)| FieldSpec::from_field(index, field))
        .collect::<syn::Result<Vec<_>>>()?;

    for param in input.generics.params.iter_mut() {
        match param {
            GenericParam::Lifetime(lifetime) => {
                return Err(syn::Error::new_spanned(
                    lifetime,
                    "Record cannot be derived for types with lifetime parameters",
                ))
            }
            GenericParam::Type(ty) => {
                ty.bounds.push(parse_quote!(::tagval_core::Reflect));
                ty.bounds.push(parse_quote!('static));
            }
            GenericParam::Const(_) => {}
        }
    }

    let ident = &input.ident;
    let name = ident.unraw().to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let count = specs.len();
    let shapes = specs.iter().enumerate().map(|(index, spec)| spec.shape(index));
    let arms = specs.iter().enumerate().map(|(index, spec)| {
        let access = spec.accessor();
        quote!(#index => #access,)
    });

    Ok(quote! {
        impl #impl_generics ::tagval_core::Record for #ident #ty_generics #where_clause {
            fn describe() -> ::tagval_core::RecordShape {
                ::tagval_core::RecordShape::new(
                    ::tagval_core::RecordType::of::<Self>(#name),
                    ::std::vec![#(#shapes),*],
                )
            }

            fn record_type(&self) -> ::tagval_core::RecordType {
                ::tagval_core::RecordType::of::<Self>(#name)
            }

            fn shape(&self) -> ::tagval_core::RecordShape {
                <Self as ::tagval_core::Record>::describe()
            }

            fn field_count(&self) -> usize {
                #count
            }

            fn field(&self, index: usize) -> ::tagval_core::Value<'_> {
                match index {
                    #(#arms)*
                    _ => ::tagval_core::Value::Nil,
                }
            }
        }

        impl #impl_generics ::tagval_core::Reflect for #ident #ty_generics #where_clause {
            fn type_shape() -> ::tagval_core::TypeShape {
                ::tagval_core::TypeShape::record::<Self>()
            }

            fn reflect(&self) -> ::tagval_core::Value<'_> {
                ::tagval_core::Value::Record(self)
            }
        }
    })
}
