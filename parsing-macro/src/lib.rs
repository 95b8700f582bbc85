use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{
    braced, bracketed,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
    Attribute, Expr, Field, Generics, Ident, Token, Visibility,
};

enum ParsingDirective {
    Magic { typ: syn::Type, val: Expr },
    Ignore { typ: syn::Type },
    Padding { num_bytes: Expr },
    Param { typ: syn::Type, name: Ident },
}

impl ParsingDirective {
    /// Parses `[[name ...]]`
    fn parse_double_bracketed(input: ParseStream) -> syn::Result<Self> {
        let outer;
        bracketed!(outer in input);
        let inner;
        bracketed!(inner in outer);
        Self::parse_body(&inner)
    }

    fn parse_body(input: ParseStream) -> syn::Result<Self> {
        let ident = input.parse::<Ident>()?;
        match ident.to_string().as_str() {
            "magic" => {
                input.parse::<Token![:]>()?;
                let typ: syn::Type = input.parse()?;
                input.parse::<Token![=]>()?;
                let val: Expr = input.parse()?;
                Ok(Self::Magic { typ, val })
            }
            "padding_bytes" => {
                input.parse::<Token![=]>()?;
                let num_bytes: Expr = input.parse()?;
                Ok(Self::Padding { num_bytes })
            }
            "ignore" => {
                input.parse::<Token![:]>()?;
                let typ: syn::Type = input.parse()?;
                Ok(Self::Ignore { typ })
            }
            "param" => {
                input.parse::<Token![:]>()?;
                let typ: syn::Type = input.parse()?;
                input.parse::<Token![=]>()?;
                let name: Ident = input.parse()?;
                Ok(Self::Param { typ, name })
            }
            _ => Err(syn::Error::new(
                ident.span(),
                "expected one of `magic`, `padding_bytes`, `ignore`, `param`",
            )),
        }
    }

    fn as_tokens(&self) -> proc_macro2::TokenStream {
        match self {
            ParsingDirective::Magic { typ, val } => {
                quote! {
                    {
                        let offset = input.position();
                        let magic = input.read_type::<#typ>()?;
                        if magic != #val {
                            return Err(::parsing::Error::MagicCheckFailed {
                                offset,
                                expected: (#val) as u64,
                                found: magic as u64,
                            });
                        }
                    }
                }
            }
            ParsingDirective::Padding { num_bytes } => {
                quote! {
                    input.skip((#num_bytes) as usize)?;
                }
            }
            ParsingDirective::Param { typ, name } => {
                quote! {
                    let #name = input.read_type::<#typ>()?;
                }
            }
            ParsingDirective::Ignore { typ } => {
                quote! {
                    input.read_type::<#typ>()?;
                }
            }
        }
    }
}

struct FieldStruct {
    name: Ident,
    field_ty: syn::Type,
    read_type: syn::Type,
    option: Option<Expr>,
    e: FieldEnum,
}

enum FieldEnum {
    Normal,
    SizedUtf8String(Expr),
    SizedBuf(Expr),
    Collection(Expr),
}

impl FieldStruct {
    fn new(name: Ident, ty: syn::Type) -> Self {
        Self {
            name,
            field_ty: ty.clone(),
            read_type: ty,
            option: None,
            e: FieldEnum::Normal,
        }
    }

    /// Applies one item of a `#[parse(...)]` attribute.
    fn apply_meta(&mut self, meta: syn::meta::ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("sized_utf8_string") {
            meta.input.parse::<Token![=]>()?;
            self.e = FieldEnum::SizedUtf8String(meta.input.parse()?);
        } else if meta.path.is_ident("sized_buf") {
            meta.input.parse::<Token![=]>()?;
            self.e = FieldEnum::SizedBuf(meta.input.parse()?);
        } else if meta.path.is_ident("collection") {
            meta.input.parse::<Token![:]>()?;
            self.read_type = meta.input.parse()?;
            meta.input.parse::<Token![=]>()?;
            self.e = FieldEnum::Collection(meta.input.parse()?);
        } else if meta.path.is_ident("option_if") {
            meta.input.parse::<Token![:]>()?;
            self.read_type = meta.input.parse()?;
            meta.input.parse::<Token![=]>()?;
            self.option = Some(meta.input.parse()?);
        } else {
            return Err(meta.error(
                "expected one of `sized_utf8_string`, `sized_buf`, `collection`, `option_if`",
            ));
        }
        Ok(())
    }

    fn as_tokens(&self) -> proc_macro2::TokenStream {
        let item_ty = &self.read_type;
        let read = match &self.e {
            FieldEnum::Normal => {
                quote! {input.read_type::<#item_ty>()?}
            }
            FieldEnum::SizedUtf8String(size) => {
                quote! {
                    {
                        let offset = input.position();
                        let bytes = input.read_bytes((#size) as usize)?;
                        ::std::str::from_utf8(bytes)
                            .map_err(|source| ::parsing::Error::InvalidUtf8 { offset, source })?
                            .into()
                    }
                }
            }
            FieldEnum::SizedBuf(size) => {
                quote! {input.read_bytes((#size) as usize)?.into()}
            }
            FieldEnum::Collection(num_elems) => {
                let field_ty = &self.field_ty;
                quote! {
                    {
                        let items: ::parsing::Result<#field_ty> = (0..#num_elems)
                            .map(|_| input.read_type::<#item_ty>())
                            .collect();
                        items?
                    }
                }
            }
        };
        let name = &self.name;
        let field_ty = &self.field_ty;
        if let Some(cond) = &self.option {
            quote! {
                let #name: #field_ty = if #cond {
                    Some(#read)
                } else {
                    None
                };
            }
        } else {
            quote! {
                let #name: #field_ty = #read;
            }
        }
    }
}

enum FieldOrDirective {
    Field(FieldStruct),
    Directive(ParsingDirective),
}

impl FieldOrDirective {
    fn as_tokens(&self) -> proc_macro2::TokenStream {
        match self {
            FieldOrDirective::Directive(directive) => directive.as_tokens(),
            FieldOrDirective::Field(field) => field.as_tokens(),
        }
    }
}

struct ParsedStruct {
    s: syn::ItemStruct,
    things: Vec<FieldOrDirective>,
}

fn parse_field(input: ParseStream) -> syn::Result<(Field, FieldStruct)> {
    let mut field = input.call(Field::parse_named)?;
    let name = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new(Span::call_site(), "fields must be named"))?;
    let mut field_thing = FieldStruct::new(name, field.ty.clone());

    let mut err = Ok(());
    field.attrs.retain(|attr| {
        if !attr.path().is_ident("parse") {
            return true;
        }
        let res = attr.parse_nested_meta(|meta| field_thing.apply_meta(meta));
        if res.is_err() {
            err = res;
        }
        false
    });
    err?;
    Ok((field, field_thing))
}

impl Parse for ParsedStruct {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let vis = input.parse::<Visibility>()?;
        let struct_token = input.parse::<Token![struct]>()?;
        let ident = input.parse::<Ident>()?;
        let mut generics = input.parse::<Generics>()?;
        generics.where_clause = input.parse()?;

        let content;
        let brace_token = braced!(content in input);

        let mut fields = Punctuated::<Field, Token![,]>::new();
        let mut things = Vec::new();

        while !content.is_empty() {
            if content.peek(syn::token::Bracket) {
                let directive = ParsingDirective::parse_double_bracketed(&content)?;
                things.push(FieldOrDirective::Directive(directive));
            } else {
                let (field, field_thing) = parse_field(&content)?;
                things.push(FieldOrDirective::Field(field_thing));
                fields.push(field);
                content.parse::<Option<Token![,]>>()?;
            }
        }

        let s = syn::ItemStruct {
            attrs,
            vis,
            struct_token,
            ident,
            generics,
            fields: syn::Fields::Named(syn::FieldsNamed {
                brace_token,
                named: fields,
            }),
            semi_token: None,
        };

        Ok(Self { s, things })
    }
}

fn generate_parse_impl<'f>(
    things: &[FieldOrDirective],
    ident: &Ident,
    generics: &Generics,
    field_names: impl Iterator<Item = &'f Ident>,
) -> proc_macro2::TokenStream {
    let parse_lifetime = syn::Lifetime::new("'parse", Span::call_site());

    // impl<'parse, 'a, ...> Parse<'parse> for Thing<'a, ...> where 'parse: 'a
    let mut with_parse = generics.clone();
    with_parse.params.insert(
        0,
        syn::GenericParam::Lifetime(syn::LifetimeParam::new(parse_lifetime.clone())),
    );
    let bounds: Punctuated<syn::Lifetime, Token![+]> = generics
        .lifetimes()
        .map(|l| l.lifetime.clone())
        .collect();
    if !bounds.is_empty() {
        with_parse
            .make_where_clause()
            .predicates
            .push(syn::WherePredicate::Lifetime(syn::PredicateLifetime {
                lifetime: parse_lifetime.clone(),
                colon_token: syn::token::Colon::default(),
                bounds,
            }));
    }
    let (impl_generics, _, where_clause) = with_parse.split_for_impl();
    let (_, ty_generics, _) = generics.split_for_impl();

    let steps = things.iter().map(FieldOrDirective::as_tokens);

    quote! {
        impl #impl_generics ::parsing::Parse<#parse_lifetime> for #ident #ty_generics #where_clause {
            fn parse(input: &mut impl ::parsing::ReadBytes<#parse_lifetime>) -> ::parsing::Result<Self> {
                #(
                    #steps
                )*
                Ok(Self {
                    #(
                        #field_names
                    ),*
                })
            }
        }
    }
}

/// Declares a struct together with a `Parse` impl reading it field by field.
/// Allows adding padding and magic numbers
/// ```ignore
/// parsable_struct! {
///     pub struct Header {
///         [[magic: u32 = 0x0401]]
///         pub field1: u16,
///         [[padding_bytes = 4]]
///         pub field2: u8,
///         [[param: u32 = size_of_something]]
///         [[padding_bytes = 40]]
///     }
/// }
/// ```
/// `padding_bytes` will be taken out from the buffer during the parse,
/// but are not part of the struct definition.
/// `magic` is treated the same way as `padding_bytes`, but its value is verified
/// and the parse will fail if it does not match the expected value.
/// `[[ignore: <type>]]` reads and drops a value of that type.
/// `[[param: <int type> = <name>]]` will parse an int from the buffer,
/// making it available to future fields, but will not add it to the struct definition.
/// Mostly intended to hide sizes of buffers and strings from the struct definition.
///
/// Sized buffers and strings
/// ```ignore
/// parsable_struct! {
///     pub struct Header<'a> {
///         [[param: u16 = string_size]]
///         #[parse(sized_utf8_string = string_size)]
///         name: String,
///         pub buf_size: u8,
///         #[parse(sized_buf = buf_size)]
///         buf: &'a [u8],
///     }
/// }
/// ```
/// `.into()` is called on the slice, so anything implementing `From<&str>` or
/// `From<&[u8]>` can be used.
///
/// Collections
/// ```ignore
/// parsing::parsable_struct! {
///     #[derive(Debug)]
///     pub struct Item<'a> {
///         [[param: u8 = buf_size]]
///         #[parse(sized_buf = buf_size)]
///         buf: &'a [u8],
///     }
/// }
/// parsing::parsable_struct! {
///     #[derive(Debug)]
///     pub struct Header<'a> {
///         [[param: u8 = num_items]]
///         something: u32,
///         #[parse(collection: Item = num_items)]
///         items: Vec<Item<'a>>,
///     }
/// }
/// ```
/// Does not have to be a Vec, `.collect()` is called on an iterator of results.
///
/// Optional fields
/// ```ignore
/// parsable_struct! {
///     pub struct Layer {
///         pub layer_type: u16,
///         #[parse(option_if: u32 = layer_type == 2)]
///         pub tileset_index: Option<u32>,
///     }
/// }
/// ```
#[proc_macro]
pub fn parsable_struct(input: TokenStream) -> TokenStream {
    let parsed = parse_macro_input!(input as ParsedStruct);
    let struct_def = &parsed.s;
    let parse_impl = generate_parse_impl(
        &parsed.things,
        &struct_def.ident,
        &struct_def.generics,
        struct_def.fields.iter().filter_map(|f| f.ident.as_ref()),
    );
    let expanded = quote! {
        #struct_def
        #parse_impl
    };
    TokenStream::from(expanded)
}

/// A simpler version of `parsable_struct!` that can be derived: every field is read in order.
#[proc_macro_derive(Parse)]
pub fn parse_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as syn::DeriveInput);
    let syn::Data::Struct(data) = &input.data else {
        return syn::Error::new(input.ident.span(), "Parse can only be derived for structs")
            .to_compile_error()
            .into();
    };
    let syn::Fields::Named(named) = &data.fields else {
        return syn::Error::new(input.ident.span(), "Parse requires named fields")
            .to_compile_error()
            .into();
    };
    let things: Vec<_> = named
        .named
        .iter()
        .filter_map(|field| {
            let name = field.ident.clone()?;
            Some(FieldOrDirective::Field(FieldStruct::new(
                name,
                field.ty.clone(),
            )))
        })
        .collect();
    TokenStream::from(generate_parse_impl(
        &things,
        &input.ident,
        &input.generics,
        named.named.iter().filter_map(|f| f.ident.as_ref()),
    ))
}
