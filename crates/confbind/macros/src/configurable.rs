//! Implementation of the #[derive(Configurable)] proc macro.

use darling::ast::Data;
use darling::util::Ignored;
use darling::{FromDeriveInput, FromField};
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    DeriveInput, GenericArgument, Generics, Ident, LitStr, PathArguments, Type, parse_quote,
    parse2,
};

#[derive(FromDeriveInput)]
#[darling(attributes(conf), supports(struct_named))]
struct ConfInput {
    ident: Ident,
    generics: syn::Generics,
    data: Data<Ignored, ConfField>,
}

/// Parsed #[conf(...)] field attributes.
#[derive(FromField)]
#[darling(attributes(conf))]
struct ConfField {
    ident: Option<Ident>,
    ty: Type,
    #[darling(default)]
    tag: Option<String>,
    #[darling(default)]
    skip: bool,
    #[darling(default)]
    flatten: bool,
}

/// How a field type binds, decided from its syntax alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Scalar,
    Nested,
    Unsupported(&'static str),
}

const SCALARS: &[&str] = &[
    "bool", "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize", "f32", "f64",
    "String",
];
const SLICES: &[&str] = &[
    "Vec",
    "VecDeque",
    "LinkedList",
    "HashSet",
    "BTreeSet",
    "BinaryHeap",
];
const MAPS: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];
const POINTERS: &[&str] = &["Box", "Rc", "Arc", "Option"];
const COMPLEX: &[&str] = &["Complex", "Complex32", "Complex64"];
const UNKNOWN: &[&str] = &["char", "i128", "u128", "str"];

fn classify(ty: &Type) -> Class {
    match ty {
        Type::Paren(p) => classify(&p.elem),
        Type::Group(g) => classify(&g.elem),
        Type::Array(_) | Type::Slice(_) => Class::Unsupported("Slice"),
        Type::Reference(_) | Type::Ptr(_) => Class::Unsupported("Pointer"),
        Type::TraitObject(_) | Type::ImplTrait(_) => Class::Unsupported("Interface"),
        Type::Path(tp) if tp.qself.is_none() => {
            let Some(last) = tp.path.segments.last() else {
                return Class::Unsupported("Unknown");
            };
            let name = last.ident.to_string();
            let name = name.as_str();
            if SCALARS.contains(&name) && last.arguments.is_empty() {
                Class::Scalar
            } else if SLICES.contains(&name) {
                Class::Unsupported("Slice")
            } else if MAPS.contains(&name) {
                Class::Unsupported("Map")
            } else if POINTERS.contains(&name) {
                let boxes_trait_object =
                    first_type_arg(&last.arguments).is_some_and(is_trait_object);
                if name != "Option" && boxes_trait_object {
                    Class::Unsupported("Interface")
                } else {
                    Class::Unsupported("Pointer")
                }
            } else if COMPLEX.contains(&name) {
                Class::Unsupported("Complex")
            } else if UNKNOWN.contains(&name) {
                Class::Unsupported("Unknown")
            } else {
                Class::Nested
            }
        }
        _ => Class::Unsupported("Unknown"),
    }
}

fn first_type_arg(args: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = args else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn is_trait_object(ty: &Type) -> bool {
    matches!(ty, Type::TraitObject(_))
}

/// Expand the #[derive(Configurable)] macro.
pub fn expand(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = parse2(input)?;
    let parsed = match ConfInput::from_derive_input(&input) {
        Ok(parsed) => parsed,
        Err(e) => return Ok(e.write_errors()),
    };

    let name = &parsed.ident;
    let type_name = LitStr::new(&name.unraw().to_string(), name.span());
    if let Some(lifetime) = parsed.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "Configurable structs must be 'static and cannot take lifetime parameters",
        ));
    }

    let fields = parsed
        .data
        .take_struct()
        .map(|f| f.fields)
        .unwrap_or_default();
    let entries = fields
        .iter()
        .map(field_entry)
        .collect::<syn::Result<Vec<_>>>()?;
    let unused = entries.is_empty().then(|| quote! { let _ = at; });
    let generics = bounded_generics(&parsed.generics, &fields);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::confbind::Configurable for #name #ty_generics #where_clause {
            fn type_name() -> &'static str {
                #type_name
            }

            fn fields<__R: 'static>(
                at: &::confbind::Lens<__R, Self>,
            ) -> ::std::vec::Vec<::confbind::Field<__R>> {
                #unused
                ::std::vec![#(#entries),*]
            }
        }
    })
}

/// Type parameters must be `'static`, and every nested field type must be `Configurable`.
fn bounded_generics(generics: &Generics, fields: &[ConfField]) -> Generics {
    let mut generics = generics.clone();
    if generics.params.is_empty() {
        return generics;
    }
    let params: Vec<Ident> = generics.type_params().map(|p| p.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for param in params {
        where_clause.predicates.push(parse_quote! { #param: 'static });
    }
    for field in fields {
        let ignored = field.skip || field.tag.as_deref() == Some("-");
        if ignored || classify(&field.ty) != Class::Nested {
            continue;
        }
        let ty = &field.ty;
        where_clause
            .predicates
            .push(parse_quote! { #ty: ::confbind::Configurable });
    }
    generics
}

fn field_entry(field: &ConfField) -> syn::Result<TokenStream> {
    let Some(ident) = field.ident.as_ref() else {
        return Err(syn::Error::new_spanned(&field.ty, "Configurable requires named fields"));
    };
    let field_name = LitStr::new(&ident.unraw().to_string(), ident.span());

    if field.skip || field.tag.as_deref() == Some("-") {
        return Ok(quote! { ::confbind::Field::skipped(#field_name) });
    }

    let ty = &field.ty;
    let tag = match &field.tag {
        Some(tag) => quote! { ::core::option::Option::Some(#tag) },
        None => quote! { ::core::option::Option::None },
    };
    let lens = quote! {
        at.then(::confbind::Lens::new(
            |s: &Self| &s.#ident,
            |s: &mut Self| &mut s.#ident,
        ))
    };
    let class = classify(ty);

    if field.flatten {
        if class != Class::Nested {
            return Err(syn::Error::new_spanned(
                ty,
                "#[conf(flatten)] requires a nested Configurable struct",
            ));
        }
        return Ok(quote! {
            ::confbind::Field::embedded(
                #field_name,
                <#ty as ::confbind::Configurable>::fields(&#lens),
            )
        });
    }

    Ok(match class {
        Class::Scalar => quote! {
            ::confbind::Field::scalar(#field_name, #tag, #lens)
        },
        Class::Nested => quote! {
            ::confbind::Field::nested(
                #field_name,
                #tag,
                <#ty as ::confbind::Configurable>::fields(&#lens),
            )
        },
        Class::Unsupported(kind) => {
            let variant = Ident::new(kind, ident.span());
            quote! {
                ::confbind::Field::unsupported(#field_name, #tag, ::confbind::Unsupported::#variant)
            }
        }
    })
}
