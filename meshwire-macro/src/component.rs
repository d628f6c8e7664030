use darling::ast::{Data, Style};
use darling::util::{Flag, PathList};
use darling::{FromDeriveInput, FromField, FromMeta};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, DeriveInput, GenericArgument, PathArguments, Type};

#[derive(FromDeriveInput)]
#[darling(attributes(component), supports(struct_named, struct_unit))]
struct ComponentArgs {
    ident: syn::Ident,
    generics: syn::Generics,
    data: Data<(), ComponentField>,
    #[darling(default)]
    id: Option<String>,
    #[darling(default)]
    implements: PathList,
    #[darling(multiple)]
    ancestor: Vec<String>,
    #[darling(default)]
    default: Flag,
    #[darling(multiple)]
    default_for: Vec<String>,
    #[darling(default)]
    subscribes: Option<syn::Path>,
}

#[derive(FromField)]
#[darling(attributes(component))]
struct ComponentField {
    ident: Option<syn::Ident>,
    ty: Type,
    #[darling(default)]
    default: Option<DefaultValue>,
    #[darling(default)]
    given: Flag,
}

/// Field default, kept exactly as written.
///
/// darling reads a string literal as the source of an expression, which would
/// turn `default = "ops"` into the path `ops`.
struct DefaultValue(syn::Expr);

impl FromMeta for DefaultValue {
    fn from_expr(expr: &syn::Expr) -> darling::Result<Self> {
        Ok(Self(expr.clone()))
    }
}

/// How a field is declared and read back from the arguments
enum Kind {
    Interface(Type),
    Service(Type),
    Stack,
    Container,
    Locator,
    Value(Type),
}

pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ComponentArgs::from_derive_input(&input) {
        Ok(args) => TokenStream::from(generate_component_impl(&args)),
        Err(err) => TokenStream::from(err.write_errors()),
    }
}

fn generate_component_impl(args: &ComponentArgs) -> TokenStream2 {
    let struct_name = &args.ident;
    let (impl_generics, ty_generics, where_clause) = args.generics.split_for_impl();

    let identifier = args.id.as_ref().map(|id| {
        quote! {
            fn identifier() -> &'static str {
                #id
            }
        }
    });

    let Data::Struct(fields) = &args.data else {
        return syn::Error::new(
            struct_name.span(),
            "#[derive(Component)] can only be applied to structs",
        )
        .to_compile_error();
    };

    let mut dependencies = Vec::with_capacity(fields.len());
    let mut initializers = Vec::with_capacity(fields.len());
    for field in fields.iter() {
        let Some(field_name) = &field.ident else {
            continue;
        };
        let name = field_name.unraw().to_string();
        let (dependency, access) = generate_field(field, &name);
        dependencies.push(dependency);
        initializers.push(quote!(#field_name: #access));
    }

    let interfaces: Vec<&syn::Path> = args.implements.iter().collect();
    let ancestors = &args.ancestor;

    let default_for = if args.default.is_present() || !args.default_for.is_empty() {
        let subjects = &args.default_for;
        Some(quote! {
            fn default_for() -> ::std::option::Option<::std::vec::Vec<&'static str>> {
                ::std::option::Option::Some(::std::vec![#(#subjects),*])
            }
        })
    } else {
        None
    };

    let subscribed_services = args.subscribes.as_ref().map(|path| {
        quote! {
            fn subscribed_services(
                tags: &::meshwire::TagBuilder,
            ) -> ::std::option::Option<::std::vec::Vec<::std::string::String>> {
                ::std::option::Option::Some(#path(tags))
            }
        }
    });

    let construct = match fields.style {
        Style::Unit => quote!(Self),
        _ => quote!(Self { #(#initializers),* }),
    };

    quote! {
        impl #impl_generics ::meshwire::Component for #struct_name #ty_generics #where_clause {
            #identifier

            fn dependencies() -> ::std::vec::Vec<::meshwire::Dependency> {
                ::std::vec![#(#dependencies),*]
            }

            fn capabilities() -> ::std::vec::Vec<::meshwire::Capability> {
                ::std::vec![#(
                    ::meshwire::Capability::new::<dyn #interfaces, Self, _>(
                        |instance: ::std::sync::Arc<Self>| -> ::std::sync::Arc<dyn #interfaces> { instance },
                    )
                ),*]
            }

            fn ancestors() -> ::std::vec::Vec<&'static str> {
                ::std::vec![#(#ancestors),*]
            }

            #default_for

            #subscribed_services

            fn construct(args: &::meshwire::Arguments) -> ::meshwire::Result<Self> {
                ::std::result::Result::Ok(#construct)
            }
        }
    }
}

/// Dependency declaration and argument accessor for one field
fn generate_field(field: &ComponentField, name: &str) -> (TokenStream2, TokenStream2) {
    let (nullable, ty) = match option_inner(&field.ty) {
        Some(inner) => (true, inner),
        None => (false, &field.ty),
    };

    let kind = if field.given.is_present() {
        Kind::Value(ty.clone())
    } else {
        classify(ty)
    };

    let (declaration, accessor) = match &kind {
        Kind::Interface(iface) => (
            quote!(::meshwire::Dependency::interface::<#iface>(#name)),
            quote!(interface::<#iface>),
        ),
        Kind::Service(service) => (
            quote!(::meshwire::Dependency::service(
                #name,
                <#service as ::meshwire::Component>::identifier(),
            )),
            quote!(service::<#service>),
        ),
        Kind::Stack => (
            quote!(::meshwire::Dependency::container(#name)),
            quote!(stack),
        ),
        Kind::Container => (
            quote!(::meshwire::Dependency::container(#name)),
            quote!(container),
        ),
        Kind::Locator => (
            quote!(::meshwire::Dependency::container(#name)),
            quote!(locator),
        ),
        Kind::Value(value) => {
            let type_name = quote!(#value).to_string().replace(' ', "");
            (
                quote!(::meshwire::Dependency::typed_scalar(#name, #type_name)),
                quote!(value::<#value>),
            )
        }
    };

    let mut dependency = declaration;
    if nullable {
        dependency = quote!(#dependency.nullable());
    }
    if let Some(DefaultValue(default)) = &field.default {
        dependency = quote!(#dependency.with_default(::meshwire::serde_json::json!(#default)));
    }

    let accessor = if nullable {
        let optional = syn::Ident::new(
            &format!("optional_{}", accessor_name(&kind)),
            proc_macro2::Span::call_site(),
        );
        match &kind {
            Kind::Interface(iface) => quote!(args.#optional::<#iface>(#name)?),
            Kind::Service(service) => quote!(args.#optional::<#service>(#name)?),
            Kind::Value(value) => quote!(args.#optional::<#value>(#name)?),
            Kind::Stack | Kind::Container | Kind::Locator => quote!(args.#optional(#name)?),
        }
    } else {
        quote!(args.#accessor(#name)?)
    };

    (dependency, accessor)
}

fn accessor_name(kind: &Kind) -> &'static str {
    match kind {
        Kind::Interface(_) => "interface",
        Kind::Service(_) => "service",
        Kind::Stack => "stack",
        Kind::Container => "container",
        Kind::Locator => "locator",
        Kind::Value(_) => "value",
    }
}

fn classify(ty: &Type) -> Kind {
    if let Some(inner) = generic_inner(ty, "Arc") {
        return match inner {
            Type::TraitObject(object) => {
                let is_locator = object.bounds.iter().any(|bound| match bound {
                    syn::TypeParamBound::Trait(bound) => bound
                        .path
                        .segments
                        .last()
                        .is_some_and(|segment| segment.ident == "ServiceLocator"),
                    _ => false,
                });
                if is_locator {
                    Kind::Locator
                } else {
                    Kind::Interface(inner.clone())
                }
            }
            _ => Kind::Service(inner.clone()),
        };
    }

    match last_segment(ty).map(|segment| segment.ident.to_string()).as_deref() {
        Some("ServiceStack") => Kind::Stack,
        Some("Container") => Kind::Container,
        _ => Kind::Value(ty.clone()),
    }
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => type_path.path.segments.last(),
        _ => None,
    }
}

/// `T` when `ty` is `wrapper<T>`
fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let segment = last_segment(ty)?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    }
}

fn option_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Option")
}
