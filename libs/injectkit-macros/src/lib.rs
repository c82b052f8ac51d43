use heck::ToSnakeCase;
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::{
    bracketed,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
    DeriveInput, Expr, Ident, ItemStatic, LitBool, LitStr, StaticMutability, Token, Type,
};

const VALID_PRIORITIES: &[&str] = &["Lowest", "Low", "Normal", "High", "Highest"];
const VALID_KEYS: &[&str] = &["priority", "implements", "ctor", "fallible"];

fn suggest_similar(input: &str, candidates: &[&'static str]) -> Vec<&'static str> {
    let mut suggestions: Vec<(&str, f64)> = candidates
        .iter()
        .map(|&c| (c, strsim::jaro_winkler(&input.to_lowercase(), &c.to_lowercase())))
        .filter(|(_, score)| *score > 0.7)
        .collect();

    suggestions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    suggestions.into_iter().take(2).map(|(c, _)| c).collect()
}

fn unknown_error(span: &impl quote::ToTokens, what: &str, input: &str, candidates: &[&'static str]) -> syn::Error {
    let suggestions = suggest_similar(input, candidates);
    let msg = if suggestions.is_empty() {
        format!(
            "unknown {what} '{input}', expected one of: {}",
            candidates.join(", ")
        )
    } else {
        format!(
            "unknown {what} '{input}'\n       = help: did you mean one of: {}?",
            suggestions.join(", ")
        )
    };
    syn::Error::new_spanned(span, msg)
}

/// Configuration parsed from #[provides(...)]
#[derive(Default)]
struct ProvidesConfig {
    priority: Option<Ident>,
    implements: Vec<Type>,
    ctor: Option<Expr>,
    fallible: bool,
}

fn parse_priority(input: ParseStream) -> syn::Result<Ident> {
    let (text, span) = if input.peek(LitStr) {
        let lit: LitStr = input.parse()?;
        (lit.value(), lit.span())
    } else {
        let path: syn::Path = input.parse()?;
        // accept `High` as well as `Priority::High` / `injectkit::Priority::High`
        let last = path
            .segments
            .last()
            .ok_or_else(|| syn::Error::new_spanned(&path, "expected a priority name"))?;
        (last.ident.to_string(), last.ident.span())
    };

    VALID_PRIORITIES
        .iter()
        .find(|p| p.eq_ignore_ascii_case(&text))
        .map(|p| Ident::new(p, span))
        .ok_or_else(|| {
            let ident = Ident::new("priority", span);
            unknown_error(&ident, "priority", &text, VALID_PRIORITIES)
        })
}

impl Parse for ProvidesConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut cfg = ProvidesConfig::default();
        let mut seen_implements = false;

        while !input.is_empty() {
            let key: Ident = input.parse()?;
            match key.to_string().as_str() {
                "priority" => {
                    if cfg.priority.is_some() {
                        return Err(syn::Error::new_spanned(key, "duplicate `priority` parameter"));
                    }
                    input.parse::<Token![=]>()?;
                    cfg.priority = Some(parse_priority(input)?);
                }
                "implements" => {
                    if seen_implements {
                        return Err(syn::Error::new_spanned(key, "duplicate `implements` parameter"));
                    }
                    seen_implements = true;
                    input.parse::<Token![=]>()?;
                    let content;
                    bracketed!(content in input);
                    let types: Punctuated<Type, Token![,]> =
                        content.parse_terminated(Type::parse, Token![,])?;
                    cfg.implements = types.into_iter().collect();
                }
                "ctor" => {
                    if cfg.ctor.is_some() {
                        return Err(syn::Error::new_spanned(key, "duplicate `ctor` parameter"));
                    }
                    input.parse::<Token![=]>()?;
                    let expr: Expr = input.parse()?;
                    if let Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(s),
                        ..
                    }) = &expr
                    {
                        return Err(syn::Error::new_spanned(
                            s,
                            "ctor must be a Rust expression, not a string literal. \
                 Use: ctor = MyType::new()  (with parentheses), \
                 or:  ctor = Default::default()",
                        ));
                    }
                    cfg.ctor = Some(expr);
                }
                "fallible" => {
                    if input.peek(Token![=]) {
                        input.parse::<Token![=]>()?;
                        let value: LitBool = input.parse()?;
                        cfg.fallible = value.value;
                    } else {
                        cfg.fallible = true;
                    }
                }
                other => return Err(unknown_error(&key, "parameter", other, VALID_KEYS)),
            }

            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        if cfg.fallible && cfg.ctor.is_none() {
            return Err(syn::Error::new(
                Span::call_site(),
                "`fallible` requires a `ctor` expression returning Result<Self, ProvideError>",
            ));
        }

        Ok(cfg)
    }
}

/// Register a struct as a provider.
///
/// ```ignore
/// #[derive(Default)]
/// #[provides(priority = High, implements = [dyn Store])]
/// pub struct MemStore { /* ... */ }
///
/// #[provides(implements = [dyn Store], fallible, ctor = RemoteStore::connect())]
/// pub struct RemoteStore { /* ... */ }
/// ```
///
/// `ctor` defaults to `Default::default()`. With `fallible` it must evaluate to
/// `Result<Self, ProvideError>`.
#[proc_macro_attribute]
pub fn provides(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as ProvidesConfig);
    let input = parse_macro_input!(item as DeriveInput);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(&input.generics, "provider types cannot be generic")
            .to_compile_error()
            .into();
    }

    let ident = &input.ident;
    let describe_name = format_ident!("__injectkit_describe_{}", ident.to_string().to_snake_case());

    let priority = config
        .priority
        .unwrap_or_else(|| Ident::new("Normal", Span::call_site()));

    let upcasts = config.implements.iter().map(|ty| {
        quote! { .implements::<#ty>(|it| it) }
    });

    let ctor_body = match (&config.ctor, config.fallible) {
        (Some(expr), true) => quote! { #expr },
        (Some(expr), false) => quote! { ::core::result::Result::Ok(#expr) },
        (None, _) => quote! {
            ::core::result::Result::Ok(<#ident as ::core::default::Default>::default())
        },
    };

    let expanded = quote! {
        #input

        const _: () = {
            #[allow(dead_code)]
            fn __injectkit_require_shareable()
            where
                #ident: ::core::marker::Send + ::core::marker::Sync + 'static,
            {}
        };

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #describe_name() -> ::injectkit::ProviderDescriptor {
            ::injectkit::ProviderDescriptor::new(
                ::core::module_path!(),
                ::injectkit::ProviderType::of::<#ident>() #(#upcasts)*,
                || -> ::core::result::Result<#ident, ::injectkit::ProvideError> { #ctor_body },
            )
            .with_priority(::injectkit::Priority::#priority)
        }

        ::injectkit::inventory::submit! {
            ::injectkit::ProviderRegistration {
                module: ::core::module_path!(),
                describe: #describe_name,
            }
        }
    };

    TokenStream::from(expanded)
}

/// Register a static `Inject<T>` slot as an injection site.
///
/// ```ignore
/// #[inject]
/// static STORE: Inject<dyn Store> = Inject::new();
/// ```
///
/// The site's declaring type is the enclosing module path and its field name
/// is the static's name.
#[proc_macro_attribute]
pub fn inject(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(Span::call_site(), "#[inject] takes no arguments")
            .to_compile_error()
            .into();
    }
    let item = parse_macro_input!(item as ItemStatic);

    if let StaticMutability::Mut(m) = &item.mutability {
        return syn::Error::new_spanned(m, "#[inject] slots must not be `static mut`")
            .to_compile_error()
            .into();
    }

    let name = &item.ident;
    let name_lit = LitStr::new(&name.to_string(), name.span());
    let describe_name = format_ident!("__injectkit_site_{}", name.to_string().to_snake_case());

    let expanded = quote! {
        #item

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #describe_name() -> ::injectkit::InjectionSite {
            ::injectkit::InjectionSite::slot(::core::module_path!(), #name_lit, &#name)
        }

        ::injectkit::inventory::submit! {
            ::injectkit::SiteRegistration {
                module: ::core::module_path!(),
                describe: #describe_name,
            }
        }
    };

    TokenStream::from(expanded)
}
