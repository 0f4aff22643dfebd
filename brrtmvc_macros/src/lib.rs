use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
    spanned::Spanned,
    Data, DeriveInput, Fields, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, ReturnType,
    Result as SynResult, Token, Type, Visibility,
};

struct ControllerArgs {
    lowercase: bool,
}

impl Parse for ControllerArgs {
    fn parse(input: ParseStream) -> SynResult<Self> {
        let mut lowercase = false;
        for ident in Punctuated::<Ident, Token![,]>::parse_terminated(input)? {
            match ident.to_string().as_str() {
                "lowercase" => lowercase = true,
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unexpected controller option {other}"),
                    ))
                }
            }
        }
        Ok(ControllerArgs { lowercase })
    }
}

#[derive(Default)]
struct ActionArgs {
    method: Option<LitStr>,
    name: Option<LitStr>,
}

/// Pull every `#[action(..)]` off a method, returning the merged options.
fn take_action_args(method: &mut ImplItemFn) -> SynResult<Option<ActionArgs>> {
    let mut found = None;
    let mut kept = Vec::with_capacity(method.attrs.len());
    for attr in method.attrs.drain(..) {
        if !attr.path().is_ident("action") {
            kept.push(attr);
            continue;
        }
        let args: &mut ActionArgs = found.get_or_insert_with(ActionArgs::default);
        if matches!(attr.meta, syn::Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("method") {
                args.method = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("name") {
                args.name = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `method` or `name`"))
            }
        })?;
    }
    method.attrs = kept;
    Ok(found)
}

fn has_mut_self_receiver(method: &ImplItemFn) -> bool {
    match method.sig.inputs.first() {
        Some(FnArg::Receiver(r)) => r.reference.is_some() && r.mutability.is_some(),
        _ => false,
    }
}

/// True when the return type is written exactly as `ActionResult`.
fn returns_action_result(method: &ImplItemFn) -> bool {
    let ReturnType::Type(_, ty) = &method.sig.output else {
        return false;
    };
    let Type::Path(path) = ty.as_ref() else {
        return false;
    };
    path.qself.is_none()
        && path
            .path
            .segments
            .last()
            .is_some_and(|seg| seg.ident == "ActionResult" && seg.arguments.is_none())
}

fn chain(args: &ActionArgs) -> TokenStream2 {
    let method = args.method.as_ref().map(|m| quote! { .method_str(#m) });
    let name = args.name.as_ref().map(|n| quote! { .action(#n) });
    quote! { #method #name }
}

/// Implement `DiscoverActions` from an `impl` block.
///
/// Public `&mut self` methods returning `ActionResult` become actions named
/// after the method, served for GET. `#[action(method = "POST", name = "x")]`
/// changes the verb or the name, and also admits methods with any other
/// return type (`()`, `Result<ActionResult, E>`, ..).
///
/// A public method returning `ActionResult` through `&self` or `self` is
/// rejected, since actions run against a fresh `&mut` controller.
///
/// `#[controller(lowercase)]` lower-cases the controller and action names.
#[proc_macro_attribute]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ControllerArgs);
    let input = parse_macro_input!(item as ItemImpl);
    match expand_controller(&args, input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(e) => e.to_compile_error().into(),
    }
}

fn has_receiver(method: &ImplItemFn) -> bool {
    matches!(method.sig.inputs.first(), Some(FnArg::Receiver(_)))
}

fn expand_controller(args: &ControllerArgs, mut input: ItemImpl) -> SynResult<TokenStream2> {
    let mut registrations = Vec::new();
    for item in &mut input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let action_args = take_action_args(method)?;
        let ident = &method.sig.ident;
        let name = LitStr::new(&ident.to_string(), ident.span());

        let public = matches!(method.vis, Visibility::Public(_));
        let mut_self = has_mut_self_receiver(method);
        if public && has_receiver(method) && !mut_self && returns_action_result(method) {
            return Err(syn::Error::new(
                method.sig.inputs.span(),
                format!("controller action `{ident}` must take `&mut self`"),
            ));
        }

        match (public && mut_self && returns_action_result(method), action_args) {
            (true, args) => {
                let chained = args.as_ref().map(chain);
                registrations.push(quote! {
                    info.discover(#name, Self::#ident) #chained;
                });
            }
            (false, Some(args)) => {
                if !mut_self {
                    return Err(syn::Error::new(
                        method.sig.ident.span(),
                        "an #[action] method must take `&mut self`",
                    ));
                }
                let added = if args.method.is_none() && args.name.is_none() {
                    quote! { info.add_action(#name); }
                } else {
                    let chained = chain(&args);
                    quote! {
                        if let ::std::option::Option::Some(action) = info.add_action(#name) {
                            action #chained;
                        }
                    }
                };
                registrations.push(quote! {
                    info.register(#name, Self::#ident);
                    #added
                });
            }
            (false, None) => {}
        }
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    let lowercase = args.lowercase;

    Ok(quote! {
        #input

        impl #impl_generics ::brrtmvc::controller::DiscoverActions for #self_ty #where_clause {
            const LOWERCASE: bool = #lowercase;

            fn discover_actions(info: &mut ::brrtmvc::controller::ControllerInfo<Self>) {
                #(#registrations)*
            }
        }
    })
}

/// Implement `MvcController` by delegating to the `BaseController` field,
/// the one marked `#[base]` or else the one named `base`.
#[proc_macro_derive(MvcController, attributes(base))]
pub fn derive_mvc_controller(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let Data::Struct(data) = &input.data else {
        return syn::Error::new_spanned(&input.ident, "MvcController can only be derived for structs")
            .to_compile_error()
            .into();
    };
    let Fields::Named(fields) = &data.fields else {
        return syn::Error::new_spanned(&input.ident, "MvcController needs named fields")
            .to_compile_error()
            .into();
    };
    let field = fields
        .named
        .iter()
        .find(|f| f.attrs.iter().any(|a| a.path().is_ident("base")))
        .or_else(|| {
            fields
                .named
                .iter()
                .find(|f| f.ident.as_ref().is_some_and(|i| i == "base"))
        });
    let Some(field) = field.and_then(|f| f.ident.as_ref()) else {
        return syn::Error::new_spanned(
            &input.ident,
            "no BaseController field: name it `base` or mark it #[base]",
        )
        .to_compile_error()
        .into();
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let expanded = quote! {
        impl #impl_generics ::brrtmvc::controller::MvcController for #ident #ty_generics #where_clause {
            fn base(&self) -> &::brrtmvc::controller::BaseController {
                &self.#field
            }

            fn base_mut(&mut self) -> &mut ::brrtmvc::controller::BaseController {
                &mut self.#field
            }
        }
    };
    TokenStream::from(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand(input: ItemImpl) -> SynResult<String> {
        expand_controller(&ControllerArgs { lowercase: false }, input)
            .map(|t| t.to_string().chars().filter(|c| !c.is_whitespace()).collect())
    }

    #[test]
    fn test_mut_self_action_is_discovered() {
        let out = expand(parse_quote! {
            impl Home {
                pub fn index(&mut self) -> ActionResult { ActionResult::not_found() }
                fn helper(&mut self) -> ActionResult { ActionResult::not_found() }
            }
        })
        .unwrap();
        assert!(out.contains("info.discover(\"index\",Self::index)"), "{out}");
        assert!(!out.contains("Self::helper"), "{out}");
    }

    #[test]
    fn test_shared_self_action_is_rejected() {
        let err = expand(parse_quote! {
            impl Home {
                pub fn index(&self) -> ActionResult { ActionResult::not_found() }
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("`index` must take `&mut self`"), "{err}");
    }

    #[test]
    fn test_shared_self_helpers_with_other_returns_are_ignored() {
        let out = expand(parse_quote! {
            impl Home {
                pub fn title(&self) -> &'static str { "t" }
                pub fn create() -> ActionResult { ActionResult::not_found() }
            }
        })
        .unwrap();
        assert!(!out.contains("discover("), "{out}");
    }

    #[test]
    fn test_action_options_chain() {
        let out = expand(parse_quote! {
            impl Home {
                #[action(method = "POST", name = "save")]
                pub fn store(&mut self) -> ActionResult { ActionResult::not_found() }
            }
        })
        .unwrap();
        assert!(out.contains(".method_str(\"POST\").action(\"save\")"), "{out}");
        assert!(!out.contains("#[action"), "{out}");
    }
}
