use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, FnArg, ImplItem, ImplItemFn, ItemImpl, LitStr, Result as SynResult, Type,
    Visibility,
};

/// Operation name for a method: `#[op("Name")]` if present, else UpperCamel of the ident
fn operation_name(method: &mut ImplItemFn) -> SynResult<String> {
    let mut explicit = None;
    let mut kept = Vec::with_capacity(method.attrs.len());
    for attr in method.attrs.drain(..) {
        if attr.path().is_ident("op") {
            let lit: LitStr = attr.parse_args()?;
            explicit = Some(lit.value());
        } else {
            kept.push(attr);
        }
    }
    method.attrs = kept;
    Ok(explicit.unwrap_or_else(|| upper_camel(&method.sig.ident.to_string())))
}

fn upper_camel(ident: &str) -> String {
    let ident = ident.strip_prefix("r#").unwrap_or(ident);
    ident
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// `&mut Context`, with or without a module path before `Context`
fn is_context_mut(arg: &FnArg) -> bool {
    let FnArg::Typed(typed) = arg else {
        return false;
    };
    let Type::Reference(reference) = typed.ty.as_ref() else {
        return false;
    };
    if reference.mutability.is_none() {
        return false;
    }
    match reference.elem.as_ref() {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Context" && segment.arguments.is_none()),
        _ => false,
    }
}

/// `pub fn name(&self, ctx: &mut Context)` shaped methods
fn is_operation(method: &ImplItemFn) -> bool {
    if !matches!(method.vis, Visibility::Public(_)) {
        return false;
    }
    let mut inputs = method.sig.inputs.iter();
    let receiver_ok = matches!(
        inputs.next(),
        Some(FnArg::Receiver(recv)) if recv.reference.is_some() && recv.mutability.is_none()
    );
    receiver_ok && inputs.next().is_some_and(is_context_mut) && inputs.next().is_none()
}

/// Derive `chainrouter::reflect::Operations` from an inherent impl block
///
/// Every `pub fn name(&self, ctx: &mut Context)` becomes an operation named
/// in UpperCamel case (`get_user_info` is `GetUserInfo`). `#[op("Name")]`
/// sets the name explicitly.
#[proc_macro_attribute]
pub fn routes(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut input = parse_macro_input!(item as ItemImpl);
    if let Some((_, path, _)) = &input.trait_ {
        return syn::Error::new_spanned(path, "#[routes] expects an inherent impl block")
            .to_compile_error()
            .into();
    }

    let mut entries = Vec::new();
    for item in &mut input.items {
        let ImplItem::Fn(method) = item else { continue };
        let has_op = method.attrs.iter().any(|a| a.path().is_ident("op"));
        if !is_operation(method) {
            if has_op {
                return syn::Error::new_spanned(
                    &method.sig,
                    "#[op] requires `pub fn name(&self, ctx: &mut Context)`",
                )
                .to_compile_error()
                .into();
            }
            continue;
        }
        let name = match operation_name(method) {
            Ok(name) => name,
            Err(err) => return err.to_compile_error().into(),
        };
        let ident = &method.sig.ident;
        entries.push(quote! {
            ::chainrouter::reflect::Operation::new(#name, Self::#ident)
        });
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    let expanded = quote! {
        #input

        impl #impl_generics ::chainrouter::reflect::Operations for #self_ty #where_clause {
            fn operations() -> ::std::vec::Vec<::chainrouter::reflect::Operation<Self>> {
                ::std::vec![#(#entries),*]
            }
        }
    };
    TokenStream::from(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_operation_signatures() {
        let accepted: [ImplItemFn; 2] = [
            parse_quote! { pub fn get(&self, ctx: &mut Context) {} },
            parse_quote! { pub fn get(&self, ctx: &mut chainrouter::Context) {} },
        ];
        for method in &accepted {
            assert!(is_operation(method), "{}", quote!(#method));
        }

        let rejected: [ImplItemFn; 6] = [
            parse_quote! { pub fn helper(&self, n: u32) -> u32 { n } },
            parse_quote! { pub fn get(&self, ctx: &Context) {} },
            parse_quote! { pub fn get(&mut self, ctx: &mut Context) {} },
            parse_quote! { pub fn get(&self) {} },
            parse_quote! { pub fn get(&self, ctx: &mut Context, extra: u8) {} },
            parse_quote! { fn get(&self, ctx: &mut Context) {} },
        ];
        for method in &rejected {
            assert!(!is_operation(method), "{}", quote!(#method));
        }
    }
}
