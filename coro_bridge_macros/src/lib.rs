//! Entry-point attributes that drive an `async fn` on a `coro_bridge::Runtime`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ItemFn, parse_macro_input};

/// Runs an `async fn main` to completion on a fresh runtime.
///
/// ```ignore
/// #[coro_bridge::main]
/// async fn main() {
///     // Your async code here
/// }
/// ```
#[proc_macro_attribute]
pub fn main(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    if input.sig.asyncness.is_none() {
        // Keep the sync `main` so the attribute error is the only one reported.
        return quote! {
            compile_error!("The #[coro_bridge::main] function must be async");
            #input
        }
        .into();
    }

    if input.sig.ident != "main" {
        return quote! {
            compile_error!("#[coro_bridge::main] can only be applied to the 'main' function");
        }
        .into();
    }

    drive(input, quote! {}).into()
}

/// Runs an `async fn` test to completion on a fresh runtime.
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    if input.sig.asyncness.is_none() {
        return quote! { compile_error!("The #[coro_bridge::test] function must be async"); }
            .into();
    }

    if !input.sig.inputs.is_empty() {
        return quote! {
            compile_error!("#[coro_bridge::test] functions cannot take arguments");
        }
        .into();
    }

    drive(input, quote! { #[::core::prelude::v1::test] }).into()
}

/// Rewrites `async fn` into a sync fn that blocks on the original body.
fn drive(mut input: ItemFn, header: TokenStream2) -> TokenStream2 {
    input.sig.asyncness = None;
    let sig = &input.sig;
    let body = &input.block;
    let attrs = &input.attrs;
    let vis = &input.vis;

    quote! {
        #header
        #(#attrs)*
        #vis #sig {
            // 1. Bootstrap the runtime
            let runtime = ::coro_bridge::Runtime::new()
                .expect("Failed to initialize coro_bridge runtime");

            // 2. Block on the original body
            runtime
                .block_on(async move #body)
                .expect("coro_bridge runtime entered from inside another runtime")
        }
    }
}
