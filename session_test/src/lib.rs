use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Turn a function into a test, inject a mock session, and make sure
/// logging is initialised first.
///
/// The session is a `crate::mock::MockSession` that has already completed
/// discovery against a `MockVsp`. It speaks the current protocol unless
/// the attribute is written `#[session_test(legacy)]`.
#[proc_macro_attribute]
pub fn session_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    let protocol = match parse_macro_input!(args as Option<Ident>) {
        None => quote! { crate::model::protocol::Protocol::current() },
        Some(arg) if arg == "current" => quote! { crate::model::protocol::Protocol::current() },
        Some(arg) if arg == "legacy" => quote! { crate::model::protocol::Protocol::legacy() },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `current` or `legacy`")
                .into_compile_error()
                .into();
        }
    };

    // Rename the inner function so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_inner", name);
    item_fn.sig.ident = new_name.clone();

    quote! {
        #[test]
        fn #name() {
            /// The test itself.
            #item_fn

            log4rs_test_utils::test_logging::init_logging_once_for(["vspclient"], None, None);
            let session = crate::mock::session(#protocol);

            #new_name(#(#test_args),*);
        }
    }
    .into()
}

/// Ensure the wrapped test is synchronous and takes at most one `MockSession`.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if let Some(asyncness) = sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span(),
            "Session tests are synchronous; remove `async`",
        ));
    }

    let mut args = vec![];
    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(type_ident) = type_path.path.get_ident() {
                    if type_ident == "MockSession" {
                        if !args.is_empty() {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `MockSession`",
                            ));
                        }
                        args.push(quote! { session });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected `session_ident: MockSession`",
        ));
    }

    Ok(args)
}
