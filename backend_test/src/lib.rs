use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies.
///
/// Each test gets a fresh in-memory server whose clock starts at
/// `crate::testing::epoch()`. Injectable dependencies are
/// [`rocket::local::asynchronous::Client`] and
/// `crate::model::clock::ManualClock`, the clock driving that server.
///
/// `#[backend_test(admin)]` starts the client's session as the admin.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injected arguments and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Log in the client as admin if needed.
    let maybe_login = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "admin" => quote! {
            crate::testing::log_in(&rocket_client, crate::testing::admin()).await;
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `admin` or nothing")
                .into_compile_error()
                .into();
        }
        None => TokenStream2::new(),
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (
                rocket::local::asynchronous::Client,
                crate::model::clock::ManualClock,
            ) {
                let clock = crate::model::clock::ManualClock::starting_at(crate::testing::epoch());
                let rocket_client = crate::testing::client(&clock).await;

                #maybe_login

                (rocket_client, clock)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let (rocket_client, clock) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_clock = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    // Accept both bare and qualified paths.
                    if let Some(segment) = type_path.path.segments.last() {
                        if segment.ident == "Client" {
                            if has_client {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `Client`",
                                ));
                            }
                            has_client = true;
                            args.push(quote! { rocket_client });
                            continue;
                        } else if segment.ident == "ManualClock" {
                            if has_clock {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `ManualClock`",
                                ));
                            }
                            has_clock = true;
                            args.push(quote! { clock.clone() });
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `clock_ident: ManualClock`",
        ));
    }

    Ok(args)
}
