use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject dependencies.
///
/// Every test gets a fresh in-memory store and a recording mailer, so tests
/// are isolated from each other and need no running database.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// `crate::store::Store` and `crate::mail::Outbox`.
///
/// `#[backend_test(admin)]` and `#[backend_test(voter)]` log the client in
/// as the example admin or example voter before the test body runs.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
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

    // Log in the client as admin/voter if needed.
    let maybe_login = match parse_macro_input!(args as Option<Ident>) {
        None => quote! {},
        Some(arg) if arg == "admin" => quote! {
            store
                .insert_admin(crate::model::db::admin::NewAdmin::example())
                .await
                .unwrap();

            let response = rocket_client
                .post("/auth/admin")
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!(crate::model::api::admin::AdminCredentials::example1()).to_string())
                .dispatch()
                .await;
            assert_eq!(rocket::http::Status::Ok, response.status(), "admin login failed");
        },
        Some(arg) if arg == "voter" => quote! {
            let voter = store
                .insert_voter(crate::model::db::voter::NewVoter::example())
                .await
                .unwrap();

            let response = rocket_client
                .post("/auth/login")
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!(crate::model::api::auth::LoginRequest::example()).to_string())
                .dispatch()
                .await;
            assert_eq!(rocket::http::Status::Ok, response.status(), "voter login failed");

            let mail = outbox.last_to(&voter.email).expect("no OTP mail sent");
            let code = mail.body.rsplit(' ').next().unwrap().to_string();

            let response = rocket_client
                .post("/auth/otp")
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!({ "code": code }).to_string())
                .dispatch()
                .await;
            assert_eq!(rocket::http::Status::Ok, response.status(), "OTP verification failed");
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `admin` or `voter`")
                .into_compile_error()
                .into();
        }
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let store: crate::store::Store =
                    std::sync::Arc::new(crate::store::MemoryStore::new());
                let outbox = crate::mail::RecordingMailer::new();
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_test(store.clone(), outbox.clone()),
                )
                .await
                .unwrap();

                // Scoped so login responses release their borrow of the client.
                {
                    #maybe_login
                }

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

    let mut seen = Vec::new();
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(type_ident) = type_path.path.segments.last().map(|s| &s.ident) {
                    let arg = if type_ident == "Client" {
                        Some(quote! { rocket_client })
                    } else if type_ident == "Store" {
                        Some(quote! { store.clone() })
                    } else if type_ident == "Outbox" {
                        Some(quote! { outbox.clone() })
                    } else {
                        None
                    };

                    if let Some(arg) = arg {
                        if seen.contains(type_ident) {
                            return Err(syn::Error::new(
                                input.span(),
                                format!("Test cannot accept more than one `{type_ident}`"),
                            ));
                        }
                        seen.push(type_ident.clone());
                        args.push(arg);
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `store_ident: Store` or `outbox_ident: Outbox`",
        ));
    }

    Ok(args)
}
