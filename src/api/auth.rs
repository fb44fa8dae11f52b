use chrono::Utc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    election::{identity, otp, OtpAuthenticator, OtpValidation},
    error::{Error, Result},
    mail::MailSender,
    model::{
        api::{
            admin::AdminCredentials,
            auth::{AuthToken, LoginRequest, OtpSubmission, RegistrationRequest, AUTH_TOKEN_COOKIE},
            otp::{Code, PendingLogin, PENDING_LOGIN_COOKIE},
        },
        db::Voter,
    },
    store::Store,
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![register, login, verify_otp, logout, authenticate_admin]
}

fn invalid_credentials() -> Error {
    Error::unauthorized("Invalid credentials")
}

#[post("/auth/register", data = "<request>", format = "json")]
pub async fn register(request: Json<RegistrationRequest>, store: &State<Store>) -> Result<Status> {
    identity::register(store.inner().as_ref(), request.0).await?;
    Ok(Status::Created)
}

/// Check the password, then email a fresh OTP. The pending-login cookie is
/// only set once the mail has gone out.
#[post("/auth/login", data = "<request>", format = "json")]
pub async fn login(
    request: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
    mailer: &State<MailSender>,
    config: &State<Config>,
) -> Result<()> {
    let store = store.inner().as_ref();
    let voter = identity::authenticate(store, &request.voter_id, &request.password)
        .await?
        .ok_or_else(invalid_credentials)?;

    let code = OtpAuthenticator::from_config(config)
        .issue(store, &voter, Utc::now())
        .await?;
    otp::deliver(mailer.inner().as_ref(), &voter, &code).await?;

    cookies.add_private(PendingLogin::new(&voter).into_cookie(config)?);
    Ok(())
}

#[post("/auth/otp", data = "<submission>", format = "json")]
pub async fn verify_otp(
    submission: Json<OtpSubmission>,
    pending: PendingLogin,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
    config: &State<Config>,
) -> Result<()> {
    let code: Code = submission
        .code
        .trim()
        .parse()
        .map_err(|e| Error::bad_request(format!("Malformed OTP: {e}")))?;

    let voter: Voter = store
        .voter(pending.voter)
        .await?
        .filter(|voter| voter.active)
        .ok_or_else(invalid_credentials)?;

    match OtpAuthenticator::from_config(config).validate(&voter, &code, Utc::now()) {
        OtpValidation::Valid => {
            cookies.add(AuthToken::new(&voter).into_cookie(config)?);
            cookies.remove_private(Cookie::named(PENDING_LOGIN_COOKIE));
            info!("Voter {} signed in", voter.voter_id);
            Ok(())
        }
        OtpValidation::Invalid => {
            cookies.remove_private(Cookie::named(PENDING_LOGIN_COOKIE));
            Err(Error::unauthorized("Invalid OTP, please log in again"))
        }
        OtpValidation::Expired => {
            cookies.remove_private(Cookie::named(PENDING_LOGIN_COOKIE));
            Err(Error::unauthorized("OTP has expired, please log in again"))
        }
    }
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    cookies.remove_private(Cookie::named(PENDING_LOGIN_COOKIE));
    Status::Ok
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn authenticate_admin(
    credentials: Json<AdminCredentials>,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
    config: &State<Config>,
) -> Result<()> {
    let admin = identity::authenticate_admin(store.inner().as_ref(), &credentials)
        .await?
        .ok_or_else(invalid_credentials)?;

    cookies.add(AuthToken::new(&admin).into_cookie(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::{http::ContentType, local::asynchronous::Client, serde::json::serde_json::json};

    use super::*;
    use crate::{
        mail::Outbox,
        model::db::{voter::examples::EXAMPLE_PASSWORD, IssuedOtp, NewAdmin, NewVoter},
    };

    async fn request_otp(client: &Client) -> Status {
        client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(LoginRequest::example()).to_string())
            .dispatch()
            .await
            .status()
    }

    async fn submit_otp(client: &Client, code: &str) -> Status {
        client
            .post(uri!(verify_otp))
            .header(ContentType::JSON)
            .body(json!({ "code": code }).to_string())
            .dispatch()
            .await
            .status()
    }

    /// The code from the most recent OTP mail to the example voter.
    fn mailed_code(outbox: &Outbox) -> String {
        let mail = outbox.last_to(&NewVoter::example().email).unwrap();
        mail.body.rsplit(' ').next().unwrap().to_string()
    }

    #[backend_test]
    async fn register_voter(client: Client, store: Store) {
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(RegistrationRequest::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());

        let voter = store
            .voter_by_voter_id(&RegistrationRequest::example().voter_id)
            .await
            .unwrap()
            .unwrap();
        assert!(voter.active);

        // Registering again clashes on the voter ID.
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(RegistrationRequest::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
    }

    #[backend_test]
    async fn voter_login_with_otp(client: Client, store: Store, outbox: Outbox) {
        store.insert_voter(NewVoter::example()).await.unwrap();

        assert_eq!(Status::Ok, request_otp(&client).await);
        assert!(client.cookies().get_private(PENDING_LOGIN_COOKIE).is_some());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());

        let mail = outbox.last_to(&NewVoter::example().email).unwrap();
        assert_eq!(mail.subject, otp::OTP_SUBJECT);

        assert_eq!(Status::Ok, submit_otp(&client, &mailed_code(&outbox)).await);
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        assert!(client.cookies().get_private(PENDING_LOGIN_COOKIE).is_none());
    }

    #[backend_test]
    async fn wrong_password_is_generic(client: Client, store: Store, outbox: Outbox) {
        store.insert_voter(NewVoter::example()).await.unwrap();

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(
                json!({
                    "voter_id": NewVoter::example().voter_id,
                    "password": "not-the-password",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        let wrong_password = response.into_string().await.unwrap();

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!({ "voter_id": "nobody", "password": EXAMPLE_PASSWORD }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(wrong_password, response.into_string().await.unwrap());

        assert!(outbox.sent().is_empty());
        assert!(client.cookies().get_private(PENDING_LOGIN_COOKIE).is_none());
    }

    #[backend_test]
    async fn inactive_voter_cannot_log_in(client: Client, store: Store, outbox: Outbox) {
        let voter = store.insert_voter(NewVoter::example()).await.unwrap();
        store.set_voter_active(&voter.voter_id, false).await.unwrap();

        assert_eq!(Status::Unauthorized, request_otp(&client).await);
        assert!(outbox.sent().is_empty());
    }

    #[backend_test]
    async fn mail_failure_is_reported(client: Client, store: Store, outbox: Outbox) {
        store.insert_voter(NewVoter::example()).await.unwrap();
        outbox.set_failing(true);

        assert_eq!(Status::InternalServerError, request_otp(&client).await);
        assert!(client.cookies().get_private(PENDING_LOGIN_COOKIE).is_none());
    }

    #[backend_test]
    async fn wrong_otp_is_rejected(client: Client, store: Store, outbox: Outbox) {
        store.insert_voter(NewVoter::example()).await.unwrap();
        request_otp(&client).await;

        let code: Code = mailed_code(&outbox).parse().unwrap();
        let wrong = code.other_than().to_string();
        assert_eq!(Status::Unauthorized, submit_otp(&client, &wrong).await);
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
        assert!(client.cookies().get_private(PENDING_LOGIN_COOKIE).is_none());

        // One wrong guess spends the login: even the right code is refused now.
        assert_eq!(Status::Unauthorized, submit_otp(&client, &code.to_string()).await);
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());

        // Logging in again mails a fresh code, which works.
        assert_eq!(Status::Ok, request_otp(&client).await);
        assert_eq!(Status::Ok, submit_otp(&client, &mailed_code(&outbox)).await);
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
    }

    #[backend_test]
    async fn repeated_guessing_needs_repeated_logins(client: Client, store: Store, outbox: Outbox) {
        store.insert_voter(NewVoter::example()).await.unwrap();
        request_otp(&client).await;
        let code: Code = mailed_code(&outbox).parse().unwrap();

        let mut guess = code.other_than();
        for _ in 0..5 {
            assert_eq!(Status::Unauthorized, submit_otp(&client, &guess.to_string()).await);
            guess = guess.other_than();
        }
        // Only the first guess reached the code check; the rest had no login.
        assert_eq!(outbox.sent().len(), 1);
        assert!(client.cookies().get_private(PENDING_LOGIN_COOKIE).is_none());
    }

    #[backend_test]
    async fn malformed_otp_is_bad_request(client: Client, store: Store) {
        store.insert_voter(NewVoter::example()).await.unwrap();
        request_otp(&client).await;

        assert_eq!(Status::BadRequest, submit_otp(&client, "12ab").await);
        assert!(client.cookies().get_private(PENDING_LOGIN_COOKIE).is_some());
    }

    #[backend_test]
    async fn otp_without_login_is_unauthorized(client: Client) {
        assert_eq!(Status::Unauthorized, submit_otp(&client, "123456").await);
    }

    #[backend_test]
    async fn expired_otp_requires_new_login(client: Client, store: Store, outbox: Outbox) {
        let voter = store.insert_voter(NewVoter::example()).await.unwrap();
        request_otp(&client).await;
        let code: Code = mailed_code(&outbox).parse().unwrap();

        // Backdate the issued code past its window.
        let issued_at = Utc::now() - Duration::minutes(11);
        store
            .set_voter_otp(voter.id, IssuedOtp { code, issued_at })
            .await
            .unwrap();

        assert_eq!(Status::Unauthorized, submit_otp(&client, &code.to_string()).await);
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
        assert!(client.cookies().get_private(PENDING_LOGIN_COOKIE).is_none());
    }

    #[backend_test]
    async fn admin_authenticate_valid(client: Client, store: Store) {
        store.insert_admin(NewAdmin::example()).await.unwrap();

        let response = client
            .post(uri!(authenticate_admin))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::example1()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
    }

    #[backend_test]
    async fn admin_authenticate_invalid(client: Client, store: Store) {
        store.insert_admin(NewAdmin::example()).await.unwrap();

        let response = client
            .post(uri!(authenticate_admin))
            .header(ContentType::JSON)
            .body(json!(AdminCredentials::empty()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());

        let response = client
            .post(uri!(authenticate_admin))
            .header(ContentType::JSON)
            .body(
                json!({
                    "username": &NewAdmin::example().username,
                    "password": "",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test(admin)]
    async fn logout_admin(client: Client) {
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        let response = client.delete(uri!(logout)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test(voter)]
    async fn logout_voter(client: Client) {
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        let response = client.delete(uri!(logout)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test]
    async fn logout_not_logged_in(client: Client) {
        let response = client.delete(uri!(logout)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
    }
}
