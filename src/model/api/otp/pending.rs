use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::try_outcome,
    request::{self, FromRequest},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::Error,
    model::{db::voter::Voter, mongodb::Id},
};

pub const PENDING_LOGIN_COOKIE: &str = "otp_pending";

/// A voter who has passed the password check and now owes us an OTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    #[serde(rename = "vid")]
    pub voter: Id,
}

impl PendingLogin {
    pub fn new(voter: &Voter) -> Self {
        Self { voter: voter.id }
    }

    /// Convert into a private cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>, JwtError> {
        let claims = Claims {
            pending: self,
            expire_at: Utc::now() + config.login_ttl(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;
        Ok(Cookie::build(PENDING_LOGIN_COOKIE, token)
            .max_age(Duration::seconds(config.login_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish())
    }

    /// Deserialize from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, JwtError> {
        jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.pending)
    }
}

/// Cookie claims: the pending login plus an expiry datetime.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    pending: PendingLogin,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PendingLogin {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = try_outcome!(req.guard::<&State<Config>>().await.map_failure(|_| {
            (
                Status::InternalServerError,
                Error::Status(Status::InternalServerError, "Config not loaded".to_string()),
            )
        }));

        let Some(cookie) = req.cookies().get_private(PENDING_LOGIN_COOKIE) else {
            return request::Outcome::Failure((
                Status::Unauthorized,
                Error::unauthorized("Please log in with your password first"),
            ));
        };

        match Self::from_cookie(&cookie, config) {
            Ok(pending) => request::Outcome::Success(pending),
            Err(_) => request::Outcome::Failure((
                Status::Unauthorized,
                Error::unauthorized("Your login has lapsed, please log in again"),
            )),
        }
    }
}
