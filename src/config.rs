use std::sync::Arc;

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::{
    election::identity::ensure_admin_exists,
    mail::{LogMailer, MailSender, SmtpMailer},
    model::api::admin::AdminCredentials,
    store::{MemoryStore, MongoStore, Store},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default = "default_otp_ttl")]
    otp_ttl: u32,
    #[serde(default = "default_login_ttl")]
    login_ttl: u32,
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
}

fn default_otp_ttl() -> u32 {
    600
}

fn default_login_ttl() -> u32 {
    1800
}

impl Config {
    /// Valid lifetime of an OTP in seconds.
    pub fn otp_ttl(&self) -> Duration {
        Duration::seconds(self.otp_ttl.into())
    }

    /// Lifetime of the pending-login cookie that links a password login to
    /// its OTP submission. Outlives the OTP so expiry can be reported.
    pub fn login_ttl(&self) -> Duration {
        Duration::seconds(self.login_ttl.max(self.otp_ttl).into())
    }

    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Which store implementation to use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreKind {
    #[default]
    Mongodb,
    Memory,
}

/// Configuration for the store.
#[derive(Deserialize)]
struct StoreConfig {
    // non-secrets
    #[serde(default)]
    store: StoreKind,
    #[serde(default = "default_db_name")]
    db_name: String,
    admin_username: Option<String>,
    // secrets
    db_uri: Option<String>,
    admin_password: Option<String>,
}

fn default_db_name() -> String {
    "election".to_string()
}

/// A fairing that loads the store config, connects to the database if
/// needed, bootstraps the first admin, and places a [`Store`] into managed state.
pub struct StoreFairing;

impl StoreFairing {
    async fn connect(config: &StoreConfig) -> Result<Store, String> {
        match config.store {
            StoreKind::Memory => {
                warn!("Using the in-memory store; nothing will survive a restart");
                Ok(Arc::new(MemoryStore::new()))
            }
            StoreKind::Mongodb => {
                let db_uri = config
                    .db_uri
                    .as_deref()
                    .ok_or("`db_uri` must be set when `store` is \"mongodb\"")?;
                info!("Loaded database config, connecting...");
                let client = MongoClient::with_uri_str(db_uri)
                    .await
                    .map_err(|e| format!("Failed to connect to database: {e}"))?;
                let db = client.database(&config.db_name);
                let store = MongoStore::new(&db)
                    .await
                    .map_err(|e| format!("Failed to create database indexes: {e}"))?;
                info!("...database connection online!");
                Ok(Arc::new(store))
            }
        }
    }
}

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store = match Self::connect(&config).await {
            Ok(store) => store,
            Err(e) => {
                error!("{e}");
                return Err(rocket);
            }
        };

        // Ensure there is at least one admin user.
        let bootstrap = match (config.admin_username, config.admin_password) {
            (Some(username), Some(password)) => Some(AdminCredentials { username, password }),
            _ => None,
        };
        if let Err(e) = ensure_admin_exists(store.as_ref(), bootstrap).await {
            error!("Failed to bootstrap admin account: {e}");
            return Err(rocket);
        }

        // Manage the state.
        rocket = rocket.manage(store);
        Ok(rocket)
    }
}

/// How outgoing mail leaves the server.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum MailTransport {
    #[default]
    Smtp,
    Log,
}

/// Configuration for outgoing mail.
#[derive(Deserialize)]
struct MailConfig {
    // non-secrets
    #[serde(default)]
    mail_transport: MailTransport,
    mail_from: Option<String>,
    smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    smtp_port: u16,
    smtp_username: Option<String>,
    // secrets
    smtp_password: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

impl MailConfig {
    fn into_mailer(self) -> Result<MailSender, String> {
        match self.mail_transport {
            MailTransport::Log => {
                warn!("Mail transport is `log`: OTP codes will be written to the log, not sent");
                Ok(Arc::new(LogMailer))
            }
            MailTransport::Smtp => {
                let from = self.mail_from.ok_or("`mail_from` must be set")?;
                let host = self.smtp_host.ok_or("`smtp_host` must be set")?;
                let credentials = self.smtp_username.zip(self.smtp_password);
                let mailer = SmtpMailer::new(&from, &host, self.smtp_port, credentials)
                    .map_err(|e| e.to_string())?;
                info!("Loaded SMTP config for {host}:{}", self.smtp_port);
                Ok(Arc::new(mailer))
            }
        }
    }
}

/// A fairing that loads the mail config and places a [`MailSender`] into
/// managed state.
pub struct MailerFairing;

#[rocket::async_trait]
impl Fairing for MailerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Mailer",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<MailConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load mail config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let mailer = match config.into_mailer() {
            Ok(mailer) => mailer,
            Err(e) => {
                error!("Failed to configure mail: {e}");
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(mailer);
        Ok(rocket)
    }
}
