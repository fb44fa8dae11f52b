#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod election;
pub mod error;
pub mod logging;
pub mod mail;
pub mod model;
pub mod store;

pub use config::Config;

use config::{ConfigFairing, MailerFairing, StoreFairing};
use logging::LoggerFairing;

/// Assemble the full server: configuration, storage and mail are all
/// loaded from the figment by their fairings during ignition.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(MailerFairing)
        .mount("/", api::routes())
}

/// A server over a fresh in-memory store and a recording mailer, for tests.
/// Only the application config is still loaded from the figment.
#[cfg(test)]
pub(crate) fn rocket_for_test(store: store::Store, outbox: mail::Outbox) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("log_level", "off"))
        .merge(("secret_key", TEST_SECRET_KEY))
        .merge(("jwt_secret", "test-jwt-secret"))
        .merge(("auth_ttl", 3600))
        .merge(("otp_ttl", 600))
        .merge(("login_ttl", 1800));
    let mailer: mail::MailSender = outbox;
    rocket::custom(figment)
        .attach(ConfigFairing)
        .manage(store)
        .manage(mailer)
        .mount("/", api::routes())
}

#[cfg(test)]
const TEST_SECRET_KEY: &str = "hPRYyVRiMyxpw5sBB1XeCMN1kFsDCqKvBi2QJxBVHQk=";
