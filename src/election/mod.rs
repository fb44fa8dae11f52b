//! The election core: OTP sign-in, vote admission and tallying.
//!
//! Nothing here touches HTTP. Callers pass in the store, the current time,
//! and IDs as submitted; outcomes come back as plain enums and views.

pub mod identity;
pub mod ledger;
pub mod otp;
pub mod reports;
pub mod tally;

pub use ledger::{cast_vote, CastOutcome};
pub use otp::{OtpAuthenticator, OtpValidation};
