use chrono::{DateTime, Duration, Utc};

use crate::{
    config::Config,
    error::{Error, Result},
    mail::Mailer,
    model::{
        api::otp::Code,
        db::{IssuedOtp, Voter},
    },
    store::ElectionStore,
};

pub const OTP_SUBJECT: &str = "Your OTP Code";

/// Result of checking a submitted code against the voter's current OTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpValidation {
    Valid,
    /// No code was issued, or the submitted one does not match.
    Invalid,
    /// The code matches but its window has elapsed.
    Expired,
}

/// Issues and checks time-boxed one-time passcodes.
#[derive(Debug, Clone, Copy)]
pub struct OtpAuthenticator {
    ttl: Duration,
}

impl OtpAuthenticator {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.otp_ttl())
    }

    /// Generate a fresh code for the voter and persist it with its issuance
    /// time in one write, replacing any earlier code.
    pub async fn issue(
        &self,
        store: &dyn ElectionStore,
        voter: &Voter,
        now: DateTime<Utc>,
    ) -> Result<Code> {
        let otp = IssuedOtp {
            code: Code::random(),
            issued_at: now,
        };
        if !store.set_voter_otp(voter.id, otp).await? {
            return Err(Error::not_found(format!("Voter {}", voter.voter_id)));
        }
        info!("Issued OTP to voter {}", voter.voter_id);
        Ok(otp.code)
    }

    /// Check a submitted code. The window is `[issued_at, issued_at + ttl)`.
    /// A matching code stays valid for the whole window, even after use.
    pub fn validate(&self, voter: &Voter, submitted: &Code, now: DateTime<Utc>) -> OtpValidation {
        let Some(otp) = &voter.otp else {
            debug!("Voter {} submitted an OTP but none was issued", voter.voter_id);
            return OtpValidation::Invalid;
        };
        if otp.code != *submitted {
            debug!("Voter {} submitted a wrong OTP", voter.voter_id);
            return OtpValidation::Invalid;
        }
        if now >= otp.issued_at + self.ttl {
            debug!("Voter {} submitted an expired OTP", voter.voter_id);
            return OtpValidation::Expired;
        }
        OtpValidation::Valid
    }
}

/// Email the code to the voter. Delivery failure is returned, never swallowed.
pub async fn deliver(mailer: &dyn Mailer, voter: &Voter, code: &Code) -> Result<()> {
    let body = format!("Your OTP code is {code}");
    mailer
        .send(&voter.email, OTP_SUBJECT, &body)
        .await
        .map_err(|e| {
            error!("Failed to send OTP to voter {}: {e}", voter.voter_id);
            Error::Mail(e)
        })
}
