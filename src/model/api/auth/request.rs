use serde::{Deserialize, Serialize};

/// First login step: voter ID and password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub voter_id: String,
    pub password: String,
}

/// Second login step: the code from the OTP email.
/// Kept as a string so a malformed code is reported rather than rejected by the parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpSubmission {
    pub code: String,
}

/// A new voter account. The email is validated on registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub voter_id: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}
