use argon2::{Config, Error as Argon2Error};
use rand::Rng;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a plaintext password with Argon2 and a fresh random salt,
/// producing a self-describing encoded hash.
pub fn hash_password(password: &str) -> Result<String, Argon2Error> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())
}

/// Check a plaintext password against an encoded hash.
/// A malformed hash never verifies.
pub fn verify_password(password_hash: &str, password: &str) -> bool {
    argon2::verify_encoded(password_hash, password.as_bytes()).unwrap_or(false)
}
