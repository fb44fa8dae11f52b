use rocket::http::Status;

use crate::{
    error::{Error, Result},
    model::{
        api::{admin::AdminCredentials, auth::RegistrationRequest, email::Email},
        common::password::{hash_password, verify_password, MIN_PASSWORD_LENGTH},
        db::{Admin, NewAdmin, NewVoter, Voter},
    },
    store::ElectionStore,
};

/// Create a new, active voter account.
pub async fn register(store: &dyn ElectionStore, request: RegistrationRequest) -> Result<Voter> {
    let voter_id = request.voter_id.trim();
    if voter_id.is_empty() {
        return Err(Error::bad_request("Voter ID must not be empty"));
    }
    let email: Email = request
        .email
        .parse()
        .map_err(|e| Error::bad_request(format!("Invalid email address: {e}")))?;
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if request.password != request.password_confirm {
        return Err(Error::bad_request("Passwords do not match"));
    }

    let voter = NewVoter::new(
        voter_id.to_string(),
        email,
        hash_password(&request.password)?,
    );
    match store.insert_voter(voter).await {
        Ok(voter) => {
            info!("Registered voter {}", voter.voter_id);
            Ok(voter)
        }
        Err(Error::Duplicate(field)) => {
            let what = match field.as_str() {
                "email" => "email address",
                _ => "voter ID",
            };
            Err(Error::Status(
                Status::Conflict,
                format!("A voter with that {what} is already registered"),
            ))
        }
        Err(e) => Err(e),
    }
}

/// Check a voter's password. `None` covers an unknown voter ID, a wrong
/// password and a deactivated account alike.
pub async fn authenticate(
    store: &dyn ElectionStore,
    voter_id: &str,
    password: &str,
) -> Result<Option<Voter>> {
    let voter = store
        .voter_by_voter_id(voter_id.trim())
        .await?
        .filter(|voter| voter.active)
        .filter(|voter| verify_password(&voter.password_hash, password));
    if voter.is_none() {
        debug!("Failed password login for voter {voter_id}");
    }
    Ok(voter)
}

pub async fn authenticate_admin(
    store: &dyn ElectionStore,
    credentials: &AdminCredentials,
) -> Result<Option<Admin>> {
    Ok(store
        .admin_by_username(&credentials.username)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password)))
}

/// Ensure at least one admin can log in, creating one from `bootstrap` if
/// there are none.
pub async fn ensure_admin_exists(
    store: &dyn ElectionStore,
    bootstrap: Option<AdminCredentials>,
) -> Result<()> {
    if store.admin_count().await? > 0 {
        return Ok(());
    }
    match bootstrap {
        Some(credentials) => {
            let admin: NewAdmin = credentials.try_into()?;
            let admin = store.insert_admin(admin).await?;
            info!("Created admin {}", admin.username);
        }
        None => warn!("No admin accounts exist and none is configured"),
    }
    Ok(())
}
