use std::fmt::Display;
use std::{ops::Deref, str::FromStr};

use lettre::{address::AddressError, Address};
use serde::{Deserialize, Serialize};

/// A voter's email address, normalised to lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email {
    inner: Address,
}

impl Deref for Email {
    type Target = Address;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Display for Email {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(formatter)
    }
}

impl FromStr for Email {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Email {
            inner: s.trim().to_lowercase().parse::<Address>()?,
        })
    }
}

impl TryFrom<String> for Email {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.to_string()
    }
}
