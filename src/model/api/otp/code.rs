use std::fmt::Display;
use std::ops::Deref;
use std::str::FromStr;

use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CODE_LENGTH: usize = 6;

/// A one-time-password code: exactly six decimal digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code {
    digits: [u8; CODE_LENGTH],
}

impl Code {
    /// Generate a random code, each digit uniformly distributed.
    pub fn random() -> Self {
        let mut digits = [0; CODE_LENGTH];
        let digit_dist = Uniform::from(0..=9);
        let mut rng = rand::thread_rng();
        for digit in &mut digits {
            *digit = digit_dist.sample(&mut rng);
        }
        Self { digits }
    }
}

impl Deref for Code {
    type Target = [u8; CODE_LENGTH];

    fn deref(&self) -> &Self::Target {
        &self.digits
    }
}

impl Display for Code {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for digit in self.digits {
            write!(formatter, "{digit}")?;
        }
        Ok(())
    }
}

impl FromStr for Code {
    type Err = ParseError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let len = string.chars().count();
        if len != CODE_LENGTH {
            return Err(Self::Err::InvalidLength(len));
        }
        let mut digits = [0; CODE_LENGTH];
        for (digit, c) in digits.iter_mut().zip(string.chars()) {
            *digit = c
                .to_digit(10)
                .and_then(|d| u8::try_from(d).ok())
                .ok_or(Self::Err::InvalidChar(c))?;
        }
        Ok(Self { digits })
    }
}

impl TryFrom<String> for Code {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.to_string()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("OTP code must contain exactly 6 characters, got {0}")]
    InvalidLength(usize),
    #[error("OTP code must contain only digits, found '{0}'")]
    InvalidChar(char),
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Code {
        /// A code guaranteed to differ from `self`.
        pub fn other_than(&self) -> Self {
            let mut digits = self.digits;
            digits[0] = (digits[0] + 1) % 10;
            Self { digits }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_codes() {
        let code: Code = "012345".parse().unwrap();
        assert_eq!(*code, [0, 1, 2, 3, 4, 5]);
        assert_eq!(code.to_string(), "012345");
    }

    #[test]
    fn reject_malformed_codes() {
        assert_eq!("12345".parse::<Code>(), Err(ParseError::InvalidLength(5)));
        assert_eq!("1234567".parse::<Code>(), Err(ParseError::InvalidLength(7)));
        assert_eq!("12a456".parse::<Code>(), Err(ParseError::InvalidChar('a')));
        assert_eq!("".parse::<Code>(), Err(ParseError::InvalidLength(0)));
        // Multi-byte characters are counted as characters, not bytes.
        assert_eq!("12345é".parse::<Code>(), Err(ParseError::InvalidChar('é')));
    }

    #[test]
    fn random_codes_are_six_digits() {
        for _ in 0..100 {
            let code = Code::random();
            let text = code.to_string();
            assert_eq!(text.len(), CODE_LENGTH);
            assert!(text.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn serde_uses_string_form() {
        use rocket::serde::json::serde_json;

        let code: Code = "987654".parse().unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), r#""987654""#);
        assert_eq!(serde_json::from_str::<Code>(r#""987654""#).unwrap(), code);
        assert!(serde_json::from_str::<Code>(r#""98765""#).is_err());
    }
}
