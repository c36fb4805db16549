//! # Password Policy
//!
//! Database user passwords must be at least seven characters long and contain
//! an uppercase letter, a lowercase letter, a digit and a symbol. Each class is
//! checked on its own; the result lists every class that is missing.

use crate::constants::MIN_PASSWORD_LEN;
use std::fmt;

/// A requirement the password does not meet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    MinLength,
    Uppercase,
    Lowercase,
    Digit,
    Symbol,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::MinLength => write!(f, "at least {MIN_PASSWORD_LEN} characters"),
            Requirement::Uppercase => f.write_str("an uppercase letter"),
            Requirement::Lowercase => f.write_str("a lowercase letter"),
            Requirement::Digit => f.write_str("a digit"),
            Requirement::Symbol => f.write_str("a punctuation or symbol character"),
        }
    }
}

/// Unmet requirements of a rejected password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation(pub Vec<Requirement>);

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("password must contain ")?;
        for (i, requirement) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{requirement}")?;
        }
        Ok(())
    }
}

/// Check a password against the policy
pub fn check_password(password: &str) -> Result<(), PolicyViolation> {
    let mut missing = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LEN {
        missing.push(Requirement::MinLength);
    }
    if !password.chars().any(char::is_uppercase) {
        missing.push(Requirement::Uppercase);
    }
    if !password.chars().any(char::is_lowercase) {
        missing.push(Requirement::Lowercase);
    }
    if !password.chars().any(char::is_numeric) {
        missing.push(Requirement::Digit);
    }
    if !password.chars().any(is_symbol) {
        missing.push(Requirement::Symbol);
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PolicyViolation(missing))
    }
}

fn is_symbol(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace() && !c.is_control()
}
