pub mod post;
pub mod response;
pub mod user;

use anyhow::{bail, Result};

pub(crate) fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        bail!("{field} length should be in range [{min}, {max}]");
    }
    Ok(())
}

pub(crate) fn check_email(email: &str) -> Result<()> {
    let Some((local, domain)) = email.split_once('@') else {
        bail!("invalid email");
    };
    if local.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        bail!("invalid email");
    }
    Ok(())
}

/// Passwords need 8 to 24 chars with at least one uppercase, one lowercase,
/// one digit and one punctuation or symbol.
pub(crate) fn check_password(password: &str) -> Result<()> {
    check_len("password", password, 8, 24)?;

    let mut upper = false;
    let mut lower = false;
    let mut digit = false;
    let mut special = false;
    for c in password.chars() {
        if c.is_uppercase() {
            upper = true;
        } else if c.is_lowercase() {
            lower = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else if c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_whitespace()) {
            special = true;
        }
    }

    if !(upper && lower && digit && special) {
        bail!("password needs an uppercase letter, a lowercase letter, a digit and a symbol");
    }
    Ok(())
}
