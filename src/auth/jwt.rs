use anyhow::{bail, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT issuer identifier
const ISSUER: &str = "blog-api/session";

/// Registered claims carried by a session token (RFC 7519).
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    pub exp: u64,    // Expiration time, absolute unix seconds
    pub iat: u64,    // Issued at
    pub iss: String, // Issuer, always ISSUER
    pub nbf: u64,    // Not before
    pub sub: String, // Subject, the user id
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// No credential was presented, or it was empty.
    #[error("missing credential")]
    Missing,

    /// The credential was presented but cannot be trusted. The detail is for
    /// logs only, it never reaches the client.
    #[error("invalid credential")]
    Invalid(String),
}

impl CredentialError {
    pub fn detail(&self) -> &str {
        match self {
            CredentialError::Missing => "no credential presented",
            CredentialError::Invalid(detail) => detail,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: u64,
}

/// Signs HS256 session tokens for a subject.
pub struct JwtTokenGenerator {
    key: EncodingKey,
    expiry: u64, // Token lifetime in seconds
}

impl JwtTokenGenerator {
    /// # Arguments
    /// * `secret` - Shared HMAC secret, must not be empty
    /// * `expiry` - Token lifetime in seconds
    pub fn new(secret: &[u8], expiry: u64) -> Result<Self> {
        if secret.is_empty() {
            bail!("jwt secret cannot be empty");
        }
        if expiry == 0 {
            bail!("jwt expiry cannot be zero");
        }
        Ok(Self {
            key: EncodingKey::from_secret(secret),
            expiry,
        })
    }

    pub fn expiry(&self) -> u64 {
        self.expiry
    }

    pub fn generate_token(&self, subject: &str, now: u64) -> Result<SessionToken> {
        if subject.is_empty() {
            bail!("generate jwt token failed: empty subject");
        }

        let claims = Claims {
            exp: now + self.expiry,
            iat: now,
            iss: String::from(ISSUER),
            nbf: now,
            sub: subject.to_string(),
        };

        match encode(&Header::new(Algorithm::HS256), &claims, &self.key) {
            Ok(token) => Ok(SessionToken {
                token,
                expires_at: claims.exp,
            }),
            Err(e) => bail!("generate jwt token failed: {e}"),
        }
    }
}

/// Verifies session tokens. Verification is pure: it never touches storage
/// and reads the clock only through the `now` argument.
pub struct JwtTokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenValidator {
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            bail!("jwt secret cannot be empty");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "nbf", "sub"]);
        // Time claims are checked against the injected `now` below.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Ok(Self {
            key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Returns the subject id of a valid credential.
    ///
    /// # Arguments
    /// * `token` - The raw credential, `None` when the request carried none
    /// * `now` - Current unix time in seconds
    pub fn validate_token(&self, token: Option<&str>, now: u64) -> Result<String, CredentialError> {
        let token = match token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(CredentialError::Missing),
        };

        let claims = match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("Validate jwt token failed: {e}");
                return Err(CredentialError::Invalid(format!("decode token: {e}")));
            }
        };

        if claims.sub.is_empty() {
            return Err(CredentialError::Invalid(String::from("empty subject")));
        }

        if now >= claims.exp {
            return Err(CredentialError::Invalid(String::from("token expired")));
        }

        if now < claims.nbf {
            return Err(CredentialError::Invalid(String::from("token not yet valid")));
        }

        Ok(claims.sub)
    }
}
