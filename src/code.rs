use chrono::Utc;
use pbkdf2::pbkdf2_hmac_array;
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Length of an object id in hex characters.
pub const OBJECT_ID_LEN: usize = 24;

const PASSWORD_SCHEME: &str = "pbkdf2-sha256";

/// Derives the stored form of a user password: `pbkdf2-sha256$<rounds>$<hex>`.
/// The rounds travel with the hash, so raising them later does not lock out
/// existing users.
pub fn hash_password(password: &str, salt: &str, rounds: u32) -> String {
    let key = pbkdf2_hmac_array::<Sha256, 32>(password.as_bytes(), salt.as_bytes(), rounds);
    format!("{PASSWORD_SCHEME}${rounds}${}", hex::encode(key))
}

/// Checks `password` against a hash produced by [`hash_password`]. The final
/// comparison takes the same time wherever the first difference is.
pub fn verify_password(password: &str, salt: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(PASSWORD_SCHEME), Some(rounds), Some(_)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let rounds = match rounds.parse::<u32>() {
        Ok(rounds) if rounds > 0 => rounds,
        _ => return false,
    };

    let expect = hash_password(password, salt, rounds);
    expect.as_bytes().ct_eq(stored.as_bytes()).into()
}

pub fn generate_salt(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generates a 12-byte object id rendered as 24 lowercase hex chars. The
/// first four bytes are the big-endian creation second, so ids sort roughly
/// by creation time.
pub fn generate_object_id() -> String {
    let mut bytes = [0_u8; 12];
    let secs = Utc::now().timestamp() as u32;
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    rand::thread_rng().fill_bytes(&mut bytes[4..]);
    hex::encode(bytes)
}

pub fn is_object_id(s: &str) -> bool {
    s.len() == OBJECT_ID_LEN
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
