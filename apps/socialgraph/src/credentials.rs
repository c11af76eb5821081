//! # Credentials
//!
//! Password hashing and login for the registration collaborator.
//!
//! The store keeps `(password_hash, salt)` as opaque strings. Here the salt is
//! 16 random bytes, hex-encoded, and the hash is a domain-separated BLAKE3
//! digest over `salt || password`.

use rand::RngCore;
use socialgraph_core::{NewUser, Profile, Session};
use subtle::ConstantTimeEq;

/// Domain tag mixed into every password digest.
const PASSWORD_DOMAIN: &str = "socialgraph-password-v1";

/// Salt length in bytes (before hex encoding).
pub const SALT_LEN: usize = 16;

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(PASSWORD_DOMAIN.as_bytes());
    hasher.update(b":");
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Hash a password with a fresh random salt. Returns `(hash, salt)`.
pub fn hash_password(password: &str) -> (String, String) {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = hex::encode(salt);
    (digest(&salt, password), salt)
}

/// Check a password against a stored `(hash, salt)` pair in constant time.
pub fn verify_password(password: &str, hash: &str, salt: &str) -> bool {
    let computed = digest(salt, password);
    let same_len = computed.len() == hash.len();
    let bytes_match: bool = computed.as_bytes().ct_eq(hash.as_bytes()).into();
    same_len && bytes_match
}

/// Registration input with a freshly hashed password.
pub fn new_user_with_password(
    username: &str,
    name: &str,
    email: &str,
    bio: &str,
    password: &str,
) -> NewUser {
    let (hash, salt) = hash_password(password);
    NewUser::new(username, name, email, bio).with_credentials(hash, salt)
}

/// Verify a login. Returns the profile on success.
///
/// Users without stored credentials (bulk imports) cannot log in.
pub fn login(session: &Session, username: &str, password: &str) -> Option<Profile> {
    let credentials = session.credentials(username)?;
    if credentials.password_hash.is_empty() {
        return None;
    }
    if !verify_password(password, &credentials.password_hash, &credentials.salt) {
        tracing::warn!(
            event = "login_failure",
            username,
            "Login failed: wrong password"
        );
        return None;
    }
    session.profile(username)
}
