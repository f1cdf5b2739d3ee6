/// Password hashing and strength checks
///
/// Hashes are Argon2id PHC strings (64 MB memory, 3 passes, 4 lanes, 32-byte
/// output). Verification reads the parameters back from the stored hash, so
/// older hashes keep verifying if the parameters change.
///
/// # Example
///
/// ```
/// use cargodesk_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("cargo-route-7")?;
/// assert!(verify_password("cargo-route-7", &hash)?);
/// assert!(!verify_password("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Minimum password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password with Argon2id and a random 16-byte salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))
}

/// Verifies a password against a stored hash
///
/// Returns `Ok(false)` for a wrong password and an error only when the
/// stored hash cannot be parsed or checked.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Passwords rejected outright regardless of length
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "12345678",
    "123456789",
    "qwerty123",
    "qwertyuiop",
    "iloveyou",
    "sunshine",
    "football",
    "baseball",
    "welcome1",
    "letmein1",
    "admin123",
    "abc12345",
];

/// Validates password strength
///
/// A password is accepted when it:
/// - is at least 8 characters long
/// - is not entirely numeric
/// - is not a commonly used password (case-insensitive)
/// - differs from the username (case-insensitive)
///
/// # Returns
///
/// `Ok(())` if the password is acceptable, otherwise every failed rule
///
/// # Example
///
/// ```
/// use cargodesk_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("cargo-route-7", Some("jdoe")).is_ok());
/// assert!(validate_password_strength("short", None).is_err());
/// assert!(validate_password_strength("1234567890", None).is_err());
/// ```
pub fn validate_password_strength(password: &str, username: Option<&str>) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }

    if let Some(username) = username {
        if !username.is_empty() && lowered == username.to_lowercase() {
            problems.push("The password is too similar to the username.".to_string());
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_uses_argon2id_parameters() {
        let hash = hash_password("cargo-route-7").unwrap();

        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=65536,t=3,p=4"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("same_password").unwrap();
        let second = hash_password("same_password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").unwrap();

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_against_unparseable_hash() {
        assert!(matches!(
            verify_password("password", "not-a-hash"),
            Err(PasswordError::InvalidHash(_))
        ));
        assert!(verify_password("password", "$argon2id$invalid").is_err());
    }

    #[test]
    fn test_validate_password_strength_valid() {
        let valid_passwords = vec!["cargo-route-7", "MyP@ssw0rd!", "longenoughpassphrase", "12345abc"];

        for password in valid_passwords {
            assert!(
                validate_password_strength(password, Some("jdoe")).is_ok(),
                "Password '{}' should be valid",
                password
            );
        }
    }

    #[test]
    fn test_validate_password_strength_too_short() {
        let problems = validate_password_strength("Sh0rt!", None).unwrap_err();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("at least 8 characters"));
    }

    #[test]
    fn test_validate_password_strength_counts_characters_not_bytes() {
        // 4 characters, 12 bytes
        assert!(validate_password_strength("密码密码", None).is_err());
        assert!(validate_password_strength("密码密码密码密码", None).is_ok());
    }

    #[test]
    fn test_validate_password_strength_entirely_numeric() {
        let problems = validate_password_strength("8675309123", None).unwrap_err();
        assert!(problems.iter().any(|p| p.contains("entirely numeric")));
    }

    #[test]
    fn test_validate_password_strength_common() {
        let problems = validate_password_strength("Password123", None).unwrap_err();
        assert!(problems.iter().any(|p| p.contains("too common")));
    }

    #[test]
    fn test_validate_password_strength_reports_every_problem() {
        let problems = validate_password_strength("1234", None).unwrap_err();
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn test_validate_password_strength_matches_username() {
        let problems = validate_password_strength("DriverJane", Some("driverjane")).unwrap_err();
        assert!(problems.iter().any(|p| p.contains("username")));

        assert!(validate_password_strength("DriverJane", Some("jane")).is_ok());
    }
}
