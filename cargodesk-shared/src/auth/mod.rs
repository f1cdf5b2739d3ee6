/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and password strength rules
/// - [`jwt`]: access and refresh tokens (HS256)
/// - [`middleware`]: resolving a request's Bearer token into an [`AuthContext`](middleware::AuthContext)
/// - [`authorization`]: the role policy: who may do what, and who sees which records
///
/// # Example
///
/// ```no_run
/// use cargodesk_shared::auth::jwt::{issue_token_pair, TokenLifetimes};
/// use cargodesk_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("cargo-route-7")?;
/// assert!(verify_password("cargo-route-7", &hash)?);
///
/// let tokens = issue_token_pair(Uuid::new_v4(), "a-secret-of-at-least-32-characters", TokenLifetimes::default())?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
