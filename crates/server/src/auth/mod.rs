mod jwt;
mod middleware;
mod password;

pub use jwt::{ACCESS_TOKEN_TTL_HOURS, AccessIdentity, JwtError, JwtService};
pub use middleware::{RequestContext, require_admin, require_session};
pub use password::{PasswordError, hash_password, verify_password};
