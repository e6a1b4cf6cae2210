//! Authentication substrate: argon2 password hashing and HS256 bearer
//! credentials shared by TaskCore and the trusted workers.

pub mod error;
pub mod password;
pub mod tokens;

pub use error::AuthError;
pub use password::PasswordKdf;
pub use tokens::{Claims, Principal, TokenRole, TokenSigner, ACTING_USER_HEADER};
