pub use token::{AuthError, AuthToken, AUTH_TOKEN_COOKIE};

mod token;
