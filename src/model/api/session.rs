use serde::{Deserialize, Serialize};

/// A signed token to keep in the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub token: String,
}
