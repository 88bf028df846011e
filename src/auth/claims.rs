use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload issued by the external auth provider. We only verify;
/// signup, refresh and revocation live outside this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}
