use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// Claims issued by the external identity service. `sub` is the owner id
/// every car query is scoped to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Cars --

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteCarResponse {
    pub message: String,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}
