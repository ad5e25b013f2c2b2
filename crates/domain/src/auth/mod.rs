//! Authentication domain types

mod types;

pub use types::{
    AuthTokens, LoginRequest, RefreshGrant, RefreshRequest, RegisterRequest, Session, UserRecord,
    token_preview,
};
