pub mod auth;

pub use auth::{Jwk, JwksResponse, PushClaims, PushNotificationSenderAuth};
