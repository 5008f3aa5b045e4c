//! Signing side of A2A push notifications: RSA keys, JWKS and JWT-authenticated delivery.

use std::sync::RwLock;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{AgentError, Result};

const KEY_BITS: usize = 2048;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    #[serde(rename = "use")]
    pub use_: String,
    pub alg: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushClaims {
    pub iat: i64,
    pub request_body_sha256: String,
}

struct SigningKey {
    jwk: Jwk,
    encoding_key: EncodingKey,
}

pub struct PushNotificationSenderAuth {
    keys: RwLock<Vec<SigningKey>>,
    client: reqwest::Client,
}

impl PushNotificationSenderAuth {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| AgentError::Server(err.to_string()))?;
        Ok(Self {
            keys: RwLock::new(Vec::new()),
            client,
        })
    }

    /// Generates a fresh RSA key; it signs all later notifications.
    pub fn generate_jwk(&self) -> Result<Jwk> {
        // OsRng rather than thread_rng so this can run off the main thread.
        let private_key = RsaPrivateKey::new(&mut rand::rngs::OsRng, KEY_BITS)
            .map_err(|e| AgentError::Crypto(format!("failed to generate RSA key: {e}")))?;
        let pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| AgentError::Crypto(format!("failed to encode private key: {e}")))?;
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AgentError::Crypto(format!("failed to load signing key: {e}")))?;

        let kid = uuid::Uuid::new_v4().simple().to_string();
        let jwk = public_jwk(&RsaPublicKey::from(&private_key), &kid);
        let mut keys = self
            .keys
            .write()
            .map_err(|_| AgentError::Crypto("signing key lock poisoned".to_string()))?;
        keys.push(SigningKey {
            jwk: jwk.clone(),
            encoding_key,
        });
        info!(%kid, "generated push notification signing key");
        Ok(jwk)
    }

    /// Public keys for `/.well-known/jwks.json`.
    pub fn jwks(&self) -> JwksResponse {
        let keys = match self.keys.read() {
            Ok(keys) => keys.iter().map(|key| key.jwk.clone()).collect(),
            Err(_) => Vec::new(),
        };
        JwksResponse { keys }
    }

    /// RS256 token binding `data` by its hash, signed with the newest key.
    pub fn sign(&self, data: &Value) -> Result<String> {
        let keys = self
            .keys
            .read()
            .map_err(|_| AgentError::Crypto("signing key lock poisoned".to_string()))?;
        let key = keys
            .last()
            .ok_or_else(|| AgentError::Crypto("no signing key generated".to_string()))?;

        let claims = PushClaims {
            iat: Utc::now().timestamp(),
            request_body_sha256: request_body_sha256(data),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.jwk.kid.clone());
        jsonwebtoken::encode(&header, &claims, &key.encoding_key)
            .map_err(|e| AgentError::Crypto(format!("failed to sign JWT: {e}")))
    }

    /// The receiver proves ownership by echoing the validation token.
    pub async fn verify_push_notification_url(&self, url: &str) -> bool {
        let token = uuid::Uuid::new_v4().to_string();
        let resp = self
            .client
            .get(url)
            .query(&[("validationToken", token.as_str())])
            .send()
            .await;
        let verified = match resp {
            Ok(resp) => resp.text().await.map(|body| body == token).unwrap_or(false),
            Err(err) => {
                warn!(%url, error = %err, "error during sending push-notification validation");
                false
            }
        };
        info!(%url, verified, "verified push-notification URL");
        verified
    }

    /// Best effort: failures are logged and dropped.
    pub async fn send_push_notification(&self, url: &str, data: &Value) {
        let token = match self.sign(data) {
            Ok(token) => token,
            Err(err) => {
                warn!(%url, error = %err, "cannot sign push notification");
                return;
            }
        };
        let resp = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(data)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());
        match resp {
            Ok(_) => info!(%url, "push-notification sent"),
            Err(err) => warn!(%url, error = %err, "error during sending push-notification"),
        }
    }
}

/// Hex SHA-256 of the compact JSON encoding, object keys sorted.
pub fn request_body_sha256(data: &Value) -> String {
    let canonical = serde_json::to_string(&sorted(data)).unwrap_or_default();
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), sorted(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn public_jwk(public_key: &RsaPublicKey, kid: &str) -> Jwk {
    Jwk {
        kty: "RSA".to_string(),
        kid: kid.to_string(),
        use_: "sig".to_string(),
        alg: "RS256".to_string(),
        n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
        e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
    }
}
