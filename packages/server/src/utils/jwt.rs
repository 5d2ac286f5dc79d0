use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>, // Active organization (tenant)
    pub exp: usize, // Expiration timestamp
}

/// Sign a token for an identity, optionally scoped to an organization.
pub fn sign(subject: &str, org_id: Option<&str>, secret: &str, ttl: Duration) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("token expiry out of range"))?
        .timestamp();

    let claims = Claims {
        sub: subject.to_owned(),
        org_id: org_id.map(str::to_owned),
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
