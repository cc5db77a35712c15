//! Application JWTs for the Vonage REST API.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::VonageError;

/// Token lifetime in seconds.
pub const JWT_TTL_SECS: i64 = 300;

/// Claims Vonage expects in an application token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationClaims {
    pub application_id: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl ApplicationClaims {
    pub fn new(application_id: &str, now: OffsetDateTime) -> Self {
        let iat = now.unix_timestamp();
        Self {
            application_id: application_id.to_string(),
            iat,
            exp: iat + JWT_TTL_SECS,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Sign a fresh RS256 application token.
pub fn application_jwt(application_id: &str, private_key_pem: &str) -> Result<String, VonageError> {
    let claims = ApplicationClaims::new(application_id, OffsetDateTime::now_utc());
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())?;
    Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};

    const PRIVATE_KEY: &str = include_str!("../../tests/fixtures/vonage_test_key.pem");
    const PUBLIC_KEY: &str = include_str!("../../tests/fixtures/vonage_test_key.pub.pem");

    #[test]
    fn test_claims_lifetime() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let claims = ApplicationClaims::new("app-1", now);
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp, 1_700_000_300);
        assert_ne!(claims.jti, ApplicationClaims::new("app-1", now).jti);
    }

    #[test]
    fn test_signed_token_verifies() {
        let token = application_jwt("app-1", PRIVATE_KEY).unwrap();

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);

        let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap();
        let data = decode::<ApplicationClaims>(&token, &key, &Validation::new(Algorithm::RS256))
            .unwrap();
        assert_eq!(data.claims.application_id, "app-1");
        assert_eq!(data.claims.exp - data.claims.iat, JWT_TTL_SECS);
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let err = application_jwt("app-1", "not a pem").unwrap_err();
        assert!(matches!(err, VonageError::Jwt(_)));
    }
}
