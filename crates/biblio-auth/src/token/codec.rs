//! Signed token creation and validation with per-class secrets.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use biblio_core::AppError;
use biblio_core::config::auth::AuthConfig;
use biblio_entity::identity::Identity;

use super::claims::{Claims, TokenClass};
use crate::error::AuthError;

/// Produces and parses signed tokens. Never touches the store.
///
/// Access and refresh tokens are signed with distinct secrets so that a
/// refresh secret compromise cannot forge access tokens and vice versa.
#[derive(Clone)]
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    /// Validation configuration shared by both classes.
    validation: Validation,
    /// Issuer string embedded in every token.
    issuer: String,
    /// Access token TTL in minutes.
    access_ttl_minutes: i64,
    /// Refresh token TTL in days.
    refresh_ttl_days: i64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .finish()
    }
}

impl TokenCodec {
    /// Creates a new codec from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew
        validation.set_issuer(&[&config.issuer]);

        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            access_ttl_minutes: config.access_ttl_minutes as i64,
            refresh_ttl_days: config.refresh_ttl_days as i64,
        }
    }

    /// The configured access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_ttl_minutes)
    }

    /// The configured refresh token lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_ttl_days)
    }

    /// Signs a token of the given class for an identity and session,
    /// with a fresh random `jti`.
    pub fn issue(
        &self,
        identity: &Identity,
        session_id: Uuid,
        class: TokenClass,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.id,
            sid: session_id,
            role: identity.role,
            display_name: identity.display_name.clone(),
            email: identity.email.clone(),
            capabilities: identity.capabilities.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4(),
            token_type: class,
        };

        let key = match class {
            TokenClass::Access => &self.access_encoding,
            TokenClass::Refresh => &self.refresh_encoding,
        };

        encode(&Header::default(), &claims, key)
            .map_err(|e| AppError::internal(format!("Failed to encode {class} token: {e}")))
    }

    /// Decodes and validates a token, requiring the expected class.
    pub fn verify(&self, token: &str, expected: TokenClass) -> Result<Claims, AuthError> {
        let key = match expected {
            TokenClass::Access => &self.access_decoding,
            TokenClass::Refresh => &self.refresh_decoding,
        };

        let token_data =
            decode::<Claims>(token, key, &self.validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::MalformedToken,
            })?;

        if token_data.claims.token_type != expected {
            return Err(AuthError::WrongTokenClass { expected });
        }

        Ok(token_data.claims)
    }

    /// Parses claims without verifying the signature.
    ///
    /// Used only by fast-path revocation pre-checks that need the session id
    /// before a full cryptographic verification. Never the sole basis for
    /// granting access.
    pub fn decode_unverified(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .ok()
            .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_entity::identity::{CapabilitySet, Role};

    fn config() -> AuthConfig {
        AuthConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            issuer: "biblio".to_string(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 30,
        }
    }

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            display_name: "Sam Reader".to_string(),
            email: "sam@example.com".to_string(),
            role: Role::Member,
            capabilities: ["books.read"].into_iter().collect::<CapabilitySet>(),
            active: true,
        }
    }

    #[test]
    fn test_issue_verify_roundtrip() {
        let codec = TokenCodec::new(&config());
        let ident = identity();
        let sid = Uuid::new_v4();

        let token = codec
            .issue(&ident, sid, TokenClass::Access, codec.access_ttl())
            .unwrap();
        let claims = codec.verify(&token, TokenClass::Access).unwrap();

        assert_eq!(claims.sub, ident.id);
        assert_eq!(claims.sid, sid);
        assert_eq!(claims.role, Role::Member);
        assert_eq!(claims.token_type, TokenClass::Access);
    }

    #[test]
    fn test_wrong_class_rejected() {
        let codec = TokenCodec::new(&config());
        let refresh = codec
            .issue(
                &identity(),
                Uuid::new_v4(),
                TokenClass::Refresh,
                codec.refresh_ttl(),
            )
            .unwrap();

        // A refresh token never validates where an access token is required:
        // the classes use distinct secrets, so this fails at the signature.
        assert!(matches!(
            codec.verify(&refresh, TokenClass::Access),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn test_class_check_when_secrets_are_shared() {
        // With a shared secret the signature validates either way; the
        // embedded class claim is the remaining line of defense.
        let mut cfg = config();
        cfg.refresh_secret = cfg.access_secret.clone();
        let codec = TokenCodec::new(&cfg);

        let refresh = codec
            .issue(
                &identity(),
                Uuid::new_v4(),
                TokenClass::Refresh,
                codec.refresh_ttl(),
            )
            .unwrap();

        assert!(matches!(
            codec.verify(&refresh, TokenClass::Access),
            Err(AuthError::WrongTokenClass {
                expected: TokenClass::Access
            })
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = TokenCodec::new(&config());
        let token = codec
            .issue(
                &identity(),
                Uuid::new_v4(),
                TokenClass::Access,
                Duration::seconds(-60),
            )
            .unwrap();

        assert!(matches!(
            codec.verify(&token, TokenClass::Access),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let codec = TokenCodec::new(&config());
        let mut token = codec
            .issue(
                &identity(),
                Uuid::new_v4(),
                TokenClass::Access,
                codec.access_ttl(),
            )
            .unwrap();
        token.push('x');

        assert!(matches!(
            codec.verify(&token, TokenClass::Access),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn test_decode_unverified() {
        let codec = TokenCodec::new(&config());
        let ident = identity();
        let sid = Uuid::new_v4();
        let token = codec
            .issue(&ident, sid, TokenClass::Access, codec.access_ttl())
            .unwrap();

        let claims = codec.decode_unverified(&token).unwrap();
        assert_eq!(claims.sid, sid);

        assert!(codec.decode_unverified("not-a-token").is_none());
    }

    #[test]
    fn test_fresh_jti_per_token() {
        let codec = TokenCodec::new(&config());
        let ident = identity();
        let sid = Uuid::new_v4();
        let a = codec
            .issue(&ident, sid, TokenClass::Access, codec.access_ttl())
            .unwrap();
        let b = codec
            .issue(&ident, sid, TokenClass::Access, codec.access_ttl())
            .unwrap();

        let ca = codec.verify(&a, TokenClass::Access).unwrap();
        let cb = codec.verify(&b, TokenClass::Access).unwrap();
        assert_ne!(ca.jti, cb.jti);
    }
}
