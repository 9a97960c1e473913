use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, info};
use uuid::Uuid;

use agora_types::api::SessionClaims;
use agora_types::models::UserIdentity;

use crate::error::{AppError, AuthError};

/// Name of the cookie that carries the session token.
pub const SESSION_COOKIE: &str = "session";

/// Absolute session lifetime, counted from login.
pub const SESSION_LIFETIME_DAYS: i64 = 7;

/// Issues and checks signed session tokens.
///
/// The token itself carries the username and expiry, so there is no session
/// table. The only server-side state is the set of token ids ended early by
/// logout, rename or account deletion, each kept until its natural expiry.
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
    /// jti -> exp
    revoked: Mutex<HashMap<String, i64>>,
}

impl SessionManager {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime: Duration::days(SESSION_LIFETIME_DAYS),
            revoked: Mutex::new(HashMap::new()),
        }
    }

    /// Start a session for `identity`, expiring `SESSION_LIFETIME_DAYS` from now.
    pub fn login(&self, identity: &UserIdentity) -> Result<String, AppError> {
        let now = Utc::now();
        let token = self.issue(&identity.id, &identity.username, now, now + self.lifetime)?;
        info!("Session started for {}", identity.username);
        Ok(token)
    }

    /// Token-level check: signature, expiry and revocation. Requests also
    /// resolve the account behind `uid`, see `middleware::current_session`.
    pub fn require_authenticated(&self, token: Option<&str>) -> Result<SessionClaims, AuthError> {
        let token = token.ok_or(AuthError::Unauthenticated)?;

        let claims = decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                debug!("Rejected session token: {}", e);
                AuthError::Unauthenticated
            })?
            .claims;

        if self.is_revoked(&claims.jti) {
            return Err(AuthError::Unauthenticated);
        }
        Ok(claims)
    }

    /// End the session behind `token`. Unknown or already-invalid tokens are
    /// ignored.
    pub fn logout(&self, token: &str) {
        if let Ok(claims) = self.require_authenticated(Some(token)) {
            self.revoke(&claims);
            info!("Session ended for {}", claims.sub);
        }
    }

    pub fn revoke(&self, claims: &SessionClaims) {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.lock().unwrap_or_else(|e| e.into_inner());
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.jti.clone(), claims.exp);
    }

    /// Swap the session in `claims` for one naming `new_username`. The account
    /// id carries over, the old token stops working and the new one keeps the
    /// original expiry.
    pub fn reissue(&self, claims: &SessionClaims, new_username: &str) -> Result<String, AppError> {
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| anyhow::anyhow!("session expiry out of range: {}", claims.exp))?;
        let token = self.issue(&claims.uid, new_username, Utc::now(), expires_at)?;
        self.revoke(claims);
        Ok(token)
    }

    fn issue(
        &self,
        user_id: &str,
        username: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = SessionClaims {
            uid: user_id.to_string(),
            sub: username.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(anyhow::Error::from)?;
        Ok(token)
    }

    fn is_revoked(&self, jti: &str) -> bool {
        self.revoked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(jti)
    }
}
