//! Access token issuing and verification
//!
//! # Token format
//!
//! ```text
//! base64url(claims_json) "." base64url(HMAC-SHA256(signing_secret, base64url(claims_json)))
//! ```
//!
//! - Claims carry `sub`, `username`, `role`, `iat` and `exp` (unix seconds)
//! - Tokens are valid for [`TOKEN_TTL_SECS`] after issue
//! - Signatures are compared in constant time
//!
//! # Pure Functions
//!
//! No HTTP framework dependencies here. The current time is passed in by the
//! caller so expiry can be tested deterministically.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Token validity window (one hour)
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Subject id of the single admin account
const ADMIN_SUBJECT: i64 = 1;
const ADMIN_ROLE: &str = "admin";

// ========================================
// Error Types
// ========================================

/// Token verification failures
#[derive(Debug, Clone, PartialEq)]
pub enum TokenError {
    /// Token is not `payload.signature` or the payload does not decode
    Malformed(String),

    /// Signature does not match the payload under this secret
    InvalidSignature,

    /// Token was valid but its window has passed
    Expired { exp: i64, now: i64 },
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed(reason) => write!(f, "Malformed token: {}", reason),
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::Expired { exp, now } => {
                write!(f, "Token expired {}s ago", now - exp)
            }
        }
    }
}

impl std::error::Error for TokenError {}

// ========================================
// Claims
// ========================================

/// Signed token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims for the admin account, issued at `now`
pub fn admin_claims(username: &str, now: i64) -> Claims {
    Claims {
        sub: ADMIN_SUBJECT,
        username: username.to_string(),
        role: ADMIN_ROLE.to_string(),
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    }
}

/// Compare a login attempt against the configured admin pair
///
/// Both fields are always compared so timing does not reveal which one failed.
pub fn check_admin_credentials(
    username: &str,
    password: &str,
    expected_username: &str,
    expected_password: &str,
) -> bool {
    let user_ok = username.as_bytes().ct_eq(expected_username.as_bytes());
    let pass_ok = password.as_bytes().ct_eq(expected_password.as_bytes());
    (user_ok & pass_ok).into()
}

// ========================================
// Signing and Verification
// ========================================

/// Sign claims into a bearer token
///
/// # Examples
///
/// ```
/// use bandsync_common::api::auth::{admin_claims, issue_token, verify_token};
///
/// let secret = "0123456789abcdef0123456789abcdef";
/// let claims = admin_claims("admin", 1_700_000_000);
/// let token = issue_token(&claims, secret).unwrap();
///
/// assert_eq!(verify_token(&token, secret, 1_700_000_060).unwrap(), claims);
/// ```
pub fn issue_token(claims: &Claims, signing_secret: &str) -> Result<String, TokenError> {
    let json = serde_json::to_vec(claims).map_err(|e| TokenError::Malformed(e.to_string()))?;
    let payload = URL_SAFE_NO_PAD.encode(json);

    let mut mac = keyed_mac(signing_secret)?;
    mac.update(payload.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", payload, signature))
}

/// Verify signature and expiry, returning the decoded claims
pub fn verify_token(token: &str, signing_secret: &str, now: i64) -> Result<Claims, TokenError> {
    let (payload, signature) = token
        .split_once('.')
        .ok_or_else(|| TokenError::Malformed("missing signature segment".to_string()))?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let mut mac = keyed_mac(signing_secret)?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::Malformed(format!("payload is not base64url: {}", e)))?;
    let claims: Claims = serde_json::from_slice(&json)
        .map_err(|e| TokenError::Malformed(format!("payload is not valid claims: {}", e)))?;

    if now >= claims.exp {
        return Err(TokenError::Expired { exp: claims.exp, now });
    }

    Ok(claims)
}

fn keyed_mac(signing_secret: &str) -> Result<HmacSha256, TokenError> {
    HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|e| TokenError::Malformed(format!("unusable signing key: {}", e)))
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";
    const NOW: i64 = 1_730_000_000;

    #[test]
    fn test_issued_token_verifies() {
        let claims = admin_claims("admin", NOW);
        let token = issue_token(&claims, SECRET).unwrap();

        let decoded = verify_token(&token, SECRET, NOW + 10).unwrap();
        assert_eq!(decoded.username, "admin");
        assert_eq!(decoded.role, "admin");
        assert_eq!(decoded.exp, NOW + TOKEN_TTL_SECS);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = issue_token(&admin_claims("admin", NOW), "another-secret-another-secret-xx").unwrap();

        assert_eq!(
            verify_token(&token, SECRET, NOW + 10),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token(&admin_claims("admin", NOW), SECRET).unwrap();

        // Last valid second
        assert!(verify_token(&token, SECRET, NOW + TOKEN_TTL_SECS - 1).is_ok());

        let err = verify_token(&token, SECRET, NOW + TOKEN_TTL_SECS).unwrap_err();
        assert!(matches!(err, TokenError::Expired { .. }));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = issue_token(&admin_claims("admin", NOW), SECRET).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = Claims {
            exp: NOW + 10 * TOKEN_TTL_SECS,
            ..admin_claims("admin", NOW)
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}", forged_payload, signature);

        assert_eq!(
            verify_token(&forged, SECRET, NOW + 10),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_token_malformed() {
        assert!(matches!(
            verify_token("not-a-token", SECRET, NOW),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_signature_segment_is_hmac_sha256_of_payload() {
        let token = issue_token(&admin_claims("admin", NOW), SECRET).unwrap();
        let (payload, signature) = token.split_once('.').unwrap();

        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        let expected = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        assert_eq!(signature, expected);
        assert_eq!(URL_SAFE_NO_PAD.decode(signature).unwrap().len(), 32);
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let token = issue_token(&admin_claims("admin", NOW), SECRET).unwrap();
        let truncated = &token[..token.len() - 4];

        assert_eq!(
            verify_token(truncated, SECRET, NOW + 10),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_admin_credentials_check() {
        assert!(check_admin_credentials("admin", "pw", "admin", "pw"));
        assert!(!check_admin_credentials("admin", "wrong", "admin", "pw"));
        assert!(!check_admin_credentials("root", "pw", "admin", "pw"));
        assert!(!check_admin_credentials("", "", "admin", "pw"));
    }
}
