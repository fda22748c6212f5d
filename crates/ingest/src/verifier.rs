//! Signature and token verification.
//!
//! Each [`VerificationStrategy`] is a pure predicate over the presented
//! credential, the raw body, and a secret fetched fresh from the
//! [`SecretStore`]. A wrong credential is `Ok(false)`. Errors are structural:
//! an empty credential, reported before any secret lookup, or a key the MAC
//! refuses.
//!
//! | Strategy | Secret version | Expected credential |
//! |----------|----------------|---------------------|
//! | `HmacSha1` | `latest` | `sha1=` + hex HMAC-SHA1(secret, body) |
//! | `HmacSha256` | `latest` | hex HMAC-SHA256(secret, body) |
//! | `StaticToken` | `1` (pinned) | the secret as UTF-8 text |
//!
//! All comparisons are constant-time in the credential contents.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::{
    Secret, SecretName, SecretStore, SecretVersion, VerificationError, VerificationStrategy,
};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

const SHA1_PREFIX: &str = "sha1=";

/// Version the static-token strategy reads. It is pinned because that secret
/// is rotated by hand, unlike the HMAC keys.
pub const STATIC_TOKEN_VERSION: SecretVersion = SecretVersion::Pinned(1);

impl VerificationStrategy {
    /// The secret version this strategy reads.
    pub fn secret_version(self) -> SecretVersion {
        match self {
            Self::HmacSha1 | Self::HmacSha256 => SecretVersion::Latest,
            Self::StaticToken => STATIC_TOKEN_VERSION,
        }
    }

    /// Checks `credential` against `body` using the secret `secret_name`.
    ///
    /// Secret-store failures are logged and yield `Ok(false)`: a request is
    /// never accepted without a secret to check it against.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::EmptyCredential`] if `credential` is
    /// empty. No secret is fetched in that case. Returns
    /// [`VerificationError::InvalidKey`] if the fetched secret cannot key
    /// the MAC.
    pub async fn verify(
        self,
        credential: &str,
        body: &[u8],
        secrets: &dyn SecretStore,
        secret_name: &SecretName,
    ) -> Result<bool, VerificationError> {
        if credential.is_empty() {
            return Err(VerificationError::EmptyCredential { strategy: self });
        }

        if self == Self::HmacSha1 && !credential.starts_with(SHA1_PREFIX) {
            debug!(strategy = %self, "Credential lacks sha1= prefix");
            return Ok(false);
        }

        let version = self.secret_version();
        let secret = match secrets.fetch_secret(secret_name, version).await {
            Ok(secret) => secret,
            Err(e) => {
                warn!(
                    strategy = %self,
                    secret = %secret_name,
                    version = %version,
                    error = %e,
                    "Secret unavailable; treating event as unverified"
                );
                return Ok(false);
            }
        };

        self.check(credential, body, &secret)
    }

    /// Compares `credential` with the value expected for `body` under
    /// `secret`.
    fn check(
        self,
        credential: &str,
        body: &[u8],
        secret: &Secret,
    ) -> Result<bool, VerificationError> {
        let matched = match self {
            Self::HmacSha1 => {
                let expected = format!("{SHA1_PREFIX}{}", hmac_sha1_hex(secret.as_bytes(), body)?);
                constant_time_eq(credential.as_bytes(), expected.as_bytes())
            }
            Self::HmacSha256 => {
                let expected = hmac_sha256_hex(secret.as_bytes(), body)?;
                constant_time_eq(credential.as_bytes(), expected.as_bytes())
            }
            Self::StaticToken => match secret.as_text() {
                Some(token) => constant_time_eq(credential.as_bytes(), token.as_bytes()),
                None => {
                    warn!(strategy = %self, "Pinned token secret is not valid UTF-8");
                    false
                }
            },
        };
        Ok(matched)
    }
}

/// Lowercase hex HMAC-SHA1 of `body` keyed with `key`.
///
/// # Errors
///
/// Returns [`VerificationError::InvalidKey`] if the MAC rejects `key`.
pub fn hmac_sha1_hex(key: &[u8], body: &[u8]) -> Result<String, VerificationError> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|_| VerificationError::InvalidKey {
        strategy: VerificationStrategy::HmacSha1,
    })?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Lowercase hex HMAC-SHA256 of `body` keyed with `key`.
///
/// # Errors
///
/// Returns [`VerificationError::InvalidKey`] if the MAC rejects `key`.
pub fn hmac_sha256_hex(key: &[u8], body: &[u8]) -> Result<String, VerificationError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| VerificationError::InvalidKey {
        strategy: VerificationStrategy::HmacSha256,
    })?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time byte comparison.
///
/// Returns `false` immediately when lengths differ; digest and token lengths
/// are not secret.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
