//! Registered event sources and their verification strategies.
//!
//! The registry is a fixed table built once at startup. It maps the
//! identifier a platform embeds in its requests (a `User-Agent` product
//! token, or the identifier a [`crate::ResolverRule`] assigns to a marker
//! header) to the [`EventSource`] describing how to verify that platform.
//!
//! Adding a platform is a table edit in [`SourceRegistry::builtin`] plus,
//! when it has no usable product token, a new resolver rule.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{RegistryError, SourceId};

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How a source proves that it sent a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStrategy {
    /// `sha1=<hex HMAC-SHA1 of the body>`, keyed with the latest secret.
    HmacSha1,
    /// `<hex HMAC-SHA256 of the body>`, keyed with the latest secret.
    HmacSha256,
    /// The header carries the shared secret itself (pinned version).
    StaticToken,
}

impl std::fmt::Display for VerificationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::HmacSha1 => "HMAC-SHA1",
            Self::HmacSha256 => "HMAC-SHA256",
            Self::StaticToken => "static token",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// A platform allowed to deliver events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSource {
    /// Stable id written into every record from this source.
    pub id: SourceId,
    /// Human-readable platform name used in logs.
    pub display_name: String,
    /// Header carrying the signature or token.
    pub signature_header: String,
    /// Fixed verification strategy for this source.
    pub strategy: VerificationStrategy,
}

impl EventSource {
    /// Creates a source entry.
    pub fn new(
        id: SourceId,
        display_name: impl Into<String>,
        signature_header: impl Into<String>,
        strategy: VerificationStrategy,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            signature_header: signature_header.into(),
            strategy,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable identifier → [`EventSource`] table.
///
/// Lookups are plain map reads, so a shared registry needs no synchronisation.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    entries: HashMap<String, EventSource>,
}

impl SourceRegistry {
    /// Builds a registry from `(identifier, source)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateIdentifier`] if two entries share an
    /// identifier.
    pub fn new(
        entries: impl IntoIterator<Item = (String, EventSource)>,
    ) -> Result<Self, RegistryError> {
        let mut map = HashMap::new();
        for (identifier, source) in entries {
            if map.contains_key(&identifier) {
                return Err(RegistryError::DuplicateIdentifier { identifier });
            }
            map.insert(identifier, source);
        }
        Ok(Self { entries: map })
    }

    /// The platforms this relay accepts out of the box.
    pub fn builtin() -> Self {
        let table = [
            ("GitHub-Hookshot", "github", "GitHub", "X-Hub-Signature", VerificationStrategy::HmacSha1),
            ("Gitlab", "gitlab", "GitLab", "X-Gitlab-Token", VerificationStrategy::StaticToken),
            ("Tekton", "tekton", "Tekton", "tekton-secret", VerificationStrategy::StaticToken),
            (
                "golang-incident-bot",
                "incident-bot",
                "Incident bot",
                "X-Incident-Signature",
                VerificationStrategy::HmacSha256,
            ),
            (
                "drone-deployment",
                "drone-deployment",
                "Drone deployment",
                "X-Deployment-Signature",
                VerificationStrategy::HmacSha256,
            ),
        ];

        let entries = table
            .into_iter()
            .filter_map(|(identifier, id, display_name, header, strategy)| {
                let id = SourceId::new(id)?;
                Some((
                    identifier.to_string(),
                    EventSource::new(id, display_name, header, strategy),
                ))
            })
            .collect();

        Self { entries }
    }

    /// Returns the source registered under `identifier`, if any.
    pub fn lookup(&self, identifier: &str) -> Option<&EventSource> {
        self.entries.get(identifier)
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no sources are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_sources_resolve_to_their_entries() {
        let registry = SourceRegistry::builtin();

        let expected = [
            ("GitHub-Hookshot", "github", "X-Hub-Signature", VerificationStrategy::HmacSha1),
            ("Gitlab", "gitlab", "X-Gitlab-Token", VerificationStrategy::StaticToken),
            ("Tekton", "tekton", "tekton-secret", VerificationStrategy::StaticToken),
            ("golang-incident-bot", "incident-bot", "X-Incident-Signature", VerificationStrategy::HmacSha256),
            ("drone-deployment", "drone-deployment", "X-Deployment-Signature", VerificationStrategy::HmacSha256),
        ];

        assert_eq!(registry.len(), expected.len());
        for (identifier, id, header, strategy) in expected {
            let source = registry.lookup(identifier).unwrap();
            assert_eq!(source.id.as_str(), id);
            assert_eq!(source.signature_header, header);
            assert_eq!(source.strategy, strategy);
        }
    }

    #[test]
    fn unregistered_identifiers_yield_none() {
        let registry = SourceRegistry::builtin();

        assert!(registry.lookup("curl").is_none());
        assert!(registry.lookup("").is_none());
        // Identifiers are exact: no case folding, no prefix matching.
        assert!(registry.lookup("github-hookshot").is_none());
        assert!(registry.lookup("GitHub").is_none());
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let source = EventSource::new(
            SourceId::new("custom").unwrap(),
            "Custom",
            "X-Custom-Signature",
            VerificationStrategy::HmacSha256,
        );

        let err = SourceRegistry::new([
            ("custom-bot".to_string(), source.clone()),
            ("custom-bot".to_string(), source),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            RegistryError::DuplicateIdentifier {
                identifier: "custom-bot".to_string()
            }
        );
    }
}
