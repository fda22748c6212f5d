//! Identifier newtypes.
//!
//! Source ids, message ids, project ids and secret names are all strings on
//! the wire; each gets its own type so a [`MessageId`] cannot be handed to an
//! API expecting a [`SourceId`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a non-empty string newtype with `new`, `as_str`, `AsRef<str>`
/// and a transparent `Display`.
macro_rules! string_id {
    ($(#[$meta:meta])* $ident:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $ident(String);

        impl $ident {
            /// Wraps `value`; `None` when it is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                Some(value.into()).filter(|s| !s.is_empty()).map(Self)
            }

            /// Borrows the underlying string.
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl AsRef<str> for $ident {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Stable identifier of a registered event source (e.g. `"github"`).
    ///
    /// Written verbatim into [`crate::NormalizedRecord::source`].
    SourceId
}

string_id! {
    /// Identifier of one delivered message.
    ///
    /// Taken from the push envelope's `message_id`, or generated by the
    /// listener for direct webhook deliveries.
    MessageId
}

impl MessageId {
    /// Generates a random message id for deliveries that carry none.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

string_id! {
    /// Cloud project that owns the secret store and analytics dataset.
    ProjectId
}

string_id! {
    /// Name of a secret in the secret store (e.g. `"event-handler"`).
    SecretName
}

/// Which version of a secret to read.
///
/// HMAC strategies always read [`SecretVersion::Latest`] so that rotation needs
/// no redeploy. The static-token strategy pins a numbered version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretVersion {
    /// The newest enabled version.
    Latest,
    /// A specific numbered version.
    Pinned(u32),
}

impl std::fmt::Display for SecretVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Pinned(n) => write!(f, "{n}"),
        }
    }
}
