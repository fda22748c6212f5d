//! Identifies which platform sent a request from its headers.
//!
//! Several signals can be present on one request at the same time. A GitLab
//! delivery carries both `X-Gitlab-Event` and a `User-Agent`, for example. The
//! resolver therefore evaluates an *ordered* chain of [`ResolverRule`]s and the
//! first rule that produces an identifier wins. New platforms are added as new
//! rules at the right priority; existing rules are not replaced.

use crate::Headers;

/// One partial recognizer in the resolver chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverRule {
    /// The mere presence of `header` identifies the platform.
    HeaderPresent {
        /// Marker header name.
        header: String,
        /// Registry identifier to return.
        identifier: String,
    },
    /// `header` is present and its value contains `needle`.
    HeaderContains {
        /// Header to inspect.
        header: String,
        /// Substring that must appear in the value.
        needle: String,
        /// Registry identifier to return.
        identifier: String,
    },
    /// Product-token convention: the value of `header` up to the first `/`,
    /// or the whole value if it has no `/`.
    ProductToken {
        /// Header carrying the product token (usually `User-Agent`).
        header: String,
    },
}

impl ResolverRule {
    /// Applies this rule to `headers`.
    pub fn apply(&self, headers: &Headers) -> Option<String> {
        match self {
            Self::HeaderPresent { header, identifier } => {
                headers.contains(header).then(|| identifier.clone())
            }
            Self::HeaderContains {
                header,
                needle,
                identifier,
            } => headers
                .get(header)
                .filter(|value| value.contains(needle.as_str()))
                .map(|_| identifier.clone()),
            Self::ProductToken { header } => headers.get(header).map(|value| {
                match value.split_once('/') {
                    Some((product, _)) => product.to_string(),
                    None => value.to_string(),
                }
            }),
        }
    }
}

/// Ordered chain of [`ResolverRule`]s; first match wins.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    rules: Vec<ResolverRule>,
}

impl SourceResolver {
    /// Creates a resolver evaluating `rules` in order.
    pub fn new(rules: Vec<ResolverRule>) -> Self {
        Self { rules }
    }

    /// The chain matching [`crate::SourceRegistry::builtin`]:
    ///
    /// 1. `X-Gitlab-Event` present → `Gitlab`
    /// 2. `Ce-Type` containing `tekton` → `Tekton`
    /// 3. `User-Agent` product token
    pub fn standard() -> Self {
        Self::new(vec![
            ResolverRule::HeaderPresent {
                header: "X-Gitlab-Event".to_string(),
                identifier: "Gitlab".to_string(),
            },
            ResolverRule::HeaderContains {
                header: "Ce-Type".to_string(),
                needle: "tekton".to_string(),
                identifier: "Tekton".to_string(),
            },
            ResolverRule::ProductToken {
                header: "User-Agent".to_string(),
            },
        ])
    }

    /// Returns the registry identifier for the platform that sent `headers`,
    /// or `None` when no rule matches.
    pub fn resolve(&self, headers: &Headers) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.apply(headers))
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::standard()
    }
}
