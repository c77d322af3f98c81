// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque identifier newtypes.
//!
//! Match, team, and template identifiers are minted by the Control Plane and
//! container/network identifiers by the sandbox runtime; the engine treats
//! all of them as opaque strings and only composes service identifiers from
//! their parts.

/// Returns a string slice truncated to at most `n` characters.
///
/// Truncation lands on a char boundary, so identifiers carrying multi-byte
/// characters shorten cleanly instead of panicking.
pub fn short(s: &str, n: usize) -> &str {
    s.char_indices().nth(n).map_or(s, |(i, _)| &s[..i])
}

/// Define a newtype ID wrapper around `String` for an externally-minted
/// identifier.
///
/// Generates `new()`, `as_str()`, `is_empty()`, `Display`, `From<&str>`,
/// `From<String>`, `PartialEq<str>`, `Borrow<str>`, and `Deref`.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }
    };
}

crate::define_id! {
    /// External match identifier minted by the Control Plane.
    pub struct MatchId;
}

crate::define_id! {
    /// Team identifier; `teamA`/`teamB` in the legacy unprovisioned path.
    pub struct TeamId;
}

crate::define_id! {
    /// Service template identifier from the Control Plane collection.
    pub struct TemplateId;
}

crate::define_id! {
    /// Composite service identifier: `<teamId>_<templateId>`.
    pub struct ServiceId;
}

crate::define_id! {
    /// Container identifier assigned by the sandbox runtime.
    pub struct ContainerId;
}

crate::define_id! {
    /// Network identifier assigned by the sandbox runtime.
    pub struct NetworkId;
}

impl ServiceId {
    /// Compose the canonical service identifier for a team's instance of a
    /// template.
    pub fn compose(team: &TeamId, template: &TemplateId) -> Self {
        Self::new(format!("{}_{}", team, template))
    }

    /// Whether this service is owned by `team` (identifier prefix rule).
    pub fn owned_by(&self, team: &TeamId) -> bool {
        self.as_str()
            .strip_prefix(team.as_str())
            .is_some_and(|rest| rest.starts_with('_'))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
