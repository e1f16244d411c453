//! Record identification and versioning types.
//!
//! A [`Key`] is a path of `(kind, id)` elements. The parent of a key is its path minus
//! the last element, which is how ownership is expressed: a `Conference` lives under the
//! organizer's `Profile`, a `Session` under its `Conference`.
//!
//! Keys cross process boundaries as opaque URL-safe strings. The string form is the
//! base64url encoding (no padding) of the JSON path, so it is stable and can be compared
//! for equality without decoding.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for key decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The string is not valid base64url.
    #[error("Invalid key encoding: {0}")]
    Encoding(String),

    /// The decoded payload is not a key path.
    #[error("Malformed key: {0}")]
    Malformed(String),
}

/// The identifier part of a path element: an allocated integer or a string name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyId {
    /// Store-allocated numeric id.
    Id(i64),
    /// Application-chosen name (for example a user id).
    Name(String),
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<i64> for KeyId {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
struct PathElement {
    kind: String,
    id: KeyId,
}

/// Identity of a stored record.
///
/// # Examples
///
/// ```
/// use conference_central_core::key::Key;
///
/// let profile = Key::new("Profile", "alice");
/// let conference = profile.child("Conference", 17);
///
/// assert_eq!(conference.kind(), "Conference");
/// assert_eq!(conference.parent(), Some(profile.clone()));
/// assert!(profile.is_ancestor_of(&conference));
///
/// let encoded = conference.to_urlsafe();
/// let decoded: Key = encoded.parse().unwrap();
/// assert_eq!(decoded, conference);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key {
    path: SmallVec<[PathElement; 3]>,
}

impl Key {
    /// Create a root key (no parent).
    #[must_use]
    pub fn new(kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        let mut path = SmallVec::new();
        path.push(PathElement {
            kind: kind.into(),
            id: id.into(),
        });
        Self { path }
    }

    /// Create a key whose parent is `self`.
    #[must_use]
    pub fn child(&self, kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        let mut path = self.path.clone();
        path.push(PathElement {
            kind: kind.into(),
            id: id.into(),
        });
        Self { path }
    }

    /// Kind of the record this key identifies.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.last().kind
    }

    /// Identifier of the last path element.
    #[must_use]
    pub fn id(&self) -> &KeyId {
        &self.last().id
    }

    /// The parent key, if this key is not a root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.path.len() < 2 {
            return None;
        }
        let mut path = self.path.clone();
        path.pop();
        Some(Self { path })
    }

    /// Whether `self` is `other` or one of its ancestors.
    ///
    /// Ancestor-scoped queries include the ancestor itself, so this is reflexive.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.path.len() >= self.path.len() && other.path[..self.path.len()] == self.path[..]
    }

    /// Every key on the path from the root down to (and including) `self`.
    #[must_use]
    pub fn lineage(&self) -> Vec<Self> {
        (1..=self.path.len())
            .map(|len| Self {
                path: self.path[..len].iter().cloned().collect(),
            })
            .collect()
    }

    /// Encode the key as an opaque URL-safe string.
    #[must_use]
    pub fn to_urlsafe(&self) -> String {
        // Serializing a vector of plain structs cannot fail.
        let json = serde_json::to_vec(&self.path).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a key produced by [`Key::to_urlsafe`].
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] if the string is not base64url or does not decode to a
    /// non-empty key path.
    pub fn from_urlsafe(encoded: &str) -> Result<Self, KeyError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| KeyError::Encoding(e.to_string()))?;
        let path: SmallVec<[PathElement; 3]> =
            serde_json::from_slice(&bytes).map_err(|e| KeyError::Malformed(e.to_string()))?;

        if path.is_empty() {
            return Err(KeyError::Malformed("empty key path".to_string()));
        }
        if path.iter().any(|element| element.kind.is_empty()) {
            return Err(KeyError::Malformed("empty kind in key path".to_string()));
        }
        Ok(Self { path })
    }

    // Every constructor guarantees a non-empty path.
    fn last(&self) -> &PathElement {
        &self.path[self.path.len() - 1]
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_urlsafe())
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_urlsafe(s)
    }
}

impl TryFrom<String> for Key {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_urlsafe(&value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_urlsafe()
    }
}

/// Record version for optimistic concurrency control.
///
/// A record's first committed write has version 1; every later write increments it.
/// Transactions remember the version they read and fail to commit if it changed.
///
/// # Examples
///
/// ```
/// use conference_central_core::key::Version;
///
/// let v1 = Version::FIRST;
/// assert_eq!(v1.next(), Version::new(2));
/// assert_eq!(Version::new(5).value(), 5);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Version of a freshly inserted record.
    pub const FIRST: Self = Self(1);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn child_and_parent() {
        let profile = Key::new("Profile", "alice");
        let conference = profile.child("Conference", 7);
        let session = conference.child("Session", 12);

        assert_eq!(session.parent(), Some(conference.clone()));
        assert_eq!(conference.parent(), Some(profile.clone()));
        assert_eq!(profile.parent(), None);
        assert_eq!(session.id(), &KeyId::Id(12));
        assert_eq!(profile.id(), &KeyId::Name("alice".to_string()));
    }

    #[test]
    fn ancestry_is_reflexive_and_prefix_based() {
        let profile = Key::new("Profile", "alice");
        let conference = profile.child("Conference", 7);
        let other = Key::new("Profile", "bob").child("Conference", 7);

        assert!(profile.is_ancestor_of(&conference));
        assert!(conference.is_ancestor_of(&conference));
        assert!(!conference.is_ancestor_of(&profile));
        assert!(!profile.is_ancestor_of(&other));
    }

    #[test]
    fn lineage_runs_root_first() {
        let session = Key::new("Profile", "alice")
            .child("Conference", 7)
            .child("Session", 1);
        let lineage = session.lineage();

        assert_eq!(lineage.len(), 3);
        assert_eq!(lineage[0], Key::new("Profile", "alice"));
        assert_eq!(lineage[2], session);
    }

    #[test]
    fn urlsafe_is_stable_and_decodable() {
        let key = Key::new("Profile", "alice@example.com").child("Conference", 42);
        let encoded = key.to_urlsafe();

        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('='));
        assert_eq!(encoded, key.to_urlsafe());
        assert_eq!(Key::from_urlsafe(&encoded).unwrap(), key);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Key::from_urlsafe("not base64!"),
            Err(KeyError::Encoding(_))
        ));
        let not_a_path = URL_SAFE_NO_PAD.encode(b"{\"hello\":1}");
        assert!(matches!(
            Key::from_urlsafe(&not_a_path),
            Err(KeyError::Malformed(_))
        ));
        let empty = URL_SAFE_NO_PAD.encode(b"[]");
        assert!(matches!(Key::from_urlsafe(&empty), Err(KeyError::Malformed(_))));
    }

    #[test]
    fn serde_uses_urlsafe_string() {
        let key = Key::new("Profile", "alice");
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json, serde_json::Value::String(key.to_urlsafe()));

        let back: Key = serde_json::from_value(json).unwrap();
        assert_eq!(back, key);
    }
}
