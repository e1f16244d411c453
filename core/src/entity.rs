//! Typed records.
//!
//! Stores persist a [`Record`]: a key plus a JSON object of properties. Domain types
//! implement [`Entity`] to convert to and from records; the key is part of the entity and
//! serialized alongside its other properties.

use crate::error::StoreError;
use crate::key::{Key, Version};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored record: key and JSON properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identity.
    pub key: Key,
    /// Property values as a JSON object.
    pub properties: Value,
}

impl Record {
    /// Create a record.
    #[must_use]
    pub const fn new(key: Key, properties: Value) -> Self {
        Self { key, properties }
    }
}

/// A record together with the version it was read at.
#[derive(Clone, Debug, PartialEq)]
pub struct VersionedRecord {
    /// The record.
    pub record: Record,
    /// Version of the stored record.
    pub version: Version,
}

/// A domain type persisted as a record.
///
/// # Examples
///
/// ```
/// use conference_central_core::entity::Entity;
/// use conference_central_core::key::Key;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Note {
///     key: Key,
///     text: String,
/// }
///
/// impl Entity for Note {
///     const KIND: &'static str = "Note";
///
///     fn key(&self) -> &Key {
///         &self.key
///     }
/// }
///
/// let note = Note { key: Key::new("Note", 1), text: "hello".into() };
/// let record = note.to_record().unwrap();
/// assert_eq!(record.properties["text"], "hello");
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Kind name of this entity's keys.
    const KIND: &'static str;

    /// The entity's key.
    fn key(&self) -> &Key;

    /// Convert into a storable record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SerializationError`] if the entity cannot be serialized.
    fn to_record(&self) -> Result<Record, StoreError> {
        let properties = serde_json::to_value(self)
            .map_err(|e| StoreError::SerializationError(format!("{}: {e}", Self::KIND)))?;
        Ok(Record::new(self.key().clone(), properties))
    }

    /// Rebuild the entity from a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SerializationError`] if the record has another kind or its
    /// properties do not deserialize into this type.
    fn from_record(record: Record) -> Result<Self, StoreError>
    where
        Self: Sized,
    {
        if record.key.kind() != Self::KIND {
            return Err(StoreError::SerializationError(format!(
                "expected {} record, found {}",
                Self::KIND,
                record.key.kind()
            )));
        }
        serde_json::from_value(record.properties)
            .map_err(|e| StoreError::SerializationError(format!("{}: {e}", Self::KIND)))
    }
}
