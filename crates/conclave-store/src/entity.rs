use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Address of a stored entity: its kind plus an id unique within that kind.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub kind: String,
    pub id: String,
}

impl EntityKey {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Debug for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityKey({}/{})", self.kind, self.id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// A domain type that can be persisted in an [`EntityStore`].
///
/// [`EntityStore`]: crate::traits::EntityStore
pub trait Entity: Serialize + DeserializeOwned {
    /// Kind name under which entities of this type are stored.
    const KIND: &'static str;

    /// Id of this entity, unique within [`Self::KIND`].
    fn id(&self) -> String;

    /// Parent entity used for ancestor queries, if any.
    fn parent(&self) -> Option<EntityKey> {
        None
    }

    fn key(&self) -> EntityKey {
        EntityKey::new(Self::KIND, self.id())
    }

    /// Key of the entity of this kind with the given id.
    fn key_for(id: impl fmt::Display) -> EntityKey
    where
        Self: Sized,
    {
        EntityKey::new(Self::KIND, id.to_string())
    }
}

/// An entity as the store holds it: key, optional parent, version, and the
/// JSON document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    pub key: EntityKey,
    pub parent: Option<EntityKey>,
    /// Assigned by the store; `0` means "never written".
    pub version: u64,
    pub data: Value,
}

impl StoredEntity {
    /// Serialize a typed entity into its stored form.
    pub fn encode<E: Entity>(entity: &E) -> StoreResult<Self> {
        Ok(Self {
            key: entity.key(),
            parent: entity.parent(),
            version: 0,
            data: serde_json::to_value(entity)?,
        })
    }

    /// Deserialize the document back into `E`, checking the kind.
    pub fn decode<E: Entity>(&self) -> StoreResult<E> {
        if self.key.kind != E::KIND {
            return Err(StoreError::KindMismatch {
                key: self.key.clone(),
                expected: E::KIND.to_string(),
            });
        }
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// Top-level field of the document, used by query evaluation.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}
