//! Data objects and datasets.
//!
//! An [`Object`] is an opaque record: a caller-assigned identifier, an
//! optional class label, and a payload of raw bytes. How the payload is laid
//! out is a contract between the caller and the [`Space`](crate::space::Space)
//! that measures distances over it; the index machinery never looks inside.

use crate::error::{IndexError, Result};

/// An immutable data object: identifier, optional label, opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    id: u32,
    label: i32,
    payload: Vec<u8>,
}

impl Object {
    /// Create an object. A negative `label` means "no label".
    pub fn new(id: u32, label: i32, payload: Vec<u8>) -> Self {
        Self { id, label, payload }
    }

    /// Caller-assigned identifier, unique within a dataset.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Class label; negative when missing.
    #[inline]
    pub fn label(&self) -> i32 {
        self.label
    }

    /// Raw payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// A pair of (distance, dataset position), used while partitioning objects
/// around a pivot during tree construction.
pub type DistObjectPair = (f32, u32);

/// An ordered, owned collection of objects.
///
/// Indices take a dataset by value and hold it for their lifetime; query
/// results refer back to objects by their [`Object::id`].
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    objects: Vec<Object>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from a list of objects, rejecting duplicate ids.
    pub fn from_objects(objects: Vec<Object>) -> Result<Self> {
        let mut seen = std::collections::HashSet::with_capacity(objects.len());
        for obj in &objects {
            if !seen.insert(obj.id()) {
                return Err(IndexError::InvalidConfiguration(format!(
                    "duplicate object id {}",
                    obj.id()
                )));
            }
        }
        Ok(Self { objects })
    }

    /// Append an object. The caller is responsible for id uniqueness.
    pub fn push(&mut self, obj: Object) {
        self.objects.push(obj);
    }

    /// Number of objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the dataset holds no objects.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Object at a dataset position (insertion order).
    #[inline]
    pub fn get(&self, pos: usize) -> &Object {
        &self.objects[pos]
    }

    /// Iterate over objects in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Object> {
        self.objects.iter()
    }

    /// Remove and return the object at `pos`, shifting later objects down.
    pub(crate) fn remove(&mut self, pos: usize) -> Object {
        self.objects.remove(pos)
    }
}

impl FromIterator<Object> for Dataset {
    fn from_iter<I: IntoIterator<Item = Object>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}
