//! Shared object document
//!
//! Lowering an object pulls every referenced geometry, material, texture and
//! image into flat top-level collections keyed by UUID. [`ObjectDocument`]
//! holds those collections while an object (or several) is lowered and makes
//! sure each UUID is emitted once.

use std::collections::HashSet;

use glam::DMat4;
use rmpv::Value;
use uuid::Uuid;

use crate::core::Result;

/// Free-form extra fields merged into a lowered entity.
pub type Properties = Vec<(String, Value)>;

/// three.js object format version written into the metadata header.
pub const FORMAT_VERSION: f64 = 4.5;

/// Top-level collection an entity is flattened into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Geometries,
    Materials,
    Textures,
    Images,
}

impl Collection {
    pub fn field(self) -> &'static str {
        match self {
            Collection::Geometries => "geometries",
            Collection::Materials => "materials",
            Collection::Textures => "textures",
            Collection::Images => "images",
        }
    }
}

/// Collections being filled while lowering objects.
#[derive(Debug, Default)]
pub struct ObjectDocument {
    geometries: Vec<Value>,
    materials: Vec<Value>,
    textures: Vec<Value>,
    images: Vec<Value>,
    emitted: HashSet<Uuid>,
}

impl ObjectDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `uuid` already has a body in this document.
    pub fn contains(&self, uuid: Uuid) -> bool {
        self.emitted.contains(&uuid)
    }

    pub fn collection(&self, collection: Collection) -> &[Value] {
        match collection {
            Collection::Geometries => &self.geometries,
            Collection::Materials => &self.materials,
            Collection::Textures => &self.textures,
            Collection::Images => &self.images,
        }
    }

    fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Value> {
        match collection {
            Collection::Geometries => &mut self.geometries,
            Collection::Materials => &mut self.materials,
            Collection::Textures => &mut self.textures,
            Collection::Images => &mut self.images,
        }
    }

    /// Register the body produced by `lower` under `uuid`, unless it is
    /// already present. Returns the UUID to use as the reference value.
    pub fn register(
        &mut self,
        collection: Collection,
        uuid: Uuid,
        lower: impl FnOnce(&mut Self) -> Result<Value>,
    ) -> Result<Uuid> {
        if self.contains(uuid) {
            return Ok(uuid);
        }
        let body = lower(self)?;
        self.emitted.insert(uuid);
        self.collection_mut(collection).push(body);
        Ok(uuid)
    }

    /// Assemble the final document around an `object` record.
    pub fn finish(self, object: Value) -> Value {
        let mut entries = vec![
            (
                Value::from("metadata"),
                map([
                    ("version", Value::from(FORMAT_VERSION)),
                    ("type", Value::from("Object")),
                ]),
            ),
            (Value::from("geometries"), Value::Array(self.geometries)),
            (Value::from("materials"), Value::Array(self.materials)),
        ];
        if !self.textures.is_empty() {
            entries.push((Value::from("textures"), Value::Array(self.textures)));
        }
        if !self.images.is_empty() {
            entries.push((Value::from("images"), Value::Array(self.images)));
        }
        entries.push((Value::from("object"), object));
        Value::Map(entries)
    }
}

/// Build a map value from string keys.
pub fn map<I>(entries: I) -> Value
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (Value::from(k), v))
            .collect(),
    )
}

/// Insert or overwrite `key` in a map's entries.
pub fn set_field(entries: &mut Vec<(Value, Value)>, key: &str, value: Value) {
    match entries.iter_mut().find(|(k, _)| k.as_str() == Some(key)) {
        Some((_, existing)) => *existing = value,
        None => entries.push((Value::from(key), value)),
    }
}

/// Merge extra properties over a map value. Non-map values are left alone.
pub fn merge_properties(value: &mut Value, properties: &Properties) {
    if let Value::Map(entries) = value {
        for (key, v) in properties {
            set_field(entries, key, v.clone());
        }
    }
}

/// Look up a string key in a map value.
pub fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .as_map()?
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

pub fn uuid_value(uuid: Uuid) -> Value {
    Value::from(uuid.to_string())
}

/// 16 numbers in column-major order, the renderer's matrix layout.
pub fn matrix_value(matrix: &DMat4) -> Value {
    Value::Array(matrix.to_cols_array().iter().map(|&x| Value::from(x)).collect())
}
