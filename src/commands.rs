//! Scene commands
//!
//! Each command lowers to a `{type, path, ...}` document that the viewer
//! executes. On the control channel it travels as three frames: the bridge
//! tag, the target path and the msgpack-encoded document.

use std::sync::Arc;

use glam::DMat4;
use rmpv::Value;
use scenecast_bridge::{CommandKind, ControlRequest, Path};

use crate::animation::Animation;
use crate::core::{Error, Result};
use crate::geometry::document::{Collection, ObjectDocument, map, matrix_value};
use crate::geometry::{Geometry, Material, MeshMaterial, Object, Texture};

/// What to place at a path: a ready-made object, or a geometry to be paired
/// with a material.
#[derive(Clone, Debug)]
pub enum ObjectSource {
    Object(Object),
    Geometry(Geometry),
}

impl From<Object> for ObjectSource {
    fn from(o: Object) -> Self {
        ObjectSource::Object(o)
    }
}

impl From<Geometry> for ObjectSource {
    fn from(g: Geometry) -> Self {
        ObjectSource::Geometry(g)
    }
}

fn object_and_material_error() -> Error {
    Error::Usage("supply either an object, or a geometry and a material".to_string())
}

#[derive(Clone, Debug)]
pub struct SetObject {
    pub object: Object,
    pub path: Path,
}

impl SetObject {
    /// A geometry without a material gets a fresh Phong material. A points
    /// material makes a points object, anything else a mesh.
    pub fn new(source: impl Into<ObjectSource>, material: Option<Material>, path: Path) -> Result<Self> {
        let object = match (source.into(), material) {
            (ObjectSource::Object(_), Some(_)) => return Err(object_and_material_error()),
            (ObjectSource::Object(object), None) => object,
            (ObjectSource::Geometry(geometry), material) => {
                let material = material.unwrap_or_else(|| MeshMaterial::phong().into());
                if material.is_points() {
                    Object::points(geometry, material)
                } else {
                    Object::mesh(geometry, material)
                }
            }
        };
        Ok(Self { object, path })
    }

    pub fn lower(&self) -> Result<Value> {
        Ok(map([
            ("type", Value::from("set_object")),
            ("path", Value::from(self.path.lower())),
            ("object", self.object.lower()?),
        ]))
    }
}

/// Text drawn onto a mesh.
#[derive(Clone, Debug)]
pub struct SetText {
    pub object: Object,
    pub texture: Texture,
    pub path: Path,
}

impl SetText {
    /// Without a target, the text goes on a transparent 10×5 plane.
    pub fn new(
        texture: Texture,
        target: Option<ObjectSource>,
        material: Option<Material>,
        path: Path,
    ) -> Result<Self> {
        let textured = || {
            MeshMaterial::phong()
                .map(texture.clone())
                .property("needsUpdate", true)
        };
        let object = match (target, material) {
            (Some(ObjectSource::Object(_)), Some(_)) => return Err(object_and_material_error()),
            (Some(ObjectSource::Object(object)), None) => object,
            (None, _) => Object::mesh(Geometry::plane(10.0, 5.0), textured().transparent(true)),
            (Some(ObjectSource::Geometry(_)), Some(m)) if m.is_points() => {
                return Err(Error::Usage(
                    "cannot write text onto points; supply a mesh material".to_string(),
                ));
            }
            (Some(ObjectSource::Geometry(geometry)), Some(m)) => Object::mesh(geometry, m),
            (Some(ObjectSource::Geometry(geometry)), None) => Object::mesh(geometry, textured()),
        };
        Ok(Self { object, texture, path })
    }

    pub fn lower(&self) -> Result<Value> {
        let mut doc = ObjectDocument::new();
        self.texture.lower_in_object(&mut doc)?;
        Ok(map([
            ("type", Value::from("set_text")),
            ("path", Value::from(self.path.lower())),
            ("object", self.object.lower()?),
            ("textures", Value::Array(doc.collection(Collection::Textures).to_vec())),
        ]))
    }
}

#[derive(Clone, Debug)]
pub struct SetTransform {
    pub matrix: DMat4,
    pub path: Path,
}

impl SetTransform {
    pub fn new(matrix: DMat4, path: Path) -> Self {
        Self { matrix, path }
    }

    pub fn lower(&self) -> Value {
        map([
            ("type", Value::from("set_transform")),
            ("path", Value::from(self.path.lower())),
            ("matrix", matrix_value(&self.matrix)),
        ])
    }
}

#[derive(Clone, Debug)]
pub struct SetProperty {
    pub property: String,
    pub value: Value,
    pub path: Path,
}

impl SetProperty {
    pub fn new(property: impl Into<String>, value: impl Into<Value>, path: Path) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            path,
        }
    }

    pub fn lower(&self) -> Value {
        map([
            ("type", Value::from("set_property")),
            ("path", Value::from(self.path.lower())),
            ("property", Value::from(self.property.as_str())),
            ("value", self.value.clone()),
        ])
    }
}

/// Animations carry their own paths, so the command targets the root.
#[derive(Clone, Debug)]
pub struct SetAnimation {
    pub animation: Animation,
    pub play: bool,
    pub repetitions: u32,
}

impl SetAnimation {
    pub fn new(animation: Animation, play: bool, repetitions: u32) -> Self {
        Self {
            animation,
            play,
            repetitions,
        }
    }

    pub fn lower(&self) -> Value {
        map([
            ("type", Value::from("set_animation")),
            ("path", Value::from(Path::root().lower())),
            ("animations", self.animation.lower()),
            (
                "options",
                map([
                    ("play", Value::from(self.play)),
                    ("repetitions", Value::from(self.repetitions)),
                ]),
            ),
        ])
    }
}

#[derive(Clone, Debug)]
pub struct Delete {
    pub path: Path,
}

impl Delete {
    pub fn new(path: Path) -> Self {
        Self { path }
    }

    pub fn lower(&self) -> Value {
        map([
            ("type", Value::from("delete")),
            ("path", Value::from(self.path.lower())),
        ])
    }
}

#[derive(Clone, Debug)]
pub enum Command {
    SetObject(SetObject),
    SetText(SetText),
    SetTransform(SetTransform),
    SetProperty(SetProperty),
    SetAnimation(SetAnimation),
    Delete(Delete),
}

impl Command {
    /// Bridge tag. Text is stored like any other object write.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::SetObject(_) | Command::SetText(_) => CommandKind::SetObject,
            Command::SetTransform(_) => CommandKind::SetTransform,
            Command::SetProperty(_) => CommandKind::SetProperty,
            Command::SetAnimation(_) => CommandKind::SetAnimation,
            Command::Delete(_) => CommandKind::Delete,
        }
    }

    pub fn path(&self) -> Path {
        match self {
            Command::SetObject(c) => c.path.clone(),
            Command::SetText(c) => c.path.clone(),
            Command::SetTransform(c) => c.path.clone(),
            Command::SetProperty(c) => c.path.clone(),
            Command::SetAnimation(_) => Path::root(),
            Command::Delete(c) => c.path.clone(),
        }
    }

    pub fn lower(&self) -> Result<Value> {
        match self {
            Command::SetObject(c) => c.lower(),
            Command::SetText(c) => c.lower(),
            Command::SetTransform(c) => Ok(c.lower()),
            Command::SetProperty(c) => Ok(c.lower()),
            Command::SetAnimation(c) => Ok(c.lower()),
            Command::Delete(c) => Ok(c.lower()),
        }
    }

    /// msgpack bytes of the lowered document.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let value = self.lower()?;
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &value)?;
        Ok(buf)
    }

    pub fn to_request(&self) -> Result<ControlRequest> {
        let data: Arc<[u8]> = self.encode()?.into();
        Ok(ControlRequest::Command {
            kind: self.kind(),
            path: self.path(),
            data,
        })
    }
}

macro_rules! impl_from_command {
    ($($variant:ident),*) => {
        $(impl From<$variant> for Command {
            fn from(c: $variant) -> Self {
                Command::$variant(c)
            }
        })*
    };
}

impl_from_command!(SetObject, SetText, SetTransform, SetProperty, SetAnimation, Delete);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PointsMaterial;
    use crate::geometry::document::lookup;
    use glam::DVec3;

    fn path() -> Path {
        Path::parse("/meshcat/box")
    }

    fn object_record(v: &Value) -> &Value {
        lookup(v, "object").and_then(|o| lookup(o, "object")).unwrap()
    }

    #[test]
    fn test_set_object_default_material_per_call() {
        let geometry = Geometry::box_geometry([1.0, 1.0, 1.0]);
        let a = SetObject::new(geometry.clone(), None, path()).unwrap();
        let b = SetObject::new(geometry, None, path()).unwrap();
        assert_ne!(a.object.material.uuid(), b.object.material.uuid());

        let v = a.lower().unwrap();
        assert_eq!(lookup(&v, "type").and_then(Value::as_str), Some("set_object"));
        assert_eq!(lookup(&v, "path").and_then(Value::as_str), Some("/meshcat/box"));
        let materials = lookup(&v, "object").and_then(|o| lookup(o, "materials")).unwrap();
        let first = &materials.as_array().unwrap()[0];
        assert_eq!(lookup(first, "type").and_then(Value::as_str), Some("MeshPhongMaterial"));
    }

    #[test]
    fn test_set_object_points_material() {
        let cmd = SetObject::new(
            Geometry::sphere(1.0),
            Some(PointsMaterial::default().into()),
            path(),
        )
        .unwrap();
        let v = cmd.lower().unwrap();
        assert_eq!(lookup(object_record(&v), "type").and_then(Value::as_str), Some("Points"));
    }

    #[test]
    fn test_object_plus_material_is_usage_error() {
        let object = Object::mesh(Geometry::sphere(1.0), MeshMaterial::phong());
        let err = SetObject::new(object, Some(MeshMaterial::basic().into()), path()).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn test_set_text_default_plane() {
        let cmd = SetText::new(Texture::text("hello"), None, None, path()).unwrap();
        let v = cmd.lower().unwrap();
        assert_eq!(lookup(&v, "type").and_then(Value::as_str), Some("set_text"));
        let textures = lookup(&v, "textures").and_then(Value::as_array).unwrap();
        assert_eq!(textures.len(), 1);
        let geometry = &lookup(&v, "object")
            .and_then(|o| lookup(o, "geometries"))
            .and_then(Value::as_array)
            .unwrap()[0];
        assert_eq!(lookup(geometry, "height").and_then(Value::as_f64), Some(5.0));
        assert_eq!(Command::from(cmd).kind(), CommandKind::SetObject);
    }

    #[test]
    fn test_set_text_on_points_rejected() {
        let err = SetText::new(
            Texture::text("x"),
            Some(Geometry::sphere(1.0).into()),
            Some(PointsMaterial::default().into()),
            path(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn test_set_transform_matrix() {
        let m = DMat4::from_translation(DVec3::new(1.0, 0.0, 0.0));
        let v = SetTransform::new(m, path()).lower();
        let flat: Vec<f64> = lookup(&v, "matrix")
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .filter_map(Value::as_f64)
            .collect();
        assert_eq!(flat.len(), 16);
        assert_eq!(flat[12], 1.0);
    }

    #[test]
    fn test_set_animation_options() {
        let cmd = Command::from(SetAnimation::new(Animation::default(), false, 3));
        assert!(cmd.path().is_root());
        let v = cmd.lower().unwrap();
        let options = lookup(&v, "options").unwrap();
        assert_eq!(lookup(options, "play").and_then(Value::as_bool), Some(false));
        assert_eq!(lookup(options, "repetitions").and_then(Value::as_u64), Some(3));
    }

    #[test]
    fn test_request_frames() {
        let cmd = Command::from(Delete::new(path()));
        let request = cmd.to_request().unwrap();
        let frames = request.to_frames();
        assert_eq!(frames[0], b"delete");
        assert_eq!(frames[1], b"/meshcat/box");

        let decoded = rmpv::decode::read_value(&mut frames[2].as_slice()).unwrap();
        assert_eq!(lookup(&decoded, "type").and_then(Value::as_str), Some("delete"));

        let parsed = ControlRequest::parse(frames).unwrap();
        assert!(matches!(parsed, ControlRequest::Command { kind: CommandKind::Delete, .. }));
    }

    #[test]
    fn test_set_property_encodes() {
        let cmd = Command::from(SetProperty::new("visible", false, path()));
        let bytes = cmd.encode().unwrap();
        let decoded = rmpv::decode::read_value(&mut bytes.as_slice()).unwrap();
        assert_eq!(lookup(&decoded, "property").and_then(Value::as_str), Some("visible"));
        assert_eq!(lookup(&decoded, "value").and_then(Value::as_bool), Some(false));
    }
}
