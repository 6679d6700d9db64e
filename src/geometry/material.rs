//! Materials

use rmpv::Value;
use uuid::Uuid;

use crate::core::Result;
use crate::geometry::document::{
    Collection, ObjectDocument, Properties, map, merge_properties, set_field, uuid_value,
};
use crate::geometry::texture::Texture;

/// three.js `DoubleSide`
pub const DOUBLE_SIDE: u32 = 2;

/// Lighting model of a mesh material
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeshShading {
    Basic,
    #[default]
    Phong,
    Lambert,
    Toon,
}

impl MeshShading {
    pub fn type_name(self) -> &'static str {
        match self {
            MeshShading::Basic => "MeshBasicMaterial",
            MeshShading::Phong => "MeshPhongMaterial",
            MeshShading::Lambert => "MeshLambertMaterial",
            MeshShading::Toon => "MeshToonMaterial",
        }
    }
}

/// Surface material for meshes. Built with chained setters:
/// ```ignore
/// let red = MeshMaterial::phong().color(0xff0000).opacity(0.5);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MeshMaterial {
    pub shading: MeshShading,
    pub color: u32,
    pub reflectivity: f64,
    pub side: u32,
    /// `None` derives transparency from the opacity
    pub transparent: Option<bool>,
    pub opacity: f64,
    pub map: Option<Texture>,
    /// Extra fields, written over the ones above
    pub properties: Properties,
}

impl MeshMaterial {
    pub fn new(shading: MeshShading) -> Self {
        Self {
            shading,
            color: 0xffffff,
            reflectivity: 0.5,
            side: DOUBLE_SIDE,
            transparent: None,
            opacity: 1.0,
            map: None,
            properties: Properties::new(),
        }
    }

    pub fn basic() -> Self {
        Self::new(MeshShading::Basic)
    }

    pub fn phong() -> Self {
        Self::new(MeshShading::Phong)
    }

    pub fn lambert() -> Self {
        Self::new(MeshShading::Lambert)
    }

    pub fn toon() -> Self {
        Self::new(MeshShading::Toon)
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn reflectivity(mut self, reflectivity: f64) -> Self {
        self.reflectivity = reflectivity;
        self
    }

    pub fn side(mut self, side: u32) -> Self {
        self.side = side;
        self
    }

    pub fn transparent(mut self, transparent: bool) -> Self {
        self.transparent = Some(transparent);
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn map(mut self, texture: Texture) -> Self {
        self.map = Some(texture);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    fn is_transparent(&self) -> bool {
        self.transparent.unwrap_or(self.opacity != 1.0)
    }
}

impl Default for MeshMaterial {
    fn default() -> Self {
        Self::phong()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointsMaterial {
    pub size: f64,
    pub color: u32,
}

impl Default for PointsMaterial {
    fn default() -> Self {
        Self {
            size: 0.001,
            color: 0xffffff,
        }
    }
}

/// Material variants
#[derive(Clone, Debug, PartialEq)]
pub enum MaterialKind {
    Mesh(MeshMaterial),
    Points(PointsMaterial),
    /// Passed through as-is, except `map` which becomes a reference
    Generic {
        properties: Properties,
        map: Option<Texture>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    uuid: Uuid,
    kind: MaterialKind,
}

impl Material {
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
        }
    }

    pub fn points(size: f64, color: u32) -> Self {
        Self::new(MaterialKind::Points(PointsMaterial { size, color }))
    }

    pub fn generic(properties: Properties, map: Option<Texture>) -> Self {
        Self::new(MaterialKind::Generic { properties, map })
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn kind(&self) -> &MaterialKind {
        &self.kind
    }

    pub fn is_points(&self) -> bool {
        matches!(self.kind, MaterialKind::Points(_))
    }

    pub fn lower(&self, doc: &mut ObjectDocument) -> Result<Value> {
        let uuid = uuid_value(self.uuid);
        let value = match &self.kind {
            MaterialKind::Mesh(m) => {
                let mut value = map([
                    ("uuid", uuid),
                    ("type", Value::from(m.shading.type_name())),
                    ("color", Value::from(m.color)),
                    ("reflectivity", Value::from(m.reflectivity)),
                    ("side", Value::from(m.side)),
                    ("transparent", Value::from(m.is_transparent())),
                    ("opacity", Value::from(m.opacity)),
                ]);
                merge_properties(&mut value, &m.properties);
                if let (Some(texture), Value::Map(entries)) = (&m.map, &mut value) {
                    let texture_ref = texture.lower_in_object(doc)?;
                    set_field(entries, "map", uuid_value(texture_ref));
                }
                value
            }
            MaterialKind::Points(p) => map([
                ("uuid", uuid),
                ("type", Value::from("PointsMaterial")),
                ("color", Value::from(p.color)),
                ("size", Value::from(p.size)),
                ("vertexColors", Value::from(2)),
            ]),
            MaterialKind::Generic { properties, map: texture } => {
                let mut value = map([("uuid", uuid)]);
                merge_properties(&mut value, properties);
                if let (Some(texture), Value::Map(entries)) = (texture, &mut value) {
                    let texture_ref = texture.lower_in_object(doc)?;
                    set_field(entries, "map", uuid_value(texture_ref));
                }
                value
            }
        };
        Ok(value)
    }

    pub fn lower_in_object(&self, doc: &mut ObjectDocument) -> Result<Uuid> {
        doc.register(Collection::Materials, self.uuid, |doc| self.lower(doc))
    }
}

impl From<MeshMaterial> for Material {
    fn from(m: MeshMaterial) -> Self {
        Self::new(MaterialKind::Mesh(m))
    }
}

impl From<PointsMaterial> for Material {
    fn from(p: PointsMaterial) -> Self {
        Self::new(MaterialKind::Points(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::document::lookup;

    fn lowered(m: &Material) -> Value {
        m.lower(&mut ObjectDocument::new()).unwrap()
    }

    #[test]
    fn test_mesh_defaults() {
        let v = lowered(&MeshMaterial::phong().into());
        assert_eq!(lookup(&v, "type").and_then(Value::as_str), Some("MeshPhongMaterial"));
        assert_eq!(lookup(&v, "color").and_then(Value::as_u64), Some(0xffffff));
        assert_eq!(lookup(&v, "reflectivity").and_then(Value::as_f64), Some(0.5));
        assert_eq!(lookup(&v, "side").and_then(Value::as_u64), Some(2));
        assert_eq!(lookup(&v, "transparent").and_then(Value::as_bool), Some(false));
        assert!(lookup(&v, "map").is_none());
    }

    #[test]
    fn test_transparency_follows_opacity() {
        let v = lowered(&MeshMaterial::lambert().opacity(0.4).into());
        assert_eq!(lookup(&v, "transparent").and_then(Value::as_bool), Some(true));
        let v = lowered(&MeshMaterial::lambert().opacity(0.4).transparent(false).into());
        assert_eq!(lookup(&v, "transparent").and_then(Value::as_bool), Some(false));
    }

    #[test]
    fn test_extra_properties_override() {
        let m: Material = MeshMaterial::basic()
            .color(0x00ff00)
            .property("color", 0x0000ffu32)
            .property("needsUpdate", true)
            .into();
        let v = lowered(&m);
        assert_eq!(lookup(&v, "color").and_then(Value::as_u64), Some(0x0000ff));
        assert_eq!(lookup(&v, "needsUpdate").and_then(Value::as_bool), Some(true));
    }

    #[test]
    fn test_map_registered_as_texture() {
        let texture = Texture::text("label");
        let m: Material = MeshMaterial::toon().map(texture.clone()).into();
        let mut doc = ObjectDocument::new();
        let v = m.lower(&mut doc).unwrap();
        assert_eq!(
            lookup(&v, "map").and_then(Value::as_str),
            Some(texture.uuid().to_string().as_str())
        );
        assert_eq!(doc.collection(Collection::Textures).len(), 1);
    }

    #[test]
    fn test_points_material() {
        let m = Material::from(PointsMaterial::default());
        assert!(m.is_points());
        let v = lowered(&m);
        assert_eq!(lookup(&v, "size").and_then(Value::as_f64), Some(0.001));
        assert_eq!(lookup(&v, "vertexColors").and_then(Value::as_u64), Some(2));
    }

    #[test]
    fn test_generic_material_passthrough() {
        let m = Material::generic(
            vec![
                ("type".to_string(), Value::from("MeshStandardMaterial")),
                ("metalness".to_string(), Value::from(0.3)),
            ],
            None,
        );
        let v = lowered(&m);
        assert_eq!(lookup(&v, "type").and_then(Value::as_str), Some("MeshStandardMaterial"));
        assert_eq!(lookup(&v, "uuid").and_then(Value::as_str), Some(m.uuid().to_string().as_str()));
    }
}
