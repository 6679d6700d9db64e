//! Geometries

use std::path::Path;

use glam::{DMat4, DVec3, DVec4};
use rmpv::Value;
use uuid::Uuid;

use crate::core::Result;
use crate::geometry::buffer::{EXT_UINT8, NumericArray};
use crate::geometry::document::{Collection, ObjectDocument, map, uuid_value};

/// Mesh file formats the renderer can parse itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Dae,
    Stl,
}

impl MeshFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            MeshFormat::Obj => "obj",
            MeshFormat::Dae => "dae",
            MeshFormat::Stl => "stl",
        }
    }
}

/// Geometry variants
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryKind {
    Box {
        width: f64,
        height: f64,
        depth: f64,
    },
    Sphere {
        radius: f64,
    },
    /// Unit sphere stretched by its intrinsic transform
    Ellipsoid {
        radii: DVec3,
    },
    Plane {
        width: f64,
        height: f64,
        width_segments: u32,
        height_segments: u32,
    },
    /// Axis of symmetry along +y
    Cylinder {
        height: f64,
        radius_top: f64,
        radius_bottom: f64,
    },
    /// Opaque file contents: text for obj/dae, raw bytes for stl
    MeshFile {
        format: MeshFormat,
        contents: Vec<u8>,
    },
    Points {
        position: NumericArray,
        color: Option<NumericArray>,
    },
}

/// A geometry entity. Clones share the UUID.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    uuid: Uuid,
    kind: GeometryKind,
}

impl Geometry {
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
        }
    }

    pub fn box_geometry(lengths: [f64; 3]) -> Self {
        Self::new(GeometryKind::Box {
            width: lengths[0],
            height: lengths[1],
            depth: lengths[2],
        })
    }

    pub fn sphere(radius: f64) -> Self {
        Self::new(GeometryKind::Sphere { radius })
    }

    pub fn ellipsoid(radii: DVec3) -> Self {
        Self::new(GeometryKind::Ellipsoid { radii })
    }

    pub fn plane(width: f64, height: f64) -> Self {
        Self::plane_segmented(width, height, 1, 1)
    }

    pub fn plane_segmented(width: f64, height: f64, width_segments: u32, height_segments: u32) -> Self {
        Self::new(GeometryKind::Plane {
            width,
            height,
            width_segments,
            height_segments,
        })
    }

    pub fn cylinder(height: f64, radius: f64) -> Self {
        Self::cone(height, radius, radius)
    }

    /// Cylinder with different top and bottom radii.
    pub fn cone(height: f64, radius_top: f64, radius_bottom: f64) -> Self {
        Self::new(GeometryKind::Cylinder {
            height,
            radius_top,
            radius_bottom,
        })
    }

    pub fn mesh_file(format: MeshFormat, contents: impl Into<Vec<u8>>) -> Self {
        Self::new(GeometryKind::MeshFile {
            format,
            contents: contents.into(),
        })
    }

    pub fn obj(contents: impl Into<String>) -> Self {
        Self::mesh_file(MeshFormat::Obj, contents.into())
    }

    pub fn dae(contents: impl Into<String>) -> Self {
        Self::mesh_file(MeshFormat::Dae, contents.into())
    }

    pub fn stl(contents: impl Into<Vec<u8>>) -> Self {
        Self::mesh_file(MeshFormat::Stl, contents)
    }

    /// Read a mesh file from disk. Text formats must be valid UTF-8.
    pub fn from_file(format: MeshFormat, path: impl AsRef<Path>) -> Result<Self> {
        let contents = match format {
            MeshFormat::Stl => std::fs::read(path)?,
            MeshFormat::Obj | MeshFormat::Dae => std::fs::read_to_string(path)?.into_bytes(),
        };
        Ok(Self::mesh_file(format, contents))
    }

    pub fn points(position: NumericArray, color: Option<NumericArray>) -> Self {
        Self::new(GeometryKind::Points { position, color })
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn kind(&self) -> &GeometryKind {
        &self.kind
    }

    /// Transform applied by the owning object before its own.
    pub fn intrinsic_transform(&self) -> DMat4 {
        match &self.kind {
            GeometryKind::Ellipsoid { radii } => DMat4::from_diagonal(DVec4::new(radii.x, radii.y, radii.z, 1.0)),
            _ => DMat4::IDENTITY,
        }
    }

    pub fn lower(&self, _doc: &mut ObjectDocument) -> Result<Value> {
        let uuid = uuid_value(self.uuid);
        let value = match &self.kind {
            GeometryKind::Box { width, height, depth } => map([
                ("uuid", uuid),
                ("type", Value::from("BoxGeometry")),
                ("width", Value::from(*width)),
                ("height", Value::from(*height)),
                ("depth", Value::from(*depth)),
            ]),
            GeometryKind::Sphere { radius } => sphere_value(uuid, *radius),
            GeometryKind::Ellipsoid { .. } => sphere_value(uuid, 1.0),
            GeometryKind::Plane {
                width,
                height,
                width_segments,
                height_segments,
            } => map([
                ("uuid", uuid),
                ("type", Value::from("PlaneGeometry")),
                ("width", Value::from(*width)),
                ("height", Value::from(*height)),
                ("widthSegments", Value::from(*width_segments)),
                ("heightSegments", Value::from(*height_segments)),
            ]),
            GeometryKind::Cylinder {
                height,
                radius_top,
                radius_bottom,
            } => map([
                ("uuid", uuid),
                ("type", Value::from("CylinderGeometry")),
                ("radiusTop", Value::from(*radius_top)),
                ("radiusBottom", Value::from(*radius_bottom)),
                ("height", Value::from(*height)),
                ("radialSegments", Value::from(50)),
            ]),
            GeometryKind::MeshFile { format, contents } => {
                let data = match format {
                    MeshFormat::Stl => Value::Ext(EXT_UINT8, contents.clone()),
                    MeshFormat::Obj | MeshFormat::Dae => {
                        Value::from(String::from_utf8_lossy(contents).into_owned())
                    }
                };
                map([
                    ("type", Value::from("_meshfile")),
                    ("uuid", uuid),
                    ("format", Value::from(format.as_str())),
                    ("data", data),
                ])
            }
            GeometryKind::Points { position, color } => {
                let mut attributes = vec![(Value::from("position"), position.lower()?)];
                if let Some(color) = color {
                    attributes.push((Value::from("color"), color.lower()?));
                }
                map([
                    ("uuid", uuid),
                    ("type", Value::from("BufferGeometry")),
                    ("data", map([("attributes", Value::Map(attributes))])),
                ])
            }
        };
        Ok(value)
    }

    pub fn lower_in_object(&self, doc: &mut ObjectDocument) -> Result<Uuid> {
        doc.register(Collection::Geometries, self.uuid, |doc| self.lower(doc))
    }
}

fn sphere_value(uuid: Value, radius: f64) -> Value {
    map([
        ("uuid", uuid),
        ("type", Value::from("SphereGeometry")),
        ("radius", Value::from(radius)),
        ("widthSegments", Value::from(20)),
        ("heightSegments", Value::from(20)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use crate::geometry::buffer::NumericData;
    use crate::geometry::document::lookup;
    use glam::Vec3;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lowered(g: &Geometry) -> Value {
        g.lower(&mut ObjectDocument::new()).unwrap()
    }

    fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
        lookup(v, key).and_then(Value::as_str)
    }

    #[test]
    fn test_box_fields() {
        let g = Geometry::box_geometry([0.1, 0.2, 0.3]);
        let v = lowered(&g);
        assert_eq!(str_field(&v, "type"), Some("BoxGeometry"));
        assert_eq!(lookup(&v, "depth").and_then(Value::as_f64), Some(0.3));
        assert_eq!(str_field(&v, "uuid"), Some(g.uuid().to_string().as_str()));
    }

    #[test]
    fn test_ellipsoid_is_scaled_unit_sphere() {
        let g = Geometry::ellipsoid(DVec3::new(1.0, 2.0, 3.0));
        let v = lowered(&g);
        assert_eq!(str_field(&v, "type"), Some("SphereGeometry"));
        assert_eq!(lookup(&v, "radius").and_then(Value::as_f64), Some(1.0));
        let m = g.intrinsic_transform();
        assert_eq!(m.x_axis.x, 1.0);
        assert_eq!(m.y_axis.y, 2.0);
        assert_eq!(m.z_axis.z, 3.0);
        assert_eq!(m.w_axis.w, 1.0);
        assert_eq!(Geometry::sphere(1.0).intrinsic_transform(), DMat4::IDENTITY);
    }

    #[test]
    fn test_plane_and_cylinder_defaults() {
        let v = lowered(&Geometry::plane(10.0, 5.0));
        assert_eq!(lookup(&v, "widthSegments").and_then(Value::as_u64), Some(1));
        let v = lowered(&Geometry::cylinder(2.0, 0.5));
        assert_eq!(lookup(&v, "radialSegments").and_then(Value::as_u64), Some(50));
        assert_eq!(lookup(&v, "radiusTop").and_then(Value::as_f64), Some(0.5));
        assert_eq!(lookup(&v, "radiusBottom").and_then(Value::as_f64), Some(0.5));
    }

    #[test]
    fn test_mesh_file_payloads() {
        let v = lowered(&Geometry::obj("v 0 0 0\n"));
        assert_eq!(str_field(&v, "type"), Some("_meshfile"));
        assert_eq!(str_field(&v, "format"), Some("obj"));
        assert_eq!(str_field(&v, "data"), Some("v 0 0 0\n"));

        let v = lowered(&Geometry::stl(vec![0u8, 1, 2]));
        assert_eq!(
            lookup(&v, "data").and_then(Value::as_ext),
            Some((EXT_UINT8, &[0u8, 1, 2][..]))
        );
    }

    #[test]
    fn test_stl_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"solid x").unwrap();
        let g = Geometry::from_file(MeshFormat::Stl, file.path()).unwrap();
        assert!(matches!(
            g.kind(),
            GeometryKind::MeshFile { format: MeshFormat::Stl, contents } if contents == b"solid x"
        ));
        assert!(matches!(
            Geometry::from_file(MeshFormat::Obj, file.path().with_extension("missing")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_points_attributes() {
        let position = NumericArray::from_points(&[Vec3::ZERO, Vec3::ONE]);
        let g = Geometry::points(position.clone(), None);
        let v = lowered(&g);
        let attrs = lookup(&v, "data").and_then(|d| lookup(d, "attributes")).unwrap();
        assert!(lookup(attrs, "position").is_some());
        assert!(lookup(attrs, "color").is_none());

        let g = Geometry::points(position, Some(NumericArray::from_vec(NumericData::I64(vec![1]))));
        assert!(matches!(
            g.lower(&mut ObjectDocument::new()),
            Err(Error::UnsupportedDtype(_))
        ));
    }

    #[test]
    fn test_lowering_is_idempotent() {
        let g = Geometry::sphere(0.5);
        assert_eq!(lowered(&g), lowered(&g));
        assert_eq!(g.clone().uuid(), g.uuid());
    }
}
