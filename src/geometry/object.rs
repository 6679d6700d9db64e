//! Renderable objects
//!
//! An object pairs a geometry with a material. Lowering it produces a
//! complete three.js object document with every referenced resource inlined.

use rmpv::Value;
use uuid::Uuid;

use crate::core::Result;
use crate::geometry::buffer::NumericArray;
use crate::geometry::document::{ObjectDocument, map, matrix_value, uuid_value};
use crate::geometry::material::{Material, MeshMaterial, PointsMaterial};
use crate::geometry::shape::Geometry;
use crate::geometry::texture::Texture;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ObjectKind {
    #[default]
    Mesh,
    Points,
    Line,
    LineSegments,
    LineLoop,
}

impl ObjectKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ObjectKind::Mesh => "Mesh",
            ObjectKind::Points => "Points",
            ObjectKind::Line => "Line",
            ObjectKind::LineSegments => "LineSegments",
            ObjectKind::LineLoop => "LineLoop",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    uuid: Uuid,
    pub kind: ObjectKind,
    pub geometry: Geometry,
    pub material: Material,
}

impl Object {
    pub fn new(kind: ObjectKind, geometry: Geometry, material: Material) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
            geometry,
            material,
        }
    }

    pub fn mesh(geometry: Geometry, material: impl Into<Material>) -> Self {
        Self::new(ObjectKind::Mesh, geometry, material.into())
    }

    pub fn points(geometry: Geometry, material: impl Into<Material>) -> Self {
        Self::new(ObjectKind::Points, geometry, material.into())
    }

    pub fn line(geometry: Geometry, material: impl Into<Material>) -> Self {
        Self::new(ObjectKind::Line, geometry, material.into())
    }

    pub fn line_segments(geometry: Geometry, material: impl Into<Material>) -> Self {
        Self::new(ObjectKind::LineSegments, geometry, material.into())
    }

    pub fn line_loop(geometry: Geometry, material: impl Into<Material>) -> Self {
        Self::new(ObjectKind::LineLoop, geometry, material.into())
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Write the geometry and material into `doc` and return the object
    /// record that references them.
    pub fn lower_into(&self, doc: &mut ObjectDocument) -> Result<Value> {
        let geometry = self.geometry.lower_in_object(doc)?;
        let material = self.material.lower_in_object(doc)?;
        Ok(map([
            ("uuid", uuid_value(self.uuid)),
            ("type", Value::from(self.kind.type_name())),
            ("geometry", uuid_value(geometry)),
            ("material", uuid_value(material)),
            ("matrix", matrix_value(&self.geometry.intrinsic_transform())),
        ]))
    }

    /// Self-contained object document.
    pub fn lower(&self) -> Result<Value> {
        let mut doc = ObjectDocument::new();
        let object = self.lower_into(&mut doc)?;
        Ok(doc.finish(object))
    }
}

/// Colored points, one per column of `position`.
pub fn point_cloud(position: NumericArray, color: Option<NumericArray>, material: PointsMaterial) -> Object {
    Object::points(Geometry::points(position, color), material)
}

/// Text drawn onto a plane. The plane defaults to 10×10.
pub fn scene_text(text: impl Into<String>, size: Option<(f64, f64)>) -> Object {
    let (width, height) = size.unwrap_or((10.0, 10.0));
    Object::mesh(
        Geometry::plane(width, height),
        MeshMaterial::phong()
            .map(Texture::text(text))
            .transparent(true)
            .property("needsUpdate", true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::document::{Collection, lookup};
    use glam::{DVec3, Vec3};

    fn keys(v: &Value) -> Vec<&str> {
        v.as_map().unwrap().iter().filter_map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn test_box_document() {
        let object = Object::mesh(Geometry::box_geometry([1.0, 1.0, 1.0]), MeshMaterial::phong());
        let doc = object.lower().unwrap();
        assert_eq!(keys(&doc), vec!["metadata", "geometries", "materials", "object"]);

        let record = lookup(&doc, "object").unwrap();
        assert_eq!(lookup(record, "type").and_then(Value::as_str), Some("Mesh"));
        assert_eq!(
            lookup(record, "geometry").and_then(Value::as_str),
            Some(object.geometry.uuid().to_string().as_str())
        );
        let matrix = lookup(record, "matrix").and_then(Value::as_array).unwrap();
        assert_eq!(matrix.len(), 16);
        assert_eq!(matrix[0].as_f64(), Some(1.0));
        assert_eq!(matrix[1].as_f64(), Some(0.0));
    }

    #[test]
    fn test_ellipsoid_matrix() {
        let object = Object::mesh(Geometry::ellipsoid(DVec3::new(1.0, 2.0, 3.0)), MeshMaterial::phong());
        let doc = object.lower().unwrap();
        let matrix = lookup(&doc, "object")
            .and_then(|o| lookup(o, "matrix"))
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(matrix[5].as_f64(), Some(2.0));
        assert_eq!(matrix[10].as_f64(), Some(3.0));
    }

    #[test]
    fn test_shared_material_emitted_once() {
        let material: Material = MeshMaterial::basic().color(0xff0000).into();
        let a = Object::mesh(Geometry::sphere(1.0), material.clone());
        let b = Object::mesh(Geometry::sphere(2.0), material.clone());

        let mut doc = ObjectDocument::new();
        let ra = a.lower_into(&mut doc).unwrap();
        let rb = b.lower_into(&mut doc).unwrap();
        assert_eq!(doc.collection(Collection::Materials).len(), 1);
        assert_eq!(doc.collection(Collection::Geometries).len(), 2);
        assert_eq!(lookup(&ra, "material"), lookup(&rb, "material"));
    }

    #[test]
    fn test_scene_text_has_textures() {
        let doc = scene_text("hi", None).lower().unwrap();
        assert_eq!(
            keys(&doc),
            vec!["metadata", "geometries", "materials", "textures", "object"]
        );
        let material = &lookup(&doc, "materials").and_then(Value::as_array).unwrap()[0];
        assert_eq!(lookup(material, "transparent").and_then(Value::as_bool), Some(true));
        assert_eq!(lookup(material, "needsUpdate").and_then(Value::as_bool), Some(true));
    }

    #[test]
    fn test_point_cloud() {
        let position = NumericArray::from_points(&[Vec3::X, Vec3::Y]);
        let object = point_cloud(position.clone(), Some(position), PointsMaterial::default());
        let doc = object.lower().unwrap();
        let record = lookup(&doc, "object").unwrap();
        assert_eq!(lookup(record, "type").and_then(Value::as_str), Some("Points"));
        let material = &lookup(&doc, "materials").and_then(Value::as_array).unwrap()[0];
        assert_eq!(lookup(material, "type").and_then(Value::as_str), Some("PointsMaterial"));
    }

    #[test]
    fn test_lowering_is_repeatable() {
        let object = scene_text("same", Some((2.0, 1.0)));
        assert_eq!(object.lower().unwrap(), object.lower().unwrap());
    }
}
