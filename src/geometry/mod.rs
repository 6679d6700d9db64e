//! Scene entities and their lowering to the viewer's object format

pub mod buffer;
pub mod document;
pub mod material;
pub mod object;
pub mod shape;
pub mod texture;

pub use buffer::{NumericArray, NumericData};
pub use document::{ObjectDocument, Properties};
pub use material::{Material, MaterialKind, MeshMaterial, MeshShading, PointsMaterial};
pub use object::{Object, ObjectKind, point_cloud, scene_text};
pub use shape::{Geometry, GeometryKind, MeshFormat};
pub use texture::{Image, Texture, TextureKind};
