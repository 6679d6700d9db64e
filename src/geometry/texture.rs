//! Textures and images

use std::path::Path;

use base64::Engine;
use image::ImageEncoder;
use rmpv::Value;
use uuid::Uuid;

use crate::core::{Error, Result};
use crate::geometry::document::{
    Collection, ObjectDocument, Properties, map, merge_properties, set_field, uuid_value,
};

/// three.js `RepeatWrapping`
pub const REPEAT_WRAPPING: u32 = 1000;
/// three.js `ClampToEdgeWrapping`
pub const CLAMP_TO_EDGE_WRAPPING: u32 = 1001;

/// PNG-encoded image, sent inline as a data URL.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    uuid: Uuid,
    png: Vec<u8>,
}

impl Image {
    pub fn png(data: impl Into<Vec<u8>>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            png: data.into(),
        }
    }

    pub fn png_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::png(std::fs::read(path)?))
    }

    /// Encode raw RGBA8 pixels as PNG.
    pub fn from_rgba8(width: u32, height: u32, pixels: &[u8]) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(Error::ShapeMismatch {
                shape: vec![height as usize, width as usize, 4],
                expected,
                got: pixels.len(),
            });
        }

        let mut png_data = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut png_data);
        encoder.write_image(pixels, width, height, image::ExtendedColorType::Rgba8)?;
        Ok(Self::png(png_data))
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn data(&self) -> &[u8] {
        &self.png
    }

    pub fn lower(&self, _doc: &mut ObjectDocument) -> Result<Value> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.png);
        Ok(map([
            ("uuid", uuid_value(self.uuid)),
            ("url", Value::from(format!("data:image/png;base64,{encoded}"))),
        ]))
    }

    pub fn lower_in_object(&self, doc: &mut ObjectDocument) -> Result<Uuid> {
        doc.register(Collection::Images, self.uuid, |doc| self.lower(doc))
    }
}

/// Texture variants
#[derive(Clone, Debug, PartialEq)]
pub enum TextureKind {
    /// Text rendered to a canvas by the viewer
    Text {
        text: String,
        font_size: u32,
        font_face: String,
    },
    Image {
        image: Image,
        wrap: [u32; 2],
        repeat: [f64; 2],
        properties: Properties,
    },
    /// Passed through as-is, except `image` which becomes a reference
    Generic {
        properties: Properties,
        image: Option<Image>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    uuid: Uuid,
    kind: TextureKind,
}

impl Texture {
    pub fn new(kind: TextureKind) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::text_with_font(text, 100, "sans-serif")
    }

    pub fn text_with_font(text: impl Into<String>, font_size: u32, font_face: impl Into<String>) -> Self {
        Self::new(TextureKind::Text {
            text: text.into(),
            font_size,
            font_face: font_face.into(),
        })
    }

    pub fn image(image: Image) -> Self {
        Self::new(TextureKind::Image {
            image,
            wrap: [CLAMP_TO_EDGE_WRAPPING; 2],
            repeat: [1.0, 1.0],
            properties: Properties::new(),
        })
    }

    /// Image texture tiled `repeat` times in each direction.
    pub fn repeating_image(image: Image, repeat: [f64; 2]) -> Self {
        Self::new(TextureKind::Image {
            image,
            wrap: [REPEAT_WRAPPING; 2],
            repeat,
            properties: Properties::new(),
        })
    }

    pub fn generic(properties: Properties, image: Option<Image>) -> Self {
        Self::new(TextureKind::Generic { properties, image })
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn kind(&self) -> &TextureKind {
        &self.kind
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, TextureKind::Text { .. })
    }

    pub fn lower(&self, doc: &mut ObjectDocument) -> Result<Value> {
        let uuid = uuid_value(self.uuid);
        let value = match &self.kind {
            TextureKind::Text {
                text,
                font_size,
                font_face,
            } => map([
                ("uuid", uuid),
                ("type", Value::from("_text")),
                ("text", Value::from(text.as_str())),
                ("font_size", Value::from(*font_size)),
                ("font_face", Value::from(font_face.as_str())),
            ]),
            TextureKind::Image {
                image,
                wrap,
                repeat,
                properties,
            } => {
                let image_ref = image.lower_in_object(doc)?;
                let mut value = map([
                    ("uuid", uuid),
                    ("wrap", Value::Array(wrap.iter().map(|&w| Value::from(w)).collect())),
                    ("repeat", Value::Array(repeat.iter().map(|&r| Value::from(r)).collect())),
                    ("image", uuid_value(image_ref)),
                ]);
                merge_properties(&mut value, properties);
                value
            }
            TextureKind::Generic { properties, image } => {
                let mut value = map([("uuid", uuid)]);
                merge_properties(&mut value, properties);
                if let (Some(image), Value::Map(entries)) = (image, &mut value) {
                    let image_ref = image.lower_in_object(doc)?;
                    set_field(entries, "image", uuid_value(image_ref));
                }
                value
            }
        };
        Ok(value)
    }

    pub fn lower_in_object(&self, doc: &mut ObjectDocument) -> Result<Uuid> {
        doc.register(Collection::Textures, self.uuid, |doc| self.lower(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::document::lookup;
    use tempfile::TempDir;

    #[test]
    fn test_image_data_url() {
        let image = Image::png(vec![1u8, 2, 3]);
        let v = image.lower(&mut ObjectDocument::new()).unwrap();
        assert_eq!(
            lookup(&v, "url").and_then(Value::as_str),
            Some("data:image/png;base64,AQID")
        );
    }

    #[test]
    fn test_from_rgba8_encodes_png() {
        let pixels = vec![255u8; 2 * 2 * 4];
        let image = Image::from_rgba8(2, 2, &pixels).unwrap();
        assert_eq!(&image.data()[..8], b"\x89PNG\r\n\x1a\n");

        let err = Image::from_rgba8(2, 2, &pixels[..7]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 16, got: 7, .. }));
    }

    #[test]
    fn test_png_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tile.png");
        std::fs::write(&path, b"not really png").unwrap();
        let image = Image::png_from_file(&path).unwrap();
        assert_eq!(image.data(), b"not really png");
        assert!(Image::png_from_file(dir.path().join("absent.png")).is_err());
    }

    #[test]
    fn test_text_texture_defaults() {
        let t = Texture::text("hello");
        let v = t.lower(&mut ObjectDocument::new()).unwrap();
        assert_eq!(lookup(&v, "type").and_then(Value::as_str), Some("_text"));
        assert_eq!(lookup(&v, "font_size").and_then(Value::as_u64), Some(100));
        assert_eq!(lookup(&v, "font_face").and_then(Value::as_str), Some("sans-serif"));
    }

    #[test]
    fn test_image_texture_references_image() {
        let image = Image::png(vec![0u8]);
        let t = Texture::image(image.clone());
        let mut doc = ObjectDocument::new();
        let v = t.lower(&mut doc).unwrap();
        assert_eq!(
            lookup(&v, "image").and_then(Value::as_str),
            Some(image.uuid().to_string().as_str())
        );
        let wrap = lookup(&v, "wrap").and_then(Value::as_array).unwrap();
        assert_eq!(wrap[0].as_u64(), Some(1001));
        assert_eq!(doc.collection(Collection::Images).len(), 1);
    }

    #[test]
    fn test_generic_texture_resolves_image() {
        let image = Image::png(vec![0u8]);
        let t = Texture::generic(
            vec![("image".to_string(), Value::from("placeholder")), ("flipY".to_string(), Value::from(false))],
            Some(image.clone()),
        );
        let mut doc = ObjectDocument::new();
        let v = t.lower(&mut doc).unwrap();
        assert_eq!(
            lookup(&v, "image").and_then(Value::as_str),
            Some(image.uuid().to_string().as_str())
        );
        assert_eq!(lookup(&v, "flipY").and_then(Value::as_bool), Some(false));
        assert!(doc.contains(image.uuid()));
    }
}
