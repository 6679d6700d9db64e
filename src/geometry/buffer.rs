//! Typed numeric buffers
//!
//! Arrays are stored row-major and sent column-major: for a 2-D array each
//! column is one item (a 3×N position buffer has `itemSize` 3). Element
//! type and rank are only checked when lowering.

use glam::Vec3;
use rmpv::Value;

use crate::core::{Error, Result};
use crate::geometry::document::map;

/// msgpack ext tags for the typed arrays the renderer accepts
pub const EXT_UINT8: i8 = 0x12;
pub const EXT_INT32: i8 = 0x15;
pub const EXT_UINT32: i8 = 0x16;
pub const EXT_FLOAT32: i8 = 0x17;

/// Element storage
#[derive(Clone, Debug, PartialEq)]
pub enum NumericData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    /// Downcast to f32 when lowered
    F64(Vec<f64>),
}

impl NumericData {
    pub fn len(&self) -> usize {
        match self {
            NumericData::U8(v) => v.len(),
            NumericData::U16(v) => v.len(),
            NumericData::I32(v) => v.len(),
            NumericData::U32(v) => v.len(),
            NumericData::I64(v) => v.len(),
            NumericData::F32(v) => v.len(),
            NumericData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype_name(&self) -> &'static str {
        match self {
            NumericData::U8(_) => "uint8",
            NumericData::U16(_) => "uint16",
            NumericData::I32(_) => "int32",
            NumericData::U32(_) => "uint32",
            NumericData::I64(_) => "int64",
            NumericData::F32(_) => "float32",
            NumericData::F64(_) => "float64",
        }
    }
}

/// A 1-D or 2-D array of numbers.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericArray {
    data: NumericData,
    shape: Vec<usize>,
}

impl NumericArray {
    /// Wrap row-major `data` with the given shape. The element count must
    /// match the shape.
    pub fn new(data: NumericData, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::ShapeMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    /// 1-D array.
    pub fn from_vec(data: NumericData) -> Self {
        let shape = vec![data.len()];
        Self { data, shape }
    }

    /// 3×N float array, one point per column.
    pub fn from_points(points: &[Vec3]) -> Self {
        let n = points.len();
        let mut data = vec![0.0f32; 3 * n];
        for (col, p) in points.iter().enumerate() {
            data[col] = p.x;
            data[n + col] = p.y;
            data[2 * n + col] = p.z;
        }
        Self {
            data: NumericData::F32(data),
            shape: vec![3, n],
        }
    }

    pub fn data(&self) -> &NumericData {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Elements per item: 1 for vectors, the row count for matrices.
    pub fn item_size(&self) -> Result<usize> {
        match self.shape.as_slice() {
            [_] => Ok(1),
            [rows, _] => Ok(*rows),
            _ => Err(Error::InvalidRank(self.rank())),
        }
    }

    /// `{itemSize, type, array: ext(tag, bytes), normalized: false}`
    pub fn lower(&self) -> Result<Value> {
        let item_size = self.item_size()?;
        let (type_name, tag, bytes) = match &self.data {
            NumericData::U8(v) => ("Uint8Array", EXT_UINT8, pack(v, &self.shape)),
            NumericData::I32(v) => ("Int32Array", EXT_INT32, pack(v, &self.shape)),
            NumericData::U32(v) => ("Uint32Array", EXT_UINT32, pack(v, &self.shape)),
            NumericData::F32(v) => ("Float32Array", EXT_FLOAT32, pack(v, &self.shape)),
            NumericData::F64(v) => {
                let down: Vec<f32> = v.iter().map(|&x| x as f32).collect();
                ("Float32Array", EXT_FLOAT32, pack(&down, &self.shape))
            }
            other => return Err(Error::UnsupportedDtype(other.dtype_name())),
        };
        Ok(map([
            ("itemSize", Value::from(item_size as u64)),
            ("type", Value::from(type_name)),
            ("array", Value::Ext(tag, bytes)),
            ("normalized", Value::from(false)),
        ]))
    }
}

impl From<Vec<Vec3>> for NumericArray {
    fn from(points: Vec<Vec3>) -> Self {
        Self::from_points(&points)
    }
}

/// Reorder a row-major array column-major.
fn column_major<T: Copy>(values: &[T], shape: &[usize]) -> Vec<T> {
    match shape {
        [rows, cols] => {
            let mut out = Vec::with_capacity(values.len());
            for c in 0..*cols {
                for r in 0..*rows {
                    out.push(values[r * cols + c]);
                }
            }
            out
        }
        _ => values.to_vec(),
    }
}

fn pack<T: bytemuck::Pod>(values: &[T], shape: &[usize]) -> Vec<u8> {
    bytemuck::cast_slice(&column_major(values, shape)).to_vec()
}
