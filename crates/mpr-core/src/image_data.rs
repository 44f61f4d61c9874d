use std::fmt;

use ndarray::{Array2, Array4, Axis};
use num_traits::{Bounded, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

/// Voxel scalar types a volume or slice image can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl ScalarType {
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::F32 | Self::F64)
    }

    /// Representable range as `f64`.
    pub fn range(self) -> (f64, f64) {
        match self {
            Self::U8 => type_range::<u8>(),
            Self::I8 => type_range::<i8>(),
            Self::U16 => type_range::<u16>(),
            Self::I16 => type_range::<i16>(),
            Self::U32 => type_range::<u32>(),
            Self::I32 => type_range::<i32>(),
            Self::F32 => type_range::<f32>(),
            Self::F64 => type_range::<f64>(),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "unsigned char",
            Self::I8 => "char",
            Self::U16 => "unsigned short",
            Self::I16 => "short",
            Self::U32 => "unsigned int",
            Self::I32 => "int",
            Self::F32 => "float",
            Self::F64 => "double",
        };
        write!(f, "{name}")
    }
}

fn type_range<T: Voxel>() -> (f64, f64) {
    (
        T::min_value().to_f64().unwrap_or(f64::MIN),
        T::max_value().to_f64().unwrap_or(f64::MAX),
    )
}

/// A primitive voxel type.
pub trait Voxel:
    Copy + Send + Sync + PartialEq + fmt::Debug + Zero + Bounded + ToPrimitive + 'static
{
    const SCALAR_TYPE: ScalarType;

    fn as_f64(self) -> f64;

    /// Convert from `f64`. Integer types round to nearest and saturate.
    fn from_f64(v: f64) -> Self;

    fn wrap(data: Array4<Self>) -> ImageData;

    fn view(image: &ImageData) -> Option<&Array4<Self>>;
}

macro_rules! impl_voxel {
    (@body $t:ty, $variant:ident, $conv:expr) => {
        impl Voxel for $t {
            const SCALAR_TYPE: ScalarType = ScalarType::$variant;

            #[inline]
            fn as_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                // `as` saturates on overflow and maps NaN to zero.
                ($conv)(v)
            }

            fn wrap(data: Array4<Self>) -> ImageData {
                ImageData::$variant(data)
            }

            fn view(image: &ImageData) -> Option<&Array4<Self>> {
                match image {
                    ImageData::$variant(a) => Some(a),
                    _ => None,
                }
            }
        }
    };
    ($t:ty, $variant:ident, int) => {
        impl_voxel!(@body $t, $variant, |v: f64| v.round() as $t);
    };
    ($t:ty, $variant:ident, float) => {
        impl_voxel!(@body $t, $variant, |v: f64| v as $t);
    };
}

impl_voxel!(u8, U8, int);
impl_voxel!(i8, I8, int);
impl_voxel!(u16, U16, int);
impl_voxel!(i16, I16, int);
impl_voxel!(u32, U32, int);
impl_voxel!(i32, I32, int);
impl_voxel!(f32, F32, float);
impl_voxel!(f64, F64, float);

/// A voxel grid of shape `(slices, rows, columns, components)`.
///
/// Indexing follows the volume convention: `i` is the column, `j` the row,
/// `k` the slice.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageData {
    U8(Array4<u8>),
    I8(Array4<i8>),
    U16(Array4<u16>),
    I16(Array4<i16>),
    U32(Array4<u32>),
    I32(Array4<i32>),
    F32(Array4<f32>),
    F64(Array4<f64>),
}

/// Run `$body` with `$arr` bound to the typed array inside an `ImageData`.
macro_rules! dispatch_image {
    ($image:expr, $arr:ident => $body:expr) => {
        match $image {
            $crate::image_data::ImageData::U8($arr) => $body,
            $crate::image_data::ImageData::I8($arr) => $body,
            $crate::image_data::ImageData::U16($arr) => $body,
            $crate::image_data::ImageData::I16($arr) => $body,
            $crate::image_data::ImageData::U32($arr) => $body,
            $crate::image_data::ImageData::I32($arr) => $body,
            $crate::image_data::ImageData::F32($arr) => $body,
            $crate::image_data::ImageData::F64($arr) => $body,
        }
    };
}
pub(crate) use dispatch_image;

impl ImageData {
    pub fn from_array<T: Voxel>(data: Array4<T>) -> Self {
        T::wrap(data)
    }

    /// Zero-filled image with dimensions in `(i, j, k)` order.
    pub fn zeros(scalar_type: ScalarType, dims: [usize; 3], components: usize) -> Self {
        let shape = (dims[2], dims[1], dims[0], components);
        match scalar_type {
            ScalarType::U8 => Self::U8(Array4::zeros(shape)),
            ScalarType::I8 => Self::I8(Array4::zeros(shape)),
            ScalarType::U16 => Self::U16(Array4::zeros(shape)),
            ScalarType::I16 => Self::I16(Array4::zeros(shape)),
            ScalarType::U32 => Self::U32(Array4::zeros(shape)),
            ScalarType::I32 => Self::I32(Array4::zeros(shape)),
            ScalarType::F32 => Self::F32(Array4::zeros(shape)),
            ScalarType::F64 => Self::F64(Array4::zeros(shape)),
        }
    }

    /// Build an image of `scalar_type` from `f64` samples, saturating.
    pub fn from_f64_array(scalar_type: ScalarType, values: &Array4<f64>) -> Self {
        fn conv<T: Voxel>(values: &Array4<f64>) -> ImageData {
            T::wrap(values.mapv(T::from_f64))
        }
        match scalar_type {
            ScalarType::U8 => conv::<u8>(values),
            ScalarType::I8 => conv::<i8>(values),
            ScalarType::U16 => conv::<u16>(values),
            ScalarType::I16 => conv::<i16>(values),
            ScalarType::U32 => conv::<u32>(values),
            ScalarType::I32 => conv::<i32>(values),
            ScalarType::F32 => conv::<f32>(values),
            ScalarType::F64 => conv::<f64>(values),
        }
    }

    /// Typed view of the samples, if the image holds `T`.
    pub fn as_array<T: Voxel>(&self) -> Option<&Array4<T>> {
        T::view(self)
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::U8(_) => ScalarType::U8,
            Self::I8(_) => ScalarType::I8,
            Self::U16(_) => ScalarType::U16,
            Self::I16(_) => ScalarType::I16,
            Self::U32(_) => ScalarType::U32,
            Self::I32(_) => ScalarType::I32,
            Self::F32(_) => ScalarType::F32,
            Self::F64(_) => ScalarType::F64,
        }
    }

    /// Raw array shape `(slices, rows, columns, components)`.
    pub fn shape(&self) -> [usize; 4] {
        let s = dispatch_image!(self, a => a.shape());
        [s[0], s[1], s[2], s[3]]
    }

    /// Grid dimensions in `(i, j, k)` order.
    pub fn dimensions(&self) -> [usize; 3] {
        let [n, h, w, _] = self.shape();
        [w, h, n]
    }

    pub fn components(&self) -> usize {
        self.shape()[3]
    }

    pub fn is_empty(&self) -> bool {
        self.shape().iter().any(|&d| d == 0)
    }

    pub fn value(&self, i: usize, j: usize, k: usize, c: usize) -> f64 {
        dispatch_image!(self, a => a[[k, j, i, c]].as_f64())
    }

    /// Minimum and maximum over all samples and components.
    pub fn scalar_range(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let range = dispatch_image!(self, a => a.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), &v| {
                let v = v.as_f64();
                (lo.min(v), hi.max(v))
            },
        ));
        Some(range)
    }

    pub fn to_f64_array(&self) -> Array4<f64> {
        dispatch_image!(self, a => a.mapv(|v| v.as_f64()))
    }

    /// Convert to another scalar type, rounding and saturating for integers.
    pub fn cast(&self, scalar_type: ScalarType) -> ImageData {
        if scalar_type == self.scalar_type() {
            return self.clone();
        }
        Self::from_f64_array(scalar_type, &self.to_f64_array())
    }

    /// One component of one stack slice as a `(rows, columns)` array.
    pub fn slice_values(&self, k: usize, c: usize) -> Array2<f64> {
        dispatch_image!(self, a => a
            .index_axis(Axis(0), k)
            .index_axis(Axis(2), c)
            .mapv(|v| v.as_f64()))
    }
}
