use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The data type of stored layer elements.
///
/// Elements are stored little-endian and decoded to [`f64`] on read.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// `uint8` Integer in `[0, 2^8-1]`.
    #[display("uint8")]
    UInt8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    #[display("int16")]
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    #[display("int32")]
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    #[display("int64")]
    Int64,
    /// `float32` IEEE 754 single-precision floating point.
    #[display("float32")]
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    #[display("float64")]
    Float64,
}

impl DataType {
    /// Returns the size in bytes of an element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::UInt8 => 1,
            Self::Int16 => 2,
            Self::Float32 | Self::Int32 => 4,
            Self::Float64 | Self::Int64 => 8,
        }
    }

    /// Decode little-endian `bytes` to [`f64`] elements.
    ///
    /// Trailing bytes that do not form a whole element are ignored.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn decode_le(&self, bytes: &[u8]) -> Vec<f64> {
        macro_rules! decode {
            ( $t:ty ) => {
                bytes
                    .chunks_exact(std::mem::size_of::<$t>())
                    .map(|chunk| {
                        <$t>::from_le_bytes(bytemuck::pod_read_unaligned::<
                            [u8; std::mem::size_of::<$t>()],
                        >(chunk))
                    })
                    .map(|element| element as f64)
                    .collect()
            };
        }
        match self {
            Self::UInt8 => bytes.iter().map(|byte| f64::from(*byte)).collect(),
            Self::Int16 => decode!(i16),
            Self::Int32 => decode!(i32),
            Self::Int64 => decode!(i64),
            Self::Float32 => decode!(f32),
            Self::Float64 => decode!(f64),
        }
    }
}
