//! The data type API for the [`zarrs`](https://docs.rs/zarrs/latest/zarrs/index.html) crate.
//!
//! Defines the fixed set of numeric scalar types a `zarrs` array may hold, and [`FillValue`],
//! the byte-exact scalar returned for any element of an unmaterialized chunk.
//!
//! ## Licence
//! `zarrs_data_type` is licensed under either of
//!  - the Apache License, Version 2.0 or <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license or <http://opensource.org/licenses/MIT>, at your option.

use std::fmt::Display;

use thiserror::Error;

/// The scalar element type of an array.
///
/// Every variant has a fixed, statically known byte width ([`DataType::size_bytes`]).
/// `zarrs` has no notion of variable-length data types; each chunk is a dense buffer
/// of `num_elements * size_bytes` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DataType {
    /// `bool`, stored as a single byte (`0x00` or `0x01`).
    Bool,
    /// `int8`.
    Int8,
    /// `int16`.
    Int16,
    /// `int32`.
    Int32,
    /// `int64`.
    Int64,
    /// `uint8`.
    UInt8,
    /// `uint16`.
    UInt16,
    /// `uint32`.
    UInt32,
    /// `uint64`.
    UInt64,
    /// IEEE 754 binary16.
    Float16,
    /// IEEE 754 binary32.
    Float32,
    /// IEEE 754 binary64.
    Float64,
    /// A pair of [`DataType::Float32`], real followed by imaginary.
    Complex64,
    /// A pair of [`DataType::Float64`], real followed by imaginary.
    Complex128,
}

impl DataType {
    /// All data types, in the order they are commonly listed.
    pub const ALL: [Self; 14] = [
        Self::Bool,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float16,
        Self::Float32,
        Self::Float64,
        Self::Complex64,
        Self::Complex128,
    ];

    /// The size, in bytes, of a single element.
    #[must_use]
    pub const fn size_bytes(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Complex64 => 8,
            Self::Complex128 => 16,
        }
    }

    /// Whether the wire encoding of this type depends on byte order.
    ///
    /// `bool`, `int8`, and `uint8` are single-byte and therefore endianness-independent;
    /// every other type requires the `bytes` codec to record an explicit `endian` configuration.
    #[must_use]
    pub const fn endianness_required(&self) -> bool {
        self.size_bytes() > 1
    }

    /// Whether this is a floating point (real or complex) type.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(
            self,
            Self::Float16 | Self::Float32 | Self::Float64 | Self::Complex64 | Self::Complex128
        )
    }

    /// Whether this is a complex type.
    #[must_use]
    pub const fn is_complex(&self) -> bool {
        matches!(self, Self::Complex64 | Self::Complex128)
    }

    /// Whether this is a signed or unsigned integer type (excluding `bool`).
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::UInt8
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
        )
    }

    /// The short Zarr V3 wire name, e.g. `"int32"`.
    #[must_use]
    pub const fn v3_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
        }
    }

    /// Parse a Zarr V3 wire name.
    ///
    /// # Errors
    /// Returns [`UnknownDataTypeError`] if `name` is not recognised.
    pub fn from_v3_name(name: &str) -> Result<Self, UnknownDataTypeError> {
        Self::ALL
            .into_iter()
            .find(|dt| dt.v3_name() == name)
            .ok_or_else(|| UnknownDataTypeError(name.to_string()))
    }

    /// The Zarr V2 numpy-style dtype string, e.g. `"<i4"` or `"|b1"`.
    ///
    /// Single-byte types use the byte-order-agnostic `|` prefix.
    #[must_use]
    pub fn v2_dtype_string(&self, endianness: Endianness) -> String {
        let prefix = if self.endianness_required() {
            match endianness {
                Endianness::Little => '<',
                Endianness::Big => '>',
            }
        } else {
            '|'
        };
        let kind = match self {
            Self::Bool => "b1".to_string(),
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 => {
                format!("i{}", self.size_bytes())
            }
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64 => {
                format!("u{}", self.size_bytes())
            }
            Self::Float16 | Self::Float32 | Self::Float64 => format!("f{}", self.size_bytes()),
            Self::Complex64 | Self::Complex128 => format!("c{}", self.size_bytes()),
        };
        format!("{prefix}{kind}")
    }

    /// Parse a Zarr V2 numpy-style dtype string, returning the data type and its endianness
    /// (arbitrary for single-byte types).
    ///
    /// # Errors
    /// Returns [`UnknownDataTypeError`] if `dtype` is not recognised.
    pub fn from_v2_dtype_string(dtype: &str) -> Result<(Self, Endianness), UnknownDataTypeError> {
        let err = || UnknownDataTypeError(dtype.to_string());
        let mut chars = dtype.chars();
        let prefix = chars.next().ok_or_else(err)?;
        let endianness = match prefix {
            '<' => Endianness::Little,
            '>' => Endianness::Big,
            '|' => Endianness::Little,
            _ => return Err(err()),
        };
        let rest: String = chars.collect();
        let data_type = match rest.as_str() {
            "b1" => Self::Bool,
            "i1" => Self::Int8,
            "i2" => Self::Int16,
            "i4" => Self::Int32,
            "i8" => Self::Int64,
            "u1" => Self::UInt8,
            "u2" => Self::UInt16,
            "u4" => Self::UInt32,
            "u8" => Self::UInt64,
            "f2" => Self::Float16,
            "f4" => Self::Float32,
            "f8" => Self::Float64,
            "c8" => Self::Complex64,
            "c16" => Self::Complex128,
            _ => return Err(err()),
        };
        Ok((data_type, endianness))
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.v3_name())
    }
}

/// An unrecognised data type name or dtype string.
#[derive(Debug, Error)]
#[error("unknown data type {_0:?}")]
pub struct UnknownDataTypeError(String);

/// Byte order used when materializing multi-byte scalars to/from a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Little-endian.
    Little,
    /// Big-endian.
    Big,
}

impl Endianness {
    /// The endianness native to this target.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }
}

/// A byte-exact scalar value of a [`DataType`], stored in native byte order.
///
/// `FillValue` is the type used both for the array's nominal fill value and for any
/// scalar produced while parsing or serializing metadata. Equality is bitwise; callers
/// comparing floating point fill values for the purposes of a round-trip check should use
/// [`FillValue::is_equal_nan_aware`], which treats two NaN payloads of the same data type
/// as equal regardless of their bit pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillValue {
    bytes: Vec<u8>,
}

impl FillValue {
    /// Create a fill value from raw native-endian bytes.
    ///
    /// # Panics
    /// Panics if `bytes.len()` is not a multiple compatible with any data type (callers should
    /// use the typed constructors below or [`FillValue::from_data_type_bytes`]).
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Create a fill value from raw bytes, validating the length against `data_type`.
    ///
    /// # Errors
    /// Returns [`FillValueSizeError`] if `bytes.len() != data_type.size_bytes()`.
    pub fn from_data_type_bytes(
        bytes: Vec<u8>,
        data_type: DataType,
    ) -> Result<Self, FillValueSizeError> {
        if bytes.len() == data_type.size_bytes() {
            Ok(Self { bytes })
        } else {
            Err(FillValueSizeError {
                got: bytes.len(),
                expected: data_type.size_bytes(),
            })
        }
    }

    /// The zero/false fill value for `data_type`.
    #[must_use]
    pub fn zero(data_type: DataType) -> Self {
        Self {
            bytes: vec![0u8; data_type.size_bytes()],
        }
    }

    /// Create from a boolean.
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        Self::new(vec![u8::from(value)])
    }

    /// Create from a signed 64-bit integer, truncated to the width of `data_type`.
    ///
    /// # Panics
    /// Panics if `data_type` is not an integer type.
    #[must_use]
    pub fn from_i64(value: i64, data_type: DataType) -> Self {
        let bytes = match data_type {
            DataType::Int8 => vec![value as i8 as u8],
            DataType::Int16 => (value as i16).to_ne_bytes().to_vec(),
            DataType::Int32 => (value as i32).to_ne_bytes().to_vec(),
            DataType::Int64 => value.to_ne_bytes().to_vec(),
            DataType::UInt8 => vec![value as u8],
            DataType::UInt16 => (value as u16).to_ne_bytes().to_vec(),
            DataType::UInt32 => (value as u32).to_ne_bytes().to_vec(),
            DataType::UInt64 => (value as u64).to_ne_bytes().to_vec(),
            _ => panic!("from_i64 requires an integer data type"),
        };
        Self::new(bytes)
    }

    /// Create from an unsigned 64-bit integer, truncated to the width of `data_type`.
    ///
    /// # Panics
    /// Panics if `data_type` is not an unsigned integer type.
    #[must_use]
    pub fn from_u64(value: u64, data_type: DataType) -> Self {
        let bytes = match data_type {
            DataType::UInt8 => vec![value as u8],
            DataType::UInt16 => (value as u16).to_ne_bytes().to_vec(),
            DataType::UInt32 => (value as u32).to_ne_bytes().to_vec(),
            DataType::UInt64 => value.to_ne_bytes().to_vec(),
            _ => panic!("from_u64 requires an unsigned integer data type"),
        };
        Self::new(bytes)
    }

    /// Create from a double, narrowed to the width of `data_type`.
    ///
    /// # Panics
    /// Panics if `data_type` is not a real floating point type.
    #[must_use]
    pub fn from_f64(value: f64, data_type: DataType) -> Self {
        let bytes = match data_type {
            DataType::Float16 => half::f16::from_f64(value).to_ne_bytes().to_vec(),
            DataType::Float32 => (value as f32).to_ne_bytes().to_vec(),
            DataType::Float64 => value.to_ne_bytes().to_vec(),
            _ => panic!("from_f64 requires a real floating point data type"),
        };
        Self::new(bytes)
    }

    /// Create from a real/imaginary pair.
    ///
    /// # Panics
    /// Panics if `data_type` is not a complex type.
    #[must_use]
    pub fn from_complex64(value: (f32, f32), data_type: DataType) -> Self {
        assert_eq!(data_type, DataType::Complex64);
        let mut bytes = value.0.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&value.1.to_ne_bytes());
        Self::new(bytes)
    }

    /// Create from a real/imaginary pair.
    ///
    /// # Panics
    /// Panics if `data_type` is not a complex type.
    #[must_use]
    pub fn from_complex128(value: (f64, f64), data_type: DataType) -> Self {
        assert_eq!(data_type, DataType::Complex128);
        let mut bytes = value.0.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&value.1.to_ne_bytes());
        Self::new(bytes)
    }

    /// The raw native-endian bytes of this scalar.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether this scalar is NaN, for a `data_type` that is a real floating point type.
    /// Always `false` for non-float data types.
    #[must_use]
    pub fn is_nan(&self, data_type: DataType) -> bool {
        match data_type {
            DataType::Float16 => half::f16::from_ne_bytes(self.bytes.clone().try_into().unwrap()).is_nan(),
            DataType::Float32 => f32::from_ne_bytes(self.bytes.clone().try_into().unwrap()).is_nan(),
            DataType::Float64 => f64::from_ne_bytes(self.bytes.clone().try_into().unwrap()).is_nan(),
            _ => false,
        }
    }

    /// Widen a real floating point scalar to `f64`.
    ///
    /// # Panics
    /// Panics if `data_type` is not a real floating point type.
    #[must_use]
    pub fn as_f64(&self, data_type: DataType) -> f64 {
        match data_type {
            DataType::Float16 => {
                f64::from(half::f16::from_ne_bytes(self.bytes.clone().try_into().unwrap()))
            }
            DataType::Float32 => {
                f64::from(f32::from_ne_bytes(self.bytes.clone().try_into().unwrap()))
            }
            DataType::Float64 => f64::from_ne_bytes(self.bytes.clone().try_into().unwrap()),
            _ => panic!("as_f64 requires a real floating point data type"),
        }
    }

    /// Widen a complex scalar to an `(f64, f64)` real/imaginary pair.
    ///
    /// # Panics
    /// Panics if `data_type` is not a complex type.
    #[must_use]
    pub fn as_complex_parts(&self, data_type: DataType) -> (f64, f64) {
        match data_type {
            DataType::Complex64 => {
                let re = f32::from_ne_bytes(self.bytes[0..4].try_into().unwrap());
                let im = f32::from_ne_bytes(self.bytes[4..8].try_into().unwrap());
                (f64::from(re), f64::from(im))
            }
            DataType::Complex128 => {
                let re = f64::from_ne_bytes(self.bytes[0..8].try_into().unwrap());
                let im = f64::from_ne_bytes(self.bytes[8..16].try_into().unwrap());
                (re, im)
            }
            _ => panic!("as_complex_parts requires a complex data type"),
        }
    }

    /// Widen an integer scalar to `i128` (signed or unsigned, per `data_type`).
    ///
    /// # Panics
    /// Panics if `data_type` is not an integer type.
    #[must_use]
    pub fn as_i128(&self, data_type: DataType) -> i128 {
        match data_type {
            DataType::Int8 => i128::from(self.bytes[0] as i8),
            DataType::Int16 => i128::from(i16::from_ne_bytes(self.bytes.clone().try_into().unwrap())),
            DataType::Int32 => i128::from(i32::from_ne_bytes(self.bytes.clone().try_into().unwrap())),
            DataType::Int64 => i128::from(i64::from_ne_bytes(self.bytes.clone().try_into().unwrap())),
            DataType::UInt8 => i128::from(self.bytes[0]),
            DataType::UInt16 => i128::from(u16::from_ne_bytes(self.bytes.clone().try_into().unwrap())),
            DataType::UInt32 => i128::from(u32::from_ne_bytes(self.bytes.clone().try_into().unwrap())),
            DataType::UInt64 => i128::from(u64::from_ne_bytes(self.bytes.clone().try_into().unwrap())),
            _ => panic!("as_i128 requires an integer data type"),
        }
    }

    /// Read this fill value as a boolean.
    ///
    /// # Panics
    /// Panics if the underlying buffer is not one byte wide.
    #[must_use]
    pub fn as_bool(&self) -> bool {
        self.bytes[0] != 0
    }

    /// Build an integer fill value directly from an `i128`, truncating to the width of
    /// `data_type`. Used by fill-value metadata parsing once a value has been range-checked.
    #[must_use]
    pub fn from_i128(v: i128, data_type: DataType) -> Self {
        let bytes = match data_type {
            DataType::Int8 => vec![v as i8 as u8],
            DataType::Int16 => (v as i16).to_ne_bytes().to_vec(),
            DataType::Int32 => (v as i32).to_ne_bytes().to_vec(),
            DataType::Int64 => (v as i64).to_ne_bytes().to_vec(),
            DataType::UInt8 => vec![v as u8],
            DataType::UInt16 => (v as u16).to_ne_bytes().to_vec(),
            DataType::UInt32 => (v as u32).to_ne_bytes().to_vec(),
            DataType::UInt64 => (v as u64).to_ne_bytes().to_vec(),
            _ => panic!("from_i128 requires an integer data type"),
        };
        Self::new(bytes)
    }

    /// Compare two fill values for equality, treating NaN payloads of `data_type` as equal
    /// to each other (`isnan(a) && isnan(b)`), matching the round-trip invariant used when
    /// re-parsing a serialized fill value.
    #[must_use]
    pub fn is_equal_nan_aware(&self, other: &Self, data_type: DataType) -> bool {
        if data_type.is_float() && !data_type.is_complex() {
            if self.is_nan(data_type) && other.is_nan(data_type) {
                return true;
            }
        }
        self.bytes == other.bytes
    }
}

/// The provided byte length does not match the data type's size.
#[derive(Debug, Error)]
#[error("fill value has {got} bytes, expected {expected}")]
pub struct FillValueSizeError {
    got: usize,
    expected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_bytes_matches_wire_name() {
        assert_eq!(DataType::Int32.size_bytes(), 4);
        assert_eq!(DataType::Complex128.size_bytes(), 16);
        assert_eq!(DataType::Bool.size_bytes(), 1);
    }

    #[test]
    fn v3_name_roundtrip() {
        for dt in DataType::ALL {
            assert_eq!(DataType::from_v3_name(dt.v3_name()).unwrap(), dt);
        }
    }

    #[test]
    fn v2_dtype_string_roundtrip() {
        for dt in DataType::ALL {
            let s = dt.v2_dtype_string(Endianness::Little);
            let (parsed, _) = DataType::from_v2_dtype_string(&s).unwrap();
            assert_eq!(parsed, dt);
        }
    }

    #[test]
    fn nan_is_equal_nan_aware() {
        let a = FillValue::from_f64(f64::NAN, DataType::Float64);
        let b = FillValue::from_f64(-f64::NAN, DataType::Float64);
        assert!(a.is_nan(DataType::Float64));
        assert!(a.is_equal_nan_aware(&b, DataType::Float64));
    }

    #[test]
    fn integer_fill_value_exact_width() {
        let fv = FillValue::from_i64(-4, DataType::Int16);
        assert_eq!(fv.bytes().len(), 2);
    }
}
