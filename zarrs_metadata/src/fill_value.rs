//! Fill value parsing and serialization, per the Zarr V3 specification.

use serde_json::Value;
use thiserror::Error;
use zarrs_data_type::{DataType, FillValue};

/// A fill value in metadata did not match its declared data type.
#[derive(Debug, Error)]
#[error("fill value {value} is not valid for data type {data_type}")]
pub struct InvalidFillValueMetadataError {
    value: Value,
    data_type: DataType,
}

impl InvalidFillValueMetadataError {
    fn new(value: &Value, data_type: DataType) -> Self {
        Self {
            value: value.clone(),
            data_type,
        }
    }
}

/// Parse a raw JSON fill value against `data_type`, following `parse_fill_value(value, dtype)`:
///
/// - `null` parses to `dtype(0)`.
/// - For float types: the strings `"NaN"`, `"Infinity"`, `"-Infinity"` are accepted; otherwise
///   the JSON number is cast to the type and the cast must round-trip within tolerance
///   (`isclose(value, casted, equal_nan=True)`).
/// - For complex types: a 2-element array `[real, imag]`, each parsed with the float rules above
///   against the component float type.
/// - For integer and boolean types: the JSON number/bool is cast and must be *exactly* equal to
///   the input, which rejects out-of-range values.
/// - Any other JSON shape is rejected.
///
/// # Errors
/// Returns [`InvalidFillValueMetadataError`] if `value` cannot be parsed as `data_type`.
pub fn parse_fill_value(
    value: &Value,
    data_type: DataType,
) -> Result<FillValue, InvalidFillValueMetadataError> {
    if value.is_null() {
        return Ok(FillValue::zero(data_type));
    }

    if data_type == DataType::Bool {
        return value
            .as_bool()
            .map(FillValue::from_bool)
            .ok_or_else(|| InvalidFillValueMetadataError::new(value, data_type));
    }

    if data_type.is_complex() {
        let Some(arr) = value.as_array() else {
            return Err(InvalidFillValueMetadataError::new(value, data_type));
        };
        if arr.len() != 2 {
            return Err(InvalidFillValueMetadataError::new(value, data_type));
        }
        let component_type = if data_type == DataType::Complex64 {
            DataType::Float32
        } else {
            DataType::Float64
        };
        let re = parse_float_component(&arr[0], component_type)
            .map_err(|()| InvalidFillValueMetadataError::new(value, data_type))?;
        let im = parse_float_component(&arr[1], component_type)
            .map_err(|()| InvalidFillValueMetadataError::new(value, data_type))?;
        return Ok(match data_type {
            DataType::Complex64 => FillValue::from_complex64((re as f32, im as f32), data_type),
            DataType::Complex128 => FillValue::from_complex128((re, im), data_type),
            _ => unreachable!(),
        });
    }

    if data_type.is_float() {
        return parse_float_component(value, data_type)
            .map(|f| float_fill_value(f, data_type))
            .map_err(|()| InvalidFillValueMetadataError::new(value, data_type));
    }

    // Integer types: cast then compare for exact equality, which also rejects out-of-range
    // values. `as_i64`/`as_u64` cover the common case (and preserve full precision for values
    // too large for `f64` to represent exactly); an integral-valued JSON float like `5.0` is
    // neither, so it falls back to `as_f64` and is accepted when it has no fractional part,
    // matching the original's `fill_value != casted_value` cast-and-compare (`5.0 == 5`).
    debug_assert!(data_type.is_integer());
    let v = if let Some(i) = value.as_i64() {
        i128::from(i)
    } else if let Some(u) = value.as_u64() {
        i128::from(u)
    } else {
        let f = value
            .as_f64()
            .ok_or_else(|| InvalidFillValueMetadataError::new(value, data_type))?;
        if !f.is_finite() || f.fract() != 0.0 {
            return Err(InvalidFillValueMetadataError::new(value, data_type));
        }
        f as i128
    };
    let range = integer_range(data_type);
    if !range.contains(&v) {
        return Err(InvalidFillValueMetadataError::new(value, data_type));
    }
    Ok(FillValue::from_i128(v, data_type))
}

fn integer_range(data_type: DataType) -> std::ops::RangeInclusive<i128> {
    match data_type {
        DataType::Int8 => i128::from(i8::MIN)..=i128::from(i8::MAX),
        DataType::Int16 => i128::from(i16::MIN)..=i128::from(i16::MAX),
        DataType::Int32 => i128::from(i32::MIN)..=i128::from(i32::MAX),
        DataType::Int64 => i128::from(i64::MIN)..=i128::from(i64::MAX),
        DataType::UInt8 => 0..=i128::from(u8::MAX),
        DataType::UInt16 => 0..=i128::from(u16::MAX),
        DataType::UInt32 => 0..=i128::from(u32::MAX),
        DataType::UInt64 => 0..=i128::from(u64::MAX),
        _ => unreachable!("integer_range called on a non-integer data type"),
    }
}

fn float_fill_value(value: f64, data_type: DataType) -> FillValue {
    FillValue::from_f64(value, data_type)
}

/// Parse one real-valued float component (a plain number, or one of the three special strings).
fn parse_float_component(value: &Value, component_type: DataType) -> Result<f64, ()> {
    if let Some(s) = value.as_str() {
        return match s {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            _ => Err(()),
        };
    }
    let n = value.as_f64().ok_or(())?;
    // Verify the cast to `component_type` and back round-trips within tolerance.
    let casted = float_fill_value(n, component_type);
    let back = casted.as_f64(component_type);
    if is_close(n, back) {
        Ok(n)
    } else {
        Err(())
    }
}

/// `numpy.isclose` with `equal_nan=True` and numpy's default tolerances.
fn is_close(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// Serialize a [`FillValue`] back to the JSON representation `parse_fill_value` would accept,
/// replacing NaN/Infinity/-Infinity with their string forms per the Zarr V3 specification.
#[must_use]
pub fn serialize_fill_value(fill_value: &FillValue, data_type: DataType) -> Value {
    if data_type == DataType::Bool {
        return Value::Bool(fill_value.as_bool());
    }
    if data_type.is_complex() {
        let component_type = if data_type == DataType::Complex64 {
            DataType::Float32
        } else {
            DataType::Float64
        };
        let (re, im) = fill_value.as_complex_parts(data_type);
        return Value::Array(vec![
            serialize_float_component(re, component_type),
            serialize_float_component(im, component_type),
        ]);
    }
    if data_type.is_float() {
        return serialize_float_component(fill_value.as_f64(data_type), data_type);
    }
    let v = fill_value.as_i128(data_type);
    if matches!(
        data_type,
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
    ) {
        Value::from(u64::try_from(v).unwrap_or(0))
    } else {
        Value::from(i64::try_from(v).unwrap_or(0))
    }
}

fn serialize_float_component(value: f64, _component_type: DataType) -> Value {
    if value.is_nan() {
        Value::String("NaN".to_string())
    } else if value.is_infinite() {
        Value::String(if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string())
    } else {
        serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_defaults_to_zero() {
        let fv = parse_fill_value(&Value::Null, DataType::Int32).unwrap();
        assert_eq!(fv.as_i128(DataType::Int32), 0);
    }

    #[test]
    fn nan_string_roundtrips() {
        let fv = parse_fill_value(&Value::String("NaN".to_string()), DataType::Float64).unwrap();
        assert!(fv.is_nan(DataType::Float64));
        let back = serialize_fill_value(&fv, DataType::Float64);
        assert_eq!(back, Value::String("NaN".to_string()));
    }

    #[test]
    fn complex_fill_value_parses() {
        let v = serde_json::json!([1.0, 2.0]);
        let fv = parse_fill_value(&v, DataType::Complex128).unwrap();
        assert_eq!(fv.as_complex_parts(DataType::Complex128), (1.0, 2.0));
    }

    #[test]
    fn out_of_range_integer_is_rejected() {
        let v = serde_json::json!(300);
        assert!(parse_fill_value(&v, DataType::Int8).is_err());
    }

    #[test]
    fn non_integral_float_for_integer_dtype_is_rejected() {
        let v = serde_json::json!(1.5);
        assert!(parse_fill_value(&v, DataType::Int32).is_err());
    }

    #[test]
    fn integral_valued_float_for_integer_dtype_is_accepted() {
        let v = serde_json::json!(5.0);
        let fv = parse_fill_value(&v, DataType::Int32).unwrap();
        assert_eq!(fv.as_i128(DataType::Int32), 5);
    }

    #[test]
    fn sequence_for_non_complex_dtype_is_rejected() {
        let v = serde_json::json!([1, 2]);
        assert!(parse_fill_value(&v, DataType::Float64).is_err());
    }
}
