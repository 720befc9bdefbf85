//! Cell payload encoding.
//!
//! Fixed size values are stored as little endian bytes.
//! Variable length strings are stored as a block:
//! ```text
//! count: u64 | offsets: (count + 1) × u64 | utf-8 bytes
//! ```
//! with all integers little endian and `offsets[i]..offsets[i + 1]` addressing string `i` in the bytes.

use thiserror::Error;

use super::{AttributeType, AttributeValues, CoordinateValues, DimensionType};

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The encoded length is not a multiple of the element size.
    #[error("encoded length {length} is not a multiple of the element size {element_size}")]
    UnexpectedLength {
        /// The encoded length.
        length: usize,
        /// The element size.
        element_size: usize,
    },
    /// The number of decoded values differs from the expected number.
    #[error("decoded {got} values, expected {expected}")]
    UnexpectedCount {
        /// The expected number of values.
        expected: usize,
        /// The decoded number of values.
        got: usize,
    },
    /// A variable length block is malformed.
    #[error("invalid variable length block: {0}")]
    InvalidOffsets(String),
    /// A string is not valid UTF-8.
    #[error(transparent)]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// A string coordinate is not ASCII.
    #[error("string coordinate {0:?} is not ASCII")]
    NonAscii(String),
}

const U64_SIZE: usize = core::mem::size_of::<u64>();

fn encode_f64(values: &[f64]) -> Vec<u8> {
    if cfg!(target_endian = "little") {
        bytemuck::cast_slice(values).to_vec()
    } else {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

fn encode_i32(values: &[i32]) -> Vec<u8> {
    if cfg!(target_endian = "little") {
        bytemuck::cast_slice(values).to_vec()
    } else {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

fn check_length(bytes: &[u8], element_size: usize) -> Result<(), CodecError> {
    if bytes.len() % element_size == 0 {
        Ok(())
    } else {
        Err(CodecError::UnexpectedLength {
            length: bytes.len(),
            element_size,
        })
    }
}

fn decode_f64(bytes: &[u8]) -> Result<Vec<f64>, CodecError> {
    check_length(bytes, core::mem::size_of::<f64>())?;
    let mut values: Vec<f64> = bytemuck::pod_collect_to_vec(bytes);
    if cfg!(target_endian = "big") {
        for value in &mut values {
            *value = f64::from_bits(u64::from_le(value.to_bits()));
        }
    }
    Ok(values)
}

fn decode_i32(bytes: &[u8]) -> Result<Vec<i32>, CodecError> {
    check_length(bytes, core::mem::size_of::<i32>())?;
    let mut values: Vec<i32> = bytemuck::pod_collect_to_vec(bytes);
    if cfg!(target_endian = "big") {
        for value in &mut values {
            *value = i32::from_le(*value);
        }
    }
    Ok(values)
}

fn encode_strings(values: &[String]) -> Vec<u8> {
    let data_len: usize = values.iter().map(String::len).sum();
    let mut bytes = Vec::with_capacity(U64_SIZE * (values.len() + 2) + data_len);
    bytes.extend_from_slice(&(values.len() as u64).to_le_bytes());
    let mut offset = 0u64;
    bytes.extend_from_slice(&offset.to_le_bytes());
    for value in values {
        offset += value.len() as u64;
        bytes.extend_from_slice(&offset.to_le_bytes());
    }
    for value in values {
        bytes.extend_from_slice(value.as_bytes());
    }
    bytes
}

fn read_u64(bytes: &[u8], index: usize) -> Result<u64, CodecError> {
    let start = index * U64_SIZE;
    bytes
        .get(start..start + U64_SIZE)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| CodecError::InvalidOffsets(format!("missing header word {index}")))
}

fn decode_strings(bytes: &[u8]) -> Result<Vec<String>, CodecError> {
    let count = usize::try_from(read_u64(bytes, 0)?)
        .map_err(|_| CodecError::InvalidOffsets("count overflows usize".to_string()))?;
    let header_words = count
        .checked_add(2)
        .ok_or_else(|| CodecError::InvalidOffsets("count overflows usize".to_string()))?;
    let data = bytes
        .get(header_words.saturating_mul(U64_SIZE)..)
        .ok_or_else(|| CodecError::InvalidOffsets("truncated offsets".to_string()))?;
    let mut values = Vec::with_capacity(count);
    let mut start = read_u64(bytes, 1)?;
    for i in 0..count {
        let end = read_u64(bytes, i + 2)?;
        let range = usize::try_from(start)
            .ok()
            .zip(usize::try_from(end).ok())
            .filter(|(start, end)| start <= end && *end <= data.len())
            .ok_or_else(|| CodecError::InvalidOffsets(format!("offsets {start}..{end}")))?;
        values.push(String::from_utf8(data[range.0..range.1].to_vec())?);
        start = end;
    }
    Ok(values)
}

/// Encode a coordinate column.
///
/// # Errors
/// Returns [`CodecError::NonAscii`] if a string coordinate is not ASCII.
pub fn encode_coordinates(values: &CoordinateValues) -> Result<Vec<u8>, CodecError> {
    match values {
        CoordinateValues::Int32(values) => Ok(encode_i32(values)),
        CoordinateValues::String(values) => {
            if let Some(value) = values.iter().find(|value| !value.is_ascii()) {
                return Err(CodecError::NonAscii(value.clone()));
            }
            Ok(encode_strings(values))
        }
    }
}

/// Decode a coordinate column of `dimension_type`.
///
/// # Errors
/// Returns a [`CodecError`] if `bytes` are not a valid encoding.
pub fn decode_coordinates(
    bytes: &[u8],
    dimension_type: DimensionType,
) -> Result<CoordinateValues, CodecError> {
    Ok(match dimension_type {
        DimensionType::Int32 => CoordinateValues::Int32(decode_i32(bytes)?),
        DimensionType::StringAscii => CoordinateValues::String(decode_strings(bytes)?),
    })
}

/// Encode an attribute column.
#[must_use]
pub fn encode_attribute(values: &AttributeValues) -> Vec<u8> {
    match values {
        AttributeValues::Float64(values) => encode_f64(values),
        AttributeValues::Int32(values) => encode_i32(values),
        AttributeValues::String(values) => encode_strings(values),
    }
}

/// Decode an attribute column of `attribute_type`.
///
/// # Errors
/// Returns a [`CodecError`] if `bytes` are not a valid encoding.
pub fn decode_attribute(
    bytes: &[u8],
    attribute_type: AttributeType,
) -> Result<AttributeValues, CodecError> {
    Ok(match attribute_type {
        AttributeType::Float64 => AttributeValues::Float64(decode_f64(bytes)?),
        AttributeType::Int32 => AttributeValues::Int32(decode_i32(bytes)?),
        AttributeType::StringUtf8 => AttributeValues::String(decode_strings(bytes)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_fixed_size() {
        let bytes = encode_attribute(&AttributeValues::Float64(vec![0.01, -1.5]));
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[8..], &(-1.5f64).to_le_bytes());
        assert_eq!(
            decode_attribute(&bytes, AttributeType::Float64).unwrap(),
            AttributeValues::Float64(vec![0.01, -1.5])
        );
        assert!(matches!(
            decode_attribute(&bytes[1..], AttributeType::Float64),
            Err(CodecError::UnexpectedLength { .. })
        ));
    }

    #[test]
    fn codec_strings() {
        let values = vec!["ENSG1".to_string(), String::new(), "~ A + B".to_string()];
        let bytes = encode_attribute(&AttributeValues::String(values.clone()));
        assert_eq!(&bytes[..8], &3u64.to_le_bytes());
        assert_eq!(bytes.len(), 8 * 5 + 12);
        assert_eq!(
            decode_attribute(&bytes, AttributeType::StringUtf8).unwrap(),
            AttributeValues::String(values)
        );
        assert!(decode_attribute(&bytes[..30], AttributeType::StringUtf8).is_err());
        assert_eq!(
            decode_attribute(&encode_strings(&[]), AttributeType::StringUtf8).unwrap(),
            AttributeValues::String(vec![])
        );
    }

    #[test]
    fn codec_coordinates_ascii() {
        assert!(matches!(
            encode_coordinates(&CoordinateValues::from(vec!["gène"])),
            Err(CodecError::NonAscii(_))
        ));
        let bytes = encode_coordinates(&CoordinateValues::Int32(vec![1, -2])).unwrap();
        assert_eq!(
            decode_coordinates(&bytes, DimensionType::Int32).unwrap(),
            CoordinateValues::Int32(vec![1, -2])
        );
    }
}
