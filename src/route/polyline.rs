//! Decoding of encoded polylines (the format used by most routing APIs).

use crate::route::error::RouteProviderError;
use crate::types::coordinate::Coordinate;

/// Decodes an encoded polyline at precision 5 (1e-5 degrees).
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, RouteProviderError> {
    decode_with_precision(encoded, 5)
}

pub fn decode_with_precision(
    encoded: &str,
    precision: u32,
) -> Result<Vec<Coordinate>, RouteProviderError> {
    let factor = 10_f64.powi(precision as i32);
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat += next_value(bytes, &mut index)?;
        lon += next_value(bytes, &mut index)?;
        let coordinate = Coordinate::new(lat as f64 / factor, lon as f64 / factor)
            .map_err(|e| RouteProviderError::Malformed(format!("polyline point: {e}")))?;
        points.push(coordinate);
    }
    Ok(points)
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, RouteProviderError> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(RouteProviderError::Malformed(
                "polyline ends mid-value".to_string(),
            ));
        };
        *index += 1;
        if !(63..=126).contains(&byte) || shift > 60 {
            return Err(RouteProviderError::Malformed(format!(
                "invalid polyline byte {byte:#x} at {}",
                *index - 1
            )));
        }
        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}
