//! Parsing functions for CLI arguments.

use std::collections::BTreeSet;

use mtrack_core::ObjectId;

fn parse_bound(value: &str, name: &str) -> Result<f64, String> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" | "" if name == "max" => Ok(f64::INFINITY),
        _ => value
            .parse::<f64>()
            .ok()
            .filter(|v| !v.is_nan())
            .ok_or_else(|| format!("Invalid {} value: {}", name, value)),
    }
}

/// Parse a range in format "MIN,MAX"
///
/// `MAX` may be `inf` or left empty for an open upper bound.
pub fn parse_range(range_str: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = range_str.split(',').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Range must be in format MIN,MAX (e.g., 50,500 or 10,inf), got: {}",
            range_str
        ));
    }

    let min = parse_bound(parts[0], "min")?;
    let max = parse_bound(parts[1], "max")?;
    if min > max {
        return Err(format!("Range minimum {} is greater than maximum {}", min, max));
    }
    Ok((min, max))
}

/// Parse a comma-separated list of object ids, e.g. "1,2,3"
pub fn parse_id_list(ids_str: &str) -> Result<BTreeSet<ObjectId>, String> {
    ids_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map(ObjectId)
                .map_err(|_| format!("Invalid object id: {}", s))
        })
        .collect()
}
