//! Legend colors and chart statistics shared with the presentation layer.

use std::collections::BTreeMap;

use crate::model::Event;

pub const PALETTE: [&str; 7] = [
    "#00ffc8", "#1e90ff", "#ff00a8", "#ffcc00", "#7fff00", "#ff6f61", "#00e5ff",
];

/// Stable color for a class key.
///
/// Hashes UTF-16 code units with a wrapping `h * 31 + c` so the same key maps
/// to the same palette entry in every client.
pub fn legend_color(key: &str) -> &'static str {
    let hash = key
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    let idx = i64::from(hash).unsigned_abs() % PALETTE.len() as u64;
    PALETTE[idx as usize]
}

/// Nearest-rank style percentile (`p` in `[0, 1]`); `0.0` for no data.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = (p * sorted.len() as f64).floor().max(0.0) as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// Detection count per `class_id` across the given events.
pub fn class_counts<'a, I>(events: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut counts = BTreeMap::new();
    for detection in events.into_iter().flat_map(|e| e.detections.iter()) {
        *counts.entry(detection.class_id.clone()).or_insert(0) += 1;
    }
    counts
}
