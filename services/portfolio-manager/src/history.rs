//! Adaptive history downsampling (§4.8).
//!
//! Grounded on the original's `app/utils/downsampling.py`: below
//! `RAW_THRESHOLD` records, return everything untouched. Above it, pick a
//! bucket width off the ladder by how far `record_count` exceeds
//! `target_points`, bucket every record by `floor(epoch_minutes / interval) *
//! interval`, and keep the latest record per bucket.

use types::portfolio::PortfolioHistoryPoint;

/// No downsampling below this many records, matching the original's
/// hardcoded threshold.
const RAW_THRESHOLD: usize = 1000;

const INTERVAL_LADDER: [(u32, u32); 6] = [(2, 5), (4, 15), (8, 30), (16, 60), (32, 120), (64, 240)];

/// Minutes per bucket, or 0 for "no downsampling".
fn optimal_interval_minutes(record_count: usize, target_points: u32) -> u32 {
    if record_count <= RAW_THRESHOLD {
        return 0;
    }
    let ratio = record_count as f64 / target_points as f64;
    for (max_ratio, minutes) in INTERVAL_LADDER {
        if ratio <= max_ratio as f64 {
            return minutes;
        }
    }
    1440
}

/// Downsample a time-ordered history to approximately `target_points`
/// points. Records are expected sorted ascending by `recorded_at`, and the
/// result is returned in the same order.
pub fn adaptive_downsample(
    records: Vec<PortfolioHistoryPoint>,
    target_points: u32,
) -> (Vec<PortfolioHistoryPoint>, u32) {
    let interval = optimal_interval_minutes(records.len(), target_points);
    if interval == 0 {
        return (records, 0);
    }
    (downsample_to_interval(records, interval), interval)
}

fn downsample_to_interval(records: Vec<PortfolioHistoryPoint>, interval_minutes: u32) -> Vec<PortfolioHistoryPoint> {
    use std::collections::BTreeMap;

    let interval = interval_minutes as i64;
    let mut buckets: BTreeMap<i64, PortfolioHistoryPoint> = BTreeMap::new();
    for record in records {
        let total_minutes = record.recorded_at.timestamp() / 60;
        let bucket_minutes = (total_minutes.div_euclid(interval)) * interval;
        buckets
            .entry(bucket_minutes)
            .and_modify(|existing| {
                if record.recorded_at > existing.recorded_at {
                    *existing = record.clone();
                }
            })
            .or_insert(record);
    }
    buckets.into_values().collect()
}
