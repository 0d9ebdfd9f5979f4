mod config;
pub mod manual;

use log::{debug, info, warn};

pub use crate::config::*;

/// Mean radius of the Earth, in km.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in km.
///
/// Uses the spherical law of cosines. The cosine is clamped to [-1, 1] before
/// taking the inverse, so that rounding on (near-)identical or antipodal points
/// never leaves the domain of `acos`. Identical points are exactly 0 km apart.
pub fn great_circle_distance_km(a: &Coordinates, b: &Coordinates) -> f64 {
    if a.same_position(b) {
        return 0.0;
    }
    let lat1 = a.latitude.to_radians();
    let lon1 = a.longitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let lon2 = b.longitude.to_radians();

    let cos_angle = lat1.cos() * lat2.cos() * (lon1 - lon2).cos() + lat1.sin() * lat2.sin();
    let cos_angle = cos_angle.clamp(-1.0, 1.0);

    EARTH_RADIUS_KM * cos_angle.acos()
}

/// Absolute difference between two fractional percentages, in percentage points.
pub fn percentage_difference(p1: f64, p2: f64) -> f64 {
    (p1 - p2).abs() * 100.0
}

/// Checks every raw row and splits the input into valid records and rejections.
///
/// The order of the accepted records is the order of the input. A row is
/// reported once, for the first field that fails (latitude, then longitude,
/// then percentage).
pub fn validate_records(raw: &[RawRecord]) -> ValidationReport {
    let mut report = ValidationReport::default();
    for r in raw.iter() {
        match validate_record(r) {
            Ok(record) => report.records.push(record),
            Err(rejection) => {
                debug!(
                    "validate_records: record {}: rejected {:?} (value: {:?})",
                    rejection.id, rejection, rejection.value
                );
                report.rejections.push(rejection);
            }
        }
    }
    info!(
        "validate_records: {} valid records, {} rejected",
        report.records.len(),
        report.rejections.len()
    );
    report
}

fn validate_record(r: &RawRecord) -> Result<GeoRecord, Rejection> {
    let latitude = check_field(r.id, RecordField::Latitude, r.latitude, -90.0, 90.0)?;
    let longitude = check_field(r.id, RecordField::Longitude, r.longitude, -180.0, 180.0)?;
    let percentage = check_field(r.id, RecordField::Percentage, r.percentage, 0.0, 1.0)?;
    Ok(GeoRecord {
        id: r.id,
        coordinates: Coordinates::new(latitude, longitude),
        percentage,
        address: r.address.clone(),
    })
}

fn check_field(
    id: RecordId,
    field: RecordField,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> Result<f64, Rejection> {
    let reject = |reason| Rejection {
        id,
        field,
        reason,
        value,
    };
    match value {
        None => Err(reject(RejectionReason::Missing)),
        Some(x) if !x.is_finite() => Err(reject(RejectionReason::NotFinite)),
        Some(x) if x < min || x > max => Err(reject(RejectionReason::OutOfRange)),
        Some(x) => Ok(x),
    }
}

/// Runs the detector on the given records.
///
/// Every unordered pair (i, j) with i < j is evaluated exactly once. The pairs
/// that are within the proximity threshold and at or above the divergence
/// threshold are returned in enumeration order.
///
/// Arguments:
/// * `records` the validated records, in input order
/// * `thresholds` the two filters to apply
pub fn find_close_pairs(
    records: &[GeoRecord],
    thresholds: &Thresholds,
) -> Result<DetectionResult, DetectionErrors> {
    thresholds.check()?;
    info!(
        "find_close_pairs: Processing {:?} records, thresholds: {:?}",
        records.len(),
        thresholds
    );

    let mut pairs: Vec<CandidatePair> = Vec::new();
    let mut pairs_evaluated: u64 = 0;
    for (i, r1) in records.iter().enumerate() {
        for r2 in records[i + 1..].iter() {
            pairs_evaluated += 1;
            let distance_km = great_circle_distance_km(&r1.coordinates, &r2.coordinates);
            let percentage_diff = percentage_difference(r1.percentage, r2.percentage);
            if thresholds.qualifies(distance_km, percentage_diff) {
                debug!(
                    "find_close_pairs: {} / {}: distance {} km, difference {}",
                    r1.id, r2.id, distance_km, percentage_diff
                );
                pairs.push(CandidatePair {
                    first: PairEndpoint::from_record(r1),
                    second: PairEndpoint::from_record(r2),
                    distance_km,
                    percentage_diff,
                });
            }
        }
    }

    if pairs.is_empty() && !records.is_empty() {
        warn!("find_close_pairs: no pair matched the thresholds");
    }
    info!(
        "find_close_pairs: {} pairs evaluated, {} flagged",
        pairs_evaluated,
        pairs.len()
    );
    Ok(DetectionResult {
        pairs,
        pairs_evaluated,
    })
}
