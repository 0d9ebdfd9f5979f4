// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The identifier of a record: the 1-based position of its data row in the
/// source table, header excluded.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct RecordId(pub usize);

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A position on the globe, in decimal degrees.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Coordinates {
        Coordinates {
            latitude,
            longitude,
        }
    }

    /// Exact floating-point equality on both components. NaN never matches.
    pub fn same_position(&self, other: &Coordinates) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

/// A row as it comes out of the reader, before any check is applied.
///
/// The numeric fields are optional: an empty or unreadable cell is `None`.
#[derive(PartialEq, Debug, Clone)]
pub struct RawRecord {
    pub id: RecordId,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// A fraction in [0, 1].
    pub percentage: Option<f64>,
    pub address: [String; 3],
}

/// A validated record. All the numeric fields are finite and in range.
#[derive(PartialEq, Debug, Clone)]
pub struct GeoRecord {
    pub id: RecordId,
    pub coordinates: Coordinates,
    /// A fraction in [0, 1].
    pub percentage: f64,
    pub address: [String; 3],
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum RecordField {
    Latitude,
    Longitude,
    Percentage,
}

impl Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordField::Latitude => write!(f, "latitude"),
            RecordField::Longitude => write!(f, "longitude"),
            RecordField::Percentage => write!(f, "percentage"),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum RejectionReason {
    /// The cell was empty or could not be read as a number.
    Missing,
    /// NaN or infinite.
    NotFinite,
    OutOfRange,
}

/// Why a row did not make it to the detector.
#[derive(PartialEq, Debug, Clone)]
pub struct Rejection {
    pub id: RecordId,
    pub field: RecordField,
    pub reason: RejectionReason,
    pub value: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct ValidationReport {
    pub records: Vec<GeoRecord>,
    pub rejections: Vec<Rejection>,
}

impl ValidationReport {
    /// The number of rejections for each field, in field order. Fields without
    /// any rejection are left out.
    pub fn rejection_counts(&self) -> Vec<(RecordField, usize)> {
        [
            RecordField::Latitude,
            RecordField::Longitude,
            RecordField::Percentage,
        ]
        .iter()
        .map(|field| {
            let count = self
                .rejections
                .iter()
                .filter(|r| r.field == *field)
                .count();
            (*field, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

// ******** Output data structures *********

/// One side of a candidate pair.
#[derive(PartialEq, Debug, Clone)]
pub struct PairEndpoint {
    pub id: RecordId,
    pub coordinates: Coordinates,
    /// The original percentage, scaled to percentage points.
    pub percentage_points: f64,
    pub address: [String; 3],
}

impl PairEndpoint {
    pub fn from_record(record: &GeoRecord) -> PairEndpoint {
        PairEndpoint {
            id: record.id,
            coordinates: record.coordinates,
            percentage_points: record.percentage * 100.0,
            address: record.address.clone(),
        }
    }
}

/// Two records that are close to each other but report divergent percentages.
///
/// `first` always comes before `second` in the input order.
#[derive(PartialEq, Debug, Clone)]
pub struct CandidatePair {
    pub first: PairEndpoint,
    pub second: PairEndpoint,
    pub distance_km: f64,
    /// In percentage points.
    pub percentage_diff: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct DetectionResult {
    pub pairs: Vec<CandidatePair>,
    pub pairs_evaluated: u64,
}

/// Errors that prevent the detector from running.
#[derive(PartialEq, Debug, Clone)]
pub enum DetectionErrors {
    InvalidThreshold { name: &'static str, value: f64 },
}

impl Error for DetectionErrors {}

impl Display for DetectionErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionErrors::InvalidThreshold { name, value } => write!(
                f,
                "invalid threshold {}: {} (must be a non-negative number)",
                name, value
            ),
        }
    }
}

// ********* Configuration **********

/// The two filters applied to every pair.
///
/// Percentages in the input are fractions. The divergence threshold is in
/// percentage points: the default of 10 flags pairs whose shares differ by at
/// least ten points (0.10 as a fraction).
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Thresholds {
    /// Maximum great-circle distance, in km. Inclusive.
    pub proximity_threshold_km: f64,
    /// Minimum difference, in percentage points. Inclusive.
    pub percentage_diff_threshold: f64,
}

impl Thresholds {
    pub const DEFAULT: Thresholds = Thresholds {
        proximity_threshold_km: 1.0,
        percentage_diff_threshold: 10.0,
    };

    pub fn qualifies(&self, distance_km: f64, percentage_diff: f64) -> bool {
        distance_km <= self.proximity_threshold_km
            && percentage_diff >= self.percentage_diff_threshold
    }

    pub fn check(&self) -> Result<(), DetectionErrors> {
        let checks = [
            ("proximity_threshold_km", self.proximity_threshold_km),
            ("percentage_diff_threshold", self.percentage_diff_threshold),
        ];
        for (name, value) in checks {
            if value.is_nan() || value < 0.0 {
                return Err(DetectionErrors::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds::DEFAULT
    }
}
