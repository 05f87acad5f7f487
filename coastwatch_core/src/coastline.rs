//! The Coastline Reference Index - Geographic Ground Truth Layer
//!
//! Holds the static set of named coastal reference points (major ports,
//! beaches, island groups) that anchor every geographic plausibility
//! check, and answers one query: "how far is this point from the known
//! coastline, and which stretch of coast is that?"
//!
//! The index is loaded once at startup and shared read-only across
//! concurrent verifications. Lookup is an O(N) haversine scan over a
//! small fixed N (~53 points) - no spatial index is warranted at this
//! scale, but the `NearestCoastline` trait keeps the seam open for a
//! k-d tree or R-tree swap without touching callers.

use geo::HaversineDistance;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location validation errors.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("Longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("Coordinate is not a finite number")]
    NotFinite,
}

/// A WGS84 latitude/longitude pair.
///
/// Value type: `Copy`, immutable by convention once constructed.
/// `new` enforces real-world ranges; data arriving through serde is
/// re-checked by the engine before orchestration begins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, positive north
    pub latitude: f64,

    /// Longitude in degrees, positive east
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a validated GeoPoint.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        let point = Self {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    /// Checks real-world coordinate ranges.
    pub fn validate(&self) -> Result<(), LocationError> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(LocationError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(LocationError::LatitudeOutOfRange(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(LocationError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }

    /// Great-circle distance to another point in kilometers.
    pub fn haversine_km(&self, other: &GeoPoint) -> f64 {
        let a: geo::Point<f64> = (*self).into();
        let b: geo::Point<f64> = (*other).into();
        a.haversine_distance(&b) / 1000.0
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(p: GeoPoint) -> Self {
        // geo convention: x = longitude, y = latitude
        geo::Point::new(p.longitude, p.latitude)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Named stretch of coastline a reference point belongs to.
///
/// Drives the inland/offshore heuristic in the geofence layer:
/// west-coast water lies to the west, east-coast water to the east,
/// island water is everything beyond a short radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoastalRegion {
    /// Arabian Sea coast (Gujarat down to Kerala)
    WestCoast,

    /// Bay of Bengal coast (Tamil Nadu up to West Bengal)
    EastCoast,

    /// Andaman & Nicobar and Lakshadweep groups
    Islands,
}

impl std::fmt::Display for CoastalRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CoastalRegion::WestCoast => "west coast",
            CoastalRegion::EastCoast => "east coast",
            CoastalRegion::Islands => "island group",
        };
        write!(f, "{}", name)
    }
}

/// A single named coastal reference point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoastlineReferencePoint {
    /// Reference location on (or very near) the waterline
    pub location: GeoPoint,

    /// Human-readable name (port, beach, or island)
    pub name: String,

    /// Which stretch of coast this point anchors
    pub region: CoastalRegion,
}

impl CoastlineReferencePoint {
    /// Creates a reference point from raw parts.
    pub fn new(name: &str, latitude: f64, longitude: f64, region: CoastalRegion) -> Self {
        Self {
            location: GeoPoint {
                latitude,
                longitude,
            },
            name: name.to_string(),
            region,
        }
    }
}

/// Result of a nearest-coastline lookup.
#[derive(Debug, Clone)]
pub struct NearestReference<'a> {
    /// The closest known reference point
    pub point: &'a CoastlineReferencePoint,

    /// Great-circle distance to it in kilometers
    pub distance_km: f64,
}

/// Lookup seam for the coastline index.
///
/// The shipped implementation is a linear haversine scan; a spatial
/// index can implement this trait without any caller changes.
pub trait NearestCoastline: Send + Sync {
    /// Returns the nearest reference point, or `None` if the index is empty.
    fn nearest(&self, point: &GeoPoint) -> Option<NearestReference<'_>>;

    /// Number of reference points loaded.
    fn len(&self) -> usize;

    /// True when no reference data is loaded.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The static coastline reference index.
#[derive(Debug, Clone, Default)]
pub struct CoastlineIndex {
    points: Vec<CoastlineReferencePoint>,
}

// Reference tables: (name, latitude, longitude). Coordinates are port /
// beach / jetty locations rounded to two decimals - precise enough for
// a 20-30 km fence.
const WEST_COAST: &[(&str, f64, f64)] = &[
    ("Kandla Port", 23.03, 70.22),
    ("Mundra Port", 22.84, 69.72),
    ("Okha", 22.47, 69.07),
    ("Dwarka", 22.24, 68.97),
    ("Porbandar", 21.64, 69.61),
    ("Veraval", 20.90, 70.37),
    ("Diu", 20.71, 70.98),
    ("Bhavnagar", 21.77, 72.15),
    ("Hazira", 21.11, 72.65),
    ("Daman", 20.42, 72.83),
    ("Mumbai Harbour", 18.94, 72.84),
    ("Alibag", 18.64, 72.87),
    ("Ratnagiri", 16.99, 73.31),
    ("Panaji", 15.50, 73.83),
    ("Mormugao Port", 15.41, 73.80),
    ("Karwar", 14.81, 74.13),
    ("Malpe", 13.35, 74.70),
    ("New Mangalore Port", 12.91, 74.81),
    ("Kasaragod", 12.50, 74.99),
    ("Kannur", 11.87, 75.36),
    ("Kozhikode", 11.25, 75.78),
    ("Kochi", 9.97, 76.24),
    ("Alappuzha", 9.49, 76.32),
    ("Kollam", 8.89, 76.59),
    ("Vizhinjam", 8.38, 76.99),
    ("Kanyakumari", 8.08, 77.55),
];

const EAST_COAST: &[(&str, f64, f64)] = &[
    ("Tuticorin Port", 8.76, 78.13),
    ("Rameswaram", 9.29, 79.31),
    ("Nagapattinam", 10.77, 79.84),
    ("Cuddalore", 11.75, 79.77),
    ("Puducherry", 11.93, 79.83),
    ("Mahabalipuram", 12.62, 80.19),
    ("Chennai Port", 13.08, 80.29),
    ("Ennore", 13.21, 80.32),
    ("Krishnapatnam", 14.25, 80.12),
    ("Machilipatnam", 16.17, 81.13),
    ("Kakinada", 16.94, 82.26),
    ("Visakhapatnam Port", 17.69, 83.22),
    ("Gopalpur", 19.26, 84.91),
    ("Satapada", 19.67, 85.45),
    ("Puri", 19.80, 85.83),
    ("Paradip Port", 20.27, 86.61),
    ("Chandipur", 21.45, 87.02),
    ("Digha", 21.63, 87.51),
    ("Haldia", 22.03, 88.06),
    ("Sagar Island", 21.65, 88.08),
];

const ISLANDS: &[(&str, f64, f64)] = &[
    ("Port Blair", 11.62, 92.73),
    ("Havelock Island", 12.03, 92.98),
    ("Diglipur", 13.25, 93.00),
    ("Car Nicobar", 9.16, 92.76),
    ("Kavaratti", 10.57, 72.64),
    ("Agatti", 10.86, 72.19),
    ("Minicoy", 8.28, 73.05),
];

impl CoastlineIndex {
    /// Creates an index from an explicit point set.
    pub fn from_points(points: Vec<CoastlineReferencePoint>) -> Self {
        Self { points }
    }

    /// The built-in Indian coastline reference set (~53 points).
    pub fn indian_coastline() -> Self {
        let mut points = Vec::with_capacity(WEST_COAST.len() + EAST_COAST.len() + ISLANDS.len());
        for &(name, lat, lon) in WEST_COAST {
            points.push(CoastlineReferencePoint::new(name, lat, lon, CoastalRegion::WestCoast));
        }
        for &(name, lat, lon) in EAST_COAST {
            points.push(CoastlineReferencePoint::new(name, lat, lon, CoastalRegion::EastCoast));
        }
        for &(name, lat, lon) in ISLANDS {
            points.push(CoastlineReferencePoint::new(name, lat, lon, CoastalRegion::Islands));
        }
        Self { points }
    }

    /// All loaded reference points.
    pub fn points(&self) -> &[CoastlineReferencePoint] {
        &self.points
    }
}

impl NearestCoastline for CoastlineIndex {
    fn nearest(&self, point: &GeoPoint) -> Option<NearestReference<'_>> {
        let mut best: Option<NearestReference<'_>> = None;
        for reference in &self.points {
            let distance_km = point.haversine_km(&reference.location);
            let closer = match &best {
                Some(current) => distance_km < current.distance_km,
                None => true,
            };
            if closer {
                best = Some(NearestReference {
                    point: reference,
                    distance_km,
                });
            }
        }
        best
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}
