#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the OSM geocoder.
//!
//! This crate contains only data types and simple conversions. It has no
//! I/O and no database or HTTP dependencies, so it can be shared between
//! the resolver, the database layer and any front end.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A geographic coordinate in WGS84 degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicPoint {
    /// Latitude in degrees, `-90..=90`.
    pub lat: f64,
    /// Longitude in degrees, `-180..=180`.
    pub lon: f64,
}

impl GeographicPoint {
    /// Creates a new geographic point.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A projected coordinate in meters (spherical web mercator, EPSG:3857).
///
/// All geometries in the database are stored in this system, so every
/// spatial predicate is evaluated against a `ProjectedPoint`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    /// Easting in meters.
    pub x: f64,
    /// Northing in meters.
    pub y: f64,
}

impl ProjectedPoint {
    /// Creates a new projected point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Address components as segmented by the address-parsing service.
///
/// Any field may be absent. Blank strings are treated as absent once
/// [`ParsedAddress::normalized`] has been applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAddress {
    /// Street name.
    #[serde(default)]
    pub road: Option<String>,
    /// House number, kept as text (e.g. `"12a"`).
    #[serde(default)]
    pub house_number: Option<String>,
    /// Postal code.
    #[serde(default)]
    pub postcode: Option<String>,
    /// City or municipality name.
    #[serde(default)]
    pub city: Option<String>,
}

impl ParsedAddress {
    /// Treats the whole raw query as a road name.
    ///
    /// This is the degraded result used whenever the parsing service cannot
    /// be consulted.
    #[must_use]
    pub fn road_only(raw: &str) -> Self {
        Self {
            road: Some(raw.to_string()),
            ..Self::default()
        }
    }

    /// Trims every field and drops the ones that end up empty.
    #[must_use]
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            road: clean(self.road),
            house_number: clean(self.house_number),
            postcode: clean(self.postcode),
            city: clean(self.city),
        }
    }

    /// Returns `true` if no component is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.road.is_none()
            && self.house_number.is_none()
            && self.postcode.is_none()
            && self.city.is_none()
    }
}

/// How a forward query locates its candidate buildings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SearchStrategy {
    /// Buildings inside the matching postal-code area.
    PostcodeBased,
    /// Buildings inside the fuzzily matching municipality.
    CityBased,
    /// All buildings, filtered only by road and house number.
    RoadOnly,
}

impl SearchStrategy {
    /// Selects the strategy for a parsed address.
    ///
    /// A postcode wins over a city; without either the search falls back
    /// to road and house number only.
    #[must_use]
    pub const fn select(parsed: &ParsedAddress) -> Self {
        if parsed.postcode.is_some() {
            Self::PostcodeBased
        } else if parsed.city.is_some() {
            Self::CityBased
        } else {
            Self::RoadOnly
        }
    }
}

/// The address tuple that identifies a match and feeds the formatter.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AddressFields {
    /// Building name, if the building has one.
    pub house: Option<String>,
    /// Street name.
    pub road: Option<String>,
    /// House number.
    pub house_number: Option<String>,
    /// Postal code of the containing postal-code area.
    pub postcode: Option<String>,
    /// Name of the containing municipality.
    pub city: Option<String>,
}

/// A raw forward-geocoding match as returned by the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Address components of the building.
    pub address: AddressFields,
    /// Building centroid.
    pub location: ProjectedPoint,
    /// Trigram distance between the stored road and the queried road
    /// (`0` when no road was queried).
    pub trigram_distance: f64,
    /// Distance from the search center, when one was supplied.
    pub distance: Option<f64>,
}

/// A building found near a reverse-geocoding point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyMatch {
    /// Address components of the building.
    pub address: AddressFields,
    /// Distance from the query point in projected units (meters).
    pub distance: f64,
}

/// A formatted forward-geocoding result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// Human-readable address.
    pub display_name: String,
    /// Location of the building centroid.
    pub location: GeographicPoint,
}

/// A formatted reverse-geocoding result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseGeocodeResult {
    /// Human-readable address of the nearest building.
    pub display_name: String,
    /// Distance from the query point to that building in meters.
    pub distance: f64,
}
