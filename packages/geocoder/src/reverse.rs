//! Reverse geocoding: a point to the nearest building address.
//!
//! The point is searched with ring queries of increasing radius. The first
//! radius that yields a building wins; larger radii are never queried.

use osm_geocoder_models::{GeographicPoint, ReverseGeocodeResult};

use crate::config::ConfigError;
use crate::deadline::Deadline;
use crate::projection::to_projected;
use crate::ring::{build_ring, collapse};
use crate::{GeocodeError, Geocoder};

/// Radii in meters tried when none are configured.
pub const DEFAULT_RADII: [f64; 3] = [25.0, 50.0, 100.0];

/// A non-empty, strictly increasing sequence of positive radii in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusEscalation(Vec<f64>);

impl Default for RadiusEscalation {
    fn default() -> Self {
        Self(DEFAULT_RADII.to_vec())
    }
}

impl RadiusEscalation {
    /// Validates a radius sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Radii`] if `radii` is empty, holds a value
    /// that is not a positive finite number, or is not strictly increasing.
    pub fn new(radii: Vec<f64>) -> Result<Self, ConfigError> {
        if radii.is_empty() {
            return Err(ConfigError::Radii {
                message: "at least one radius is required".to_string(),
            });
        }

        if let Some(bad) = radii.iter().find(|r| !r.is_finite() || **r <= 0.0) {
            return Err(ConfigError::Radii {
                message: format!("{bad} is not a positive distance"),
            });
        }

        if let Some(pair) = radii.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::Radii {
                message: format!("{} does not increase on {}", pair[1], pair[0]),
            });
        }

        Ok(Self(radii))
    }

    /// The radii, smallest first.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Geocoder {
    /// Finds the address nearest to a WGS84 point using the configured row
    /// limit and default request deadline.
    ///
    /// See [`Geocoder::reverse_within`].
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if a ring query fails or times out.
    pub async fn reverse(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Option<ReverseGeocodeResult>, GeocodeError> {
        self.reverse_within(lat, lon, self.settings.reverse_limit, self.default_deadline())
            .await
    }

    /// Finds the address nearest to a WGS84 point.
    ///
    /// Each radius fetches at most `limit` grouped matches. `None` means no
    /// building lies within the largest radius.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Database`] if a ring query fails and
    /// [`GeocodeError::DeadlineExceeded`] if the escalation outlives
    /// `deadline`.
    pub async fn reverse_within(
        &self,
        lat: f64,
        lon: f64,
        limit: u32,
        deadline: Deadline,
    ) -> Result<Option<ReverseGeocodeResult>, GeocodeError> {
        let center = to_projected(GeographicPoint::new(lat, lon));
        let max_groups = usize::try_from(limit).unwrap_or(usize::MAX);

        for &radius in self.settings.radii.as_slice() {
            let ring = build_ring(&self.settings.tables, center, radius, limit);
            let rows = deadline.run(self.store.nearby(&ring)).await??;

            if let Some(nearest) = collapse(rows, max_groups).into_iter().next() {
                log::debug!(
                    "Reverse ({lat}, {lon}) matched at {radius}m, {:.1}m away",
                    nearest.distance
                );
                return Ok(Some(ReverseGeocodeResult {
                    display_name: self.formatter.format(&nearest.address),
                    distance: nearest.distance,
                }));
            }

            log::debug!("No building within {radius}m of ({lat}, {lon})");
        }

        Ok(None)
    }
}
