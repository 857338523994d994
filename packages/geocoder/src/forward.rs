//! Forward geocoding: free text to ranked coordinates.

use osm_geocoder_models::{GeocodeResult, GeographicPoint};

use crate::deadline::Deadline;
use crate::projection::{to_geographic, to_projected};
use crate::strategy::build_search;
use crate::{GeocodeError, Geocoder};

impl Geocoder {
    /// Resolves a free-text address using the default request deadline.
    ///
    /// See [`Geocoder::forward_within`].
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the search statement fails or times out.
    pub async fn forward(
        &self,
        query: &str,
        country: Option<&str>,
        center: Option<GeographicPoint>,
    ) -> Result<Vec<GeocodeResult>, GeocodeError> {
        self.forward_within(query, country, center, self.default_deadline())
            .await
    }

    /// Resolves a free-text address.
    ///
    /// Results come back in ranking order: nearest to `center` first when a
    /// center is given, then by trigram distance to the parsed road. An
    /// empty list means nothing matched.
    ///
    /// `country` is accepted for interface compatibility but does not
    /// restrict the search.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Database`] if the search statement fails and
    /// [`GeocodeError::DeadlineExceeded`] if it outlives `deadline`. Parser
    /// failures are not errors.
    pub async fn forward_within(
        &self,
        query: &str,
        country: Option<&str>,
        center: Option<GeographicPoint>,
        deadline: Deadline,
    ) -> Result<Vec<GeocodeResult>, GeocodeError> {
        if let Some(country) = country {
            log::debug!("Ignoring country '{country}' for forward query {query:?}");
        }

        let center = center.map(to_projected);
        let parsed = self.parser.parse(query, deadline).await;

        let search = build_search(
            &self.settings.tables,
            &parsed,
            center,
            self.settings.forward_limit,
        );

        let candidates = deadline.run(self.store.search(&search)).await??;

        log::debug!(
            "Forward query {query:?} matched {} building(s) via {}",
            candidates.len(),
            search.strategy
        );

        Ok(candidates
            .iter()
            .map(|candidate| GeocodeResult {
                display_name: self.formatter.format(&candidate.address),
                location: to_geographic(candidate.location),
            })
            .collect())
    }
}
