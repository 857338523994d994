#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address resolution against a prepared OpenStreetMap `PostGIS` dataset.
//!
//! The dataset holds three tables in web mercator (EPSG:3857): buildings,
//! postal-code areas and administrative boundaries. [`Geocoder`] resolves
//! queries in both directions:
//!
//! - **Forward** ([`Geocoder::forward`]): free text is split into address
//!   components by an external parsing service ([`parser`]), a
//!   [`strategy`] is chosen from the components that are present, and the
//!   ranked buildings are formatted and unprojected to WGS84.
//! - **Reverse** ([`Geocoder::reverse`]): the point is projected once and
//!   searched with [`ring`] queries of increasing radius until one yields a
//!   building.
//!
//! Parser outages degrade to treating the whole query as a road name.
//! Database failures, configuration errors and expired deadlines are the
//! only errors surfaced; "no match" is an empty list or `None`.
//!
//! # Usage
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use osm_geocoder::Geocoder;
//! use osm_geocoder::config::GeocoderConfig;
//!
//! let config = GeocoderConfig::load(std::path::Path::new("geocoder.toml"))?;
//! let geocoder = Geocoder::connect(&config).await?;
//!
//! for result in geocoder.forward("Hauptstraße 5, Berlin", None, None).await? {
//!     println!("{} ({}, {})", result.display_name, result.location.lat, result.location.lon);
//! }
//!
//! if let Some(hit) = geocoder.reverse(52.5163, 13.3777).await? {
//!     println!("{}", hit.display_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod deadline;
pub mod formatter;
pub mod forward;
pub mod parser;
pub mod projection;
pub mod reverse;
pub mod ring;
pub mod store;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use osm_geocoder_database::{DbError, db};
use thiserror::Error;

pub use osm_geocoder_models::{
    AddressFields, Candidate, GeocodeResult, GeographicPoint, NearbyMatch, ParsedAddress,
    ProjectedPoint, ReverseGeocodeResult, SearchStrategy,
};

use crate::config::{ConfigError, GeocoderConfig, ResolverSettings};
use crate::deadline::{Deadline, DeadlineExceeded};
use crate::formatter::{AddressFormatter, TemplateFormatter};
use crate::parser::{AddressParser, HttpAddressParser};
use crate::store::{AddressStore, PostgisStore};

/// Errors surfaced by the geocoder.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// A database statement or connection failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// The configuration was rejected before any query ran.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request outlived its deadline while waiting on the database.
    #[error("Request deadline exceeded")]
    DeadlineExceeded(#[from] DeadlineExceeded),
}

/// Forward and reverse address resolution over a `PostGIS` dataset.
///
/// Cheap to share behind an `Arc`; every call is independent and checks out
/// its own database connection.
pub struct Geocoder {
    settings: ResolverSettings,
    store: Arc<dyn AddressStore>,
    parser: Arc<dyn AddressParser>,
    formatter: Arc<dyn AddressFormatter>,
}

impl Geocoder {
    /// Assembles a geocoder from its collaborators.
    #[must_use]
    pub fn new(
        settings: ResolverSettings,
        store: Arc<dyn AddressStore>,
        parser: Arc<dyn AddressParser>,
        formatter: Arc<dyn AddressFormatter>,
    ) -> Self {
        Self {
            settings,
            store,
            parser,
            formatter,
        }
    }

    /// Validates `config`, loads the address templates and opens the
    /// connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Config`] if the configuration or template
    /// file is invalid (checked before connecting), and
    /// [`GeocodeError::Database`] if the pool cannot be opened.
    pub async fn connect(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let settings = config.validate()?;
        let parser_url = config.parser_url()?;

        let formatter = match &config.formatter_templates {
            Some(path) => TemplateFormatter::load(path, config.country.as_deref())?,
            None => TemplateFormatter::default(),
        };

        log::info!("Connecting to database...");
        let pool = db::connect_pool(
            &config.database.url,
            config.database.pool_size,
            config.statement_timeout(),
        )
        .await?;

        Ok(Self::new(
            settings,
            Arc::new(PostgisStore::new(pool)),
            Arc::new(HttpAddressParser::new(&parser_url)),
            Arc::new(formatter),
        ))
    }

    /// The validated settings this geocoder runs with.
    #[must_use]
    pub const fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Deadline applied by the calls that do not take one.
    #[must_use]
    pub fn default_deadline(&self) -> Deadline {
        self.settings
            .request_timeout
            .map_or_else(Deadline::none, Deadline::after)
    }
}
