//! In-memory collaborators for resolver tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use osm_geocoder_database::DbError;
use osm_geocoder_models::{AddressFields, Candidate, NearbyMatch, ParsedAddress, ProjectedPoint};

use crate::config::{ResolverSettings, TableNames};
use crate::deadline::Deadline;
use crate::parser::AddressParser;
use crate::ring::RingQuery;
use crate::store::AddressStore;
use crate::strategy::{RankKey, SearchQuery, SortDirection};

pub fn settings() -> ResolverSettings {
    ResolverSettings::new(TableNames::new("house", "postcode", "admin").unwrap())
}

pub fn address(road: &str, house_number: &str) -> AddressFields {
    AddressFields {
        house: None,
        road: Some(road.to_string()),
        house_number: Some(house_number.to_string()),
        postcode: Some("12345".to_string()),
        city: Some("Springfield".to_string()),
    }
}

pub fn candidate(
    road: &str,
    house_number: &str,
    trigram_distance: f64,
    location: ProjectedPoint,
) -> Candidate {
    Candidate {
        address: address(road, house_number),
        location,
        trigram_distance,
        distance: None,
    }
}

pub fn nearby(road: &str, house_number: &str, distance: f64) -> NearbyMatch {
    NearbyMatch {
        address: address(road, house_number),
        distance,
    }
}

/// Parser returning a fixed result and recording what it was asked.
pub struct FixedParser {
    parsed: ParsedAddress,
    queries: Mutex<Vec<String>>,
}

impl FixedParser {
    pub fn new(parsed: ParsedAddress) -> Self {
        Self {
            parsed,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AddressParser for FixedParser {
    async fn parse(&self, raw: &str, _deadline: Deadline) -> ParsedAddress {
        self.queries.lock().unwrap().push(raw.to_string());
        self.parsed.clone()
    }
}

/// Store answering from canned rows.
///
/// Searches are ordered by the query's rank terms the way the database
/// would; ring answers are keyed by radius.
#[derive(Default)]
pub struct FakeStore {
    candidates: Vec<Candidate>,
    rings: Vec<(f64, Vec<NearbyMatch>)>,
    fail: bool,
    delay: Option<Duration>,
    searches: Mutex<Vec<SearchQuery>>,
    ring_radii: Mutex<Vec<f64>>,
}

impl FakeStore {
    pub fn with_candidates(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    pub fn with_rings(rings: Vec<(f64, Vec<NearbyMatch>)>) -> Self {
        Self {
            rings,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn searches(&self) -> Vec<SearchQuery> {
        self.searches.lock().unwrap().clone()
    }

    pub fn ring_radii(&self) -> Vec<f64> {
        self.ring_radii.lock().unwrap().clone()
    }

    async fn respond(&self) -> Result<(), DbError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DbError::Connection {
                message: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AddressStore for FakeStore {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Candidate>, DbError> {
        self.searches.lock().unwrap().push(query.clone());
        self.respond().await?;

        let mut rows = self.candidates.clone();
        rows.sort_by(|a, b| {
            query.order.iter().fold(std::cmp::Ordering::Equal, |acc, term| {
                let value = |c: &Candidate| match term.key {
                    RankKey::CenterDistance => c.distance.unwrap_or_default(),
                    RankKey::TrigramDistance => c.trigram_distance,
                };
                let ordering = value(a).total_cmp(&value(b));
                acc.then(match term.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                })
            })
        });
        rows.truncate(usize::try_from(query.limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn nearby(&self, query: &RingQuery) -> Result<Vec<NearbyMatch>, DbError> {
        self.ring_radii.lock().unwrap().push(query.radius);
        self.respond().await?;

        Ok(self
            .rings
            .iter()
            .find(|(radius, _)| (radius - query.radius).abs() < f64::EPSILON)
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}
