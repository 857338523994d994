//! Forward-geocoding query construction.
//!
//! Picks a [`SearchStrategy`] from the parsed address and assembles the
//! matching `PostGIS` statement:
//!
//! 1. **Postcode**: buildings whose centroid lies in the postal-code area,
//!    with the municipality left-joined.
//! 2. **City**: buildings whose centroid lies in a fuzzily matching
//!    municipality (`admin_level = 6`), with the postal-code area
//!    left-joined.
//! 3. **Road only**: all buildings, both areas left-joined.
//!
//! Road and house number become trigram similarity filters (`%`). Rows are
//! ranked by distance from the optional center first, then by trigram
//! distance to the queried road.

use osm_geocoder_database::sql::{SqlBuilder, SqlQuery};
use osm_geocoder_models::{ParsedAddress, ProjectedPoint, SearchStrategy};
use switchy_database::DatabaseValue;

use crate::config::TableNames;
use crate::projection::WEB_MERCATOR_SRID;

/// Default maximum number of forward results.
pub const DEFAULT_FORWARD_LIMIT: u32 = 20;

/// `admin_level` of the boundaries that carry municipality names.
pub const CITY_ADMIN_LEVEL: i32 = 6;

/// Direction of an `ORDER BY` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// The value a forward result is ranked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKey {
    /// Distance between the building centroid and the search center.
    CenterDistance,
    /// Trigram distance between the building's road and the queried road.
    TrigramDistance,
}

/// One `ORDER BY` term of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    /// Ranked value.
    pub key: RankKey,
    /// Sort direction.
    pub direction: SortDirection,
}

impl OrderTerm {
    const fn column(self) -> &'static str {
        match self.key {
            RankKey::CenterDistance => "dist",
            RankKey::TrigramDistance => "trgm_dist",
        }
    }

    const fn keyword(self) -> &'static str {
        match self.direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// A fully built forward-geocoding statement.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Strategy the statement implements.
    pub strategy: SearchStrategy,
    /// Statement text and bound values.
    pub sql: SqlQuery,
    /// Ranking terms, most significant first.
    pub order: Vec<OrderTerm>,
    /// Row cap.
    pub limit: u32,
}

impl SearchQuery {
    /// Whether the statement selects a `dist` column.
    #[must_use]
    pub fn has_center(&self) -> bool {
        self.order
            .iter()
            .any(|term| term.key == RankKey::CenterDistance)
    }
}

/// Builds the forward-geocoding statement for a parsed address.
///
/// Every address value, the center coordinates and the limit are bound
/// parameters; only the validated table identifiers are spliced into the
/// text. An address without any component produces an unfiltered scan
/// bounded by `limit`.
#[must_use]
pub fn build_search(
    tables: &TableNames,
    parsed: &ParsedAddress,
    center: Option<ProjectedPoint>,
    limit: u32,
) -> SearchQuery {
    let mut sql = SqlBuilder::new();
    let mut filters: Vec<String> = Vec::new();

    let trgm_dist = parsed.road.as_ref().map_or_else(
        || "0".to_string(),
        |road| format!("b.road <-> {}", sql.bind(DatabaseValue::String(road.clone()))),
    );

    sql.push("SELECT b.name AS house, b.road, b.house_number, pc.postcode, a.name AS city, ");
    sql.push(&format!("({trgm_dist})::float8 AS trgm_dist, "));
    sql.push("ST_X(ST_Centroid(b.geometry)) AS x, ST_Y(ST_Centroid(b.geometry)) AS y");

    let mut order = Vec::with_capacity(2);
    if let Some(center) = center {
        let point = sql.bind_point(center.x, center.y, WEB_MERCATOR_SRID);
        sql.push(&format!(
            ", ST_Distance(ST_Centroid(b.geometry), {point}) AS dist"
        ));
        order.push(OrderTerm {
            key: RankKey::CenterDistance,
            direction: SortDirection::Ascending,
        });
    }
    order.push(OrderTerm {
        key: RankKey::TrigramDistance,
        direction: SortDirection::Descending,
    });

    let strategy = if let Some(postcode) = &parsed.postcode {
        sql.push(" FROM ")
            .push_identifier(&tables.postcode)
            .push(" pc JOIN ")
            .push_identifier(&tables.buildings)
            .push(" b ON ST_Contains(pc.geometry, ST_Centroid(b.geometry))");
        push_admin_join(&mut sql, tables);

        filters.push(format!(
            "pc.postcode = {}",
            sql.bind(DatabaseValue::String(postcode.clone()))
        ));
        SearchStrategy::PostcodeBased
    } else if let Some(city) = &parsed.city {
        sql.push(" FROM ")
            .push_identifier(&tables.admin)
            .push(" a JOIN ")
            .push_identifier(&tables.buildings)
            .push(" b ON ST_Contains(a.geometry, ST_Centroid(b.geometry))");
        push_postcode_join(&mut sql, tables);

        filters.push(format!(
            "a.name % {}",
            sql.bind(DatabaseValue::String(city.clone()))
        ));
        filters.push(format!("a.admin_level = {CITY_ADMIN_LEVEL}"));
        SearchStrategy::CityBased
    } else {
        sql.push(" FROM ")
            .push_identifier(&tables.buildings)
            .push(" b");
        push_postcode_join(&mut sql, tables);
        push_admin_join(&mut sql, tables);
        SearchStrategy::RoadOnly
    };
    debug_assert_eq!(strategy, SearchStrategy::select(parsed));

    if let Some(road) = &parsed.road {
        filters.push(format!(
            "b.road % {}",
            sql.bind(DatabaseValue::String(road.clone()))
        ));
    }
    if let Some(house_number) = &parsed.house_number {
        filters.push(format!(
            "b.house_number % {}",
            sql.bind(DatabaseValue::String(house_number.clone()))
        ));
    }

    if !filters.is_empty() {
        sql.push(" WHERE ").push(&filters.join(" AND "));
    }

    let order_by = order
        .iter()
        .map(|term| format!("{} {}", term.column(), term.keyword()))
        .collect::<Vec<_>>()
        .join(", ");
    sql.push(" ORDER BY ").push(&order_by);

    sql.push(" LIMIT ")
        .push_bind(DatabaseValue::Int64(i64::from(limit)));

    log::debug!(
        "Built {strategy} search with {} filter(s), center: {}",
        filters.len(),
        center.is_some()
    );

    SearchQuery {
        strategy,
        sql: sql.build(),
        order,
        limit,
    }
}

/// Left-joins the postal-code area containing each building centroid.
pub(crate) fn push_postcode_join(sql: &mut SqlBuilder, tables: &TableNames) {
    sql.push(" LEFT JOIN ")
        .push_identifier(&tables.postcode)
        .push(" pc ON ST_Contains(pc.geometry, ST_Centroid(b.geometry))");
}

/// Left-joins the municipality containing each building centroid.
pub(crate) fn push_admin_join(sql: &mut SqlBuilder, tables: &TableNames) {
    sql.push(" LEFT JOIN ")
        .push_identifier(&tables.admin)
        .push(&format!(
            " a ON (a.admin_level = {CITY_ADMIN_LEVEL} AND ST_Contains(a.geometry, ST_Centroid(b.geometry)))"
        ));
}
