//! Ring queries for reverse geocoding.
//!
//! A ring query fetches the buildings within one radius of a point, nearest
//! first, and [`collapse`] folds rows that describe the same address (a
//! building can join more than one postal-code or municipality polygon)
//! into a single match at the smallest distance.

use std::collections::BTreeMap;

use osm_geocoder_database::sql::{SqlBuilder, SqlQuery};
use osm_geocoder_models::{AddressFields, NearbyMatch, ProjectedPoint};
use switchy_database::DatabaseValue;

use crate::config::TableNames;
use crate::projection::WEB_MERCATOR_SRID;
use crate::strategy::{push_admin_join, push_postcode_join};

/// The statement for one radius of a reverse lookup.
#[derive(Debug, Clone)]
pub struct RingQuery {
    /// Search radius in meters.
    pub radius: f64,
    /// Row cap.
    pub limit: u32,
    /// Statement text and bound values.
    pub sql: SqlQuery,
}

/// Builds the ring query around `center`.
#[must_use]
pub fn build_ring(
    tables: &TableNames,
    center: ProjectedPoint,
    radius: f64,
    limit: u32,
) -> RingQuery {
    let mut sql = SqlBuilder::new();
    let point = sql.bind_point(center.x, center.y, WEB_MERCATOR_SRID);

    sql.push("SELECT b.name AS house, b.road, b.house_number, pc.postcode, a.name AS city, ")
        .push(&format!("ST_Distance(b.geometry, {point}) AS distance"))
        .push(" FROM ")
        .push_identifier(&tables.buildings)
        .push(" b");
    push_postcode_join(&mut sql, tables);
    push_admin_join(&mut sql, tables);

    let radius_param = sql.bind(DatabaseValue::Real64(radius));
    sql.push(&format!(
        " WHERE ST_DWithin(b.geometry, {point}, {radius_param})"
    ))
    .push(" ORDER BY distance ASC LIMIT ")
    .push_bind(DatabaseValue::Int64(i64::from(limit)));

    RingQuery {
        radius,
        limit,
        sql: sql.build(),
    }
}

/// Groups rows by address and keeps each group's minimum distance.
///
/// Groups are ordered by that minimum, nearest first; equal distances keep
/// the order in which their addresses first appeared. At most `limit`
/// groups are returned.
#[must_use]
pub fn collapse(rows: Vec<NearbyMatch>, limit: usize) -> Vec<NearbyMatch> {
    let mut index: BTreeMap<AddressFields, usize> = BTreeMap::new();
    let mut groups: Vec<NearbyMatch> = Vec::with_capacity(rows.len());

    for row in rows {
        if let Some(&slot) = index.get(&row.address) {
            let group = &mut groups[slot];
            group.distance = group.distance.min(row.distance);
        } else {
            index.insert(row.address.clone(), groups.len());
            groups.push(row);
        }
    }

    // `sort_by` is stable, so ties keep first-seen order.
    groups.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    groups.truncate(limit);
    groups
}
