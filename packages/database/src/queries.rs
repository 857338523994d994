//! Execution and row mapping for geocoder queries.
//!
//! The SQL itself is assembled by the caller with [`crate::sql::SqlBuilder`];
//! these functions only run it and turn rows into model types. Column names
//! are the aliases the geocoder's query builders emit.

use moosicbox_json_utils::database::ToValue as _;
use osm_geocoder_models::{AddressFields, Candidate, NearbyMatch, ProjectedPoint};
use switchy_database::{Database, Row};

use crate::DbError;
use crate::sql::SqlQuery;

/// Runs a forward-geocoding search and maps each row to a [`Candidate`].
///
/// Expects the columns `house`, `road`, `house_number`, `postcode`, `city`,
/// `trgm_dist`, `x`, `y` and, when `with_distance` is set, `dist`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a required column is missing.
pub async fn fetch_candidates(
    db: &dyn Database,
    query: &SqlQuery,
    with_distance: bool,
) -> Result<Vec<Candidate>, DbError> {
    let rows = db.query_raw_params(&query.sql, &query.params).await?;

    rows.iter()
        .map(|row| row_to_candidate(row, with_distance))
        .collect()
}

/// Runs a ring query and maps each row to a [`NearbyMatch`].
///
/// Expects the columns `house`, `road`, `house_number`, `postcode`, `city`
/// and `distance`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a required column is missing.
pub async fn fetch_nearby(
    db: &dyn Database,
    query: &SqlQuery,
) -> Result<Vec<NearbyMatch>, DbError> {
    let rows = db.query_raw_params(&query.sql, &query.params).await?;

    rows.iter()
        .map(|row| {
            Ok(NearbyMatch {
                address: row_to_address(row),
                distance: required_f64(row, "distance")?,
            })
        })
        .collect()
}

fn row_to_candidate(row: &Row, with_distance: bool) -> Result<Candidate, DbError> {
    let distance = if with_distance {
        Some(required_f64(row, "dist")?)
    } else {
        None
    };

    Ok(Candidate {
        address: row_to_address(row),
        location: ProjectedPoint::new(required_f64(row, "x")?, required_f64(row, "y")?),
        trigram_distance: row.to_value("trgm_dist").unwrap_or(0.0),
        distance,
    })
}

fn row_to_address(row: &Row) -> AddressFields {
    AddressFields {
        house: row.to_value("house").unwrap_or(None),
        road: row.to_value("road").unwrap_or(None),
        house_number: row.to_value("house_number").unwrap_or(None),
        postcode: row.to_value("postcode").unwrap_or(None),
        city: row.to_value("city").unwrap_or(None),
    }
}

fn required_f64(row: &Row, column: &str) -> Result<f64, DbError> {
    row.to_value(column).map_err(|e| DbError::Conversion {
        message: format!("Failed to read column '{column}': {e}"),
    })
}
