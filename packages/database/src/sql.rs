//! Parameterized SQL assembly.
//!
//! Queries are built from fixed SQL fragments, validated table
//! [`Identifier`]s and bound values. Values never become part of the SQL
//! text: [`SqlBuilder::bind`] records the value and returns its `$n`
//! placeholder.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use switchy_database::DatabaseValue;

/// Unquoted identifier, optionally schema-qualified (`schema.table`).
static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}(\.[A-Za-z_][A-Za-z0-9_]{0,62})?$")
        .expect("valid regex")
});

/// Error for a table name that is not a plain SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid SQL identifier: {name:?}")]
pub struct InvalidIdentifier {
    /// The rejected name.
    pub name: String,
}

/// A validated SQL identifier that is safe to splice into query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validates `name` as an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentifier`] unless `name` consists of ASCII letters,
    /// digits and underscores (not starting with a digit), with at most one
    /// schema qualifier.
    pub fn new(name: &str) -> Result<Self, InvalidIdentifier> {
        if IDENTIFIER_RE.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(InvalidIdentifier {
                name: name.to_string(),
            })
        }
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A finished SQL statement with its bound parameters.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    /// Statement text using `$1..$n` placeholders.
    pub sql: String,
    /// Values for the placeholders, in order.
    pub params: Vec<DatabaseValue>,
}

/// Incremental builder for a [`SqlQuery`].
#[derive(Debug, Default)]
pub struct SqlBuilder {
    sql: String,
    params: Vec<DatabaseValue>,
}

impl SqlBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fixed SQL fragment.
    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    /// Appends a validated identifier.
    pub fn push_identifier(&mut self, identifier: &Identifier) -> &mut Self {
        self.sql.push_str(identifier.as_str());
        self
    }

    /// Records a bound value and returns its placeholder (`$n`).
    ///
    /// The placeholder can be spliced more than once to reuse the value.
    pub fn bind(&mut self, value: DatabaseValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    /// Binds a value and appends its placeholder.
    pub fn push_bind(&mut self, value: DatabaseValue) -> &mut Self {
        let placeholder = self.bind(value);
        self.sql.push_str(&placeholder);
        self
    }

    /// Appends a web mercator point built from two bound coordinates.
    ///
    /// Returns the SQL expression so it can be reused within the statement.
    pub fn bind_point(&mut self, x: f64, y: f64, srid: i32) -> String {
        let x = self.bind(DatabaseValue::Real64(x));
        let y = self.bind(DatabaseValue::Real64(y));
        format!("ST_SetSRID(ST_MakePoint({x}, {y}), {srid})")
    }

    /// Number of parameters bound so far.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Finishes the statement.
    #[must_use]
    pub fn build(self) -> SqlQuery {
        SqlQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}
