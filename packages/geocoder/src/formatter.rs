//! Display formatting of matched addresses.
//!
//! Formatting is a pluggable capability ([`AddressFormatter`]). The bundled
//! [`TemplateFormatter`] renders a multi-line template per country, e.g.
//!
//! ```toml
//! default = "{house}\n{road} {house_number}\n{postcode} {city}"
//!
//! [countries]
//! us = "{house}\n{house_number} {road}\n{city} {postcode}"
//! ```
//!
//! Placeholders without a value render empty; lines that end up blank are
//! dropped and the rest are joined with `", "`.

use std::collections::BTreeMap;
use std::path::Path;

use osm_geocoder_models::AddressFields;
use serde::Deserialize;

use crate::config::ConfigError;

/// Template used when no template file or country entry applies.
pub const DEFAULT_TEMPLATE: &str = "{house}\n{road} {house_number}\n{postcode} {city}";

/// Turns an address tuple into a display string.
pub trait AddressFormatter: Send + Sync {
    /// Formats `address` for display.
    fn format(&self, address: &AddressFields) -> String;
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    countries: BTreeMap<String, String>,
}

/// Line-template based [`AddressFormatter`].
#[derive(Debug, Clone)]
pub struct TemplateFormatter {
    template: String,
}

impl Default for TemplateFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl TemplateFormatter {
    /// Creates a formatter from a template string.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Picks the template for `country` from TOML template text.
    ///
    /// Falls back to the file's `default` entry and then to
    /// [`DEFAULT_TEMPLATE`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text is malformed.
    pub fn from_toml_str(contents: &str, country: Option<&str>) -> Result<Self, ConfigError> {
        let mut file: TemplateFile = toml::from_str(contents)?;

        let by_country = country.and_then(|code| file.countries.remove(&code.to_lowercase()));
        if by_country.is_none() {
            if let Some(code) = country {
                log::debug!("No address template for country '{code}', using default");
            }
        }

        Ok(by_country
            .or(file.default)
            .map_or_else(Self::default, Self::new))
    }

    /// Loads the template for `country` from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path, country: Option<&str>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, country)
    }
}

impl AddressFormatter for TemplateFormatter {
    fn format(&self, address: &AddressFields) -> String {
        let values = [
            ("{house}", address.house.as_deref()),
            ("{road}", address.road.as_deref()),
            ("{house_number}", address.house_number.as_deref()),
            ("{postcode}", address.postcode.as_deref()),
            ("{city}", address.city.as_deref()),
        ];

        self.template
            .lines()
            .map(|line| {
                let rendered = values.iter().fold(line.to_string(), |acc, (key, value)| {
                    acc.replace(key, value.unwrap_or_default())
                });
                rendered.split_whitespace().collect::<Vec<_>>().join(" ")
            })
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
