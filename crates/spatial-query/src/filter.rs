//! Attribute filters built from repeated query parameters.

use std::collections::{BTreeMap, BTreeSet};

use map_common::LayerDescriptor;

/// Accepted values per column.
///
/// A column absent from the map is unrestricted. A column present always
/// has at least one value; the filter never means "exclude everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeFilter {
    constraints: BTreeMap<String, BTreeSet<String>>,
}

impl AttributeFilter {
    /// The unrestricted filter.
    pub fn none() -> Self {
        Self::default()
    }

    /// Collect the layer's filter parameters out of raw query pairs.
    ///
    /// Parameters the layer does not bind are ignored. Values are trimmed
    /// and blank ones dropped, so `?jm=&jm=%20` leaves `jm` unrestricted.
    pub fn from_params<'a, I>(layer: &LayerDescriptor, params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let pairs: Vec<(&str, &str)> = params.into_iter().collect();

        layer
            .filters
            .iter()
            .fold(Self::none(), |filter, binding| {
                let values = pairs
                    .iter()
                    .filter(|(key, _)| *key == binding.param)
                    .map(|(_, value)| *value);
                filter.with_values(&binding.column, values)
            })
    }

    /// Restrict `column` to `values` after normalising them.
    pub fn with_values<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = normalize_values(values);
        if !normalized.is_empty() {
            self.constraints
                .entry(column.to_string())
                .or_default()
                .extend(normalized);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&BTreeSet<String>> {
        self.constraints.get(column)
    }

    /// Active constraints in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.constraints.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Stable key fragment for response caching.
    pub fn cache_key(&self) -> String {
        if self.is_empty() {
            return "all".to_string();
        }
        // JSON quoting keeps separators inside values from merging entries.
        serde_json::to_string(&self.constraints).unwrap_or_default()
    }
}

/// Trim each value and drop the blank ones.
pub fn normalize_values<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
