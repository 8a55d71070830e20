//! Layer catalog loader.
//!
//! Loads `config/layers.yaml`: the layer descriptors, the catalog-wide
//! simplified/full cut point and the named layer groups served as composed
//! tiles. The catalog is loaded once at startup and never changes.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

use map_common::LayerDescriptor;
use spatial_query::{ResolutionPolicy, DEFAULT_SIMPLIFIED_MAX_ZOOM};

/// Top-level path segments owned by fixed routes. A group may not use them.
const RESERVED_PATHS: &[&str] = &[
    "tiles", "geojson", "api", "vwtiles", "health", "ready", "metrics",
];

/// A named set of layers served as one multi-layer tile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayerGroup {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub layers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct YamlCatalogFile {
    #[serde(default = "default_simplified_max_zoom")]
    simplified_max_zoom: u32,
    #[serde(default)]
    attribution: Option<String>,
    layers: Vec<LayerDescriptor>,
    #[serde(default)]
    groups: Vec<LayerGroup>,
}

fn default_simplified_max_zoom() -> u32 {
    DEFAULT_SIMPLIFIED_MAX_ZOOM
}

/// All layers known to the server, indexed for request lookup.
#[derive(Debug, Clone)]
pub struct LayerCatalog {
    policy: ResolutionPolicy,
    attribution: Option<String>,
    layers: Vec<LayerDescriptor>,
    by_id: HashMap<String, usize>,
    by_setback: HashMap<String, usize>,
    groups: Vec<LayerGroup>,
}

impl LayerCatalog {
    /// Load and validate a catalog file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read layer catalog: {:?}", path))?;
        let catalog = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid layer catalog: {:?}", path))?;

        info!(
            layers = catalog.layers.len(),
            groups = catalog.groups.len(),
            simplified_max_zoom = catalog.policy.simplified_max_zoom,
            "Layer catalog loaded"
        );
        Ok(catalog)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let file: YamlCatalogFile =
            serde_yaml::from_str(contents).context("Failed to parse layer catalog YAML")?;
        Self::build(file)
    }

    fn build(file: YamlCatalogFile) -> Result<Self> {
        let mut by_id = HashMap::new();
        let mut by_setback = HashMap::new();

        for (index, layer) in file.layers.iter().enumerate() {
            layer.validate()?;
            if by_id.insert(layer.id.clone(), index).is_some() {
                bail!("duplicate layer id '{}'", layer.id);
            }
        }

        for (index, layer) in file.layers.iter().enumerate() {
            if let Some(setback) = &layer.setback {
                if by_id.contains_key(&setback.endpoint) {
                    bail!(
                        "setback endpoint '{}' of layer '{}' shadows a layer id",
                        setback.endpoint,
                        layer.id
                    );
                }
                if by_setback.insert(setback.endpoint.clone(), index).is_some() {
                    bail!("duplicate setback endpoint '{}'", setback.endpoint);
                }
            }
        }

        let mut group_ids = HashSet::new();
        for group in &file.groups {
            if RESERVED_PATHS.contains(&group.id.as_str()) {
                bail!("group id '{}' collides with a fixed route", group.id);
            }
            if !group_ids.insert(group.id.as_str()) {
                bail!("duplicate group id '{}'", group.id);
            }
            if group.layers.is_empty() {
                bail!("group '{}' has no layers", group.id);
            }
            for member in &group.layers {
                if !by_id.contains_key(member) {
                    bail!("group '{}' references unknown layer '{}'", group.id, member);
                }
            }
        }

        Ok(Self {
            policy: ResolutionPolicy {
                simplified_max_zoom: file.simplified_max_zoom,
            },
            attribution: file.attribution,
            layers: file.layers,
            by_id,
            by_setback,
            groups: file.groups,
        })
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    pub fn attribution(&self) -> Option<&str> {
        self.attribution.as_deref()
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    pub fn layer(&self, id: &str) -> Option<&LayerDescriptor> {
        self.by_id.get(id).map(|&i| &self.layers[i])
    }

    /// The layer whose buffers are served under `/geojson/{endpoint}`.
    pub fn setback_layer(&self, endpoint: &str) -> Option<&LayerDescriptor> {
        self.by_setback.get(endpoint).map(|&i| &self.layers[i])
    }

    pub fn groups(&self) -> &[LayerGroup] {
        &self.groups
    }

    pub fn group(&self, id: &str) -> Option<&LayerGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Member layers of `group`, in declared order.
    pub fn group_layers<'a>(
        &'a self,
        group: &'a LayerGroup,
    ) -> impl Iterator<Item = &'a LayerDescriptor> + 'a {
        group.layers.iter().filter_map(move |id| self.layer(id))
    }
}
