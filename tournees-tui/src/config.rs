use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tournees_core::model::LonLat;

/// Nice, used when nothing on screen has a position.
const DEFAULT_CENTER: [f64; 2] = [7.26, 43.70];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub supabase: SupabaseConfig,
    pub map: MapConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SupabaseConfig {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct MapConfig {
    /// `[lon, lat]`.
    pub fallback_center: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SourceConfig {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub(crate) enum SourceKind {
    Supabase { table: String },
    Csv { path: PathBuf },
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_owned(),
            key: String::new(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            fallback_center: DEFAULT_CENTER,
        }
    }
}

impl MapConfig {
    pub(crate) fn fallback(&self) -> LonLat {
        let [lon, lat] = self.fallback_center;
        LonLat::new(lon, lat)
    }
}

impl Config {
    pub(crate) fn from_file_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("parsing config {}", path.display()))?
        } else {
            tracing::info!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };

        if config.sources.is_empty() {
            config.sources = default_sources();
        }
        Ok(config)
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            id: "pnr".to_owned(),
            name: "PNR Préalpes d'Azur".to_owned(),
            kind: SourceKind::Supabase {
                table: "tournees".to_owned(),
            },
        },
        SourceConfig {
            id: "catl".to_owned(),
            name: "CATL Liège".to_owned(),
            kind: SourceKind::Supabase {
                table: "tournees_catl".to_owned(),
            },
        },
    ]
}
