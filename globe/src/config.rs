use crate::{
    constellation::{ConstellationConfig, UpdatePolicy},
    driver::DEFAULT_FRAME_RATE,
    frame::MARKER_RADIUS,
    session::SessionOptions,
    units::Timestamp,
};
use regex::Regex;
use serde::Deserialize;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tlecatalog::{LayoutHint, ParseOptions};
use tletypes::prelude::{CatalogNumber, OrbitalRecord, UtcTimestamp};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file")]
    Toml(#[from] toml::de::Error),
    #[error("Object configuration contains an invalid 'matches' regex")]
    Regex(#[from] regex::Error),
    #[error("Object configurations must contain exactly one of the fields 'id', 'name', or 'matches'")]
    Selector,
    #[error("Duplicate configuration entry for object {0}")]
    DuplicateSelector(String),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Catalog file, relative paths are taken relative to the working directory
    pub catalog: Option<PathBuf>,
    pub layout: Option<CatalogLayout>,
    pub strict: Option<bool>,
    pub marker_radius: Option<f64>,
    pub frame_rate: Option<f64>,
    pub time_warp: Option<f64>,
    /// RFC 3339 string, e.g. '2008-09-20T13:00:00Z'
    pub start_time: Option<UtcTimestamp>,
    pub update: Option<Update>,
    #[serde(alias = "object")]
    pub objects: Vec<Object>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogLayout {
    #[default]
    Auto,
    Grouped,
    Tagged,
}

impl From<CatalogLayout> for LayoutHint {
    fn from(value: CatalogLayout) -> Self {
        match value {
            CatalogLayout::Auto => LayoutHint::Auto,
            CatalogLayout::Grouped => LayoutHint::Grouped,
            CatalogLayout::Tagged => LayoutHint::Tagged,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdatePolicyKind {
    #[default]
    All,
    RoundRobin,
}

#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Update {
    pub policy: UpdatePolicyKind,
    pub per_frame: Option<usize>,
}

/// Include filter entry, selects objects by catalog number, exact name or regex
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Object {
    pub id: Option<CatalogNumber>,
    pub name: Option<String>,
    pub matches: Option<String>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_str_checked(&content)
    }

    pub fn from_str_checked(s: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(r) = self.marker_radius {
            positive("marker-radius", r)?;
        }
        if let Some(r) = self.frame_rate {
            positive("frame-rate", r)?;
        }
        if let Some(w) = self.time_warp {
            if !w.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field: "time-warp",
                    reason: format!("{w} is not finite"),
                });
            }
        }
        if let Some(Update {
            policy: UpdatePolicyKind::RoundRobin,
            per_frame: Some(0),
        }) = self.update
        {
            return Err(ConfigError::InvalidValue {
                field: "per-frame",
                reason: "must be at least 1".to_owned(),
            });
        }

        let mut seen = HashSet::new();
        for obj in self.objects.iter() {
            let key = match (&obj.id, &obj.name, &obj.matches) {
                (Some(id), None, None) => format!("id={id}"),
                (None, Some(name), None) => format!("name='{}'", name.trim()),
                (None, None, Some(re)) => {
                    Regex::new(re)?;
                    format!("matches='{re}'")
                }
                _ => return Err(ConfigError::Selector),
            };
            if !seen.insert(key.clone()) {
                return Err(ConfigError::DuplicateSelector(key));
            }
        }

        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            layout: self.layout.unwrap_or_default().into(),
            strict: self.strict.unwrap_or(false),
        }
    }

    pub fn update_policy(&self) -> UpdatePolicy {
        match &self.update {
            Some(Update {
                policy: UpdatePolicyKind::RoundRobin,
                per_frame,
            }) => UpdatePolicy::RoundRobin {
                per_frame: per_frame.unwrap_or(1).max(1),
            },
            _ => UpdatePolicy::All,
        }
    }

    pub fn constellation_config(&self) -> ConstellationConfig {
        ConstellationConfig {
            radius: self.marker_radius.unwrap_or(MARKER_RADIUS),
            policy: self.update_policy(),
        }
    }

    pub fn object_filter(&self) -> Result<ObjectFilter, ConfigError> {
        let selectors = self
            .objects
            .iter()
            .map(|obj| match (&obj.id, &obj.name, &obj.matches) {
                (Some(id), None, None) => Ok(Selector::Id(*id)),
                (None, Some(name), None) => Ok(Selector::Name(name.trim().to_owned())),
                (None, None, Some(re)) => Ok(Selector::Matches(Regex::new(re)?)),
                _ => Err(ConfigError::Selector),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ObjectFilter { selectors })
    }

    pub fn session_options(&self) -> Result<SessionOptions, ConfigError> {
        Ok(SessionOptions {
            parse: self.parse_options(),
            constellation: self.constellation_config(),
            filter: self.object_filter()?,
        })
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate.unwrap_or(DEFAULT_FRAME_RATE)
    }

    pub fn time_warp(&self) -> f64 {
        self.time_warp.unwrap_or(1.0)
    }

    pub fn start_time(&self) -> Option<Timestamp> {
        self.start_time.map(Timestamp::from_utc)
    }
}

fn positive(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("{v} is not a positive number"),
        })
    }
}

#[derive(Clone, Debug)]
enum Selector {
    Id(CatalogNumber),
    Name(String),
    Matches(Regex),
}

impl Selector {
    fn matches_record(&self, record: &OrbitalRecord) -> bool {
        match self {
            Selector::Id(id) => record.catalog_number() == Some(*id),
            Selector::Name(name) => record.name == *name,
            Selector::Matches(re) => {
                re.is_match(&record.name)
                    || record
                        .catalog_number()
                        .map(|n| re.is_match(&n.to_string()))
                        .unwrap_or(false)
            }
        }
    }
}

/// Objects admitted into a session; an empty filter admits everything
#[derive(Clone, Debug, Default)]
pub struct ObjectFilter {
    selectors: Vec<Selector>,
}

impl ObjectFilter {
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn admits(&self, record: &OrbitalRecord) -> bool {
        self.selectors.is_empty() || self.selectors.iter().any(|s| s.matches_record(record))
    }
}
