use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::{
    HeaderFooterTemplate, TemplateError, DEFAULT_FOOTER_TEMPLATE, DEFAULT_HEADER_TEMPLATE,
};
use crate::units::DeviceUnits;

const DEFAULT_LAYOUT_HEIGHT_INFLATION: f64 = 1.25;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read print config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse print config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize print config {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write print config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid {slot} template: {source}")]
    Template {
        slot: &'static str,
        #[source]
        source: TemplateError,
    },
}

/// How the page count reported before settings negotiation is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageCountStrategy {
    /// Begin and immediately end a throwaway pagination pass.
    #[default]
    ScratchPagination,
    /// Ask the renderer for a count without entering print mode; renderers
    /// that cannot answer fall back to the scratch pass.
    SinglePass,
}

/// Engine tunables, stored as JSON.
/// 列印引擎的可調整設定，以 JSON 儲存。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintConfig {
    /// Extra height given to the viewport while printing; some layout
    /// engines shrink content that exactly fits the viewport.
    #[serde(default = "default_layout_height_inflation")]
    pub layout_height_inflation: f64,
    #[serde(default)]
    pub page_count_strategy: PageCountStrategy,
    #[serde(default = "default_true")]
    pub notify_page_count: bool,
    /// Unit of the geometry the host sends; overrides what the host reports.
    #[serde(default)]
    pub device_units: DeviceUnits,
    #[serde(default = "default_header_template")]
    pub header_template: String,
    #[serde(default = "default_footer_template")]
    pub footer_template: String,
}

fn default_layout_height_inflation() -> f64 {
    DEFAULT_LAYOUT_HEIGHT_INFLATION
}

fn default_true() -> bool {
    true
}

fn default_header_template() -> String {
    DEFAULT_HEADER_TEMPLATE.to_string()
}

fn default_footer_template() -> String {
    DEFAULT_FOOTER_TEMPLATE.to_string()
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            layout_height_inflation: DEFAULT_LAYOUT_HEIGHT_INFLATION,
            page_count_strategy: PageCountStrategy::default(),
            notify_page_count: true,
            device_units: DeviceUnits::default(),
            header_template: default_header_template(),
            footer_template: default_footer_template(),
        }
    }
}

impl PrintConfig {
    pub fn sanitize(&mut self) {
        if !self.layout_height_inflation.is_finite() {
            self.layout_height_inflation = DEFAULT_LAYOUT_HEIGHT_INFLATION;
        }
        self.layout_height_inflation = self.layout_height_inflation.max(1.0);
    }

    /// Parses the header and footer templates.
    pub fn templates(&self) -> Result<(HeaderFooterTemplate, HeaderFooterTemplate), ConfigError> {
        let header = HeaderFooterTemplate::parse(&self.header_template).map_err(|source| {
            ConfigError::Template {
                slot: "header",
                source,
            }
        })?;
        let footer = HeaderFooterTemplate::parse(&self.footer_template).map_err(|source| {
            ConfigError::Template {
                slot: "footer",
                source,
            }
        })?;
        Ok((header, footer))
    }

    /// Reads a config file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut config: PrintConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        config.sanitize();
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).map_err(|source| ConfigError::Serialize {
                path: path.to_path_buf(),
                source,
            })?;

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| ConfigError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, path).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
