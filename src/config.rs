//! # Controller Settings
//!
//! Conventions shared by every controller mounted on a host: where views
//! live, which extension they carry, and which action is chosen when a route
//! does not name one.
//!
//! Settings are read from a YAML (`.yaml`/`.yml`) or JSON file. A missing
//! file yields the defaults, and any key absent from the file keeps its
//! default value:
//!
//! ```yaml
//! views_dir: views
//! views_ext: hbs
//! default_action: index
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Host-wide controller conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory of views, one sub-directory per controller
    pub views_dir: PathBuf,
    /// View file extension, with or without the leading dot
    pub views_ext: String,
    /// Suffix appended to controller names by file-based loaders
    pub controller_name_affix: String,
    /// Action used when the route does not name one
    pub default_action: String,
    /// Query parameter naming the JSONP callback
    pub jsonp_callback: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            views_dir: PathBuf::from("views"),
            views_ext: String::new(),
            controller_name_affix: "Controller".to_string(),
            default_action: "index".to_string(),
            jsonp_callback: "callback".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let settings = if is_yaml {
            serde_yaml::from_str(&content)
                .with_context(|| format!("invalid YAML in {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON in {}", path.display()))?
        };
        Ok(settings)
    }

    /// View extension normalised to `.ext`, or empty when none is configured.
    #[must_use]
    pub fn normalized_views_ext(&self) -> String {
        let ext = self.views_ext.trim();
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        if ext.is_empty() {
            String::new()
        } else {
            format!(".{ext}")
        }
    }

    /// Conventional view path for an action: `<views_dir>/<controller>/<action><ext>`.
    #[must_use]
    pub fn view_path(&self, controller: &str, action: &str) -> PathBuf {
        let file = format!("{action}{}", self.normalized_views_ext());
        self.views_dir.join(controller).join(file)
    }
}
