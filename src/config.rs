//! User configuration, loaded from `<config dir>/parqtui/config.toml`.
//! Missing file or missing keys fall back to defaults; an unparseable file
//! warns on stderr and falls back rather than aborting startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Pages of rows fetched ahead of the visible window.
    pub pages_lookahead: usize,
    /// Pages of rows fetched behind the visible window.
    pub pages_lookback: usize,
    /// Rows per fetched page; 0 sizes pages to the viewport height.
    pub page_size: usize,
    /// Shade every other data row.
    pub alternate_row_shading: bool,
    /// Width of the sidebar (SQL editor + schema panel) in terminal columns.
    pub sidebar_width: u16,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            pages_lookahead: 3,
            pages_lookback: 1,
            page_size: 0,
            alternate_row_shading: true,
            sidebar_width: 34,
        }
    }
}

pub fn config_file_path(app_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(app_name).join("config.toml"))
}

pub fn load_app_config(app_name: &str) -> AppConfig {
    let Some(path) = config_file_path(app_name) else {
        return AppConfig::default();
    };
    let Ok(text) = std::fs::read_to_string(&path) else {
        return AppConfig::default();
    };
    match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring invalid config {}: {e}", path.display());
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.display.pages_lookahead, 3);
        assert_eq!(config.display.pages_lookback, 1);
        assert_eq!(config.display.page_size, 0);
        assert!(config.display.alternate_row_shading);
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_keys() {
        let config: AppConfig = toml::from_str(
            r#"
            [display]
            pages_lookahead = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.display.pages_lookahead, 5);
        assert_eq!(config.display.pages_lookback, 1);
        assert_eq!(config.display.sidebar_width, 34);
    }

    #[test]
    fn empty_config_parses() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.display.sidebar_width, 34);
    }
}
