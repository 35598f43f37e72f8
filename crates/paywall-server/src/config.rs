//! Server Configuration

use std::path::PathBuf;

pub const BIND_ADDR_VAR: &str = "BIND_ADDR";
pub const DIST_DIR_VAR: &str = "PAYWALL_DIST_DIR";
pub const INDEX_HTML_VAR: &str = "PAYWALL_INDEX_HTML";
pub const STYLESHEET_VAR: &str = "PAYWALL_STYLESHEET";

/// Where to listen and what to serve
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Build output holding the bundle
    pub dist_dir: PathBuf,

    /// Demo page copied into `dist_dir` at startup
    pub index_html: PathBuf,

    /// Widget stylesheet copied into `dist_dir` at startup
    pub stylesheet: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            dist_dir: PathBuf::from("dist"),
            index_html: PathBuf::from("index.html"),
            stylesheet: PathBuf::from("crates/paywall-widget/style/paywall.css"),
        }
    }
}

impl ServerConfig {
    /// Read from the environment, falling back to the defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            bind_addr: var(BIND_ADDR_VAR).unwrap_or(defaults.bind_addr),
            dist_dir: var(DIST_DIR_VAR).map_or(defaults.dist_dir, PathBuf::from),
            index_html: var(INDEX_HTML_VAR).map_or(defaults.index_html, PathBuf::from),
            stylesheet: var(STYLESHEET_VAR).map_or(defaults.stylesheet, PathBuf::from),
        }
    }
}
