use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::selection::DEFAULT_FEATURED_CAP;

const DEFAULT_ENV_PREFIX: &str = "VITA";
const DEFAULT_MANIFEST: &str = "assets/blog/manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub banner: BannerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentConfig {
    /// Post file (YAML or JSON). The bundled posts are used when unset.
    #[serde(default)]
    pub posts_file: Option<PathBuf>,
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,
    #[serde(default)]
    pub manifest_file: Option<PathBuf>,
    #[serde(default = "default_featured_cap")]
    pub featured_cap: usize,
    #[serde(default = "default_true")]
    pub dedupe_ids: bool,
    #[serde(default = "default_header_image_dir")]
    pub header_image_dir: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            posts_file: None,
            asset_root: default_asset_root(),
            manifest_file: None,
            featured_cap: default_featured_cap(),
            dedupe_ids: true,
            header_image_dir: default_header_image_dir(),
        }
    }
}

impl ContentConfig {
    /// Manifest path, defaulting to `assets/blog/manifest.json` under the
    /// asset root. The asset root is the site root the manifest paths are
    /// relative to.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_file
            .clone()
            .unwrap_or_else(|| self.asset_root.join(DEFAULT_MANIFEST))
    }
}

fn default_asset_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_featured_cap() -> usize {
    DEFAULT_FEATURED_CAP
}

fn default_header_image_dir() -> PathBuf {
    PathBuf::from("assets/images/blog_headers")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

fn default_language() -> String {
    "en".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_speech_command")]
    pub speech_command: Vec<String>,
    #[serde(default = "default_audio_command")]
    pub audio_command: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speech_command: default_speech_command(),
            audio_command: default_audio_command(),
        }
    }
}

fn default_speech_command() -> Vec<String> {
    vec!["espeak-ng".into(), "%TEXT%".into()]
}

fn default_audio_command() -> Vec<String> {
    vec![
        "mpv".into(),
        "--no-video".into(),
        "--really-quiet".into(),
        "%FILE%".into(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BannerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rotate_every", with = "humantime_serde")]
    pub rotate_every: Duration,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rotate_every: default_rotate_every(),
        }
    }
}

fn default_rotate_every() -> Duration {
    Duration::from_secs(8)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log directory. Logging stays off when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    /// Preferences database. Defaults to the user data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

/// Defaults, then the YAML file (missing fields keep their defaults), then
/// `<PREFIX>_SECTION__FIELD` environment overrides.
pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    let path = options.config_file.or_else(default_config_path);
    if let Some(path) = path.as_ref() {
        if path.exists() {
            cfg = read_config_file(path)?;
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    for (key, value) in load_env(prefix) {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn load_env(prefix: &str) -> HashMap<String, String> {
    let upper_prefix = format!("{}_", prefix.to_uppercase());
    env::vars()
        .filter_map(|(key, value)| {
            key.strip_prefix(&upper_prefix)
                .map(|stripped| (stripped.to_ascii_lowercase().replace("__", "."), value))
        })
        .collect()
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "content.posts_file" => cfg.content.posts_file = Some(PathBuf::from(value)),
        "content.asset_root" => cfg.content.asset_root = PathBuf::from(value),
        "content.manifest_file" => cfg.content.manifest_file = Some(PathBuf::from(value)),
        "content.featured_cap" => match value.trim().parse::<usize>() {
            Ok(parsed) => cfg.content.featured_cap = parsed,
            Err(_) => log::warn!("config: ignoring featured_cap {value:?}"),
        },
        "content.dedupe_ids" => cfg.content.dedupe_ids = parse_bool(&value),
        "content.header_image_dir" => cfg.content.header_image_dir = PathBuf::from(value),
        "ui.language" => cfg.ui.language = value,
        "player.speech_command" => cfg.player.speech_command = parse_list(&value),
        "player.audio_command" => cfg.player.audio_command = parse_list(&value),
        "banner.enabled" => cfg.banner.enabled = parse_bool(&value),
        "banner.rotate_every" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.banner.rotate_every = duration;
            }
        }
        "logging.level" => cfg.logging.level = value,
        "logging.dir" => cfg.logging.dir = Some(PathBuf::from(value)),
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vita-reader").join("config.yaml"))
}
