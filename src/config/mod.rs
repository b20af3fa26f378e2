#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TaskboardError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub board: BoardConfig,
    pub heuristic: HeuristicConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoardConfig {
    pub csv_path: String,
    pub audit_path: String,
    pub save_with_time: bool,
    pub user: String,
    pub owners: Vec<String>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            csv_path: "~/.local/share/taskboard/tasks.csv".to_owned(),
            audit_path: "~/.local/share/taskboard/audit.csv".to_owned(),
            save_with_time: true,
            user: String::new(),
            owners: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeuristicConfig {
    pub keywords: Vec<String>,
    pub stale_days: i64,
    pub match_description: bool,
    pub match_next_action: bool,
    pub match_notes: bool,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            keywords: crate::board::candidates::DEFAULT_KEYWORDS
                .iter()
                .map(|k| (*k).to_owned())
                .collect(),
            stale_days: crate::board::candidates::DEFAULT_STALE_DAYS,
            match_description: true,
            match_next_action: true,
            match_notes: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub icons: bool,
    pub stale_highlight_days: i64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            icons: true,
            stale_highlight_days: 7,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), TaskboardError> {
        if self.board.csv_path.trim().is_empty() {
            return Err(TaskboardError::Config(
                "board.csv_path must not be empty".to_owned(),
            ));
        }
        if self.board.audit_path.trim().is_empty() {
            return Err(TaskboardError::Config(
                "board.audit_path must not be empty".to_owned(),
            ));
        }
        if self.heuristic.stale_days < 1 {
            return Err(TaskboardError::Config(
                "heuristic.stale_days must be >= 1".to_owned(),
            ));
        }
        if !self.heuristic.match_description
            && !self.heuristic.match_next_action
            && !self.heuristic.match_notes
        {
            return Err(TaskboardError::Config(
                "at least one heuristic.match_* field must be enabled".to_owned(),
            ));
        }
        if self.ui.stale_highlight_days < 1 {
            return Err(TaskboardError::Config(
                "ui.stale_highlight_days must be >= 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Identity recorded in the audit log.
    #[must_use]
    pub fn audit_user(&self) -> String {
        let user = self.board.user.trim();
        if !user.is_empty() {
            return user.to_owned();
        }
        std::env::var("USER").unwrap_or_else(|_| "unknown".to_owned())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
}

pub fn default_paths() -> anyhow::Result<ConfigPaths> {
    let unix = home_config_path_unix();
    if !cfg!(windows) {
        return Ok(ConfigPaths { config_file: unix });
    }

    // Windows: prefer the Unix-style path if present for portability.
    if unix.exists() {
        return Ok(ConfigPaths { config_file: unix });
    }

    let proj = ProjectDirs::from("com", "taskboard", "taskboard")
        .context("failed to determine platform config directory")?;
    Ok(ConfigPaths {
        config_file: proj.config_dir().join("config.toml"),
    })
}

fn home_config_path_unix() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("taskboard").join("config.toml")
}

fn home_dir() -> Option<PathBuf> {
    if let Some(v) = std::env::var_os("HOME") {
        return Some(PathBuf::from(v));
    }
    if let Some(v) = std::env::var_os("USERPROFILE") {
        return Some(PathBuf::from(v));
    }
    let drive = std::env::var_os("HOMEDRIVE");
    let path = std::env::var_os("HOMEPATH");
    match (drive, path) {
        (Some(d), Some(p)) => Some(PathBuf::from(d).join(PathBuf::from(p))),
        _ => None,
    }
}

#[must_use]
pub fn expand_tilde(input: &str) -> String {
    if let Some(rest) = input.strip_prefix("~/")
        && let Some(home) = home_dir()
    {
        return home.join(rest).to_string_lossy().to_string();
    }
    input.to_owned()
}

pub fn expand_path(input: &str) -> anyhow::Result<PathBuf> {
    let expanded = expand_env_vars(&expand_tilde(input));
    let p = PathBuf::from(expanded);
    if p.is_absolute() {
        return Ok(p);
    }
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(cwd.join(p))
}

fn expand_env_vars(input: &str) -> String {
    // Expand $VAR and ${VAR}. Leave unknown vars untouched.
    let re = regex::Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?")
        .unwrap_or_else(|_| regex::Regex::new("$^").unwrap());
    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        std::env::var(key).unwrap_or_else(|_| caps[0].to_owned())
    })
    .to_string()
}

pub fn load() -> anyhow::Result<(Config, toml_edit::DocumentMut, ConfigPaths)> {
    let paths = default_paths()?;
    let (doc, cfg) = load_from_file(&paths.config_file)?;
    cfg.validate()?;
    Ok((cfg, doc, paths))
}

pub fn list_resolved_toml() -> anyhow::Result<String> {
    let (cfg, _doc, _paths) = load()?;
    Ok(toml::to_string_pretty(&cfg)?)
}

pub fn get_value_string(key: &str) -> anyhow::Result<Option<String>> {
    let paths = default_paths()?;
    get_value_string_at_path(&paths.config_file, key)
}

pub fn set_value_string(key: &str, value: &str) -> anyhow::Result<()> {
    let paths = default_paths()?;
    set_value_string_at_path(&paths.config_file, key, value)
}

fn load_from_file(path: &Path) -> anyhow::Result<(toml_edit::DocumentMut, Config)> {
    if !path.exists() {
        return Ok((toml_edit::DocumentMut::new(), Config::default()));
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let doc = raw
        .parse::<toml_edit::DocumentMut>()
        .with_context(|| format!("failed to parse TOML in {}", path.display()))?;

    let cfg: Config = toml::from_str(&raw)
        .with_context(|| format!("failed to deserialize TOML in {}", path.display()))?;
    Ok((doc, cfg))
}

pub fn get_value_string_at_path(path: &Path, key: &str) -> anyhow::Result<Option<String>> {
    let (_doc, cfg) = load_from_file(path)?;
    cfg.validate()?;

    let norm = normalize_key(key);
    let value = lookup_value(&cfg, &norm);
    Ok(value.map(format_value_for_stdout))
}

pub fn set_value_string_at_path(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let (mut doc, cfg) = load_from_file(path)?;
    cfg.validate()?;

    let norm = normalize_key(key);
    let key_type =
        key_type(&norm).ok_or_else(|| TaskboardError::InvalidConfigKey(key.to_owned()))?;
    let item = parse_value(key, value, key_type)?;
    apply_set(&mut doc, &norm, item)?;

    // Validate by re-parsing the updated doc into a Config.
    let new_raw = doc.to_string();
    let new_cfg: Config = toml::from_str(&new_raw)
        .with_context(|| format!("config update produced invalid TOML for {}", path.display()))?;
    new_cfg.validate()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, new_raw.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyType {
    Bool,
    Int,
    String,
    List,
}

fn normalize_key(key: &str) -> String {
    // Aliases matching the original board's secret names.
    match key {
        "csv_path" => "board.csv_path",
        "audit_path" => "board.audit_path",
        "save_with_time" => "board.save_with_time",
        "fixed_owners" | "owners" => "board.owners",
        "reply_keywords" | "keywords" => "heuristic.keywords",
        "stale_days" => "heuristic.stale_days",
        _ => key,
    }
    .to_owned()
}

fn key_type(key: &str) -> Option<KeyType> {
    Some(match key {
        "board.csv_path" | "board.audit_path" | "board.user" => KeyType::String,

        "board.save_with_time"
        | "heuristic.match_description"
        | "heuristic.match_next_action"
        | "heuristic.match_notes"
        | "ui.icons" => KeyType::Bool,

        "heuristic.stale_days" | "ui.stale_highlight_days" => KeyType::Int,

        "board.owners" | "heuristic.keywords" => KeyType::List,

        _ => return None,
    })
}

fn parse_value(key: &str, value: &str, key_type: KeyType) -> anyhow::Result<toml_edit::Item> {
    let item = match key_type {
        KeyType::Bool => toml_edit::value(parse_bool(value).map_err(|msg| {
            TaskboardError::InvalidConfigValue {
                key: key.to_owned(),
                msg,
            }
        })?),
        KeyType::Int => toml_edit::value(parse_int(value).map_err(|msg| {
            TaskboardError::InvalidConfigValue {
                key: key.to_owned(),
                msg,
            }
        })?),
        KeyType::String => toml_edit::value(value),
        KeyType::List => {
            // Comma-separated entries; blanks dropped.
            let mut arr = toml_edit::Array::new();
            for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                arr.push(entry);
            }
            toml_edit::value(arr)
        }
    };
    Ok(item)
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("expected true|false, got '{other}'")),
    }
}

fn parse_int(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|e| format!("expected integer, got '{s}': {e}"))
}

fn apply_set(
    doc: &mut toml_edit::DocumentMut,
    key: &str,
    value: toml_edit::Item,
) -> anyhow::Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return Err(TaskboardError::InvalidConfigKey(key.to_owned()).into());
    }

    let mut cur = doc.as_table_mut();
    for seg in &parts[..parts.len().saturating_sub(1)] {
        if !cur.contains_key(seg) {
            let mut t = toml_edit::Table::new();
            t.set_implicit(true);
            cur.insert(seg, toml_edit::Item::Table(t));
        }
        cur = cur[seg].as_table_mut().ok_or_else(|| {
            TaskboardError::Config(format!("cannot set {key}: '{seg}' is not a table"))
        })?;
    }

    let leaf = parts[parts.len() - 1];
    cur.insert(leaf, value);
    Ok(())
}

fn lookup_value(cfg: &Config, key: &str) -> Option<serde_json::Value> {
    let mut v = serde_json::to_value(cfg).ok()?;
    for seg in key.split('.').filter(|s| !s.is_empty()) {
        match v {
            serde_json::Value::Object(mut map) => {
                v = map.remove(seg)?;
            }
            _ => return None,
        }
    }
    Some(v)
}

fn format_value_for_stdout(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_owned(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|i| match i {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn config_validation_catches_invalid_values() {
        let mut cfg = Config::default();
        cfg.heuristic.stale_days = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.heuristic.match_description = false;
        cfg.heuristic.match_next_action = false;
        cfg.heuristic.match_notes = false;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.board.csv_path = "  ".to_owned();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_set_and_get_dot_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        set_value_string_at_path(&path, "ui.icons", "false").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "ui.icons")
                .unwrap()
                .as_deref(),
            Some("false")
        );

        set_value_string_at_path(&path, "csv_path", "~/board/tasks.csv").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "board.csv_path")
                .unwrap()
                .as_deref(),
            Some("~/board/tasks.csv")
        );

        set_value_string_at_path(&path, "heuristic.keywords", "返信待ち, 催促").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "keywords")
                .unwrap()
                .as_deref(),
            Some("返信待ち, 催促")
        );

        set_value_string_at_path(&path, "heuristic.stale_days", "14").unwrap();

        let (doc, cfg) = load_from_file(&path).unwrap();
        let _ = doc;
        cfg.validate().unwrap();
        assert!(!cfg.ui.icons);
        assert_eq!(cfg.board.csv_path, "~/board/tasks.csv");
        assert_eq!(cfg.heuristic.keywords, vec!["返信待ち", "催促"]);
        assert_eq!(cfg.heuristic.stale_days, 14);
    }

    #[test]
    fn invalid_keys_and_values_are_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        assert!(set_value_string_at_path(&path, "board.nope", "x").is_err());
        assert!(set_value_string_at_path(&path, "ui.icons", "maybe").is_err());
        // Valid key, but the resulting config fails validation.
        assert!(set_value_string_at_path(&path, "heuristic.stale_days", "0").is_err());
    }
}
