use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::amount::AmountLocale;
use crate::categorizer::{default_rules, CategoryRule, DEFAULT_CATEGORY};
use crate::error::{PosError, Result};
use crate::tax::DEFAULT_TAX_RATE_PERCENT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    #[serde(default = "default_location_name")]
    pub location_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub pricing: PricingSettings,
    /// Evaluated top to bottom; the first rule with a matching keyword wins.
    #[serde(default = "default_rules")]
    pub category_rules: Vec<CategoryRule>,
    #[serde(default)]
    pub toteat: ToteatSettings,
    #[serde(default)]
    pub email: EmailSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    #[serde(default = "default_tax_rate")]
    pub tax_rate_percent: f64,
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default)]
    pub amount_locale: AmountLocale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToteatSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_user_id")]
    pub api_user_id: String,
    #[serde(default)]
    pub restaurant_id: String,
    #[serde(default = "default_local_id")]
    pub local_id: String,
    /// Read a saved API response instead of calling the API.
    #[serde(default)]
    pub use_local_file: bool,
    #[serde(default)]
    pub local_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    #[serde(default = "default_email_from")]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

fn default_location_name() -> String {
    "Domani Providencia".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE_PERCENT
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_api_url() -> String {
    "https://toteatdev.appspot.com/mw/or/1.0".to_string()
}

fn default_api_user_id() -> String {
    "1001".to_string()
}

fn default_local_id() -> String {
    "1".to_string()
}

fn default_email_from() -> String {
    "Domani Ventas <noreply@domani.cl>".to_string()
}

fn default_subject_prefix() -> String {
    "Ventas Domani".to_string()
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            tax_rate_percent: default_tax_rate(),
            default_category: default_category(),
            amount_locale: AmountLocale::default(),
        }
    }
}

impl Default for ToteatSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            api_user_id: default_api_user_id(),
            restaurant_id: String::new(),
            local_id: default_local_id(),
            use_local_file: false,
            local_file: String::new(),
        }
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            from: default_email_from(),
            to: String::new(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            location_name: default_location_name(),
            log_level: default_log_level(),
            pricing: PricingSettings::default(),
            category_rules: default_rules(),
            toteat: ToteatSettings::default(),
            email: EmailSettings::default(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("posreport")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("posreport")
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

/// Settings file merged with defaults, then environment overrides (`.env` included).
pub fn load_settings() -> Settings {
    let path = settings_path();
    let mut settings = if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    };
    let _ = dotenvy::dotenv();
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Applies the environment variables understood by the tool. `lookup` is the
/// variable source so tests need not touch the process environment.
pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("TOTEAT_API_URL") {
        settings.toteat.api_url = v;
    }
    if let Some(v) = get("TOTEAT_API_KEY") {
        settings.toteat.api_key = v;
    }
    if let Some(v) = get("TOTEAT_API_USER_ID") {
        settings.toteat.api_user_id = v;
    }
    if let Some(v) = get("TOTEAT_RESTAURANT_ID") {
        settings.toteat.restaurant_id = v;
    }
    if let Some(v) = get("TOTEAT_LOCAL_ID") {
        settings.toteat.local_id = v;
    }
    if let Some(v) = get("TOTEAT_USE_LOCAL_FILE") {
        settings.toteat.use_local_file = v.trim() == "true";
    }
    if let Some(v) = get("TOTEAT_LOCAL_FILE") {
        settings.toteat.local_file = v;
    }
    if let Some(v) = get("EMAIL_FROM") {
        settings.email.from = v;
    }
    if let Some(v) = get("EMAIL_TO") {
        settings.email.to = v;
    }
    if let Some(v) = get("LOG_LEVEL") {
        settings.log_level = v;
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| PosError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

/// Category rules read from a standalone JSON file (`[{"keywords": [..], "category": ".."}]`).
pub fn load_rules_file(path: &str) -> Result<Vec<CategoryRule>> {
    let content = std::fs::read_to_string(shellexpand_path(path))?;
    serde_json::from_str(&content)
        .map_err(|e| PosError::Settings(format!("invalid rules file {path}: {e}")))
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
