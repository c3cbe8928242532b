use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::settings::ToteatSettings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_LOCAL_FILE: &str = "data/sample-collection.json";
const TIPO_NO_API_PERMISSION: i64 = 7;

/// Result of asking the vendor for one day of data. A failure is a value,
/// not an error, so callers decide whether to refuse it.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched { payload: Value, message: String },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub mode: &'static str,
    pub message: String,
}

/// Query dates are sent without separators: 20240305
pub fn format_api_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn msg_texto(body: &Value) -> Option<&str> {
    body.get("msg").and_then(|m| m.get("texto")).and_then(Value::as_str)
}

fn msg_tipo(body: &Value) -> Option<i64> {
    body.get("msg").and_then(|m| m.get("tipo")).and_then(Value::as_i64)
}

/// Maps an HTTP status and decoded body onto a fetch outcome.
pub fn interpret_response(status: u16, body: &Value, endpoint: &str) -> FetchOutcome {
    let failed = |message: String| FetchOutcome::Failed { message };

    match status {
        404 => return failed(format!("Endpoint not found (404). Check the API URL: {endpoint}")),
        401 | 403 => {
            return failed(format!(
                "Authentication error ({status}). Check xir, xil, xiu and xapitoken"
            ))
        }
        _ => {}
    }
    if msg_tipo(body) == Some(TIPO_NO_API_PERMISSION) {
        return failed(
            "Toteat token has no API permissions. Ask Toteat support to enable API access".to_string(),
        );
    }
    if !(200..300).contains(&status) {
        return failed(format!("Error fetching Toteat report: HTTP {status}"));
    }

    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        let payload = body
            .get("data")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        let message = msg_texto(body).unwrap_or("Collection fetched").to_string();
        FetchOutcome::Fetched { payload, message }
    } else {
        failed(
            msg_texto(body)
                .unwrap_or("Unknown error in Toteat response")
                .to_string(),
        )
    }
}

/// Reads a saved API response and returns its `data` member.
pub fn load_local_file(path: &std::path::Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let body: Value = serde_json::from_str(content.trim_start_matches('\u{feff}'))?;
    Ok(match body.get("data") {
        Some(data) => data.clone(),
        None => body,
    })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ToteatClient {
    http: Client,
    settings: ToteatSettings,
}

impl ToteatClient {
    pub fn new(settings: &ToteatSettings) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            settings: settings.clone(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/collection", self.settings.api_url.trim_end_matches('/'))
    }

    pub fn local_file_path(&self) -> PathBuf {
        if self.settings.local_file.trim().is_empty() {
            PathBuf::from(DEFAULT_LOCAL_FILE)
        } else {
            PathBuf::from(crate::settings::shellexpand_path(&self.settings.local_file))
        }
    }

    fn query(&self, date: NaiveDate) -> [(&'static str, String); 5] {
        [
            ("xir", self.settings.restaurant_id.clone()),
            ("xil", self.settings.local_id.clone()),
            ("xiu", self.settings.api_user_id.clone()),
            ("xapitoken", self.settings.api_key.clone()),
            ("date", format_api_date(date)),
        ]
    }

    fn fetch_local(&self) -> FetchOutcome {
        let path = self.local_file_path();
        info!(path = %path.display(), "local mode, reading saved collection");
        match load_local_file(&path) {
            Ok(payload) => FetchOutcome::Fetched {
                payload,
                message: format!("Loaded from {}", path.display()),
            },
            Err(e) => {
                error!(path = %path.display(), "local collection unreadable: {e}");
                FetchOutcome::Failed {
                    message: format!("Could not load local file: {e}"),
                }
            }
        }
    }

    fn fetch_remote(&self, date: NaiveDate) -> FetchOutcome {
        let endpoint = self.endpoint();
        info!(
            url = %endpoint,
            xir = %self.settings.restaurant_id,
            xil = %self.settings.local_id,
            xiu = %self.settings.api_user_id,
            date = %format_api_date(date),
            "fetching collection"
        );

        let response = match self.http.get(&endpoint).query(&self.query(date)).send() {
            Ok(r) => r,
            Err(e) => {
                let message = if e.is_connect() {
                    format!(
                        "Connection refused. Is the Toteat server available? URL: {}",
                        self.settings.api_url
                    )
                } else {
                    format!("Error fetching Toteat report: {e}")
                };
                error!("{message}");
                return FetchOutcome::Failed { message };
            }
        };

        let status = response.status().as_u16();
        let body: Value = response.json().unwrap_or(Value::Null);
        let outcome = interpret_response(status, &body, &endpoint);
        match &outcome {
            FetchOutcome::Fetched { message, .. } => info!(status, "collection fetched: {message}"),
            FetchOutcome::Failed { message } => warn!(status, "collection fetch failed: {message}"),
        }
        outcome
    }

    pub fn fetch_collection(&self, date: NaiveDate) -> FetchOutcome {
        if self.settings.use_local_file {
            self.fetch_local()
        } else {
            self.fetch_remote(date)
        }
    }

    /// Probes the API (or local file) with yesterday's date.
    pub fn check_connection(&self) -> ConnectionStatus {
        let yesterday = chrono::Local::now().date_naive() - chrono::Duration::days(1);
        let mode = if self.settings.use_local_file { "local" } else { "api" };
        match self.fetch_collection(yesterday) {
            FetchOutcome::Fetched { message, .. } => ConnectionStatus {
                connected: true,
                mode,
                message: if mode == "local" {
                    "Local mode active, data loaded from file".to_string()
                } else {
                    message
                },
            },
            FetchOutcome::Failed { message } => ConnectionStatus {
                connected: false,
                mode,
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URL: &str = "https://api.example.test/mw/or/1.0/collection";

    #[test]
    fn test_format_api_date() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(format_api_date(d), "20240305");
    }

    #[test]
    fn test_ok_response_yields_data() {
        let body = json!({"ok": true, "data": {"shifts": {}}, "msg": {"texto": "OK", "tipo": 0}});
        let outcome = interpret_response(200, &body, URL);
        assert_eq!(
            outcome,
            FetchOutcome::Fetched {
                payload: json!({"shifts": {}}),
                message: "OK".to_string()
            }
        );
    }

    #[test]
    fn test_ok_without_data_is_empty_object() {
        let outcome = interpret_response(200, &json!({"ok": true}), URL);
        match outcome {
            FetchOutcome::Fetched { payload, .. } => assert_eq!(payload, json!({})),
            other => panic!("expected fetched, got {other:?}"),
        }
    }

    #[test]
    fn test_not_ok_uses_vendor_message() {
        let body = json!({"ok": false, "msg": {"texto": "Fecha inválida", "tipo": 2}});
        assert_eq!(
            interpret_response(200, &body, URL),
            FetchOutcome::Failed { message: "Fecha inválida".to_string() }
        );
        assert_eq!(
            interpret_response(200, &json!(null), URL),
            FetchOutcome::Failed { message: "Unknown error in Toteat response".to_string() }
        );
    }

    #[test]
    fn test_status_failures() {
        let FetchOutcome::Failed { message } = interpret_response(404, &json!(null), URL) else {
            panic!("404 must fail");
        };
        assert!(message.contains("not found"));
        assert!(message.contains(URL));

        let FetchOutcome::Failed { message } = interpret_response(403, &json!({}), URL) else {
            panic!("403 must fail");
        };
        assert!(message.contains("Authentication error (403)"));

        let FetchOutcome::Failed { message } = interpret_response(500, &json!({}), URL) else {
            panic!("500 must fail");
        };
        assert!(message.contains("HTTP 500"));
    }

    #[test]
    fn test_missing_permission_tipo() {
        let body = json!({"ok": false, "msg": {"texto": "Sin permisos", "tipo": 7}});
        let FetchOutcome::Failed { message } = interpret_response(200, &body, URL) else {
            panic!("tipo 7 must fail");
        };
        assert!(message.contains("API permissions"));
    }

    #[test]
    fn test_local_file_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.json");
        std::fs::write(&path, r#"{"ok": true, "data": {"shifts": {"1": {}}}}"#).unwrap();

        let settings = ToteatSettings {
            use_local_file: true,
            local_file: path.to_string_lossy().to_string(),
            ..Default::default()
        };
        let client = ToteatClient::new(&settings).unwrap();
        let outcome = client.fetch_collection(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        match outcome {
            FetchOutcome::Fetched { payload, .. } => assert_eq!(payload, json!({"shifts": {"1": {}}})),
            other => panic!("expected fetched, got {other:?}"),
        }

        let status = client.check_connection();
        assert!(status.connected);
        assert_eq!(status.mode, "local");
    }

    #[test]
    fn test_local_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ToteatSettings {
            use_local_file: true,
            local_file: dir.path().join("absent.json").to_string_lossy().to_string(),
            ..Default::default()
        };
        let client = ToteatClient::new(&settings).unwrap();
        let status = client.check_connection();
        assert!(!status.connected);
        assert!(status.message.starts_with("Could not load local file"));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let settings = ToteatSettings {
            api_url: "https://api.example.test/mw/or/1.0/".to_string(),
            ..Default::default()
        };
        let client = ToteatClient::new(&settings).unwrap();
        assert_eq!(client.endpoint(), URL);
    }
}
