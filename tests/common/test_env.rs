//! Settings for tests against a real signing service.
//!
//! Variables may come from the process environment or from a `.env` file at
//! the repository root; the process environment wins.

use std::env;
use std::fs;
use std::path::Path;

/// Endpoint and access token of a live service
pub struct LiveServiceEnv {
    pub endpoint: String,
    pub access_token: String,
}

impl LiveServiceEnv {
    /// `None` unless `RESTPKI_ACCESS_TOKEN` is available
    pub fn load() -> Option<Self> {
        load_dotenv_if_present();
        let access_token = env::var("RESTPKI_ACCESS_TOKEN").ok().filter(|t| !t.is_empty())?;
        let endpoint = env::var("RESTPKI_ENDPOINT")
            .ok()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "https://pki.rest/".to_string());
        Some(Self {
            endpoint,
            access_token,
        })
    }
}

/// Parse one `KEY=VALUE` line; blank lines and `#` comments yield `None`
fn parse_line(raw_line: &str) -> Option<(&str, &str)> {
    let line = raw_line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = value.trim();
    let unquoted = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    Some((key, unquoted))
}

/// Load `<repo>/.env` without overriding variables already set
pub fn load_dotenv_if_present() {
    let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };
    for (key, value) in content.lines().filter_map(parse_line) {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }
}
