//! Auth storage-state loading and CDP cookie conversion.
//!
//! The artifact is a Playwright-format storage-state document written by the
//! external login-capture flow. It is read-only here and overwritten
//! wholesale by re-running that flow.

use std::fs;
use std::path::Path;

use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use serde::Deserialize;

use crate::error::{RelayError, Result};

/// Captured browser-session state: cookies plus per-origin storage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageState {
	pub cookies: Vec<StorageCookie>,
	/// Local/session storage entries, carried opaquely.
	pub origins: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageCookie {
	pub name: String,
	pub value: String,
	pub domain: String,
	pub path: String,
	/// Seconds since epoch; negative means a session cookie.
	#[serde(default = "session_expiry")]
	pub expires: f64,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default)]
	pub same_site: Option<String>,
}

fn session_expiry() -> f64 {
	-1.0
}

impl StorageState {
	pub fn from_file(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path).map_err(|e| RelayError::AuthState {
			path: path.to_path_buf(),
			reason: e.to_string(),
		})?;
		serde_json::from_str(&raw).map_err(|e| RelayError::AuthState {
			path: path.to_path_buf(),
			reason: e.to_string(),
		})
	}

	/// Cookies converted for CDP injection. Entries that fail conversion are
	/// dropped rather than failing the whole warm-up.
	pub fn cdp_cookies(&self) -> Vec<CookieParam> {
		self.cookies.iter().filter_map(cookie_param).collect()
	}
}

fn cookie_param(cookie: &StorageCookie) -> Option<CookieParam> {
	let mut builder = CookieParam::builder()
		.name(&cookie.name)
		.value(&cookie.value)
		.domain(&cookie.domain)
		.path(&cookie.path)
		.http_only(cookie.http_only)
		.secure(cookie.secure);

	if cookie.expires >= 0.0 {
		builder = builder.expires(TimeSinceEpoch::new(cookie.expires));
	}
	if let Some(same_site) = cookie.same_site.as_deref() {
		builder = builder.same_site(match same_site {
			"Strict" => CookieSameSite::Strict,
			"None" => CookieSameSite::None,
			_ => CookieSameSite::Lax,
		});
	}

	builder.build().ok()
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::TempDir;

	use super::*;

	const FIXTURE: &str = r#"{
  "cookies": [
    {
      "name": "__session",
      "value": "token",
      "domain": ".chatgpt.com",
      "path": "/",
      "expires": 1893456000.0,
      "httpOnly": true,
      "secure": true,
      "sameSite": "Lax"
    },
    {
      "name": "ephemeral",
      "value": "x",
      "domain": ".chatgpt.com",
      "path": "/",
      "expires": -1.0,
      "httpOnly": false,
      "secure": true,
      "sameSite": "None"
    }
  ],
  "origins": []
}"#;

	#[test]
	fn from_file_errors_for_missing_artifact() {
		let err = StorageState::from_file(Path::new("/definitely/missing/auth.json")).unwrap_err();
		assert!(err.to_string().contains("failed to load auth state"));
	}

	#[test]
	fn from_file_parses_storage_state_document() {
		let temp = TempDir::new().unwrap();
		let auth = temp.path().join("auth.json");
		fs::write(&auth, FIXTURE).unwrap();

		let state = StorageState::from_file(&auth).unwrap();
		assert_eq!(state.cookies.len(), 2);
		assert_eq!(state.origins.len(), 0);
		assert!(state.cookies[0].http_only);
		assert_eq!(state.cookies[1].expires, -1.0);
	}

	#[test]
	fn cdp_conversion_drops_expiry_for_session_cookies() {
		let state: StorageState = serde_json::from_str(FIXTURE).unwrap();
		let cookies = state.cdp_cookies();
		assert_eq!(cookies.len(), 2);
		assert!(cookies[0].expires.is_some());
		assert!(cookies[1].expires.is_none());
		assert_eq!(cookies[0].name, "__session");
	}

	#[test]
	fn malformed_artifact_reports_auth_state_error() {
		let temp = TempDir::new().unwrap();
		let auth = temp.path().join("auth.json");
		fs::write(&auth, "{ not json").unwrap();

		let err = StorageState::from_file(&auth).unwrap_err();
		assert!(matches!(err, RelayError::AuthState { .. }));
	}
}
