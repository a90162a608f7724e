use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::error::CdpError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
	/// No page is available; the session artifact was missing or invalid at startup.
	#[error("browser session not initialized; check that the auth file exists and is valid")]
	NotInitialized,

	#[error("generation did not start within {}ms", .0.as_millis())]
	GenerationStartTimeout(Duration),

	#[error("generation finished but no assistant response was captured")]
	NoResponseCaptured,

	/// Fatal at startup; there is no degraded mode without a browser process.
	#[error("browser launch failed: {0}")]
	BrowserLaunch(String),

	#[error("navigation to {url} failed: {source}")]
	Navigation {
		url: String,
		#[source]
		source: anyhow::Error,
	},

	/// Any other failure while interacting with the page: navigation hiccup,
	/// detached element, evaluation fault.
	#[error("page interaction failed: {0}")]
	Page(String),

	#[error("failed to load auth state from {}: {reason}", path.display())]
	AuthState { path: PathBuf, reason: String },
}

impl From<CdpError> for RelayError {
	fn from(err: CdpError) -> Self {
		RelayError::Page(err.to_string())
	}
}

impl RelayError {
	/// True for failures that leave the page in an unknown state and warrant
	/// a reload before the next query.
	pub fn is_transient_page_failure(&self) -> bool {
		matches!(self, RelayError::Page(_) | RelayError::Navigation { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transient_classification_covers_page_and_navigation() {
		assert!(RelayError::Page("detached".into()).is_transient_page_failure());
		assert!(
			RelayError::Navigation {
				url: "https://chatgpt.com/".into(),
				source: anyhow::anyhow!("net::ERR_ABORTED"),
			}
			.is_transient_page_failure()
		);

		assert!(!RelayError::NotInitialized.is_transient_page_failure());
		assert!(!RelayError::GenerationStartTimeout(Duration::from_secs(10)).is_transient_page_failure());
		assert!(!RelayError::NoResponseCaptured.is_transient_page_failure());
	}

	#[test]
	fn start_timeout_display_includes_bound() {
		let err = RelayError::GenerationStartTimeout(Duration::from_secs(10));
		assert_eq!(err.to_string(), "generation did not start within 10000ms");
	}
}
