//! Runtime configuration: target application, coupling selectors, timing.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration for the driver session and query engine.
///
/// Every field has a default reproducing the stock deployment, so an empty
/// document deserializes to a working setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// URL of the chat application.
	pub target_url: String,
	/// Storage-state artifact produced by the interactive login flow.
	pub auth_file: PathBuf,
	/// System Chrome binary to prefer over the bundled Chromium.
	pub chrome_executable: Option<PathBuf>,
	/// Headful runs are notably more stable against bot detection.
	pub headless: bool,
	pub selectors: Selectors,
	pub timing: Timing,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			target_url: "https://chatgpt.com/".into(),
			auth_file: PathBuf::from("auth.json"),
			chrome_executable: None,
			headless: false,
			selectors: Selectors::default(),
			timing: Timing::default(),
		}
	}
}

/// The three selectors (plus one popup locator) that are the entire coupling
/// surface to the remote UI. A remote change to any of them surfaces only as
/// downstream timeouts or empty results.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Selectors {
	/// Prompt-input surface.
	pub prompt_input: String,
	/// Rendered only while the remote generation is running.
	pub stop_button: String,
	/// One element per assistant message, newest last.
	pub assistant_message: String,
	/// XPath of the dismissible logged-out interstitial link.
	pub logout_popup: String,
}

impl Default for Selectors {
	fn default() -> Self {
		Self {
			prompt_input: "#prompt-textarea".into(),
			stop_button: r#"button[data-testid="stop-button"]"#.into(),
			assistant_message: r#"div[data-message-author-role="assistant"]"#.into(),
			logout_popup: "//a[contains(text(), 'Stay logged out')]".into(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
	/// Bounded wait for the initial navigation.
	pub navigation: Duration,
	/// Bounded wait for the prompt input to appear after navigation.
	pub warmup: Duration,
	/// Bounded wait for generation to start, blocking path.
	pub ask_start: Duration,
	/// Bounded wait for generation to start, streaming path.
	pub stream_start: Duration,
	/// Pause between injection and submission so reactive state settles.
	pub inject_settle: Duration,
	/// Pause before the final read so the last DOM paint lands.
	pub render_settle: Duration,
	/// Poll cadence. The single tunable trading responsiveness against
	/// polling overhead; tests set it to zero.
	pub poll_interval: Duration,
}

impl Default for Timing {
	fn default() -> Self {
		Self {
			navigation: Duration::from_secs(60),
			warmup: Duration::from_secs(60),
			ask_start: Duration::from_secs(10),
			stream_start: Duration::from_secs(30),
			inject_settle: Duration::from_millis(500),
			render_settle: Duration::from_millis(100),
			poll_interval: Duration::from_millis(50),
		}
	}
}
