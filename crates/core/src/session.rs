//! Driver session lifecycle: one browser process, one warmed-up chat page.

use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{AddScriptToEvaluateOnNewDocumentParams, ReloadParams};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::auth::StorageState;
use crate::config::Config;
use crate::error::{RelayError, Result};

/// Masks the most common automation giveaway before any page script runs.
const STEALTH_INIT_SCRIPT: &str =
	"Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

/// Cadence for the warm-up selector poll.
const WARMUP_POLL: Duration = Duration::from_millis(250);

/// The one live browser process, browsing context, and page.
///
/// Exactly one instance exists for the service lifetime. Everything else
/// borrows the page through [`DriverSession::page`]; only [`stop`]
/// releases the underlying resources.
///
/// [`stop`]: DriverSession::stop
pub struct DriverSession {
	browser: Browser,
	handler: JoinHandle<()>,
	page: Option<Page>,
}

impl DriverSession {
	/// Launches the browser and warms up the chat page.
	///
	/// A missing auth file leaves the session up but degraded: the page
	/// stays unset and every query fails with `NotInitialized` until the
	/// login-capture flow is re-run. A launch failure (after the fallback
	/// configuration) is fatal; a warm-up failure tears the browser down
	/// and is fatal too.
	pub async fn start(config: &Config) -> Result<Self> {
		let (browser, handler) = launch_browser(config).await?;

		if !config.auth_file.exists() {
			warn!(
				target = "chatrelay.session",
				path = %config.auth_file.display(),
				"auth file missing; run the login-capture flow — queries will fail until then"
			);
			return Ok(Self { browser, handler, page: None });
		}

		match warm_up(&browser, config).await {
			Ok(page) => Ok(Self { browser, handler, page: Some(page) }),
			Err(err) => {
				let session = Self { browser, handler, page: None };
				session.stop().await;
				Err(err)
			}
		}
	}

	/// Borrow-only page accessor; `None` means the session never
	/// initialized a page.
	pub fn page(&self) -> Option<&Page> {
		self.page.as_ref()
	}

	/// Best-effort teardown. Errors during shutdown are logged, never
	/// propagated; every exit path may call this safely.
	pub async fn stop(mut self) {
		if let Err(err) = self.browser.close().await {
			debug!(target = "chatrelay.session", error = %err, "browser close failed");
		}
		if let Err(err) = self.browser.wait().await {
			debug!(target = "chatrelay.session", error = %err, "browser process wait failed");
		}
		self.handler.abort();
		info!(target = "chatrelay.session", "driver session stopped");
	}
}

async fn launch_browser(config: &Config) -> Result<(Browser, JoinHandle<()>)> {
	let primary = browser_config(config, true)?;
	let (browser, mut cdp_handler) = match Browser::launch(primary).await {
		Ok(pair) => pair,
		Err(err) => {
			warn!(
				target = "chatrelay.session",
				error = %err,
				"launch with configured executable failed; retrying with bundled chromium"
			);
			let fallback = browser_config(config, false)?;
			Browser::launch(fallback)
				.await
				.map_err(|e| RelayError::BrowserLaunch(e.to_string()))?
		}
	};

	let handler = tokio::spawn(async move { while cdp_handler.next().await.is_some() {} });
	info!(target = "chatrelay.session", headless = config.headless, "browser launched");
	Ok((browser, handler))
}

fn browser_config(config: &Config, prefer_system_chrome: bool) -> Result<BrowserConfig> {
	let mut builder = BrowserConfig::builder()
		.no_sandbox()
		.arg("--disable-blink-features=AutomationControlled");
	if !config.headless {
		builder = builder.with_head().window_size(1280, 900);
	}
	if prefer_system_chrome {
		if let Some(path) = &config.chrome_executable {
			builder = builder.chrome_executable(path.clone());
		}
	}
	builder.build().map_err(RelayError::BrowserLaunch)
}

/// Opens the page, applies stealth and auth state, and navigates to the
/// chat application.
async fn warm_up(browser: &Browser, config: &Config) -> Result<Page> {
	let state = StorageState::from_file(&config.auth_file)?;
	info!(
		target = "chatrelay.session",
		cookies = state.cookies.len(),
		"loaded session artifact"
	);

	let page = browser.new_page("about:blank").await?;

	// Registered once; the browser re-applies it on every new document,
	// including reloads.
	let stealth = AddScriptToEvaluateOnNewDocumentParams::builder()
		.source(STEALTH_INIT_SCRIPT)
		.build()
		.map_err(RelayError::Page)?;
	page.execute(stealth).await?;

	let cookies = state.cdp_cookies();
	if !cookies.is_empty() {
		page.set_cookies(cookies).await?;
	}

	debug!(target = "chatrelay.session", url = %config.target_url, "navigating to chat application");
	timeout(config.timing.navigation, page.goto(config.target_url.as_str()))
		.await
		.map_err(|_| RelayError::Navigation {
			url: config.target_url.clone(),
			source: anyhow::anyhow!("timed out after {}ms", config.timing.navigation.as_millis()),
		})?
		.map_err(|e| RelayError::Navigation {
			url: config.target_url.clone(),
			source: anyhow::Error::new(e),
		})?;

	if wait_for_selector(&page, &config.selectors.prompt_input, config.timing.warmup).await {
		info!(target = "chatrelay.session", "chat page ready");
	} else {
		// Possibly a transient interstitial; the page may still recover,
		// so expose it anyway.
		warn!(
			target = "chatrelay.session",
			selector = %config.selectors.prompt_input,
			"prompt input not found; page may be on a challenge or login screen"
		);
	}

	Ok(page)
}

/// Polls for the selector until it appears or the deadline passes.
/// Evaluation faults count as not-present so a sluggish page cannot fail
/// the warm-up outright.
async fn wait_for_selector(page: &Page, selector: &str, deadline: Duration) -> bool {
	let script = format!(
		"document.querySelector({}) !== null",
		crate::inject::encode_js_string(selector)
	);
	let started = Instant::now();
	loop {
		let present = match page.evaluate(script.clone()).await {
			Ok(result) => result.value().and_then(|v| v.as_bool()).unwrap_or(false),
			Err(err) => {
				debug!(target = "chatrelay.session", error = %err, "warm-up probe failed");
				false
			}
		};
		if present {
			return true;
		}
		if started.elapsed() >= deadline {
			return false;
		}
		sleep(WARMUP_POLL).await;
	}
}

/// Reloads the page and waits for the navigation to land, restoring a
/// navigable baseline after a transient failure. State is preserved; only
/// the in-page navigation history resets.
pub(crate) async fn reload_page(page: &Page) -> Result<()> {
	page.execute(ReloadParams::default()).await?;
	page.wait_for_navigation().await?;
	Ok(())
}
