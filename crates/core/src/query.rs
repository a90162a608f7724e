//! Blocking and streaming query orchestration.
//!
//! Both operations share the same shape: dismiss the interstitial, inject
//! the prompt, wait (bounded) for generation to start, then follow the
//! stop control until it disappears. The streaming variant additionally
//! diffs each full re-read against a high-water mark and emits only the
//! new suffix.

use std::time::Duration;

use async_stream::try_stream;
use futures::Stream;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::config::{Config, Timing};
use crate::error::{RelayError, Result};
use crate::observe::{GenerationPhase, PhaseTracker};
use crate::session::DriverSession;
use crate::surface::{ChatSurface, LivePage};

/// Single-session query front end.
///
/// Both operations take `&mut self`: one in-flight query per driver
/// session is a hard precondition (injecting a second prompt mid-query
/// corrupts both), and the exclusive borrow makes it structural within a
/// task. A boundary layer that shares the engine across tasks must still
/// serialize calls.
pub struct QueryEngine {
	session: DriverSession,
	config: Config,
}

impl QueryEngine {
	pub fn new(session: DriverSession, config: Config) -> Self {
		Self { session, config }
	}

	pub fn session(&self) -> &DriverSession {
		&self.session
	}

	/// Releases the engine, handing the driver session back for teardown.
	pub fn into_session(self) -> DriverSession {
		self.session
	}

	/// Sends a prompt and waits for the complete reply.
	///
	/// A transient page failure reloads the page (best-effort) before the
	/// error is returned, so the next call starts from a responsive
	/// baseline rather than a stuck page.
	pub async fn ask(&mut self, prompt: &str) -> Result<String> {
		let surface = self.session.page().map(|page| LivePage::new(page, &self.config));
		ask_with_recovery(surface.as_ref(), &self.config.timing, prompt).await
	}

	/// Sends a prompt and yields reply text incrementally as it renders.
	///
	/// The stream is finite and not restartable. Any failure surfaces as
	/// the terminal `Err` item — the boundary renders it as streamed text —
	/// and no page reload is attempted on this path.
	pub fn ask_stream(&mut self, prompt: impl Into<String>) -> impl Stream<Item = Result<String>> + '_ {
		let surface = self.session.page().map(|page| LivePage::new(page, &self.config));
		stream_on(surface, &self.config.timing, prompt.into())
	}
}

/// Blocking sequence plus the reload-on-transient-failure recovery.
///
/// `NotInitialized`, `GenerationStartTimeout` and `NoResponseCaptured` are
/// reported directly; only page-level faults trigger the reload, and a
/// failed reload is itself non-fatal.
pub(crate) async fn ask_with_recovery<S: ChatSurface>(
	surface: Option<&S>,
	timing: &Timing,
	prompt: &str,
) -> Result<String> {
	match ask_on(surface, timing, prompt).await {
		Err(err) if err.is_transient_page_failure() => {
			warn!(target = "chatrelay.query", error = %err, "query failed; reloading page for the next call");
			if let Some(surface) = surface {
				if let Err(reload_err) = surface.reload().await {
					debug!(target = "chatrelay.query", error = %reload_err, "post-failure reload failed");
				}
			}
			Err(err)
		}
		outcome => outcome,
	}
}

/// Core blocking sequence, generic so tests can drive a simulated page.
pub(crate) async fn ask_on<S: ChatSurface>(
	surface: Option<&S>,
	timing: &Timing,
	prompt: &str,
) -> Result<String> {
	let surface = surface.ok_or(RelayError::NotInitialized)?;

	if surface.dismiss_popup().await? {
		debug!(target = "chatrelay.query", "dismissed blocking interstitial");
	}
	surface.submit_prompt(prompt).await?;

	let mut tracker = wait_for_start(surface, timing.ask_start, timing.poll_interval).await?;

	// No finish timeout by design: an unbounded generation is
	// indistinguishable from a stuck page without external intervention.
	loop {
		if tracker.observe(surface.generation_active().await?) == GenerationPhase::Finished {
			break;
		}
		sleep(timing.poll_interval).await;
	}

	// Let the final DOM paint land before the last read.
	sleep(timing.render_settle).await;
	surface.last_reply().await?.ok_or(RelayError::NoResponseCaptured)
}

/// Core streaming sequence. Errors become the terminal stream item.
pub(crate) fn stream_on<'a, S: ChatSurface + 'a>(
	surface: Option<S>,
	timing: &'a Timing,
	prompt: String,
) -> impl Stream<Item = Result<String>> + 'a {
	try_stream! {
		let surface = surface.ok_or(RelayError::NotInitialized)?;

		if surface.dismiss_popup().await? {
			debug!(target = "chatrelay.query", "dismissed blocking interstitial");
		}
		surface.submit_prompt(&prompt).await?;

		let mut tracker = wait_for_start(&surface, timing.stream_start, timing.poll_interval).await?;
		let mut high_water = 0usize;
		loop {
			let finished =
				tracker.observe(surface.generation_active().await?) == GenerationPhase::Finished;
			if let Some(text) = surface.last_reply().await? {
				if let Some(chunk) = growth(&text, &mut high_water) {
					yield chunk;
				}
			}
			if finished {
				break;
			}
			sleep(timing.poll_interval).await;
		}

		// One last sweep; a final DOM update can land just after the stop
		// control hides.
		if let Some(text) = surface.last_reply().await? {
			if let Some(chunk) = growth(&text, &mut high_water) {
				yield chunk;
			}
		}
	}
}

/// Polls until the stop control first appears, bounded by `deadline`.
async fn wait_for_start<S: ChatSurface>(
	surface: &S,
	deadline: Duration,
	interval: Duration,
) -> Result<PhaseTracker> {
	let mut tracker = PhaseTracker::new();
	let started = Instant::now();
	loop {
		if tracker.observe(surface.generation_active().await?) == GenerationPhase::InProgress {
			return Ok(tracker);
		}
		if started.elapsed() >= deadline {
			return Err(RelayError::GenerationStartTimeout(deadline));
		}
		sleep(interval).await;
	}
}

/// Suffix of `text` beyond the high-water mark, advancing the mark.
///
/// Shrinkage is absorbed without emission (the mark never regresses, so no
/// negative delta is ever produced), and a rewrite that leaves the mark
/// inside a multi-byte character skips that poll's emission.
fn growth(text: &str, high_water: &mut usize) -> Option<String> {
	if text.len() <= *high_water {
		return None;
	}
	let chunk = text.get(*high_water..)?;
	*high_water = text.len();
	Some(chunk.to_string())
}
