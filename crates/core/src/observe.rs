//! Generation-phase inference and read-only DOM probes.
//!
//! The remote application exposes no completion event; the one signal that
//! has stayed stable across UI revisions is the visibility of the stop
//! control, so phase is inferred from it structurally. Message text is
//! re-read in full on every poll because the remote DOM may rewrite
//! arbitrary ranges while streaming (markdown re-rendering); diffing
//! downstream is length-based, not mutation-tracked.

use chromiumoxide::Page;

use crate::error::Result;
use crate::inject::encode_js_string;

/// Inferred state of the remote reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
	NotStarted,
	InProgress,
	Finished,
}

/// Pure state machine fed by stop-control visibility observations.
///
/// NotStarted moves to InProgress when the control appears, InProgress to
/// Finished when it disappears. Finished is terminal within one query;
/// there is no way back to NotStarted.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTracker {
	phase: GenerationPhase,
}

impl PhaseTracker {
	pub fn new() -> Self {
		Self { phase: GenerationPhase::NotStarted }
	}

	/// Tracker for a query whose generation is already known to be running.
	pub fn started() -> Self {
		Self { phase: GenerationPhase::InProgress }
	}

	pub fn phase(&self) -> GenerationPhase {
		self.phase
	}

	/// Applies one visibility observation and returns the resulting phase.
	/// Instantaneous; never waits on anything.
	pub fn observe(&mut self, stop_visible: bool) -> GenerationPhase {
		self.phase = match (self.phase, stop_visible) {
			(GenerationPhase::NotStarted, true) => GenerationPhase::InProgress,
			(GenerationPhase::InProgress, false) => GenerationPhase::Finished,
			(phase, _) => phase,
		};
		self.phase
	}
}

impl Default for PhaseTracker {
	fn default() -> Self {
		Self::new()
	}
}

/// Whether the stop control is currently rendered. A single evaluation with
/// no waiting; callable at arbitrary cadence.
pub async fn stop_control_visible(page: &Page, selector: &str) -> Result<bool> {
	let selector = encode_js_string(selector);
	let script = format!(
		"(() => {{ const el = document.querySelector({selector}); return !!el && el.getClientRects().length > 0; }})()"
	);
	Ok(page
		.evaluate(script)
		.await?
		.value()
		.and_then(|v| v.as_bool())
		.unwrap_or(false))
}

/// Trimmed text of the newest assistant message, or `None` before the first
/// reply exists.
pub async fn last_assistant_message(page: &Page, selector: &str) -> Result<Option<String>> {
	let selector = encode_js_string(selector);
	let script = format!(
		"(() => {{ const els = document.querySelectorAll({selector}); return els.length ? els[els.length - 1].innerText : null; }})()"
	);
	Ok(page
		.evaluate(script)
		.await?
		.value()
		.and_then(|v| v.as_str())
		.map(|text| text.trim().to_string()))
}

/// Clicks the blocking interstitial link when present and visible.
///
/// Absent or hidden is the expected case and reports `false`; an evaluation
/// failure propagates.
pub async fn dismiss_popup(page: &Page, xpath: &str) -> Result<bool> {
	let xpath = encode_js_string(xpath);
	let script = format!(
		r#"(() => {{
	const node = document.evaluate({xpath}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
	if (!node || node.getClientRects().length === 0) return false;
	node.click();
	return true;
}})()"#
	);
	Ok(page
		.evaluate(script)
		.await?
		.value()
		.and_then(|v| v.as_bool())
		.unwrap_or(false))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tracker_walks_the_three_phases_in_order() {
		let mut tracker = PhaseTracker::new();
		assert_eq!(tracker.phase(), GenerationPhase::NotStarted);

		// Still idle while the control has not appeared.
		assert_eq!(tracker.observe(false), GenerationPhase::NotStarted);
		assert_eq!(tracker.observe(true), GenerationPhase::InProgress);
		assert_eq!(tracker.observe(true), GenerationPhase::InProgress);
		assert_eq!(tracker.observe(false), GenerationPhase::Finished);
	}

	#[test]
	fn finished_is_terminal_within_a_query() {
		let mut tracker = PhaseTracker::started();
		tracker.observe(false);
		assert_eq!(tracker.phase(), GenerationPhase::Finished);
		// A control reappearing (a follow-up generation) must not reopen
		// this query's phase.
		assert_eq!(tracker.observe(true), GenerationPhase::Finished);
		assert_eq!(tracker.observe(false), GenerationPhase::Finished);
	}

	#[test]
	fn started_tracker_skips_the_start_transition() {
		let mut tracker = PhaseTracker::started();
		assert_eq!(tracker.phase(), GenerationPhase::InProgress);
		assert_eq!(tracker.observe(true), GenerationPhase::InProgress);
	}
}
