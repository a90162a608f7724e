//! Prompt injection: one JavaScript evaluation plus a synthesized Enter.
//!
//! No per-character typing. A single evaluation writes the full text and
//! dispatches exactly one `input` event, so correctness does not depend on
//! prompt length.

use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};

use crate::config::Selectors;
use crate::error::{RelayError, Result};

/// Encodes arbitrary text as a JavaScript string literal.
///
/// JSON string encoding doubles as JS escaping: quotes, backslashes and
/// control characters in the prompt can never terminate the payload or run
/// as code in the page.
pub fn encode_js_string(text: &str) -> String {
	serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

/// Builds the evaluation payload that writes `text` into the prompt surface.
///
/// The value goes through the element's native setter so the host
/// framework's change tracking observes it as user-authored input; a
/// contenteditable surface falls back to `innerText`. Yields `false` from
/// the page when the element is absent.
pub fn fill_script(selector: &str, text: &str) -> String {
	let selector = encode_js_string(selector);
	let text = encode_js_string(text);
	format!(
		r#"(() => {{
	const el = document.querySelector({selector});
	if (!el) return false;
	el.focus();
	const text = {text};
	const tag = el.tagName;
	if (tag === 'TEXTAREA' || tag === 'INPUT') {{
		const proto = tag === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
		Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, text);
	}} else {{
		el.innerText = text;
	}}
	el.dispatchEvent(new InputEvent('input', {{ bubbles: true, data: text }}));
	return true;
}})()"#
	)
}

/// Places the prompt into the input surface and submits it with Enter.
pub(crate) async fn inject(page: &Page, selectors: &Selectors, text: &str, settle: Duration) -> Result<()> {
	let filled = page
		.evaluate(fill_script(&selectors.prompt_input, text))
		.await?
		.value()
		.and_then(|v| v.as_bool())
		.unwrap_or(false);
	if !filled {
		return Err(RelayError::Page(format!(
			"prompt input {:?} not found",
			selectors.prompt_input
		)));
	}

	// Let the host application's reactive state catch up before submitting.
	tokio::time::sleep(settle).await;
	press_enter(page).await
}

/// Dispatches an Enter key down/up pair through the CDP Input domain.
async fn press_enter(page: &Page) -> Result<()> {
	for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
		let event = DispatchKeyEventParams::builder()
			.r#type(kind)
			.key("Enter")
			.code("Enter")
			.text("\r")
			.windows_virtual_key_code(13)
			.build()
			.map_err(RelayError::Page)?;
		page.execute(event).await?;
	}
	Ok(())
}
