//! The seam between the query engine and the live page.

use async_trait::async_trait;
use chromiumoxide::Page;

use crate::config::Config;
use crate::error::Result;
use crate::{inject, observe, session};

/// Operations the query engine needs from the chat page.
///
/// Implemented by [`LivePage`] over a borrowed CDP page and by scripted
/// fakes in tests, so the polling and diffing logic runs against a
/// simulated page.
#[async_trait]
pub trait ChatSurface {
	/// Clicks the blocking interstitial if present and visible; `false`
	/// when there was nothing to dismiss.
	async fn dismiss_popup(&self) -> Result<bool>;

	/// Places the prompt into the input surface and submits it.
	async fn submit_prompt(&self, text: &str) -> Result<()>;

	/// Whether the remote generation is currently running. Never waits.
	async fn generation_active(&self) -> Result<bool>;

	/// Newest assistant message text, `None` before the first reply.
	async fn last_reply(&self) -> Result<Option<String>>;

	/// Reloads the page and waits for it to become navigable again.
	async fn reload(&self) -> Result<()>;
}

/// Live implementation over the single driver-session page.
#[derive(Clone, Copy)]
pub struct LivePage<'a> {
	page: &'a Page,
	config: &'a Config,
}

impl<'a> LivePage<'a> {
	pub fn new(page: &'a Page, config: &'a Config) -> Self {
		Self { page, config }
	}
}

#[async_trait]
impl ChatSurface for LivePage<'_> {
	async fn dismiss_popup(&self) -> Result<bool> {
		observe::dismiss_popup(self.page, &self.config.selectors.logout_popup).await
	}

	async fn submit_prompt(&self, text: &str) -> Result<()> {
		inject::inject(self.page, &self.config.selectors, text, self.config.timing.inject_settle).await
	}

	async fn generation_active(&self) -> Result<bool> {
		observe::stop_control_visible(self.page, &self.config.selectors.stop_button).await
	}

	async fn last_reply(&self) -> Result<Option<String>> {
		observe::last_assistant_message(self.page, &self.config.selectors.assistant_message).await
	}

	async fn reload(&self) -> Result<()> {
		session::reload_page(self.page).await
	}
}
