// Live end-to-end checks against the real chat application.
//
// These need an installed Chrome and a captured auth.json in the working
// directory; run with `cargo test -p chatrelay-core -- --ignored` from an
// interactive session.

use futures::{StreamExt, pin_mut};

use chatrelay::{Config, DriverSession, QueryEngine};

#[tokio::test]
#[ignore = "requires a real browser and a captured auth.json"]
async fn ask_round_trip() {
	let config = Config::default();
	let session = DriverSession::start(&config).await.expect("session start");
	let mut engine = QueryEngine::new(session, config);

	let reply = engine
		.ask("Reply with the single word: pong")
		.await
		.expect("blocking ask");
	assert!(!reply.is_empty());

	engine.into_session().stop().await;
}

#[tokio::test]
#[ignore = "requires a real browser and a captured auth.json"]
async fn streamed_chunks_rebuild_the_reply() {
	let config = Config::default();
	let session = DriverSession::start(&config).await.expect("session start");
	let mut engine = QueryEngine::new(session, config);

	let mut streamed = String::new();
	{
		let stream = engine.ask_stream("Count from 1 to 5, one number per line.");
		pin_mut!(stream);
		while let Some(chunk) = stream.next().await {
			streamed.push_str(&chunk.expect("stream chunk"));
		}
	}
	assert!(!streamed.is_empty());

	engine.into_session().stop().await;
}
