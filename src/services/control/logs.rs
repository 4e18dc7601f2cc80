//! Log bridge: relays a backend log stream over a WebSocket connection.
//!
//! One forwarder per active stream copies bytes from the backend to the
//! client until EOF or a write failure; a reader loop keeps the connection
//! alive by echoing client frames and rolling the read deadline.

use actix_ws::{CloseCode, Message, MessageStream, Session};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::time::Duration;
use tokio::time::timeout;

use crate::services::backend::LogStream;

/// Read deadline rolled on every client frame.
const READ_DEADLINE: Duration = Duration::from_secs(60);
/// Write deadline applied to each outgoing frame.
const WRITE_DEADLINE: Duration = Duration::from_secs(10);

/// Destination for forwarded log bytes.
#[async_trait]
pub trait LogSink: Send {
	/// Writes one chunk; an error means the client is gone.
	async fn send_chunk(&mut self, chunk: Bytes) -> Result<(), ()>;

	/// Sends a normal close frame.
	async fn close_normal(&mut self);
}

/// WebSocket-backed sink with a per-frame write deadline.
struct SessionSink {
	session: Session,
}

#[async_trait]
impl LogSink for SessionSink {
	async fn send_chunk(&mut self, chunk: Bytes) -> Result<(), ()> {
		match timeout(WRITE_DEADLINE, self.session.binary(chunk)).await {
			Ok(Ok(())) => Ok(()),
			Ok(Err(_)) | Err(_) => Err(()),
		}
	}

	async fn close_normal(&mut self) {
		let _ = self
			.session
			.clone()
			.close(Some(CloseCode::Normal.into()))
			.await;
	}
}

/// Copies the backend log stream into the sink byte-for-byte.
///
/// On EOF (or a backend read error) a normal close frame is sent; on a write
/// failure the forwarder stops silently, the client is already gone.
pub async fn forward_logs<S: LogSink>(mut stream: LogStream, sink: &mut S) {
	while let Some(chunk) = stream.next().await {
		match chunk {
			Ok(bytes) => {
				if sink.send_chunk(bytes).await.is_err() {
					tracing::debug!("log client went away, stopping forwarder");
					return;
				}
			}
			Err(err) => {
				tracing::warn!(error = %err, "backend log stream failed");
				break;
			}
		}
	}

	tracing::debug!("log stream ended, sending close frame");
	sink.close_normal().await;
}

/// Drives one upgraded connection: spawns the forwarder and runs the
/// keep-alive reader until either side closes.
pub(crate) async fn bridge_session(
	session: Session,
	mut messages: MessageStream,
	logs: LogStream,
) {
	let forwarder = {
		let session = session.clone();
		actix_web::rt::spawn(async move {
			let mut sink = SessionSink { session };
			forward_logs(logs, &mut sink).await;
		})
	};

	let mut session = session;
	loop {
		match timeout(READ_DEADLINE, messages.next()).await {
			// Read deadline expired without a client frame.
			Err(_) => {
				let _ = session.close(Some(CloseCode::Normal.into())).await;
				break;
			}
			Ok(None) | Ok(Some(Err(_))) => break,
			Ok(Some(Ok(message))) => match message {
				Message::Text(text) => {
					if session.text(text).await.is_err() {
						break;
					}
				}
				Message::Binary(binary) => {
					if session.binary(binary).await.is_err() {
						break;
					}
				}
				Message::Ping(payload) => {
					if session.pong(&payload).await.is_err() {
						break;
					}
				}
				Message::Close(_) => break,
				_ => {}
			},
		}
	}

	forwarder.abort();
}
