//! SSE parser for the chat change feed.
//!
//! Converts a raw `reqwest` byte stream into `FeedEvent` values. Each SSE
//! event is an `event:` line, one or more `data:` lines and a blank line.
//! Comment lines (keep-alives) and unknown event names are skipped.
//!
//! Chunks are buffered as raw bytes and only complete lines are decoded, so a
//! multi-byte character split across two chunks is reassembled first.

use bytes::Bytes;
use futures::stream::Stream;
use serde::Deserialize;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::ClientError;
use crate::types::ChatEvent;

/// One decoded event from the change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Sent once when the subscription is established
    Connected,
    Chat(ChatEvent),
    /// The server dropped `missed` events for this connection
    Lagged { missed: u64 },
}

/// Boxed stream of feed events, as handed out by `ChatApi::subscribe`.
pub type FeedStream = Pin<Box<dyn Stream<Item = Result<FeedEvent, ClientError>> + Send>>;

#[derive(Debug, Deserialize)]
struct LaggedRaw {
    missed: u64,
}

/// Stream adapter that converts raw SSE bytes into `FeedEvent` values.
pub struct ChatFeed {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: Vec<u8>,
    event_name: Option<String>,
    data: Vec<String>,
}

impl ChatFeed {
    pub(crate) fn new(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: Vec::new(),
            event_name: None,
            data: Vec::new(),
        }
    }

    /// Consume complete lines from the buffer until an event is dispatched.
    fn next_event(&mut self) -> Option<Result<FeedEvent, ClientError>> {
        loop {
            let newline_pos = self.buffer.iter().position(|b| *b == b'\n')?;
            let raw: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = match std::str::from_utf8(&raw[..newline_pos]) {
                Ok(line) => line.trim_end_matches('\r').to_string(),
                Err(e) => {
                    return Some(Err(ClientError::Parse(format!(
                        "Invalid UTF-8 in stream: {}",
                        e
                    ))));
                }
            };

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    return Some(event);
                }
                continue;
            }

            // Comment, used for keep-alive
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_str(), ""),
            };

            match field {
                "event" => self.event_name = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                // "id:", "retry:"
                _ => {}
            }
        }
    }

    /// Turn the accumulated fields into an event and reset them.
    fn dispatch(&mut self) -> Option<Result<FeedEvent, ClientError>> {
        let name = self.event_name.take();
        let data = std::mem::take(&mut self.data).join("\n");
        if name.is_none() && data.is_empty() {
            return None;
        }

        parse_event(name.as_deref().unwrap_or("message"), &data)
    }
}

impl Stream for ChatFeed {
    type Item = Result<FeedEvent, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.next_event() {
                return Poll::Ready(Some(event));
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(ClientError::Network(e.to_string()))));
                }
                Poll::Ready(None) => {
                    // A final event without its trailing blank line
                    if !this.buffer.is_empty() {
                        this.buffer.push(b'\n');
                        if let Some(event) = this.next_event() {
                            return Poll::Ready(Some(event));
                        }
                    }
                    return Poll::Ready(this.dispatch());
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Decode one named SSE event. Unknown names yield `None`.
fn parse_event(name: &str, data: &str) -> Option<Result<FeedEvent, ClientError>> {
    let parsed = match name {
        "connected" => Ok(FeedEvent::Connected),
        "lagged" => serde_json::from_str::<LaggedRaw>(data)
            .map(|raw| FeedEvent::Lagged { missed: raw.missed }),
        "message_inserted" | "message_deleted" | "messages_read" => {
            serde_json::from_str::<ChatEvent>(data).map(FeedEvent::Chat)
        }
        _ => return None,
    };

    Some(parsed.map_err(|e| {
        ClientError::Parse(format!(
            "Failed to parse {} event: {} (data: {})",
            name,
            e,
            data.chars().take(200).collect::<String>()
        ))
    }))
}
