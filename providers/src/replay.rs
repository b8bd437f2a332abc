//! Replay of a saved model response.
//!
//! The text is cut into fixed-size character fragments and delivered like a
//! live stream, so the incremental parsers see realistic split points.

use std::time::Duration;

use crate::{Result, StreamEvent, mpsc, send_event};

const DEFAULT_CHUNK_CHARS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayScript {
    text: String,
    chunk_chars: usize,
    delay: Duration,
}

impl ReplayScript {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            chunk_chars: DEFAULT_CHUNK_CHARS,
            delay: Duration::ZERO,
        }
    }

    /// Fragment size in characters; zero is treated as one.
    #[must_use]
    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    /// Pause between fragments.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The fragments this script delivers, in order.
    pub fn fragments(&self) -> impl Iterator<Item = &str> + '_ {
        let mut rest = self.text.as_str();
        let chunk_chars = self.chunk_chars;
        std::iter::from_fn(move || {
            if rest.is_empty() {
                return None;
            }
            let split = rest
                .char_indices()
                .nth(chunk_chars)
                .map_or(rest.len(), |(offset, _)| offset);
            let (head, tail) = rest.split_at(split);
            rest = tail;
            Some(head)
        })
    }
}

pub async fn send_message(script: &ReplayScript, tx: mpsc::Sender<StreamEvent>) -> Result<()> {
    for fragment in script.fragments() {
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        if !send_event(&tx, StreamEvent::TextDelta(fragment.to_string())).await {
            return Ok(());
        }
    }
    let _ = send_event(&tx, StreamEvent::Done).await;
    Ok(())
}
