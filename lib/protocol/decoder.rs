use super::StreamEvent;
use async_stream::try_stream;
use futures_util::Stream;
use std::mem::take;
use tracing::{debug, trace};

/// Only lines starting with this marker carry events.
const FIELD: &str = "data: ";

/// The payload that marks the end of the stream.
const DONE: &str = "[DONE]";

/// Reassembles [`StreamEvent`]s out of arbitrarily fragmented chunks.
///
/// Every complete line is decoded as soon as its line break arrives,
/// while the trailing fragment is held back until the next chunk.
#[derive(Debug, Default)]
pub struct Decoder {
    buffer: Vec<u8>,
}

impl Decoder {
    /// Constructs an empty [`Decoder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and decodes every line it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(n) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=n).collect();
            events.extend(decode(&line[..n]));
        }

        events
    }

    /// Decodes whatever is left once the transport has ended.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        decode(&take(&mut self.buffer))
    }
}

fn decode(line: &[u8]) -> Option<StreamEvent> {
    let line = String::from_utf8_lossy(line);
    let line = line.strip_suffix('\r').unwrap_or(&line);
    let payload = line.strip_prefix(FIELD)?;

    if payload.trim() == DONE {
        trace!("end of stream marker");
        return None;
    }

    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(%payload, "skipping malformed event: {}", e);
            None
        }
    }
}

/// Adapts a stream of raw chunks into a stream of [`StreamEvent`]s.
pub fn events<S, B, E>(chunks: S) -> impl Stream<Item = Result<StreamEvent, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    try_stream! {
        let mut decoder = Decoder::new();

        for await chunk in chunks {
            for event in decoder.feed(chunk?.as_ref()) {
                yield event;
            }
        }

        if let Some(event) = decoder.finish() {
            yield event;
        }
    }
}
