//! Reassembles raw network fragments into complete server-sent-event frames

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::{Stream, StreamExt, stream};

/// Two line breaks end one event
pub const EVENT_TERMINATOR: &str = "\n\n";

/// Accumulates text and splits it into terminated events
#[derive(Debug, Default)]
pub struct EventAssembler {
    buffer: String,
}

impl EventAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment, returning every event it completed, in order
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        let mut events = Vec::new();

        for ch in fragment.chars() {
            self.buffer.push(ch);
            if self.buffer.ends_with(EVENT_TERMINATOR) {
                events.push(std::mem::take(&mut self.buffer));
            }
        }

        events
    }

    /// Take whatever is left once input has ended, terminated or not
    pub fn finish(&mut self) -> Option<String> {
        (!self.buffer.is_empty()).then(|| std::mem::take(&mut self.buffer))
    }
}

/// Incremental UTF-8 decoder
///
/// Holds back an incomplete trailing sequence until the next fragment
/// arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (after any held-back prefix) as possible
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut buffered = std::mem::take(&mut self.pending);
        buffered.extend_from_slice(bytes);

        let mut output = String::with_capacity(buffered.len());
        let mut rest = buffered.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    output.push_str(text);
                    return output;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    output.push_str(&String::from_utf8_lossy(valid));

                    if let Some(len) = e.error_len() {
                        output.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[len..];
                    } else {
                        self.pending = after.to_vec();
                        return output;
                    }
                }
            }
        }
    }

    /// Flush a held-back sequence that never completed
    pub fn finish(&mut self) -> String {
        let tail = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&tail).into_owned()
    }
}

struct Framing<S, E> {
    source: Pin<Box<S>>,
    decoder: Utf8Decoder,
    assembler: EventAssembler,
    ready: VecDeque<String>,
    error: Option<E>,
    done: bool,
}

impl<S, E> Framing<S, E> {
    /// Queue everything still buffered, terminated or not
    fn flush(&mut self) {
        let tail = self.decoder.finish();
        let events = self.assembler.push(&tail);
        self.ready.extend(events);
        self.ready.extend(self.assembler.finish());
    }
}

/// Turn a stream of raw byte fragments into a stream of complete events
///
/// Events come out in arrival order. A trailing partial event is emitted
/// when the source ends. A source error is forwarded after the buffered
/// events, the partial one included, and ends the stream.
pub fn assemble_events<S, B, E>(source: S) -> impl Stream<Item = Result<String, E>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
{
    let state = Framing {
        source: Box::pin(source),
        decoder: Utf8Decoder::new(),
        assembler: EventAssembler::new(),
        ready: VecDeque::new(),
        error: None,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                tracing::debug!(len = event.len(), "assembled event");
                return Some((Ok(event), state));
            }

            if let Some(error) = state.error.take() {
                state.done = true;
                return Some((Err(error), state));
            }

            if state.done {
                return None;
            }

            match state.source.next().await {
                Some(Ok(fragment)) => {
                    let text = state.decoder.decode(fragment.as_ref());
                    let events = state.assembler.push(&text);
                    state.ready.extend(events);
                }
                Some(Err(error)) => {
                    state.flush();
                    state.error = Some(error);
                }
                None => {
                    state.flush();
                    state.done = true;
                }
            }
        }
    })
}
