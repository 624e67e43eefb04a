//! Incremental Server-Sent Events framing
//!
//! The parser is fed raw chunks exactly as they come off the wire. Chunks do
//! not have to line up with lines, frames, or even UTF-8 characters:
//!
//! ```text
//! chunk 1: "data: {\"content\":\"H"
//! chunk 2: "i\"}\n\nda"
//! chunk 3: "ta: done\n\n"
//! ```
//!
//! yields two frames, the first as soon as chunk 2 is fed. Only the SSE
//! grammar is handled here; what the `data` payload means is up to the caller.

use tracing::trace;

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    /// `event:` field, if the frame had one
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
    /// `id:` field, if the frame had one
    pub id: Option<String>,
}

impl SseFrame {
    /// Build a frame carrying only data (handy in tests and fakes).
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    /// The individual `data:` lines of this frame, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.data.split('\n')
    }
}

/// Stateful, chunk-boundary tolerant SSE decoder.
///
/// A parser is good for one stream. Call [`FrameParser::reset`] (or build a
/// new one) before reusing it.
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Partial line carried across chunks
    line: String,
    /// Previous chunk ended on `\r`; a leading `\n` belongs to that break
    pending_cr: bool,
    /// Undecoded tail of a multi-byte character split across chunks
    utf8_tail: Vec<u8>,
    started: bool,
    event: Option<String>,
    id: Option<String>,
    data: Vec<String>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a text chunk, returning every frame it completed.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        let mut chunk = chunk;

        if !self.started && !chunk.is_empty() {
            self.started = true;
            chunk = chunk.strip_prefix('\u{feff}').unwrap_or(chunk);
        }

        for ch in chunk.chars() {
            if self.pending_cr {
                self.pending_cr = false;
                if ch == '\n' {
                    continue;
                }
            }

            match ch {
                '\r' => {
                    self.pending_cr = true;
                    self.end_line(&mut frames);
                }
                '\n' => self.end_line(&mut frames),
                _ => self.line.push(ch),
            }
        }

        frames
    }

    /// Feed raw bytes. Characters split across calls are reassembled;
    /// invalid sequences decode to U+FFFD.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.utf8_tail.extend_from_slice(bytes);
        let buf = std::mem::take(&mut self.utf8_tail);

        let mut text = String::with_capacity(buf.len());
        let mut rest: &[u8] = &buf;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // `valid_up_to` marks a UTF-8 prefix
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());

                    match e.error_len() {
                        Some(len) => {
                            text.push('\u{fffd}');
                            rest = &after[len..];
                        }
                        None => {
                            self.utf8_tail = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        self.feed(&text)
    }

    /// Signal end of input.
    ///
    /// A frame still waiting for its blank-line terminator is dropped, as is
    /// any partial line. The parser is left ready for a new stream.
    pub fn finish(&mut self) {
        if !self.data.is_empty() || !self.line.is_empty() {
            trace!(
                pending_lines = self.data.len(),
                "dropping unterminated SSE frame at end of stream"
            );
        }
        self.reset();
    }

    /// Forget everything buffered so far.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn end_line(&mut self, frames: &mut Vec<SseFrame>) {
        let line = std::mem::take(&mut self.line);

        if line.is_empty() {
            if let Some(frame) = self.dispatch() {
                frames.push(frame);
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.find(':') {
            Some(pos) => {
                let value = &line[pos + 1..];
                (&line[..pos], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line.as_str(), ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.id = Some(value.to_string()),
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let id = self.id.take();

        if self.data.is_empty() {
            return None;
        }

        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame { event, data, id })
    }
}
