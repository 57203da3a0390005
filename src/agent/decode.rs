//! Newline-delimited JSON decoding of agent responses

use super::AgentError;
use crate::state_machine::AgentEvent;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::Display;

/// Longest line accepted from an agent
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into lines
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for a newline
    scanned: usize,
    max_line: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line,
        }
    }

    /// Feed a chunk and take every line it completes, without terminators
    ///
    /// Fails once a line grows past the length limit.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, AgentError> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(end) = self.find_newline(from) {
            let mut line = self.buffer.get(start..end).unwrap_or_default().to_vec();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.len() > self.max_line {
                return Err(self.too_long());
            }
            lines.push(line);
            start = end + 1;
            from = start;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        if self.buffer.len() > self.max_line {
            return Err(self.too_long());
        }
        Ok(lines)
    }

    fn find_newline(&self, from: usize) -> Option<usize> {
        self.buffer
            .get(from..)?
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| from + offset)
    }

    fn too_long(&mut self) -> AgentError {
        self.buffer.clear();
        self.scanned = 0;
        AgentError::decode(format!("line exceeds {} bytes", self.max_line))
    }

    /// Take whatever is left once the input has ended
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        self.scanned = 0;
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}

/// Parse one line of the response body
///
/// Blank lines, SSE comments and JSON that is not a known event shape yield
/// `Ok(None)`. Anything that is not JSON at all is a decode error.
pub fn parse_line(line: &[u8]) -> Result<Option<AgentEvent>, AgentError> {
    let line = std::str::from_utf8(line)
        .map_err(|e| AgentError::decode(format!("line is not UTF-8: {e}")))?
        .trim();

    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    let payload = line
        .strip_prefix("data:")
        .map_or(line, str::trim_start);

    let value: Value = serde_json::from_str(payload)
        .map_err(|e| AgentError::decode(format!("invalid event line: {e}")))?;

    match serde_json::from_value::<AgentEvent>(value) {
        Ok(event) => Ok(Some(event)),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed agent event");
            Ok(None)
        }
    }
}

struct DecodeState<B, E> {
    body: BoxStream<'static, Result<B, E>>,
    lines: LineDecoder,
    ready: VecDeque<Result<AgentEvent, AgentError>>,
    finished: bool,
}

impl<B, E> DecodeState<B, E> {
    /// Queue parsed events; stops at the first bad line
    fn queue_lines(&mut self, lines: Vec<Vec<u8>>) {
        for line in lines {
            match parse_line(&line) {
                Ok(Some(event)) => self.ready.push_back(Ok(event)),
                Ok(None) => {}
                Err(e) => {
                    self.ready.push_back(Err(e));
                    self.finished = true;
                    return;
                }
            }
        }
    }
}

/// Turn a chunked response body into a stream of agent events
///
/// A transport error or an undecodable line is yielded once as `Err`, after
/// which the stream ends.
pub fn decode_events<S, B, E>(body: S) -> impl Stream<Item = Result<AgentEvent, AgentError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: body.boxed(),
        lines: LineDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => match state.lines.push(chunk.as_ref()) {
                    Ok(lines) => state.queue_lines(lines),
                    Err(e) => {
                        state.ready.push_back(Err(e));
                        state.finished = true;
                    }
                },
                Some(Err(e)) => {
                    state
                        .ready
                        .push_back(Err(AgentError::stream(e.to_string())));
                    state.finished = true;
                }
                None => {
                    let rest = state.lines.finish().into_iter().collect();
                    state.queue_lines(rest);
                    state.finished = true;
                }
            }
        }
    })
}
