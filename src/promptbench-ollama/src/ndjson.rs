//! Newline-delimited JSON stream decoding.
//!
//! The generate endpoint streams one JSON object per line, but the HTTP layer
//! hands us raw byte chunks that can end anywhere: mid-line, or even in the
//! middle of a multi-byte UTF-8 sequence. [`NdjsonDecoder`] buffers both kinds
//! of partial data and only ever emits records parsed from complete lines.
//!
//! A line that fails to parse is logged and dropped; decoding continues with
//! the next line. One decoder handles exactly one stream.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

/// Byte buffer that only releases complete UTF-8 sequences.
///
/// Trailing bytes that form an incomplete multi-byte character are held back
/// until the next chunk arrives.
struct Utf8Carry {
    buf: Vec<u8>,
}

impl Utf8Carry {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append raw bytes and return the decoded complete prefix.
    fn push(&mut self, data: &[u8]) -> String {
        self.buf.extend_from_slice(data);

        let valid_len = match std::str::from_utf8(&self.buf) {
            Ok(s) => s.len(),
            // An incomplete sequence at the tail: keep it for the next chunk.
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            // Genuinely invalid bytes mid-stream: decode lossily and move on.
            Err(_) => {
                let out = String::from_utf8_lossy(&self.buf).into_owned();
                self.buf.clear();
                return out;
            }
        };

        let rest = self.buf.split_off(valid_len);
        let out = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf = rest;
        out
    }

    /// Decode whatever is left, replacing any dangling partial sequence.
    fn flush(&mut self) -> String {
        if self.buf.is_empty() {
            return String::new();
        }
        let bytes = std::mem::take(&mut self.buf);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Incremental decoder for a stream of newline-delimited JSON records.
///
/// Feed it byte chunks as they arrive; it yields every record whose line has
/// been fully received, in order. Call [`NdjsonDecoder::finish`] once the
/// underlying stream ends to flush a final unterminated line.
pub struct NdjsonDecoder<T> {
    utf8: Utf8Carry,
    /// Trailing incomplete line carried across chunks.
    carry: String,
    _record: PhantomData<T>,
}

impl<T: DeserializeOwned> NdjsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            utf8: Utf8Carry::new(),
            carry: String::new(),
            _record: PhantomData,
        }
    }

    /// Feed one chunk of raw bytes, returning all records completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<T> {
        let text = self.utf8.push(chunk);
        if text.is_empty() {
            return Vec::new();
        }

        self.carry.push_str(&text);

        let mut records = Vec::new();
        while let Some(pos) = self.carry.find('\n') {
            let line: String = self.carry.drain(..=pos).collect();
            if let Some(record) = parse_line(line.trim_end_matches('\n')) {
                records.push(record);
            }
        }
        records
    }

    /// Signal end-of-stream, flushing any buffered unterminated line.
    pub fn finish(mut self) -> Option<T> {
        self.carry.push_str(&self.utf8.flush());
        let line = std::mem::take(&mut self.carry);
        parse_line(&line)
    }
}

impl<T: DeserializeOwned> Default for NdjsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a single line, skipping blanks and malformed records.
fn parse_line<T: DeserializeOwned>(line: &str) -> Option<T> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(error = %e, line, "skipping malformed stream line");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerateChunk;
    use pretty_assertions::assert_eq;

    fn decode_split(input: &[u8], split_at: usize) -> Vec<GenerateChunk> {
        let mut decoder = NdjsonDecoder::new();
        let (head, tail) = input.split_at(split_at);
        let mut out = decoder.feed(head);
        out.extend(decoder.feed(tail));
        out.extend(decoder.finish());
        out
    }

    fn decode_whole(input: &[u8]) -> Vec<GenerateChunk> {
        decode_split(input, 0)
    }

    #[test]
    fn decodes_complete_lines() {
        let body = b"{\"response\":\"Hel\"}\n{\"response\":\"lo\"}\n{\"done\":true}\n";
        let chunks = decode_whole(body);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text(), Some("Hel"));
        assert_eq!(chunks[1].text(), Some("lo"));
        assert!(chunks[2].done);
    }

    #[test]
    fn any_chunk_split_yields_same_records() {
        let body: &[u8] =
            b"{\"response\":\"a\"}\n{\"response\":\"caf\xc3\xa9\"}\n{\"response\":\"b\",\"done\":false}\n{\"done\":true}\n";
        let reference = decode_whole(body);
        assert_eq!(reference.len(), 4);

        for split in 0..=body.len() {
            let chunks = decode_split(body, split);
            assert_eq!(chunks, reference, "split at byte {split}");
        }
    }

    #[test]
    fn split_mid_line_emits_one_record() {
        let body = b"{\"resp";
        let rest = b"onse\":\"x\"}\n";
        let mut decoder = NdjsonDecoder::<GenerateChunk>::new();
        assert!(decoder.feed(body).is_empty());
        let chunks = decoder.feed(rest);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text(), Some("x"));
    }

    #[test]
    fn split_mid_codepoint_defers_partial_bytes() {
        // U+00E9 is 0xC3 0xA9; split between the two bytes.
        let body = "{\"response\":\"é\"}\n".as_bytes();
        let split = body.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let chunks = decode_split(body, split);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text(), Some("é"));
    }

    #[test]
    fn malformed_line_is_dropped_neighbors_survive() {
        let body = b"{\"response\":\"ok\"}\n{\"response\":\n{\"done\":true}\n";
        let chunks = decode_whole(body);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text(), Some("ok"));
        assert!(chunks[1].done);
    }

    #[test]
    fn blank_lines_are_discarded() {
        let body = b"\n   \n{\"done\":true}\n\n";
        let chunks = decode_whole(body);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn finish_flushes_unterminated_final_line() {
        let mut decoder = NdjsonDecoder::<GenerateChunk>::new();
        assert!(decoder.feed(b"{\"done\":true}").is_empty());
        let last = decoder.finish();
        assert!(last.is_some_and(|c| c.done));
    }

    #[test]
    fn finish_on_empty_stream_yields_nothing() {
        let decoder = NdjsonDecoder::<GenerateChunk>::new();
        assert!(decoder.finish().is_none());
    }
}
