//! Incremental decoder for comma-prefixed JSON lines.
//!
//! The backend streams a JSON array without its brackets: one object per
//! line, every line after the first starting with `,`. The HTTP layer hands
//! us the *cumulative* body received so far, so the decoder only remembers
//! how far it has already scanned.

use tracing::trace;

use super::events::StreamedEvent;

/// Wire-format options for [`JsonLinesDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Separator stripped (once) from the front of each fragment, if present
    pub fragment_prefix_to_strip: Option<char>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            fragment_prefix_to_strip: Some(','),
        }
    }
}

impl DecoderConfig {
    /// Set the separator stripped from each fragment.
    pub fn with_prefix(mut self, prefix: Option<char>) -> Self {
        self.fragment_prefix_to_strip = prefix;
        self
    }
}

/// Lifecycle of one decoding session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting progress notifications
    Active,
    /// The response body ended normally
    Completed,
    /// The transport failed; nothing more will be emitted
    Errored,
}

/// Stateful scanner over a growing response body.
///
/// Invariants:
/// - `cursor` only moves forward and always sits on a line boundary
/// - every emitted event comes from exactly one fragment, in buffer order
/// - a fragment that fails to parse when its newline is seen is dropped for good
#[derive(Debug)]
pub struct JsonLinesDecoder {
    config: DecoderConfig,
    cursor: usize,
    state: SessionState,
}

impl Default for JsonLinesDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonLinesDecoder {
    /// Create a decoder for the default (comma-prefixed) wire format.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a decoder with explicit wire-format options.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            cursor: 0,
            state: SessionState::Active,
        }
    }

    /// Offset just past the last fragment consumed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Scan the cumulative body for newly completed lines.
    ///
    /// Returns the events decoded from lines that ended since the previous
    /// call. Malformed lines are skipped; the cursor advances past them anyway.
    pub fn feed(&mut self, cumulative: &str) -> Vec<StreamedEvent> {
        let mut events = Vec::new();
        if self.state != SessionState::Active {
            return events;
        }
        if cumulative.len() < self.cursor {
            trace!(
                cursor = self.cursor,
                len = cumulative.len(),
                "Ignoring buffer shorter than scan cursor"
            );
            return events;
        }

        let bytes = cumulative.as_bytes();
        loop {
            let search_from = self.cursor + 1;
            if search_from > bytes.len() {
                break;
            }
            let Some(offset) = bytes[search_from..].iter().position(|&b| b == b'\n') else {
                break;
            };
            let newline = search_from + offset;
            match cumulative.get(self.cursor..newline) {
                Some(fragment) => events.extend(self.parse_fragment(fragment)),
                // Only a buffer that rewrote earlier bytes lands the cursor mid-character.
                None => trace!(cursor = self.cursor, "Skipping fragment split inside a character"),
            }
            self.cursor = newline + 1;
        }
        events
    }

    /// End the session, decoding any unterminated trailing fragment.
    ///
    /// Callers should [`feed`](Self::feed) the final buffer first; this only
    /// looks at what lies past the cursor.
    pub fn finish(&mut self, cumulative: &str) -> Option<StreamedEvent> {
        if self.state != SessionState::Active {
            return None;
        }
        self.state = SessionState::Completed;

        let tail = cumulative.get(self.cursor..).unwrap_or("");
        self.cursor = self.cursor.max(cumulative.len());
        if tail.is_empty() {
            return None;
        }
        self.parse_fragment(tail)
    }

    /// Mark the session as failed. Later calls emit nothing.
    pub fn fail(&mut self) {
        self.state = SessionState::Errored;
    }

    fn parse_fragment(&self, fragment: &str) -> Option<StreamedEvent> {
        let json = match self.config.fragment_prefix_to_strip {
            Some(prefix) => fragment.strip_prefix(prefix).unwrap_or(fragment),
            None => fragment,
        };
        match serde_json::from_str::<StreamedEvent>(json) {
            Ok(event) => Some(event),
            Err(e) => {
                trace!(error = %e, fragment = json, "Discarding malformed stream fragment");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEL: &str = "{\"type\":\"text\",\"value\":\"Hel\"}\n";
    const LO: &str = "{\"type\":\"text\",\"value\":\"lo\"}\n";

    #[test]
    fn test_rewritten_buffer_with_cursor_inside_character() {
        let mut decoder = JsonLinesDecoder::new();
        assert!(decoder.feed("ab\n").is_empty());
        assert_eq!(decoder.cursor(), 3);

        // Byte 3 is now the middle of 'é'.
        let rewritten = "aa\u{e9}\nx\n{\"type\":\"text\",\"value\":\"ok\"}\n";
        assert_eq!(decoder.feed(rewritten), vec![StreamedEvent::text("ok")]);
        assert_eq!(decoder.cursor(), rewritten.len());
    }

    #[test]
    fn test_empty_buffer_emits_nothing() {
        let mut decoder = JsonLinesDecoder::new();
        assert!(decoder.feed("").is_empty());
        assert_eq!(decoder.cursor(), 0);
    }

    #[test]
    fn test_no_newline_yet_emits_nothing() {
        let mut decoder = JsonLinesDecoder::new();
        assert!(decoder.feed(r#"{"type":"text","val"#).is_empty());
        assert_eq!(decoder.cursor(), 0);
    }

    #[test]
    fn test_growing_buffer_emits_each_line_once() {
        let mut decoder = JsonLinesDecoder::new();

        let first = decoder.feed(HEL);
        assert_eq!(first, vec![StreamedEvent::text("Hel")]);

        let both = format!("{HEL}{LO}");
        let second = decoder.feed(&both);
        assert_eq!(second, vec![StreamedEvent::text("lo")]);

        // Same buffer again: nothing new.
        assert!(decoder.feed(&both).is_empty());
        assert_eq!(decoder.cursor(), both.len());
    }

    #[test]
    fn test_strips_leading_comma() {
        let mut decoder = JsonLinesDecoder::new();
        let events = decoder.feed(",{\"type\":\"text\",\"value\":\"hi\"}\n");
        assert_eq!(events, vec![StreamedEvent::text("hi")]);
    }

    #[test]
    fn test_strips_only_one_comma() {
        let mut decoder = JsonLinesDecoder::new();
        let body = ",,{\"type\":\"text\",\"value\":\"hi\"}\n";
        assert!(decoder.feed(body).is_empty());
        assert_eq!(decoder.cursor(), body.len());
    }

    #[test]
    fn test_strip_disabled_rejects_comma_lines() {
        let mut decoder = JsonLinesDecoder::with_config(DecoderConfig::default().with_prefix(None));
        let events = decoder.feed(",{\"type\":\"text\",\"value\":\"hi\"}\n");
        assert!(events.is_empty());
    }

    #[test]
    fn test_custom_prefix() {
        let mut decoder =
            JsonLinesDecoder::with_config(DecoderConfig::default().with_prefix(Some(';')));
        let events = decoder.feed(";{\"type\":\"text\",\"value\":\"hi\"}\n");
        assert_eq!(events, vec![StreamedEvent::text("hi")]);
    }

    #[test]
    fn test_backend_array_stream() {
        let body = "{\"type\":\"text\",\"value\":\"a\"}\n\
                    ,{\"type\":\"text\",\"value\":\"b\"}\n\
                    ,{\"type\":\"error:ValueError\",\"value\":\"bad\"}\n";
        let mut decoder = JsonLinesDecoder::new();
        let events = decoder.feed(body);
        assert_eq!(
            events,
            vec![
                StreamedEvent::text("a"),
                StreamedEvent::text("b"),
                StreamedEvent::new("error:ValueError", "bad"),
            ]
        );
    }

    #[test]
    fn test_malformed_line_is_skipped_and_cursor_advances() {
        let mut decoder = JsonLinesDecoder::new();
        let body = format!("not json\n{LO}");
        let events = decoder.feed(&body);
        assert_eq!(events, vec![StreamedEvent::text("lo")]);
        assert_eq!(decoder.cursor(), body.len());
    }

    #[test]
    fn test_truncated_line_is_never_retried() {
        let mut decoder = JsonLinesDecoder::new();
        let partial = "{\"type\":\"text\",\n";
        assert!(decoder.feed(partial).is_empty());
        assert_eq!(decoder.cursor(), partial.len());

        // The rest of the object arrives; the first half was already dropped.
        let later = format!("{partial}\"value\":\"x\"}}\n");
        assert!(decoder.feed(&later).is_empty());
        assert_eq!(decoder.cursor(), later.len());
    }

    #[test]
    fn test_stray_newline_is_discarded() {
        let mut decoder = JsonLinesDecoder::new();
        // The search starts one past the cursor, so a lone "\n" at the cursor
        // is folded into the next fragment, where JSON whitespace rules absorb it.
        let body = format!("\n{HEL}");
        assert_eq!(decoder.feed(&body), vec![StreamedEvent::text("Hel")]);

        let mut decoder = JsonLinesDecoder::new();
        assert!(decoder.feed(",\n").is_empty());
        assert_eq!(decoder.cursor(), 2);
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut decoder = JsonLinesDecoder::new();
        let events = decoder.feed("{\"type\":\"text\",\"value\":\"a\"}\r\n");
        assert_eq!(events, vec![StreamedEvent::text("a")]);
    }

    #[test]
    fn test_shorter_buffer_is_ignored() {
        let mut decoder = JsonLinesDecoder::new();
        decoder.feed(&format!("{HEL}{LO}"));
        let cursor = decoder.cursor();
        assert!(decoder.feed(HEL).is_empty());
        assert_eq!(decoder.cursor(), cursor);
    }

    #[test]
    fn test_finish_parses_unterminated_tail() {
        let mut decoder = JsonLinesDecoder::new();
        let body = "{\"type\":\"text\",\"value\":\"done\"}";
        assert!(decoder.feed(body).is_empty());
        assert_eq!(decoder.finish(body), Some(StreamedEvent::text("done")));
        assert_eq!(decoder.state(), SessionState::Completed);
    }

    #[test]
    fn test_finish_strips_prefix_on_tail() {
        let mut decoder = JsonLinesDecoder::new();
        let body = format!("{HEL},{{\"type\":\"text\",\"value\":\"end\"}}");
        assert_eq!(decoder.feed(&body), vec![StreamedEvent::text("Hel")]);
        assert_eq!(decoder.finish(&body), Some(StreamedEvent::text("end")));
    }

    #[test]
    fn test_finish_with_malformed_tail() {
        let mut decoder = JsonLinesDecoder::new();
        let body = "{\"type\":\"te";
        decoder.feed(body);
        assert_eq!(decoder.finish(body), None);
        assert_eq!(decoder.state(), SessionState::Completed);
    }

    #[test]
    fn test_finish_with_nothing_left() {
        let mut decoder = JsonLinesDecoder::new();
        decoder.feed(HEL);
        assert_eq!(decoder.finish(HEL), None);
    }

    #[test]
    fn test_finish_twice_emits_once() {
        let mut decoder = JsonLinesDecoder::new();
        let body = "{\"type\":\"text\",\"value\":\"done\"}";
        assert!(decoder.finish(body).is_some());
        assert!(decoder.finish(body).is_none());
    }

    #[test]
    fn test_nothing_after_completion() {
        let mut decoder = JsonLinesDecoder::new();
        decoder.finish("");
        assert!(decoder.feed(HEL).is_empty());
    }

    #[test]
    fn test_nothing_after_failure() {
        let mut decoder = JsonLinesDecoder::new();
        decoder.fail();
        assert_eq!(decoder.state(), SessionState::Errored);
        assert!(decoder.feed(HEL).is_empty());
        assert!(decoder.finish(HEL).is_none());
        assert_eq!(decoder.state(), SessionState::Errored);
    }

    #[test]
    fn test_multibyte_text() {
        let mut decoder = JsonLinesDecoder::new();
        let body = "{\"type\":\"text\",\"value\":\"zażółć\"}\n,{\"type\":\"text\",\"value\":\"🙂\"}\n";
        let events = decoder.feed(body);
        assert_eq!(
            events,
            vec![StreamedEvent::text("zażółć"), StreamedEvent::text("🙂")]
        );
    }
}
