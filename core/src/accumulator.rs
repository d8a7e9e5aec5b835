use crate::errors::{ChatError, ChatResult};
use crate::suggestions::{strip_open_block, strip_suggestion_blocks};

/// Running text of the assistant turn currently being streamed.
///
/// Deltas are appended in arrival order. `display_text` is what may be shown
/// at any point: closed suggestion blocks are removed, and so is an unclosed
/// block still being received at the tail.
#[derive(Debug, Default, Clone)]
pub struct StreamAccumulator {
    buffer: String,
    max_bytes: Option<usize>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator that refuses to grow past `max_bytes`
    pub fn with_limit(max_bytes: Option<usize>) -> Self {
        Self {
            buffer: String::new(),
            max_bytes,
        }
    }

    pub fn append(&mut self, delta: &str) -> ChatResult<()> {
        if let Some(limit) = self.max_bytes {
            if self.buffer.len() + delta.len() > limit {
                return Err(ChatError::StreamError(format!(
                    "response exceeded {} bytes",
                    limit
                )));
            }
        }
        self.buffer.push_str(delta);
        Ok(())
    }

    pub fn display_text(&self) -> String {
        let stripped = strip_suggestion_blocks(&self.buffer);
        strip_open_block(&stripped).trim().to_string()
    }

    /// Raw buffer, suggestion block included
    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_text(self) -> String {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestions::{parse_suggestions, SUGGESTIONS_START};

    fn fed(deltas: &[&str]) -> StreamAccumulator {
        let mut acc = StreamAccumulator::new();
        for delta in deltas {
            acc.append(delta).unwrap();
        }
        acc
    }

    #[test]
    fn test_append_is_associative() {
        assert_eq!(fed(&["a", "b", "c"]).text(), fed(&["abc"]).text());
        assert_eq!(fed(&["a", "b", "c"]).text(), "abc");
    }

    #[test]
    fn test_display_without_markers_is_trimmed_buffer() {
        let acc = fed(&["  Hello", " world \n"]);
        assert_eq!(acc.display_text(), "Hello world");
        assert_eq!(acc.text(), "  Hello world \n");
    }

    #[test]
    fn test_display_is_idempotent() {
        let acc = fed(&["Answer\n[SUGGESTIONS]\n\"Q?\"\n[/SUGGESTIONS]\n"]);
        let first = acc.display_text();
        assert_eq!(first, "Answer");
        assert_eq!(acc.display_text(), first);
    }

    #[test]
    fn test_streaming_scenario() {
        let mut acc = StreamAccumulator::new();
        acc.append("Olá!\n").unwrap();
        assert_eq!(acc.display_text(), "Olá!");

        acc.append("[SUGGESTIONS]\n\"Pergunta 1?\"").unwrap();
        assert_eq!(acc.display_text(), "Olá!");

        acc.append("\n\"Pergunta 2?\"\n[/SUGGESTIONS]").unwrap();
        assert_eq!(acc.display_text(), "Olá!");
        assert_eq!(
            parse_suggestions(acc.text()),
            vec!["Pergunta 1?", "Pergunta 2?"]
        );
    }

    #[test]
    fn test_text_after_block_stays_visible() {
        let acc = fed(&["Before [SUGGESTIONS]\"x\"[/SUGGESTIONS] after"]);
        assert_eq!(acc.display_text(), "Before  after");
    }

    #[test]
    fn test_every_unclosed_start_is_hidden() {
        let acc = fed(&["Olá! [SUGGESTIONS] oops\n", "[SUGGESTIONS]\n\"Q"]);
        assert_eq!(acc.display_text(), "Olá!");
        assert!(!acc.display_text().contains(SUGGESTIONS_START));
    }

    #[test]
    fn test_limit_rejects_overflow_and_keeps_buffer() {
        let mut acc = StreamAccumulator::with_limit(Some(5));
        acc.append("abc").unwrap();
        let err = acc.append("def").unwrap_err();
        assert!(matches!(err, ChatError::StreamError(_)));
        assert_eq!(acc.text(), "abc");
        acc.append("de").unwrap();
        assert_eq!(acc.len(), 5);
    }
}
