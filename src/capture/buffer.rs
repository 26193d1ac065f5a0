// src/capture/buffer.rs

//! Bounded in-memory log text.

/// Default cap on buffered bytes per job.
pub const DEFAULT_CAP: usize = 500_000;
/// Default amount dropped from the front once the cap is exceeded.
pub const DEFAULT_TRIM_UNIT: usize = 100_000;

/// Append-only text buffer that forgets its oldest content.
///
/// Trimming is amortized: nothing happens until `cap` is exceeded, and then at
/// least `trim_unit` bytes (extended to the end of the line they fall in) are
/// dropped in one go. After every `append` the length is at most `cap`, so
/// the cap is never exceeded by more than one trim unit.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    text: String,
    cap: usize,
    trim_unit: usize,
}

impl LogBuffer {
    pub fn new(cap: usize, trim_unit: usize) -> Self {
        Self {
            text: String::new(),
            cap,
            trim_unit: trim_unit.max(1),
        }
    }

    pub fn append(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        while self.text.len() > self.cap {
            self.trim_front();
        }
    }

    fn trim_front(&mut self) {
        let bytes = self.text.as_bytes();
        let cut = if self.trim_unit >= bytes.len() {
            bytes.len()
        } else {
            bytes[self.trim_unit - 1..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|i| self.trim_unit + i)
                .unwrap_or(bytes.len())
        };
        self.text.drain(..cut);
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn trim_unit(&self) -> usize {
        self.trim_unit
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// At most `last_n` trailing lines; everything for `None` or `Some(0)`.
    pub fn tail(&self, last_n: Option<usize>) -> String {
        tail_lines(&self.text, last_n)
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAP, DEFAULT_TRIM_UNIT)
    }
}

/// Keep the last `last_n` lines of `text`, each terminated by `\n`.
///
/// `None` and `Some(0)` return `text` unchanged.
pub fn tail_lines(text: &str, last_n: Option<usize>) -> String {
    let n = match last_n {
        Some(n) if n > 0 => n,
        _ => return text.to_string(),
    };

    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    let mut out = String::new();
    for line in &lines[start..] {
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_is_trimmed_below_the_cap() {
        let mut buf = LogBuffer::new(100, 10);
        buf.append("a\nb\n");
        assert_eq!(buf.as_str(), "a\nb\n");
    }

    #[test]
    fn trimming_drops_whole_lines_from_the_front() {
        let mut buf = LogBuffer::new(20, 8);
        for i in 0..10 {
            buf.append(&format!("line {i}\n"));
        }
        assert!(buf.len() <= 20, "len {}", buf.len());
        assert!(buf.as_str().ends_with("line 9\n"));
        assert!(
            buf.as_str().starts_with("line "),
            "trim must stop on a line boundary: {:?}",
            buf.as_str()
        );
    }

    #[test]
    fn an_oversized_line_is_dropped_entirely() {
        let mut buf = LogBuffer::new(10, 4);
        buf.append(&"x".repeat(25));
        assert!(buf.is_empty());
        buf.append("ok\n");
        assert_eq!(buf.as_str(), "ok\n");
    }

    #[test]
    fn trimming_never_splits_a_multibyte_character() {
        let mut buf = LogBuffer::new(12, 5);
        for _ in 0..6 {
            buf.append("héllo\n");
        }
        assert!(buf.len() <= 12);
        assert!(buf.as_str().is_empty() || buf.as_str().starts_with('h'));
    }

    #[test]
    fn tail_returns_the_most_recent_lines_in_order() {
        let text = "1\n2\n3\n4\n5\n";
        assert_eq!(tail_lines(text, Some(2)), "4\n5\n");
        assert_eq!(tail_lines(text, Some(10)), text);
        assert_eq!(tail_lines(text, Some(0)), text);
        assert_eq!(tail_lines(text, None), text);
        assert_eq!(tail_lines("", Some(3)), "");
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut buf = LogBuffer::default();
        buf.append("hello\n");
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.cap(), DEFAULT_CAP);
    }
}
