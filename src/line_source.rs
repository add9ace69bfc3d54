use std::io::{self, BufRead};

/// One line of dump text together with its position in the stream.
///
/// Borrows the source's internal buffer; the content is only valid until the
/// next call to [`LineSource::next_line`].
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    /// 1-based position of the line in the input stream.
    pub ordinal: u64,
    /// Line content without the trailing line terminator.
    pub text: &'a str,
}

/// Pull-based reader that turns a byte stream into an ordered, lazy sequence
/// of text lines.
///
/// The internal buffers are reused across calls, so reading a multi-billion
/// line dump allocates a constant amount of memory. Decompression is the
/// caller's job; this type only consumes already-decoded bytes.
pub struct LineSource<R> {
    reader: R,
    raw: Vec<u8>,
    text: String,
    ordinal: u64,
    non_utf8_lines: u64,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            raw: Vec::with_capacity(64 * 1024),
            text: String::with_capacity(64 * 1024),
            ordinal: 0,
            non_utf8_lines: 0,
        }
    }

    /// Read the next line, or `None` at end of stream.
    ///
    /// `\n` and `\r\n` terminators are stripped; a final line without a
    /// terminator is still yielded. Lines that are not valid UTF-8 are
    /// recovered lossily (invalid sequences become U+FFFD) rather than
    /// aborting the scan.
    pub fn next_line(&mut self) -> io::Result<Option<Line<'_>>> {
        self.raw.clear();
        if self.reader.read_until(b'\n', &mut self.raw)? == 0 {
            return Ok(None);
        }
        self.ordinal += 1;

        if self.raw.last() == Some(&b'\n') {
            self.raw.pop();
        }
        if self.raw.last() == Some(&b'\r') {
            self.raw.pop();
        }

        self.text.clear();
        match std::str::from_utf8(&self.raw) {
            Ok(line) => self.text.push_str(line),
            Err(_) => {
                self.register_non_utf8();
                self.text.push_str(&String::from_utf8_lossy(&self.raw));
            }
        }

        Ok(Some(Line {
            ordinal: self.ordinal,
            text: &self.text,
        }))
    }

    fn register_non_utf8(&mut self) {
        self.non_utf8_lines += 1;

        if self.non_utf8_lines == 1 {
            tracing::warn!(
                message = "non-UTF-8 bytes in input, replacing with U+FFFD. Further occurrences will not be reported.",
                line = self.ordinal
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(input: &[u8]) -> Vec<(u64, String)> {
        let mut source = LineSource::new(Cursor::new(input));
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().unwrap() {
            lines.push((line.ordinal, line.text.to_string()));
        }
        lines
    }

    #[test]
    fn ordinals_are_dense_and_one_based() {
        let lines = collect(b"a\nb\nc\n");
        assert_eq!(
            lines,
            vec![
                (1, "a".to_string()),
                (2, "b".to_string()),
                (3, "c".to_string())
            ]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(collect(b"").is_empty());
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let lines = collect(b"<page>\r\n<title>x</title>\r\n");
        assert_eq!(lines[0].1, "<page>");
        assert_eq!(lines[1].1, "<title>x</title>");
    }

    #[test]
    fn final_unterminated_line_is_yielded() {
        let lines = collect(b"first\nlast");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], (2, "last".to_string()));
    }

    #[test]
    fn empty_lines_are_preserved() {
        let lines = collect(b"a\n\nb\n");
        assert_eq!(lines[1].1, "");
        assert_eq!(lines[2], (3, "b".to_string()));
    }

    #[test]
    fn non_utf8_bytes_are_replaced() {
        let lines = collect(b"ok\nbad\xff\xfeline\n");
        assert_eq!(lines[0].1, "ok");
        assert_eq!(lines[1].1, "bad\u{fffd}\u{fffd}line");
    }
}
