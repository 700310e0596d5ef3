// SubRip subtitle parsing
use super::{clean_line, parse_timecode, SubtitleEntry};
use crate::error::Result;
use std::io::{BufRead, Lines};

const TIMING_DELIMITER: &str = " --> ";

/// Yields one entry per blank-line terminated block.
pub struct SrtParser<R> {
    lines: Lines<R>,
    block: Vec<String>,
    finished: bool,
}

impl<R: BufRead> SrtParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            block: Vec::new(),
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for SrtParser<R> {
    type Item = Result<SubtitleEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.lines.next() {
                Some(Ok(line)) => {
                    let line = clean_line(&line).to_string();
                    let is_blank = line.is_empty();
                    self.block.push(line);

                    if is_blank {
                        let block = std::mem::take(&mut self.block);
                        if let Some(entry) = parse_block(&block) {
                            return Some(entry);
                        }
                    }
                }
                Some(Err(e)) => return Some(Err(e.into())),
                None => {
                    self.finished = true;
                    // A last block without a trailing blank line ends at EOF.
                    if !self.block.is_empty() {
                        let mut block = std::mem::take(&mut self.block);
                        block.push(String::new());
                        return parse_block(&block);
                    }
                }
            }
        }

        None
    }
}

/// Parse an index line, a timing line, text lines and the terminating blank.
fn parse_block(block: &[String]) -> Option<Result<SubtitleEntry>> {
    if block.len() < 4 {
        return None;
    }

    let times: Vec<&str> = block[1].split(TIMING_DELIMITER).collect();
    if times.len() != 2 {
        return None;
    }

    // Drop trailing display coordinates such as "X1:100 X2:200".
    let end_text = times[1].split_whitespace().next().unwrap_or_default();
    let text = block[2..block.len() - 1].join("\n");

    Some(parse_timecode(times[0]).and_then(|start| {
        let end = parse_timecode(end_text)?;
        Ok(SubtitleEntry { start, end, text })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CondenseError;

    fn parse(text: &str) -> Vec<Result<SubtitleEntry>> {
        SrtParser::new(text.as_bytes()).collect()
    }

    #[test]
    fn test_parse_blocks() {
        let doc = "1\n00:00:01,000 --> 00:00:02,500\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nTwo\nlines\n\n";
        let entries: Vec<SubtitleEntry> = parse(doc).into_iter().map(|e| e.unwrap()).collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].start, 1.0);
        assert_eq!(entries[0].end, 2.5);
        assert_eq!(entries[0].text, "Hello");
        assert_eq!(entries[1].text, "Two\nlines");
    }

    #[test]
    fn test_skips_short_block() {
        let doc = "1\n00:00:01,000 --> 00:00:02,000\n\n2\n00:00:03,000 --> 00:00:04,000\nKept\n\n";
        let entries = parse(doc);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].as_ref().unwrap().text, "Kept");
    }

    #[test]
    fn test_skips_block_without_delimiter() {
        let doc = "1\n00:00:01,000 - 00:00:02,000\nBroken\n\n2\n00:00:03,000 --> 00:00:04,000\nKept\n\n";
        let entries = parse(doc);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].as_ref().unwrap().start, 3.0);
    }

    #[test]
    fn test_crlf_bom_and_missing_trailing_blank() {
        let doc = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\nFirst\r\n\r\n2\r\n00:00:05,000 --> 00:00:06,000\r\nLast";
        let entries: Vec<SubtitleEntry> = parse(doc).into_iter().map(|e| e.unwrap()).collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "First");
        assert_eq!(entries[1].text, "Last");
        assert_eq!(entries[1].end, 6.0);
    }

    #[test]
    fn test_timing_line_with_coordinates() {
        let doc = "1\n00:00:01,000 --> 00:00:02,000 X1:10 X2:20 Y1:5 Y2:9\nPositioned\n\n";
        let entries = parse(doc);

        assert_eq!(entries[0].as_ref().unwrap().end, 2.0);
    }

    #[test]
    fn test_malformed_timecode_is_error() {
        let doc = "1\naa:bb --> 00:00:02,000\nBad\n\n";
        let entries = parse(doc);

        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0], Err(CondenseError::Format(_))));
    }

    #[test]
    fn test_empty_document() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n\n").is_empty());
    }
}
