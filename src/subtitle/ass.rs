// Advanced SubStation Alpha subtitle parsing
use super::{clean_line, parse_timecode, SubtitleEntry};
use crate::error::Result;
use std::io::{BufRead, Lines};

const DIALOGUE_PREFIX: &str = "Dialogue: ";
const EVENTS_SECTION: &str = "Events";
const MIN_FIELDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Events,
}

/// Yields one entry per `Dialogue:` line of the `[Events]` section.
pub struct AssParser<R> {
    lines: Lines<R>,
    section: Section,
}

impl<R: BufRead> AssParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            section: Section::Other,
        }
    }
}

impl<R: BufRead> Iterator for AssParser<R> {
    type Item = Result<SubtitleEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            let line = clean_line(&line);

            if line.starts_with('[') && line.ends_with(']') {
                self.section = if &line[1..line.len() - 1] == EVENTS_SECTION {
                    Section::Events
                } else {
                    Section::Other
                };
                continue;
            }

            if self.section != Section::Events {
                continue;
            }

            if let Some(dialogue) = line.strip_prefix(DIALOGUE_PREFIX) {
                if let Some(entry) = parse_dialogue(dialogue) {
                    return Some(entry);
                }
            }
        }

        None
    }
}

/// Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text.
fn parse_dialogue(dialogue: &str) -> Option<Result<SubtitleEntry>> {
    let fields: Vec<&str> = dialogue.split(',').collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let text = fields[MIN_FIELDS - 1..].join(",");

    Some(parse_timecode(fields[1]).and_then(|start| {
        let end = parse_timecode(fields[2])?;
        Ok(SubtitleEntry { start, end, text })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "[Script Info]\nTitle: Test\n\n[V4+ Styles]\nFormat: Name, Fontname\n\n";

    fn parse(text: &str) -> Vec<SubtitleEntry> {
        AssParser::new(text.as_bytes())
            .map(|entry| entry.unwrap())
            .collect()
    }

    #[test]
    fn test_parse_events() {
        let doc = format!(
            "{HEADER}[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: 0,0:00:01.50,0:00:03.00,Default,,0,0,0,,Hello, world\nComment: 0,0:00:04.00,0:00:05.00,Default,,0,0,0,,ignored\nDialogue: 0,0:01:00.00,0:01:02.25,Default,,0,0,0,,Second\n"
        );
        let entries = parse(&doc);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].start, 1.5);
        assert_eq!(entries[0].end, 3.0);
        assert_eq!(entries[0].text, "Hello, world");
        assert_eq!(entries[1].start, 60.0);
        assert_eq!(entries[1].end, 62.25);
    }

    #[test]
    fn test_ignores_dialogue_outside_events() {
        let doc = "[Script Info]\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Too early\n[Events]\nDialogue: 0,0:00:03.00,0:00:04.00,Default,,0,0,0,,Counted\n[Fonts]\nDialogue: 0,0:00:05.00,0:00:06.00,Default,,0,0,0,,Too late\n";
        let entries = parse(doc);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Counted");
    }

    #[test]
    fn test_skips_short_dialogue() {
        let doc = "[Events]\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,Nine\nDialogue: 0,0:00:03.00,0:00:04.00,Default,,0,0,0,,Ten\n";
        let entries = parse(doc);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Ten");
    }

    #[test]
    fn test_empty_text_field() {
        let doc = "[Events]\r\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,\r\n";
        let entries = parse(doc);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "");
    }
}
