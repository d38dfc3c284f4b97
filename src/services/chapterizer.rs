use crate::models::Chapter;
use regex::Regex;
use std::sync::LazyLock;

/// Title of the implicit chapter covering text before the first heading.
pub const SENTINEL_TITLE: &str = "Introduction/Beginning";

/// Which heading pattern recognised a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingRule {
    /// "Chapter 1", "CHAPTER XII", "Chapter One", or a numbered/bare line of words.
    Chapter,
    /// "Part 1", "PART II", "Part Two".
    Part,
}

// Tested in order; the first rule to match a line wins.
static HEADING_PATTERNS: LazyLock<Vec<(HeadingRule, Regex)>> = LazyLock::new(|| {
    let patterns = [
        (
            HeadingRule::Chapter,
            r"(?im)^(chapter\s+\d+|chapter\s+[IVXLCDM]+|chapter\s+[A-Za-z]+|(\d+\.\s+)?\w+\s+.*)\s*$",
        ),
        (
            HeadingRule::Part,
            r"(?im)^(part\s+\d+|part\s+[IVXLCDM]+|part\s+[A-Za-z]+)\s*$",
        ),
    ];

    patterns
        .into_iter()
        .filter_map(|(rule, pattern)| Regex::new(pattern).ok().map(|regex| (rule, regex)))
        .collect()
});

/// Decide whether a (trimmed) line is a chapter heading, and by which rule.
///
/// The chapter rule's fallback branch accepts any line of two or more words,
/// so plenty of ordinary prose lines are reported as headings too.
pub fn classify(line: &str) -> Option<HeadingRule> {
    HEADING_PATTERNS
        .iter()
        .find(|(_, regex)| regex.is_match(line))
        .map(|(rule, _)| *rule)
}

struct OpenChapter<'a> {
    title: &'a str,
    start_line: usize,
    has_heading: bool,
}

impl OpenChapter<'_> {
    /// First line after the heading, if any.
    fn body_start(&self) -> usize {
        self.start_line + usize::from(self.has_heading)
    }

    fn close(&self, end_line: usize) -> Chapter {
        Chapter {
            title: self.title.trim().to_string(),
            start_line: self.start_line,
            end_line,
        }
    }
}

/// Split `text` into chapters at heading lines.
///
/// Line numbers index `text.split('\n')`. A chapter closed by the next heading
/// is dropped when no line separates the two, which also drops the sentinel
/// chapter when the text opens with a heading. The last chapter always runs
/// to the final line.
pub fn locate(text: &str) -> Vec<Chapter> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut chapters = Vec::new();

    let mut current = OpenChapter {
        title: SENTINEL_TITLE,
        start_line: 0,
        has_heading: false,
    };

    for (idx, line) in lines.iter().enumerate() {
        let line = line.trim();
        if classify(line).is_none() {
            continue;
        }

        if idx > current.body_start() {
            chapters.push(current.close(idx - 1));
        }

        current = OpenChapter {
            title: line,
            start_line: idx,
            has_heading: true,
        };
    }

    // split('\n') always yields at least one line
    chapters.push(current.close(lines.len() - 1));

    tracing::debug!("Located {} chapters in {} lines", chapters.len(), lines.len());
    chapters
}
