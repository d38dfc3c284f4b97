use serde::{Deserialize, Serialize};

/// A run of lines in the uploaded text, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl Chapter {
    /// The chapter's lines from `text`, joined back with `\n`.
    pub fn text(&self, text: &str) -> String {
        text.split('\n')
            .skip(self.start_line)
            .take(self.end_line + 1 - self.start_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuizQuestion {
    pub const OPTION_COUNT: usize = 4;

    /// Exactly four options, one of which is the correct answer.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == Self::OPTION_COUNT
            && self
                .options
                .iter()
                .filter(|option| **option == self.correct_answer)
                .count()
                == 1
    }

    /// Options prefixed `A.`, `B.`, ... for display.
    pub fn labelled_options(&self) -> Vec<String> {
        self.options
            .iter()
            .zip('A'..)
            .map(|(option, label)| format!("{}. {}", label, option))
            .collect()
    }
}

/// How a quiz request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizOutcome {
    Questions(Vec<QuizQuestion>),
    /// Validation failure, either local or reported by the model as `{"error": ...}`.
    Rejected { error: String },
    /// The model replied, but not with anything usable as a quiz.
    Unusable,
    /// The call itself failed; the gateway has already recorded a notice.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing message attached to an API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Notices collected while handling one request.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct Notices(Vec<Notice>);

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.0.push(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.0.iter()
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.0.iter().filter(|notice| notice.level == level).count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
