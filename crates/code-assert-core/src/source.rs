//! Source line classification for Java and Kotlin files.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A source language the classifier understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// `.java`
    Java,
    /// `.kt`
    Kotlin,
}

impl Language {
    /// All supported languages.
    pub const ALL: [Self; 2] = [Self::Java, Self::Kotlin];

    /// Detects the language from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "java" => Some(Self::Java),
            "kt" => Some(Self::Kotlin),
            _ => None,
        }
    }

    fn nested_comments(self) -> bool {
        self == Self::Kotlin
    }

    fn raw_strings(self) -> bool {
        self == Self::Kotlin
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Java => write!(f, "java"),
            Self::Kotlin => write!(f, "kotlin"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "java" => Ok(Self::Java),
            "kotlin" | "kt" => Ok(Self::Kotlin),
            other => Err(format!("unknown language '{other}' (expected java or kotlin)")),
        }
    }
}

/// Line counts of one file or an aggregate of files.
///
/// A line may be both code and comment (`x = 1; // note`); a blank line is
/// neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LineCounts {
    /// Lines containing code.
    pub code: usize,
    /// Lines containing (part of) a comment.
    pub comment: usize,
    /// Whitespace-only lines.
    pub blank: usize,
    /// All lines.
    pub total: usize,
}

impl Add for LineCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            code: self.code + rhs.code,
            comment: self.comment + rhs.comment,
            blank: self.blank + rhs.blank,
            total: self.total + rhs.total,
        }
    }
}

impl AddAssign for LineCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Block(u32),
    RawString,
}

/// Counts code, comment and blank lines of `text`.
#[must_use]
pub fn classify(language: Language, text: &str) -> LineCounts {
    let mut counts = LineCounts::default();
    let mut state = State::Code;

    for line in text.lines() {
        counts.total += 1;
        if line.trim().is_empty() {
            counts.blank += 1;
            continue;
        }

        let (code, comment, next) = scan_line(language, line.as_bytes(), state);
        state = next;
        if code {
            counts.code += 1;
        }
        if comment {
            counts.comment += 1;
        }
    }
    counts
}

/// Returns whether the line has code, whether it has comment, and the state
/// carried into the next line.
fn scan_line(language: Language, line: &[u8], mut state: State) -> (bool, bool, State) {
    let mut code = false;
    let mut comment = false;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < line.len() {
        let c = line[i];
        if let Some(q) = quote {
            if c == b'\\' {
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match state {
            State::Block(depth) => {
                comment = true;
                if at(line, i, b"*/") {
                    state = if depth <= 1 {
                        State::Code
                    } else {
                        State::Block(depth - 1)
                    };
                    i += 2;
                } else if language.nested_comments() && at(line, i, b"/*") {
                    state = State::Block(depth + 1);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            State::RawString => {
                code = true;
                if at(line, i, b"\"\"\"") {
                    state = State::Code;
                    i += 3;
                } else {
                    i += 1;
                }
            }
            State::Code => {
                if c.is_ascii_whitespace() {
                    i += 1;
                } else if at(line, i, b"//") {
                    comment = true;
                    break;
                } else if at(line, i, b"/*") {
                    comment = true;
                    state = State::Block(1);
                    i += 2;
                } else if language.raw_strings() && at(line, i, b"\"\"\"") {
                    code = true;
                    state = State::RawString;
                    i += 3;
                } else {
                    code = true;
                    if c == b'"' || c == b'\'' {
                        quote = Some(c);
                    }
                    i += 1;
                }
            }
        }
    }

    // Java and Kotlin line strings end with the line.
    (code, comment, state)
}

fn at(line: &[u8], i: usize, token: &[u8]) -> bool {
    line.get(i..i + token.len()) == Some(token)
}
