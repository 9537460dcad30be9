use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteFormat {
    Json,
    Markdown,
    Yaml,
    Plain,
}

impl fmt::Display for NoteFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Yaml => "yaml",
            Self::Plain => "plain",
        })
    }
}

static MARKDOWN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // ATX heading
        r"(?m)^#{1,6}\s+\S",
        // bold
        r"\*\*[^*\n]+\*\*",
        // bullet list item
        r"(?m)^\s*[-*+]\s+\S",
        // ordered list item
        r"(?m)^\s*\d+\.\s+\S",
        // table row
        r"(?m)^\|.+\|\s*$",
        // code fence
        r"(?m)^\s*```",
        // HTML comment
        r"<!--",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("markdown pattern"))
    .collect()
});

static YAML_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*:\s+\S").expect("yaml pattern"));

/// Whether a single line looks like a `key: value` pair.
pub(crate) fn is_yaml_line(line: &str) -> bool {
    YAML_LINE.is_match(line)
}

/// Classifies note text. Total over any input: unrecognized content is
/// [`NoteFormat::Plain`].
pub fn detect(content: &str) -> NoteFormat {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return NoteFormat::Plain;
    }

    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return NoteFormat::Json;
    }

    if MARKDOWN_PATTERNS.iter().any(|p| p.is_match(trimmed)) {
        return NoteFormat::Markdown;
    }

    let yaml_lines = trimmed
        .lines()
        .filter(|line| YAML_LINE.is_match(line))
        .count();
    if yaml_lines >= 2 {
        return NoteFormat::Yaml;
    }

    NoteFormat::Plain
}
