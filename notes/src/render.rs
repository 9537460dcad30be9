use crate::format::{self, NoteFormat};
use crate::sanitize::{escape_html, sanitize};
use crate::types::NoteContent;
use comrak::Options;

/// Renders note text to sanitized HTML. Markdown goes through comrak with
/// GitHub Flavored Markdown extensions and raw HTML disabled, then the
/// allow-list sanitizer; every other format is fully entity-escaped.
pub struct NoteRenderer<'a> {
    options: Options<'a>,
}

impl<'a> NoteRenderer<'a> {
    pub fn new() -> Self {
        let mut options = Options::default();
        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.extension.tasklist = true;

        Self { options }
    }

    pub fn render(&self, raw: &str) -> NoteContent {
        let format = format::detect(raw);
        let html = match format {
            NoteFormat::Json => render_json(raw),
            NoteFormat::Markdown => self.render_markdown(raw),
            NoteFormat::Yaml => render_yaml(raw),
            NoteFormat::Plain => render_plain(raw),
        };

        NoteContent {
            raw: raw.to_string(),
            format,
            html,
        }
    }

    fn render_markdown(&self, raw: &str) -> String {
        sanitize(&comrak::markdown_to_html(raw, &self.options))
    }
}

impl<'a> Default for NoteRenderer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

fn render_json(raw: &str) -> String {
    let pretty = serde_json::from_str::<serde_json::Value>(raw.trim())
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| raw.trim().to_string());

    format!(
        "<pre class=\"note-json\"><code>{}</code></pre>",
        escape_html(&pretty)
    )
}

fn render_yaml(raw: &str) -> String {
    let mut out = String::from("<pre class=\"note-yaml\">");
    for (i, line) in raw.trim_end().lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match line.split_once(':').filter(|_| format::is_yaml_line(line)) {
            Some((key, rest)) => {
                out.push_str("<span class=\"note-key\">");
                out.push_str(&escape_html(key));
                out.push_str(":</span>");
                out.push_str(&escape_html(rest));
            }
            None => out.push_str(&escape_html(line)),
        }
    }
    out.push_str("</pre>");
    out
}

fn render_plain(raw: &str) -> String {
    format!("<pre class=\"note-plain\">{}</pre>", escape_html(raw.trim_end()))
}
