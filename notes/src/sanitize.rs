//! Allow-listed HTML sanitizer for rendered note content. Anything outside
//! the allow list is entity-escaped rather than dropped, so hostile markup
//! degrades to visible text instead of executing.

/// Escapes HTML special characters.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input"];

fn allowed_attrs(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href", "title"],
        "img" => &["src", "alt", "title"],
        "input" => &["type", "checked", "disabled"],
        "code" => &["class"],
        "ol" => &["start"],
        "th" | "td" => &["align"],
        _ => &[],
    }
}

fn tag_allowed(tag: &str) -> bool {
    matches!(
        tag,
        "a" | "blockquote"
            | "br"
            | "code"
            | "del"
            | "em"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "hr"
            | "img"
            | "input"
            | "li"
            | "ol"
            | "p"
            | "pre"
            | "strong"
            | "sup"
            | "table"
            | "tbody"
            | "td"
            | "th"
            | "thead"
            | "tr"
            | "ul"
    )
}

/// Rejects URLs carrying an executable or otherwise unexpected scheme.
/// Control characters and whitespace are stripped first so `java\tscript:`
/// does not slip through.
fn is_safe_url(value: &str, allow_relative_schemes: bool) -> bool {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .collect();
    let lower = cleaned.to_ascii_lowercase();

    if let Some(colon) = lower.find(':') {
        let before = &lower[..colon];
        let has_scheme = !before.contains('/') && !before.contains('?') && !before.contains('#');
        if has_scheme {
            return match before {
                "http" | "https" => true,
                "mailto" => allow_relative_schemes,
                _ => false,
            };
        }
    }

    true
}

fn attr_value_allowed(tag: &str, attr: &str, value: &str) -> bool {
    match (tag, attr) {
        ("a", "href") => is_safe_url(value, true),
        ("img", "src") => is_safe_url(value, false),
        ("input", "type") => value.eq_ignore_ascii_case("checkbox"),
        ("code", "class") => {
            value.strip_prefix("language-").is_some_and(|rest| {
                rest.bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'+' | b'.' | b'#'))
            })
        }
        ("ol", "start") => value.bytes().all(|b| b.is_ascii_digit()) && !value.is_empty(),
        ("th", "align") | ("td", "align") => {
            matches!(value, "left" | "center" | "right")
        }
        _ => true,
    }
}

#[derive(Debug, PartialEq)]
struct ParsedTag {
    name: String,
    closing: bool,
    attrs: Vec<(String, Option<String>)>,
    /// Byte offset one past the terminating `>`.
    end: usize,
}

/// Parses the tag starting at `start` (which must point at `<`). Returns
/// `None` when the input is not a well-formed tag, in which case the caller
/// escapes the `<` and moves on.
fn parse_tag(html: &str, start: usize) -> Option<ParsedTag> {
    let bytes = html.as_bytes();
    let mut pos = start + 1;

    let closing = bytes.get(pos) == Some(&b'/');
    if closing {
        pos += 1;
    }

    let name_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() {
        pos += 1;
    }
    if pos == name_start {
        return None;
    }
    let name = html[name_start..pos].to_ascii_lowercase();

    let mut attrs = Vec::new();
    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos) {
            None => return None,
            Some(b'>') => {
                return Some(ParsedTag {
                    name,
                    closing,
                    attrs,
                    end: pos + 1,
                });
            }
            Some(b'/') if bytes.get(pos + 1) == Some(&b'>') => {
                return Some(ParsedTag {
                    name,
                    closing,
                    attrs,
                    end: pos + 2,
                });
            }
            _ => {}
        }

        let attr_start = pos;
        while pos < bytes.len()
            && (bytes[pos].is_ascii_alphanumeric() || matches!(bytes[pos], b'-' | b'_'))
        {
            pos += 1;
        }
        if pos == attr_start {
            // Junk inside the tag; refuse to treat it as markup.
            return None;
        }
        let attr_name = html[attr_start..pos].to_ascii_lowercase();

        if bytes.get(pos) == Some(&b'=') {
            pos += 1;
            let value = match bytes.get(pos) {
                Some(&quote @ (b'"' | b'\'')) => {
                    pos += 1;
                    let value_start = pos;
                    while pos < bytes.len() && bytes[pos] != quote {
                        pos += 1;
                    }
                    if pos >= bytes.len() {
                        return None;
                    }
                    let value = html[value_start..pos].to_string();
                    pos += 1;
                    value
                }
                _ => {
                    let value_start = pos;
                    while pos < bytes.len()
                        && !bytes[pos].is_ascii_whitespace()
                        && bytes[pos] != b'>'
                    {
                        pos += 1;
                    }
                    html[value_start..pos].to_string()
                }
            };
            attrs.push((attr_name, Some(value)));
        } else {
            attrs.push((attr_name, None));
        }
    }
}

fn emit_tag(out: &mut String, tag: &ParsedTag) {
    if tag.closing {
        out.push_str("</");
        out.push_str(&tag.name);
        out.push('>');
        return;
    }

    out.push('<');
    out.push_str(&tag.name);

    let allowed = allowed_attrs(&tag.name);
    for (attr, value) in &tag.attrs {
        if !allowed.contains(&attr.as_str()) {
            continue;
        }
        match value {
            Some(value) => {
                if !attr_value_allowed(&tag.name, attr, value) {
                    continue;
                }
                out.push(' ');
                out.push_str(attr);
                out.push_str("=\"");
                out.push_str(&escape_html(value));
                out.push('"');
            }
            None => {
                // Boolean attributes: checked / disabled.
                if matches!(attr.as_str(), "checked" | "disabled") {
                    out.push(' ');
                    out.push_str(attr);
                }
            }
        }
    }

    if VOID_TAGS.contains(&tag.name.as_str()) {
        out.push_str(" />");
    } else {
        out.push('>');
    }
}

/// Reduces HTML to the allow-listed subset. Comments are dropped; disallowed
/// or malformed markup is escaped in place.
pub fn sanitize(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let tag_start = pos + offset;
        out.push_str(&html[pos..tag_start]);

        if html[tag_start..].starts_with("<!--") {
            match html[tag_start..].find("-->") {
                Some(comment_end) => {
                    pos = tag_start + comment_end + 3;
                }
                None => {
                    // Unterminated comment swallows the rest of the input.
                    pos = html.len();
                }
            }
            continue;
        }

        match parse_tag(html, tag_start) {
            Some(tag) if tag_allowed(&tag.name) => {
                emit_tag(&mut out, &tag);
                pos = tag.end;
            }
            Some(tag) => {
                out.push_str(&escape_html(&html[tag_start..tag.end]));
                pos = tag.end;
            }
            None => {
                out.push_str("&lt;");
                pos = tag_start + 1;
            }
        }
    }

    out.push_str(&html[pos..]);
    out
}
