use crate::error::MalformedCardError;
use serde::Serialize;
use std::borrow::Cow;

/// One unparsed vCard block as handed over by a card source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCard(String);

impl RawCard {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RawCard {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for RawCard {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneEntry {
    pub number: String,
    /// Lowercased `TYPE` values and flag parameters, in card order.
    pub type_tags: Vec<String>,
}

impl PhoneEntry {
    pub fn new(number: impl Into<String>, type_tags: &[&str]) -> Self {
        Self {
            number: number.into(),
            type_tags: type_tags.iter().map(|tag| tag.to_ascii_lowercase()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactRecord {
    pub formatted_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub honorific_prefix: Option<String>,
    pub phone_entries: Vec<PhoneEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ContentLine {
    name: String,
    params: Vec<Param>,
    value: String,
}

/// `name` is `None` for vCard 2.1 style flags such as `TEL;CELL:`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Param {
    name: Option<String>,
    values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Before,
    Inside,
    After,
}

pub fn parse_card(card: &RawCard) -> Result<ContactRecord, MalformedCardError> {
    let mut position = Position::Before;
    let mut saw_version = false;
    let mut content = Vec::new();

    for line in unfold_lines(card.as_str()) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match position {
            Position::Before => {
                if !is_begin(trimmed) {
                    return Err(MalformedCardError::MissingBegin);
                }
                position = Position::Inside;
            }
            Position::Inside => {
                if is_begin(trimmed) {
                    return Err(MalformedCardError::NestedBegin);
                }
                if is_end(trimmed) {
                    position = Position::After;
                    continue;
                }
                let Some(parsed) = tokenize_line(trimmed) else {
                    continue;
                };
                if parsed.name == "VERSION" {
                    saw_version = true;
                }
                content.push(parsed);
            }
            Position::After => return Err(MalformedCardError::TrailingContent),
        }
    }

    match position {
        Position::Before => return Err(MalformedCardError::MissingBegin),
        Position::Inside => return Err(MalformedCardError::MissingEnd),
        Position::After => {}
    }
    if !saw_version {
        return Err(MalformedCardError::MissingVersion);
    }

    Ok(extract_record(&content))
}

/// Splits a multi-card stream (a `.vcf` export) into single cards. Text outside
/// `BEGIN:VCARD`/`END:VCARD` is dropped; an unterminated card is kept so the
/// parser can reject it.
pub fn split_cards(data: &str) -> Vec<RawCard> {
    let normalized = normalize_line_endings(data);
    let mut cards = Vec::new();
    let mut current: Option<String> = None;

    for line in normalized.lines() {
        let trimmed = line.trim();
        if is_begin(trimmed) {
            if let Some(unterminated) = current.take() {
                cards.push(RawCard::new(unterminated));
            }
            current = Some(String::new());
        }

        let Some(card) = current.as_mut() else {
            continue;
        };
        card.push_str(line);
        card.push('\n');

        if is_end(trimmed) {
            if let Some(done) = current.take() {
                cards.push(RawCard::new(done));
            }
        }
    }

    if let Some(unterminated) = current.take() {
        cards.push(RawCard::new(unterminated));
    }
    cards
}

fn is_begin(line: &str) -> bool {
    line.eq_ignore_ascii_case("BEGIN:VCARD")
}

fn is_end(line: &str) -> bool {
    line.eq_ignore_ascii_case("END:VCARD")
}

fn extract_record(lines: &[ContentLine]) -> ContactRecord {
    let mut record = ContactRecord::default();
    let mut saw_name = false;

    for line in lines {
        match line.name.as_str() {
            "FN" => {
                if record.formatted_name.is_some() {
                    continue;
                }
                let value = unescape_vcard_value(&line.value);
                let value = value.trim();
                if !value.is_empty() {
                    record.formatted_name = Some(value.to_string());
                }
            }
            "N" => {
                if saw_name {
                    continue;
                }
                saw_name = true;
                let components = split_escaped(&line.value, ';');
                let component = |idx: usize| components.get(idx).and_then(|raw| name_component(raw));
                record.family_name = component(0);
                record.given_name = component(1);
                record.honorific_prefix = component(3);
            }
            "TEL" => {
                if let Some(entry) = phone_entry(line) {
                    record.phone_entries.push(entry);
                }
            }
            _ => {}
        }
    }

    record
}

// Multiple values inside one N component are comma separated.
fn name_component(raw: &str) -> Option<String> {
    let joined = split_escaped(raw, ',')
        .iter()
        .map(|item| unescape_vcard_value(item).trim().to_string())
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn phone_entry(line: &ContentLine) -> Option<PhoneEntry> {
    let value = unescape_vcard_value(&line.value);
    let mut number = value.trim();
    if let Some(scheme) = number.get(..4) {
        if scheme.eq_ignore_ascii_case("tel:") {
            number = number[4..].trim();
        }
    }
    if number.is_empty() {
        return None;
    }

    let mut type_tags: Vec<String> = Vec::new();
    for param in &line.params {
        let is_type = match param.name.as_deref() {
            None => true,
            Some(name) => name == "TYPE",
        };
        if !is_type {
            continue;
        }
        for value in &param.values {
            let tag = value.trim().to_ascii_lowercase();
            if !tag.is_empty() && !type_tags.contains(&tag) {
                type_tags.push(tag);
            }
        }
    }

    Some(PhoneEntry {
        number: number.to_string(),
        type_tags,
    })
}

fn tokenize_line(line: &str) -> Option<ContentLine> {
    let colon = find_unquoted(line, ':')?;
    let head = &line[..colon];
    let value = &line[colon + 1..];

    let mut segments = split_unquoted(head, ';').into_iter();
    let mut name = segments.next()?.trim();
    // Group prefixes (`item1.TEL`) carry nothing we use.
    if let Some((_, property)) = name.rsplit_once('.') {
        name = property;
    }
    if name.is_empty() {
        return None;
    }

    Some(ContentLine {
        name: name.to_ascii_uppercase(),
        params: segments.filter_map(parse_param).collect(),
        value: value.to_string(),
    })
}

fn parse_param(segment: &str) -> Option<Param> {
    let segment = segment.trim();
    if segment.is_empty() {
        return None;
    }

    let (name, raw_values) = match find_unquoted(segment, '=') {
        Some(idx) => (
            Some(segment[..idx].trim().to_ascii_uppercase()),
            &segment[idx + 1..],
        ),
        None => (None, segment),
    };

    // Quoted lists (`TYPE="cell,voice"`) split the same way as bare ones.
    let unquoted: String = raw_values.chars().filter(|ch| *ch != '"').collect();
    let values = unquoted
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();

    Some(Param { name, values })
}

fn find_unquoted(input: &str, needle: char) -> Option<usize> {
    let mut quoted = false;
    for (idx, ch) in input.char_indices() {
        if ch == '"' {
            quoted = !quoted;
        } else if ch == needle && !quoted {
            return Some(idx);
        }
    }
    None
}

fn split_unquoted(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (idx, ch) in input.char_indices() {
        if ch == '"' {
            quoted = !quoted;
        } else if ch == separator && !quoted {
            parts.push(&input[start..idx]);
            start = idx + ch.len_utf8();
        }
    }
    parts.push(&input[start..]);
    parts
}

fn unfold_lines(input: &str) -> Vec<String> {
    let input = normalize_line_endings(input);
    let mut lines: Vec<String> = Vec::new();
    for line in input.lines() {
        if line.is_empty() {
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = lines.last_mut() {
                last.push_str(&line[1..]);
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines
}

fn normalize_line_endings(input: &str) -> Cow<'_, str> {
    if !input.contains('\r') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            if matches!(chars.peek(), Some('\n')) {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

/// Splits on `separator` unless it is backslash-escaped. Escapes are kept so
/// the caller can unescape each item.
fn split_escaped(value: &str, separator: char) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in value.chars() {
        if escape {
            current.push(ch);
            escape = false;
            continue;
        }

        if ch == '\\' {
            current.push(ch);
            escape = true;
            continue;
        }

        if ch == separator {
            items.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }

    items.push(current);
    items
}

fn unescape_vcard_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') | Some('N') => out.push('\n'),
                Some(other) => out.push(other),
                None => break,
            }
        } else {
            out.push(ch);
        }
    }
    out
}
