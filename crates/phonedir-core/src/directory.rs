use crate::assemble::OutputEntry;
use crate::phone::PhoneCategory;
use quick_xml::escape::escape;
use std::borrow::Cow;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
pub const ROOT_ELEMENT: &str = "GEQUDIODirectory";
pub const ENTRY_ELEMENT: &str = "DirectoryEntry";
pub const NAME_ELEMENT: &str = "Name";

const ENTRY_INDENT: usize = 2;
const FIELD_INDENT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit `<Telephone/>` style elements for categories an entry has no
    /// number for. The phone firmware expects all three to be present.
    pub empty_placeholders: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            empty_placeholders: true,
        }
    }
}

pub fn render_directory(entries: &[OutputEntry], options: &RenderOptions) -> String {
    let mut out = String::new();
    out.push_str(XML_DECLARATION);
    out.push('\n');

    if entries.is_empty() {
        out.push_str(&format!("<{ROOT_ELEMENT}/>\n"));
        return out;
    }

    out.push_str(&format!("<{ROOT_ELEMENT}>\n"));
    for entry in entries {
        push_open(&mut out, ENTRY_INDENT, ENTRY_ELEMENT);
        push_text_element(&mut out, FIELD_INDENT, NAME_ELEMENT, entry.display_name());

        for category in PhoneCategory::ALL {
            let mut written = false;
            for phone in entry
                .numbers()
                .iter()
                .filter(|phone| phone.category() == category)
            {
                push_text_element(&mut out, FIELD_INDENT, category.element_name(), phone.digits());
                written = true;
            }
            if !written && options.empty_placeholders {
                push_indent(&mut out, FIELD_INDENT);
                out.push_str(&format!("<{}/>\n", category.element_name()));
            }
        }

        push_close(&mut out, ENTRY_INDENT, ENTRY_ELEMENT);
    }
    out.push_str(&format!("</{ROOT_ELEMENT}>\n"));
    out
}

fn push_indent(out: &mut String, width: usize) {
    out.extend(std::iter::repeat(' ').take(width));
}

fn push_open(out: &mut String, indent: usize, name: &str) {
    push_indent(out, indent);
    out.push_str(&format!("<{name}>\n"));
}

fn push_close(out: &mut String, indent: usize, name: &str) {
    push_indent(out, indent);
    out.push_str(&format!("</{name}>\n"));
}

fn push_text_element(out: &mut String, indent: usize, name: &str, text: &str) {
    push_indent(out, indent);
    let text = replace_control_chars(text);
    out.push_str(&format!("<{name}>{}</{name}>\n", escape(text.as_ref())));
}

// Most control characters are not allowed in XML 1.0 text; the rest would
// break the single-line display on the handset.
fn replace_control_chars(text: &str) -> Cow<'_, str> {
    if !text.chars().any(char::is_control) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|ch| if ch.is_control() { ' ' } else { ch })
            .collect(),
    )
}
