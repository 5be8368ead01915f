//! Merge generation into a caller-supplied document
//!
//! The user's file is never re-serialized. New items are spliced into the
//! source text just before the closing tag of the Macros list and of the
//! Categories → Macro → Commands list (creating whichever level is missing),
//! so every byte outside those insertion points survives unchanged.

use std::ops::Range;

use roxmltree::Node;

use super::document::{
    KeyCommandsDocument, CATEGORIES_LIST, COMMANDS_LIST, MACROS_LIST, MACRO_CATEGORY,
};
use super::errors::Result;
use super::trace::{Stage, TraceEvent, TraceSink};
use super::types::{MacroRecord, Settings};
use super::writer::{check_snippets, write_macro_category, write_record_item, SnippetKind, XmlEmitter};

/// Replacement of a byte range of the source text
#[derive(Debug, Clone, PartialEq, Eq)]
struct Splice {
    range: Range<usize>,
    text: String,
}

/// Layout of the text being merged into
struct Layout<'a> {
    newline: &'a str,
    unit: String,
}

/// Merge records into `user_text`
///
/// An empty record list returns the input untouched. Any stored snippet that
/// fails to re-parse aborts the merge with `SnippetReparse`; the caller can
/// retry with [`MacroRecord::without_snippets`] copies. Duplicate names are
/// appended as-is.
pub fn merge_into_with(
    user_text: &str,
    records: &[MacroRecord],
    settings: &Settings,
    trace: &mut dyn TraceSink,
) -> Result<String> {
    if records.is_empty() {
        trace.record(TraceEvent::debug(Stage::Merge, "nothing selected, document returned unchanged"));
        return Ok(user_text.to_string());
    }

    let doc = KeyCommandsDocument::load(user_text)?;
    for record in records {
        check_snippets(record)?;
    }

    let text = doc.text();
    let layout = Layout {
        newline: if text.contains("\r\n") { "\r\n" } else { "\n" },
        unit: " ".repeat(settings.indent_size),
    };

    let mut splices = Vec::new();
    let mut root_additions = Vec::new();

    // Categories → Macro → Commands
    match doc.root_list(CATEGORIES_LIST) {
        Some(categories) => match doc.find_named_item(categories, MACRO_CATEGORY) {
            Some(category) => match doc.find_named_list(category, COMMANDS_LIST) {
                Some(commands) => {
                    let references = render_each(records, SnippetKind::Reference, settings)?;
                    splices.push(append_children(text, commands, &references, &layout));
                }
                None => {
                    trace.record(TraceEvent::debug(Stage::Merge, "creating Commands list under Macro category"));
                    let list = render(settings, |e| {
                        e.open_list(COMMANDS_LIST)?;
                        write_all(e, records, SnippetKind::Reference)?;
                        e.close_list()
                    })?;
                    splices.push(append_children(text, category, &[list], &layout));
                }
            },
            None => {
                trace.record(TraceEvent::debug(Stage::Merge, "creating Macro category"));
                let item = render(settings, |e| {
                    write_macro_category(e, |e| write_all(e, records, SnippetKind::Reference))
                })?;
                splices.push(append_children(text, categories, &[item], &layout));
            }
        },
        None => {
            trace.record(TraceEvent::debug(Stage::Merge, "creating Categories list"));
            root_additions.push(render(settings, |e| {
                e.open_list(CATEGORIES_LIST)?;
                write_macro_category(e, |e| write_all(e, records, SnippetKind::Reference))?;
                e.close_list()
            })?);
        }
    }

    match doc.root_list(MACROS_LIST) {
        Some(macros) => {
            let definitions = render_each(records, SnippetKind::Definition, settings)?;
            splices.push(append_children(text, macros, &definitions, &layout));
        }
        None => {
            trace.record(TraceEvent::debug(Stage::Merge, "creating Macros list"));
            root_additions.push(render(settings, |e| {
                e.open_list(MACROS_LIST)?;
                write_all(e, records, SnippetKind::Definition)?;
                e.close_list()
            })?);
        }
    }

    if !root_additions.is_empty() {
        splices.push(append_children(text, doc.root(), &root_additions, &layout));
    }

    for record in records {
        trace.record(TraceEvent::debug(Stage::Merge, "appended").for_macro(record.name.as_str()));
    }

    let mut output = apply_splices(text, splices);

    if !output.trim_start().starts_with("<?xml") {
        let declaration = render(settings, |e| e.declaration(&settings.xml_encoding))?;
        output = format!("{}{}{}", declaration, layout.newline, output);
    }

    // `text` is the document after the byte order mark
    let bom = &user_text[..user_text.len() - text.len()];
    Ok(format!("{}{}", bom, output))
}

fn render<F>(settings: &Settings, f: F) -> Result<String>
where
    F: FnOnce(&mut XmlEmitter) -> Result<()>,
{
    let mut emitter = XmlEmitter::new(settings.indent_size);
    f(&mut emitter)?;
    emitter.finish()
}

fn render_each(records: &[MacroRecord], kind: SnippetKind, settings: &Settings) -> Result<Vec<String>> {
    records
        .iter()
        .map(|record| render(settings, |e| write_strict(e, record, kind)))
        .collect()
}

fn write_all(emitter: &mut XmlEmitter, records: &[MacroRecord], kind: SnippetKind) -> Result<()> {
    records.iter().try_for_each(|record| write_strict(emitter, record, kind))
}

/// Snippets were checked up front, an abandoned one is still an error here
fn write_strict(emitter: &mut XmlEmitter, record: &MacroRecord, kind: SnippetKind) -> Result<()> {
    match write_record_item(emitter, record, kind)? {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Splice that appends `fragments` as the last children of `parent`
fn append_children(text: &str, parent: Node, fragments: &[String], layout: &Layout) -> Splice {
    let range = parent.range();
    let element = &text[range.clone()];

    let indent = line_indent(text, range.start);
    let child_indent = format!("{}{}", indent, layout.unit);
    let body: String = fragments
        .iter()
        .map(|fragment| format!("{}{}", layout.newline, indent_lines(fragment, &child_indent, layout.newline)))
        .collect();

    if element.ends_with("/>") {
        let tag = element[1..]
            .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .next()
            .unwrap_or_else(|| parent.tag_name().name());

        return Splice {
            range: range.end - 2..range.end,
            text: format!(">{}{}{}</{}>", body, layout.newline, indent, tag),
        };
    }

    let close = range.start + element.rfind("</").unwrap_or(element.len());
    let content_end = range.start + text[range.start..close].trim_end().len();

    Splice {
        range: content_end..close,
        text: format!("{}{}{}", body, layout.newline, indent),
    }
}

/// Leading whitespace of the line `position` sits on, empty if the line has
/// other content before it
fn line_indent(text: &str, position: usize) -> &str {
    let line_start = text[..position].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &text[line_start..position];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix
    } else {
        ""
    }
}

fn indent_lines(fragment: &str, prefix: &str, newline: &str) -> String {
    fragment
        .lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join(newline)
}

fn apply_splices(text: &str, mut splices: Vec<Splice>) -> String {
    let mut output = text.to_string();
    splices.sort_by(|a, b| b.range.start.cmp(&a.range.start));
    for splice in splices {
        output.replace_range(splice.range, &splice.text);
    }
    output
}
