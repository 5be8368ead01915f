//! XML emission shared by the standalone and merge generators
//!
//! [`XmlEmitter`] wraps a quick-xml writer with the dialect's building blocks
//! (named lists, items, scalar fields). Definition and reference items are
//! written either by replaying a re-parsed snippet or by synthesizing them
//! from the record's structured fields.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use roxmltree::{Document, Node};

use super::document::{COMMANDS_LIST, DESCRIPTION_FIELD, KEY_FIELD, MACRO_CATEGORY, NAME_FIELD};
use super::errors::{KeyCommandsError, Result};
use super::trace::{Stage, TraceEvent, TraceSink};
use super::types::{synthesize_description, MacroRecord, SubCommand};

/// Stateful XML writer for Key Commands fragments and documents
pub struct XmlEmitter {
    writer: Writer<Vec<u8>>,
}

impl XmlEmitter {
    pub fn new(indent_size: usize) -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', indent_size),
        }
    }

    pub fn declaration(&mut self, encoding: &str) -> Result<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some(encoding), None)))?;
        Ok(())
    }

    pub fn open(&mut self, tag: &str) -> Result<()> {
        self.writer.write_event(Event::Start(BytesStart::new(tag)))?;
        Ok(())
    }

    pub fn close(&mut self, tag: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    /// `<list name=… type="list">`
    pub fn open_list(&mut self, name: &str) -> Result<()> {
        let start = BytesStart::new("list").with_attributes([("name", name), ("type", "list")]);
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    pub fn close_list(&mut self) -> Result<()> {
        self.close("list")
    }

    /// `<string name=… value=…/>` or another scalar tag
    pub fn field(&mut self, tag: &str, name: &str, value: &str) -> Result<()> {
        let empty = BytesStart::new(tag).with_attributes([("name", name), ("value", value)]);
        self.writer.write_event(Event::Empty(empty))?;
        Ok(())
    }

    /// Replay a parsed element and its subtree, dropping whitespace-only text
    pub fn node(&mut self, node: Node) -> Result<()> {
        let tag = node.tag_name().name();
        let mut start = BytesStart::new(tag);
        for attribute in node.attributes() {
            start.push_attribute((attribute.name(), attribute.value()));
        }

        let has_content = node.children().any(|child| {
            child.is_element()
                || child.is_comment()
                || (child.is_text() && child.text().is_some_and(|t| !t.trim().is_empty()))
        });

        if !has_content {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        self.writer.write_event(Event::Start(start))?;
        for child in node.children() {
            if child.is_element() {
                self.node(child)?;
            } else if child.is_comment() {
                let text = child.text().unwrap_or_default();
                self.writer
                    .write_event(Event::Comment(BytesText::from_escaped(text)))?;
            } else if let Some(text) = child.text().filter(|t| !t.trim().is_empty()) {
                self.writer.write_event(Event::Text(BytesText::new(text.trim())))?;
            }
        }
        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    pub fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| KeyCommandsError::Emit(e.to_string()))
    }
}

// ============================================================================
// SNIPPETS
// ============================================================================

/// Which of a record's snippets is being replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetKind {
    Definition,
    Reference,
}

impl SnippetKind {
    pub fn of(self, record: &MacroRecord) -> Option<&str> {
        match self {
            SnippetKind::Definition => record.raw_definition_snippet.as_deref(),
            SnippetKind::Reference => record.raw_reference_snippet.as_deref(),
        }
    }
}

/// Re-parse a stored snippet, which must be a single `<item>` element
pub fn reparse_snippet<'s>(record: &MacroRecord, snippet: &'s str) -> Result<Document<'s>> {
    let parsed = Document::parse(snippet).map_err(|e| KeyCommandsError::SnippetReparse {
        macro_name: record.name.clone(),
        reason: e.to_string(),
    })?;

    let root_tag = parsed.root_element().tag_name().name();
    if root_tag != "item" {
        return Err(KeyCommandsError::SnippetReparse {
            macro_name: record.name.clone(),
            reason: format!("expected an <item> element, found <{}>", root_tag),
        });
    }

    Ok(parsed)
}

/// `snippet` as it may be stored on `record`, or `None` when it does not
/// re-parse outside its source file (entities declared in the file's DTD)
pub fn detached_snippet(
    record: &MacroRecord,
    snippet: &str,
    stage: Stage,
    trace: &mut dyn TraceSink,
) -> Option<String> {
    match reparse_snippet(record, snippet) {
        Ok(_) => Some(snippet.to_string()),
        Err(err) => {
            trace.record(
                TraceEvent::warn(stage, format!("source text not kept: {}", err)).for_macro(record.name.as_str()),
            );
            None
        }
    }
}

/// Fail if any stored snippet of `record` does not re-parse
pub fn check_snippets(record: &MacroRecord) -> Result<()> {
    for kind in [SnippetKind::Definition, SnippetKind::Reference] {
        if let Some(snippet) = kind.of(record) {
            reparse_snippet(record, snippet)?;
        }
    }
    Ok(())
}

/// Write a record's definition or reference item
///
/// Replays the stored snippet when it re-parses, otherwise synthesizes the
/// item. Returns the re-parse error when a snippet had to be abandoned, so
/// callers decide whether that is fatal.
pub fn write_record_item(
    emitter: &mut XmlEmitter,
    record: &MacroRecord,
    kind: SnippetKind,
) -> Result<Option<KeyCommandsError>> {
    let mut abandoned = None;

    if let Some(snippet) = kind.of(record) {
        match reparse_snippet(record, snippet) {
            Ok(parsed) => {
                emitter.node(parsed.root_element())?;
                return Ok(None);
            }
            Err(err) => abandoned = Some(err),
        }
    }

    match kind {
        SnippetKind::Definition => write_definition(emitter, record)?,
        SnippetKind::Reference => write_reference(emitter, record)?,
    }

    Ok(abandoned)
}

// ============================================================================
// SYNTHESIZED ITEMS
// ============================================================================

/// Minimal definition item built from structured fields
pub fn write_definition(emitter: &mut XmlEmitter, record: &MacroRecord) -> Result<()> {
    emitter.open("item")?;
    emitter.field("string", NAME_FIELD, &record.name)?;

    // A description equal to the synthesized one is recomputed on parse
    if !record.description.is_empty() && record.description != synthesize_description(&record.commands) {
        emitter.field("string", DESCRIPTION_FIELD, &record.description)?;
    }

    if !record.commands.is_empty() {
        emitter.open_list(COMMANDS_LIST)?;
        for command in &record.commands {
            write_sub_command(emitter, command)?;
        }
        emitter.close_list()?;
    }

    emitter.close("item")
}

/// Reference item carrying the macro name and one `Key` field per binding
pub fn write_reference(emitter: &mut XmlEmitter, record: &MacroRecord) -> Result<()> {
    emitter.open("item")?;
    emitter.field("string", NAME_FIELD, &record.name)?;
    for binding in &record.key_bindings {
        emitter.field("string", KEY_FIELD, binding)?;
    }
    emitter.close("item")
}

/// The host writes `Category` ahead of `Name`; other fields follow in order
fn write_sub_command(emitter: &mut XmlEmitter, command: &SubCommand) -> Result<()> {
    emitter.open("item")?;

    let (category, rest): (Vec<_>, Vec<_>) = command
        .parameters
        .iter()
        .partition(|p| p.name == "Category");

    for parameter in category {
        emitter.field(&parameter.tag, &parameter.name, &parameter.value)?;
    }
    emitter.field("string", NAME_FIELD, &command.name)?;
    for parameter in rest {
        emitter.field(&parameter.tag, &parameter.name, &parameter.value)?;
    }

    emitter.close("item")
}

/// `<item><string name="Name" value="Macro"/><list name="Commands">…</list></item>`
pub fn write_macro_category<F>(emitter: &mut XmlEmitter, references: F) -> Result<()>
where
    F: FnOnce(&mut XmlEmitter) -> Result<()>,
{
    emitter.open("item")?;
    emitter.field("string", NAME_FIELD, MACRO_CATEGORY)?;
    emitter.open_list(COMMANDS_LIST)?;
    references(emitter)?;
    emitter.close_list()?;
    emitter.close("item")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keycommands::types::Parameter;

    fn emit(f: impl FnOnce(&mut XmlEmitter) -> Result<()>) -> String {
        let mut emitter = XmlEmitter::new(3);
        f(&mut emitter).unwrap();
        emitter.finish().unwrap()
    }

    #[test]
    fn test_synthesized_definition() {
        let record = MacroRecord::new(
            "Clean Up",
            vec![SubCommand {
                name: "Delete".into(),
                parameters: vec![Parameter::string("Category", "Edit")],
            }],
        );

        let xml = emit(|e| write_definition(e, &record));

        assert_eq!(
            xml,
            "<item>\n   <string name=\"Name\" value=\"Clean Up\"/>\n   <list name=\"Commands\" type=\"list\">\n      <item>\n         <string name=\"Category\" value=\"Edit\"/>\n         <string name=\"Name\" value=\"Delete\"/>\n      </item>\n   </list>\n</item>"
        );
    }

    #[test]
    fn test_custom_description_is_written() {
        let mut record = MacroRecord::new("Tidy", vec![SubCommand::new("Undo")]);
        record.description = "Tidies & cleans".into();

        let xml = emit(|e| write_definition(e, &record));
        assert!(xml.contains(r#"<string name="Description" value="Tidies &amp; cleans"/>"#));
    }

    #[test]
    fn test_synthesized_reference_carries_bindings() {
        let record = MacroRecord::new("Bounce", Vec::new()).with_key_bindings(["Ctrl+B"]);
        let xml = emit(|e| write_reference(e, &record));

        assert!(xml.contains(r#"<string name="Name" value="Bounce"/>"#));
        assert!(xml.contains(r#"<string name="Key" value="Ctrl+B"/>"#));
    }

    #[test]
    fn test_snippet_replay_normalizes_whitespace() {
        let mut record = MacroRecord::new("Bounce", Vec::new());
        record.raw_definition_snippet =
            Some("<item>\n\t\t<string name=\"Name\" value=\"Bounce\"/>\n\t</item>".into());

        let xml = emit(|e| write_record_item(e, &record, SnippetKind::Definition).map(|_| ()));
        assert_eq!(xml, "<item>\n   <string name=\"Name\" value=\"Bounce\"/>\n</item>");
    }

    #[test]
    fn test_broken_snippet_falls_back_and_reports() {
        let mut record = MacroRecord::new("Bounce", Vec::new());
        record.raw_definition_snippet = Some("<item><string name=\"Name\"".into());

        let mut emitter = XmlEmitter::new(3);
        let abandoned = write_record_item(&mut emitter, &record, SnippetKind::Definition).unwrap();
        let xml = emitter.finish().unwrap();

        assert!(matches!(abandoned, Some(KeyCommandsError::SnippetReparse { .. })));
        assert!(xml.contains(r#"value="Bounce""#));
    }

    #[test]
    fn test_snippet_must_be_an_item() {
        let record = MacroRecord::new("Bounce", Vec::new());
        let err = reparse_snippet(&record, "<list/>").unwrap_err();
        assert!(matches!(err, KeyCommandsError::SnippetReparse { .. }));
    }

    #[test]
    fn test_detached_snippet_drops_dtd_entities() {
        let record = MacroRecord::new("Cubase Thing", Vec::new());
        let mut events: Vec<TraceEvent> = Vec::new();

        let kept = detached_snippet(&record, "<item><string name=\"Name\" value=\"Thing\"/></item>", Stage::Extract, &mut events);
        assert!(kept.is_some());
        assert!(events.is_empty());

        let dropped = detached_snippet(&record, "<item><string name=\"Name\" value=\"&co; Thing\"/></item>", Stage::Extract, &mut events);
        assert_eq!(dropped, None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].macro_name.as_deref(), Some("Cubase Thing"));
    }
}
