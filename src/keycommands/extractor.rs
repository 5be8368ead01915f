//! Macro extraction from the Macros list
//!
//! Each `<item>` under Macros becomes one unresolved [`MacroRecord`]. Items
//! that cannot be represented are dropped and reported in a
//! [`PartialExtractionNotice`]; one bad item never aborts the batch.
//!
//! Files without a Macros list still carry macros as reference entries of the
//! "Macro" category. Those become name-only records that the resolver later
//! binds like any other.

use roxmltree::Node;

use super::document::{
    element_children, field_value, is_scalar_field, KeyCommandsDocument, CATEGORIES_LIST,
    COMMANDS_LIST, DESCRIPTION_FIELD, MACROS_LIST, MACRO_CATEGORY, NAME_FIELD,
};
use super::errors::{KeyCommandsError, Result};
use super::trace::{Stage, TraceEvent, TraceSink};
use super::types::{
    command_category, synthesize_description, MacroRecord, Parameter, PartialExtractionNotice,
    SkippedItem, SubCommand,
};
use super::writer::detached_snippet;

/// Records pulled out of the Macros list, before key-binding resolution
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<MacroRecord>,
    pub notice: PartialExtractionNotice,
}

/// Why a single macro item was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
enum ItemError {
    UnexpectedElement(String),
    MissingName,
    UnnamedCommand(usize),
}

impl ItemError {
    fn reason(&self) -> String {
        match self {
            ItemError::UnexpectedElement(tag) => format!("unexpected <{}> element in Macros list", tag),
            ItemError::MissingName => "macro has no Name".to_string(),
            ItemError::UnnamedCommand(index) => format!("command #{} has no Name", index + 1),
        }
    }
}

/// Extract every macro definition of a loaded document
pub fn extract_macros(doc: &KeyCommandsDocument<'_>, trace: &mut dyn TraceSink) -> Result<Extraction> {
    let extraction = match doc.root_list(MACROS_LIST) {
        Some(macros) => extract_definitions(doc, macros, trace),
        None if doc.root_list(CATEGORIES_LIST).is_some() => {
            trace.record(TraceEvent::debug(Stage::Extract, "no Macros list, reading Macro category entries"));
            extract_references(doc, trace)
        }
        None => {
            trace.record(TraceEvent::debug(Stage::Extract, "neither Macros nor Categories list present"));
            return Err(KeyCommandsError::NoMacroData);
        }
    };

    if extraction.records.is_empty() {
        trace.record(TraceEvent::debug(
            Stage::Extract,
            format!("no usable macro items ({} skipped)", extraction.notice.count()),
        ));
        return Err(KeyCommandsError::NoMacroData);
    }

    Ok(extraction)
}

fn extract_definitions<'input>(
    doc: &KeyCommandsDocument<'input>,
    macros: Node<'_, 'input>,
    trace: &mut dyn TraceSink,
) -> Extraction {
    let mut extraction = Extraction::default();

    for (position, item) in element_children(macros).enumerate() {
        match extract_item(item) {
            Ok(mut record) => {
                trace.record(
                    TraceEvent::debug(Stage::Extract, format!("{} commands", record.commands.len()))
                        .for_macro(record.name.as_str()),
                );
                record.raw_definition_snippet = detached_snippet(&record, doc.snippet(item), Stage::Extract, trace);
                extraction.records.push(record);
            }
            Err(err) => {
                let name = field_value(item, NAME_FIELD)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string);
                let skipped = SkippedItem {
                    position,
                    name,
                    reason: err.reason(),
                };

                let event = TraceEvent::warn(Stage::Extract, format!("skipped item #{}: {}", position + 1, skipped.reason));
                trace.record(match &skipped.name {
                    Some(name) => event.for_macro(name.as_str()),
                    None => event,
                });

                extraction.notice.skipped.push(skipped);
            }
        }
    }

    extraction
}

/// Name-only records for the entries of the "Macro" category
fn extract_references(doc: &KeyCommandsDocument<'_>, trace: &mut dyn TraceSink) -> Extraction {
    let records: Vec<MacroRecord> = doc
        .category(MACRO_CATEGORY)
        .map(|category| {
            category
                .entries
                .iter()
                .filter(|entry| !entry.name.is_empty())
                .map(|entry| {
                    trace.record(TraceEvent::debug(Stage::Extract, "reference only").for_macro(entry.name.as_str()));
                    MacroRecord::new(entry.name.as_str(), Vec::new())
                })
                .collect()
        })
        .unwrap_or_default();

    Extraction {
        records,
        notice: PartialExtractionNotice::default(),
    }
}

fn extract_item(item: Node) -> std::result::Result<MacroRecord, ItemError> {
    if !item.has_tag_name("item") {
        return Err(ItemError::UnexpectedElement(item.tag_name().name().to_string()));
    }

    let name = field_value(item, NAME_FIELD)
        .filter(|n| !n.is_empty())
        .ok_or(ItemError::MissingName)?;

    let commands = match command_list(item) {
        Some(list) => extract_commands(list)?,
        None => Vec::new(),
    };

    let description = field_value(item, DESCRIPTION_FIELD)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| synthesize_description(&commands));

    Ok(MacroRecord {
        name: name.to_string(),
        description,
        category: command_category(&commands),
        commands,
        key_bindings: Vec::new(),
        raw_definition_snippet: None,
        raw_reference_snippet: None,
    })
}

/// The item's own `<list name="Commands">`
///
/// Macro items are not indexed by the document (only items directly named
/// by their parent list are), so this is a scan over the item's children.
fn command_list<'a, 'input>(item: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    element_children(item).find(|n| n.has_tag_name("list") && n.attribute("name") == Some(COMMANDS_LIST))
}

fn extract_commands(list: Node) -> std::result::Result<Vec<SubCommand>, ItemError> {
    element_children(list)
        .filter(|n| n.has_tag_name("item"))
        .enumerate()
        .map(|(index, entry)| {
            let mut name = None;
            let mut parameters = Vec::new();

            for field in entry.children().filter(|n| is_scalar_field(*n)) {
                let field_name = field.attribute("name").unwrap_or_default();
                let value = field.attribute("value").unwrap_or_default();

                if field_name == NAME_FIELD && name.is_none() {
                    name = Some(value.to_string());
                } else {
                    parameters.push(Parameter {
                        tag: field.tag_name().name().to_string(),
                        name: field_name.to_string(),
                        value: value.to_string(),
                    });
                }
            }

            match name.filter(|n| !n.is_empty()) {
                Some(name) => Ok(SubCommand { name, parameters }),
                None => Err(ItemError::UnnamedCommand(index)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keycommands::trace::{NoTrace, TraceLevel};

    fn extract(xml: &str) -> Result<Extraction> {
        let doc = KeyCommandsDocument::parse(xml)?;
        extract_macros(&doc, &mut NoTrace)
    }

    #[test]
    fn test_sub_commands_keep_document_order() {
        let xml = r#"<KeyCommands><list name="Macros" type="list">
            <item>
               <string name="Name" value="Clean Up"/>
               <list name="Commands" type="list">
                  <item><string name="Category" value="Edit"/><string name="Name" value="Select All"/></item>
                  <item><string name="Category" value="Edit"/><string name="Name" value="Delete"/><int name="Flags" value="2"/></item>
               </list>
            </item>
        </list></KeyCommands>"#;

        let extraction = extract(xml).unwrap();
        let record = &extraction.records[0];

        assert_eq!(record.command_names().collect::<Vec<_>>(), vec!["Select All", "Delete"]);
        assert_eq!(record.commands[1].category(), Some("Edit"));
        assert_eq!(record.commands[1].parameters[1].tag, "int");
        assert_eq!(record.commands[1].parameters[1].name, "Flags");
        assert_eq!(record.description, "Executes: Select All, Delete");
    }

    #[test]
    fn test_explicit_description_wins() {
        let xml = r#"<KeyCommands><list name="Macros">
            <item>
               <string name="Name" value="Tidy"/>
               <string name="Description" value="Tidies the project"/>
               <list name="Commands"><item><string name="Name" value="Undo"/></item></list>
            </item>
        </list></KeyCommands>"#;

        let extraction = extract(xml).unwrap();
        assert_eq!(extraction.records[0].description, "Tidies the project");
    }

    #[test]
    fn test_unnamed_command_skips_macro() {
        let xml = r#"<KeyCommands><list name="Macros">
            <item><string name="Name" value="Broken"/>
               <list name="Commands"><item><string name="Category" value="Edit"/></item></list>
            </item>
            <item><string name="Name" value="Fine"/></item>
        </list></KeyCommands>"#;

        let extraction = extract(xml).unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.notice.skipped[0].name.as_deref(), Some("Broken"));
        assert_eq!(extraction.notice.skipped[0].reason, "command #1 has no Name");
    }

    #[test]
    fn test_foreign_element_in_macros_is_skipped() {
        let xml = r#"<KeyCommands><list name="Macros">
            <string name="Version" value="2"/>
            <item><string name="Name" value="Fine"/></item>
        </list></KeyCommands>"#;

        let extraction = extract(xml).unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.notice.skipped[0].position, 0);
    }

    #[test]
    fn test_missing_lists_is_no_macro_data() {
        let err = extract("<KeyCommands><list name=\"Preferences\"/></KeyCommands>").unwrap_err();
        assert_eq!(err, KeyCommandsError::NoMacroData);
    }

    #[test]
    fn test_categories_without_macro_entries_is_no_macro_data() {
        let err = extract("<KeyCommands><list name=\"Categories\"/></KeyCommands>").unwrap_err();
        assert_eq!(err, KeyCommandsError::NoMacroData);

        let xml = r#"<KeyCommands><list name="Categories">
            <item><string name="Name" value="Edit"/>
               <list name="Commands"><item><string name="Name" value="Undo"/></item></list>
            </item>
        </list></KeyCommands>"#;
        assert_eq!(extract(xml).unwrap_err(), KeyCommandsError::NoMacroData);
    }

    #[test]
    fn test_categories_only_reads_macro_references() {
        let xml = r#"<KeyCommands><list name="Categories">
            <item><string name="Name" value="Macro"/>
               <list name="Commands">
                  <item><string name="Name" value="Legacy"/><string name="Key" value="F1"/></item>
                  <item><string name="Name" value="Older"/></item>
               </list>
            </item>
        </list></KeyCommands>"#;

        let extraction = extract(xml).unwrap();
        let names: Vec<&str> = extraction.records.iter().map(|r| r.name.as_str()).collect();

        assert_eq!(names, vec!["Legacy", "Older"]);
        assert!(extraction.records[0].commands.is_empty());
        assert_eq!(extraction.records[0].raw_definition_snippet, None);
        assert!(extraction.notice.is_empty());
    }

    #[test]
    fn test_category_taken_from_commands() {
        let xml = r#"<KeyCommands><list name="Macros">
            <item><string name="Name" value="Tidy"/>
               <list name="Commands">
                  <item><string name="Name" value="Undo"/></item>
                  <item><string name="Category" value="Edit"/><string name="Name" value="Redo"/></item>
               </list>
            </item>
        </list></KeyCommands>"#;

        let extraction = extract(xml).unwrap();
        assert_eq!(extraction.records[0].category.as_deref(), Some("Edit"));
    }

    #[test]
    fn test_snippet_using_dtd_entity_is_not_kept() {
        let xml = r#"<!DOCTYPE KeyCommands [<!ENTITY co "Cubase">]>
<KeyCommands><list name="Macros">
   <item><string name="Name" value="&co; Thing"/></item>
   <item><string name="Name" value="Plain"/></item>
</list></KeyCommands>"#;
        let doc = KeyCommandsDocument::parse(xml).unwrap();
        let mut events: Vec<TraceEvent> = Vec::new();

        let extraction = extract_macros(&doc, &mut events).unwrap();

        assert_eq!(extraction.records[0].name, "Cubase Thing");
        assert_eq!(extraction.records[0].raw_definition_snippet, None);
        assert!(extraction.records[1].raw_definition_snippet.is_some());
        assert!(events
            .iter()
            .any(|e| e.level == TraceLevel::Warn && e.macro_name.as_deref() == Some("Cubase Thing")));
    }

    #[test]
    fn test_all_items_unusable_is_no_macro_data() {
        let xml = r#"<KeyCommands><list name="Macros"><item/><item/></list></KeyCommands>"#;
        assert_eq!(extract(xml).unwrap_err(), KeyCommandsError::NoMacroData);
    }

    #[test]
    fn test_skips_are_traced_as_warnings() {
        let xml = r#"<KeyCommands><list name="Macros">
            <item/>
            <item><string name="Name" value="Fine"/></item>
        </list></KeyCommands>"#;
        let doc = KeyCommandsDocument::parse(xml).unwrap();
        let mut events: Vec<TraceEvent> = Vec::new();

        extract_macros(&doc, &mut events).unwrap();

        let warnings: Vec<_> = events.iter().filter(|e| e.level == TraceLevel::Warn).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].stage, Stage::Extract);
        assert!(events.iter().any(|e| e.macro_name.as_deref() == Some("Fine")));
    }
}
