//! Standalone document generation
//!
//! Builds a fresh, minimal Key Commands file holding only the given macros:
//! their definitions under Macros and one reference each under
//! Categories → Macro → Commands.

use super::document::{CATEGORIES_LIST, MACROS_LIST, ROOT_TAG};
use super::errors::{KeyCommandsError, Result};
use super::trace::{Stage, TraceEvent, TraceSink};
use super::types::{MacroRecord, RecordOrder, Settings};
use super::writer::{write_macro_category, write_record_item, SnippetKind, XmlEmitter};

/// Records picked in the requested order, without re-sorting
fn ordered<'r>(records: &'r [MacroRecord], order: RecordOrder<'_>) -> Result<Vec<&'r MacroRecord>> {
    match order {
        RecordOrder::AsSupplied => Ok(records.iter().collect()),
        RecordOrder::Explicit(indices) => indices
            .iter()
            .map(|&index| {
                records.get(index).ok_or(KeyCommandsError::InvalidOrder {
                    index,
                    len: records.len(),
                })
            })
            .collect(),
    }
}

/// Generate a standalone Key Commands document
///
/// A snippet that no longer re-parses is replaced by the synthesized item and
/// reported as a warning trace event.
pub fn generate_standalone_with(
    records: &[MacroRecord],
    order: RecordOrder<'_>,
    settings: &Settings,
    trace: &mut dyn TraceSink,
) -> Result<String> {
    let records = ordered(records, order)?;
    trace.record(TraceEvent::debug(
        Stage::Generate,
        format!("generating standalone document with {} macros", records.len()),
    ));

    let mut emitter = XmlEmitter::new(settings.indent_size);
    emitter.declaration(&settings.xml_encoding)?;
    emitter.open(ROOT_TAG)?;

    emitter.open_list(CATEGORIES_LIST)?;
    write_macro_category(&mut emitter, |emitter| {
        for record in &records {
            write_item(emitter, record, SnippetKind::Reference, trace)?;
        }
        Ok(())
    })?;
    emitter.close_list()?;

    emitter.open_list(MACROS_LIST)?;
    for record in &records {
        write_item(&mut emitter, record, SnippetKind::Definition, trace)?;
    }
    emitter.close_list()?;

    emitter.close(ROOT_TAG)?;
    emitter.finish()
}

fn write_item(
    emitter: &mut XmlEmitter,
    record: &MacroRecord,
    kind: SnippetKind,
    trace: &mut dyn TraceSink,
) -> Result<()> {
    if let Some(err) = write_record_item(emitter, record, kind)? {
        trace.record(
            TraceEvent::warn(Stage::Generate, format!("{:?} snippet replaced by synthesized item: {}", kind, err))
                .for_macro(record.name.as_str()),
        );
    }
    Ok(())
}
