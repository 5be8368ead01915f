//! Key binding resolution against the "Macro" pseudo-category
//!
//! Categories → item "Macro" → Commands holds one reference item per bound
//! macro. References are matched to records by exact name through a hash
//! index. Records sharing a name all receive the binding, and a later
//! reference overwrites an earlier one.

use std::collections::HashMap;

use super::document::{KeyCommandsDocument, MACRO_CATEGORY};
use super::trace::{Stage, TraceEvent, TraceSink};
use super::types::MacroRecord;
use super::writer::detached_snippet;

/// Attach key bindings and reference snippets to extracted records
///
/// Never drops records: the output has the same length and order as the input.
pub fn resolve_key_bindings(
    doc: &KeyCommandsDocument<'_>,
    mut records: Vec<MacroRecord>,
    trace: &mut dyn TraceSink,
) -> Vec<MacroRecord> {
    let Some(category) = doc.category(MACRO_CATEGORY) else {
        trace.record(TraceEvent::debug(Stage::Resolve, "no Macro category, macros stay unbound"));
        return records;
    };

    // (record index, entry index), applied in reference order
    let mut assignments = Vec::new();
    {
        let mut by_name: HashMap<&str, Vec<usize>> = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            by_name.entry(record.name.as_str()).or_default().push(index);
        }

        for (entry_index, entry) in category.entries.iter().enumerate() {
            match by_name.get(entry.name.as_str()) {
                Some(indices) => {
                    assignments.extend(indices.iter().map(|&i| (i, entry_index)));
                }
                None => trace.record(
                    TraceEvent::debug(Stage::Resolve, "reference without a matching macro")
                        .for_macro(entry.name.as_str()),
                ),
            }
        }
    }

    let mut bound = vec![false; records.len()];
    for (record_index, entry_index) in assignments {
        let entry = &category.entries[entry_index];
        let record = &mut records[record_index];

        if std::mem::replace(&mut bound[record_index], true) {
            trace.record(
                TraceEvent::warn(Stage::Resolve, "duplicate reference, later binding wins")
                    .for_macro(record.name.as_str()),
            );
        }

        record.key_bindings = entry.key_bindings.clone();
        record.raw_reference_snippet = detached_snippet(record, &entry.snippet, Stage::Resolve, trace);

        trace.record(
            TraceEvent::debug(Stage::Resolve, format!("bound to [{}]", record.key_binding_display()))
                .for_macro(record.name.as_str()),
        );
    }

    records
}
