//! Cubase Key Commands macro codec
//!
//! Reads the macros a user defined in a Key Commands export and writes them
//! back out, either as a fresh minimal file or merged into another Key
//! Commands file.
//!
//! # Overview
//!
//! ```text
//! text ─▶ KeyCommandsDocument ─▶ extract_macros ─▶ resolve_key_bindings ─▶ ParseOutcome
//!                                                                (parse)
//! records ─▶ generate_standalone ─▶ text
//! records + user text ─▶ merge_into ─▶ text
//! ```
//!
//! Every stage is a pure function over in-memory text. Per-item failures
//! during extraction are reported in [`PartialExtractionNotice`] instead of
//! failing the parse; structural failures surface as [`KeyCommandsError`].
//!
//! Records keep both a structured view (name, commands, bindings) and the
//! verbatim source snippets they came from. Generation replays the snippets
//! when present and synthesizes items from the structured view otherwise.
//!
//! Files that only carry the "Macro" category (no Macros list) still parse;
//! each reference entry becomes a record without commands.
//!
//! Duplicate macro names are tolerated everywhere: extraction keeps them,
//! binding resolution lets the last reference win, and merge appends them
//! next to existing entries of the same name.
//!
//! # Basic Usage
//!
//! ```ignore
//! use keycommands_wasm::keycommands::{parse, generate_standalone, RecordOrder};
//!
//! let outcome = parse(&exported_text)?;
//! if let Some(message) = outcome.notice.message() {
//!     println!("{}", message);
//! }
//! let xml = generate_standalone(&outcome.records, RecordOrder::AsSupplied)?;
//! ```

pub mod document;
pub mod errors;
pub mod extractor;
pub mod merge;
pub mod resolver;
pub mod standalone;
pub mod trace;
pub mod types;
pub mod writer;

pub use document::{CategoryEntry, CategoryNode, KeyCommandsDocument};
pub use errors::{KeyCommandsError, Result};
pub use trace::{LogTrace, NoTrace, Stage, TraceEvent, TraceLevel, TraceSink};
pub use types::{
    command_category, split_key_binding_display, synthesize_description, MacroRecord, Parameter,
    ParseOutcome, PartialExtractionNotice, RecordOrder, Settings, SkippedItem, SubCommand,
    UNCATEGORIZED,
};

/// Parse a Key Commands export into resolved macro records
pub fn parse(text: &str) -> Result<ParseOutcome> {
    parse_with(text, &Settings::default(), &mut LogTrace)
}

/// Parse raw upload bytes, which must be UTF-8
pub fn parse_bytes(bytes: &[u8]) -> Result<ParseOutcome> {
    let text = std::str::from_utf8(bytes).map_err(|e| KeyCommandsError::NotUtf8(e.to_string()))?;
    parse(text)
}

/// [`parse`] with explicit settings and trace sink
pub fn parse_with(text: &str, settings: &Settings, trace: &mut dyn TraceSink) -> Result<ParseOutcome> {
    if text.len() > settings.max_input_bytes {
        return Err(KeyCommandsError::InputTooLarge {
            size: text.len(),
            limit: settings.max_input_bytes,
        });
    }

    let doc = KeyCommandsDocument::parse(text)?;
    trace.record(TraceEvent::debug(Stage::Load, format!("loaded {} bytes", doc.text().len())));

    let extraction = extractor::extract_macros(&doc, trace)?;
    let records = resolver::resolve_key_bindings(&doc, extraction.records, trace);

    trace.record(TraceEvent::debug(
        Stage::Resolve,
        format!(
            "{} macros parsed, {} skipped",
            records.len(),
            extraction.notice.count()
        ),
    ));

    Ok(ParseOutcome {
        records,
        notice: extraction.notice,
    })
}

/// Build a fresh Key Commands document holding `records`
pub fn generate_standalone(records: &[MacroRecord], order: RecordOrder<'_>) -> Result<String> {
    generate_standalone_with(records, order, &Settings::default(), &mut LogTrace)
}

pub use standalone::generate_standalone_with;

/// Append `records` to the macros of an existing Key Commands document
pub fn merge_into(user_text: &str, records: &[MacroRecord]) -> Result<String> {
    merge_into_with(user_text, records, &Settings::default(), &mut LogTrace)
}

pub use merge::merge_into_with;
