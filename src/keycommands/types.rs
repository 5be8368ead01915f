//! Type definitions for the Key Commands pipeline
//!
//! - Public API types (ParseOutcome, Settings, RecordOrder)
//! - Macro records and their sub-commands
//! - Partial-extraction reporting (SkippedItem, PartialExtractionNotice)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Number of command names spelled out in a synthesized description
const DESCRIPTION_PREVIEW: usize = 3;

/// Separator used when key bindings are stored as a single display string
const KEY_BINDING_SEPARATOR: &str = ", ";

/// Category of records whose commands name none
pub const UNCATEGORIZED: &str = "Uncategorized";

// ============================================================================
// MACRO RECORDS
// ============================================================================

/// One scalar field of a sub-command (`<string name="Category" value="Edit"/>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Element tag the field was written with (`string`, `int`, ...)
    pub tag: String,
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: "string".to_string(),
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One step of a macro: an application command plus its fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCommand {
    pub name: String,

    /// Fields other than `Name`, in document order
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl SubCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Builder-style helper adding a `string` parameter
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(Parameter::string(name, value));
        self
    }

    /// Value of the `Category` field, if the command carries one
    pub fn category(&self) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == "Category")
            .map(|p| p.value.as_str())
    }
}

/// A user macro extracted from (or destined for) a Key Commands file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroRecord {
    pub name: String,

    /// Explicit description, or one synthesized from the command names
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub commands: Vec<SubCommand>,

    /// Category of the first sub-command that names one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Human-readable shortcuts such as "Ctrl+Alt+M"
    #[serde(default)]
    pub key_bindings: Vec<String>,

    /// Verbatim source text of the macro's <item> under Macros
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_definition_snippet: Option<String>,

    /// Verbatim source text of the reference <item> under Categories/Macro
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_reference_snippet: Option<String>,
}

impl MacroRecord {
    /// Snippet-less record with a synthesized description
    pub fn new(name: impl Into<String>, commands: Vec<SubCommand>) -> Self {
        let description = synthesize_description(&commands);
        let category = command_category(&commands);
        Self {
            name: name.into(),
            description,
            commands,
            category,
            key_bindings: Vec::new(),
            raw_definition_snippet: None,
            raw_reference_snippet: None,
        }
    }

    pub fn with_key_bindings<I, S>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_bindings = bindings.into_iter().map(Into::into).collect();
        self
    }

    /// Copy of the record as persisted without its source file
    pub fn without_snippets(&self) -> Self {
        Self {
            raw_definition_snippet: None,
            raw_reference_snippet: None,
            ..self.clone()
        }
    }

    /// Key bindings joined into a single display string ("Ctrl+1, Ctrl+2")
    pub fn key_binding_display(&self) -> String {
        self.key_bindings.join(KEY_BINDING_SEPARATOR)
    }

    /// Category to file the record under, "Uncategorized" when none is known
    pub fn category_name(&self) -> &str {
        self.category.as_deref().unwrap_or(UNCATEGORIZED)
    }

    /// Command names in document order
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.name.as_str())
    }
}

/// Inverse of [`MacroRecord::key_binding_display`]
pub fn split_key_binding_display(display: &str) -> Vec<String> {
    display
        .split(KEY_BINDING_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Category of the first sub-command carrying a `Category` parameter
pub fn command_category(commands: &[SubCommand]) -> Option<String> {
    commands
        .iter()
        .find_map(SubCommand::category)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// Description used when a macro carries no explicit one
///
/// Empty for macros without commands.
pub fn synthesize_description(commands: &[SubCommand]) -> String {
    let names: Vec<&str> = commands
        .iter()
        .map(|c| c.name.as_str())
        .filter(|n| !n.is_empty())
        .collect();

    if names.is_empty() {
        return String::new();
    }

    if names.len() <= DESCRIPTION_PREVIEW {
        format!("Executes: {}", names.join(", "))
    } else {
        format!(
            "Executes: {} and {} more commands",
            names[..DESCRIPTION_PREVIEW].join(", "),
            names.len() - DESCRIPTION_PREVIEW
        )
    }
}

// ============================================================================
// PARTIAL EXTRACTION REPORTING
// ============================================================================

/// A macro item dropped during extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    /// Zero-based position among the element children of the Macros list
    pub position: usize,

    /// Macro name, when one could be read
    pub name: Option<String>,

    /// Human-readable explanation of why it was skipped
    pub reason: String,
}

/// Non-fatal report of skipped macro items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialExtractionNotice {
    pub skipped: Vec<SkippedItem>,
}

impl PartialExtractionNotice {
    pub fn count(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skipped.is_empty()
    }

    /// User-facing summary, `None` when nothing was skipped
    pub fn message(&self) -> Option<String> {
        match self.count() {
            0 => None,
            1 => Some("1 macro was skipped due to errors".to_string()),
            n => Some(format!("{} macros were skipped due to errors", n)),
        }
    }
}

// ============================================================================
// PUBLIC API TYPES
// ============================================================================

/// Result of parsing a Key Commands file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOutcome {
    /// Resolved records in document order
    pub records: Vec<MacroRecord>,

    pub notice: PartialExtractionNotice,
}

impl ParseOutcome {
    pub fn skipped_count(&self) -> usize {
        self.notice.count()
    }

    /// Records grouped by [`MacroRecord::category_name`]
    ///
    /// Groups appear in order of first occurrence, records keep document order.
    pub fn group_by_category(&self) -> Vec<(&str, Vec<&MacroRecord>)> {
        let mut groups: Vec<(&str, Vec<&MacroRecord>)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for record in &self.records {
            let category = record.category_name();
            let slot = *index.entry(category).or_insert_with(|| {
                groups.push((category, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(record);
        }

        groups
    }
}

/// Order in which the standalone generator emits records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOrder<'a> {
    /// Slice order, as handed in by the caller
    #[default]
    AsSupplied,

    /// Indices into the record slice, emitted in exactly this sequence
    Explicit(&'a [usize]),
}

/// Loading and generation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Spaces per nesting level in generated XML
    pub indent_size: usize,

    /// Encoding announced in the XML declaration
    pub xml_encoding: String,

    /// Inputs larger than this are rejected before parsing
    pub max_input_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indent_size: 3,
            xml_encoding: "utf-8".to_string(),
            max_input_bytes: 10 * 1024 * 1024,
        }
    }
}
