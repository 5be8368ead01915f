//! Error types for Key Commands parsing and generation
//!
//! Structural failures abort the whole operation and surface as a
//! [`KeyCommandsError`]. Per-item extraction failures are not errors: they
//! end up in the [`PartialExtractionNotice`](super::types::PartialExtractionNotice)
//! of a successful parse.

use thiserror::Error;

/// Result alias used across the Key Commands pipeline
pub type Result<T> = std::result::Result<T, KeyCommandsError>;

/// Fatal errors of the Key Commands pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyCommandsError {
    /// Input is not well-formed XML
    #[error("Invalid XML: {0}")]
    MalformedXml(String),

    /// Root element is not <KeyCommands>
    #[error("Expected <KeyCommands> root element, found <{found}>")]
    Schema { found: String },

    /// Neither Categories nor Macros present, or no usable macro items
    #[error("No macros found in the document")]
    NoMacroData,

    /// A stored raw snippet no longer parses as an XML fragment
    #[error("Stored XML snippet for macro '{macro_name}' cannot be re-parsed: {reason}")]
    SnippetReparse { macro_name: String, reason: String },

    /// Explicit generation order points past the record list
    #[error("Order index {index} is out of range for {len} records")]
    InvalidOrder { index: usize, len: usize },

    /// Input exceeds the configured size limit
    #[error("Input is {size} bytes, limit is {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    /// Input bytes are not UTF-8
    #[error("Input is not valid UTF-8: {0}")]
    NotUtf8(String),

    /// XML writer failure (should not occur with in-memory buffers)
    #[error("XML emission failed: {0}")]
    Emit(String),
}

impl KeyCommandsError {
    /// Message suitable for showing to the person who uploaded the file
    pub fn user_message(&self) -> String {
        match self {
            KeyCommandsError::MalformedXml(_) | KeyCommandsError::NotUtf8(_) => {
                "The uploaded file is not a valid XML file. Please ensure you're uploading a Key Commands file exported from Cubase.".to_string()
            }
            KeyCommandsError::Schema { .. } => {
                "The uploaded file is not a Key Commands file: its root element must be 'KeyCommands'.".to_string()
            }
            KeyCommandsError::NoMacroData => {
                "No macros found in this file. Please check that it was exported correctly from Cubase and contains a 'Macros' section.".to_string()
            }
            KeyCommandsError::InputTooLarge { limit, .. } => {
                format!("File size cannot exceed {} MB.", limit / (1024 * 1024))
            }
            other => format!("Error processing your file: {}", other),
        }
    }
}

impl From<quick_xml::Error> for KeyCommandsError {
    fn from(err: quick_xml::Error) -> Self {
        KeyCommandsError::Emit(err.to_string())
    }
}
