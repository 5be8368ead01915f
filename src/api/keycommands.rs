//! Key Commands operations for the WASM API
//!
//! String-in/string-out wrappers around the codec, called by the upload and
//! download flows of the web front end:
//! - Parse: uploaded Key Commands text → macro records (JS objects or JSON)
//! - Generate: selected records → standalone Key Commands file
//! - Merge: selected records + the user's own file → merged file

use wasm_bindgen::prelude::*;

use crate::api::helpers::{deserialize, report_notice, serialize, to_js_error};
use crate::keycommands::{self, MacroRecord, ParseOutcome, RecordOrder};
use crate::{wasm_info, wasm_log};

fn parse_outcome(text: &str) -> Result<ParseOutcome, JsValue> {
    wasm_log!("  Input has {} bytes", text.len());

    let outcome = keycommands::parse(text).map_err(|e| to_js_error("parseKeyCommands", e))?;
    report_notice(&outcome.notice);

    wasm_info!("  Parsed {} macros ({} skipped)", outcome.records.len(), outcome.skipped_count());
    Ok(outcome)
}

/// Parse an uploaded Key Commands file
///
/// # Returns
/// `{ records: MacroRecord[], notice: { skipped: SkippedItem[] } }`
#[wasm_bindgen(js_name = parseKeyCommands)]
pub fn parse_key_commands(text: &str) -> Result<JsValue, JsValue> {
    wasm_info!("parseKeyCommands called");
    let outcome = parse_outcome(text)?;
    serialize(&outcome, "Failed to serialize parse outcome")
}

/// Same as `parseKeyCommands`, serialized as a JSON string for storage
#[wasm_bindgen(js_name = parseKeyCommandsJson)]
pub fn parse_key_commands_json(text: &str) -> Result<String, JsValue> {
    wasm_info!("parseKeyCommandsJson called");
    let outcome = parse_outcome(text)?;
    serde_json::to_string(&outcome)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize parse outcome: {}", e)))
}

/// Generate a standalone Key Commands file from records, in the given order
#[wasm_bindgen(js_name = generateMacrosXml)]
pub fn generate_macros_xml(records: JsValue) -> Result<String, JsValue> {
    wasm_info!("generateMacrosXml called");
    let records: Vec<MacroRecord> = deserialize(records, "Invalid macro records")?;

    let xml = keycommands::generate_standalone(&records, RecordOrder::AsSupplied)
        .map_err(|e| to_js_error("generateMacrosXml", e))?;

    wasm_info!("  Generated {} bytes for {} macros", xml.len(), records.len());
    Ok(xml)
}

/// Generate a standalone file, picking records by index in `order`
#[wasm_bindgen(js_name = generateMacrosXmlOrdered)]
pub fn generate_macros_xml_ordered(records: JsValue, order: Vec<u32>) -> Result<String, JsValue> {
    wasm_info!("generateMacrosXmlOrdered called");
    let records: Vec<MacroRecord> = deserialize(records, "Invalid macro records")?;
    let order: Vec<usize> = order.into_iter().map(|i| i as usize).collect();

    keycommands::generate_standalone(&records, RecordOrder::Explicit(&order))
        .map_err(|e| to_js_error("generateMacrosXmlOrdered", e))
}

/// Merge records into the user's own Key Commands file
#[wasm_bindgen(js_name = mergeMacrosXml)]
pub fn merge_macros_xml(user_text: &str, records: JsValue) -> Result<String, JsValue> {
    wasm_info!("mergeMacrosXml called");
    let records: Vec<MacroRecord> = deserialize(records, "Invalid macro records")?;

    let xml = keycommands::merge_into(user_text, &records)
        .map_err(|e| to_js_error("mergeMacrosXml", e))?;

    wasm_info!("  Merged {} macros, output {} bytes", records.len(), xml.len());
    Ok(xml)
}
