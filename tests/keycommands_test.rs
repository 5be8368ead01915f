// Upload → store → download flow through the public API

use keycommands_wasm::keycommands::{
    generate_standalone_with, merge_into_with, split_key_binding_display, NoTrace, Stage, TraceEvent,
};
use keycommands_wasm::{generate_standalone, merge_into, parse, MacroRecord, ParseOutcome, RecordOrder, Settings};

const FIXTURE: &str = include_str!("fixtures/key_commands.xml");

/// What the storage layer keeps when the original file is discarded
#[derive(serde::Serialize, serde::Deserialize)]
struct StoredMacro {
    name: String,
    description: String,
    category: Option<String>,
    key_binding: String,
    commands_json: serde_json::Value,
}

fn store(record: &MacroRecord) -> StoredMacro {
    StoredMacro {
        name: record.name.clone(),
        description: record.description.clone(),
        category: record.category.clone(),
        key_binding: record.key_binding_display(),
        commands_json: serde_json::to_value(&record.commands).unwrap(),
    }
}

fn load(stored: &StoredMacro) -> MacroRecord {
    MacroRecord {
        name: stored.name.clone(),
        description: stored.description.clone(),
        commands: serde_json::from_value(stored.commands_json.clone()).unwrap(),
        category: stored.category.clone(),
        key_bindings: split_key_binding_display(&stored.key_binding),
        raw_definition_snippet: None,
        raw_reference_snippet: None,
    }
}

#[test]
fn test_stored_records_regenerate_the_same_macros() {
    let outcome = parse(FIXTURE).expect("fixture should parse");

    // Through a JSON column and back
    let rows: Vec<String> = outcome
        .records
        .iter()
        .map(|r| serde_json::to_string(&store(r)).unwrap())
        .collect();
    let restored: Vec<MacroRecord> = rows
        .iter()
        .map(|row| load(&serde_json::from_str(row).unwrap()))
        .collect();

    let xml = generate_standalone(&restored, RecordOrder::AsSupplied).expect("generation should succeed");
    let regenerated = parse(&xml).expect("generated file should parse");

    assert_eq!(regenerated.records.len(), outcome.records.len());
    for (copy, original) in regenerated.records.iter().zip(&outcome.records) {
        assert_eq!(copy.name, original.name);
        assert_eq!(copy.key_bindings, original.key_bindings);
        assert_eq!(copy.commands, original.commands);
    }
}

#[test]
fn test_parse_outcome_json_shape() {
    let outcome = parse(FIXTURE).unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["records"][0]["name"], "Bounce Selection");
    assert_eq!(json["records"][1]["key_bindings"][1], "F12");
    assert!(json["records"][2].get("raw_reference_snippet").is_none());
    assert_eq!(json["notice"]["skipped"].as_array().unwrap().len(), 0);

    let back: ParseOutcome = serde_json::from_value(json).unwrap();
    assert_eq!(back, outcome);
}

#[test]
fn test_selected_subset_in_selection_order() {
    let outcome = parse(FIXTURE).unwrap();

    let xml = generate_standalone_with(
        &outcome.records,
        RecordOrder::Explicit(&[2, 0]),
        &Settings::default(),
        &mut NoTrace,
    )
    .unwrap();

    let names: Vec<String> = parse(&xml).unwrap().records.into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Nudge & Snap", "Bounce Selection"]);
}

#[test]
fn test_merge_into_users_own_file() {
    let user_file = r#"<?xml version="1.0" encoding="utf-8"?>
<KeyCommands>
   <list name="Categories" type="list">
      <item>
         <string name="Name" value="Transport"/>
         <list name="Commands" type="list">
            <item>
               <string name="Name" value="Start"/>
               <string name="Key" value="Enter"/>
            </item>
         </list>
      </item>
   </list>
</KeyCommands>"#;
    let downloaded = parse(FIXTURE).unwrap();
    let mut events: Vec<TraceEvent> = Vec::new();

    let merged = merge_into_with(user_file, &downloaded.records, &Settings::default(), &mut events).unwrap();

    // The Transport category is untouched
    let transport_end = user_file.find("      </item>\n   </list>").unwrap();
    assert!(merged.starts_with(&user_file[..transport_end]));

    let outcome = parse(&merged).unwrap();
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.records[1].key_bindings, vec!["Ctrl+Alt+M", "F12"]);
    assert!(events.iter().any(|e| e.stage == Stage::Merge));

    // Re-merging the same selection duplicates it
    let twice = merge_into(&merged, &downloaded.records).unwrap();
    assert_eq!(parse(&twice).unwrap().records.len(), 6);
}

#[test]
fn test_distinct_user_messages() {
    let invalid = parse("not xml at all").unwrap_err().user_message();
    let empty = parse("<KeyCommands><list name=\"Categories\"/></KeyCommands>")
        .unwrap_err()
        .user_message();

    assert!(invalid.contains("not a valid XML file"));
    assert!(empty.contains("No macros found"));
}
