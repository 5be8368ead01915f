//! Key Commands WASM API
//!
//! JavaScript-facing API of the macro codec.
//!
//! # Module Structure
//!
//! - `helpers`: console logging, serialization and error mapping
//! - `keycommands`: parse / generate / merge entry points

pub mod helpers;
pub mod keycommands;

pub use keycommands::{
    generate_macros_xml, generate_macros_xml_ordered, merge_macros_xml, parse_key_commands,
    parse_key_commands_json,
};
