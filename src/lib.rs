//! Key Commands Macro Codec WASM Module
//!
//! Extracts user macros and their shortcuts from Cubase Key Commands exports
//! and regenerates them as standalone or merged Key Commands files.

pub mod keycommands;
pub mod api;

// Re-export commonly used types
pub use keycommands::{
    generate_standalone, merge_into, parse, parse_bytes, KeyCommandsError, MacroRecord,
    ParseOutcome, RecordOrder, Settings, SubCommand,
};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    init_logger();

    log::info!("Key Commands macro codec WASM module initialized");
}

/// Route `log` records to the browser console
#[cfg(feature = "console_log")]
fn init_logger() {
    if let Err(err) = console_log::init_with_level(log::Level::Debug) {
        crate::wasm_warn!("console logger not installed: {}", err);
    }
}
