use chembal::{balance, verify};
use wasm_bindgen::prelude::*;


// Export a `balance_io` function from Rust to JavaScript.
#[wasm_bindgen]
/// Balance the input equation and return the rendered result
/// The first char is 1 on success, 0 on error
pub fn balance_io(equation: &str) -> String {
    match balance(equation) {
        Ok(balanced) => format!("1{}", balanced),
        Err(err) => format!("0{}", err),
    }
}

// Export a `verify_io` function from Rust to JavaScript.
#[wasm_bindgen]
/// Recheck an already balanced equation
/// Returns "1" if both sides tally up, "0" otherwise
pub fn verify_io(balanced: &str) -> String {
    if verify(balanced).is_balanced {
        "1".to_string()
    } else {
        "0".to_string()
    }
}
