// src/display/mod.rs
//! Operator console output

pub mod terminal;

pub use terminal::{render_entry_echo, render_fix_dump, render_prompt};
