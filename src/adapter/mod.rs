// src/adapter/mod.rs
pub mod console;

pub use console::{render_report, render_tick};
