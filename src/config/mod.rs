//! Block-structured configuration reading (spec §4.15).
pub mod reader;

pub use reader::{parse, BlockSchema, ConfigCommand, ConfigEntry, Token};
