//! Block-structured configuration reader (spec §4.15).
//!
//! Grounded in `original_source/core/wsf/source/WsfZoneDefinition.hpp`/
//! `WsfZoneTypes.hpp`'s `block_name { ... } end_block_name`-nested input
//! style and the teacher's `components::aircraft::config::loader`
//! (field-by-field raw-config deserialization), generalized from a single
//! YAML schema into a generic line-oriented tokenizer plus recursive-descent
//! block/leaf reader that any caller can validate against its own command
//! vocabulary.
use std::collections::{HashMap, HashSet};

use crate::error::{ConfigError, SourceLocation};

/// One whitespace- or quote-delimited token on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    QuotedString(String),
}

impl Token {
    /// The token's text, quotes stripped.
    pub fn text(&self) -> &str {
        match self {
            Token::Word(s) => s,
            Token::QuotedString(s) => s,
        }
    }
}

struct Line {
    tokens: Vec<Token>,
    line: usize,
}

/// Splits `source` into per-line token lists, dropping blank lines and `#`
/// line comments and treating `"..."` as a single token (spec §4.15).
fn tokenize(source: &str, file: &str) -> Result<Vec<Line>, ConfigError> {
    let mut lines = Vec::new();
    for (line_index, raw_line) in source.lines().enumerate() {
        let line_number = line_index + 1;
        let content = match raw_line.split_once('#') {
            Some((before, _)) => before,
            None => raw_line,
        };

        let mut tokens = Vec::new();
        let mut chars = content.char_indices().peekable();
        while let Some(&(start, ch)) = chars.peek() {
            if ch.is_whitespace() {
                chars.next();
                continue;
            }
            if ch == '"' {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(ConfigError::UnexpectedEof {
                        location: SourceLocation { file: file.to_string(), line: line_number },
                    });
                }
                tokens.push(Token::QuotedString(value));
                continue;
            }
            let mut end = start;
            while let Some(&(idx, c)) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                end = idx + c.len_utf8();
                chars.next();
            }
            tokens.push(Token::Word(content[start..end].to_string()));
        }

        if !tokens.is_empty() {
            lines.push(Line { tokens, line: line_number });
        }
    }
    Ok(lines)
}

/// A single leaf command: its name and the argument tokens that followed it
/// on the same line.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigCommand {
    pub name: String,
    pub args: Vec<String>,
    pub location: SourceLocation,
}

/// One node of a parsed configuration tree: either a leaf command or a
/// nested block opened by `kind name` and closed by `end_<kind>`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEntry {
    Command(ConfigCommand),
    Block { kind: String, name: Option<String>, location: SourceLocation, body: Vec<ConfigEntry> },
}

/// The commands and nested block kinds a particular block type recognizes.
/// Passed per-kind so the reader can report `UnknownCommand` the moment it
/// sees something the caller's schema doesn't declare (spec §4.15).
#[derive(Debug, Clone, Default)]
pub struct BlockSchema {
    pub commands: HashSet<&'static str>,
    pub blocks: HashSet<&'static str>,
}

/// Parses `source` into a flat list of top-level entries, validating every
/// nested block's contents against `schemas` (keyed by block kind).
/// Unrecognized block kinds at any level, or leaf commands not declared by
/// their enclosing block's schema, produce [`ConfigError::UnknownCommand`];
/// a block name repeated within the same parent produces
/// [`ConfigError::BadValue`].
pub fn parse(source: &str, file: &str, schemas: &HashMap<&str, BlockSchema>) -> Result<Vec<ConfigEntry>, ConfigError> {
    let lines = tokenize(source, file)?;
    let (entries, consumed) = parse_entries(&lines, 0, None, schemas, file)?;
    if consumed != lines.len() {
        let extra = &lines[consumed];
        return Err(ConfigError::BadValue {
            location: SourceLocation { file: file.to_string(), line: extra.line },
            reason: format!("unexpected `{}` with no open block", extra.tokens[0].text()),
        });
    }
    Ok(entries)
}

fn parse_entries(
    lines: &[Line],
    start: usize,
    enclosing_kind: Option<&str>,
    schemas: &HashMap<&str, BlockSchema>,
    file: &str,
) -> Result<(Vec<ConfigEntry>, usize), ConfigError> {
    let mut entries = Vec::new();
    let mut seen_names: HashMap<String, HashSet<String>> = HashMap::new();
    let mut index = start;

    while index < lines.len() {
        let line = &lines[index];
        let head = line.tokens[0].text();

        if let Some(kind) = enclosing_kind {
            if head == format!("end_{kind}") {
                return Ok((entries, index + 1));
            }
        }

        let schema = enclosing_kind.and_then(|kind| schemas.get(kind));

        if let Some(block_schema) = schema {
            if block_schema.blocks.contains(head) {
                let (block, next) = parse_block(lines, index, schemas, file)?;
                if let ConfigEntry::Block { name: Some(name), location, .. } = &block {
                    let bucket = seen_names.entry(head.to_string()).or_default();
                    if !bucket.insert(name.clone()) {
                        return Err(ConfigError::BadValue {
                            location: location.clone(),
                            reason: format!("duplicate `{head}` named `{name}`"),
                        });
                    }
                }
                entries.push(block);
                index = next;
                continue;
            }
            if !block_schema.commands.contains(head) {
                return Err(ConfigError::UnknownCommand {
                    location: SourceLocation { file: file.to_string(), line: line.line },
                    command: head.to_string(),
                });
            }
            entries.push(ConfigEntry::Command(command_from_line(line, file)));
            index += 1;
            continue;
        }

        // Top level (no enclosing schema): any block-shaped line (one whose
        // kind is itself a registered schema) opens a block; anything else
        // is accepted as an unvalidated leaf command.
        if schemas.contains_key(head) {
            let (block, next) = parse_block(lines, index, schemas, file)?;
            entries.push(block);
            index = next;
            continue;
        }

        entries.push(ConfigEntry::Command(command_from_line(line, file)));
        index += 1;
    }

    if enclosing_kind.is_some() {
        let last = lines.last().map(|l| l.line).unwrap_or(0);
        return Err(ConfigError::UnexpectedEof { location: SourceLocation { file: file.to_string(), line: last } });
    }
    Ok((entries, index))
}

fn parse_block(
    lines: &[Line],
    index: usize,
    schemas: &HashMap<&str, BlockSchema>,
    file: &str,
) -> Result<(ConfigEntry, usize), ConfigError> {
    let line = &lines[index];
    let kind = line.tokens[0].text().to_string();
    let name = line.tokens.get(1).map(|t| t.text().to_string());
    let location = SourceLocation { file: file.to_string(), line: line.line };

    let (body, next) = parse_entries(lines, index + 1, Some(&kind), schemas, file)?;
    Ok((ConfigEntry::Block { kind, name, location, body }, next))
}

fn command_from_line(line: &Line, file: &str) -> ConfigCommand {
    ConfigCommand {
        name: line.tokens[0].text().to_string(),
        args: line.tokens[1..].iter().map(|t| t.text().to_string()).collect(),
        location: SourceLocation { file: file.to_string(), line: line.line },
    }
}

impl ConfigCommand {
    /// Parses this command's single argument as `f64`, or a `BadValue`
    /// naming this command's own location.
    pub fn f64_arg(&self, index: usize) -> Result<f64, ConfigError> {
        let raw = self.args.get(index).ok_or_else(|| ConfigError::BadValue {
            location: self.location.clone(),
            reason: format!("`{}` expects an argument at position {index}", self.name),
        })?;
        raw.parse::<f64>().map_err(|_| ConfigError::BadValue {
            location: self.location.clone(),
            reason: format!("`{}` argument `{raw}` is not a number", self.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(commands: &[&'static str], blocks: &[&'static str]) -> BlockSchema {
        BlockSchema { commands: commands.iter().copied().collect(), blocks: blocks.iter().copied().collect() }
    }

    #[test]
    fn parses_nested_block_with_leaf_commands() {
        let source = "fuel_tank main\n  capacity 1000\nend_fuel_tank\n";
        let mut schemas = HashMap::new();
        schemas.insert("fuel_tank", schema(&["capacity"], &[]));

        let entries = parse(source, "test.cfg", &schemas).unwrap();
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            ConfigEntry::Block { kind, name, body, .. } => {
                assert_eq!(kind, "fuel_tank");
                assert_eq!(name.as_deref(), Some("main"));
                assert_eq!(body.len(), 1);
            }
            _ => panic!("expected a block"),
        }
    }

    #[test]
    fn unknown_command_inside_recognized_block_is_an_error() {
        let source = "fuel_tank main\n  bogus_field 1\nend_fuel_tank\n";
        let mut schemas = HashMap::new();
        schemas.insert("fuel_tank", schema(&["capacity"], &[]));

        let err = parse(source, "test.cfg", &schemas).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCommand { command, .. } if command == "bogus_field"));
    }

    #[test]
    fn duplicate_named_subblock_is_a_bad_value() {
        let source = "vehicle craft\n  fuel_tank main\n    capacity 1000\n  end_fuel_tank\n  fuel_tank main\n    capacity 500\n  end_fuel_tank\nend_vehicle";
        let mut schemas = HashMap::new();
        schemas.insert("vehicle", schema(&[], &["fuel_tank"]));
        schemas.insert("fuel_tank", schema(&["capacity"], &[]));

        let err = parse(source, "test.cfg", &schemas).unwrap_err();
        assert!(matches!(err, ConfigError::BadValue { .. }));
    }

    #[test]
    fn missing_end_marker_is_unexpected_eof() {
        let source = "fuel_tank main\n  capacity 1000\n";
        let mut schemas = HashMap::new();
        schemas.insert("fuel_tank", schema(&["capacity"], &[]));

        let err = parse(source, "test.cfg", &schemas).unwrap_err();
        assert!(matches!(err, ConfigError::UnexpectedEof { .. }));
    }

    #[test]
    fn quoted_strings_are_kept_as_single_tokens_with_spaces() {
        let source = "display_name \"F-16 Fighting Falcon\"\n";
        let schemas = HashMap::new();
        let entries = parse(source, "test.cfg", &schemas).unwrap();
        match &entries[0] {
            ConfigEntry::Command(cmd) => assert_eq!(cmd.args[0], "F-16 Fighting Falcon"),
            _ => panic!("expected a command"),
        }
    }

    #[test]
    fn comment_only_and_blank_lines_are_skipped() {
        let source = "# a comment\n\ncapacity 1000 # trailing comment\n";
        let schemas = HashMap::new();
        let entries = parse(source, "test.cfg", &schemas).unwrap();
        assert_eq!(entries.len(), 1);
    }
}
