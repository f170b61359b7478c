// SPDX-License-Identifier: MIT OR Apache-2.0
//! Saved diagram format.
//!
//! Diagrams are stored as nested tagged blocks:
//!
//! ```text
//! diagram {
//!   node {
//!     id: 1
//!     position {
//!       x: 10
//!       y: 20
//!     }
//!     line: "return $ * 2"
//!     sticky_output: 0
//!     connection {
//!       input_index: 0
//!       source_node_id: 2
//!       source_output_index: 0
//!     }
//!   }
//! }
//! ```
//!
//! Node ids are slot index + 1, up to [`MAX_NODE_ID`]; statement, input and
//! output indices are 0-based. `sticky_output` marks a statement that keeps
//! its output while its text is blank or an unfinished assignment.
//! Unknown tags are skipped at any depth so newer files still load.

use crate::diagram::Diagram;
use crate::node::Node;
use std::fmt;
use std::str::FromStr;

/// Largest node id accepted when loading
pub const MAX_NODE_ID: usize = 65_536;

/// Error while reading a saved diagram
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Token that does not fit the block structure
    #[error("line {line}: unexpected {found}, expected {expected}")]
    UnexpectedToken {
        /// Line number, 1-based
        line: usize,
        /// Offending token
        found: String,
        /// What the reader was looking for
        expected: String,
    },

    /// String literal without its closing quote
    #[error("line {line}: unterminated string")]
    UnterminatedString {
        /// Line number, 1-based
        line: usize,
    },

    /// File ended inside a block
    #[error("unexpected end of file")]
    UnexpectedEnd,

    /// Numeric field that does not parse
    #[error("line {line}: invalid number '{text}'")]
    InvalidNumber {
        /// Line number, 1-based
        line: usize,
        /// Text of the value
        text: String,
    },

    /// Node id of zero or above [`MAX_NODE_ID`]
    #[error("line {line}: invalid node id {id}")]
    InvalidNodeId {
        /// Line number, 1-based
        line: usize,
        /// The id as written
        id: String,
    },

    /// Node block without an id
    #[error("line {line}: node has no id")]
    MissingNodeId {
        /// Line number of the node block
        line: usize,
    },

    /// Known tag holding a block where a value belongs, or the reverse
    #[error("line {line}: '{tag}' has the wrong kind of value")]
    UnexpectedValue {
        /// Line number, 1-based
        line: usize,
        /// Tag name
        tag: String,
    },

    /// No top-level `diagram` block
    #[error("no diagram block found")]
    MissingDiagram,
}

/// Serialize a diagram
pub fn save_diagram(diagram: &Diagram) -> String {
    DiagramText(diagram).to_string()
}

/// Parse a saved diagram
pub fn load_diagram(source: &str) -> Result<Diagram, LoadError> {
    let tokens = lex(source)?;
    let mut reader = Reader { tokens, pos: 0 };
    let entries = reader.entries(false)?;
    build_diagram(&entries)
}

/// Display adapter writing a diagram in the saved format
pub struct DiagramText<'a>(pub &'a Diagram);

impl fmt::Display for DiagramText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "diagram {{")?;
        for (index, node) in self.0.existing_nodes() {
            writeln!(f, "  node {{")?;
            writeln!(f, "    id: {}", index + 1)?;
            writeln!(f, "    position {{")?;
            writeln!(f, "      x: {}", node.position[0])?;
            writeln!(f, "      y: {}", node.position[1])?;
            writeln!(f, "    }}")?;
            for line in node.lines() {
                writeln!(f, "    line: {}", Quoted(&line.text))?;
            }
            for statement in node.sticky_outputs() {
                writeln!(f, "    sticky_output: {statement}")?;
            }
            for (input_index, input) in node.inputs().iter().enumerate() {
                let Some(source) = input.source else {
                    continue;
                };
                writeln!(f, "    connection {{")?;
                writeln!(f, "      input_index: {input_index}")?;
                writeln!(f, "      source_node_id: {}", source.node + 1)?;
                writeln!(f, "      source_output_index: {}", source.output)?;
                writeln!(f, "    }}")?;
            }
            writeln!(f, "  }}")?;
        }
        writeln!(f, "}}")
    }
}

struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                c => write!(f, "{c}")?,
            }
        }
        f.write_str("\"")
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Number(String),
    Str(String),
    Open,
    Close,
    Colon,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(text) | Self::Number(text) => write!(f, "'{text}'"),
            Self::Str(text) => write!(f, "{}", Quoted(text)),
            Self::Open => f.write_str("'{'"),
            Self::Close => f.write_str("'}'"),
            Self::Colon => f.write_str("':'"),
        }
    }
}

#[derive(Debug, Clone)]
struct Lexed {
    tok: Tok,
    line: usize,
}

fn lex(source: &str) -> Result<Vec<Lexed>, LoadError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        let tok = match c {
            '\n' => {
                line += 1;
                continue;
            }
            c if c.is_whitespace() => continue,
            '#' => {
                while chars.next_if(|&c| c != '\n').is_some() {}
                continue;
            }
            '{' => Tok::Open,
            '}' => Tok::Close,
            ':' => Tok::Colon,
            '"' => {
                let mut text = String::new();
                loop {
                    match chars.next() {
                        None | Some('\n') => return Err(LoadError::UnterminatedString { line }),
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('r') => text.push('\r'),
                            Some('t') => text.push('\t'),
                            Some(other) => text.push(other),
                            None => return Err(LoadError::UnterminatedString { line }),
                        },
                        Some(other) => text.push(other),
                    }
                }
                Tok::Str(text)
            }
            c if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                let mut text = String::from(c);
                while let Some(next) =
                    chars.next_if(|&c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
                {
                    text.push(next);
                }
                Tok::Number(text)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut text = String::from(c);
                while let Some(next) = chars.next_if(|&c| c.is_alphanumeric() || c == '_') {
                    text.push(next);
                }
                Tok::Ident(text)
            }
            other => {
                return Err(LoadError::UnexpectedToken {
                    line,
                    found: format!("'{other}'"),
                    expected: "a tag".to_string(),
                })
            }
        };
        tokens.push(Lexed { tok, line });
    }
    Ok(tokens)
}

#[derive(Debug, Clone)]
enum Value {
    Scalar(Tok),
    Block(Vec<Entry>),
}

#[derive(Debug, Clone)]
struct Entry {
    tag: String,
    line: usize,
    value: Value,
}

struct Reader {
    tokens: Vec<Lexed>,
    pos: usize,
}

impl Reader {
    fn next(&mut self) -> Option<Lexed> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn entries(&mut self, nested: bool) -> Result<Vec<Entry>, LoadError> {
        let mut entries = Vec::new();
        loop {
            let Some(Lexed { tok, line }) = self.next() else {
                return if nested {
                    Err(LoadError::UnexpectedEnd)
                } else {
                    Ok(entries)
                };
            };
            let tag = match tok {
                Tok::Close if nested => return Ok(entries),
                Tok::Ident(tag) => tag,
                other => {
                    return Err(LoadError::UnexpectedToken {
                        line,
                        found: other.to_string(),
                        expected: "a tag".to_string(),
                    })
                }
            };
            let value = self.value(line)?;
            entries.push(Entry { tag, line, value });
        }
    }

    fn value(&mut self, tag_line: usize) -> Result<Value, LoadError> {
        let Lexed { tok, line } = self.next().ok_or(LoadError::UnexpectedEnd)?;
        match tok {
            Tok::Open => Ok(Value::Block(self.entries(true)?)),
            Tok::Colon => {
                let Lexed { tok, line } = self.next().ok_or(LoadError::UnexpectedEnd)?;
                match tok {
                    Tok::Open => Ok(Value::Block(self.entries(true)?)),
                    Tok::Ident(_) | Tok::Number(_) | Tok::Str(_) => Ok(Value::Scalar(tok)),
                    other => Err(LoadError::UnexpectedToken {
                        line,
                        found: other.to_string(),
                        expected: "a value".to_string(),
                    }),
                }
            }
            other => Err(LoadError::UnexpectedToken {
                line: line.max(tag_line),
                found: other.to_string(),
                expected: "':' or '{'".to_string(),
            }),
        }
    }
}

impl Entry {
    fn block(&self) -> Result<&[Entry], LoadError> {
        match &self.value {
            Value::Block(entries) => Ok(entries),
            Value::Scalar(_) => Err(self.unexpected_value()),
        }
    }

    fn string(&self) -> Result<&str, LoadError> {
        match &self.value {
            Value::Scalar(Tok::Str(text)) => Ok(text),
            _ => Err(self.unexpected_value()),
        }
    }

    fn number<T: FromStr>(&self) -> Result<T, LoadError> {
        match &self.value {
            Value::Scalar(Tok::Number(text)) => text.parse().map_err(|_| LoadError::InvalidNumber {
                line: self.line,
                text: text.clone(),
            }),
            _ => Err(self.unexpected_value()),
        }
    }

    fn unexpected_value(&self) -> LoadError {
        LoadError::UnexpectedValue {
            line: self.line,
            tag: self.tag.clone(),
        }
    }
}

#[derive(Debug)]
struct PendingConnection {
    line: usize,
    node: usize,
    input_index: Option<usize>,
    source_node_id: Option<usize>,
    source_output_index: Option<usize>,
}

fn build_diagram(entries: &[Entry]) -> Result<Diagram, LoadError> {
    let block = entries
        .iter()
        .find(|entry| entry.tag == "diagram")
        .ok_or(LoadError::MissingDiagram)?
        .block()?;

    let mut diagram = Diagram::new();
    let mut connections = Vec::new();

    for entry in block.iter().filter(|entry| entry.tag == "node") {
        let (slot, node) = read_node(entry, &mut connections)?;
        if diagram.node(slot).is_some() {
            tracing::warn!("line {}: duplicate node id {}, replacing", entry.line, slot + 1);
        }
        diagram.create_or_replace_node(slot, node);
    }

    for pending in connections {
        let (Some(input), Some(source_id), Some(output)) = (
            pending.input_index,
            pending.source_node_id,
            pending.source_output_index,
        ) else {
            tracing::warn!("line {}: incomplete connection dropped", pending.line);
            continue;
        };
        let Some(source) = source_id.checked_sub(1) else {
            tracing::warn!("line {}: connection from node id 0 dropped", pending.line);
            continue;
        };
        if let Err(err) = diagram.connect_nodes(source, output, pending.node, input) {
            tracing::warn!("line {}: connection dropped: {err}", pending.line);
        }
    }

    diagram.remove_invalid_inputs();
    Ok(diagram)
}

fn read_node(
    entry: &Entry,
    connections: &mut Vec<PendingConnection>,
) -> Result<(usize, Node), LoadError> {
    let mut id = None;
    let mut position = [0.0f32; 2];
    let mut lines = Vec::new();
    let mut sticky = Vec::new();
    let mut node_connections = Vec::new();

    for field in entry.block()? {
        match field.tag.as_str() {
            "id" => {
                let value: usize = field.number()?;
                if value == 0 || value > MAX_NODE_ID {
                    return Err(LoadError::InvalidNodeId {
                        line: field.line,
                        id: value.to_string(),
                    });
                }
                id = Some(value);
            }
            "position" => {
                for axis in field.block()? {
                    match axis.tag.as_str() {
                        "x" => position[0] = axis.number()?,
                        "y" => position[1] = axis.number()?,
                        _ => {}
                    }
                }
            }
            "line" => lines.push(field.string()?.to_string()),
            "sticky_output" => sticky.push((field.line, field.number::<usize>()?)),
            "connection" => {
                let mut pending = PendingConnection {
                    line: field.line,
                    node: 0,
                    input_index: None,
                    source_node_id: None,
                    source_output_index: None,
                };
                for part in field.block()? {
                    match part.tag.as_str() {
                        "input_index" => pending.input_index = Some(part.number()?),
                        "source_node_id" => pending.source_node_id = Some(part.number()?),
                        "source_output_index" => {
                            pending.source_output_index = Some(part.number()?);
                        }
                        _ => {}
                    }
                }
                node_connections.push(pending);
            }
            _ => {}
        }
    }

    let slot = id.ok_or(LoadError::MissingNodeId { line: entry.line })? - 1;
    connections.extend(node_connections.into_iter().map(|mut pending| {
        pending.node = slot;
        pending
    }));

    let mut node = Node::new(&lines.join("\n")).with_position(position[0], position[1]);
    for (line, statement) in sticky {
        if !node.keep_output(statement) {
            tracing::warn!("line {line}: statement {statement} cannot keep an output, ignored");
        }
    }
    Ok((slot, node))
}
