//! JSON input: an array of objects, or one object per line.

use serde_json::Value;

use super::{ContentRecord, RecordSource, Records, SourceError, SourceResult, TextJoiner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Detect,
    Array,
    NewlineDelimited,
}

/// Records from JSON objects.
///
/// Key order is preserved, so the first key of each object is its id.
pub struct JsonSource {
    text: String,
    layout: Layout,
    joiner: Box<dyn TextJoiner>,
}

impl JsonSource {
    /// Accepts either an array or newline-delimited objects, decided by the
    /// first significant character.
    pub fn new(text: String, joiner: Box<dyn TextJoiner>) -> Self {
        Self {
            text,
            layout: Layout::Detect,
            joiner,
        }
    }

    /// Treats every non-blank line as one object.
    pub fn newline_delimited(text: String, joiner: Box<dyn TextJoiner>) -> Self {
        Self {
            text,
            layout: Layout::NewlineDelimited,
            joiner,
        }
    }

    fn resolve_layout(&self) -> Layout {
        match self.layout {
            Layout::Detect if self.text.trim_start().starts_with('[') => Layout::Array,
            Layout::Detect => Layout::NewlineDelimited,
            other => other,
        }
    }
}

impl RecordSource for JsonSource {
    fn records(self) -> SourceResult<Records> {
        let layout = self.resolve_layout();
        let joiner = self.joiner;
        match layout {
            Layout::Array => {
                let items: Vec<Value> = serde_json::from_str(&self.text)
                    .map_err(|source| SourceError::Json { row: None, source })?;
                Ok(Box::new(
                    items
                        .into_iter()
                        .enumerate()
                        .map(move |(i, value)| object_to_record(i + 1, value, joiner.as_ref())),
                ))
            }
            _ => {
                let lines: Vec<String> = self
                    .text
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(str::to_owned)
                    .collect();
                Ok(Box::new(lines.into_iter().enumerate().map(
                    move |(i, line)| {
                        let row = i + 1;
                        let value: Value = serde_json::from_str(&line).map_err(|source| {
                            SourceError::Json {
                                row: Some(row),
                                source,
                            }
                        })?;
                        object_to_record(row, value, joiner.as_ref())
                    },
                )))
            }
        }
    }
}

fn object_to_record(row: usize, value: Value, joiner: &dyn TextJoiner) -> SourceResult<ContentRecord> {
    let Value::Object(map) = value else {
        return Err(SourceError::Schema {
            row,
            reason: "expected a JSON object".to_string(),
        });
    };
    if map.len() < 2 {
        return Err(SourceError::Schema {
            row,
            reason: format!(
                "expected an id and at least one text field, found {} field(s)",
                map.len()
            ),
        });
    }

    let mut values = map.into_iter().map(|(_, v)| render(v));
    let id = values.next().unwrap_or_default();
    let fields: Vec<String> = values.collect();
    Ok(ContentRecord {
        id,
        text: joiner.join(&fields),
    })
}

/// Renders a JSON value as record text: strings verbatim, `null` as empty,
/// everything else as its JSON text.
fn render(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
