//! Input format detection.
//!
//! Detection looks at content only, never at file names. JSON is recognised
//! by its first significant character; CSV and TSV by a delimiter that
//! appears the same non-zero number of times on every sampled line.

use super::{SourceError, SourceResult};

/// Number of non-empty lines inspected when guessing a delimiter.
const SAMPLE_LINES: usize = 20;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    /// Comma separated values with a header row
    Csv,
    /// Tab separated values with a header row
    Tsv,
    /// A JSON array of objects, or newline-delimited objects
    Json,
    /// Newline-delimited JSON objects
    #[value(name = "nl")]
    NewlineJson,
}

/// Guesses the format of `text`.
pub fn detect_format(text: &str) -> SourceResult<InputFormat> {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    match trimmed.chars().next() {
        None => {
            return Err(SourceError::Format {
                reason: "input is empty".to_string(),
            });
        }
        Some('[') => return Ok(InputFormat::Json),
        Some('{') => return Ok(InputFormat::NewlineJson),
        Some(_) => {}
    }

    let lines = sample_lines(trimmed);
    let commas: Vec<usize> = lines.iter().map(|l| l.commas).collect();
    let tabs: Vec<usize> = lines.iter().map(|l| l.tabs).collect();

    match (consistent(&commas), consistent(&tabs)) {
        (true, true) => {
            if tabs[0] > commas[0] {
                Ok(InputFormat::Tsv)
            } else {
                Ok(InputFormat::Csv)
            }
        }
        (true, false) => Ok(InputFormat::Csv),
        (false, true) => Ok(InputFormat::Tsv),
        (false, false) => Err(SourceError::Format {
            reason: format!(
                "no consistent comma or tab delimiter in the first {} lines",
                lines.len()
            ),
        }),
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct LineCounts {
    commas: usize,
    tabs: usize,
}

/// Counts delimiters per logical line, ignoring anything inside double
/// quotes so quoted fields may contain delimiters and newlines.
fn sample_lines(text: &str) -> Vec<LineCounts> {
    let mut lines = Vec::new();
    let mut current = LineCounts::default();
    let mut in_quotes = false;
    let mut blank = true;

    for ch in text.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                blank = false;
            }
            '\n' if !in_quotes => {
                if !blank {
                    lines.push(current);
                    if lines.len() == SAMPLE_LINES {
                        return lines;
                    }
                }
                current = LineCounts::default();
                blank = true;
            }
            ',' if !in_quotes => {
                current.commas += 1;
                blank = false;
            }
            '\t' if !in_quotes => {
                current.tabs += 1;
                blank = false;
            }
            '\r' => {}
            c if c.is_whitespace() => {}
            _ => blank = false,
        }
    }
    if !blank {
        lines.push(current);
    }
    lines
}

fn consistent(counts: &[usize]) -> bool {
    match counts.first() {
        Some(&first) if first > 0 => counts.iter().all(|&c| c == first),
        _ => false,
    }
}
