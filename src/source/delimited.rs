//! CSV and TSV input.

use std::io::Cursor;

use super::{ContentRecord, RecordSource, Records, SourceError, SourceResult, TextJoiner};

/// Field delimiter of a delimited file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    fn byte(self) -> u8 {
        match self {
            Self::Comma => b',',
            Self::Tab => b'\t',
        }
    }
}

/// Records from delimited text with a header row.
///
/// The header only names the columns; the first column of each row is the
/// id and the rest are joined into its text.
pub struct DelimitedSource {
    text: String,
    delimiter: Delimiter,
    joiner: Box<dyn TextJoiner>,
}

impl DelimitedSource {
    pub fn new(text: String, delimiter: Delimiter, joiner: Box<dyn TextJoiner>) -> Self {
        Self {
            text,
            delimiter,
            joiner,
        }
    }
}

impl RecordSource for DelimitedSource {
    fn records(self) -> SourceResult<Records> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter.byte())
            .has_headers(true)
            .flexible(true)
            .from_reader(Cursor::new(self.text.into_bytes()));

        let header_len = reader
            .headers()
            .map_err(|source| SourceError::Csv { row: 0, source })?
            .len();

        let joiner = self.joiner;
        Ok(Box::new(reader.into_records().enumerate().map(
            move |(i, result)| {
                let row = i + 1;
                let record = result.map_err(|source| SourceError::Csv { row, source })?;

                if record.len() != header_len {
                    return Err(SourceError::Schema {
                        row,
                        reason: format!(
                            "expected {header_len} fields to match the header, found {}",
                            record.len()
                        ),
                    });
                }
                if record.len() < 2 {
                    return Err(SourceError::Schema {
                        row,
                        reason: "expected an id column and at least one text column".to_string(),
                    });
                }

                let fields: Vec<String> = record.iter().skip(1).map(str::to_owned).collect();
                Ok(ContentRecord {
                    id: record[0].to_string(),
                    text: joiner.join(&fields),
                })
            },
        )))
    }
}
