//! Policies for turning the non-id fields of a row into one text.

/// Joins the text fields of a row, in column order.
pub trait TextJoiner {
    fn join(&self, fields: &[String]) -> String;
}

/// Joins fields with a single space. Empty fields are kept, so two adjacent
/// separators mark an empty column.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpaceJoiner;

impl TextJoiner for SpaceJoiner {
    fn join(&self, fields: &[String]) -> String {
        fields.join(" ")
    }
}

/// Joins fields with a caller-chosen separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatorJoiner {
    separator: String,
}

impl SeparatorJoiner {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl TextJoiner for SeparatorJoiner {
    fn join(&self, fields: &[String]) -> String {
        fields.join(&self.separator)
    }
}

/// Picks the joiner for a configured separator.
pub fn joiner_for(separator: &str) -> Box<dyn TextJoiner> {
    if separator == " " {
        Box::new(SpaceJoiner)
    } else {
        Box::new(SeparatorJoiner::new(separator))
    }
}
