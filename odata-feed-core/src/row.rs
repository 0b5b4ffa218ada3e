//! Rows and column metadata handed to the renderer.

use crate::cell::{CellValue, ROWID_COLUMN};
use crate::sanitize::sanitize_identifier;

/// A source column with its sanitised element name cached.
///
/// # Examples
/// ```
/// use odata_feed_core::ColumnDescriptor;
///
/// let column = ColumnDescriptor::new("Date of birth");
/// assert_eq!(column.name(), "Date of birth");
/// assert_eq!(column.sanitized(), "DateOfBirth");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    name: String,
    sanitized: String,
}

impl ColumnDescriptor {
    /// Describe a column and sanitise its name once.
    pub fn new(name: impl Into<String>) -> Self {
        let raw: String = name.into();
        Self {
            sanitized: sanitize_identifier(&raw),
            name: raw,
        }
    }

    /// Name as reported by the source.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name used for the cell element.
    #[must_use]
    pub fn sanitized(&self) -> &str {
        &self.sanitized
    }
}

/// Ordered column set shared by every row of one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    columns: Vec<ColumnDescriptor>,
}

impl Columns {
    /// Build a column set from raw names, in row order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().map(ColumnDescriptor::new).collect()
    }

    /// Number of columns, including the identity column.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the set has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over the descriptors in row order.
    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDescriptor> {
        self.columns.iter()
    }

    /// Position of the [`ROWID_COLUMN`], if present.
    #[must_use]
    pub fn rowid_index(&self) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name() == ROWID_COLUMN)
    }
}

impl FromIterator<ColumnDescriptor> for Columns {
    fn from_iter<T: IntoIterator<Item = ColumnDescriptor>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'a ColumnDescriptor;
    type IntoIter = std::slice::Iter<'a, ColumnDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One record produced by the row cursor, aligned with [`Columns`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<CellValue>,
}

impl Row {
    /// Wrap the values of one record.
    #[must_use]
    pub const fn new(values: Vec<CellValue>) -> Self {
        Self { values }
    }

    /// Values in column order.
    #[must_use]
    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// Number of values in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.values.get(index)
    }
}

impl From<Vec<CellValue>> for Row {
    fn from(values: Vec<CellValue>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<CellValue> for Row {
    fn from_iter<T: IntoIterator<Item = CellValue>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn locates_rowid_column() {
        let columns = Columns::from_names(["name", "rowid", "age"]);
        assert_eq!(columns.rowid_index(), Some(1));
    }

    #[rstest]
    fn rowid_is_matched_on_the_raw_name() {
        let columns = Columns::from_names(["rowid_", "rowid"]);
        assert_eq!(columns.rowid_index(), Some(1));
        let unrelated = Columns::from_names(["Row ID", "rowid "]);
        assert_eq!(unrelated.rowid_index(), None);
    }

    #[rstest]
    fn reports_missing_rowid_column() {
        let columns = Columns::from_names(["name"]);
        assert_eq!(columns.rowid_index(), None);
    }

    #[rstest]
    fn caches_sanitised_names_in_order() {
        let columns = Columns::from_names(["rowid", "first name", "2nd"]);
        let names: Vec<_> = columns.iter().map(ColumnDescriptor::sanitized).collect();
        assert_eq!(names, vec!["rowid", "firstName", "x2nd"]);
    }

    #[rstest]
    fn rows_collect_from_values() {
        let row: Row = [CellValue::Int64(1), CellValue::Null].into_iter().collect();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(1), Some(&CellValue::Null));
        assert_eq!(row.get(2), None);
    }
}
