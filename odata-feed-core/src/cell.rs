//! Typed cell values and their XML encoding.
//!
//! Each cell becomes one element in the `d:` (data services) namespace with
//! an `m:type` attribute naming its type:
//!
//! ```text
//! <d:{name} m:type="{tag}">{escaped value}</d:{name}>
//! <d:{name} m:type="Null" m:null="true" />
//! ```
//!
//! The set of representable values is closed: a source that produces anything
//! else must reject it while building the [`CellValue`], so the encoder itself
//! cannot fail.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::escape::escape;

/// Reserved column carrying a row's stable numeric identity.
///
/// The value is rendered into the entry id, never as a data cell.
pub const ROWID_COLUMN: &str = "rowid";

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// One scalar value read from the row source.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// SQL `NULL`.
    Null,
    /// Boolean flag.
    Boolean(bool),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Double-precision float.
    Double(f64),
    /// UTF-8 text.
    String(String),
    /// Timestamp with a time of day. No zone conversion is applied.
    DateTime(NaiveDateTime),
    /// Calendar date without a time of day.
    Date(NaiveDate),
}

/// Type tag written into the `m:type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdmType {
    /// Tag for [`CellValue::Null`].
    Null,
    /// Tag for [`CellValue::Boolean`].
    Boolean,
    /// Tag for [`CellValue::Int64`].
    Int64,
    /// Tag for [`CellValue::Double`].
    Double,
    /// Tag for [`CellValue::String`].
    String,
    /// Tag for [`CellValue::DateTime`].
    DateTimeOffset,
    /// Tag for [`CellValue::Date`].
    Date,
}

impl EdmType {
    /// Return the tag as written into the feed.
    ///
    /// # Examples
    /// ```
    /// use odata_feed_core::EdmType;
    ///
    /// assert_eq!(EdmType::DateTimeOffset.as_str(), "DateTimeOffset");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean => "Boolean",
            Self::Int64 => "Int64",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTimeOffset => "DateTimeOffset",
            Self::Date => "Date",
        }
    }
}

impl fmt::Display for EdmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CellValue {
    /// Type tag selected by this value's variant.
    #[must_use]
    pub const fn edm_type(&self) -> EdmType {
        match self {
            Self::Null => EdmType::Null,
            Self::Boolean(_) => EdmType::Boolean,
            Self::Int64(_) => EdmType::Int64,
            Self::Double(_) => EdmType::Double,
            Self::String(_) => EdmType::String,
            Self::DateTime(_) => EdmType::DateTimeOffset,
            Self::Date(_) => EdmType::Date,
        }
    }

    /// Element body for this value, already escaped. `None` for nulls.
    fn body(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Boolean(value) => Some(String::from(if *value { "true" } else { "false" })),
            Self::Int64(value) => Some(value.to_string()),
            Self::Double(value) => Some(format_double(*value)),
            Self::String(value) => Some(escape(value.as_str()).into_owned()),
            Self::DateTime(value) => Some(format_datetime(value)),
            Self::Date(value) => Some(value.format(DATE_FORMAT).to_string()),
        }
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<Self>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Format a timestamp the way the feed writes it: six fractional digits and
/// a literal `Z`.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use odata_feed_core::cell::format_datetime;
///
/// let at = NaiveDate::from_ymd_opt(2008, 11, 24)
///     .and_then(|d| d.and_hms_opt(15, 11, 49))
///     .expect("valid timestamp");
/// assert_eq!(format_datetime(&at), "2008-11-24T15:11:49.000000Z");
/// ```
#[must_use]
pub fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        let literal = if value.is_sign_positive() { "INF" } else { "-INF" };
        literal.to_owned()
    } else {
        value.to_string()
    }
}

/// Encode one cell, or return `None` for the reserved [`ROWID_COLUMN`].
///
/// `name` must already be sanitised (see
/// [`sanitize_identifier`](crate::sanitize_identifier)).
///
/// # Examples
/// ```
/// use odata_feed_core::{CellValue, encode_cell};
///
/// assert_eq!(
///     encode_cell("apple", &CellValue::Boolean(true)).as_deref(),
///     Some(r#"<d:apple m:type="Boolean">true</d:apple>"#),
/// );
/// assert_eq!(encode_cell("rowid", &CellValue::Int64(7)), None);
/// ```
#[must_use]
pub fn encode_cell(name: &str, value: &CellValue) -> Option<String> {
    (name != ROWID_COLUMN).then(|| encode_element(name, value))
}

/// Encode one cell unconditionally. Callers that know which column carries
/// the identity skip it themselves.
pub(crate) fn encode_element(name: &str, value: &CellValue) -> String {
    let tag = value.edm_type();
    match value.body() {
        None => format!(r#"<d:{name} m:type="{tag}" m:null="true" />"#),
        Some(body) => format!(r#"<d:{name} m:type="{tag}">{body}</d:{name}>"#),
    }
}

/// Lazily encode a sequence of named cells, skipping [`ROWID_COLUMN`].
///
/// Cells are yielded in input order.
///
/// # Examples
/// ```
/// use odata_feed_core::{CellValue, make_cells};
///
/// let row = [
///     ("rowid", CellValue::Int64(1)),
///     ("title", CellValue::from("Fish & Chips")),
/// ];
/// let cells: Vec<String> = make_cells(row.iter().map(|(k, v)| (*k, v))).collect();
/// assert_eq!(cells, vec![r#"<d:title m:type="String">Fish &amp; Chips</d:title>"#]);
/// ```
pub fn make_cells<'a, I>(cells: I) -> impl Iterator<Item = String> + 'a
where
    I: IntoIterator<Item = (&'a str, &'a CellValue)>,
    I::IntoIter: 'a,
{
    cells
        .into_iter()
        .filter_map(|(name, value)| encode_cell(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::escape::unescape;
    use rstest::rstest;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(hh, mm, ss))
            .expect("valid timestamp")
    }

    fn encode_all(cells: &[(&'static str, CellValue)]) -> Vec<String> {
        make_cells(cells.iter().map(|(name, value)| (*name, value))).collect()
    }

    #[rstest]
    fn empty_mapping_yields_nothing() {
        assert!(encode_all(&[]).is_empty());
    }

    #[rstest]
    fn yields_one_cell_per_column() {
        let cells = encode_all(&[
            ("foo1", CellValue::from("bar")),
            ("foo2", CellValue::from("bar")),
            ("foo3", CellValue::from("bar")),
        ]);
        assert_eq!(cells.len(), 3);
    }

    #[rstest]
    fn current_time_is_tagged_as_datetime_offset() {
        let now = chrono::Utc::now().naive_utc();
        let cells = encode_all(&[("foo3", CellValue::DateTime(now))]);
        let [cell] = cells.as_slice() else {
            panic!("expected exactly one cell, got {cells:?}");
        };
        assert!(cell.contains(r#"m:type="DateTimeOffset""#));
    }

    #[rstest]
    fn datetime_has_six_fraction_digits_and_zulu_suffix() {
        let cells = encode_all(&[("humbug", CellValue::DateTime(at(2008, 11, 24, 15, 11, 49)))]);
        assert_eq!(
            cells,
            vec![r#"<d:humbug m:type="DateTimeOffset">2008-11-24T15:11:49.000000Z</d:humbug>"#]
        );
    }

    #[rstest]
    fn datetime_truncates_sub_microsecond_precision() {
        let value = NaiveDate::from_ymd_opt(2020, 2, 29)
            .and_then(|d| d.and_hms_nano_opt(1, 2, 3, 123_456_789))
            .expect("valid timestamp");
        assert_eq!(format_datetime(&value), "2020-02-29T01:02:03.123456Z");
    }

    #[rstest]
    fn date_is_formatted_without_time() {
        let date = NaiveDate::from_ymd_opt(2004, 1, 19).expect("valid date");
        let cells = encode_all(&[("somewhen", CellValue::Date(date))]);
        assert_eq!(
            cells,
            vec![r#"<d:somewhen m:type="Date">2004-01-19</d:somewhen>"#]
        );
    }

    #[rstest]
    fn booleans_are_lowercase() {
        let cells = encode_all(&[
            ("apple", CellValue::Boolean(true)),
            ("orange", CellValue::Boolean(false)),
        ]);
        assert!(cells.contains(&r#"<d:apple m:type="Boolean">true</d:apple>"#.to_owned()));
        assert!(cells.contains(&r#"<d:orange m:type="Boolean">false</d:orange>"#.to_owned()));
    }

    #[rstest]
    fn null_is_self_closing() {
        assert_eq!(
            encode_cell("gone", &CellValue::Null).as_deref(),
            Some(r#"<d:gone m:type="Null" m:null="true" />"#)
        );
    }

    #[rstest]
    fn option_none_converts_to_null() {
        assert_eq!(CellValue::from(None::<i64>), CellValue::Null);
        assert_eq!(CellValue::from(Some(3_i64)), CellValue::Int64(3));
    }

    #[rstest]
    #[case(CellValue::Int64(-42), "Int64", "-42")]
    #[case(CellValue::Int64(1_000_000), "Int64", "1000000")]
    #[case(CellValue::Double(1.5), "Double", "1.5")]
    #[case(CellValue::Double(2.0), "Double", "2")]
    #[case(CellValue::Double(f64::INFINITY), "Double", "INF")]
    #[case(CellValue::Double(f64::NEG_INFINITY), "Double", "-INF")]
    #[case(CellValue::Double(f64::NAN), "Double", "NaN")]
    fn numbers_use_plain_decimal(
        #[case] value: CellValue,
        #[case] tag: &str,
        #[case] body: &str,
    ) {
        let expected = format!(r#"<d:n m:type="{tag}">{body}</d:n>"#);
        assert_eq!(encode_cell("n", &value), Some(expected));
    }

    #[rstest]
    fn strings_escape_markup_and_round_trip() {
        let raw = r#"<a href="x">Tom & Jerry's</a>"#;
        let cell = encode_cell("s", &CellValue::from(raw)).expect("not rowid");
        let body = cell
            .strip_prefix(r#"<d:s m:type="String">"#)
            .and_then(|rest| rest.strip_suffix("</d:s>"))
            .expect("element framing");
        assert_eq!(
            body,
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&apos;s&lt;/a&gt;"
        );
        assert_eq!(unescape(body).expect("valid escapes"), raw);
    }

    #[rstest]
    fn rowid_is_never_emitted() {
        let cells = encode_all(&[
            ("rowid", CellValue::Int64(9)),
            ("name", CellValue::from("kept")),
        ]);
        assert_eq!(cells, vec![r#"<d:name m:type="String">kept</d:name>"#]);
    }

    #[rstest]
    fn cells_keep_input_order() {
        let cells = encode_all(&[
            ("b", CellValue::Int64(2)),
            ("a", CellValue::Int64(1)),
        ]);
        assert_eq!(
            cells,
            vec![
                r#"<d:b m:type="Int64">2</d:b>"#,
                r#"<d:a m:type="Int64">1</d:a>"#
            ]
        );
    }
}
