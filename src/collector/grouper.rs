//! Groups flat columns into per-metric value vectors.
//!
//! A heading such as `Mem BW S1 C3` names the metric `Mem BW`, socket `1`
//! and channel `3`. Columns sharing the metric and socket form one group
//! whose values are indexed by channel (`C<n>` or `P<n>`). Missing channels
//! read as `None`. The decomposition depends only on the headings, so it is
//! computed once per heading load as a [`ColumnLayout`].

use tracing::warn;

use crate::collector::headings::HeadingSet;
use crate::collector::parser::RawRecord;

/// Column label holding the sample time (compared case-insensitively).
const TIMESTAMP_LABEL: &str = "timestamp";

/// Largest channel index a layout accepts. Columns beyond it are skipped.
pub const MAX_CHANNEL_INDEX: usize = 4095;

/// Error for a record that cannot be grouped. The record is dropped whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A value column holds something that is not a finite number.
    InvalidNumber { column: String, value: String },
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::InvalidNumber { column, value } => {
                write!(f, "invalid number {:?} in column {:?}", value, column)
            }
        }
    }
}

impl std::error::Error for RecordError {}

/// Identity of one emitted metric point within a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    /// Heading label with socket and channel tokens removed.
    pub metric: String,
    pub socket: Option<u32>,
}

/// Role of one column in the data lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Timestamp,
    Value { group: usize, channel: usize },
    Skipped,
}

/// Heading labels decomposed into group keys and channel indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<Column>,
    /// Distinct keys in order of first appearance.
    keys: Vec<GroupKey>,
}

impl ColumnLayout {
    pub fn new(headings: &HeadingSet) -> Self {
        let mut layout = Self::default();
        for label in headings.iter() {
            if label.eq_ignore_ascii_case(TIMESTAMP_LABEL) {
                layout.columns.push(Column::Timestamp);
                continue;
            }
            let (key, channel) = decompose_heading(label);
            if channel > MAX_CHANNEL_INDEX {
                warn!(
                    "Skipping column '{}': channel {} exceeds {}",
                    label, channel, MAX_CHANNEL_INDEX
                );
                layout.columns.push(Column::Skipped);
                continue;
            }
            let group = match layout.keys.iter().position(|k| *k == key) {
                Some(i) => i,
                None => {
                    layout.keys.push(key);
                    layout.keys.len() - 1
                }
            };
            layout.columns.push(Column::Value { group, channel });
        }
        layout
    }

    /// Distinct group keys, in order of first appearance.
    pub fn keys(&self) -> &[GroupKey] {
        &self.keys
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Per-key value vectors for one record, in key order of the layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedValues {
    groups: Vec<(GroupKey, Vec<Option<i64>>)>,
}

impl GroupedValues {
    /// Stores `value` at `channel`, padding with `None` as needed.
    /// An occupied slot is overwritten.
    fn insert(&mut self, group: usize, channel: usize, value: i64) {
        let values = &mut self.groups[group].1;
        if channel >= values.len() {
            values.resize(channel + 1, None);
        }
        values[channel] = Some(value);
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, metric: &str, socket: Option<u32>) -> Option<&[Option<i64>]> {
        self.groups
            .iter()
            .find(|(k, _)| k.metric == metric && k.socket == socket)
            .map(|(_, v)| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &[Option<i64>])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

impl IntoIterator for GroupedValues {
    type Item = (GroupKey, Vec<Option<i64>>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Result of grouping one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedRecord<'a> {
    /// Raw text of every timestamp column, in column order.
    pub timestamps: Vec<&'a str>,
    pub values: GroupedValues,
}

/// Groups the fields of `record` according to `layout`.
///
/// The record must have been validated against the headings the layout
/// was built from.
pub fn group_record<'a>(
    layout: &ColumnLayout,
    headings: &HeadingSet,
    record: &RawRecord<'a>,
) -> Result<GroupedRecord<'a>, RecordError> {
    let mut values = GroupedValues {
        groups: layout
            .keys
            .iter()
            .map(|k| (k.clone(), Vec::new()))
            .collect(),
    };
    let mut timestamps = Vec::new();

    for (i, (column, field)) in layout.columns.iter().zip(record.fields()).enumerate() {
        match *column {
            Column::Timestamp => timestamps.push(*field),
            Column::Skipped => {}
            Column::Value { group, channel } => {
                let value = parse_value(field).ok_or_else(|| RecordError::InvalidNumber {
                    column: headings.labels().get(i).cloned().unwrap_or_default(),
                    value: field.to_string(),
                })?;
                values.insert(group, channel, value);
            }
        }
    }

    Ok(GroupedRecord { timestamps, values })
}

/// Parses a numeric field, truncating toward zero.
///
/// Values that do not fit in an `i64` are rejected.
pub fn parse_value(field: &str) -> Option<i64> {
    let v: f64 = field.trim().parse().ok()?;
    let t = v.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    (t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

/// Splits a heading into its group key and channel index.
pub fn decompose_heading(label: &str) -> (GroupKey, usize) {
    let mut label = label.to_string();

    let mut socket = None;
    if let Some(n) = first_token(&label, &['S'], u32::MAX as usize) {
        socket = Some(n as u32);
        label = remove_tokens(&label, &['S'], u32::MAX as usize)
            .trim()
            .to_string();
    }

    let mut channel = 0;
    if let Some(n) = first_token(&label, &['C', 'P'], usize::MAX) {
        channel = n;
        label = remove_tokens(&label, &['C', 'P'], usize::MAX)
            .trim()
            .to_string();
    }

    (
        GroupKey {
            metric: label,
            socket,
        },
        channel,
    )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Finds `<prefix><digits>` tokens standing alone between word boundaries.
///
/// Yields the byte range of each token and its numeric value. Tokens whose
/// value exceeds `max` are not tokens.
fn tokens<'a>(
    label: &'a str,
    prefixes: &'a [char],
    max: usize,
) -> impl Iterator<Item = (std::ops::Range<usize>, usize)> + 'a {
    label.char_indices().filter_map(move |(start, c)| {
        if !prefixes.contains(&c) {
            return None;
        }
        if label[..start].chars().next_back().is_some_and(is_word_char) {
            return None;
        }
        let digits_start = start + c.len_utf8();
        let rest = &label[digits_start..];
        let digits_len = rest.len() - rest.trim_start_matches(|d: char| d.is_ascii_digit()).len();
        if digits_len == 0 {
            return None;
        }
        let end = digits_start + digits_len;
        if label[end..].chars().next().is_some_and(is_word_char) {
            return None;
        }
        // All digits, so a parse failure means overflow.
        let n = label[digits_start..end].parse().unwrap_or(usize::MAX);
        (n <= max).then_some((start..end, n))
    })
}

fn first_token(label: &str, prefixes: &[char], max: usize) -> Option<usize> {
    tokens(label, prefixes, max).next().map(|(_, n)| n)
}

/// Removes every token matched by [`tokens`].
fn remove_tokens(label: &str, prefixes: &[char], max: usize) -> String {
    let mut out = String::with_capacity(label.len());
    let mut last = 0;
    for (range, _) in tokens(label, prefixes, max) {
        out.push_str(&label[last..range.start]);
        last = range.end;
    }
    out.push_str(&label[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::parser::parse_record;

    fn headings(labels: &[&str]) -> HeadingSet {
        HeadingSet::new(labels.iter().map(|s| s.to_string()).collect())
    }

    fn key(metric: &str, socket: Option<u32>) -> GroupKey {
        GroupKey {
            metric: metric.to_string(),
            socket,
        }
    }

    #[test]
    fn test_decompose_socket_and_channel() {
        assert_eq!(decompose_heading("Temp S1 C0"), (key("Temp", Some(1)), 0));
        assert_eq!(decompose_heading("Temp S12 C7"), (key("Temp", Some(12)), 7));
        assert_eq!(decompose_heading("Port BW P3"), (key("Port BW", None), 3));
        assert_eq!(decompose_heading("IPC"), (key("IPC", None), 0));
    }

    #[test]
    fn test_decompose_requires_word_boundaries() {
        // Tokens glued to other word characters are part of the label.
        assert_eq!(decompose_heading("SS1 C0x"), (key("SS1 C0x", None), 0));
        assert_eq!(decompose_heading("S1C0"), (key("S1C0", None), 0));
        assert_eq!(decompose_heading("Mem_S1"), (key("Mem_S1", None), 0));
        assert_eq!(decompose_heading("L2(S0)"), (key("L2()", Some(0)), 0));
    }

    #[test]
    fn test_decompose_keeps_inner_spacing() {
        assert_eq!(
            decompose_heading("Mem S0 Read BW C1"),
            (key("Mem  Read BW", Some(0)), 1)
        );
    }

    #[test]
    fn test_decompose_first_token_wins_all_removed() {
        assert_eq!(decompose_heading("X S2 S3"), (key("X", Some(2)), 0));
        assert_eq!(decompose_heading("X C4 P5"), (key("X", None), 4));
    }

    #[test]
    fn test_decompose_huge_channel_keeps_metric() {
        assert_eq!(decompose_heading("X C99999999"), (key("X", None), 99999999));
        assert_eq!(
            decompose_heading("X C99999999999999999999999"),
            (key("X", None), usize::MAX)
        );
    }

    #[test]
    fn test_layout_skips_out_of_range_channel() {
        let h = headings(&["X C1", "X C5000"]);
        let layout = ColumnLayout::new(&h);
        assert_eq!(layout.keys(), &[key("X", None)]);
        assert_eq!(layout.column_count(), 2);

        let rec = parse_record("1;2", &h).unwrap();
        let grouped = group_record(&layout, &h, &rec).unwrap();
        assert_eq!(grouped.values.len(), 1);
        assert_eq!(grouped.values.get("X", None), Some(&[None, Some(1)][..]));
    }

    #[test]
    fn test_parse_value_truncates() {
        assert_eq!(parse_value("10"), Some(10));
        assert_eq!(parse_value("10.9"), Some(10));
        assert_eq!(parse_value("-3.7"), Some(-3));
        assert_eq!(parse_value("1e3"), Some(1000));
        assert_eq!(parse_value("abc"), None);
        assert_eq!(parse_value("nan"), None);
        assert_eq!(parse_value("inf"), None);
    }

    #[test]
    fn test_parse_value_rejects_out_of_range() {
        assert_eq!(parse_value("1e30"), None);
        assert_eq!(parse_value("-1e30"), None);
        assert_eq!(parse_value("9223372036854775808"), None);
        assert_eq!(parse_value("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_value("9007199254740992"), Some(9007199254740992));
    }

    #[test]
    fn test_group_out_of_range_number_fails_record() {
        let h = headings(&["A"]);
        let layout = ColumnLayout::new(&h);
        let rec = parse_record("1e30", &h).unwrap();
        assert_eq!(
            group_record(&layout, &h, &rec).unwrap_err(),
            RecordError::InvalidNumber {
                column: "A".to_string(),
                value: "1e30".to_string()
            }
        );
    }

    #[test]
    fn test_group_sockets_and_channels() {
        let h = headings(&["timestamp", "Temp S1 C0", "Temp S1 C1", "Temp S2 C0"]);
        let layout = ColumnLayout::new(&h);
        let rec = parse_record("2020-01-01T00:00:00Z;10;20;30", &h).unwrap();
        let grouped = group_record(&layout, &h, &rec).unwrap();

        assert_eq!(grouped.timestamps, vec!["2020-01-01T00:00:00Z"]);
        assert_eq!(grouped.values.len(), 2);
        assert_eq!(
            grouped.values.get("Temp", Some(1)),
            Some(&[Some(10), Some(20)][..])
        );
        assert_eq!(grouped.values.get("Temp", Some(2)), Some(&[Some(30)][..]));
    }

    #[test]
    fn test_group_gaps_are_none() {
        let h = headings(&["Util C3", "Util C1"]);
        let layout = ColumnLayout::new(&h);
        let rec = parse_record("7;5", &h).unwrap();
        let grouped = group_record(&layout, &h, &rec).unwrap();
        assert_eq!(
            grouped.values.get("Util", None),
            Some(&[None, Some(5), None, Some(7)][..])
        );
    }

    #[test]
    fn test_group_duplicate_channel_last_write_wins() {
        let h = headings(&["Util S0 C0", "Util S0 P0"]);
        let layout = ColumnLayout::new(&h);
        assert_eq!(layout.keys().len(), 1);
        let rec = parse_record("1;2", &h).unwrap();
        let grouped = group_record(&layout, &h, &rec).unwrap();
        assert_eq!(grouped.values.get("Util", Some(0)), Some(&[Some(2)][..]));
    }

    #[test]
    fn test_group_invalid_number_fails_record() {
        let h = headings(&["A", "B"]);
        let layout = ColumnLayout::new(&h);
        let rec = parse_record("1;oops", &h).unwrap();
        let err = group_record(&layout, &h, &rec).unwrap_err();
        assert_eq!(
            err,
            RecordError::InvalidNumber {
                column: "B".to_string(),
                value: "oops".to_string()
            }
        );
    }

    #[test]
    fn test_timestamp_label_case_insensitive() {
        let h = headings(&["TimeStamp", "A"]);
        let layout = ColumnLayout::new(&h);
        assert_eq!(layout.keys(), &[key("A", None)]);
        assert_eq!(layout.column_count(), 2);
    }

    #[test]
    fn test_key_order_follows_headings() {
        let h = headings(&["B S1", "A", "B S0"]);
        let layout = ColumnLayout::new(&h);
        assert_eq!(
            layout.keys(),
            &[key("B", Some(1)), key("A", None), key("B", Some(0))]
        );
    }
}
