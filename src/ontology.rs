//! Hierarchical event-code ontology.
//!
//! External event codes are hierarchical CAMEO text codes ("19", "192",
//! "1921"). Internally each code is a single integer whose nibbles encode the
//! hierarchy: the top bits carry the two-digit cue category, successive
//! nibbles carry increasing specialization. This makes "more specific"
//! numerically larger within a category and lets code combination be plain
//! integer algebra.
//!
//! Negated or rejected senses are represented by subtracting a large bias,
//! so any negated code is negative and stays negative through further
//! combination.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// External form of the null/unassigned code.
pub const NULL_CODE: &str = "---";

/// Internal value of the null code.
pub const NULL_VALUE: i64 = 0;

/// Values at or above this carry a full cue category.
pub const CUE_CATEGORY: i64 = 0x1000;

/// Bias subtracted to mark a negated sense. Larger than any encodable code.
const NEGATION_BIAS: i64 = 0x10_0000;

/// Number of two-digit CAMEO root categories (01..=20).
const ROOT_COUNT: u8 = 20;

fn encode_digits(root: u8, d3: Option<u8>, d4: Option<u8>) -> i64 {
    // Digit nibbles are biased by one so an absent digit (0) is distinct from
    // the digit zero ("05" vs "050").
    let mut v = i64::from(root) << 12;
    if let Some(d) = d3 {
        v |= i64::from(d + 1) << 8;
    }
    if let Some(d) = d4 {
        v |= i64::from(d + 1) << 4;
    }
    v
}

/// Bidirectional table between external text codes and internal values.
///
/// Forward entries cover the 20 root categories and every three-digit
/// specialization under them. Four-digit leaves convert forward positionally;
/// on the reverse path an unmapped leaf falls back to its two-digit root.
struct CodeTable {
    forward: HashMap<String, i64>,
    reverse: HashMap<i64, String>,
}

static CODE_TABLE: Lazy<CodeTable> = Lazy::new(|| {
    let mut forward = HashMap::new();
    let mut reverse = HashMap::new();
    for root in 1..=ROOT_COUNT {
        let text = format!("{root:02}");
        let value = encode_digits(root, None, None);
        forward.insert(text.clone(), value);
        reverse.insert(value, text);
        for d3 in 0..=9u8 {
            let text = format!("{root:02}{d3}");
            let value = encode_digits(root, Some(d3), None);
            forward.insert(text.clone(), value);
            reverse.insert(value, text);
        }
    }
    CodeTable { forward, reverse }
});

/// Convert an external text code to its internal value.
///
/// Returns `None` for anything that is not the null code, a table entry, or a
/// well-formed two-to-four digit numeric code.
#[must_use]
pub fn convert_forward(text: &str) -> Option<i64> {
    if text == NULL_CODE || text.is_empty() {
        return Some(NULL_VALUE);
    }
    if let Some(&v) = CODE_TABLE.forward.get(text) {
        return Some(v);
    }
    // Positional fallback for specific leaves absent from the table.
    if !(2..=4).contains(&text.len()) || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let root: u8 = text[..2].parse().ok()?;
    if root == 0 || root > ROOT_COUNT {
        return None;
    }
    let d3 = text.as_bytes().get(2).map(|b| b - b'0');
    let d4 = text.as_bytes().get(3).map(|b| b - b'0');
    Some(encode_digits(root, d3, d4))
}

/// Convert an internal value back to its external text code.
///
/// Negation is stripped first. Unmapped specific leaves fall back to their
/// two-digit root; values outside every category map to the null code.
#[must_use]
pub fn convert_reverse(value: i64) -> String {
    let value = if value < 0 { value + NEGATION_BIAS } else { value };
    if value <= NULL_VALUE {
        return NULL_CODE.to_string();
    }
    if let Some(text) = CODE_TABLE.reverse.get(&value) {
        return text.clone();
    }
    // Reconstruct a four-digit leaf if every nibble is a biased decimal digit.
    let root = (value >> 12) as u8;
    let d3 = ((value >> 8) & 0xF) as u8;
    let d4 = ((value >> 4) & 0xF) as u8;
    if (1..=ROOT_COUNT).contains(&root)
        && (1..=10).contains(&d3)
        && (1..=10).contains(&d4)
        && value & 0xF == 0
    {
        return format!("{root:02}{}{}", d3 - 1, d4 - 1);
    }
    // Two-digit root fallback.
    if (1..=ROOT_COUNT).contains(&root) {
        return format!("{root:02}");
    }
    NULL_CODE.to_string()
}

/// Combine an outer event code with an inner (nested) one.
///
/// Rules, in order:
/// 1. A negative inner code is a negation: it is added to the outer code and
///    the result goes (and stays) negative.
/// 2. An already-negative outer code absorbs any positive inner code
///    unchanged, so negation dominates transitively.
/// 3. If both codes carry a full cue category, the inner (nested) event wins.
/// 4. Otherwise the larger, more specific value wins.
#[must_use]
pub fn combine(outer: i64, inner: i64) -> i64 {
    if inner < 0 {
        return outer + inner;
    }
    if outer < 0 {
        return outer;
    }
    if outer >= CUE_CATEGORY && inner >= CUE_CATEGORY {
        return inner;
    }
    outer.max(inner)
}

/// A resolved event code.
///
/// Carries the internal integer value and, for symmetric events declared as
/// `"active:passive"` in the verb dictionary, the passive half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventCode {
    /// Internal value of the active half.
    pub value: i64,
    /// Passive half for symmetric events.
    pub paired: Option<i64>,
}

impl EventCode {
    /// The null/unassigned code.
    #[must_use]
    pub fn null() -> Self {
        EventCode {
            value: NULL_VALUE,
            paired: None,
        }
    }

    /// Build from an internal value.
    #[must_use]
    pub fn from_value(value: i64) -> Self {
        EventCode {
            value,
            paired: None,
        }
    }

    /// Parse an external text code, accepting the symmetric `"A:P"` form.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.split_once(':') {
            Some((active, passive)) => Some(EventCode {
                value: convert_forward(active)?,
                paired: Some(convert_forward(passive)?),
            }),
            None => Some(EventCode {
                value: convert_forward(text)?,
                paired: None,
            }),
        }
    }

    /// True if no code has been assigned.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value == NULL_VALUE && self.paired.is_none()
    }

    /// True if this code carries a negated sense.
    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.value < 0
    }

    /// True if this is a symmetric (active:passive) code.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.paired.is_some()
    }

    /// Negate this code's sense.
    #[must_use]
    pub fn negated(self) -> Self {
        EventCode {
            value: self.value - NEGATION_BIAS,
            paired: self.paired.map(|p| p - NEGATION_BIAS),
        }
    }

    /// Combine with a nested inner code (see [`combine`]).
    #[must_use]
    pub fn combined_with(self, inner: EventCode) -> Self {
        EventCode {
            value: combine(self.value, inner.value),
            paired: self.paired,
        }
    }

    /// External text form of the active half.
    #[must_use]
    pub fn text(&self) -> String {
        convert_reverse(self.value)
    }

    /// External text form of the passive half, if symmetric.
    #[must_use]
    pub fn passive_text(&self) -> Option<String> {
        self.paired.map(convert_reverse)
    }
}

impl std::fmt::Display for EventCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.paired {
            Some(p) => write!(f, "{}:{}", self.text(), convert_reverse(p)),
            None => write!(f, "{}", self.text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_roots_and_leaves() {
        for code in ["01", "04", "19", "20", "192", "043", "190", "050"] {
            let v = convert_forward(code).unwrap();
            assert_eq!(convert_reverse(v), code, "code {code}");
        }
    }

    #[test]
    fn four_digit_leaf_roundtrip() {
        let v = convert_forward("1921").unwrap();
        assert_eq!(convert_reverse(v), "1921");
    }

    #[test]
    fn unmapped_leaf_falls_back_to_root() {
        // Third nibble outside the decimal range cannot be a real leaf.
        let v = encode_digits(19, Some(0xA), None);
        assert_eq!(convert_reverse(v), "19");
    }

    #[test]
    fn null_code_is_zero() {
        assert_eq!(convert_forward("---"), Some(0));
        assert_eq!(convert_reverse(0), "---");
    }

    #[test]
    fn invalid_codes_rejected() {
        assert_eq!(convert_forward("21"), None);
        assert_eq!(convert_forward("00"), None);
        assert_eq!(convert_forward("ABC"), None);
        assert_eq!(convert_forward("19215"), None);
    }

    #[test]
    fn specificity_orders_within_category() {
        let root = convert_forward("19").unwrap();
        let leaf = convert_forward("192").unwrap();
        let deep = convert_forward("1921").unwrap();
        assert!(root < leaf && leaf < deep);
    }

    #[test]
    fn combine_nested_full_codes_takes_inner() {
        let outer = convert_forward("04").unwrap();
        let inner = convert_forward("192").unwrap();
        assert_eq!(combine(outer, inner), inner);
    }

    #[test]
    fn combine_partial_takes_more_specific() {
        assert_eq!(combine(0x30, 0x20), 0x30);
        assert_eq!(combine(0x20, 0x30), 0x30);
    }

    #[test]
    fn negation_dominates_transitively() {
        let a = convert_forward("043").unwrap();
        let b = convert_forward("192").unwrap() - 0x10_0000;
        let c = convert_forward("20").unwrap();
        let ab = combine(a, b);
        assert!(ab < 0);
        let abc = combine(ab, c);
        assert!(abc < 0);
        assert_eq!(abc, ab);
    }

    #[test]
    fn symmetric_code_parses_both_halves() {
        let code = EventCode::parse("054:050").unwrap();
        assert!(code.is_symmetric());
        assert_eq!(code.text(), "054");
        assert_eq!(code.passive_text().as_deref(), Some("050"));
        assert_eq!(code.to_string(), "054:050");
    }

    #[test]
    fn negated_code_renders_base_text() {
        let code = EventCode::parse("192").unwrap().negated();
        assert!(code.is_negated());
        assert_eq!(code.text(), "192");
    }
}
