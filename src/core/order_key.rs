//! Sort key recovered from human-entered offer ids such as `р20-п5-33`.
//!
//! Offer ids start with a one or two character tag (`р`, `мд`, ...) followed
//! by a small order number and a free-form suffix. The number is only
//! accepted when its digit run is one or two digits long and lies in 1..=99,
//! so `р100-...` or `р0-...` carry no key.

use crate::domain::model::LineItem;
use serde::{Deserialize, Serialize};

pub const MIN_KEY: u8 = 1;
pub const MAX_KEY: u8 = 99;

/// Extracts the order number from an offer id, trying (in order) the id
/// without its first character, without its first two characters, and the
/// id as-is.
pub fn extract(offer_id: &str) -> Option<u8> {
    let chars: Vec<char> = offer_id.chars().collect();
    if chars.is_empty() {
        return None;
    }

    if chars.len() > 1 {
        if let Some(key) = leading_key(&chars[1..]) {
            return Some(key);
        }
    }

    if chars.len() > 2 {
        if let Some(key) = leading_key(&chars[2..]) {
            return Some(key);
        }
    }

    leading_key(&chars)
}

/// A run of one or two ASCII digits at the start, followed by a non-digit or the end.
fn leading_key(chars: &[char]) -> Option<u8> {
    let run = chars.iter().take_while(|c| c.is_ascii_digit()).count();
    if run == 0 || run > 2 {
        return None;
    }

    let value = chars[..run]
        .iter()
        .fold(0u8, |acc, c| acc * 10 + (*c as u8 - b'0'));

    (MIN_KEY..=MAX_KEY).contains(&value).then_some(value)
}

/// 商品列的排序方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    /// Case-insensitive lexicographic order on the raw offer id.
    #[default]
    OfferId,
    /// Items with an extracted key first, by ascending key; keyless items
    /// after them in case-insensitive lexicographic order.
    OrderKey,
}

/// Sorts in place. The sort is stable, so equal keys keep fetch order.
pub fn sort_line_items(items: &mut [LineItem], policy: SortPolicy) {
    match policy {
        SortPolicy::OfferId => items.sort_by_cached_key(|item| item.offer_id.to_lowercase()),
        SortPolicy::OrderKey => items.sort_by_cached_key(|item| {
            let key = extract(&item.offer_id);
            (key.is_none(), key.unwrap_or(0), item.offer_id.to_lowercase())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_known_offer_ids() {
        let cases = [
            ("р20-п5-33", Some(20)),
            ("р25-п5-33", Some(25)),
            ("р30-п5-33", Some(30)),
            ("мд33-п2-30", Some(33)),
            ("р1-п5-33", Some(1)),
            ("р99-п5-33", Some(99)),
            ("р100-п5-33", None),
            ("р0-п5-33", None),
            ("invalid", None),
            ("р5", Some(5)),
            ("мд10-п2", Some(10)),
        ];

        for (offer_id, expected) in cases {
            assert_eq!(extract(offer_id), expected, "offer_id {:?}", offer_id);
        }
    }

    #[test]
    fn test_extract_edge_cases() {
        assert_eq!(extract(""), None);
        assert_eq!(extract("7"), Some(7));
        assert_eq!(extract("42"), Some(2));
        assert_eq!(extract("р"), None);
        assert_eq!(extract("р55x"), Some(55));
        assert_eq!(extract("xy123"), None);
        assert_eq!(extract("EN07-blue"), Some(7));
    }

    fn item(offer_id: &str) -> LineItem {
        LineItem {
            offer_id: offer_id.to_string(),
            ..Default::default()
        }
    }

    fn offer_ids(items: &[LineItem]) -> Vec<&str> {
        items.iter().map(|i| i.offer_id.as_str()).collect()
    }

    #[test]
    fn test_offer_id_policy_is_case_insensitive_lexical() {
        let mut items = vec![item("b-2"), item("A-1"), item("р5-п5-33"), item("р20-п5-33")];

        sort_line_items(&mut items, SortPolicy::OfferId);

        assert_eq!(offer_ids(&items), vec!["A-1", "b-2", "р20-п5-33", "р5-п5-33"]);
    }

    #[test]
    fn test_order_key_policy_puts_keyed_items_first() {
        let mut items = vec![
            item("р30-п5-33"),
            item("zeta"),
            item("р5-п5-33"),
            item("Alpha"),
            item("мд33-п2-30"),
            item("р1-п5-33"),
        ];

        sort_line_items(&mut items, SortPolicy::OrderKey);

        assert_eq!(
            offer_ids(&items),
            vec!["р1-п5-33", "р5-п5-33", "р30-п5-33", "мд33-п2-30", "Alpha", "zeta"]
        );
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let mut first = item("р3-a");
        first.posting_number = "first".to_string();
        let mut second = item("р3-a");
        second.posting_number = "second".to_string();
        let mut items = vec![first, second];

        sort_line_items(&mut items, SortPolicy::OrderKey);

        assert_eq!(items[0].posting_number, "first");
        assert_eq!(items[1].posting_number, "second");
    }
}
