// Page classification against a keyword table
use crate::keyword_table::{KeywordTable, MatchMode};
use serde::Serialize;

/// Result of classifying one page's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: String,
    /// Copied from the table at classification time.
    pub priority: i64,
    /// The keyword that fired; `None` means the fallback category.
    pub keyword: Option<String>,
}

impl Classification {
    pub fn is_unmatched(&self) -> bool {
        self.keyword.is_none()
    }

    fn unmatched(table: &KeywordTable) -> Self {
        Self {
            category: table.fallback().to_string(),
            priority: table.fallback_priority(),
            keyword: None,
        }
    }
}

/// Classify page text. Pure: same text and table always give the same answer.
///
/// Text is upper-cased before matching, the same normalization applied to
/// the table's keywords at load time. Under `MatchMode::First` the first
/// category in table order with any keyword found wins, regardless of how
/// good a later match would be.
pub fn classify(text: &str, table: &KeywordTable) -> Classification {
    if text.trim().is_empty() {
        return Classification::unmatched(table);
    }
    let text = text.to_uppercase();

    match table.match_mode() {
        MatchMode::First => {
            for category in table.categories() {
                let found = category
                    .keywords()
                    .iter()
                    .find(|k| text.contains(k.as_str()));
                if let Some(keyword) = found {
                    return hit(category.name(), category.priority(), keyword);
                }
            }
            Classification::unmatched(table)
        }
        MatchMode::Word => {
            for category in table.categories() {
                let found = category
                    .word_patterns()
                    .iter()
                    .position(|p| p.is_match(&text));
                if let Some(i) = found {
                    return hit(category.name(), category.priority(), &category.keywords()[i]);
                }
            }
            Classification::unmatched(table)
        }
        MatchMode::Longest => {
            let mut best: Option<(usize, Classification)> = None;
            for category in table.categories() {
                for keyword in category.keywords() {
                    let len = keyword.chars().count();
                    let longer = best.as_ref().map_or(true, |(best_len, _)| len > *best_len);
                    if longer && text.contains(keyword.as_str()) {
                        best = Some((len, hit(category.name(), category.priority(), keyword)));
                    }
                }
            }
            best.map(|(_, c)| c).unwrap_or_else(|| Classification::unmatched(table))
        }
    }
}

fn hit(category: &str, priority: i64, keyword: &str) -> Classification {
    Classification {
        category: category.to_string(),
        priority,
        keyword: Some(keyword.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn couriers() -> KeywordTable {
        KeywordTable::builtin("couriers").unwrap()
    }

    #[test]
    fn test_case_insensitive_match() {
        let c = classify("ship via Delhivery surface", &couriers());
        assert_eq!(c.category, "DELHIVERY PICKUP");
        assert_eq!(c.priority, 3);
        assert_eq!(c.keyword.as_deref(), Some("DELHIVERY"));
    }

    #[test]
    fn test_ocr_misread_variant() {
        let c = classify("SHADOW FAX pickup point", &couriers());
        assert_eq!(c.category, "SHADOWFAX PICKUP");
    }

    #[test]
    fn test_first_match_wins_by_table_order() {
        // XPRESS BEES is listed after VALMO, so VALMO wins even though the
        // XPRESS keyword appears first in the text.
        let c = classify("XPRESSBEES return to VALMO hub", &couriers());
        assert_eq!(c.category, "VALMO PICKUP");
    }

    #[test]
    fn test_short_keyword_fires_inside_longer_token() {
        let c = classify("EXPRESSWAY DEPOT", &couriers());
        assert_eq!(c.category, "XPRESS BEES");
    }

    #[test]
    fn test_word_mode_requires_boundaries() {
        let table = couriers().with_match_mode(MatchMode::Word);
        assert!(classify("EXPRESSWAY DEPOT", &table).is_unmatched());
        assert_eq!(classify("xpress-bees awb 123", &table).category, "XPRESS BEES");
    }

    #[test]
    fn test_longest_mode_prefers_specific_model() {
        let table = KeywordTable::builtin("models").unwrap();
        let text = "Back cover for OPPO A57 5G";
        assert_eq!(classify(text, &table).category, "OPPO A57");

        let longest = table.with_match_mode(MatchMode::Longest);
        assert_eq!(classify(text, &longest).category, "OPPO A57 5G");
    }

    #[test]
    fn test_empty_and_unknown_text_fall_back() {
        let table = couriers();
        let empty = classify("", &table);
        assert!(empty.is_unmatched());
        assert_eq!(empty.category, "UNKNOWN");
        assert_eq!(empty.priority, 99);

        assert!(classify("BLUE DART", &table).is_unmatched());
    }

    #[test]
    fn test_deterministic() {
        let table = couriers();
        let text = "valmo shadowfax delhivery";
        let first = classify(text, &table);
        for _ in 0..10 {
            assert_eq!(classify(text, &table), first);
        }
    }
}
