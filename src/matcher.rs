use crate::criteria::{PatternSymbol, SearchCriteria, fold_letter};
use crate::debug_log;
use crate::dictionary::Dictionary;

/// Whether `word` satisfies every constraint in `criteria`.
///
/// Checks run cheapest first and stop at the first failure: length, pattern,
/// excluded letters, included letters. Comparison is case-insensitive.
#[must_use]
pub fn matches(word: &str, criteria: &SearchCriteria) -> bool {
    if word.chars().count() != criteria.length() {
        return false;
    }

    let pattern_ok = word
        .chars()
        .zip(criteria.pattern())
        .all(|(c, symbol)| match symbol {
            PatternSymbol::Letter(expected) => fold_letter(c) == *expected,
            PatternSymbol::Wildcard => true,
        });
    if !pattern_ok {
        return false;
    }

    let excluded = criteria.excluded();
    if !excluded.is_empty() && word.chars().any(|c| excluded.contains(&fold_letter(c))) {
        return false;
    }

    // One occurrence is enough, even if a letter is listed twice.
    criteria
        .included()
        .iter()
        .all(|&letter| word.chars().any(|c| fold_letter(c) == letter))
}

/// All dictionary words matching `criteria`, in dictionary order.
///
/// The caller picks the dictionary; its language is not checked against the
/// criteria.
#[must_use]
pub fn compute_matches(criteria: &SearchCriteria, dictionary: &Dictionary) -> Vec<String> {
    let found: Vec<String> = dictionary
        .words_of_length(criteria.length())
        .filter(|word| matches(word, criteria))
        .map(str::to_string)
        .collect();
    debug_log!("{} matches for {}", found.len(), criteria);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::Language;
    use crate::dictionary::parse_dictionary;
    use proptest::prelude::*;

    fn criteria(length: i64, pattern: &str, include: &str, exclude: &str) -> SearchCriteria {
        SearchCriteria::new("en", length, Some(pattern), include, exclude).unwrap()
    }

    #[test]
    fn test_length_must_match() {
        let c = criteria(5, "?????", "", "");
        assert!(matches("crane", &c));
        assert!(!matches("cranes", &c));
        assert!(!matches("cran", &c));
    }

    #[test]
    fn test_pattern_positions() {
        let c = criteria(5, "?a?e?", "", "");
        assert!(matches("PAPER", &c));
        assert!(matches("paper", &c));
        assert!(!matches("CRANE", &c));
    }

    #[test]
    fn test_excluded_letters_anywhere() {
        let c = criteria(5, "?a?e?", "", "s");
        assert!(!matches("MATES", &c));
        assert!(matches("WAGER", &c));
    }

    #[test]
    fn test_included_letters_anywhere_once() {
        let c = criteria(5, "?????", "pr", "");
        assert!(matches("PAPER", &c));
        assert!(!matches("CRANE", &c));
        // A doubled include letter needs only one occurrence.
        let c = criteria(5, "?????", "pp", "");
        assert!(matches("PLANE", &c));
    }

    #[test]
    fn test_included_letter_may_sit_on_literal_position() {
        let c = criteria(5, "p????", "p", "");
        assert!(matches("PLANE", &c));
    }

    #[test]
    fn test_scenario_pattern_with_exclusion() {
        let dictionary = parse_dictionary(
            Language::parse("en").unwrap(),
            "bakes\ncakes\nmates\npages\npaper\n",
        );
        let c = criteria(5, "?a?e?", "", "s");
        assert_eq!(compute_matches(&c, &dictionary), vec!["PAPER"]);
    }

    #[test]
    fn test_compute_matches_keeps_dictionary_order() {
        let dictionary = parse_dictionary(
            Language::parse("en").unwrap(),
            "wager\npaper\nbaker\ncaper\n",
        );
        let c = criteria(5, "?a?er", "", "");
        assert_eq!(
            compute_matches(&c, &dictionary),
            vec!["WAGER", "PAPER", "BAKER", "CAPER"]
        );
    }

    #[test]
    fn test_compute_matches_empty_is_fine() {
        let dictionary = parse_dictionary(Language::parse("en").unwrap(), "crane\n");
        let c = criteria(3, "???", "", "");
        assert!(compute_matches(&c, &dictionary).is_empty());
    }

    // Straightforward reference implementation of the four checks.
    fn oracle(word: &str, length: usize, pattern: &[Option<char>], include: &[char], exclude: &[char]) -> bool {
        let upper: Vec<char> = word.to_uppercase().chars().collect();
        if upper.len() != length {
            return false;
        }
        for (i, slot) in pattern.iter().enumerate() {
            if let Some(p) = slot
                && upper[i] != p.to_ascii_uppercase()
            {
                return false;
            }
        }
        if exclude.iter().any(|e| upper.contains(&e.to_ascii_uppercase())) {
            return false;
        }
        include.iter().all(|i| upper.contains(&i.to_ascii_uppercase()))
    }

    fn letter() -> impl Strategy<Value = char> {
        prop::sample::select(vec!['a', 'b', 'c', 'd', 'e', 'A', 'B', 'C', 'D', 'E'])
    }

    fn to_text(letters: &[char]) -> String {
        letters.iter().collect()
    }

    proptest! {
        #[test]
        fn matches_agrees_with_reference(
            word in prop::collection::vec(letter(), 1..7),
            pattern in prop::collection::vec(prop::option::of(letter()), 1..7),
            include in prop::collection::vec(letter(), 0..3),
            exclude in prop::collection::vec(letter(), 0..3),
        ) {
            let include: Vec<char> = include
                .into_iter()
                .filter(|i| !exclude.iter().any(|e| e.eq_ignore_ascii_case(i)))
                .collect();
            let pattern_text: String = pattern.iter().map(|p| p.unwrap_or('?')).collect();
            let c = SearchCriteria::new(
                "en",
                pattern.len() as i64,
                Some(&pattern_text),
                &to_text(&include),
                &to_text(&exclude),
            )
            .unwrap();

            let word = to_text(&word);
            prop_assert_eq!(
                matches(&word, &c),
                oracle(&word, pattern.len(), &pattern, &include, &exclude)
            );
        }

        #[test]
        fn filled_pattern_always_matches(
            pattern in prop::collection::vec(prop::option::of(letter()), 1..7),
            fill in letter(),
        ) {
            let pattern_text: String = pattern.iter().map(|p| p.unwrap_or('?')).collect();
            let word: String = pattern.iter().map(|p| p.unwrap_or(fill)).collect();
            let c = SearchCriteria::new("en", pattern.len() as i64, Some(&pattern_text), "", "").unwrap();
            prop_assert!(matches(&word, &c));
        }

        #[test]
        fn excluded_letter_in_word_never_matches(
            word in prop::collection::vec(letter(), 1..7),
            index in any::<prop::sample::Index>(),
        ) {
            let banned = word[index.index(word.len())];
            let c = SearchCriteria::new("en", word.len() as i64, None, "", &banned.to_string()).unwrap();
            prop_assert!(!matches(&to_text(&word), &c));
        }
    }
}
