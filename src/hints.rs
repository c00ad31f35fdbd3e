//! Hint label allocation.
//!
//! Labels are fixed-length strings over the configured alphabet.  For `N`
//! elements and an alphabet of `A` symbols every label has length `L`, the
//! smallest `L ≥ 1` with `A^L ≥ N`.  Candidate labels are enumerated as the
//! Cartesian product of the alphabet in alphabet order
//! (`aa, ab, ba, bb` for `"ab"`) and handed out to elements in discovery
//! order; surplus combinations are never assigned.
//!
//! Because the mapping is a pure function of `(elements, alphabet)` the
//! overlay can re-derive an element from a typed label without any other
//! index.

use crate::types::ActionableElement;
use std::collections::HashSet;

/// Errors from [`allocate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HintError {
    /// A one-symbol alphabet can only label a single element.
    #[error("alphabet of {symbols} symbol(s) cannot label {elements} elements")]
    AlphabetTooSmall { symbols: usize, elements: usize },

    /// The alphabet repeats a symbol, so labels would collide.
    #[error("alphabet contains {0:?} more than once")]
    DuplicateSymbol(char),
}

/// An ordered `label → element` mapping.
///
/// Iteration yields pairs in assignment order, which is also the order the
/// elements were discovered in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HintMap {
    entries: Vec<(String, ActionableElement)>,
}

impl HintMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&ActionableElement> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionableElement)> {
        self.entries.iter().map(|(l, e)| (l.as_str(), e))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    /// Entries whose label starts with `prefix`, in assignment order.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a ActionableElement)> + 'a {
        self.iter().filter(move |(l, _)| l.starts_with(prefix))
    }

    /// `true` if at least one label starts with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.with_prefix(prefix).next().is_some()
    }
}

impl FromIterator<(String, ActionableElement)> for HintMap {
    fn from_iter<I: IntoIterator<Item = (String, ActionableElement)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Smallest `L ≥ 1` such that `symbols^L ≥ elements`.
///
/// Computed with integer arithmetic so large counts are not subject to
/// floating-point rounding in `log(n) / log(a)`.  `symbols` must be at
/// least 2 unless `elements ≤ 1`.
pub fn label_length(elements: usize, symbols: usize) -> usize {
    let mut length = 1;
    let mut capacity = symbols;
    while capacity < elements {
        capacity = capacity.saturating_mul(symbols);
        length += 1;
    }
    length
}

/// Lazily enumerates every string of `length` symbols in alphabet order.
struct Product<'a> {
    alphabet: &'a [char],
    indices: Vec<usize>,
    done: bool,
}

impl<'a> Product<'a> {
    fn new(alphabet: &'a [char], length: usize) -> Self {
        Self {
            alphabet,
            indices: vec![0; length],
            done: alphabet.is_empty(),
        }
    }
}

impl Iterator for Product<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        let label = self.indices.iter().map(|&i| self.alphabet[i]).collect();

        // Odometer increment, rightmost position fastest.
        let mut pos = self.indices.len();
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.indices[pos] += 1;
            if self.indices[pos] < self.alphabet.len() {
                break;
            }
            self.indices[pos] = 0;
        }
        Some(label)
    }
}

/// Assign a label to every element.
pub fn allocate(elements: &[ActionableElement], alphabet: &str) -> Result<HintMap, HintError> {
    if elements.is_empty() {
        return Ok(HintMap::default());
    }

    let symbols: Vec<char> = alphabet.chars().collect();
    if elements.len() == 1 {
        return match symbols.first() {
            Some(&c) => Ok(std::iter::once((c.to_string(), elements[0])).collect()),
            None => Err(HintError::AlphabetTooSmall {
                symbols: 0,
                elements: 1,
            }),
        };
    }

    let mut seen = HashSet::new();
    for &c in &symbols {
        if !seen.insert(c) {
            return Err(HintError::DuplicateSymbol(c));
        }
    }

    if symbols.len() < 2 {
        return Err(HintError::AlphabetTooSmall {
            symbols: symbols.len(),
            elements: elements.len(),
        });
    }

    let length = label_length(elements.len(), symbols.len());
    Ok(Product::new(&symbols, length)
        .zip(elements.iter().copied())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elements(n: usize) -> Vec<ActionableElement> {
        (0..n)
            .map(|i| ActionableElement::from_relative_box((0.0, 0.0), i as f64 * 10.0, 0.0, 4.0, 4.0))
            .collect()
    }

    fn labels(map: &HintMap) -> Vec<&str> {
        map.labels().collect()
    }

    #[test]
    fn empty_elements_yield_empty_map() {
        let map = allocate(&[], "asdf").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn empty_elements_with_degenerate_alphabet_is_fine() {
        assert!(allocate(&[], "").unwrap().is_empty());
        assert!(allocate(&[], "a").unwrap().is_empty());
    }

    #[test]
    fn single_element_gets_one_symbol() {
        assert_eq!(labels(&allocate(&elements(1), "asdf").unwrap()), vec!["a"]);
        assert_eq!(labels(&allocate(&elements(1), "z").unwrap()), vec!["z"]);
    }

    #[test]
    fn single_element_ignores_repeated_symbols() {
        assert_eq!(labels(&allocate(&elements(1), "aa").unwrap()), vec!["a"]);
        assert!(allocate(&elements(2), "aa").is_err());
    }

    #[test]
    fn two_symbols_three_elements() {
        let map = allocate(&elements(3), "ab").unwrap();
        assert_eq!(labels(&map), vec!["aa", "ab", "ba"]);
    }

    #[test]
    fn three_symbols_four_elements() {
        let map = allocate(&elements(4), "abc").unwrap();
        assert_eq!(labels(&map), vec!["aa", "ab", "ac", "ba"]);
    }

    #[test]
    fn labels_follow_alphabet_order_not_char_order() {
        let map = allocate(&elements(3), "ba").unwrap();
        assert_eq!(labels(&map), vec!["bb", "ba", "ab"]);
    }

    #[test]
    fn counts_up_to_alphabet_size_use_length_one() {
        let map = allocate(&elements(4), "asdf").unwrap();
        assert_eq!(labels(&map), vec!["a", "s", "d", "f"]);
    }

    #[test]
    fn exact_power_does_not_grow_length() {
        let map = allocate(&elements(9), "abc").unwrap();
        assert!(map.labels().all(|l| l.chars().count() == 2));
        let map = allocate(&elements(10), "abc").unwrap();
        assert!(map.labels().all(|l| l.chars().count() == 3));
    }

    #[test]
    fn labels_are_unique_and_fixed_length() {
        for alphabet in ["ab", "abc", "asdfghjkl", "asdfgqwertzxcvbhjklyuiopnm"] {
            let a = alphabet.chars().count();
            for n in [0usize, 1, 2, 5, 26, 27, 100, 677] {
                let map = allocate(&elements(n), alphabet).unwrap();
                assert_eq!(map.len(), n);
                let unique: HashSet<&str> = map.labels().collect();
                assert_eq!(unique.len(), n);
                let expected_len = if n <= a { 1 } else { label_length(n, a) };
                assert!(map.labels().all(|l| l.chars().count() == expected_len));
            }
        }
    }

    #[test]
    fn allocation_is_deterministic() {
        let els = elements(50);
        assert_eq!(allocate(&els, "asdf").unwrap(), allocate(&els, "asdf").unwrap());
    }

    #[test]
    fn elements_keep_discovery_order() {
        let els = elements(5);
        let map = allocate(&els, "ab").unwrap();
        let assigned: Vec<ActionableElement> = map.iter().map(|(_, e)| *e).collect();
        assert_eq!(assigned, els);
    }

    #[test]
    fn lookup_and_prefix() {
        let els = elements(3);
        let map = allocate(&els, "ab").unwrap();
        assert_eq!(map.get("ab"), Some(&els[1]));
        assert_eq!(map.get("bb"), None);
        assert_eq!(map.with_prefix("a").count(), 2);
        assert!(map.has_prefix("b"));
        assert!(!map.has_prefix("bb"));
    }

    #[test]
    fn one_symbol_alphabet_rejects_many_elements() {
        assert_eq!(
            allocate(&elements(2), "a"),
            Err(HintError::AlphabetTooSmall {
                symbols: 1,
                elements: 2
            })
        );
    }

    #[test]
    fn empty_alphabet_rejects_any_element() {
        assert!(matches!(
            allocate(&elements(1), ""),
            Err(HintError::AlphabetTooSmall { .. })
        ));
    }

    #[test]
    fn duplicate_symbols_rejected() {
        assert_eq!(
            allocate(&elements(3), "aba"),
            Err(HintError::DuplicateSymbol('a'))
        );
    }

    #[test]
    fn label_length_values() {
        assert_eq!(label_length(0, 2), 1);
        assert_eq!(label_length(1, 2), 1);
        assert_eq!(label_length(2, 2), 1);
        assert_eq!(label_length(3, 2), 2);
        assert_eq!(label_length(4, 3), 2);
        assert_eq!(label_length(27, 26), 2);
        assert_eq!(label_length(677, 26), 3);
    }
}
