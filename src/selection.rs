//! Parsing of range selections such as `"1-5,10,15-20"` into a set of
//! 1-based result indices.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};

/// A validated set of 1-based indices into a displayed result list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    indices: BTreeSet<usize>,
}

impl SelectionSet {
    /// Parses `spec` against a list of `max_index` entries.
    ///
    /// Tokens are comma separated and are either a single index or an
    /// inclusive `a-b` range with `a <= b`. Parsing is all-or-nothing: the
    /// first bad token fails the whole call.
    pub fn parse(spec: &str, max_index: usize) -> Result<Self> {
        let mut indices = BTreeSet::new();

        for raw in spec.split(',') {
            let token = raw.trim();
            if token.is_empty() {
                continue;
            }

            match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_index(start, token, max_index)?;
                    let end = parse_index(end, token, max_index)?;
                    if start > end {
                        return Err(Error::invalid_selection(
                            token,
                            "range start is greater than its end",
                        ));
                    }
                    indices.extend(start..=end);
                }
                None => {
                    indices.insert(parse_index(token, token, max_index)?);
                }
            }
        }

        Ok(Self { indices })
    }

    /// Selects every index from 1 to `max_index`.
    pub fn all(max_index: usize) -> Self {
        Self {
            indices: (1..=max_index).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }
}

impl fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.indices.iter().map(|i| i.to_string()).collect();
        write!(f, "{{{}}}", parts.join(","))
    }
}

/// Shorthand for [`SelectionSet::parse`].
pub fn parse(spec: &str, max_index: usize) -> Result<SelectionSet> {
    SelectionSet::parse(spec, max_index)
}

fn parse_index(part: &str, token: &str, max_index: usize) -> Result<usize> {
    let part = part.trim();
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_selection(token, "not a number or range"));
    }

    let index: usize = part
        .parse()
        .map_err(|_| Error::invalid_selection(token, "number is too large"))?;

    if index == 0 || index > max_index {
        return Err(Error::invalid_selection(token, "index is out of range"));
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(set: &SelectionSet) -> Vec<usize> {
        set.iter().collect()
    }

    fn rejected_token(result: Result<SelectionSet>) -> String {
        match result {
            Err(Error::InvalidSelection { token, .. }) => token,
            other => panic!("expected InvalidSelection, got {:?}", other),
        }
    }

    #[test]
    fn ranges_and_singles_combine() {
        let set = parse("1-3,5", 10).unwrap();
        assert_eq!(indices(&set), vec![1, 2, 3, 5]);
    }

    #[test]
    fn empty_spec_is_empty_set() {
        assert!(parse("", 10).unwrap().is_empty());
        assert!(parse("   ", 10).unwrap().is_empty());
    }

    #[test]
    fn whitespace_is_ignored() {
        let set = parse(" 2 , 4-6 ", 10).unwrap();
        assert_eq!(indices(&set), vec![2, 4, 5, 6]);

        let set = parse("1 - 2", 10).unwrap();
        assert_eq!(indices(&set), vec![1, 2]);
    }

    #[test]
    fn duplicates_collapse() {
        let set = parse("1-4,3,2-5,5", 10).unwrap();
        assert_eq!(indices(&set), vec![1, 2, 3, 4, 5]);
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn parsing_is_idempotent() {
        for spec in ["1-3,5", " 2 , 4-6 ", "7,1,7", "", "10"] {
            assert_eq!(parse(spec, 10).unwrap(), parse(spec, 10).unwrap());
        }
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert_eq!(rejected_token(parse("5-3", 10)), "5-3");
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert_eq!(rejected_token(parse("11", 10)), "11");
        assert_eq!(rejected_token(parse("0", 10)), "0");
        assert_eq!(rejected_token(parse("8-12", 10)), "8-12");
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(rejected_token(parse("1,abc", 10)), "abc");
        assert_eq!(rejected_token(parse("-3", 10)), "-3");
        assert_eq!(rejected_token(parse("2-", 10)), "2-");
        assert_eq!(rejected_token(parse("1-2-3", 10)), "1-2-3");
        assert_eq!(rejected_token(parse("+4", 10)), "+4");
    }

    #[test]
    fn no_partial_result_on_failure() {
        assert!(parse("1-3,banana,5", 10).is_err());
    }

    #[test]
    fn empty_tokens_are_skipped() {
        let set = parse("1,,3,", 10).unwrap();
        assert_eq!(indices(&set), vec![1, 3]);
    }

    #[test]
    fn nothing_is_valid_against_an_empty_list() {
        assert!(parse("1", 0).is_err());
        assert!(parse("", 0).unwrap().is_empty());
    }

    #[test]
    fn all_selects_every_index() {
        let set = SelectionSet::all(4);
        assert_eq!(indices(&set), vec![1, 2, 3, 4]);
        assert!(set.contains(4));
        assert!(!set.contains(5));
        assert_eq!(set.to_string(), "{1,2,3,4}");
    }
}
