//! Piecewise position tables (`10->5|20->8`).

use std::fmt;

/// Sorted `generated -> original` breakpoints.
///
/// Each pair marks the start of a contiguous region in which generated and original
/// positions advance together with slope 1.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PositionTable {
    pairs: Vec<(usize, usize)>,
}

impl PositionTable {
    pub fn new(pairs: Vec<(usize, usize)>) -> Self {
        Self { pairs }
    }

    /// Parse a `|`-separated list of `int->int` pairs.
    ///
    /// Returns `None` if any pair is malformed. Empty segments are ignored, so an
    /// empty string yields an empty table.
    pub fn parse(value: &str) -> Option<Self> {
        let mut pairs = Vec::new();
        for segment in value.split('|') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (generated, original) = segment.split_once("->")?;
            pairs.push((
                generated.trim().parse().ok()?,
                original.trim().parse().ok()?,
            ));
        }
        Some(Self { pairs })
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Map a generated position to its original position.
    ///
    /// Positions before the first region map to 0. Positions past the last breakpoint
    /// extrapolate from it. An empty table maps nothing.
    pub fn map(&self, generated: usize) -> Option<usize> {
        let &(last_generated, last_original) = self.pairs.last()?;

        match self.pairs.iter().position(|&(g, _)| g > generated) {
            None => Some(last_original + (generated - last_generated)),
            Some(0) => Some(0),
            Some(index) => {
                let (g, o) = self.pairs[index - 1];
                Some(o + (generated - g))
            }
        }
    }
}

impl fmt::Display for PositionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (generated, original)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{generated}->{original}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_inside_region() {
        let table = PositionTable::parse("10->5|20->8").unwrap();
        assert_eq!(table.map(15), Some(10));
        assert_eq!(table.map(10), Some(5));
        assert_eq!(table.map(20), Some(8));
    }

    #[test]
    fn test_map_beyond_last_entry() {
        let table = PositionTable::parse("10->5|20->8").unwrap();
        assert_eq!(table.map(25), Some(13));
    }

    #[test]
    fn test_map_before_first_entry() {
        let table = PositionTable::parse("10->5|20->8").unwrap();
        assert_eq!(table.map(3), Some(0));
    }

    #[test]
    fn test_empty_table_maps_nothing() {
        let table = PositionTable::parse("").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.map(7), None);
    }

    #[test]
    fn test_parse_rejects_malformed_pairs() {
        assert!(PositionTable::parse("10->5|oops").is_none());
        assert!(PositionTable::parse("10->x").is_none());
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let table = PositionTable::parse(" 1 -> 2 | 3->4 |").unwrap();
        assert_eq!(table.pairs(), &[(1, 2), (3, 4)]);
        assert_eq!(table.to_string(), "1->2|3->4");
    }
}
