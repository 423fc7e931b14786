/// Chronological log of distinct counter values for one session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<i64>,
}

impl History {
    pub fn seeded(initial: i64) -> Self {
        Self {
            entries: vec![initial],
        }
    }

    /// Append `value` unless it repeats the last entry. Returns whether it was
    /// appended.
    pub fn record(&mut self, value: i64) -> bool {
        if self.entries.last() == Some(&value) {
            return false;
        }
        self.entries.push(value);
        true
    }

    /// Empty the log. Deliberately not reseeded with the post-reset count.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[i64] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppresses_consecutive_duplicates() {
        let mut h = History::seeded(0);
        assert!(!h.record(0));
        assert!(h.record(1));
        assert!(!h.record(1));
        assert!(h.record(0));
        assert_eq!(h.entries(), &[0, 1, 0]);
    }

    #[test]
    fn never_holds_adjacent_equal_entries() {
        let mut h = History::seeded(2);
        let mut distinct_transitions = 0;
        let mut last = 2;
        for v in [2, 3, 3, 3, 4, 4, 2, 2, 2, 5] {
            if v != last {
                distinct_transitions += 1;
                last = v;
            }
            h.record(v);
        }
        assert!(h.entries().windows(2).all(|w| w[0] != w[1]));
        assert!(h.entries().len() <= distinct_transitions + 1);
    }

    #[test]
    fn clear_restarts_from_empty() {
        let mut h = History::seeded(7);
        h.record(8);
        h.clear();
        assert!(h.entries().is_empty());
        assert!(h.record(0));
        assert_eq!(h.entries(), &[0]);
    }
}
