//! Sort and uniqueness contracts declared by patterns and query nodes.
//!
//! A contract is declared, not checked: every operator derives its own from
//! the contracts of its children, and the compiler inserts sorting or
//! deduplicating wrappers wherever a parent needs more than a child declares.

use serde::{Deserialize, Serialize};

/// Ordering key for sorted hit streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// By start, then end.
    StartPoint,
    /// By end, then start.
    EndPoint,
}

/// What a hit stream promises about each document's hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guarantees {
    /// Starts are non-decreasing.
    pub start_sorted: bool,
    /// Ends are non-decreasing.
    pub end_sorted: bool,
    /// No two hits share a start.
    pub unique_start: bool,
    /// No two hits share an end.
    pub unique_end: bool,
    /// No two hits share both start and end.
    pub unique: bool,
    pub length_min: u32,
    /// `None` means unbounded.
    pub length_max: Option<u32>,
}

impl Guarantees {
    /// Single-token hits straight from postings.
    pub const TERM: Guarantees = Guarantees {
        start_sorted: true,
        end_sorted: true,
        unique_start: true,
        unique_end: true,
        unique: true,
        length_min: 1,
        length_max: Some(1),
    };

    /// No promises at all beyond the given length range.
    pub fn unordered(length_min: u32, length_max: Option<u32>) -> Self {
        Self {
            start_sorted: false,
            end_sorted: false,
            unique_start: false,
            unique_end: false,
            unique: false,
            length_min,
            length_max,
        }
    }

    /// True when every hit has the same length.
    pub fn fixed_length(&self) -> bool {
        self.length_max == Some(self.length_min)
    }

    pub fn produces_single_tokens(&self) -> bool {
        self.fixed_length() && self.length_min == 1
    }

    pub fn is_sorted(&self, order: SortOrder) -> bool {
        match order {
            SortOrder::StartPoint => self.start_sorted,
            SortOrder::EndPoint => self.end_sorted,
        }
    }

    /// The contract of a stream after being sorted by `order` (and optionally deduplicated).
    pub fn sorted(&self, order: SortOrder, dedup: bool) -> Self {
        let fixed = self.fixed_length();
        let mut g = *self;
        match order {
            SortOrder::StartPoint => {
                g.start_sorted = true;
                g.end_sorted = fixed;
            }
            SortOrder::EndPoint => {
                g.end_sorted = true;
                g.start_sorted = fixed;
            }
        }
        g.unique = self.unique || dedup;
        g
    }
}

impl Guarantees {
    /// Contract of a sequence join whose left side is end-sorted and right side start-sorted.
    pub fn sequence(left: &Guarantees, right: &Guarantees) -> Guarantees {
        Guarantees {
            start_sorted: left.start_sorted,
            end_sorted: right.fixed_length(),
            unique_start: left.unique_start && left.unique_end && right.unique_start,
            unique_end: left.unique_end && right.unique_start && right.unique_end,
            unique: (left.unique_start && right.unique) || (right.unique_end && left.unique),
            length_min: left.length_min.saturating_add(right.length_min),
            length_max: add_max(left.length_max, right.length_max),
        }
    }

    /// Contract of an expansion of a child stream.
    pub fn expansion(child: &Guarantees, left: bool, min: u32, max: Option<u32>) -> Guarantees {
        let exact = max == Some(min);
        let same_side_unique = if left { child.unique_end } else { child.unique_start };
        Guarantees {
            start_sorted: child.start_sorted && (!left || exact),
            end_sorted: child.end_sorted && (left || exact),
            unique_start: child.unique_start && exact,
            unique_end: child.unique_end && exact,
            unique: child.unique && (exact || same_side_unique),
            length_min: child.length_min.saturating_add(min),
            length_max: add_max(child.length_max, max),
        }
    }

    /// Contract of a start-sorted merge of start-sorted children.
    pub fn union(children: &[Guarantees]) -> Guarantees {
        if let [only] = children {
            return *only;
        }
        let length_min = children.iter().map(|g| g.length_min).min().unwrap_or(0);
        let length_max = children
            .iter()
            .map(|g| g.length_max)
            .try_fold(0u32, |acc, m| m.map(|m| acc.max(m)));
        Guarantees {
            start_sorted: true,
            end_sorted: children.iter().all(|g| g.fixed_length() && g.length_min == length_min),
            unique_start: false,
            unique_end: false,
            unique: false,
            length_min,
            length_max,
        }
    }

    /// Contract of the intersection of start-sorted, unique children.
    pub fn intersection(children: &[Guarantees]) -> Guarantees {
        let length_min = children.iter().map(|g| g.length_min).max().unwrap_or(0);
        let length_max = children.iter().filter_map(|g| g.length_max).min();
        Guarantees {
            start_sorted: true,
            end_sorted: children.iter().any(|g| g.end_sorted),
            unique_start: children.iter().any(|g| g.unique_start),
            unique_end: children.iter().any(|g| g.unique_end),
            unique: true,
            length_min,
            length_max,
        }
    }
}

/// Add two maxima where `None` is infinity.
pub fn add_max(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        _ => None,
    }
}

/// Multiply two maxima where `None` is infinity.
pub fn mul_max(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(0), _) | (_, Some(0)) => Some(0),
        (Some(a), Some(b)) => Some(a.saturating_mul(b)),
        _ => None,
    }
}

/// Render a maximum for diagnostics.
pub fn max_to_string(max: Option<u32>) -> String {
    match max {
        Some(m) => m.to_string(),
        None => "INF".to_string(),
    }
}
