use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::index::DocId;
use crate::types::{NamedCapture, Span};

/// One match: a token interval of a document plus its capture bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    /// Ordinal of the segment the document lives in
    pub segment: usize,
    /// Segment-local document id
    pub doc: DocId,
    pub span: Span,
    /// Capture bindings by slot, in the order of [`HitList::capture_names`]
    pub captures: Vec<Option<Span>>,
}

impl Hit {
    pub fn start(&self) -> u32 {
        self.span.start
    }

    pub fn end(&self) -> u32 {
        self.span.end
    }
}

/// Hits of one query in (segment, doc, start, end) order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HitList {
    pub capture_names: Vec<String>,
    pub hits: Vec<Hit>,
}

impl HitList {
    pub fn new(capture_names: Vec<String>, hits: Vec<Hit>) -> Self {
        Self { capture_names, hits }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }

    /// Interval bound to capture `name` for `hit`, if the capture matched
    pub fn capture_value(&self, hit: &Hit, name: &str) -> Option<Span> {
        let slot = self.capture_names.iter().position(|n| n == name)?;
        hit.captures.get(slot).copied().flatten()
    }

    /// Bound captures of `hit` with their names
    pub fn named_captures(&self, hit: &Hit) -> Vec<NamedCapture> {
        self.capture_names
            .iter()
            .zip(&hit.captures)
            .filter_map(|(name, span)| span.map(|span| NamedCapture::new(name.clone(), span)))
            .collect()
    }

    /// Number of distinct documents with at least one hit
    pub fn doc_count(&self) -> usize {
        let mut count = 0;
        let mut last = None;
        for hit in &self.hits {
            let key = (hit.segment, hit.doc);
            if last != Some(key) {
                count += 1;
                last = Some(key);
            }
        }
        count
    }

    /// Reproducible random subset of at most `size` hits, kept in list order
    pub fn sample(&self, size: usize, seed: u64) -> HitList {
        let size = size.min(self.hits.len());
        let mut rng = StdRng::seed_from_u64(seed);
        let mut picked = sample(&mut rng, self.hits.len(), size).into_vec();
        picked.sort_unstable();
        log::debug!("Sampled {} of {} hits with seed {}", size, self.hits.len(), seed);
        HitList {
            capture_names: self.capture_names.clone(),
            hits: picked.into_iter().map(|i| self.hits[i].clone()).collect(),
        }
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    /// JSON with a custom indentation width
    pub fn to_json_with_indent(&self, indent: usize) -> String {
        let indent_str = " ".repeat(indent);
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent_str.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        match self.serialize(&mut serializer) {
            Ok(()) => String::from_utf8(buffer).unwrap_or_else(|_| format!("{:?}", self)),
            Err(_) => format!("{:?}", self),
        }
    }
}

impl<'a> IntoIterator for &'a HitList {
    type Item = &'a Hit;
    type IntoIter = std::slice::Iter<'a, Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}
