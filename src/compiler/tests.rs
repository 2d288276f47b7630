use std::collections::{BTreeSet, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::data::document::Document;
use crate::index::memory::MemoryIndex;
use crate::index::{DocId, PositionalIndex};
use crate::pattern::constraint::{CompareOp, ConstraintExpr, ConstraintValue};
use crate::pattern::RelationDirection;
use crate::rewrite::rewrite;
use crate::spans::testing::{collect_hits, spans_in};
use crate::types::guarantees::Guarantees;
use crate::types::RelationSpanMode;

fn t(v: &str) -> Pattern {
    Pattern::term(v)
}

fn plan(pattern: &Pattern) -> String {
    compile(pattern, &CompileOptions::default()).unwrap().root().to_string()
}

fn node_guarantees(pattern: &Pattern) -> Guarantees {
    PlanCompiler::new(CompileOptions::default()).compile_pattern(pattern).unwrap().guarantees()
}

#[test]
fn test_node_contracts_follow_pattern_contracts() {
    let patterns = vec![
        t("a"),
        Pattern::any(2, Some(3)),
        Pattern::expand(t("a"), Direction::Right, 1, Some(2)),
        Pattern::expand(t("a"), Direction::Left, 0, None),
        Pattern::rep(t("a"), 2, None),
        Pattern::rep(t("a"), 3, Some(3)),
        Pattern::seq(vec![t("a"), t("b"), t("c")]),
        Pattern::seq(vec![Pattern::element("s"), t("a")]),
        Pattern::element("s"),
        Pattern::or(vec![t("a"), Pattern::seq(vec![t("b"), t("c")])]),
        Pattern::and(vec![t("a"), t("b")]),
        Pattern::ngrams(t("a"), FilterOp::Containing, 1, Some(3)),
        Pattern::position_filter(Pattern::element("s"), t("a"), FilterOp::Containing),
        Pattern::relation("nsubj", RelationDirection::Both, RelationSpanMode::Target),
    ];
    for p in patterns {
        assert_eq!(node_guarantees(&p), p.guarantees(), "contract of {:?}", p);
    }
}

#[test]
fn test_sorting_only_where_needed() {
    assert_eq!(plan(&Pattern::seq(vec![t("a"), t("b")])), "SEQ_SIMPLE(TERM(word:a, i), TERM(word:b, i))");
    assert_eq!(
        plan(&Pattern::seq(vec![Pattern::expand(t("a"), Direction::Right, 1, Some(2)), t("b")])),
        "SORT(SEQ(SORT(EXPAND(TERM(word:a, i), R, 1, 2), END), TERM(word:b, i)), START, DEDUP)"
    );
    assert_eq!(plan(&Pattern::rep(t("a"), 2, None)), "REP(TERM(word:a, i), 2, INF)");
}

#[test]
fn test_bounded_repetition_is_a_union_of_chains() {
    let compiled = plan(&Pattern::rep(t("a"), 1, Some(2)));
    assert!(compiled.starts_with("SORT(OR(TERM(word:a, i), SEQ_SIMPLE(TERM(word:a, i), TERM(word:a, i)))"));
    assert_eq!(
        plan(&Pattern::rep(t("a"), 2, Some(2))),
        "SEQ_SIMPLE(TERM(word:a, i), TERM(word:a, i))"
    );
}

#[test]
fn test_default_sensitivity() {
    let options = CompileOptions { default_sensitive: true, ..CompileOptions::default() };
    let compiled = compile(&t("a"), &options).unwrap();
    assert_eq!(compiled.root().to_string(), "TERM(word:a, s)");
    let compiled = compile(&t("a").sensitive(Sensitivity::Insensitive), &options);
    assert!(matches!(compiled, Err(PatternError::NotRewritten("sensitivity"))));
}

#[test]
fn test_regex_markers_and_anchors() {
    assert_eq!(plan(&Pattern::regex("(?-i)^ab.*$")), "REGEX(word:ab.*, s)");
    assert!(matches!(compile(&Pattern::regex("a("), &CompileOptions::default()), Err(PatternError::InvalidRegex { .. })));
}

#[test]
fn test_tags_and_negations() {
    assert_eq!(
        plan(&Pattern::tag_with_attrs("s", &[("type", "q")], TagKind::Element)),
        "POSFILTER(TAGS(s), ATTR(type=q), STARTS_AT)"
    );
    assert_eq!(
        plan(&Pattern::tag("s", TagKind::End)),
        "SORT(EDGE(SORT(TAGS(s), END), R), START, DEDUP)"
    );
    assert_eq!(
        plan(&Pattern::and_not(vec![t("a")], vec![t("b")])),
        "POSFILTER(TERM(word:a, i), TERM(word:b, i), NOTMATCHES)"
    );
}

#[test]
fn test_capture_slots() {
    let p = Pattern::capture(Pattern::seq(vec![Pattern::capture(t("a"), "x"), t("b")]), "y");
    let compiled = compile(&p, &CompileOptions::default()).unwrap();
    assert_eq!(compiled.captures().names(), ["y".to_string(), "x".to_string()]);
    assert_eq!(compiled.captures().slot("x"), Some(1));
    assert!(compiled.root().to_string().contains("CAPTURE(TERM(word:a, i), x#1)"));

    let expr = ConstraintExpr::compare(ConstraintValue::Start("z".to_string()), CompareOp::Eq, ConstraintValue::Int(0));
    let p = Pattern::constrained(Pattern::capture(t("a"), "x"), expr);
    assert!(matches!(compile(&p, &CompileOptions::default()), Err(PatternError::UnknownCapture(name)) if name == "z"));
}

#[test]
fn test_relation_capture_slots() {
    let p = Pattern::seq(vec![
        Pattern::capture(t("a"), "x"),
        Pattern::captured_relation("nsubj|obj", RelationDirection::Both, RelationSpanMode::Source, "r"),
    ]);
    let compiled = compile(&p, &CompileOptions::default()).unwrap();
    assert_eq!(compiled.captures().names(), ["x", "r", "r:source", "r:target"]);
    let root = compiled.root().to_string();
    assert!(root.contains("REL(nsubj|obj, BOTH, SOURCE, r#1)"), "{}", root);

    assert_eq!(
        plan(&Pattern::relation("root", RelationDirection::Root, RelationSpanMode::Target)),
        "REL(root, ROOT, TARGET)"
    );
    assert_eq!(
        plan(&Pattern::captured_relation("root", RelationDirection::Root, RelationSpanMode::Target, "r")),
        "SORT(REL(root, ROOT, TARGET, r#0), START, DEDUP)"
    );
}

/// Random corpus: tokens of a small vocabulary, sentences partitioning each
/// document, two segments and a few deleted documents. Keeps the tokens of
/// each live document, per segment.
struct Fixture {
    index: MemoryIndex,
    live: Vec<Vec<Option<Vec<String>>>>,
}

fn random_fixture(seed: u64) -> Fixture {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = MemoryIndex::builder();
    let mut live = vec![Vec::new()];
    for i in 0..24 {
        if i == 12 {
            builder.commit_segment();
            live.push(Vec::new());
        }
        let len = rng.gen_range(1..=9u32);
        let words: Vec<String> = (0..len).map(|_| ["a", "b", "c"][rng.gen_range(0..3)].to_string()).collect();
        let mut doc = Document::from_words(&format!("d{}", i), &words.join(" "));
        let mut start = 0;
        while start < len {
            let end = rng.gen_range(start + 1..=len);
            doc = doc.with_tag("s", start, end);
            start = end;
        }
        if len > 2 && rng.gen_bool(0.5) {
            doc = doc.with_tag_attrs("np", 0, 2, &[("type", "x")]);
        }
        let id = builder.add_document(&doc);
        let segment = live.last_mut().unwrap();
        if i % 7 == 3 {
            builder.delete_document(id);
            segment.push(None);
        } else {
            segment.push(Some(words));
        }
    }
    Fixture { index: builder.build(), live }
}

fn all_nodes(node: &NodeRef) -> Vec<NodeRef> {
    let mut out = vec![node.clone()];
    for child in node.children() {
        out.extend(all_nodes(child));
    }
    out
}

fn check_contract(name: &str, g: &Guarantees, hits: &[(DocId, u32, u32)]) {
    for w in hits.windows(2) {
        assert!(w[0].0 <= w[1].0, "{}: documents out of order", name);
    }
    let docs: BTreeSet<DocId> = hits.iter().map(|h| h.0).collect();
    for doc in docs {
        let spans = spans_in(hits, doc);
        for w in spans.windows(2) {
            if g.start_sorted {
                assert!(w[0].0 <= w[1].0, "{}: starts out of order in doc {}: {:?}", name, doc, spans);
            }
            if g.end_sorted {
                assert!(w[0].1 <= w[1].1, "{}: ends out of order in doc {}: {:?}", name, doc, spans);
            }
        }
        if g.unique {
            let distinct: HashSet<(u32, u32)> = spans.iter().copied().collect();
            assert_eq!(distinct.len(), spans.len(), "{}: duplicate hits in doc {}: {:?}", name, doc, spans);
        }
        if g.unique_start {
            let starts: HashSet<u32> = spans.iter().map(|s| s.0).collect();
            assert_eq!(starts.len(), spans.len(), "{}: shared starts in doc {}: {:?}", name, doc, spans);
        }
        if g.unique_end {
            let ends: HashSet<u32> = spans.iter().map(|s| s.1).collect();
            assert_eq!(ends.len(), spans.len(), "{}: shared ends in doc {}: {:?}", name, doc, spans);
        }
        for &(start, end) in &spans {
            let len = end - start;
            assert!(len >= g.length_min, "{}: hit ({}, {}) shorter than {}", name, start, end, g.length_min);
            if let Some(max) = g.length_max {
                assert!(len <= max, "{}: hit ({}, {}) longer than {}", name, start, end, max);
            }
        }
    }
}

fn contract_patterns() -> Vec<Pattern> {
    let opt = |p: Pattern| Pattern::rep(p, 0, Some(1));
    let constraint = ConstraintExpr::compare(
        ConstraintValue::End("x".to_string()),
        CompareOp::Le,
        ConstraintValue::Start("y".to_string()),
    );
    vec![
        Pattern::seq(vec![t("a"), t("b")]),
        Pattern::seq(vec![t("a"), Pattern::any(1, Some(2)), t("b")]),
        Pattern::seq(vec![t("a"), Pattern::rep(t("b"), 1, None)]),
        Pattern::rep(Pattern::or(vec![t("a"), t("b")]), 2, Some(3)),
        Pattern::seq(vec![t("b"), Pattern::not(t("a"))]),
        Pattern::seq(vec![Pattern::not(t("a")), t("b"), t("c")]),
        Pattern::seq(vec![t("a"), Pattern::rep(Pattern::not(t("b")), 1, Some(3)), t("c")]),
        Pattern::and(vec![t("a"), Pattern::not(t("b"))]),
        Pattern::and(vec![
            Pattern::seq(vec![t("a"), t("b")]),
            Pattern::seq(vec![t("a"), Pattern::any(1, Some(1))]),
        ]),
        Pattern::or(vec![t("a"), Pattern::seq(vec![t("b"), t("c")])]),
        Pattern::seq(vec![Pattern::tag("s", TagKind::Start), t("a")]),
        Pattern::seq(vec![t("a"), Pattern::tag("s", TagKind::End)]),
        Pattern::seq(vec![
            Pattern::tag("s", TagKind::Start),
            t("a"),
            Pattern::any(0, None),
            Pattern::tag("s", TagKind::End),
        ]),
        Pattern::position_filter(Pattern::element("s"), Pattern::seq(vec![t("a"), t("b")]), FilterOp::Containing),
        Pattern::position_filter(Pattern::any(1, Some(3)), t("a"), FilterOp::Containing),
        Pattern::position_filter(Pattern::element("s"), t("c"), FilterOp::Within),
        Pattern::expand(Pattern::seq(vec![t("a"), t("b")]), Direction::Right, 1, None),
        Pattern::expand(t("a"), Direction::Left, 0, Some(2)),
        Pattern::seq(vec![opt(t("a")), t("b"), opt(t("c"))]),
        Pattern::seq(vec![Pattern::element("s"), Pattern::element("s")]),
        Pattern::tag_with_attrs("np", &[("type", "x")], TagKind::Element),
        Pattern::constrained(
            Pattern::seq(vec![
                Pattern::capture(t("a"), "x"),
                Pattern::any(0, Some(3)),
                Pattern::capture(t("b"), "y"),
            ]),
            constraint,
        ),
    ]
}

#[test]
fn test_every_node_keeps_its_contract() {
    let fixture = random_fixture(7);
    for pattern in contract_patterns() {
        let rewritten = rewrite(&pattern).unwrap();
        let compiled = compile(&rewritten, &CompileOptions::default()).unwrap();
        for node in all_nodes(compiled.root()) {
            let name = node.to_string();
            let g = node.guarantees();
            for ord in 0..fixture.index.num_segments() {
                let segment = fixture.index.segment(ord).unwrap();
                let ctx = CursorContext::new(segment.as_ref(), compiled.captures().len());
                if let Some(mut cursor) = node.create_cursor(&ctx).unwrap() {
                    let hits = collect_hits(&mut cursor);
                    check_contract(&name, &g, &hits);
                };
            }
        }
    }
}

type SpanSet = BTreeSet<(u32, u32)>;

fn join(left: &SpanSet, right: &SpanSet) -> SpanSet {
    let mut out = SpanSet::new();
    for &(s, m) in left {
        for &(m2, e) in right {
            if m == m2 {
                out.insert((s, e));
            }
        }
    }
    out
}

/// Exhaustive matcher over one document's tokens, empty matches included
fn naive(p: &Pattern, tokens: &[String]) -> SpanSet {
    let n = tokens.len() as u32;
    match p {
        Pattern::Term { value, .. } => {
            (0..n).filter(|&i| tokens[i as usize].eq_ignore_ascii_case(value)).map(|i| (i, i + 1)).collect()
        }
        Pattern::Not(inner) => {
            let covered = naive(inner, tokens);
            (0..n).filter(|&i| !covered.contains(&(i, i + 1))).map(|i| (i, i + 1)).collect()
        }
        Pattern::AnyToken { min, max } => {
            let mut out = SpanSet::new();
            for s in 0..=n {
                for e in s..=n {
                    let len = e - s;
                    if len >= *min && max.map_or(true, |m| len <= m) {
                        out.insert((s, e));
                    }
                }
            }
            out
        }
        Pattern::Sequence(clauses) => {
            let mut parts = clauses.iter().map(|c| naive(c, tokens));
            let first = parts.next().unwrap_or_default();
            parts.fold(first, |left, right| join(&left, &right))
        }
        Pattern::Or(clauses) => clauses.iter().flat_map(|c| naive(c, tokens)).collect(),
        Pattern::Repetition { clause, min, max } => {
            let once = naive(clause, tokens);
            let mut out = SpanSet::new();
            if *min == 0 {
                out.extend((0..=n).map(|p| (p, p)));
            }
            let mut current = once.clone();
            let mut k = 1;
            while max.map_or(true, |m| k <= m) && k <= n + 1 && !current.is_empty() {
                if k >= *min {
                    out.extend(current.iter().copied());
                }
                current = join(&current, &once);
                k += 1;
            }
            out
        }
        other => panic!("no exhaustive matcher for {}", other.kind_name()),
    }
}

fn random_leaf(rng: &mut StdRng) -> Pattern {
    let word = ["a", "b", "c"][rng.gen_range(0..3)];
    match rng.gen_range(0..6) {
        0 | 1 | 2 => t(word),
        3 => {
            let min = rng.gen_range(0..2);
            Pattern::any(min, Some(min.max(1) + rng.gen_range(0..2)))
        }
        _ => Pattern::not(t(word)),
    }
}

fn random_pattern(rng: &mut StdRng, depth: u32) -> Pattern {
    if depth == 0 || rng.gen_bool(0.3) {
        return random_leaf(rng);
    }
    match rng.gen_range(0..3) {
        0 => {
            let n = rng.gen_range(2..=3);
            Pattern::seq((0..n).map(|_| random_pattern(rng, depth - 1)).collect())
        }
        1 => Pattern::or(vec![random_pattern(rng, depth - 1), random_pattern(rng, depth - 1)]),
        _ => {
            let min = rng.gen_range(0..3);
            let max = if rng.gen_bool(0.2) { None } else { Some(min.max(1) + rng.gen_range(0..2)) };
            Pattern::rep(random_pattern(rng, depth - 1), min, max)
        }
    }
}

fn assert_plans_match(fixture_seed: u64, pattern_seed: u64, count: usize, depth: u32) {
    let fixture = random_fixture(fixture_seed);
    let mut rng = StdRng::seed_from_u64(pattern_seed);
    for _ in 0..count {
        let pattern = random_pattern(&mut rng, depth);
        let rewritten = rewrite(&pattern).unwrap();
        let compiled = compile(&rewritten, &CompileOptions::default()).unwrap();
        for (ord, docs) in fixture.live.iter().enumerate() {
            let segment = fixture.index.segment(ord).unwrap();
            let hits = match compiled.create_cursor(segment.as_ref()).unwrap() {
                Some(mut cursor) => collect_hits(&mut cursor),
                None => Vec::new(),
            };
            for (doc, tokens) in docs.iter().enumerate() {
                let doc = doc as DocId;
                let mut found = spans_in(&hits, doc);
                found.sort_unstable();
                let expected: Vec<(u32, u32)> = match tokens {
                    Some(tokens) => naive(&pattern, tokens).into_iter().filter(|(s, e)| s < e).collect(),
                    None => Vec::new(),
                };
                assert_eq!(
                    found, expected,
                    "pattern {:?} rewritten to {:?} in segment {} doc {}",
                    pattern, rewritten, ord, doc
                );
            }
        }
    }
}

#[test]
fn test_plans_match_exhaustive_search() {
    assert_plans_match(11, 2024, 150, 3);
}

#[test]
fn test_deep_plans_match_exhaustive_search() {
    for seed in 0..12 {
        assert_plans_match(seed, 100 + seed, 40, 4);
    }
}
