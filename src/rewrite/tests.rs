use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::pattern::{CompareOp, ConstraintExpr, ConstraintValue, Direction, FilterOp, Sensitivity, TagKind};

fn t(v: &str) -> Pattern {
    Pattern::term(v)
}

fn not(v: &str) -> Pattern {
    Pattern::not(t(v))
}

fn opt(p: Pattern) -> Pattern {
    Pattern::rep(p, 0, Some(1))
}

fn rewritten(p: Pattern) -> String {
    rewrite(&p).unwrap().to_string()
}

#[test]
fn test_repetition_folding() {
    assert_eq!(rewrite(&Pattern::seq(vec![t("a"), t("a")])).unwrap(), Pattern::rep(t("a"), 2, Some(2)));
    assert_eq!(
        rewrite(&Pattern::seq(vec![t("a"), Pattern::rep(t("a"), 0, None)])).unwrap(),
        Pattern::rep(t("a"), 1, None)
    );
    assert_eq!(rewritten(Pattern::seq(vec![t("a"), Pattern::rep(t("a"), 1, None)])), "REP(TERM(word:a), 2, INF)");
    assert_eq!(
        rewritten(Pattern::seq(vec![Pattern::rep(t("a"), 1, None), Pattern::rep(t("a"), 1, None)])),
        "REP(TERM(word:a), 2, INF)"
    );
    assert_eq!(rewritten(Pattern::seq(vec![Pattern::rep(t("a"), 0, None), t("a")])), "REP(TERM(word:a), 1, INF)");
    let either = Pattern::or(vec![t("a"), t("b")]);
    assert_eq!(
        rewritten(Pattern::seq(vec![either.clone(), either])),
        "REP(OR(TERM(word:a), TERM(word:b)), 2, 2)"
    );
}

#[test]
fn test_nested_repetitions() {
    assert_eq!(rewritten(Pattern::rep(Pattern::rep(t("a"), 2, Some(3)), 1, Some(1))), "REP(TERM(word:a), 2, 3)");
    assert_eq!(rewritten(Pattern::rep(Pattern::rep(t("a"), 1, Some(1)), 2, Some(3))), "REP(TERM(word:a), 2, 3)");
    assert_eq!(rewritten(Pattern::rep(t("a"), 1, Some(1))), "TERM(word:a)");
    assert_eq!(
        rewritten(Pattern::seq(vec![Pattern::rep(Pattern::rep(t("a"), 0, None), 0, None), t("b")])),
        "OR(SEQ(REP(TERM(word:a), 1, INF), TERM(word:b)), TERM(word:b))"
    );
    assert_eq!(
        rewritten(Pattern::seq(vec![opt(opt(t("a"))), t("b")])),
        "OR(SEQ(TERM(word:a), TERM(word:b)), TERM(word:b))"
    );
}

#[test]
fn test_optional_clauses_become_alternatives() {
    assert_eq!(
        rewritten(Pattern::seq(vec![opt(t("a")), opt(t("b"))])),
        "OR(SEQ(TERM(word:a), TERM(word:b)), TERM(word:b), TERM(word:a))"
    );
    assert_eq!(
        rewritten(Pattern::seq(vec![opt(t("a")), opt(t("a")), t("b")])),
        "OR(SEQ(REP(TERM(word:a), 1, 2), TERM(word:b)), TERM(word:b))"
    );
    // a top-level optional clause keeps only its non-empty matches
    assert_eq!(rewritten(opt(t("a"))), "TERM(word:a)");
}

#[test]
fn test_nested_optional_sequence_can_be_skipped() {
    let inner = Pattern::seq(vec![opt(t("a")), opt(t("b"))]);
    assert_eq!(
        rewritten(Pattern::seq(vec![inner.clone(), t("c")])),
        "OR(SEQ(OR(SEQ(TERM(word:a), TERM(word:b)), TERM(word:b), TERM(word:a)), TERM(word:c)), TERM(word:c))"
    );
    let captured = rewrite(&Pattern::seq(vec![Pattern::capture(inner, "x"), t("c")])).unwrap();
    assert!(matches!(&captured, Pattern::Or(alternatives) if alternatives.contains(&t("c"))));
}

#[test]
fn test_any_tokens_become_expansions() {
    assert_eq!(
        rewritten(Pattern::seq(vec![t("a"), Pattern::any(2, Some(3))])),
        "EXPAND(TERM(word:a), R, 2, 3)"
    );
    assert_eq!(
        rewritten(Pattern::seq(vec![t("a"), Pattern::rep(Pattern::any(2, Some(2)), 3, Some(3))])),
        "EXPAND(TERM(word:a), R, 6, 6)"
    );
    assert_eq!(
        rewritten(Pattern::seq(vec![t("a"), Pattern::any(1, Some(2)), Pattern::any(3, Some(4))])),
        "EXPAND(TERM(word:a), R, 4, 6)"
    );
    assert_eq!(
        rewritten(Pattern::seq(vec![t("a"), t("b"), t("c"), Pattern::any(1, Some(2))])),
        "EXPAND(SEQ(TERM(word:a), TERM(word:b), TERM(word:c)), R, 1, 2)"
    );
    assert_eq!(
        rewritten(Pattern::seq(vec![Pattern::any(1, None), t("a"), t("b")])),
        "EXPAND(SEQ(TERM(word:a), TERM(word:b)), L, 1, INF)"
    );
}

#[test]
fn test_negative_clauses() {
    assert_eq!(
        rewritten(Pattern::seq(vec![t("b"), not("a")])),
        "POSFILTER(EXPAND(TERM(word:b), R, 1, 1), TERM(word:a), NOTCONTAINING, 1, 0)"
    );
    assert_eq!(
        rewritten(Pattern::seq(vec![t("b"), Pattern::rep(not("a"), 2, Some(2))])),
        "POSFILTER(EXPAND(TERM(word:b), R, 2, 2), TERM(word:a), NOTCONTAINING, 1, 0)"
    );
    assert_eq!(
        rewritten(Pattern::seq(vec![t("b"), t("c"), Pattern::rep(not("a"), 2, Some(2))])),
        "POSFILTER(SEQ(TERM(word:b), EXPAND(TERM(word:c), R, 2, 2)), TERM(word:a), NOTCONTAINING, 2, 0)"
    );
    assert_eq!(
        rewritten(Pattern::seq(vec![Pattern::rep(not("a"), 2, Some(2)), t("b"), t("c")])),
        "POSFILTER(SEQ(EXPAND(TERM(word:b), L, 2, 2), TERM(word:c)), TERM(word:a), NOTCONTAINING, 0, -2)"
    );
    assert_eq!(
        rewritten(Pattern::seq(vec![t("a"), Pattern::rep(not("b"), 1, Some(20)), t("c")])),
        "POSFILTER(SEQ(EXPAND(TERM(word:a), R, 1, 20), TERM(word:c)), TERM(word:b), NOTCONTAINING, 1, -1)"
    );
}

#[test]
fn test_optional_negative_clauses() {
    let p = Pattern::seq(vec![opt(not("a")), t("b"), opt(not("c"))]);
    assert_eq!(
        rewritten(p),
        "OR(\
POSFILTER(POSFILTER(EXPAND(EXPAND(TERM(word:b), L, 1, 1), R, 1, 1), TERM(word:c), NOTCONTAINING, 2, 0), TERM(word:a), NOTCONTAINING, 0, -2), \
POSFILTER(EXPAND(TERM(word:b), R, 1, 1), TERM(word:c), NOTCONTAINING, 1, 0), \
POSFILTER(EXPAND(TERM(word:b), L, 1, 1), TERM(word:a), NOTCONTAINING, 0, -1), \
TERM(word:b))"
    );
    let p = Pattern::seq(vec![not("a"), opt(Pattern::regex_in("pos", "V.*"))]);
    assert_eq!(
        rewritten(p),
        "OR(POSFILTER(EXPAND(PREFIX(pos:V), L, 1, 1), TERM(word:a), NOTCONTAINING, 0, -1), NOT(TERM(word:a)))"
    );
}

#[test]
fn test_boolean_rules() {
    assert_eq!(rewritten(Pattern::and(vec![not("a"), not("b")])), "NOT(OR(TERM(word:a), TERM(word:b)))");
    assert_eq!(rewritten(Pattern::or(vec![not("a"), not("b")])), "NOT(AND(TERM(word:a), TERM(word:b)))");
    assert_eq!(rewritten(Pattern::and(vec![t("a"), not("b")])), "ANDNOT([TERM(word:a)], [TERM(word:b)])");
    assert_eq!(
        rewritten(Pattern::and(vec![t("a"), Pattern::and(vec![t("b"), not("c")])])),
        "ANDNOT([TERM(word:a), TERM(word:b)], [TERM(word:c)])"
    );
    assert_eq!(
        rewritten(Pattern::not(Pattern::and(vec![t("a"), not("b")]))),
        "OR(NOT(TERM(word:a)), TERM(word:b))"
    );
    assert_eq!(rewritten(Pattern::not(not("a"))), "TERM(word:a)");
}

#[test]
fn test_tag_pairing() {
    let start = Pattern::tag_with_attrs("s", &[("test", "1")], TagKind::Start);
    let end = Pattern::tag("s", TagKind::End);
    assert_eq!(
        rewritten(Pattern::seq(vec![start.clone(), t("a"), end.clone()])),
        "POSFILTER(TAGS(s, test=1), TERM(word:a), MATCHES)"
    );
    let start = Pattern::tag("s", TagKind::Start);
    let any = Pattern::rep(Pattern::any(1, Some(1)), 0, None);
    assert_eq!(
        rewritten(Pattern::seq(vec![start.clone(), any.clone(), t("a"), any.clone(), end.clone()])),
        "POSFILTER(TAGS(s), TERM(word:a), CONTAINING)"
    );
    assert_eq!(
        rewritten(Pattern::seq(vec![start.clone(), t("a"), t("b"), any, end])),
        "POSFILTER(TAGS(s), SEQ(TERM(word:a), TERM(word:b)), CONTAINING_AT_START)"
    );
    // an unpaired start tag is its leading edge
    assert_eq!(rewritten(Pattern::seq(vec![start, t("a")])), "SEQ(EDGE(TAGS(s), L), TERM(word:a))");
}

#[test]
fn test_ngram_filter() {
    let p = Pattern::position_filter(
        Pattern::any(2, Some(4)),
        Pattern::seq(vec![t("a"), t("b")]),
        FilterOp::Containing,
    );
    assert_eq!(rewritten(p), "FILTERNGRAMS(SEQ(TERM(word:a), TERM(word:b)), CONTAINING, 2, 4)");
}

#[test]
fn test_leaves_and_sensitivity() {
    assert_eq!(rewritten(Pattern::regex("^fox$")), "TERM(word:fox)");
    assert_eq!(rewritten(Pattern::regex("(?i)^Fox.*$")), "PREFIX(word:Fox, i)");
    let p = Pattern::seq(vec![t("a"), Pattern::regex("^b$")]).sensitive(Sensitivity::Sensitive);
    assert_eq!(rewritten(p), "SEQ(TERM(word:a, s), TERM(word:b, s))");
}

#[test]
fn test_validation() {
    assert_eq!(
        rewrite(&Pattern::rep(t("a"), 3, Some(2))),
        Err(PatternError::InvalidRepetition { min: 3, max: 2 })
    );
    assert_eq!(rewrite(&Pattern::any(0, Some(0))), Err(PatternError::ZeroMaximum("any-token")));
    assert_eq!(
        rewrite(&Pattern::expand(t("a"), Direction::Left, 2, Some(1))),
        Err(PatternError::InvalidExpansion { min: 2, max: 1 })
    );
    assert_eq!(rewrite(&Pattern::seq(vec![])), Err(PatternError::EmptyClauses("sequence")));
    assert!(matches!(rewrite(&Pattern::regex("(ab")), Err(PatternError::InvalidRegex { .. })));
    let undeclared = ConstraintExpr::compare(
        ConstraintValue::Start("x".to_string()),
        CompareOp::Lt,
        ConstraintValue::Int(3),
    );
    assert_eq!(
        rewrite(&Pattern::constrained(t("a"), undeclared.clone())),
        Err(PatternError::UnknownCapture("x".to_string()))
    );
    let declared = Pattern::constrained(Pattern::capture(t("a"), "x"), undeclared);
    assert!(rewrite(&declared).is_ok());
}

#[test]
fn test_pass_budget() {
    let p = Pattern::seq(vec![t("a"), t("a")]);
    assert_eq!(rewrite_with_budget(&p, 1), Err(PatternError::RewriteBudgetExceeded(1)));
    assert!(rewrite_with_budget(&p, 2).is_ok());
}

fn random_leaf(rng: &mut StdRng) -> Pattern {
    let words = ["a", "b", "c"];
    match rng.gen_range(0..5) {
        0 | 1 => t(words[rng.gen_range(0..words.len())]),
        2 => Pattern::regex(&format!("^{}.*$", words[rng.gen_range(0..words.len())])),
        3 => {
            let min = rng.gen_range(0..2);
            Pattern::any(min, Some(min + rng.gen_range(1..3)))
        }
        _ => not(words[rng.gen_range(0..words.len())]),
    }
}

fn random_pattern(rng: &mut StdRng, depth: u32) -> Pattern {
    if depth == 0 {
        return random_leaf(rng);
    }
    let child = |rng: &mut StdRng| random_pattern(rng, depth - 1);
    match rng.gen_range(0..9) {
        0 | 1 => {
            let n = rng.gen_range(2..4);
            Pattern::seq((0..n).map(|_| child(rng)).collect())
        }
        2 => {
            let min = rng.gen_range(0..3);
            let max = if rng.gen_bool(0.3) { None } else { Some(min.max(1) + rng.gen_range(0..2)) };
            Pattern::rep(child(rng), min, max)
        }
        3 => Pattern::or(vec![child(rng), child(rng)]),
        4 => Pattern::and(vec![random_leaf(rng), random_leaf(rng)]),
        5 => Pattern::seq(vec![Pattern::tag("s", TagKind::Start), child(rng), Pattern::tag("s", TagKind::End)]),
        6 => {
            let direction = if rng.gen_bool(0.5) { Direction::Left } else { Direction::Right };
            let min = rng.gen_range(0..2);
            Pattern::expand(child(rng), direction, min, Some(min + 1))
        }
        7 => Pattern::capture(child(rng), "c"),
        _ => Pattern::position_filter(Pattern::element("s"), child(rng), FilterOp::Containing),
    }
}

#[test]
fn test_rewrite_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..300 {
        let p = random_pattern(&mut rng, 3);
        let once = rewrite(&p).unwrap_or_else(|e| panic!("{} failed: {}", p, e));
        let twice = rewrite(&once).unwrap();
        assert_eq!(once, twice, "pattern {}", p);
        assert!(!once.matches_empty(), "pattern {} rewrote to a nullable {}", p, once);
    }
}
