// tests/scoring_properties.rs
//
// Properties of the scoring pass that must hold for any input:
// totality, bounds, determinism, rule-order independence and the
// cumulative positive bonus.

use privacy_grader::catalog::{builtin_rule_defs, Category, RuleDef};
use privacy_grader::{Grade, PatternCatalog, PolicyScorer};
use rand::Rng;

const PHRASES: &[&str] = &[
    "end-to-end encryption",
    "we do not sell your personal data",
    "we sell your personal data",
    "open source",
    "zero-knowledge",
    "never",
    "do not",
    "behavioral advertising",
    "advertising partners",
    "biometric",
    "as long as necessary",
    "without notice",
    "stored only on your device",
    "privacy by design",
    "cross-site tracking",
    "Žluťoučký kůň",
    "’",
    "\n",
    "   ",
    "日本語のテキスト",
];

fn random_document<R: Rng>(rng: &mut R) -> String {
    let n = rng.random_range(0..40);
    let mut out = String::new();
    for _ in 0..n {
        if rng.random_bool(0.2) {
            // arbitrary chars, including multi-byte ones
            let len = rng.random_range(1..12);
            out.extend((0..len).map(|_| rng.random::<char>()));
        } else {
            out.push_str(PHRASES[rng.random_range(0..PHRASES.len())]);
        }
        out.push(' ');
    }
    out
}

#[test]
fn random_documents_always_score_within_bounds() {
    let scorer = PolicyScorer::builtin().unwrap();
    let mut rng = rand::rng();

    for _ in 0..500 {
        let doc = random_document(&mut rng);
        let r = scorer.score_document(&doc);
        assert!(r.score <= 100, "score {} out of range", r.score);
        assert_eq!(r.grade, Grade::from_score(r.score), "doc: {doc:?}");
    }
}

#[test]
fn scoring_is_deterministic() {
    let scorer = PolicyScorer::builtin().unwrap();
    let mut rng = rand::rng();

    for _ in 0..100 {
        let doc = random_document(&mut rng);
        assert_eq!(scorer.score_document(&doc), scorer.score_document(&doc));
    }
}

#[test]
fn rule_order_does_not_change_the_score() {
    let forward = PolicyScorer::builtin().unwrap();
    let mut defs = builtin_rule_defs();
    defs.reverse();
    let reversed = PolicyScorer::with_catalog(PatternCatalog::from_defs(defs).unwrap());
    let mut rng = rand::rng();

    for _ in 0..200 {
        let doc = random_document(&mut rng);
        let a = forward.score_document(&doc);
        let b = reversed.score_document(&doc);
        assert_eq!(a.score, b.score, "doc: {doc:?}");
        assert_eq!(a.grade, b.grade);

        let mut pa = a.positive_labels.clone();
        let mut pb = b.positive_labels.clone();
        pa.sort();
        pb.sort();
        assert_eq!(pa, pb);
    }
}

fn unit_rule(i: usize) -> RuleDef {
    RuleDef {
        id: format!("p{i}"),
        category: Category::Positive,
        pattern: format!(r"\bmarker{i}\b"),
        label: format!("Marker {i}"),
        weight: 1,
    }
}

fn unit_scorer() -> PolicyScorer {
    PolicyScorer::with_catalog(PatternCatalog::from_defs((0..10).map(unit_rule)).unwrap())
}

fn markers(n: usize) -> String {
    (0..n).map(|i| format!("marker{i} ")).collect()
}

#[test]
fn bonus_tiers_apply_at_five_and_eight_positives() {
    let s = unit_scorer();
    let expected = [
        (0, 50),
        (4, 54),
        (5, 65),
        (7, 67),
        (8, 78),
        (10, 80),
    ];
    for (n, score) in expected {
        assert_eq!(s.score_document(&markers(n)).score, score, "{n} positives");
    }
}

#[test]
fn repeated_evidence_counts_once() {
    let s = unit_scorer();
    let once = s.score_document("marker0");
    let many = s.score_document(&"marker0 ".repeat(200));
    assert_eq!(once, many);
}
