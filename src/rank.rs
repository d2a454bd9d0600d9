use crate::scoring::ScoredCandidate;
use std::cmp::Ordering;

/// Descending score, then ascending price. The sort is stable, so anything
/// still tied keeps enumeration order.
pub fn rank(mut scored: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    scored.sort_by(compare);
    scored
}

fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score.cmp(&a.score).then_with(|| {
        a.candidate
            .price_or_zero()
            .total_cmp(&b.candidate.price_or_zero())
    })
}

pub fn top_n(mut ranked: Vec<ScoredCandidate>, n: usize) -> Vec<ScoredCandidate> {
    ranked.truncate(n);
    ranked
}
