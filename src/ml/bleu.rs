// ============================================================
// Layer 5 - Corpus BLEU
// ============================================================
// Corpus-level BLEU-4 as used for the validation score.
//
//   p_n  = Σ clipped n-gram matches / Σ max(1, hypothesis n-grams)
//          (summed over the whole corpus, n = 1..4)
//   BP   = 1                    if c > r
//          0                    if c = 0
//          exp(1 - r / c)       otherwise
//          c = total hypothesis length
//          r = Σ closest reference length (ties → shorter)
//   BLEU = BP · exp( Σ ¼ · ln p_n )
//
// Zero higher-order precisions are smoothed with "method 4"
// of Chen & Cherry (2014), k = 5: the i-th zero numerator
// becomes 1 / (2^i · k / ln c).
//
// Reference: Papineni et al. (2002) BLEU
//            Chen & Cherry (2014) A Systematic Comparison of
//            Smoothing Techniques for Sentence-Level BLEU

use std::{collections::HashMap, hash::Hash};

const MAX_ORDER: usize = 4;
const SMOOTHING_K: f64 = 5.0;

/// BLEU-4 over a corpus.
///
/// `references[i]` holds every acceptable reference for `hypotheses[i]`.
/// Returns 0.0 when no unigram of the whole corpus matches.
pub fn corpus_bleu<T: Eq + Hash>(references: &[Vec<Vec<T>>], hypotheses: &[Vec<T>]) -> f64 {
    let mut numerators   = [0usize; MAX_ORDER];
    let mut denominators = [0usize; MAX_ORDER];
    let mut hyp_len      = 0usize;
    let mut ref_len      = 0usize;

    for (refs, hyp) in references.iter().zip(hypotheses) {
        for n in 1..=MAX_ORDER {
            let (matched, total) = modified_precision(refs, hyp, n);
            numerators[n - 1]   += matched;
            denominators[n - 1] += total;
        }
        hyp_len += hyp.len();
        ref_len += closest_ref_length(refs, hyp.len());
    }

    if numerators[0] == 0 {
        return 0.0;
    }

    let precisions = smooth_method4(&numerators, &denominators, hyp_len);
    let log_sum: f64 = precisions
        .iter()
        .map(|p| p.ln() / MAX_ORDER as f64)
        .sum();

    brevity_penalty(ref_len, hyp_len) * log_sum.exp()
}

/// Clipped n-gram matches and the (at least 1) hypothesis n-gram count.
fn modified_precision<T: Eq + Hash>(refs: &[Vec<T>], hyp: &[T], n: usize) -> (usize, usize) {
    let counts = ngram_counts(hyp, n);

    let mut max_ref_counts: HashMap<&[T], usize> = HashMap::new();
    for reference in refs {
        let ref_counts = ngram_counts(reference, n);
        for gram in counts.keys() {
            let c = ref_counts.get(*gram).copied().unwrap_or(0);
            let slot = max_ref_counts.entry(*gram).or_insert(0);
            *slot = (*slot).max(c);
        }
    }

    let matched: usize = counts
        .iter()
        .map(|(gram, &c)| c.min(max_ref_counts.get(*gram).copied().unwrap_or(0)))
        .sum();
    let total: usize = counts.values().sum();

    (matched, total.max(1))
}

fn ngram_counts<T: Eq + Hash>(tokens: &[T], n: usize) -> HashMap<&[T], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

/// Reference length closest to the hypothesis length; ties go to the shorter one.
fn closest_ref_length<T>(refs: &[Vec<T>], hyp_len: usize) -> usize {
    refs.iter()
        .map(|r| r.len())
        .min_by_key(|&len| (len.abs_diff(hyp_len), len))
        .unwrap_or(0)
}

fn brevity_penalty(ref_len: usize, hyp_len: usize) -> f64 {
    if hyp_len > ref_len {
        1.0
    } else if hyp_len == 0 {
        0.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    }
}

fn smooth_method4(
    numerators:   &[usize; MAX_ORDER],
    denominators: &[usize; MAX_ORDER],
    hyp_len:      usize,
) -> [f64; MAX_ORDER] {
    let mut precisions = [0.0; MAX_ORDER];
    let mut incvnt     = 1i32;

    for n in 0..MAX_ORDER {
        let denominator = denominators[n] as f64;
        precisions[n] = if numerators[n] == 0 && hyp_len > 1 {
            let numerator = 1.0 / (2f64.powi(incvnt) * SMOOTHING_K / (hyp_len as f64).ln());
            incvnt += 1;
            numerator / denominator
        } else {
            numerators[n] as f64 / denominator
        };
    }
    precisions
}
