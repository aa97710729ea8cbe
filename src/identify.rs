//! Blind identification: guess which registered format best explains an
//! unlabelled raw pulse trace.

use crate::error::Error;
use crate::formats::{self, AnyCode};
use crate::raw::RawCode;

/// One candidate decoding, with the similarity score it earned against the
/// original trace.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub code: AnyCode,
    pub score: f64,
}

const SIMPLIFY_TOLERANCES: [f64; 5] = [0.05, 0.10, 0.15, 0.20, 0.25];
const MIN_SCORE: f64 = 0.5;
const MIN_SIMPLIFIED_SCORE: f64 = 0.7;

/// Tries every registered format against `code`'s raw trace, keeps the ones
/// that plausibly explain it, and additionally records a
/// parameter-simplified variant of each survivor where that does not cost
/// too much fidelity. Returns candidates ranked best first.
pub fn try_decode(code: &AnyCode) -> Result<Vec<Candidate>, Error> {
    let reference = code.to_raw()?.flatten(true);
    let mut candidates = Vec::new();

    for decode in formats::decoders() {
        let candidate = match decode(&reference) {
            Ok(c) => c,
            Err(e) => {
                log::trace!("try_decode: candidate format skipped: {e}");
                continue;
            }
        };

        let candidate_raw = match candidate.to_raw() {
            Ok(raw) => raw.flatten(true),
            Err(e) => {
                log::trace!("try_decode: candidate could not round-trip to raw: {e}");
                continue;
            }
        };

        let score = compare(&reference_pulses(&reference), &reference_pulses(&candidate_raw));
        if score < MIN_SCORE {
            log::trace!(
                "try_decode: candidate {:?} scored {score:.3}, below threshold",
                candidate.names().first()
            );
            continue;
        }

        candidates.push(Candidate {
            code: candidate.clone(),
            score,
        });

        let mut last_pushed_score: Option<f64> = Some(score);
        for tolerance in SIMPLIFY_TOLERANCES {
            let mut simplified = candidate.clone();
            simplified.simplify_params(tolerance);
            let simplified_raw = match simplified.to_raw() {
                Ok(raw) => raw.flatten(true),
                Err(_) => break,
            };
            let simplified_score =
                compare(&reference_pulses(&reference), &reference_pulses(&simplified_raw));
            if simplified_score < MIN_SIMPLIFIED_SCORE {
                break;
            }
            if last_pushed_score == Some(simplified_score) {
                candidates.pop();
            }
            candidates.push(Candidate {
                code: simplified,
                score: simplified_score,
            });
            last_pushed_score = Some(simplified_score);
        }
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap()
            .then_with(|| is_raw(a).cmp(&is_raw(b)))
    });
    log::debug!(
        "try_decode: ranked {} candidate(s), best score {:.3}",
        candidates.len(),
        candidates.first().map(|c| c.score).unwrap_or(0.0)
    );
    Ok(candidates)
}

/// On a tied score, a named format is a more useful classification than
/// the generic raw container every trace trivially matches, so raw sorts
/// after its tied peers.
fn is_raw(candidate: &Candidate) -> bool {
    candidate.code.names()[0] == "raw"
}

fn reference_pulses(raw: &RawCode) -> Vec<i64> {
    raw.packets
        .first()
        .map(|p| p.pulses.clone())
        .unwrap_or_default()
}

/// Asymmetric similarity of a candidate pulse sequence `b` against the
/// reference `a`: short pulses are de-weighted slightly (since jitter there
/// matters less, proportionally), and a length mismatch applies a geometric
/// penalty.
///
/// # Test
///
/// ```
/// use ircode::identify::compare;
///
/// let a = vec![9024, 4512, 563, 1687, 563, 40000];
/// assert_eq!(compare(&a, &a), 1.0);
/// ```
pub fn compare(a: &[i64], b: &[i64]) -> f64 {
    if a.is_empty() {
        return if b.is_empty() { 1.0 } else { 0.0 };
    }
    let mut sorted = a.to_vec();
    sorted.sort_unstable();
    let median = sorted[sorted.len() / 2] as f64;

    let mut worst = 0.0f64;
    let n = (a.len().saturating_sub(1)).min(b.len().saturating_sub(1));
    for i in 0..n {
        let ai = a[i] as f64;
        let bi = b[i] as f64;
        if ai == 0.0 {
            continue;
        }
        let relative_error = (bi - ai).abs() / ai;
        let weight = (median / ai).min(1.0).powf(0.1);
        worst = worst.max(relative_error * weight);
    }

    let len_diff = (a.len() as i64 - b.len() as i64).abs();
    let penalty_exp = (len_diff - 1).max(0);
    let penalty = 0.8f64.powi(penalty_exp as i32);

    (1.0 - worst.min(1.0)) * penalty
}
