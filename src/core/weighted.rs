//! Weighted label selection with self-bias

use crate::types::Emotion;

/// Add `bias` to the weight of `current`, then renormalize to sum 1.
///
/// Non-finite and negative weights count as 0. If the result has no mass the
/// weights are returned all zero.
pub fn apply_self_bias(weights: &[(Emotion, f64)], current: Emotion, bias: f64) -> Vec<(Emotion, f64)> {
    let biased: Vec<(Emotion, f64)> = weights
        .iter()
        .map(|&(e, w)| {
            let w = if w.is_finite() && w > 0.0 { w } else { 0.0 };
            if e == current { (e, w + bias.max(0.0)) } else { (e, w) }
        })
        .collect();

    let total: f64 = biased.iter().map(|(_, w)| w).sum();
    if !(total.is_finite() && total > 0.0) {
        return biased.into_iter().map(|(e, _)| (e, 0.0)).collect();
    }
    biased.into_iter().map(|(e, w)| (e, w / total)).collect()
}

/// Inverse-CDF weighted choice.
///
/// Walks the cumulative weights in the given order and returns the first label
/// whose cumulative weight exceeds `draw`. Weights need not be normalized; the
/// draw is scaled by their total. Rounding at the top end falls back to the last
/// label with positive weight. Returns None when no label has positive weight.
pub fn weighted_choice(weights: &[(Emotion, f64)], draw: f64) -> Option<Emotion> {
    let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let total: f64 = weights.iter().map(|&(_, w)| clean(w)).sum();
    if total <= 0.0 {
        return None;
    }

    let target = draw.clamp(0.0, 1.0) * total;
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for &(emotion, w) in weights {
        let w = clean(w);
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(emotion);
        if cumulative > target {
            return Some(emotion);
        }
    }
    last_positive
}
