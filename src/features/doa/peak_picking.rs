//! Admissible-lag peak search
//!
//! Only lags with `|lag| <= max_delay_samples` are physically possible for the
//! array; everything outside is excluded from the search, not down-weighted.
//!
//! Inside that range a lag is a candidate only if it is a genuine local maximum of
//! the *full* correlation (strictly above both neighbours, looking past the edge of
//! the admissible range). A plain argmax over the sub-range would happily pick the
//! range edge whenever the true peak lies just outside it.
//!
//! Values within the correlation's noise floor count as exactly zero, so rounding
//! residue between genuinely zero lags can neither form a peak nor be one.
//!
//! Among candidates the highest value wins; ties go to the smallest `|lag|`, then
//! to the smaller signed lag.

use super::correlation::CrossCorrelation;

/// Selected correlation peak
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationPeak {
    /// Signed lag in samples
    pub lag: isize,
    /// Correlation value at the lag
    pub value: f32,
}

/// Find the best admissible local maximum
///
/// # Arguments
///
/// * `correlation` - Full cross-correlation of a sensor pair
/// * `max_delay_samples` - Largest admissible `|lag|`
///
/// # Returns
///
/// `None` if no local maximum above the noise floor lies inside the admissible range
/// (silent or degenerate pair, or the only peak is physically impossible).
///
/// # Example
///
/// ```
/// use stratum_doa::features::doa::correlation::CrossCorrelation;
/// use stratum_doa::features::doa::peak_picking::find_admissible_peak;
///
/// // lags -3..=3, global maximum at +3 is out of range, local maximum at -1
/// let corr = CrossCorrelation::from_values(vec![0.0, 0.2, 0.5, 0.3, 0.4, 0.6, 0.9]).unwrap();
/// let peak = find_admissible_peak(&corr, 2).unwrap();
/// assert_eq!(peak.lag, -1);
/// ```
pub fn find_admissible_peak(
    correlation: &CrossCorrelation,
    max_delay_samples: usize,
) -> Option<CorrelationPeak> {
    let values = correlation.values();
    if values.is_empty() {
        return None;
    }

    let floor = correlation.noise_floor();
    let denoise = |v: f32| if v.abs() <= floor { 0.0 } else { v };

    let limit = max_delay_samples.min(correlation.max_lag()) as isize;
    let mut best: Option<CorrelationPeak> = None;

    for lag in -limit..=limit {
        let index = correlation.index_of(lag)?;
        let value = denoise(values[index]);
        if value == 0.0 {
            continue;
        }

        let left = if index > 0 {
            denoise(values[index - 1])
        } else {
            f32::NEG_INFINITY
        };
        let right = values
            .get(index + 1)
            .map(|&v| denoise(v))
            .unwrap_or(f32::NEG_INFINITY);

        // NaN fails both comparisons and is never a candidate
        if !(value > left && value > right) {
            continue;
        }

        let candidate = CorrelationPeak { lag, value };
        best = match best {
            None => Some(candidate),
            Some(current) if is_better(candidate, current) => Some(candidate),
            keep => keep,
        };
    }

    if best.is_none() {
        log::trace!(
            "No local maximum within ±{} lags of {}-lag correlation",
            limit,
            values.len()
        );
    }

    best
}

fn is_better(candidate: CorrelationPeak, current: CorrelationPeak) -> bool {
    if candidate.value != current.value {
        return candidate.value > current.value;
    }
    (candidate.lag.unsigned_abs(), candidate.lag) < (current.lag.unsigned_abs(), current.lag)
}
