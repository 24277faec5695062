use super::types::{EqProfile, FilterBand, ParametricEqState};

/// Delta bands within this frequency ratio of an existing filter fold into it.
pub const MATCH_RATIO: f32 = 1.5;

/// Layer a profile's delta bands on top of a baseline EQ.
///
/// Each delta band is folded into the filter nearest to it in log-frequency
/// when that filter lies within [`MATCH_RATIO`]; otherwise it becomes a new
/// filter. The result is sorted by ascending frequency.
pub fn merge_profile(baseline: &ParametricEqState, profile: &EqProfile) -> ParametricEqState {
    let mut filters: Vec<FilterBand> = baseline.bands.clone();

    for delta in &profile.bands {
        match nearest_filter(&filters, delta.frequency) {
            Some(idx) if within_ratio(filters[idx].frequency, delta.frequency) => {
                filters[idx].gain += delta.gain;
            }
            _ => filters.push(*delta),
        }
    }

    filters.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));

    ParametricEqState {
        preamp: baseline.preamp,
        bass: baseline.bass + profile.bass,
        treble: baseline.treble + profile.treble,
        bands: filters,
    }
}

fn nearest_filter(filters: &[FilterBand], frequency: f32) -> Option<usize> {
    if frequency <= 0.0 {
        return None;
    }
    let target = frequency.log10();
    filters
        .iter()
        .enumerate()
        .filter(|(_, f)| f.frequency > 0.0)
        .min_by(|(_, a), (_, b)| {
            let da = (a.frequency.log10() - target).abs();
            let db = (b.frequency.log10() - target).abs();
            da.total_cmp(&db)
        })
        .map(|(idx, _)| idx)
}

fn within_ratio(existing: f32, frequency: f32) -> bool {
    existing / MATCH_RATIO < frequency && frequency < existing * MATCH_RATIO
}
