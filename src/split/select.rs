use tracing::{debug, info};

use crate::audio::LoudnessProfile;
use crate::error::{Result, SplitError};

use super::{CutPointSet, ShortfallPolicy, SplitRequest};

/// Pick cut points at quiet windows, filling any shortfall in the trailing segment.
pub fn select(profile: &LoudnessProfile, request: &SplitRequest) -> Result<CutPointSet> {
    select_with_policy(profile, request, ShortfallPolicy::TrailingGap)
}

/// Pick cut points at quiet windows.
///
/// The first `requested_parts - 1` windows quieter than the threshold are
/// taken in time order. Window 0 is never a candidate since 0.0 is already
/// the first boundary. If fewer quiet windows exist, the remaining cuts are
/// synthesized according to `policy`.
pub fn select_with_policy(
    profile: &LoudnessProfile,
    request: &SplitRequest,
    policy: ShortfallPolicy,
) -> Result<CutPointSet> {
    let parts = request.validate()?;

    if profile.is_empty() {
        return Err(SplitError::EmptyProfile);
    }

    let total = request.total_duration;
    let mut cuts = vec![0.0];

    for sample in profile.samples() {
        if cuts.len() >= parts {
            break;
        }
        let quiet = sample.loudness_db < request.threshold_db;
        if sample.window_index == 0 || !quiet {
            continue;
        }

        let time = profile.time_of(sample.window_index);
        if time >= total {
            // Windows past the end of the media can't become cuts
            break;
        }
        cuts.push(time);
    }

    let quiet_cuts = cuts.len() - 1;
    debug!(
        "Found {} quiet windows below {:.1} dB for {} parts",
        quiet_cuts, request.threshold_db, parts
    );

    cuts.push(total);

    let target = parts + 1;
    if cuts.len() > target {
        cuts.truncate(target);
        if let Some(last) = cuts.last_mut() {
            *last = total;
        }
    } else if cuts.len() < target {
        let missing = target - cuts.len();
        info!(
            "Only {} of {} cuts fell on quiet windows, synthesizing {} ({})",
            quiet_cuts,
            parts - 1,
            missing,
            policy
        );
        cuts = match policy {
            ShortfallPolicy::TrailingGap => fill_trailing_gap(cuts, missing),
            ShortfallPolicy::Proportional => fill_proportionally(cuts, missing),
        };
    }

    // Subdividing a very short gap can run out of f64 resolution
    CutPointSet::new(cuts).map_err(|_| {
        SplitError::InvalidArgument(format!(
            "Cannot fit {} distinct parts into {}s of media",
            parts, total
        ))
    })
}

/// Insert `missing` evenly spaced points between the last two boundaries.
fn fill_trailing_gap(mut cuts: Vec<f64>, missing: usize) -> Vec<f64> {
    let n = cuts.len();
    let (lo, hi) = (cuts[n - 2], cuts[n - 1]);
    let step = (hi - lo) / (missing + 1) as f64;

    let fill = (1..=missing).map(|i| lo + step * i as f64);
    cuts.splice(n - 1..n - 1, fill);
    cuts
}

/// Hand out `missing` points one at a time to the gap whose sub-intervals
/// would currently be longest, then subdivide every gap evenly.
fn fill_proportionally(cuts: Vec<f64>, missing: usize) -> Vec<f64> {
    let gaps: Vec<f64> = cuts.windows(2).map(|w| w[1] - w[0]).collect();
    let mut assigned = vec![0usize; gaps.len()];

    for _ in 0..missing {
        let mut best = 0;
        for i in 1..gaps.len() {
            // Strict comparison keeps ties on the earliest gap
            if gaps[i] / (assigned[i] + 1) as f64 > gaps[best] / (assigned[best] + 1) as f64 {
                best = i;
            }
        }
        assigned[best] += 1;
    }

    let mut result = Vec::with_capacity(cuts.len() + missing);
    for (i, window) in cuts.windows(2).enumerate() {
        let (lo, hi) = (window[0], window[1]);
        let step = (hi - lo) / (assigned[i] + 1) as f64;
        result.push(lo);
        result.extend((1..=assigned[i]).map(|j| lo + step * j as f64));
    }
    if let Some(&last) = cuts.last() {
        result.push(last);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn profile_with_quiet(len: usize, quiet: &[usize]) -> LoudnessProfile {
        LoudnessProfile::from_levels(
            Duration::from_secs(1),
            (0..len).map(|i| if quiet.contains(&i) { -40.0 } else { -10.0 }),
        )
    }

    #[test]
    fn test_single_part_ignores_profile() {
        let profile = profile_with_quiet(20, &[3, 7, 11]);
        let cuts = select(&profile, &SplitRequest::new(20.0, 1)).unwrap();
        assert_eq!(cuts.points(), &[0.0, 20.0]);
    }

    #[test]
    fn test_takes_first_quiet_window() {
        let profile = profile_with_quiet(20, &[5, 12]);
        let cuts = select(&profile, &SplitRequest::new(20.0, 2)).unwrap();
        assert_eq!(cuts.points(), &[0.0, 5.0, 20.0]);
    }

    #[test]
    fn test_takes_quiet_windows_in_order() {
        let profile = profile_with_quiet(30, &[4, 9, 15, 22]);
        let cuts = select(&profile, &SplitRequest::new(30.0, 4)).unwrap();
        assert_eq!(cuts.points(), &[0.0, 4.0, 9.0, 15.0, 30.0]);
    }

    #[test]
    fn test_window_zero_is_never_a_candidate() {
        let profile = profile_with_quiet(10, &[0, 6]);
        let cuts = select(&profile, &SplitRequest::new(10.0, 2)).unwrap();
        assert_eq!(cuts.points(), &[0.0, 6.0, 10.0]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let profile = LoudnessProfile::from_levels(Duration::from_secs(1), vec![-10.0, -35.0, -10.0]);
        let cuts = select(&profile, &SplitRequest::new(3.0, 2)).unwrap();
        // -35 is not below -35, so the cut is synthesized
        assert_eq!(cuts.points(), &[0.0, 1.5, 3.0]);
    }

    #[test]
    fn test_silence_counts_as_quiet() {
        let profile = LoudnessProfile::from_levels(
            Duration::from_secs(1),
            vec![-10.0, -10.0, f64::NEG_INFINITY, -10.0],
        );
        let cuts = select(&profile, &SplitRequest::new(4.0, 2)).unwrap();
        assert_eq!(cuts.points(), &[0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_shortfall_subdivides_whole_track() {
        let profile = profile_with_quiet(30, &[]);
        let cuts = select(&profile, &SplitRequest::new(30.0, 3)).unwrap();
        assert_eq!(cuts.points(), &[0.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_shortfall_subdivides_trailing_gap_only() {
        let profile = profile_with_quiet(20, &[4]);
        let cuts = select(&profile, &SplitRequest::new(20.0, 3)).unwrap();
        assert_eq!(cuts.points(), &[0.0, 4.0, 12.0, 20.0]);
    }

    #[test]
    fn test_proportional_shortfall_uses_longest_gap() {
        let profile = profile_with_quiet(20, &[16]);
        let request = SplitRequest::new(20.0, 3);

        let trailing = select(&profile, &request).unwrap();
        assert_eq!(trailing.points(), &[0.0, 16.0, 18.0, 20.0]);

        let proportional =
            select_with_policy(&profile, &request, ShortfallPolicy::Proportional).unwrap();
        assert_eq!(proportional.points(), &[0.0, 8.0, 16.0, 20.0]);
    }

    #[test]
    fn test_proportional_shortfall_spreads_cuts() {
        let profile = profile_with_quiet(30, &[10]);
        let request = SplitRequest::new(30.0, 5);
        let cuts = select_with_policy(&profile, &request, ShortfallPolicy::Proportional).unwrap();

        assert_eq!(cuts.len(), 6);
        assert!(cuts.points().contains(&10.0));
        // Gap [0,10] gets one extra cut, [10,30] gets two
        assert_eq!(cuts.points()[1], 5.0);
        assert_eq!(cuts.points().iter().filter(|&&p| p > 10.0 && p < 30.0).count(), 2);
    }

    #[test]
    fn test_quiet_windows_past_duration_are_ignored() {
        let profile = profile_with_quiet(20, &[15]);
        let cuts = select(&profile, &SplitRequest::new(10.0, 2)).unwrap();
        assert_eq!(cuts.points(), &[0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_huge_part_count_is_rejected() {
        let profile = profile_with_quiet(10, &[]);
        let result = select(&profile, &SplitRequest::new(10.0, i64::MAX));
        assert!(matches!(result, Err(SplitError::InvalidArgument(_))));
    }

    #[test]
    fn test_parts_finer_than_float_resolution_are_rejected() {
        let profile = profile_with_quiet(1, &[]);
        let request = SplitRequest::new(1e-320, crate::split::MAX_PARTS as i64);
        for policy in [ShortfallPolicy::TrailingGap, ShortfallPolicy::Proportional] {
            let result = select_with_policy(&profile, &request, policy);
            assert!(matches!(result, Err(SplitError::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_sub_second_windows() {
        let profile = LoudnessProfile::from_levels(
            Duration::from_millis(250),
            vec![-10.0, -10.0, -10.0, -60.0, -10.0, -10.0, -10.0, -10.0],
        );
        let cuts = select(&profile, &SplitRequest::new(2.0, 2)).unwrap();
        assert_eq!(cuts.points(), &[0.0, 0.75, 2.0]);
    }

    #[test]
    fn test_zero_parts_rejected() {
        let profile = profile_with_quiet(10, &[]);
        assert!(matches!(
            select(&profile, &SplitRequest::new(10.0, 0)),
            Err(SplitError::InvalidArgument(_))
        ));
        assert!(matches!(
            select(&profile, &SplitRequest::new(10.0, -1)),
            Err(SplitError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_profile_rejected() {
        let profile = profile_with_quiet(0, &[]);
        assert!(matches!(
            select(&profile, &SplitRequest::new(10.0, 2)),
            Err(SplitError::EmptyProfile)
        ));
    }

    #[test]
    fn test_invalid_arguments_win_over_empty_profile() {
        let profile = profile_with_quiet(0, &[]);
        assert!(matches!(
            select(&profile, &SplitRequest::new(10.0, 0)),
            Err(SplitError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_fill_trailing_gap() {
        assert_eq!(fill_trailing_gap(vec![0.0, 30.0], 2), vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(fill_trailing_gap(vec![0.0, 2.0, 6.0], 1), vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_fill_proportionally_ties_go_first() {
        assert_eq!(
            fill_proportionally(vec![0.0, 10.0, 20.0], 1),
            vec![0.0, 5.0, 10.0, 20.0]
        );
    }
}
