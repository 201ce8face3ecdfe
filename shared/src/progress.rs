//! Reconciliation of a user's course statistics.
//!
//! The aggregate counters come from a different query than the per-course
//! rows and can go stale independently of them. The per-course rows are
//! authoritative; the aggregate is only shown when it agrees with them on
//! the course count and carries a non-zero average.

use crate::{AggregateStatistics, CourseProgressRecord, ProgressSummary};

/// Number of decimal places kept in `average_progress`.
pub const AVERAGE_PRECISION: i32 = 1;

/// Statistics derived directly from the per-course rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputedStatistics {
    pub total_courses: u32,
    pub completed_courses: u32,
    pub in_progress_courses: u32,
    pub average_progress: f64,
}

impl ComputedStatistics {
    pub fn from_courses(courses: &[CourseProgressRecord]) -> Self {
        let mut completed = 0usize;
        let mut in_progress = 0usize;
        let mut sum = 0u64;

        for course in courses {
            let pct = course.progress_percentage;
            if pct.is_complete() {
                completed += 1;
            } else if pct.is_in_progress() {
                in_progress += 1;
            }
            sum += u64::from(pct.value());
        }

        let total = courses.len();
        let average_progress = if total > 0 {
            sum as f64 / total as f64
        } else {
            0.0
        };

        Self {
            total_courses: saturate(total),
            completed_courses: saturate(completed),
            in_progress_courses: saturate(in_progress),
            average_progress,
        }
    }
}

// Enrollment counts never approach u32::MAX; saturate rather than wrap.
fn saturate(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Which source the displayed totals are taken from.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// The aggregate agrees with the rows and is displayed as-is.
    Trusted(AggregateStatistics),
    /// The aggregate is absent or inconsistent; totals come from the rows.
    Recomputed(ComputedStatistics),
}

/// Decide whether the aggregate can be displayed for these course rows.
///
/// The aggregate is trusted only when its course count equals the number of
/// rows and its average is strictly positive. With no rows the computed
/// (all-zero) statistics always win.
pub fn decide(aggregate: Option<&AggregateStatistics>, computed: &ComputedStatistics) -> Reconciliation {
    match aggregate {
        Some(aggregate)
            if computed.total_courses > 0
                && aggregate.total_courses_enrolled == computed.total_courses
                && aggregate.average_progress > 0.0 =>
        {
            Reconciliation::Trusted(aggregate.clone())
        }
        _ => Reconciliation::Recomputed(*computed),
    }
}

/// Turn a decision into the summary shown to the user.
///
/// `in_progress_courses` has no aggregate counterpart and always comes from
/// the rows. On the trusted path it is therefore not bounded by the
/// aggregate's completed count, and `completed + in_progress` may exceed
/// `total_courses`.
pub fn summarize(decision: &Reconciliation, computed: &ComputedStatistics) -> ProgressSummary {
    let (total_courses, completed_courses, average) = match decision {
        Reconciliation::Trusted(aggregate) => (
            aggregate.total_courses_enrolled,
            aggregate.courses_completed,
            aggregate.average_progress,
        ),
        Reconciliation::Recomputed(stats) => (
            stats.total_courses,
            stats.completed_courses,
            stats.average_progress,
        ),
    };

    ProgressSummary {
        total_courses,
        completed_courses,
        in_progress_courses: computed.in_progress_courses,
        average_progress: round_average(average),
    }
}

/// Produce a consistent summary from the aggregate (if any) and the course rows.
pub fn reconcile(aggregate: Option<&AggregateStatistics>, courses: &[CourseProgressRecord]) -> ProgressSummary {
    let computed = ComputedStatistics::from_courses(courses);
    let decision = decide(aggregate, &computed);

    if let Reconciliation::Recomputed(_) = decision {
        if let Some(aggregate) = aggregate {
            tracing::debug!(
                "Aggregate statistics ignored - aggregate total: {}, rows: {}, aggregate average: {}",
                aggregate.total_courses_enrolled,
                computed.total_courses,
                aggregate.average_progress
            );
        }
    }

    summarize(&decision, &computed)
}

/// Round to [`AVERAGE_PRECISION`] decimal places, halves to the even digit.
pub fn round_average(value: f64) -> f64 {
    let factor = 10f64.powi(AVERAGE_PRECISION);
    (value * factor).round_ties_even() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn courses(percentages: &[i32]) -> Vec<CourseProgressRecord> {
        percentages
            .iter()
            .enumerate()
            .map(|(i, pct)| CourseProgressRecord::new(format!("course-{}", i), *pct).unwrap())
            .collect()
    }

    fn aggregate(total: u32, completed: u32, average: f64) -> AggregateStatistics {
        AggregateStatistics {
            total_courses_enrolled: total,
            courses_completed: completed,
            average_progress: average,
        }
    }

    #[test]
    fn test_four_courses_without_aggregate() {
        let summary = reconcile(None, &courses(&[45, 100, 20, 75]));

        assert_eq!(summary.total_courses, 4);
        assert_eq!(summary.completed_courses, 1);
        assert_eq!(summary.in_progress_courses, 3);
        assert_eq!(summary.average_progress, 60.0);
    }

    #[test]
    fn test_no_courses_with_zero_aggregate() {
        let summary = reconcile(Some(&aggregate(0, 0, 0.0)), &[]);
        assert_eq!(summary, ProgressSummary::empty());
    }

    #[test]
    fn test_no_courses_ignores_any_aggregate() {
        let candidates = [
            None,
            Some(aggregate(0, 0, 0.0)),
            Some(aggregate(0, 0, 50.0)),
            Some(aggregate(3, 1, 80.0)),
        ];

        for candidate in candidates.iter() {
            assert_eq!(reconcile(candidate.as_ref(), &[]), ProgressSummary::empty());
        }
    }

    #[test]
    fn test_single_completed_course_agrees_with_aggregate() {
        let summary = reconcile(Some(&aggregate(1, 1, 100.0)), &courses(&[100]));

        assert_eq!(summary.total_courses, 1);
        assert_eq!(summary.completed_courses, 1);
        assert_eq!(summary.in_progress_courses, 0);
        assert_eq!(summary.average_progress, 100.0);
    }

    #[test]
    fn test_matching_aggregate_wins() {
        let rows = courses(&[40, 60]);
        let summary = reconcile(Some(&aggregate(2, 1, 72.5)), &rows);

        assert_eq!(summary.total_courses, 2);
        assert_eq!(summary.completed_courses, 1);
        assert_eq!(summary.in_progress_courses, 2);
        assert_eq!(summary.average_progress, 72.5);
    }

    #[test]
    fn test_count_mismatch_recomputes() {
        let rows = courses(&[40, 60, 100]);
        let summary = reconcile(Some(&aggregate(2, 2, 72.5)), &rows);

        assert_eq!(summary.total_courses, 3);
        assert_eq!(summary.completed_courses, 1);
        assert_eq!(summary.in_progress_courses, 2);
        assert_eq!(summary.average_progress, 66.7);
    }

    #[test]
    fn test_zero_aggregate_average_recomputes() {
        let rows = courses(&[30, 100]);
        let summary = reconcile(Some(&aggregate(2, 0, 0.0)), &rows);

        assert_eq!(summary.completed_courses, 1);
        assert_eq!(summary.average_progress, 65.0);
    }

    #[test]
    fn test_decide_is_tagged() {
        let rows = courses(&[50]);
        let computed = ComputedStatistics::from_courses(&rows);

        assert_eq!(
            decide(Some(&aggregate(1, 0, 50.0)), &computed),
            Reconciliation::Trusted(aggregate(1, 0, 50.0))
        );
        assert_eq!(decide(Some(&aggregate(2, 0, 50.0)), &computed), Reconciliation::Recomputed(computed));
        assert_eq!(decide(None, &computed), Reconciliation::Recomputed(computed));
    }

    #[test]
    fn test_partition_property() {
        let cases: [&[i32]; 5] = [&[10, 20], &[0, 50], &[100, 100, 0], &[0], &[1, 99, 100]];

        for pcts in cases.iter() {
            let rows = courses(pcts);
            let summary = reconcile(None, &rows);
            let has_zero = pcts.contains(&0);
            let assigned = summary.completed_courses + summary.in_progress_courses;

            assert!(assigned <= summary.total_courses);
            assert_eq!(assigned < summary.total_courses, has_zero, "case {:?}", pcts);
        }
    }

    #[test]
    fn test_zero_percent_course_is_neither_completed_nor_in_progress() {
        let summary = reconcile(None, &courses(&[0, 0]));

        assert_eq!(summary.total_courses, 2);
        assert_eq!(summary.completed_courses, 0);
        assert_eq!(summary.in_progress_courses, 0);
        assert_eq!(summary.average_progress, 0.0);
    }

    #[test]
    fn test_rounding_is_stable() {
        let rows = courses(&[33, 33, 34]);
        let agg = aggregate(3, 0, 33.333_333);

        let first = reconcile(Some(&agg), &rows);
        let second = reconcile(Some(&agg), &rows);

        assert_eq!(first, second);
        assert_eq!(first.average_progress, 33.3);
        assert_eq!(round_average(first.average_progress), first.average_progress);
    }

    #[test]
    fn test_round_average() {
        assert_eq!(round_average(0.0), 0.0);
        assert_eq!(round_average(66.666), 66.7);
        assert_eq!(round_average(12.25), 12.2);
        assert_eq!(round_average(12.75), 12.8);
        assert_eq!(round_average(100.0), 100.0);
    }

    #[test]
    fn test_halfway_average_rounds_to_even() {
        let summary = reconcile(None, &courses(&[12, 13, 12, 12]));
        assert_eq!(summary.average_progress, 12.2);

        let summary = reconcile(None, &courses(&[12, 13, 13, 13]));
        assert_eq!(summary.average_progress, 12.8);
    }

    #[test]
    fn test_trusted_aggregate_can_overlap_partition() {
        let summary = reconcile(Some(&aggregate(2, 1, 72.5)), &courses(&[40, 60]));

        assert_eq!(summary.total_courses, 2);
        assert!(summary.completed_courses + summary.in_progress_courses > summary.total_courses);
    }
}
