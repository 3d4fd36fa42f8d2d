use crate::error::StudyError;
use crate::panel::ReturnPanel;
use chrono::NaiveDate;
use core_types::{EstimationWindowSpec, EventWindowSpec, WindowKind};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Fewest estimation rows that still give an OLS fit with a non-degenerate
/// residual variance.
pub const MIN_ESTIMATION_ROWS: usize = 3;

/// The trading-day bounds a window specification resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: usize,
}

/// A panel partitioned into its estimation and event rows.
#[derive(Debug, Clone)]
pub struct SplitPanel {
    pub estimation: ReturnPanel,
    pub event: ReturnPanel,
}

impl SplitPanel {
    pub fn estimation_window(&self) -> ResolvedWindow {
        resolved(&self.estimation)
    }

    pub fn event_window(&self) -> ResolvedWindow {
        resolved(&self.event)
    }
}

/// Partitions `panel` into estimation and event windows.
///
/// All day counts are positions in the panel, not calendar days. At least
/// `gap` trading days must lie strictly between the last estimation row and
/// the first event row.
pub fn split(
    panel: &ReturnPanel,
    estimation: &EstimationWindowSpec,
    event: &EventWindowSpec,
    gap: usize,
) -> Result<SplitPanel, StudyError> {
    let event_rows = resolve_event(panel.dates(), event)?;
    if event_rows.is_empty() {
        return Err(StudyError::invalid_window(
            WindowKind::Event,
            "contains no trading days",
        ));
    }

    let estimation_rows = resolve_estimation(panel.dates(), estimation, event_rows.start, gap)?;
    if estimation_rows.len() < MIN_ESTIMATION_ROWS {
        return Err(StudyError::invalid_window(
            WindowKind::Estimation,
            format!(
                "has {} trading days, need at least {MIN_ESTIMATION_ROWS}",
                estimation_rows.len()
            ),
        ));
    }

    if estimation_rows.end > event_rows.start {
        return Err(StudyError::invalid_window(
            WindowKind::Estimation,
            format!(
                "must end before the event window starts on {}",
                panel.dates()[event_rows.start]
            ),
        ));
    }

    let separation = event_rows.start - estimation_rows.end;
    if separation < gap {
        return Err(StudyError::invalid_window(
            WindowKind::Estimation,
            format!("is separated from the event window by {separation} trading days, need {gap}"),
        ));
    }

    let split = SplitPanel {
        estimation: panel.slice(estimation_rows),
        event: panel.slice(event_rows),
    };

    let est = split.estimation_window();
    let evt = split.event_window();
    tracing::info!(
        estimation_start = %est.start,
        estimation_end = %est.end,
        estimation_rows = est.rows,
        event_start = %evt.start,
        event_end = %evt.end,
        event_rows = evt.rows,
        "Resolved study windows."
    );

    Ok(split)
}

fn resolve_event(dates: &[NaiveDate], spec: &EventWindowSpec) -> Result<Range<usize>, StudyError> {
    match *spec {
        EventWindowSpec::Dates { start, end } => resolve_bounds(dates, WindowKind::Event, start, end),
        EventWindowSpec::AroundEvent {
            event_date,
            days_before,
            days_after,
        } => {
            // An event on a non-trading day maps to the next trading day.
            let anchor = dates.partition_point(|d| *d < event_date);
            if anchor == dates.len() {
                return Err(StudyError::invalid_window(
                    WindowKind::Event,
                    format!("no trading day on or after the event date {event_date}"),
                ));
            }
            if anchor < days_before {
                return Err(StudyError::invalid_window(
                    WindowKind::Event,
                    format!(
                        "{days_before} trading days before {} requested, only {anchor} available",
                        dates[anchor]
                    ),
                ));
            }
            let after_available = dates.len() - anchor - 1;
            if after_available < days_after {
                return Err(StudyError::invalid_window(
                    WindowKind::Event,
                    format!(
                        "{days_after} trading days after {} requested, only {after_available} available",
                        dates[anchor]
                    ),
                ));
            }
            Ok(anchor - days_before..anchor + days_after + 1)
        }
    }
}

fn resolve_estimation(
    dates: &[NaiveDate],
    spec: &EstimationWindowSpec,
    event_start: usize,
    gap: usize,
) -> Result<Range<usize>, StudyError> {
    match *spec {
        EstimationWindowSpec::Dates { start, end } => {
            resolve_bounds(dates, WindowKind::Estimation, start, end)
        }
        EstimationWindowSpec::Preceding { length } => {
            let end = event_start.checked_sub(gap).ok_or_else(|| {
                StudyError::invalid_window(
                    WindowKind::Estimation,
                    format!("a gap of {gap} trading days leaves no room before the event window"),
                )
            })?;
            let start = end.checked_sub(length).ok_or_else(|| {
                StudyError::invalid_window(
                    WindowKind::Estimation,
                    format!("{length} trading days requested, only {end} available before the gap"),
                )
            })?;
            Ok(start..end)
        }
    }
}

/// Rows whose date falls in `[start, end]`.
fn resolve_bounds(
    dates: &[NaiveDate],
    window: WindowKind,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Range<usize>, StudyError> {
    if start > end {
        return Err(StudyError::invalid_window(
            window,
            format!("start {start} is after end {end}"),
        ));
    }
    let lo = dates.partition_point(|d| *d < start);
    let hi = dates.partition_point(|d| *d <= end);
    Ok(lo..hi)
}

fn resolved(panel: &ReturnPanel) -> ResolvedWindow {
    let dates = panel.dates();
    // Both halves of a split are non-empty by construction.
    ResolvedWindow {
        start: dates.first().copied().unwrap_or_default(),
        end: dates.last().copied().unwrap_or_default(),
        rows: dates.len(),
    }
}
