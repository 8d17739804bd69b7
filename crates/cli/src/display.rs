//! Plain-text rendering of sessions, configurations and analyses.

use smed_analysis::{top_delays, AnalysisDataset, DEFAULT_TOP_DELAYS};
use smed_core::{ms_to_minutes, ChangeoverConfig, LastRun};
use smed_session::{Clock, LaneView, ObjectivesSummary, PreparationProgress, Session, StepStatus};

const PENDING: &str = "pending";

/// Elapsed time as `HH:MM:SS`, whole seconds.
pub fn format_hms(ms: u64) -> String {
    let total = ms / 1000;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Minutes with one decimal.
pub fn format_minutes(minutes: f64) -> String {
    format!("{:.1} min", minutes)
}

/// Signed minutes with one decimal; values that round to zero carry no sign.
pub fn format_delta(minutes: f64) -> String {
    let rounded = (minutes * 10.0).round() / 10.0;
    if rounded > 0.0 {
        format!("+{:.1} min", rounded)
    } else if rounded < 0.0 {
        format!("{:.1} min", rounded)
    } else {
        "0.0 min".to_string()
    }
}

fn or_pending(value: Option<String>) -> String {
    value.unwrap_or_else(|| PENDING.to_string())
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.0} %", v))
}

/// One line per lane, with the step list below.
pub fn render_lanes(lanes: &[LaneView]) -> String {
    let mut out = String::new();
    for lane in lanes {
        out.push_str(&format!(
            "{} ({}) {}/{} [{}%]\n",
            lane.operator_name,
            lane.operator_id,
            lane.completed,
            lane.total,
            lane.progress_percent()
        ));
        for step in &lane.steps {
            let (marker, detail) = match step.status {
                StepStatus::Done { actual_ms } => (
                    "x",
                    format!(
                        "{} ({})",
                        format_minutes(ms_to_minutes(actual_ms)),
                        format_delta(ms_to_minutes(actual_ms) - step.target_minutes)
                    ),
                ),
                StepStatus::Active => (">", "in progress".to_string()),
                StepStatus::Waiting => (" ", String::new()),
            };
            out.push_str(&format!(
                "  [{}] {} · {} (target {}) {}\n",
                marker,
                step.phase_name,
                step.label,
                format_minutes(step.target_minutes),
                detail
            ));
        }
    }
    out
}

/// Phase targets against live totals.
pub fn render_objectives(summary: &ObjectivesSummary) -> String {
    let mut out = String::new();
    for phase in &summary.phases {
        out.push_str(&format!(
            "  {:<20} target {:>10}  actual {:>10}\n",
            phase.name,
            format_minutes(phase.target_minutes),
            or_pending(phase.actual_ms.map(|ms| format_minutes(ms_to_minutes(ms))))
        ));
    }
    out.push_str(&format!(
        "  {:<20} target {:>10}  actual {:>10}\n",
        "Total",
        format_minutes(summary.target_minutes),
        or_pending(summary.actual_ms.map(|ms| format_minutes(ms_to_minutes(ms))))
    ));
    out
}

fn render_preparation(progress: PreparationProgress) -> String {
    if progress.total == 0 {
        "Preparation: none".to_string()
    } else {
        format!("Preparation: {}/{} ready", progress.ready, progress.total)
    }
}

/// Timer, preparation and objectives of a session.
pub fn render_status<C: Clock>(session: &Session<C>) -> String {
    let run = session.run_state();
    let state = if run.running {
        "running"
    } else if run.has_started {
        "paused"
    } else {
        "not started"
    };
    let mut out = format!("Elapsed {} ({})\n", format_hms(run.elapsed_ms), state);
    out.push_str(&render_preparation(session.preparation_progress()));
    out.push('\n');
    if session.is_session_complete() {
        out.push_str("All operations recorded.\n");
    }
    out.push_str(&render_objectives(&session.objectives_summary()));
    out
}

/// Operators, phases and operations with their ids.
pub fn render_config(config: &ChangeoverConfig, last_run: Option<&LastRun>) -> String {
    let mut out = String::from("Operators:\n");
    for operator in &config.operators {
        out.push_str(&format!("  {:<12} {}\n", operator.id, operator.name));
    }
    for phase in &config.phases {
        let kind = if phase.is_external { " [preparation]" } else { "" };
        out.push_str(&format!(
            "\n{} ({}){} - {}\n",
            phase.name,
            phase.id,
            kind,
            format_minutes(phase.target_minutes())
        ));
        for (index, op) in phase.operations.iter().enumerate() {
            out.push_str(&format!(
                "  {:>2}. {:<12} {:<40} {:<12} {:>9}\n",
                index,
                op.id,
                op.label,
                config.operator_name(&op.operator_id),
                format_minutes(op.target_minutes)
            ));
        }
    }
    out.push_str(&format!(
        "\nInternal target: {}\n",
        format_minutes(config.internal_target_minutes())
    ));
    match last_run {
        Some(run) => out.push_str(&format!(
            "Last completed run: {} ({} results)\n",
            run.generated_at.format("%Y-%m-%d %H:%M"),
            run.results.len()
        )),
        None => out.push_str("No completed run yet\n"),
    }
    out
}

/// Operation table, phase roll-ups, global totals and the delay ranking.
pub fn render_analysis(dataset: &AnalysisDataset) -> String {
    let mut out = format!(
        "{:<16} {:<36} {:<12} {:>9} {:>10} {:>10} {:>7}\n",
        "Phase", "Operation", "Operator", "Target", "Actual", "Delta", "Achv."
    );
    for row in &dataset.operations {
        out.push_str(&format!(
            "{:<16} {:<36} {:<12} {:>9} {:>10} {:>10} {:>7}\n",
            row.phase_name,
            row.label,
            row.operator_name,
            format_minutes(row.target_minutes),
            or_pending(row.actual_minutes().map(format_minutes)),
            or_pending(row.delta_minutes().map(format_delta)),
            percent(row.achievement())
        ));
    }

    out.push_str("\nBy phase:\n");
    for phase in &dataset.phases {
        out.push_str(&format!(
            "  {:<20} {:>9} {:>10} {:>10} {:>7}\n",
            phase.name,
            format_minutes(phase.target_minutes),
            or_pending(phase.actual_minutes.map(format_minutes)),
            or_pending(phase.delta_minutes.map(format_delta)),
            percent(phase.achievement_percent)
        ));
    }
    let global = &dataset.global;
    out.push_str(&format!(
        "  {:<20} {:>9} {:>10} {:>10} {:>7}\n",
        "Total",
        format_minutes(global.target_minutes),
        or_pending(global.actual_minutes.map(format_minutes)),
        or_pending(global.delta_minutes.map(format_delta)),
        percent(global.achievement_percent)
    ));

    let delays = top_delays(&dataset.operations, DEFAULT_TOP_DELAYS);
    if !delays.is_empty() {
        out.push_str("\nLargest delays:\n");
        for (index, row) in delays.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {} · {} ({})\n",
                index + 1,
                row.phase_name,
                row.label,
                or_pending(row.delta_minutes().map(format_delta))
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use smed_analysis::{build_dataset, AnalysisFilter, SortSpec};
    use smed_core::SessionResults;

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(570_999), "00:09:30");
        assert_eq!(format_hms(3_723_000), "01:02:03");
    }

    #[test]
    fn test_format_delta_sign() {
        assert_eq!(format_delta(1.0), "+1.0 min");
        assert_eq!(format_delta(-0.5), "-0.5 min");
        assert_eq!(format_delta(-0.04), "0.0 min");
    }

    #[test]
    fn test_pending_rendered_as_pending() {
        let config = ChangeoverConfig::demo();
        let dataset = build_dataset(
            &config,
            &SessionResults::new(),
            None,
            &AnalysisFilter::default(),
            SortSpec::default(),
        );
        let text = render_analysis(&dataset);
        assert!(text.contains(PENDING));
        assert!(!text.contains("Largest delays"));
    }
}
