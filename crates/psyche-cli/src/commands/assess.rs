//! Offline scoring of a recorded history file

use psyche_adaptive::SelectionPhase;
use psyche_engine::EngineConfig;
use psyche_scoring::ScoringKernel;
use psyche_types::{
    AdaptiveState, AxisState, DomainLayout, NodeId, PatternFlags, ResponseEvent, ResponseHistory,
};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{CliError, CliResult};
use crate::output::{print_json, print_success, print_warning};

/// Full evaluation of a history
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub responses: usize,
    pub axes: AxisState,
    pub display_axes: AxisState,
    pub adaptive: AdaptiveState,
    pub flags: PatternFlags,
}

/// Next-item recommendation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextReport {
    pub suggested_next_node_id: Option<NodeId>,
    pub phase: Option<SelectionPhase>,
    pub clarity: f64,
    pub is_complete: bool,
}

/// Read a JSON array of response events.
pub fn load_history(path: &Path) -> CliResult<ResponseHistory> {
    let raw = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let events: Vec<ResponseEvent> = serde_json::from_str(&raw)?;
    Ok(ResponseHistory::from_events(events)?)
}

pub fn score_report(history: &ResponseHistory, config: &EngineConfig) -> ScoreReport {
    let layout = DomainLayout::standard();
    let events = history.events();
    let axes = ScoringKernel::standard().score(events);

    ScoreReport {
        responses: events.len(),
        axes,
        display_axes: axes.rounded(),
        adaptive: config.assessment.controller(layout.clone()).evaluate(events, None),
        flags: config.assessment.validity_detector(&layout).analyze(events),
    }
}

pub fn next_report(
    history: &ResponseHistory,
    exclude: Option<u32>,
    config: &EngineConfig,
) -> NextReport {
    let controller = config.assessment.controller(DomainLayout::standard());
    let excluded = exclude.map(NodeId::new);
    let state = controller.evaluate(history.events(), excluded);
    let selection = controller.select(history.events(), &state.contradictions, excluded);

    NextReport {
        suggested_next_node_id: selection.map(|s| s.node_id),
        phase: selection.map(|s| s.phase),
        clarity: state.clarity,
        is_complete: state.is_complete,
    }
}

pub fn execute_score(path: &Path, config: &EngineConfig) -> CliResult<()> {
    let history = load_history(path)?;
    let report = score_report(&history, config);
    print_json(&report)?;

    if report.flags.is_suspect() {
        print_warning(&format!(
            "Session flagged: {}",
            report.flags.reasons().join(", ")
        ));
    } else if report.flags.is_early_termination {
        print_warning("Session ended early");
    } else {
        print_success("Session passed validity checks");
    }
    Ok(())
}

pub fn execute_next(path: &Path, exclude: Option<u32>, config: &EngineConfig) -> CliResult<()> {
    let history = load_history(path)?;
    print_json(&next_report(&history, exclude, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_history(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    const TWO_EVENTS: &str = r#"[
        {"nodeId": 0, "domain": "foundation", "beliefKey": "scarcity_mindset",
         "latencyMs": 2000, "sensation": "s0", "choicePosition": 0},
        {"nodeId": 1, "domain": "foundation", "beliefKey": "not_a_key",
         "latencyMs": 1500, "sensation": "s1", "choicePosition": -1}
    ]"#;

    #[test]
    fn test_load_and_score() {
        let file = write_history(TWO_EVENTS);
        let history = load_history(file.path()).unwrap();
        assert_eq!(history.len(), 2);

        let report = score_report(&history, &EngineConfig::default());
        assert_eq!(report.responses, 2);
        assert!(report.axes.is_bounded());
        assert_eq!(report.adaptive.suggested_next_node_id, Some(NodeId(2)));
    }

    #[test]
    fn test_next_respects_exclusion() {
        let file = write_history(TWO_EVENTS);
        let history = load_history(file.path()).unwrap();
        let report = next_report(&history, Some(2), &EngineConfig::default());
        assert_eq!(report.suggested_next_node_id, Some(NodeId(12)));
        assert_eq!(report.phase, Some(SelectionPhase::DomainFloor));
    }

    #[test]
    fn test_rejects_duplicates_and_bad_positions() {
        let dup = write_history(
            r#"[{"nodeId": 0, "domain": "foundation", "beliefKey": "default",
                "latencyMs": 1, "sensation": "s0", "choicePosition": 0},
               {"nodeId": 0, "domain": "foundation", "beliefKey": "default",
                "latencyMs": 1, "sensation": "s0", "choicePosition": 1}]"#,
        );
        assert!(matches!(load_history(dup.path()), Err(CliError::History(_))));

        let bad = write_history(
            r#"[{"nodeId": 0, "domain": "foundation", "beliefKey": "default",
                "latencyMs": 1, "sensation": "s0", "choicePosition": 7}]"#,
        );
        assert!(matches!(load_history(bad.path()), Err(CliError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_history(Path::new("/nonexistent/history.json")),
            Err(CliError::Read { .. })
        ));
    }
}
