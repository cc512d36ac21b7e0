//! Payloads exchanged with the simulation engine.
//!
//! Every coordinate pair on the wire is `[row, col]`; see [`CellCoord`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellCoord, Grid};

/// Policy model the engine is running, which bounds request sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVersion {
    /// Fixed action-space PPO policy.
    #[default]
    #[serde(rename = "ppo-v1.5")]
    PpoV15,
    /// Action-masked PPO policy with the wide exit table.
    #[serde(rename = "maskable-ppo")]
    MaskablePpo,
}

impl ModelVersion {
    /// Largest exit list the model accepts.
    #[must_use]
    pub const fn max_exits(self) -> usize {
        match self {
            Self::PpoV15 => 40,
            Self::MaskablePpo => 248,
        }
    }

    /// Largest agent count the model accepts.
    #[must_use]
    pub const fn max_agents(self) -> usize {
        5
    }

    /// Stable identifier used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PpoV15 => "ppo-v1.5",
            Self::MaskablePpo => "maskable-ppo",
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown model identifier.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown model version `{0}` (expected ppo-v1.5 or maskable-ppo)")]
pub struct UnknownModelVersion(pub String);

impl FromStr for ModelVersion {
    type Err = UnknownModelVersion;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ppo-v1.5" => Ok(Self::PpoV15),
            "maskable-ppo" => Ok(Self::MaskablePpo),
            other => Err(UnknownModelVersion(other.to_owned())),
        }
    }
}

/// How long fire keeps spreading in the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FireMode {
    /// Engine default fire duration.
    #[default]
    Standard,
    /// Fire keeps spreading for extra steps.
    Extended,
}

impl FireMode {
    /// Value of the `extended_fire_steps` wire flag.
    #[must_use]
    pub const fn extended_fire_steps(self) -> bool {
        matches!(self, Self::Extended)
    }
}

/// Body of a job submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Grid the simulation runs on.
    pub grid: Grid,
    /// User exits, or `null` to let the engine distribute its own.
    pub exits: Option<Vec<CellCoord>>,
    /// Cell where the fire starts.
    pub fire_position: CellCoord,
    /// Starting cell of every agent; duplicates allowed.
    pub agent_positions: Vec<CellCoord>,
    /// Whether the fire keeps spreading for extra steps.
    #[serde(default)]
    pub extended_fire_steps: bool,
}

/// Request that does not fit the selected model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LimitViolation {
    /// More exits than the model's exit table holds.
    #[error("{count} exits exceed the {max} supported by {model}")]
    TooManyExits {
        /// Exits in the request.
        count: usize,
        /// Model maximum.
        max: usize,
        /// Model the request targets.
        model: ModelVersion,
    },
    /// More agents than the model supports.
    #[error("{count} agents exceed the {max} supported by {model}")]
    TooManyAgents {
        /// Agents in the request.
        count: usize,
        /// Model maximum.
        max: usize,
        /// Model the request targets.
        model: ModelVersion,
    },
    /// No agents to simulate.
    #[error("at least one agent is required")]
    NoAgents,
}

impl SimulationRequest {
    /// Checks the request against the model's limits.
    pub fn check_limits(&self, model: ModelVersion) -> Result<(), LimitViolation> {
        if self.agent_positions.is_empty() {
            return Err(LimitViolation::NoAgents);
        }
        if self.agent_positions.len() > model.max_agents() {
            return Err(LimitViolation::TooManyAgents {
                count: self.agent_positions.len(),
                max: model.max_agents(),
                model,
            });
        }
        let exits = self.exits.as_ref().map_or(0, Vec::len);
        if exits > model.max_exits() {
            return Err(LimitViolation::TooManyExits {
                count: exits,
                max: model.max_exits(),
                model,
            });
        }
        Ok(())
    }
}

/// Response to a job submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTicket {
    /// Identifier used to poll the job.
    pub job_id: String,
}

/// Normalized job status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatusKind {
    /// Accepted but not started.
    Pending,
    /// Being simulated.
    Running,
    /// Finished; a result should be attached.
    Complete,
    /// The engine gave up on the job.
    Failed,
    /// Status the client does not act on, such as `not_found`.
    Unrecognized(String),
}

/// Body returned by the job status endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    /// Raw status string.
    pub status: String,
    /// Result payload, present once complete.
    #[serde(default)]
    pub result: Option<SimulationResult>,
    /// Engine error message, present once failed.
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatusResponse {
    /// Maps the raw status string onto a [`JobStatusKind`].
    #[must_use]
    pub fn kind(&self) -> JobStatusKind {
        match self.status.as_str() {
            "pending" | "queued" => JobStatusKind::Pending,
            "running" | "processing" => JobStatusKind::Running,
            "complete" | "completed" => JobStatusKind::Complete,
            "failed" | "error" => JobStatusKind::Failed,
            other => JobStatusKind::Unrecognized(other.to_owned()),
        }
    }
}

/// Outcome of one agent at a given time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Still inside and moving.
    #[serde(alias = "active")]
    Evacuating,
    /// Reached an exit.
    Escaped,
    /// Caught by the fire.
    Burned,
    /// Any status the client does not recognize.
    #[serde(other)]
    Unknown,
}

/// Behavioral state of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentMood {
    /// Moving normally.
    Calm,
    /// Aware of the fire.
    Alert,
    /// Close to the fire.
    Panicked,
    /// Any state the client does not recognize.
    #[serde(other)]
    Unknown,
}

/// One agent inside a frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFrame {
    /// Agent cell.
    pub pos: CellCoord,
    /// Agent status at this step.
    pub status: AgentStatus,
    /// Behavioral state at this step.
    #[serde(default)]
    pub state: Option<AgentMood>,
    /// Whether the agent is currently tripped.
    #[serde(default)]
    pub tripped: bool,
}

/// One time-step snapshot of a completed simulation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Step number; absent on some engine versions.
    #[serde(default)]
    pub step: Option<u32>,
    /// Agent snapshots in agent-index order.
    #[serde(default)]
    pub agents: Vec<AgentFrame>,
    /// Cells on fire.
    #[serde(default)]
    pub fire_map: Vec<CellCoord>,
    /// Exits in effect during this step, when reported.
    #[serde(default)]
    pub exits: Option<Vec<CellCoord>>,
}

/// Container for the frame history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationData {
    /// Ordered frames.
    #[serde(default)]
    pub history: Vec<Frame>,
}

/// Final outcome of a single agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutcome {
    /// Agent index.
    pub agent_id: u32,
    /// Final status.
    pub status: AgentStatus,
    /// Step the agent escaped at, if it did.
    #[serde(default)]
    pub exit_time: Option<u32>,
    /// Number of steps the agent walked.
    #[serde(default)]
    pub path_length: Option<u32>,
}

/// Result payload of a completed job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Agents simulated.
    pub total_agents: u32,
    /// Agents that escaped.
    pub escaped_count: u32,
    /// Agents caught by the fire.
    pub burned_count: u32,
    /// Steps simulated.
    pub time_steps: u32,
    /// Per-agent outcomes.
    #[serde(default)]
    pub agent_results: Vec<AgentOutcome>,
    /// Frame history, when the engine recorded one.
    #[serde(default)]
    pub animation_data: Option<AnimationData>,
    /// Exits after engine-side correction, when reported.
    #[serde(default)]
    pub exits: Option<Vec<CellCoord>>,
}

impl SimulationResult {
    /// Recorded frames, empty when no history was returned.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        self.animation_data
            .as_ref()
            .map_or(&[], |data| data.history.as_slice())
    }

    /// Agents neither escaped nor burned at the end of the run.
    #[must_use]
    pub fn remaining_count(&self) -> u32 {
        self.total_agents
            .saturating_sub(self.escaped_count)
            .saturating_sub(self.burned_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_null_exits_and_row_col_pairs() {
        let request = SimulationRequest {
            grid: Grid::from_rows(vec![vec![0, 0], vec![0, 0]]).expect("valid grid"),
            exits: None,
            fire_position: CellCoord::new(1, 0),
            agent_positions: vec![CellCoord::new(0, 1)],
            extended_fire_steps: false,
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "grid": [[0, 0], [0, 0]],
                "exits": null,
                "fire_position": [0, 1],
                "agent_positions": [[1, 0]],
                "extended_fire_steps": false,
            })
        );
    }

    #[test]
    fn limits_reject_oversized_requests() {
        let grid = Grid::from_rows(vec![vec![0; 50]]).expect("valid grid");
        let mut request = SimulationRequest {
            grid,
            exits: Some((0..41).map(|column| CellCoord::new(column, 0)).collect()),
            fire_position: CellCoord::new(0, 0),
            agent_positions: vec![CellCoord::new(1, 0)],
            extended_fire_steps: false,
        };
        assert!(matches!(
            request.check_limits(ModelVersion::PpoV15),
            Err(LimitViolation::TooManyExits { count: 41, max: 40, .. })
        ));
        assert_eq!(request.check_limits(ModelVersion::MaskablePpo), Ok(()));

        request.agent_positions = vec![CellCoord::new(1, 0); 6];
        assert!(matches!(
            request.check_limits(ModelVersion::MaskablePpo),
            Err(LimitViolation::TooManyAgents { count: 6, .. })
        ));
    }

    #[test]
    fn status_strings_are_normalized() {
        let response = |status: &str| JobStatusResponse {
            status: status.to_owned(),
            result: None,
            error: None,
        };
        assert_eq!(response("processing").kind(), JobStatusKind::Running);
        assert_eq!(response("complete").kind(), JobStatusKind::Complete);
        assert_eq!(
            response("not_found").kind(),
            JobStatusKind::Unrecognized("not_found".to_owned())
        );
    }

    #[test]
    fn engine_result_payload_decodes() {
        let json = r#"{
            "status": "complete",
            "result": {
                "total_agents": 1,
                "escaped_count": 1,
                "burned_count": 0,
                "time_steps": 2,
                "agent_results": [{"agent_id": 0, "status": "escaped", "exit_time": 2, "path_length": 4}],
                "commander_actions": [],
                "animation_data": {"history": [
                    {"fire_map": [[5, 5]], "agents": [{"pos": [2, 2], "status": "evacuating", "state": "CALM", "tripped": false}]},
                    {"fire_map": [[5, 5], [5, 6]], "agents": [{"pos": [1, 4], "status": "active", "state": "ALERT", "tripped": true}]}
                ]}
            }
        }"#;
        let response: JobStatusResponse = serde_json::from_str(json).expect("decode");
        let result = response.result.expect("result present");
        assert_eq!(result.frames().len(), 2);
        let agent = &result.frames()[1].agents[0];
        assert_eq!(agent.pos, CellCoord::from_row_col(1, 4));
        assert_eq!(agent.status, AgentStatus::Evacuating);
        assert_eq!(agent.state, Some(AgentMood::Alert));
        assert_eq!(result.remaining_count(), 0);
    }

    #[test]
    fn model_version_parses_config_names() {
        assert_eq!("maskable-ppo".parse::<ModelVersion>(), Ok(ModelVersion::MaskablePpo));
        assert!("ppo-v2".parse::<ModelVersion>().is_err());
        assert_eq!(ModelVersion::PpoV15.to_string(), "ppo-v1.5");
    }
}
