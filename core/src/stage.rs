//! Wizard stage machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stage of the floor-plan to simulation wizard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Waiting for a floor-plan image or builder export.
    #[default]
    Upload,
    /// Placing exits and the assembly point on the processed grid.
    Exits,
    /// Configuring fire, agents and simulation exits.
    Setup,
    /// A job is in flight against the simulation engine.
    Running,
    /// A completed result is available for replay.
    Results,
}

/// Input that drives a stage transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageTrigger {
    /// A grid was produced by the image-to-grid service.
    GridLoaded,
    /// The user accepted the placed exits.
    ExitsConfirmed,
    /// A simulation job was started.
    RunStarted,
    /// The engine returned a result.
    RunCompleted,
    /// Submission or polling failed, or the job timed out.
    RunFailed,
    /// The user navigated back from setup to exit placement.
    BackToExits,
    /// The user navigated back from exit placement to upload.
    BackToUpload,
    /// The user wants to tweak the configuration after viewing results.
    Reconfigure,
    /// Start over from scratch.
    Reset,
}

/// Error returned for transitions the wizard does not allow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum StageError {
    /// The trigger is not valid from the current stage.
    #[error("cannot apply {trigger:?} while in {from:?}")]
    InvalidTransition {
        /// Stage the wizard was in.
        from: Stage,
        /// Trigger that was rejected.
        trigger: StageTrigger,
    },
    /// The command only applies to a different stage.
    #[error("only allowed in {expected:?}, currently in {actual:?}")]
    WrongStage {
        /// Stage the command requires.
        expected: Stage,
        /// Stage the wizard was in.
        actual: Stage,
    },
    /// A run needs a fire origin and at least one agent.
    #[error("set a fire origin and at least one agent before running")]
    RunNotReady,
}

impl Stage {
    /// Pure transition function for the wizard.
    pub fn transition(self, trigger: StageTrigger) -> Result<Stage, StageError> {
        use Stage::*;
        use StageTrigger as T;

        match (self, trigger) {
            (_, T::Reset) => Ok(Upload),
            (Upload, T::GridLoaded) => Ok(Exits),
            (Exits, T::ExitsConfirmed) => Ok(Setup),
            (Exits, T::BackToUpload) => Ok(Upload),
            (Setup, T::RunStarted) => Ok(Running),
            (Setup, T::BackToExits) => Ok(Exits),
            (Running, T::RunCompleted) => Ok(Results),
            (Running, T::RunFailed) => Ok(Setup),
            (Results, T::Reconfigure) => Ok(Setup),
            (from, trigger) => Err(StageError::InvalidTransition { from, trigger }),
        }
    }

    /// Stage a persisted snapshot resumes in; a running job never survives.
    #[must_use]
    pub const fn persisted(self) -> Stage {
        match self {
            Stage::Running => Stage::Setup,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_results() {
        let stage = [
            StageTrigger::GridLoaded,
            StageTrigger::ExitsConfirmed,
            StageTrigger::RunStarted,
            StageTrigger::RunCompleted,
        ]
        .into_iter()
        .try_fold(Stage::Upload, Stage::transition)
        .expect("happy path is valid");
        assert_eq!(stage, Stage::Results);
    }

    #[test]
    fn failed_run_returns_to_setup() {
        assert_eq!(
            Stage::Running.transition(StageTrigger::RunFailed),
            Ok(Stage::Setup)
        );
    }

    #[test]
    fn reset_is_valid_from_every_stage() {
        for stage in [
            Stage::Upload,
            Stage::Exits,
            Stage::Setup,
            Stage::Running,
            Stage::Results,
        ] {
            assert_eq!(stage.transition(StageTrigger::Reset), Ok(Stage::Upload));
        }
    }

    #[test]
    fn skipping_stages_is_rejected() {
        assert_eq!(
            Stage::Upload.transition(StageTrigger::RunStarted),
            Err(StageError::InvalidTransition {
                from: Stage::Upload,
                trigger: StageTrigger::RunStarted,
            })
        );
        assert!(Stage::Results.transition(StageTrigger::RunCompleted).is_err());
    }

    #[test]
    fn running_is_persisted_as_setup() {
        assert_eq!(Stage::Running.persisted(), Stage::Setup);
        assert_eq!(Stage::Exits.persisted(), Stage::Exits);
    }
}
