//! Submission and polling of simulation jobs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evacsim_core::{
    Command, JobStatusKind, JobStatusResponse, JobTicket, LimitViolation, ModelVersion,
    SimulationRequest, SimulationResult,
};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ServiceError;

/// Delay between two status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Status requests issued before a job is considered lost.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 600;

/// Evacuation engine endpoints.
#[async_trait]
pub trait SimulationService: Send + Sync {
    /// Queues a simulation and returns its ticket.
    async fn submit(&self, request: &SimulationRequest) -> Result<JobTicket, ServiceError>;

    /// Fetches the current status of a job.
    async fn status(&self, job_id: &str) -> Result<JobStatusResponse, ServiceError>;
}

/// Polling cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between attempts.
    pub interval: Duration,
    /// Maximum number of status requests.
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Reasons a run did not produce a result.
#[derive(Debug, Error)]
pub enum JobError {
    /// The request does not fit the selected model; nothing was sent.
    #[error("request rejected before submission: {0}")]
    InvalidRequest(#[from] LimitViolation),
    /// The job could not be submitted.
    #[error("could not submit simulation: {0}")]
    Network(#[source] ServiceError),
    /// The engine reported a failure.
    #[error("simulation failed: {message}")]
    Failed {
        /// Engine-provided message.
        message: String,
    },
    /// The attempt budget ran out.
    #[error("simulation did not finish after {attempts} status checks")]
    TimedOut {
        /// Requests issued.
        attempts: u32,
    },
    /// The run was abandoned locally.
    #[error("simulation was cancelled")]
    Cancelled,
    /// The engine reported completion without a payload.
    #[error("simulation completed without a result")]
    MissingResult,
}

/// Observable lifecycle of the current run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum JobState {
    /// Nothing started yet.
    #[default]
    Idle,
    /// Waiting for the engine to accept the job.
    Submitting,
    /// Waiting for the job to finish.
    Polling {
        /// Engine job identifier.
        job_id: String,
        /// 1-based attempt about to be issued.
        attempt: u32,
    },
    /// A result was captured.
    Complete,
    /// The engine failed the job or it could not be submitted.
    Failed {
        /// User-facing message.
        message: String,
    },
    /// The attempt budget ran out.
    TimedOut,
    /// The run was abandoned.
    Cancelled,
}

impl JobState {
    /// Whether the run has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Failed { .. } | Self::TimedOut | Self::Cancelled
        )
    }
}

/// Polls `job_id` until it completes, fails or the budget is exhausted.
///
/// Exactly one status request is issued per attempt. Transport errors and
/// unrecognized statuses are logged and retried on the next attempt.
pub async fn poll_job<S, F>(
    service: &S,
    job_id: &str,
    settings: PollSettings,
    cancel: &CancellationToken,
    mut on_attempt: F,
) -> Result<SimulationResult, JobError>
where
    S: SimulationService + ?Sized,
    F: FnMut(u32),
{
    for attempt in 1..=settings.max_attempts {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        on_attempt(attempt);

        match service.status(job_id).await {
            Ok(response) => match response.kind() {
                JobStatusKind::Complete => {
                    info!(job_id, attempt, "simulation complete");
                    return response.result.ok_or(JobError::MissingResult);
                }
                JobStatusKind::Failed => {
                    let message = response
                        .error
                        .unwrap_or_else(|| "the engine did not report a reason".to_owned());
                    return Err(JobError::Failed { message });
                }
                JobStatusKind::Pending | JobStatusKind::Running => {
                    debug!(job_id, attempt, status = %response.status, "job in progress");
                }
                JobStatusKind::Unrecognized(status) => {
                    warn!(job_id, attempt, %status, "unexpected job status");
                }
            },
            Err(error) => warn!(job_id, attempt, %error, "status request failed"),
        }

        if attempt < settings.max_attempts {
            tokio::select! {
                () = cancel.cancelled() => return Err(JobError::Cancelled),
                () = tokio::time::sleep(settings.interval) => {}
            }
        }
    }

    Err(JobError::TimedOut {
        attempts: settings.max_attempts,
    })
}

/// Maps the outcome of a run onto the session command that records it.
#[must_use]
pub fn into_command(outcome: Result<SimulationResult, JobError>) -> Command {
    match outcome {
        Ok(result) => Command::CompleteRun {
            result: Box::new(result),
        },
        Err(error) => Command::FailRun {
            message: error.to_string(),
        },
    }
}

/// Runs at most one job at a time.
pub struct JobOrchestrator {
    service: Arc<dyn SimulationService>,
    settings: PollSettings,
    model: ModelVersion,
    current: Option<CancellationToken>,
}

impl std::fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("settings", &self.settings)
            .field("model", &self.model)
            .field("running", &self.current.is_some())
            .finish()
    }
}

impl JobOrchestrator {
    /// Creates an orchestrator over the provided engine.
    #[must_use]
    pub fn new(
        service: Arc<dyn SimulationService>,
        settings: PollSettings,
        model: ModelVersion,
    ) -> Self {
        Self {
            service,
            settings,
            model,
            current: None,
        }
    }

    /// Spawns the submit and poll task, abandoning any previous run.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, request: SimulationRequest) -> JobHandle {
        self.cancel();

        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(JobState::Idle);
        let task = tokio::spawn(run_job(
            Arc::clone(&self.service),
            request,
            self.settings,
            self.model,
            cancel.clone(),
            state_tx,
        ));
        self.current = Some(cancel.clone());

        JobHandle {
            state: state_rx,
            cancel,
            task,
        }
    }

    /// Abandons the current run, if any. Nothing is sent to the engine.
    pub fn cancel(&mut self) {
        if let Some(previous) = self.current.take() {
            if !previous.is_cancelled() {
                info!("abandoning previous simulation run");
            }
            previous.cancel();
        }
    }
}

/// Handle to a spawned run.
#[derive(Debug)]
pub struct JobHandle {
    state: watch::Receiver<JobState>,
    cancel: CancellationToken,
    task: JoinHandle<Result<SimulationResult, JobError>>,
}

impl JobHandle {
    /// Latest published state.
    #[must_use]
    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    /// Abandons the run.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the run to end.
    pub async fn wait(self) -> Result<SimulationResult, JobError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(error) if error.is_cancelled() => Err(JobError::Cancelled),
            Err(error) => Err(JobError::Failed {
                message: error.to_string(),
            }),
        }
    }
}

async fn run_job(
    service: Arc<dyn SimulationService>,
    request: SimulationRequest,
    settings: PollSettings,
    model: ModelVersion,
    cancel: CancellationToken,
    state: watch::Sender<JobState>,
) -> Result<SimulationResult, JobError> {
    let outcome = drive(service.as_ref(), &request, settings, model, &cancel, &state).await;
    let last = match &outcome {
        Ok(_) => JobState::Complete,
        Err(JobError::TimedOut { .. }) => JobState::TimedOut,
        Err(JobError::Cancelled) => JobState::Cancelled,
        Err(error) => JobState::Failed {
            message: error.to_string(),
        },
    };
    let _ = state.send_replace(last);
    outcome
}

async fn drive(
    service: &dyn SimulationService,
    request: &SimulationRequest,
    settings: PollSettings,
    model: ModelVersion,
    cancel: &CancellationToken,
    state: &watch::Sender<JobState>,
) -> Result<SimulationResult, JobError> {
    request.check_limits(model)?;

    let _ = state.send_replace(JobState::Submitting);
    let ticket = tokio::select! {
        () = cancel.cancelled() => return Err(JobError::Cancelled),
        submitted = service.submit(request) => submitted.map_err(JobError::Network)?,
    };
    info!(job_id = %ticket.job_id, "simulation submitted");

    poll_job(service, &ticket.job_id, settings, cancel, |attempt| {
        let _ = state.send_replace(JobState::Polling {
            job_id: ticket.job_id.clone(),
            attempt,
        });
    })
    .await
}
