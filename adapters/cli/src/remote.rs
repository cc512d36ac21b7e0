//! Subcommands that talk to the engine, the image service and the library.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use evacsim_core::{Command, FireMode, GridCorrection, Stage};
use evacsim_engine_client::http::{
    HttpFloorPlanRepository, HttpImageGridService, HttpSimulationService,
};
use evacsim_engine_client::{
    decode_data_url, encode_data_url, into_command, process_floor_plan, FloorPlanRepository,
    FloorPlanUpdate, ImageKind, ImageUpload, JobOrchestrator, JobState, ListFilter, ListQuery,
    NewFloorPlan, ServiceError,
};
use evacsim_world::query;
use tracing::{debug, info, warn};

use crate::wizard::Wizard;
use crate::{render, report, App};

/// Label stored with plans produced by the image service.
const PROCESSING_METHOD: &str = "unet";

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum FilterArg {
    All,
    Mine,
    Public,
}

impl From<FilterArg> for ListFilter {
    fn from(filter: FilterArg) -> Self {
        match filter {
            FilterArg::All => ListFilter::All,
            FilterArg::Mine => ListFilter::Mine,
            FilterArg::Public => ListFilter::Public,
        }
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum LibraryAction {
    /// List saved floor plans
    List {
        /// Which plans to show
        #[arg(long, value_enum, default_value = "all")]
        filter: FilterArg,
        /// Search names, descriptions and uploaders
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Show one plan
    Get {
        id: u64,
        /// Replace the wizard state with the plan's grid
        #[arg(long)]
        load: bool,
    },
    /// Save the current grid as a new plan
    Save {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Make the plan visible to everyone
        #[arg(long)]
        public: bool,
    },
    /// Change a plan you own
    Update {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        public: Option<bool>,
        /// Replace the stored grid with the current one
        #[arg(long)]
        grid: bool,
    },
    /// Delete a plan you own
    Delete { id: u64 },
    /// Copy a public or owned plan
    Clone {
        id: u64,
        /// Name of the copy; the server picks one otherwise
        #[arg(long)]
        name: Option<String>,
    },
}

/// `process`: uploads an image file and loads the resulting grid.
pub(crate) async fn process(
    app: &App,
    image: &Path,
    save_as: Option<String>,
    no_invert: bool,
    public: bool,
) -> Result<()> {
    let bytes =
        std::fs::read(image).with_context(|| format!("cannot read {}", image.display()))?;
    let name = image
        .file_name()
        .map_or_else(|| "floor-plan".to_owned(), |name| name.to_string_lossy().into_owned());
    let correction = if no_invert {
        GridCorrection::disabled()
    } else {
        app.config.grid.correction()
    };

    let Some(wizard) = process_bytes(app, name, &bytes, correction).await? else {
        return Ok(());
    };
    if let Some(name) = save_as {
        let repository = repository(app)?;
        save_plan(app, &repository, &wizard, name, None, public, Some(&bytes)).await?;
    }
    Ok(())
}

/// Sends image bytes through the grid service and loads the result.
///
/// Returns `None` when the bytes were refused before upload.
pub(crate) async fn process_bytes(
    app: &App,
    name: String,
    bytes: &[u8],
    correction: GridCorrection,
) -> Result<Option<Wizard>> {
    let upload = match ImageUpload::new(name, bytes.to_vec()) {
        Ok(upload) => upload,
        Err(error) => {
            println!("rejected: {error}");
            return Ok(None);
        }
    };

    let service =
        HttpImageGridService::new(&app.config.engine.base_url, app.config.engine.request_timeout())?;
    info!(file = upload.file_name(), bytes = upload.bytes().len(), "processing floor plan");
    let processed = process_floor_plan(&service, &upload, correction)
        .await
        .context("floor plan processing failed")?;
    if processed.inverted {
        info!("walls dominated the detected grid, inverted");
    }

    let mut wizard = app.wizard();
    let mut commands = Vec::with_capacity(2);
    if wizard.stage() != Stage::Upload {
        commands.push(Command::Reset);
    }
    commands.push(Command::LoadGrid {
        grid: processed.grid,
        background: Some(processed.background),
    });
    report(&wizard.dispatch(commands));
    wizard.save();
    Ok(Some(wizard))
}

/// `run`: submits the configured simulation and records the outcome.
pub(crate) async fn run(app: &App, extended_fire: bool) -> Result<()> {
    let mut wizard = app.wizard();
    if wizard.stage() == Stage::Results {
        report(&wizard.dispatch([Command::Reconfigure]));
    }
    let fire_mode = if extended_fire {
        FireMode::Extended
    } else {
        FireMode::Standard
    };
    let Some(request) = query::run_request(wizard.session(), fire_mode) else {
        println!("set a fire origin and at least one agent before running");
        wizard.save();
        return Ok(());
    };
    report(&wizard.dispatch([Command::BeginRun]));
    if wizard.stage() != Stage::Running {
        wizard.save();
        return Ok(());
    }

    let service = Arc::new(HttpSimulationService::new(
        &app.config.engine.base_url,
        app.config.engine.request_timeout(),
    )?);
    let mut orchestrator =
        JobOrchestrator::new(service, app.config.engine.poll_settings(), app.config.engine.model);
    let handle = orchestrator.start(request);

    let mut progress = handle.subscribe();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = progress.borrow_and_update().clone();
            match &state {
                JobState::Submitting => info!("submitting simulation"),
                JobState::Polling { job_id, attempt: 1 } => {
                    info!(%job_id, "simulation accepted, waiting for the result");
                }
                JobState::Polling { job_id, attempt } => debug!(%job_id, attempt, "polling"),
                _ => {}
            }
            if state.is_finished() {
                break;
            }
        }
    });

    let outcome = handle.wait().await;
    if let Err(error) = &outcome {
        warn!(%error, "simulation run failed");
    }
    let _ = reporter.await;

    report(&wizard.dispatch([into_command(outcome)]));
    wizard.save();
    if let Some(result) = query::result(wizard.session()) {
        println!(
            "{} agent(s): {} escaped, {} burned, {} remaining after {} step(s)",
            result.total_agents,
            result.escaped_count,
            result.burned_count,
            result.remaining_count(),
            result.time_steps
        );
        println!("{} frame(s) available for replay", result.frames().len());
    }
    Ok(())
}

/// `library`: floor-plan library operations.
pub(crate) async fn library(app: &App, action: LibraryAction) -> Result<()> {
    let repository = repository(app)?;
    match action {
        LibraryAction::List {
            filter,
            search,
            page,
            limit,
        } => {
            let query = ListQuery {
                filter: filter.into(),
                search,
                page,
                limit,
            };
            let page = repository.list(&query).await.map_err(library_error)?;
            if page.floor_plans.is_empty() {
                println!("no floor plans found");
            }
            for plan in &page.floor_plans {
                let visibility = if plan.is_public { "public" } else { "private" };
                println!(
                    "{:>6}  {}  {}x{}  {} exit(s)  {visibility}  by {}",
                    plan.id,
                    plan.name,
                    plan.grid_width,
                    plan.grid_height,
                    plan.exit_count,
                    plan.uploader_name
                );
            }
            let pagination = page.pagination;
            println!(
                "page {}/{} ({} plan(s))",
                pagination.page,
                pagination.total_pages.max(1),
                pagination.total
            );
        }
        LibraryAction::Get { id, load } => {
            let record = repository.get(id).await.map_err(library_error)?;
            println!("{} `{}` by {}", record.id, record.name, record.uploader_name);
            if let Some(description) = &record.description {
                println!("{description}");
            }
            println!(
                "{}x{} grid, {} exit(s), processed with {}, created {}",
                record.grid_width,
                record.grid_height,
                record.exit_count,
                record.processing_method,
                record.created_at
            );
            if let Some(source) = record.cloned_from_id {
                println!("cloned from plan {source}");
            }
            if load {
                let Some(grid) = record.grid()? else {
                    println!("plan {id} has no grid data");
                    return Ok(());
                };
                let background = record
                    .thumbnail
                    .as_deref()
                    .and_then(|url| decode_data_url(url).ok());
                let mut wizard = app.wizard();
                let mut commands = Vec::with_capacity(2);
                if wizard.stage() != Stage::Upload {
                    commands.push(Command::Reset);
                }
                commands.push(Command::LoadGrid { grid, background });
                report(&wizard.dispatch(commands));
                wizard.save();
            }
        }
        LibraryAction::Save {
            name,
            description,
            public,
        } => {
            let wizard = app.wizard();
            save_plan(app, &repository, &wizard, name, description, public, None).await?;
        }
        LibraryAction::Update {
            id,
            name,
            description,
            public,
            grid,
        } => {
            let mut update = FloorPlanUpdate {
                name,
                description,
                is_public: public,
                ..FloorPlanUpdate::default()
            };
            if grid {
                let wizard = app.wizard();
                let Some(current) = query::grid(wizard.session()) else {
                    println!("no floor plan loaded");
                    return Ok(());
                };
                update.thumbnail = Some(thumbnail_url(app, &wizard)?);
                update.grid_data = Some(current.clone());
                update.exit_count = Some(exit_count(&wizard));
            }
            let record = repository
                .update(id, &update)
                .await
                .map_err(library_error)?;
            println!("updated plan {} `{}`", record.id, record.name);
        }
        LibraryAction::Delete { id } => {
            repository.delete(id).await.map_err(library_error)?;
            println!("deleted plan {id}");
        }
        LibraryAction::Clone { id, name } => {
            let summary = repository
                .clone_plan(id, name.as_deref())
                .await
                .map_err(library_error)?;
            println!("cloned plan {id} into {} `{}`", summary.id, summary.name);
        }
    }
    Ok(())
}

fn repository(app: &App) -> Result<HttpFloorPlanRepository> {
    Ok(
        HttpFloorPlanRepository::new(&app.config.api.base_url, app.config.engine.request_timeout())?
            .with_auth_token(app.config.api.auth_token.clone()),
    )
}

fn library_error(error: ServiceError) -> anyhow::Error {
    match error {
        ServiceError::Unauthorized => {
            anyhow::anyhow!("the library requires signing in; pass --auth-token")
        }
        other => anyhow::Error::new(other).context("floor plan library request failed"),
    }
}

#[allow(clippy::too_many_arguments)]
async fn save_plan(
    app: &App,
    repository: &dyn FloorPlanRepository,
    wizard: &Wizard,
    name: String,
    description: Option<String>,
    public: bool,
    original: Option<&[u8]>,
) -> Result<()> {
    let session = wizard.session();
    let Some(grid) = query::grid(session) else {
        println!("no floor plan loaded");
        return Ok(());
    };
    let original = original.or_else(|| query::background(session));
    let original_image = original.and_then(|bytes| {
        ImageKind::detect(bytes).map(|kind| encode_data_url(kind.mime(), bytes))
    });

    let plan = NewFloorPlan {
        name,
        description,
        grid_data: grid.clone(),
        thumbnail: Some(thumbnail_url(app, wizard)?),
        original_image,
        is_public: public,
        exit_count: exit_count(wizard),
        processing_method: PROCESSING_METHOD.to_owned(),
    };
    let summary = repository.create(&plan).await.map_err(library_error)?;
    println!("saved plan {} `{}`", summary.id, summary.name);
    Ok(())
}

fn thumbnail_url(app: &App, wizard: &Wizard) -> Result<String> {
    let session = wizard.session();
    let grid = query::grid(session).context("no floor plan loaded")?;
    let scene = render::placement_scene(session, grid, app.space, true, None, None)?;
    Ok(encode_data_url("image/png", &render::thumbnail(&scene)?))
}

fn exit_count(wizard: &Wizard) -> u32 {
    u32::try_from(query::exits(wizard.session()).len()).unwrap_or(u32::MAX)
}
