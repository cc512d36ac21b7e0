#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives the evacuation planner.
//!
//! Every invocation restores the wizard session from the local store, turns
//! the subcommand into session commands through the same systems an
//! interactive front end would use, prints the resulting events and saves
//! the session again.

mod config;
mod drawings;
mod plan_transfer;
mod remote;
mod render;
mod wizard;

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use evacsim_core::{
    CellCoord, Command, DisplayTransform, Event, GridSpace, ModelVersion, Stage,
};
use evacsim_local_store::LocalStore;
use evacsim_rendering::FireAnimator;
use evacsim_system_configurator::{
    Configurator, ConfiguratorInput, PlacementMode, SetupView, Strategy,
};
use evacsim_system_exit_placer::{ExitPlacer, PlacementView, PlacerInput, PlacerMode};
use evacsim_system_floor_plan_builder::{
    export_png, BuilderSpace, ClickOutcome, DrawingLibrary, Edge, FloorPlanBuilder, ObjectKind,
    Tool,
};
use evacsim_system_replay::{ReplayEngine, ReplayView};
use evacsim_world::{query, PlacementRules};
use glam::Vec2;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Config;
use crate::drawings::{load_builder, save_builder, LocalDrawingStore};
use crate::plan_transfer::PlanTransfer;
use crate::wizard::{cell_label, describe, Wizard};

/// Floor plan to evacuation simulation planner.
#[derive(Parser, Debug)]
#[command(name = "evacsim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to ./evacsim.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding wizard state and drawings (also: EVACSIM_STORE_DIR)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Simulation engine and image service URL (also: EVACSIM_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Floor-plan library API URL (also: EVACSIM_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Simulation model: ppo-v1.5 or maskable-ppo
    #[arg(long, global = true)]
    model: Option<ModelVersion>,

    /// Session token for the floor-plan library (also: EVACSIM_AUTH_TOKEN)
    #[arg(long, global = true)]
    auth_token: Option<String>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Convert a floor-plan image into a grid and start placing exits
    Process {
        /// PNG or JPEG floor plan
        image: PathBuf,
        /// Also save the processed plan to the library under this name
        #[arg(long)]
        save_as: Option<String>,
        /// Keep the grid as detected even when walls dominate
        #[arg(long)]
        no_invert: bool,
        /// Make the saved plan visible to everyone
        #[arg(long, requires = "save_as")]
        public: bool,
    },
    /// Show the current wizard state
    Status,
    /// Place exits and the assembly point
    Exits {
        #[command(subcommand)]
        action: ExitsAction,
    },
    /// Configure fire, agents and simulation exits
    Setup {
        #[command(subcommand)]
        action: SetupAction,
    },
    /// Submit the configured simulation and wait for the result
    Run {
        /// Let the fire keep spreading for extra steps
        #[arg(long)]
        extended_fire: bool,
    },
    /// Step through the last simulation result
    Replay {
        /// Frame to show, or to start playing from
        #[arg(long)]
        frame: Option<usize>,
        /// Write the frame as PNG
        #[arg(long)]
        out: Option<PathBuf>,
        /// Playback speed, 1..=10
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
        speed: Option<u8>,
        /// Play to the end in real time
        #[arg(long)]
        play: bool,
    },
    /// Draw a floor plan from walls and doors
    Build {
        #[command(subcommand)]
        action: BuildAction,
    },
    /// Manage floor plans stored in the library
    Library {
        #[command(subcommand)]
        action: remote::LibraryAction,
    },
    /// Share a placed plan as a single line of text
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },
    /// Discard the wizard state
    Reset,
}

#[derive(Subcommand, Debug)]
enum ExitsAction {
    /// Place an exit
    Add { row: u32, col: u32 },
    /// Remove the exit or assembly point at a cell
    Remove { row: u32, col: u32 },
    /// Remove the most recently placed exit
    Undo,
    /// Remove every exit
    Clear,
    /// Place or move the assembly point
    Assembly { row: u32, col: u32 },
    /// List exits, optionally rendering the placement view
    List {
        /// Write the placement view as PNG
        #[arg(long)]
        out: Option<PathBuf>,
        /// Hide the wall overlay
        #[arg(long)]
        no_overlay: bool,
        /// Highlight a cell, emphasizing the exit under it
        #[arg(long, num_args = 2, value_names = ["ROW", "COL"])]
        hover: Option<Vec<u32>>,
    },
    /// Accept the exits and continue to setup
    Confirm,
    /// Return to upload
    Back,
}

#[derive(Subcommand, Debug)]
enum SetupAction {
    /// Generate fire, agents and exits automatically
    Auto {
        /// Number of agents
        #[arg(long)]
        agents: Option<usize>,
        /// Seed for a reproducible configuration
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Set the number of agents to place by hand
    Agents { count: usize },
    /// Set the fire origin
    Fire { row: u32, col: u32 },
    /// Add an agent starting cell
    Agent { row: u32, col: u32 },
    /// Add a simulation exit
    Exit { row: u32, col: u32 },
    /// Remove fire, agents and simulation exits
    Clear,
    /// Print the setup, optionally rendering it
    Show {
        /// Write the setup view as PNG
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Return to exit placement
    Back,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Wall,
    Door,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EdgeArg {
    Left,
    Right,
    Top,
    Bottom,
}

impl From<EdgeArg> for Edge {
    fn from(edge: EdgeArg) -> Self {
        match edge {
            EdgeArg::Left => Edge::Left,
            EdgeArg::Right => Edge::Right,
            EdgeArg::Top => Edge::Top,
            EdgeArg::Bottom => Edge::Bottom,
        }
    }
}

#[derive(Subcommand, Debug)]
enum BuildAction {
    /// Place a wall or door at a canvas pixel
    Place { kind: KindArg, x: f32, y: f32 },
    /// Move the object under a pixel so its corner lands near another
    Move { x: f32, y: f32, to_x: f32, to_y: f32 },
    /// Drag one edge of the object under a pixel
    Resize {
        x: f32,
        y: f32,
        edge: EdgeArg,
        position: f32,
    },
    /// Delete the object under a pixel
    Delete { x: f32, y: f32 },
    /// Remove every object
    Clear,
    /// Set the thickness of new walls, in pixels
    Thickness { pixels: f32 },
    /// List the objects being drawn
    List,
    /// Save the drawing under a name
    Save { name: String },
    /// Replace the drawing with a saved one
    Load { name: String },
    /// List saved drawings
    Drawings,
    /// Delete a saved drawing
    Forget { name: String },
    /// Export the drawing as PNG
    Export {
        out: PathBuf,
        /// Also send the export through image processing
        #[arg(long)]
        process: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PlanAction {
    /// Print the grid, exits and assembly point as a plan string
    Export {
        /// Write the string to a file instead
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the wizard state with a plan string
    Import {
        /// Plan string
        value: Option<String>,
        /// Read the plan string from a file
        #[arg(long, conflicts_with = "value")]
        file: Option<PathBuf>,
    },
}

/// Resolved configuration and storage shared by every subcommand.
#[derive(Debug)]
pub(crate) struct App {
    pub(crate) config: Config,
    pub(crate) store: LocalStore,
    pub(crate) space: GridSpace,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let mut config = Config::load(args.config.as_deref(), |key| std::env::var(key).ok())
            .context("failed to load configuration")?;
        if let Some(dir) = &args.store_dir {
            config.store.dir.clone_from(dir);
        }
        if let Some(url) = &args.backend_url {
            config.engine.base_url.clone_from(url);
        }
        if let Some(url) = &args.api_url {
            config.api.base_url.clone_from(url);
        }
        if let Some(model) = args.model {
            config.engine.model = model;
        }
        if let Some(token) = &args.auth_token {
            config.api.auth_token = Some(token.clone());
        }

        let store = LocalStore::open(&config.store.dir).context("failed to open local store")?;
        let space = GridSpace::new(config.grid.cell_size).context("invalid grid.cell_size")?;
        Ok(Self {
            config,
            store,
            space,
        })
    }

    pub(crate) fn rules(&self) -> PlacementRules {
        PlacementRules {
            min_exit_distance: self.config.grid.exit_min_distance,
            model: self.config.engine.model,
        }
    }

    pub(crate) fn wizard(&self) -> Wizard {
        Wizard::open(self.store.clone(), self.rules())
    }

    fn builder_space(&self) -> Result<BuilderSpace> {
        BuilderSpace::new(self.config.builder.canvas_size, self.config.builder.cells)
            .context("invalid builder configuration")
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug,hyper=warn,h2=warn,reqwest=warn,rustls=warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let app = App::new(&args)?;
    debug!(store = %app.store.dir().display(), model = %app.config.engine.model.as_str(), "configuration resolved");

    match args.action {
        Action::Process {
            image,
            save_as,
            no_invert,
            public,
        } => remote::process(&app, &image, save_as, no_invert, public).await,
        Action::Status => {
            status(&app.wizard());
            Ok(())
        }
        Action::Exits { action } => exits(&app, action),
        Action::Setup { action } => setup(&app, action),
        Action::Run { extended_fire } => remote::run(&app, extended_fire).await,
        Action::Replay {
            frame,
            out,
            speed,
            play,
        } => replay(&app, frame, out, speed, play).await,
        Action::Build { action } => build(&app, action).await,
        Action::Library { action } => remote::library(&app, action).await,
        Action::Plan { action } => plan(&app, action),
        Action::Reset => {
            let mut wizard = app.wizard();
            report(&wizard.dispatch([Command::Reset]));
            wizard.save();
            Ok(())
        }
    }
}

/// Prints every event, one per line.
pub(crate) fn report(events: &[Event]) {
    for event in events {
        println!("{}", describe(event));
    }
}

fn status(wizard: &Wizard) {
    let session = wizard.session();
    println!("stage: {:?}", wizard.stage());
    let Some(grid) = query::grid(session) else {
        println!("no floor plan loaded");
        return;
    };
    let stats = grid.stats();
    println!(
        "grid: {}x{} ({} free, {} wall, {} exterior)",
        grid.columns(),
        grid.rows(),
        stats.free,
        stats.wall,
        stats.exterior
    );
    for exit in query::exits(session) {
        println!("exit {}: {}", exit.id.get(), cell_label(exit.cell));
    }
    if let Some(cell) = query::assembly_point(session) {
        println!("assembly point: {}", cell_label(cell));
    }
    if matches!(wizard.stage(), Stage::Setup | Stage::Results) {
        print_setup(wizard);
    }
    if let Some(result) = query::result(session) {
        println!(
            "last run: {} agent(s), {} escaped, {} burned, {} remaining after {} step(s)",
            result.total_agents,
            result.escaped_count,
            result.burned_count,
            result.remaining_count(),
            result.time_steps
        );
    }
}

fn print_setup(wizard: &Wizard) {
    let setup = query::setup(wizard.session());
    println!("agent count: {}", setup.agent_count);
    match setup.fire {
        Some(cell) => println!("fire origin: {}", cell_label(cell)),
        None => println!("fire origin: not set"),
    }
    let agents: Vec<_> = setup.agents.iter().map(|cell| cell_label(*cell)).collect();
    println!("agents ({}): {}", agents.len(), agents.join(" "));
    let exits: Vec<_> = setup.exits.iter().map(|cell| cell_label(*cell)).collect();
    println!("simulation exits ({}): {}", exits.len(), exits.join(" "));
    if !wizard.session().can_run() {
        println!("set a fire origin and at least one agent before running");
    }
}

fn exits(app: &App, action: ExitsAction) -> Result<()> {
    let mut wizard = app.wizard();
    let Some(grid) = query::grid(wizard.session()).cloned() else {
        println!("no floor plan loaded; run `evacsim process <image>` first");
        return Ok(());
    };
    let (width, height) = app.space.canvas_size(grid.columns(), grid.rows());
    let transform = DisplayTransform::identity(Vec2::new(width as f32, height as f32));
    let mut placer = ExitPlacer::new(app.space, app.config.grid.exit_hit_radius);

    let click = |mode: PlacerMode, row: u32, col: u32| {
        let cell = CellCoord::from_row_col(row, col);
        (mode, PlacerInput {
            pointer: Some(app.space.cell_center(cell)),
            click: true,
            ..PlacerInput::default()
        })
    };
    let (mode, input) = match action {
        ExitsAction::Add { row, col } => click(PlacerMode::AddExit, row, col),
        ExitsAction::Remove { row, col } => click(PlacerMode::View, row, col),
        ExitsAction::Assembly { row, col } => click(PlacerMode::AddAssembly, row, col),
        ExitsAction::Undo => (PlacerMode::View, PlacerInput {
            undo: true,
            ..PlacerInput::default()
        }),
        ExitsAction::Clear => (PlacerMode::View, PlacerInput {
            clear: true,
            ..PlacerInput::default()
        }),
        ExitsAction::List {
            out,
            no_overlay,
            hover,
        } => {
            let hover = hover.and_then(|cell| match cell.as_slice() {
                [row, col] => Some(CellCoord::from_row_col(*row, *col)),
                _ => None,
            });
            return list_exits(app, &wizard, &grid, &mut placer, transform, out, no_overlay, hover);
        }
        ExitsAction::Confirm => {
            report(&wizard.dispatch([Command::ConfirmExits]));
            wizard.save();
            return Ok(());
        }
        ExitsAction::Back => {
            report(&wizard.dispatch([Command::BackToUpload]));
            wizard.save();
            return Ok(());
        }
    };

    placer.set_mode(mode);
    let mut commands = Vec::new();
    placer.handle(
        &[],
        transform,
        input,
        PlacementView {
            exits: query::exits(wizard.session()),
            assembly_point: query::assembly_point(wizard.session()),
        },
        &mut commands,
    );
    if commands.is_empty() {
        match placer.last_feedback() {
            Some(feedback) => println!("{feedback}"),
            None => println!("nothing to remove there"),
        }
        return Ok(());
    }
    report(&wizard.dispatch(commands));
    wizard.save();
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn list_exits(
    app: &App,
    wizard: &Wizard,
    grid: &evacsim_core::Grid,
    placer: &mut ExitPlacer,
    transform: DisplayTransform,
    out: Option<PathBuf>,
    no_overlay: bool,
    hover: Option<CellCoord>,
) -> Result<()> {
    let session = wizard.session();
    let exits = query::exits(session);
    if no_overlay {
        placer.toggle_overlay();
    }
    let mut ignored = Vec::new();
    placer.handle(
        &[],
        transform,
        PlacerInput {
            pointer: hover.map(|cell| app.space.cell_center(cell)),
            ..PlacerInput::default()
        },
        PlacementView {
            exits,
            assembly_point: query::assembly_point(session),
        },
        &mut ignored,
    );
    let emphasized = placer
        .hovered_exit()
        .and_then(|id| exits.iter().position(|exit| exit.id == id));

    for (index, exit) in exits.iter().enumerate() {
        let marker = if emphasized == Some(index) { " *" } else { "" };
        println!("{}. exit {} at {}{marker}", index + 1, exit.id.get(), cell_label(exit.cell));
    }
    if exits.is_empty() {
        println!("no exits placed");
    }
    if let Some(cell) = query::assembly_point(session) {
        println!("assembly point at {}", cell_label(cell));
    }

    if let Some(out) = out {
        let scene = render::placement_scene(
            session,
            grid,
            app.space,
            placer.show_overlay(),
            placer.hover_cell(),
            emphasized,
        )?;
        println!("{}", render::legend(&scene));
        render::write_png(&scene, &out)?;
    }
    Ok(())
}

fn setup(app: &App, action: SetupAction) -> Result<()> {
    let mut wizard = app.wizard();
    let Some(grid) = query::grid(wizard.session()).cloned() else {
        println!("no floor plan loaded; run `evacsim process <image>` first");
        return Ok(());
    };
    let model = app.config.engine.model;
    let mut commands = Vec::new();

    let manual = |mode: PlacementMode, row: u32, col: u32| {
        let mut configurator = Configurator::new(model, 0);
        configurator.set_strategy(Strategy::Manual);
        configurator.toggle_mode(mode);
        (configurator, ConfiguratorInput {
            clicked_cell: Some(CellCoord::from_row_col(row, col)),
            ..ConfiguratorInput::default()
        })
    };
    let (mut configurator, input) = match action {
        SetupAction::Auto { agents, seed } => {
            if let Some(count) = agents {
                report(&wizard.dispatch([Command::SetAgentCount { count }]));
            }
            let seed = seed.unwrap_or_else(clock_seed);
            info!(seed, "generating configuration");
            (Configurator::new(model, seed), ConfiguratorInput {
                auto_generate: true,
                ..ConfiguratorInput::default()
            })
        }
        SetupAction::Fire { row, col } => manual(PlacementMode::Fire, row, col),
        SetupAction::Agent { row, col } => manual(PlacementMode::Agent, row, col),
        SetupAction::Exit { row, col } => manual(PlacementMode::Exit, row, col),
        SetupAction::Clear => (Configurator::new(model, 0), ConfiguratorInput {
            clear: true,
            ..ConfiguratorInput::default()
        }),
        SetupAction::Agents { count } => {
            commands.push(Command::SetAgentCount { count });
            (Configurator::new(model, 0), ConfiguratorInput::default())
        }
        SetupAction::Show { out } => {
            print_setup(&wizard);
            if let Some(out) = out {
                let scene = render::setup_scene(wizard.session(), &grid, app.space)?;
                println!("{}", render::legend(&scene));
                render::write_png(&scene, &out)?;
            }
            return Ok(());
        }
        SetupAction::Back => {
            report(&wizard.dispatch([Command::BackToExits]));
            wizard.save();
            return Ok(());
        }
    };

    configurator.handle(
        &[],
        input,
        SetupView {
            grid: &grid,
            agent_count: query::setup(wizard.session()).agent_count,
        },
        &mut commands,
    );
    if commands.is_empty() {
        if let Some(feedback) = configurator.last_feedback() {
            println!("{feedback}");
        }
        wizard.save();
        return Ok(());
    }
    report(&wizard.dispatch(commands));
    wizard.save();
    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64)
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

async fn replay(
    app: &App,
    frame: Option<usize>,
    out: Option<PathBuf>,
    speed: Option<u8>,
    play: bool,
) -> Result<()> {
    let wizard = app.wizard();
    let session = wizard.session();
    let (Some(grid), Some(result)) = (query::grid(session), query::result(session)) else {
        println!("no simulation result; run `evacsim run` first");
        return Ok(());
    };

    let base_delay = Duration::from_millis(app.config.replay.base_frame_delay_ms);
    let mut engine = ReplayEngine::new(result, base_delay);
    engine.set_speed(speed.unwrap_or(app.config.replay.speed));
    if engine.frame_count() == 0 {
        println!("the engine returned no frame history");
        return Ok(());
    }
    let last = engine.frame_count() - 1;
    let target = frame.unwrap_or(if play { 0 } else { last }).min(last);

    let mut fire = FireAnimator::new();
    let delay = engine.frame_delay();
    // Age the fire through the frames leading up to the target.
    for index in 0..target {
        engine.seek(index);
        if let Some(view) = engine.current_view() {
            fire.set_burning(view.fire.iter().copied());
        }
        let _ = fire.tick(delay);
    }
    engine.seek(target);
    if let Some(view) = engine.current_view() {
        fire.set_burning(view.fire.iter().copied());
    }

    if play {
        engine.play();
        print_frame(engine.current_view());
        while engine.is_playing() {
            tokio::time::sleep(delay).await;
            let _ = fire.tick(delay);
            if engine.tick(delay) {
                if let Some(view) = engine.current_view() {
                    fire.set_burning(view.fire.iter().copied());
                }
                print_frame(engine.current_view());
            }
        }
    } else {
        print_frame(engine.current_view());
    }

    if let (Some(out), Some(view)) = (out, engine.current_view()) {
        fire.settle();
        let scene = render::replay_scene(session, grid, app.space, &view, &fire)?;
        println!("{}", render::legend(&scene));
        render::write_png(&scene, &out)?;
    }
    Ok(())
}

fn print_frame(view: Option<ReplayView<'_>>) {
    let Some(view) = view else {
        return;
    };
    let mut counts = [0_usize; 3];
    for agent in view.agents {
        match agent.status {
            evacsim_core::AgentStatus::Escaped => counts[1] += 1,
            evacsim_core::AgentStatus::Burned => counts[2] += 1,
            _ => counts[0] += 1,
        }
    }
    println!(
        "frame {} (step {}): {} evacuating, {} escaped, {} burned, {} cell(s) on fire",
        view.index,
        view.step,
        counts[0],
        counts[1],
        counts[2],
        view.fire.len()
    );
}

async fn build(app: &App, action: BuildAction) -> Result<()> {
    let space = app.builder_space()?;
    let mut builder = load_builder(&app.store, space);
    let mut library = DrawingLibrary::new(LocalDrawingStore::new(app.store.clone()));

    match action {
        BuildAction::Place { kind, x, y } => {
            builder.set_tool(match kind {
                KindArg::Wall => Tool::Wall,
                KindArg::Door => Tool::Door,
            });
            match builder.click(Vec2::new(x, y)) {
                ClickOutcome::Placed(id) => println!("placed object {}", id.get()),
                ClickOutcome::Selected(id) => {
                    println!("object {} already occupies that point", id.get());
                }
                ClickOutcome::Deselected => {}
            }
        }
        BuildAction::Move { x, y, to_x, to_y } => {
            let Some(id) = builder.object_at(Vec2::new(x, y)) else {
                println!("no object at {x},{y}");
                return Ok(());
            };
            let rect = builder.move_object(id, Vec2::new(to_x, to_y))?;
            println!("object {} now at {},{}", id.get(), rect.x, rect.y);
        }
        BuildAction::Resize {
            x,
            y,
            edge,
            position,
        } => {
            let Some(id) = builder.object_at(Vec2::new(x, y)) else {
                println!("no object at {x},{y}");
                return Ok(());
            };
            let rect = builder.resize(id, edge.into(), position)?;
            println!("object {} is {}x{}", id.get(), rect.width, rect.height);
        }
        BuildAction::Delete { x, y } => {
            let Some(id) = builder.object_at(Vec2::new(x, y)) else {
                println!("no object at {x},{y}");
                return Ok(());
            };
            builder.select(id)?;
            let removed = builder.delete_selected()?;
            println!("deleted {:?} {}", removed.kind, removed.id.get());
        }
        BuildAction::Clear => println!("removed {} object(s)", builder.clear()),
        BuildAction::Thickness { pixels } => {
            builder.set_wall_thickness(pixels);
            println!("new walls are {}px thick", builder.wall_thickness());
        }
        BuildAction::List => {
            for object in builder.objects() {
                let kind = match object.kind {
                    ObjectKind::Wall => "wall",
                    ObjectKind::Door => "door",
                };
                let rect = object.rect;
                println!(
                    "{} {kind} at {},{} size {}x{}",
                    object.id.get(),
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height
                );
            }
            let counts = builder.counts();
            println!("{} wall(s), {} door(s)", counts.walls, counts.doors);
            return Ok(());
        }
        BuildAction::Save { name } => {
            let drawing = library.save(&name, &builder, unix_seconds())?;
            println!("saved `{}` with {} object(s)", drawing.name, drawing.objects.len());
            return Ok(());
        }
        BuildAction::Load { name } => {
            let count = library.load(&name, &mut builder)?;
            println!("loaded `{name}` with {count} object(s)");
        }
        BuildAction::Drawings => {
            let drawings = library.list();
            if drawings.is_empty() {
                println!("no saved drawings");
            }
            for drawing in drawings {
                println!(
                    "{} ({} object(s), saved at {})",
                    drawing.name,
                    drawing.objects.len(),
                    drawing.saved_at
                );
            }
            return Ok(());
        }
        BuildAction::Forget { name } => {
            library.delete(&name)?;
            println!("deleted `{name}`");
            return Ok(());
        }
        BuildAction::Export { out, process } => {
            let bytes = export_png(&builder, app.config.builder.export_size)?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("cannot write {}", out.display()))?;
            let size = app.config.builder.export_size;
            println!("wrote {} ({size}x{size})", out.display());
            if process {
                let name = out
                    .file_name()
                    .map_or_else(|| "floor-plan.png".to_owned(), |name| name.to_string_lossy().into_owned());
                let _ = remote::process_bytes(app, name, &bytes, app.config.grid.correction()).await?;
            }
            return Ok(());
        }
    }
    save_builder(&app.store, &builder);
    Ok(())
}

fn plan(app: &App, action: PlanAction) -> Result<()> {
    let mut wizard = app.wizard();
    match action {
        PlanAction::Export { out } => {
            let session = wizard.session();
            let Some(grid) = query::grid(session) else {
                println!("no floor plan loaded");
                return Ok(());
            };
            let encoded = PlanTransfer {
                grid: grid.clone(),
                exits: query::exits(session).iter().map(|exit| exit.cell).collect(),
                assembly: query::assembly_point(session),
            }
            .encode()?;
            match out {
                Some(out) => {
                    std::fs::write(&out, &encoded)
                        .with_context(|| format!("cannot write {}", out.display()))?;
                    println!("wrote {}", out.display());
                }
                None => println!("{encoded}"),
            }
        }
        PlanAction::Import { value, file } => {
            let value = match (value, file) {
                (Some(value), _) => value,
                (None, Some(file)) => std::fs::read_to_string(&file)
                    .with_context(|| format!("cannot read {}", file.display()))?,
                (None, None) => anyhow::bail!("pass a plan string or --file"),
            };
            let plan = match PlanTransfer::decode(&value) {
                Ok(plan) => plan,
                Err(error) => {
                    println!("rejected: {error}");
                    return Ok(());
                }
            };
            let mut commands = Vec::with_capacity(plan.exits.len() + 3);
            if wizard.stage() != Stage::Upload {
                commands.push(Command::Reset);
            }
            commands.push(Command::LoadGrid {
                grid: plan.grid,
                background: None,
            });
            commands.extend(plan.exits.into_iter().map(|cell| Command::PlaceExit { cell }));
            commands.extend(
                plan.assembly
                    .map(|cell| Command::PlaceAssemblyPoint { cell }),
            );
            report(&wizard.dispatch(commands));
            wizard.save();
        }
    }
    Ok(())
}
