//! Scenes drawn from the wizard session.

use std::path::Path;

use anyhow::{Context, Result};
use evacsim_core::{CellCoord, Grid, GridSpace};
use evacsim_rendering::{
    encode_png, thumbnail_png, FireAnimator, RasterRenderer, RenderingBackend, Scene,
    SceneBuilder, THUMBNAIL_SIZE,
};
use evacsim_system_replay::ReplayView;
use evacsim_world::{query, Session};

/// Exit placement view: overlay, numbered exits, assembly point, hover.
pub(crate) fn placement_scene(
    session: &Session,
    grid: &Grid,
    space: GridSpace,
    overlay: bool,
    hover: Option<CellCoord>,
    emphasized: Option<usize>,
) -> Result<Scene> {
    let exits = query::exits(session).iter().map(|exit| exit.cell);
    Ok(SceneBuilder::new(grid, space)
        .background(query::background(session))
        .context("stored background image is unreadable")?
        .overlay(overlay)
        .exits(exits, emphasized)
        .assembly_point(query::assembly_point(session))
        .hover(hover)
        .build())
}

/// Setup view: simulation exits, fire origin and agent starting cells.
pub(crate) fn setup_scene(session: &Session, grid: &Grid, space: GridSpace) -> Result<Scene> {
    let setup = query::setup(session);
    let mut fire = FireAnimator::new();
    fire.set_burning(setup.fire);
    fire.settle();
    Ok(SceneBuilder::new(grid, space)
        .background(query::background(session))
        .context("stored background image is unreadable")?
        .overlay(true)
        .exits(setup.exits.iter().copied(), None)
        .assembly_point(query::assembly_point(session))
        .fire(&fire)
        .agent_starts(&setup.agents)
        .build())
}

/// One replay frame with the animated fire.
pub(crate) fn replay_scene(
    session: &Session,
    grid: &Grid,
    space: GridSpace,
    view: &ReplayView<'_>,
    fire: &FireAnimator,
) -> Result<Scene> {
    Ok(SceneBuilder::new(grid, space)
        .background(query::background(session))
        .context("stored background image is unreadable")?
        .overlay(false)
        .exits(view.exits.iter().copied(), None)
        .assembly_point(query::assembly_point(session))
        .fire(fire)
        .agents(view.agents)
        .build())
}

/// Rasterizes the scene and writes it as PNG.
pub(crate) fn write_png(scene: &Scene, path: &Path) -> Result<()> {
    let image = RasterRenderer.render(scene)?;
    let bytes = encode_png(&image)?;
    std::fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))?;
    let (width, height) = scene.canvas_size();
    println!("wrote {} ({width}x{height})", path.display());
    Ok(())
}

/// Small PNG preview attached to saved floor plans.
pub(crate) fn thumbnail(scene: &Scene) -> Result<Vec<u8>> {
    let image = RasterRenderer.render(scene)?;
    Ok(thumbnail_png(&image, THUMBNAIL_SIZE)?)
}

/// Legend line shown next to a rendered scene.
pub(crate) fn legend(scene: &Scene) -> String {
    let legend = &scene.legend;
    format!(
        "{} free, {} wall, {} exterior cells; {} exit(s), {} agent(s){}",
        legend.stats.free,
        legend.stats.wall,
        legend.stats.exterior,
        legend.exits,
        legend.agents,
        if legend.fire_present { ", fire" } else { "" }
    )
}
