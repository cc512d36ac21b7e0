use std::time::Duration;

use evacsim_core::{AgentFrame, AgentStatus, CellCoord, Grid, GridSpace};
use evacsim_rendering::{
    encode_png, palette, thumbnail_png, AgentIcon, FireAnimator, RasterRenderer, RenderingBackend,
    RenderingError, SceneBuilder, FIRE_TICK, THUMBNAIL_SIZE,
};
use image::{Rgba, RgbaImage};

fn room() -> Grid {
    Grid::from_rows(vec![
        vec![1, 1, 1, 1],
        vec![1, 0, 0, 1],
        vec![1, 0, 0, 4],
    ])
    .expect("valid grid")
}

fn space() -> GridSpace {
    GridSpace::new(4).expect("non-zero cell size")
}

fn agent(row: u32, column: u32, status: AgentStatus) -> AgentFrame {
    AgentFrame {
        pos: CellCoord::from_row_col(row, column),
        status,
        state: None,
        tripped: false,
    }
}

#[test]
fn raster_size_matches_grid_and_cell_size() {
    let grid = room();
    let scene = SceneBuilder::new(&grid, space()).build();
    let image = RasterRenderer.draw(&scene);
    assert_eq!(image.dimensions(), (16, 12));
}

#[test]
fn overlay_tints_walls_and_leaves_free_cells_white() {
    let grid = room();
    let scene = SceneBuilder::new(&grid, space()).overlay(true).build();
    let image = RasterRenderer.render(&scene).expect("raster never fails");

    let wall = image.get_pixel(1, 1).0;
    assert_eq!(wall[0], 255, "red channel stays saturated over white");
    assert!(wall[1] < 255 && wall[2] < 255, "wall is tinted red: {wall:?}");
    assert_eq!(image.get_pixel(5, 5).0, [255, 255, 255, 255]);
}

#[test]
fn background_is_scaled_to_canvas() {
    let grid = room();
    let background = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
    let bytes = encode_png(&background).expect("encodes");
    let scene = SceneBuilder::new(&grid, space())
        .background(Some(bytes.as_slice()))
        .expect("decodes")
        .build();
    let image = RasterRenderer.draw(&scene);
    assert_eq!(image.get_pixel(15, 11).0, [0, 0, 0, 255]);
}

#[test]
fn undecodable_background_is_an_error() {
    let grid = room();
    let result = SceneBuilder::new(&grid, space()).background(Some(&b"not an image"[..]));
    assert!(matches!(result, Err(RenderingError::Background(_))));
}

#[test]
fn agents_use_cycled_icons_and_status_tints() {
    let grid = room();
    let agents = [
        agent(1, 1, AgentStatus::Evacuating),
        agent(1, 2, AgentStatus::Escaped),
        agent(2, 1, AgentStatus::Burned),
        agent(2, 2, AgentStatus::Evacuating),
        agent(2, 2, AgentStatus::Evacuating),
    ];
    let scene = SceneBuilder::new(&grid, space()).agents(&agents).build();

    let icons: Vec<_> = scene.agents.iter().map(|marker| marker.icon).collect();
    assert_eq!(
        icons,
        vec![
            AgentIcon::Person,
            AgentIcon::Runner,
            AgentIcon::Helper,
            AgentIcon::Elder,
            AgentIcon::Person
        ]
    );
    assert_eq!(scene.agents[1].color(), palette::AGENT_ESCAPED);
    assert_eq!(scene.agents[2].color(), palette::AGENT_BURNED);
    assert_eq!(scene.legend.agents, 5);

    let image = RasterRenderer.draw(&scene);
    let center = image.get_pixel(6, 6).0;
    let expected = palette::AGENT_ACTIVE.to_rgba8();
    for channel in 0..3 {
        assert!(
            center[channel].abs_diff(expected[channel]) <= 1,
            "agent marker drawn at cell center: {center:?}"
        );
    }
}

#[test]
fn fire_cells_grow_and_are_dropped_on_next_tick() {
    let mut animator = FireAnimator::new();
    let origin = CellCoord::from_row_col(1, 1);
    let spread = CellCoord::from_row_col(1, 2);
    animator.set_burning([origin]);
    let _ = animator.tick(Duration::from_millis(320));
    animator.set_burning([origin, spread]);
    let _ = animator.tick(FIRE_TICK);

    let sprites = animator.sprites();
    assert_eq!(sprites.len(), 2);
    assert!(sprites[0].scale > sprites[1].scale, "older cell is larger");
    assert!(sprites[0].alpha > 0.8, "older cell has faded in");

    animator.set_burning([spread]);
    assert_eq!(animator.tracked(), 2, "ages survive until the next tick");
    let _ = animator.tick(FIRE_TICK);
    assert_eq!(animator.tracked(), 1);
    assert_eq!(animator.age(origin), None);

    let grid = room();
    let scene = SceneBuilder::new(&grid, space()).fire(&animator).build();
    assert!(scene.legend.fire_present);

    animator.clear();
    assert!(animator.sprites().is_empty());
}

#[test]
fn settled_fire_is_drawn_on_a_still_frame() {
    let grid = Grid::from_rows(vec![vec![0; 8]; 8]).expect("valid grid");
    let origin = CellCoord::from_row_col(5, 5);
    let spread = CellCoord::from_row_col(5, 6);
    let frames = [vec![origin], vec![origin, spread]];
    let center = |cell: CellCoord| {
        let pixel = space().cell_center(cell);
        (pixel.x as u32, pixel.y as u32)
    };
    let white = [255, 255, 255, 255];

    for target in 0..frames.len() {
        let mut animator = FireAnimator::new();
        for frame in &frames[..target] {
            animator.set_burning(frame.iter().copied());
            let _ = animator.tick(Duration::from_millis(100));
        }
        animator.set_burning(frames[target].iter().copied());
        animator.settle();

        let scene = SceneBuilder::new(&grid, space()).fire(&animator).build();
        let image = RasterRenderer.draw(&scene);
        for cell in &frames[target] {
            let (x, y) = center(*cell);
            assert_ne!(
                image.get_pixel(x, y).0,
                white,
                "fire at {cell:?} missing from frame {target}"
            );
        }
    }
}

#[test]
fn settling_keeps_older_cells_and_drops_extinguished_ones() {
    let mut animator = FireAnimator::new();
    let old = CellCoord::from_row_col(1, 1);
    let gone = CellCoord::from_row_col(2, 2);
    animator.set_burning([old, gone]);
    let _ = animator.tick(Duration::from_secs(1));
    let aged = animator.age(old).expect("tracked");

    animator.set_burning([old]);
    animator.settle();
    assert_eq!(animator.age(old), Some(aged));
    assert_eq!(animator.age(gone), None);
    assert!(animator.sprites().iter().all(|sprite| sprite.scale == 1.0));
}

#[test]
fn thumbnail_fits_max_side_and_keeps_aspect() {
    let image = RgbaImage::from_pixel(256, 128, Rgba([255, 255, 255, 255]));
    let png = thumbnail_png(&image, THUMBNAIL_SIZE).expect("encodes");
    let thumbnail = image::load_from_memory(&png).expect("valid png");
    assert_eq!((thumbnail.width(), thumbnail.height()), (64, 32));

    let small = RgbaImage::new(10, 10);
    let png = thumbnail_png(&small, THUMBNAIL_SIZE).expect("encodes");
    let unchanged = image::load_from_memory(&png).expect("valid png");
    assert_eq!(unchanged.width(), 10);
}
