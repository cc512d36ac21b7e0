use evacsim_system_floor_plan_builder::{
    export_png, BuilderError, BuilderSpace, ClickOutcome, DrawingLibrary, DrawingStore, Edge,
    FloorPlanBuilder, MemoryDrawingStore, ObjectCounts, ObjectKind, PixelRect, SavedDrawing, Tool,
    DOOR_COLOR, WALL_COLOR,
};
use glam::Vec2;

fn wall_builder() -> FloorPlanBuilder {
    let mut builder = FloorPlanBuilder::default();
    builder.set_tool(Tool::Wall);
    builder
}

#[test]
fn wall_click_places_snapped_four_cell_wall() {
    let mut builder = wall_builder();
    let outcome = builder.click(Vec2::new(37.0, 70.0));
    let ClickOutcome::Placed(id) = outcome else {
        panic!("expected a placement, got {outcome:?}");
    };
    assert_eq!(builder.selected(), Some(id));
    assert_eq!(
        builder.objects()[0].rect,
        PixelRect {
            x: 32,
            y: 64,
            width: 64,
            height: 16
        },
        "position snaps to the nearest cell and size is four cells by one",
    );
}

#[test]
fn door_click_places_two_by_one_door() {
    let mut builder = FloorPlanBuilder::default();
    builder.set_tool(Tool::Door);
    let _ = builder.click(Vec2::new(100.0, 100.0));
    let door = builder.objects()[0];
    assert_eq!(door.kind, ObjectKind::Door);
    assert_eq!((door.rect.width, door.rect.height), (32, 16));
}

#[test]
fn clicking_existing_object_never_inserts() {
    let mut builder = wall_builder();
    let ClickOutcome::Placed(id) = builder.click(Vec2::new(0.0, 0.0)) else {
        panic!("first click should place");
    };
    assert_eq!(builder.click(Vec2::new(10.0, 5.0)), ClickOutcome::Selected(id));
    assert_eq!(builder.objects().len(), 1);
}

#[test]
fn select_tool_on_empty_canvas_deselects() {
    let mut builder = wall_builder();
    let _ = builder.click(Vec2::new(0.0, 0.0));
    builder.set_tool(Tool::Select);
    assert_eq!(builder.click(Vec2::new(300.0, 300.0)), ClickOutcome::Deselected);
    assert_eq!(builder.selected(), None);
}

#[test]
fn thick_walls_snap_to_whole_cells() {
    let mut builder = wall_builder();
    builder.set_wall_thickness(40.0);
    assert_eq!(builder.wall_thickness(), 48);
    builder.set_wall_thickness(2.0);
    assert_eq!(builder.wall_thickness(), 16);
}

#[test]
fn move_snaps_top_left_corner() {
    let mut builder = wall_builder();
    let ClickOutcome::Placed(id) = builder.click(Vec2::ZERO) else {
        panic!("should place");
    };
    let rect = builder.move_object(id, Vec2::new(50.0, 90.0)).expect("known id");
    assert_eq!((rect.x, rect.y), (48, 96));
    assert_eq!((rect.width, rect.height), (64, 16));
}

#[test]
fn edge_resize_keeps_at_least_one_cell() {
    let mut builder = wall_builder();
    let ClickOutcome::Placed(id) = builder.click(Vec2::new(64.0, 64.0)) else {
        panic!("should place");
    };

    let rect = builder.resize(id, Edge::Right, 200.0).expect("known id");
    assert_eq!((rect.x, rect.width), (64, 144));

    let rect = builder.resize(id, Edge::Right, 10.0).expect("known id");
    assert_eq!(rect.width, 16, "cannot collapse below one cell");

    let rect = builder.resize(id, Edge::Left, 30.0).expect("known id");
    assert_eq!((rect.x, rect.width), (32, 48));

    let rect = builder.resize(id, Edge::Top, 500.0).expect("known id");
    assert_eq!((rect.y, rect.height), (64, 16));

    let rect = builder.resize(id, Edge::Bottom, 130.0).expect("known id");
    assert_eq!(rect.height, 64);
}

#[test]
fn delete_and_clear() {
    let mut builder = wall_builder();
    let _ = builder.click(Vec2::new(0.0, 0.0));
    builder.set_tool(Tool::Door);
    let _ = builder.click(Vec2::new(200.0, 200.0));
    assert_eq!(builder.counts(), ObjectCounts { walls: 1, doors: 1 });

    let removed = builder.delete_selected().expect("door selected");
    assert_eq!(removed.kind, ObjectKind::Door);
    assert!(matches!(
        builder.delete_selected(),
        Err(BuilderError::NothingSelected)
    ));
    assert_eq!(builder.clear(), 1);
    assert_eq!(builder.counts(), ObjectCounts::default());
}

#[test]
fn save_and_load_restore_objects_with_fresh_ids() {
    let mut builder = wall_builder();
    let _ = builder.click(Vec2::new(0.0, 0.0));
    builder.set_tool(Tool::Door);
    let _ = builder.click(Vec2::new(128.0, 0.0));
    let original: Vec<_> = builder
        .objects()
        .iter()
        .map(|object| (object.kind, object.rect))
        .collect();

    let mut library = DrawingLibrary::new(MemoryDrawingStore::default());
    let _ = library.save("office", &builder, 1_700_000_000).expect("saved");
    let _ = library.save("office", &builder, 1_700_000_100).expect("saved again");
    assert_eq!(library.list().len(), 1, "saving under the same name replaces");

    let mut restored = FloorPlanBuilder::default();
    restored.set_tool(Tool::Wall);
    let _ = restored.click(Vec2::new(400.0, 400.0));
    let count = library.load("office", &mut restored).expect("known drawing");
    assert_eq!(count, 2);
    let loaded: Vec<_> = restored
        .objects()
        .iter()
        .map(|object| (object.kind, object.rect))
        .collect();
    assert_eq!(loaded, original, "load replaces current objects");
    assert_eq!(restored.selected(), None);
}

#[test]
fn deleting_unknown_drawing_fails() {
    let mut library = DrawingLibrary::new(MemoryDrawingStore::default());
    assert!(matches!(
        library.delete("missing"),
        Err(BuilderError::UnknownDrawing(name)) if name == "missing"
    ));
}

#[test]
fn saved_drawing_json_has_no_editor_state() {
    let mut builder = wall_builder();
    let _ = builder.click(Vec2::new(0.0, 0.0));
    let mut library = DrawingLibrary::new(MemoryDrawingStore::default());
    let drawing = library.save("plan", &builder, 5).expect("saved");
    let json = serde_json::to_value(&drawing).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "name": "plan",
            "savedAt": 5,
            "objects": [{"kind": "wall", "rect": {"x": 0, "y": 0, "width": 64, "height": 16}}],
        })
    );
    let store = library.into_inner();
    let stored: Vec<SavedDrawing> = store.load_drawings();
    assert_eq!(stored, vec![drawing]);
}

#[test]
fn export_is_fixed_resolution_without_grid_lines() {
    let mut builder = FloorPlanBuilder::new(BuilderSpace::new(512, 32).expect("valid space"));
    builder.set_tool(Tool::Wall);
    let _ = builder.click(Vec2::new(0.0, 0.0));
    builder.set_tool(Tool::Door);
    let _ = builder.click(Vec2::new(256.0, 256.0));

    let png = export_png(&builder, 256).expect("encodes");
    let image = image::load_from_memory(&png).expect("valid png").to_rgb8();
    assert_eq!(image.dimensions(), (256, 256));
    assert_eq!(image.get_pixel(0, 0).0, WALL_COLOR);
    assert_eq!(image.get_pixel(31, 7).0, WALL_COLOR);
    assert_eq!(image.get_pixel(32, 0).0, [0xff, 0xff, 0xff]);
    assert_eq!(image.get_pixel(128, 128).0, DOOR_COLOR);
    assert_eq!(
        image.get_pixel(200, 20).0,
        [0xff, 0xff, 0xff],
        "empty canvas exports as white with no grid lines"
    );
}
