//! Builder persistence on top of the local store.

use evacsim_local_store::LocalStore;
use evacsim_system_floor_plan_builder::{
    BuilderError, BuilderSpace, DrawingStore, FloorPlanBuilder, SavedDrawing, SavedObject,
    DRAWINGS_KEY,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Storage key of the drawing currently being edited.
pub(crate) const BUILDER_STATE_KEY: &str = "floor-plan-builder";

/// Saved drawings kept in the local store.
#[derive(Clone, Debug)]
pub(crate) struct LocalDrawingStore {
    store: LocalStore,
}

impl LocalDrawingStore {
    pub(crate) fn new(store: LocalStore) -> Self {
        Self { store }
    }
}

impl DrawingStore for LocalDrawingStore {
    fn load_drawings(&self) -> Vec<SavedDrawing> {
        self.store.get(DRAWINGS_KEY).unwrap_or_default()
    }

    fn store_drawings(&mut self, drawings: &[SavedDrawing]) -> Result<(), BuilderError> {
        self.store
            .set(DRAWINGS_KEY, drawings)
            .map_err(|error| BuilderError::Storage(error.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuilderState {
    wall_thickness: u32,
    objects: Vec<SavedObject>,
}

/// Restores the in-progress drawing, or an empty one.
pub(crate) fn load_builder(store: &LocalStore, space: BuilderSpace) -> FloorPlanBuilder {
    let mut builder = FloorPlanBuilder::new(space);
    if let Some(state) = store.get::<BuilderState>(BUILDER_STATE_KEY) {
        builder.set_wall_thickness(state.wall_thickness as f32);
        builder.replace_objects(
            state
                .objects
                .into_iter()
                .map(|object| (object.kind, object.rect)),
        );
    }
    builder
}

/// Writes the in-progress drawing back. Failures are logged only.
pub(crate) fn save_builder(store: &LocalStore, builder: &FloorPlanBuilder) {
    let state = BuilderState {
        wall_thickness: builder.wall_thickness(),
        objects: builder
            .objects()
            .iter()
            .map(|object| SavedObject {
                kind: object.kind,
                rect: object.rect,
            })
            .collect(),
    };
    if let Err(error) = store.set(BUILDER_STATE_KEY, &state) {
        warn!(%error, "builder state not saved");
    }
}
