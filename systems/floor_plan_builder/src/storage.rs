//! Named drawing snapshots.

use serde::{Deserialize, Serialize};

use crate::{BuilderError, FloorPlanBuilder, ObjectKind, PixelRect};

/// Fixed storage key under which saved drawings live.
pub const DRAWINGS_KEY: &str = "floor-plan-drawings";

/// Persisted object: kind and bounds only, no editor state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedObject {
    /// Wall or door.
    pub kind: ObjectKind,
    /// Snapped bounds.
    pub rect: PixelRect,
}

/// Named snapshot of a drawing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDrawing {
    /// User-chosen name; unique within the store.
    pub name: String,
    /// Seconds since the Unix epoch at save time.
    pub saved_at: u64,
    /// Objects in drawing order.
    pub objects: Vec<SavedObject>,
}

/// Backing storage for saved drawings.
///
/// Implementations treat unreadable data as an empty list.
pub trait DrawingStore {
    /// Loads every saved drawing.
    fn load_drawings(&self) -> Vec<SavedDrawing>;

    /// Replaces the stored drawings.
    fn store_drawings(&mut self, drawings: &[SavedDrawing]) -> Result<(), BuilderError>;
}

/// In-memory store, useful for tests and ephemeral sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryDrawingStore {
    drawings: Vec<SavedDrawing>,
}

impl DrawingStore for MemoryDrawingStore {
    fn load_drawings(&self) -> Vec<SavedDrawing> {
        self.drawings.clone()
    }

    fn store_drawings(&mut self, drawings: &[SavedDrawing]) -> Result<(), BuilderError> {
        self.drawings = drawings.to_vec();
        Ok(())
    }
}

/// Save, load and delete operations over a [`DrawingStore`].
#[derive(Debug)]
pub struct DrawingLibrary<S> {
    store: S,
}

impl<S: DrawingStore> DrawingLibrary<S> {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Saved drawings in save order.
    #[must_use]
    pub fn list(&self) -> Vec<SavedDrawing> {
        self.store.load_drawings()
    }

    /// Saves the builder's objects, replacing any drawing with the same name.
    pub fn save(
        &mut self,
        name: &str,
        builder: &FloorPlanBuilder,
        saved_at: u64,
    ) -> Result<SavedDrawing, BuilderError> {
        let drawing = SavedDrawing {
            name: name.to_owned(),
            saved_at,
            objects: builder
                .objects()
                .iter()
                .map(|object| SavedObject {
                    kind: object.kind,
                    rect: object.rect,
                })
                .collect(),
        };
        let mut drawings = self.store.load_drawings();
        drawings.retain(|existing| existing.name != name);
        drawings.push(drawing.clone());
        self.store.store_drawings(&drawings)?;
        Ok(drawing)
    }

    /// Clears the builder and rebuilds the named drawing with fresh ids.
    pub fn load(&self, name: &str, builder: &mut FloorPlanBuilder) -> Result<usize, BuilderError> {
        let drawing = self
            .store
            .load_drawings()
            .into_iter()
            .find(|drawing| drawing.name == name)
            .ok_or_else(|| BuilderError::UnknownDrawing(name.to_owned()))?;
        let count = drawing.objects.len();
        builder.replace_objects(
            drawing
                .objects
                .into_iter()
                .map(|object| (object.kind, object.rect)),
        );
        Ok(count)
    }

    /// Deletes the named drawing.
    pub fn delete(&mut self, name: &str) -> Result<(), BuilderError> {
        let mut drawings = self.store.load_drawings();
        let before = drawings.len();
        drawings.retain(|drawing| drawing.name != name);
        if drawings.len() == before {
            return Err(BuilderError::UnknownDrawing(name.to_owned()));
        }
        self.store.store_drawings(&drawings)
    }

    /// Unwraps the store.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.store
    }
}
