//! Board objects and the object-store collaborator.
//!
//! DESIGN
//! ======
//! The store is the system of record; tool handlers never cache objects
//! between calls and re-fetch a snapshot for every read. `ObjectStore` is the
//! seam a host application implements. `MemoryStore` backs the CLI and tests.
//!
//! Store coordinates are top-left based. Center-point conversion happens in
//! the tool layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

// =============================================================================
// GEOMETRY
// =============================================================================

/// Axis-aligned rectangle, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True when `other` lies entirely inside `self` (edges inclusive).
    #[must_use]
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x && other.y >= self.y && other.right() <= self.right() && other.bottom() <= self.bottom()
    }

    /// True when the rectangles share any area or edge.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        other.x <= self.right() && other.right() >= self.x && other.y <= self.bottom() && other.bottom() >= self.y
    }

    /// Smallest rectangle covering every input; `None` for an empty iterator.
    pub fn union_all<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        rects.into_iter().fold(None, |acc: Option<Rect>, r| {
            Some(match acc {
                None => *r,
                Some(a) => {
                    let x = a.x.min(r.x);
                    let y = a.y.min(r.y);
                    Rect { x, y, width: a.right().max(r.right()) - x, height: a.bottom().max(r.bottom()) - y }
                }
            })
        })
    }
}

/// Visible board window, in board coordinates.
pub type Viewport = Rect;

// =============================================================================
// BOARD OBJECT
// =============================================================================

/// One object on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardObject {
    pub id: Uuid,
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub z_index: i64,
    /// Free-form properties: text, color, title, fromId, toId, style, url.
    #[serde(default)]
    pub props: Value,
}

impl BoardObject {
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect { x: self.x, y: self.y, width: self.width, height: self.height }
    }

    #[must_use]
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn is_connector(&self) -> bool {
        self.kind == "connector"
    }

    #[must_use]
    pub fn is_frame(&self) -> bool {
        self.kind == "frame"
    }

    /// Ids of the endpoints when this object is a connector.
    #[must_use]
    pub fn endpoints(&self) -> (Option<Uuid>, Option<Uuid>) {
        let parse = |key| self.prop_str(key).and_then(|s| Uuid::try_parse(s).ok());
        (parse("fromId"), parse("toId"))
    }
}

/// A fully specified object about to be created. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObject {
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub z_index: i64,
    pub props: Value,
}

/// Partial update. Geometry keys map to struct fields; everything else merges
/// into `props`, where `null` removes the key.
pub type Fields = serde_json::Map<String, Value>;

/// Apply `fields` to `obj` in place.
pub fn apply_fields(obj: &mut BoardObject, fields: &Fields) {
    for (key, value) in fields {
        match key.as_str() {
            "x" => set_f64(&mut obj.x, value),
            "y" => set_f64(&mut obj.y, value),
            "width" => set_f64(&mut obj.width, value),
            "height" => set_f64(&mut obj.height, value),
            "rotation" => set_f64(&mut obj.rotation, value),
            "zIndex" | "z_index" => {
                if let Some(z) = value.as_i64() {
                    obj.z_index = z;
                }
            }
            _ => {
                if !obj.props.is_object() {
                    obj.props = Value::Object(serde_json::Map::new());
                }
                if let Value::Object(props) = &mut obj.props {
                    if value.is_null() {
                        props.remove(key);
                    } else {
                        props.insert(key.clone(), value.clone());
                    }
                }
            }
        }
    }
}

fn set_f64(slot: &mut f64, value: &Value) {
    if let Some(v) = value.as_f64() {
        *slot = v;
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(Uuid),
    #[error("store rejected the write: {0}")]
    Rejected(String),
}

impl crate::error::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_OBJECT_NOT_FOUND",
            Self::Rejected(_) => "E_STORE_REJECTED",
        }
    }
}

/// The board's system of record.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist a new object and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store refuses the write.
    async fn create_object(&self, object: NewObject) -> Result<BoardObject, StoreError>;

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the id is unknown.
    async fn update_object(&self, id: Uuid, fields: &Fields) -> Result<(), StoreError>;

    /// Remove an object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the id is unknown.
    async fn delete_object(&self, id: Uuid) -> Result<(), StoreError>;

    /// Snapshot of every object keyed by id.
    async fn get_objects(&self) -> HashMap<Uuid, BoardObject>;

    /// The caller's visible window, when known.
    async fn viewport(&self) -> Option<Viewport>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<Uuid, BoardObject>>,
    viewport: RwLock<Option<Viewport>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `objects`, keeping their ids.
    #[must_use]
    pub fn with_objects(objects: Vec<BoardObject>) -> Self {
        let map = objects.into_iter().map(|o| (o.id, o)).collect();
        Self { objects: RwLock::new(map), viewport: RwLock::new(None) }
    }

    pub async fn set_viewport(&self, viewport: Option<Viewport>) {
        *self.viewport.write().await = viewport;
    }

    /// Objects sorted by stacking order, then id, for stable output.
    pub async fn sorted_objects(&self) -> Vec<BoardObject> {
        let mut objects: Vec<BoardObject> = self.objects.read().await.values().cloned().collect();
        objects.sort_by(|a, b| a.z_index.cmp(&b.z_index).then(a.id.cmp(&b.id)));
        objects
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn create_object(&self, object: NewObject) -> Result<BoardObject, StoreError> {
        let obj = BoardObject {
            id: Uuid::new_v4(),
            kind: object.kind,
            x: object.x,
            y: object.y,
            width: object.width,
            height: object.height,
            rotation: object.rotation,
            z_index: object.z_index,
            props: object.props,
        };
        self.objects.write().await.insert(obj.id, obj.clone());
        Ok(obj)
    }

    async fn update_object(&self, id: Uuid, fields: &Fields) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        let obj = objects.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        apply_fields(obj, fields);
        Ok(())
    }

    async fn delete_object(&self, id: Uuid) -> Result<(), StoreError> {
        match self.objects.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn get_objects(&self) -> HashMap<Uuid, BoardObject> {
        self.objects.read().await.clone()
    }

    async fn viewport(&self) -> Option<Viewport> {
        *self.viewport.read().await
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
