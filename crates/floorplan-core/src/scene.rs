//! Scene objects and the scene collaborator interface.
//!
//! The scene is the mutable collection of everything on the canvas: the
//! background grid and the user's drawings. Grid lines and drawings are one
//! tagged union, so callers match on [`ObjectKind`] instead of probing flags.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for scene objects.
pub type ObjectId = Uuid;

/// Tag derived from an object's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectTag {
    Grid,
    Drawing,
}

/// A single background grid line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLine {
    pub start: Point,
    pub end: Point,
    /// Major lines are drawn heavier (every N cells).
    pub major: bool,
}

/// What a stroke was drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrokeKind {
    Wall,
    Freehand,
}

/// A user drawing: a polyline with per-point widths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub kind: StrokeKind,
    pub points: Vec<Point>,
    /// One width per point.
    pub widths: Vec<f64>,
}

impl Stroke {
    pub fn new(kind: StrokeKind, points: Vec<Point>, widths: Vec<f64>) -> Self {
        Self { kind, points, widths }
    }

    /// Every point and width is a finite number. Non-finite values do not
    /// survive a JSON snapshot.
    pub fn is_finite(&self) -> bool {
        self.points.iter().all(|p| p.is_finite()) && self.widths.iter().all(|w| w.is_finite())
    }

    /// Bounding box of the stroke's points.
    pub fn bounds(&self) -> Rect {
        let mut points = self.points.iter();
        let Some(first) = points.next() else {
            return Rect::ZERO;
        };
        points.fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
    }
}

/// Object payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Grid(GridLine),
    Drawing(Stroke),
}

/// A positioned drawable in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    pub position: Point,
    pub visible: bool,
    pub selectable: bool,
    pub kind: ObjectKind,
}

impl SceneObject {
    /// A visible, non-selectable grid line.
    pub fn grid_line(line: GridLine) -> Self {
        Self {
            id: Uuid::new_v4(),
            position: line.start,
            visible: true,
            selectable: false,
            kind: ObjectKind::Grid(line),
        }
    }

    /// A visible, selectable drawing positioned at its bounds origin.
    pub fn drawing(stroke: Stroke) -> Self {
        Self {
            id: Uuid::new_v4(),
            position: stroke.bounds().origin(),
            visible: true,
            selectable: true,
            kind: ObjectKind::Drawing(stroke),
        }
    }

    pub fn tag(&self) -> ObjectTag {
        match self.kind {
            ObjectKind::Grid(_) => ObjectTag::Grid,
            ObjectKind::Drawing(_) => ObjectTag::Drawing,
        }
    }

    pub fn is_grid(&self) -> bool {
        self.tag() == ObjectTag::Grid
    }

    /// The stroke, if this is a drawing.
    pub fn stroke(&self) -> Option<&Stroke> {
        match &self.kind {
            ObjectKind::Drawing(stroke) => Some(stroke),
            ObjectKind::Grid(_) => None,
        }
    }
}

/// The mutable scene owned by the rendering layer.
///
/// Every mutation sequence that must look atomic (for example replacing the
/// grid) happens inside one synchronous call against this trait.
pub trait Scene {
    /// Add an object, returning its id.
    fn add(&mut self, object: SceneObject) -> ObjectId;

    /// Remove an object by id.
    fn remove(&mut self, id: ObjectId) -> Option<SceneObject>;

    /// All objects, back to front.
    fn objects(&self) -> &[SceneObject];

    /// Mutable access to a single object.
    fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject>;

    /// Ask the renderer for a full repaint.
    fn request_repaint(&mut self);

    fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects().iter().find(|o| o.id == id)
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    fn grid_objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects().iter().filter(|o| o.tag() == ObjectTag::Grid)
    }

    fn drawings(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects().iter().filter(|o| o.tag() == ObjectTag::Drawing)
    }
}

/// In-memory scene.
#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    objects: Vec<SceneObject>,
    repaints: u64,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of repaint requests so far.
    pub fn repaint_count(&self) -> u64 {
        self.repaints
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Scene for MemoryScene {
    fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id;
        self.objects.push(object);
        id
    }

    fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        Some(self.objects.remove(index))
    }

    fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    fn request_repaint(&mut self) {
        self.repaints += 1;
    }
}

/// The drawings of a scene at one point in time.
///
/// Grid objects are never captured: the grid is rebuilt by its own lifecycle
/// and must not come back through undo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub drawings: Vec<SceneObject>,
}

impl SceneSnapshot {
    pub fn capture(scene: &impl Scene) -> Self {
        Self {
            drawings: scene.drawings().cloned().collect(),
        }
    }

    /// Replace the scene's drawings with this snapshot's, leaving the grid alone.
    pub fn restore(&self, scene: &mut impl Scene) {
        let current: Vec<ObjectId> = scene.drawings().map(|o| o.id).collect();
        for id in current {
            scene.remove(id);
        }
        for object in &self.drawings {
            scene.add(object.clone());
        }
        scene.request_repaint();
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
