use crate::color::Color;
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub type LampId = String;

pub const MIN_LAMP_SIZE: f64 = 20.0;
pub const MAX_LAMP_SIZE: f64 = 2000.0;
pub const DEFAULT_LAMP_SIZE: f64 = 60.0;
/// Radius of the resize grip drawn on a lamp's bottom-right corner.
pub const HANDLE_RADIUS: f64 = 6.0;

pub const DEFAULT_ON_COLOR: &str = "#ff4d4d";
pub const DEFAULT_OFF_COLOR: &str = "#3b2f33";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LampShape {
    #[default]
    Rectangle,
    Disc,
}

impl LampShape {
    pub fn label(&self) -> &'static str {
        match self {
            LampShape::Rectangle => "Rectangle",
            LampShape::Disc => "Disc",
        }
    }
}

/// Which part of a lamp the pointer landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LampPart {
    Body,
    ResizeHandle,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Lamp {
    pub id: LampId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub shape: LampShape,
    pub on_color: Color,
    pub off_color: Color,
}

impl Lamp {
    pub fn position(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }

    pub fn bottom_right(&self) -> DVec2 {
        self.position() + self.size()
    }

    /// Hit test against the painted shape, not just the bounding box.
    pub fn contains_point(&self, p: DVec2) -> bool {
        let min = self.position();
        let max = self.bottom_right();
        let in_box = p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y;
        match self.shape {
            LampShape::Rectangle => in_box,
            LampShape::Disc => {
                let half = self.size() / 2.0;
                let d = (p - (min + half)) / half;
                in_box && d.length_squared() <= 1.0
            }
        }
    }

    pub fn handle_contains(&self, p: DVec2) -> bool {
        p.distance_squared(self.bottom_right()) <= HANDLE_RADIUS * HANDLE_RADIUS
    }

    /// True when all four corners lie inside the box.
    pub fn is_within(&self, min: DVec2, max: DVec2) -> bool {
        let tl = self.position();
        let br = self.bottom_right();
        tl.x >= min.x && tl.y >= min.y && br.x <= max.x && br.y <= max.y
    }

    /// Copy with a fresh id, shifted by `offset`, named "<name> Copy".
    pub fn duplicate(&self, offset: DVec2) -> Lamp {
        Lamp {
            id: new_lamp_id(),
            name: format!("{} Copy", self.name),
            x: self.x + offset.x,
            y: self.y + offset.y,
            ..self.clone()
        }
    }
}

pub fn clamp_size(v: f64) -> f64 {
    if v.is_nan() {
        return MIN_LAMP_SIZE;
    }
    v.clamp(MIN_LAMP_SIZE, MAX_LAMP_SIZE)
}

static LAMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique for the life of the process: the counter never repeats, the
/// timestamp and nonce keep ids distinct across runs.
pub fn new_lamp_id() -> LampId {
    let n = LAMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let nonce = rand::random::<u32>() % 1_000_000;
    format!("lamp-{}-{}-{}", millis, nonce, n)
}

/// New lamp with factory defaults. Without a position, lamps cascade
/// diagonally so consecutive adds don't stack exactly.
pub fn create_lamp(index: usize, position: Option<DVec2>) -> Lamp {
    let cascade = 80.0 + 24.0 * index as f64;
    let pos = position.unwrap_or(DVec2::new(cascade, cascade));
    Lamp {
        id: new_lamp_id(),
        name: format!("Lamp {}", index + 1),
        x: pos.x,
        y: pos.y,
        width: DEFAULT_LAMP_SIZE,
        height: DEFAULT_LAMP_SIZE,
        shape: LampShape::Rectangle,
        on_color: Color::new(DEFAULT_ON_COLOR, 1.0),
        off_color: Color::new(DEFAULT_OFF_COLOR, 1.0),
    }
}

/// A single field-level edit, as issued by the inspector.
#[derive(Clone, Debug, PartialEq)]
pub enum LampUpdate {
    Name(String),
    Position { x: f64, y: f64 },
    Size { width: f64, height: f64 },
    Shape(LampShape),
    /// On and off colors always change together.
    Colors { on: Color, off: Color },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Project {
    pub version: u32,
    pub view_name: String,
    pub width: f64,
    pub height: f64,
    /// Paint order: later lamps draw on top.
    pub lamps: Vec<Lamp>,
}

impl Default for Project {
    fn default() -> Self {
        create_empty_project()
    }
}

pub fn create_empty_project() -> Project {
    Project {
        version: 2,
        view_name: "Main View".to_string(),
        width: 800.0,
        height: 600.0,
        lamps: Vec::new(),
    }
}

impl Project {
    pub fn lamp(&self, id: &str) -> Option<&Lamp> {
        self.lamps.iter().find(|l| l.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lamps.iter().any(|l| l.id == id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.lamps.iter().position(|l| l.id == id)
    }

    pub fn add_lamps(&mut self, lamps: impl IntoIterator<Item = Lamp>) {
        for mut lamp in lamps {
            lamp.width = clamp_size(lamp.width);
            lamp.height = clamp_size(lamp.height);
            self.lamps.push(lamp);
        }
    }

    /// Returns how many lamps were removed.
    pub fn remove_lamps(&mut self, ids: &[LampId]) -> usize {
        let before = self.lamps.len();
        self.lamps.retain(|l| !ids.contains(&l.id));
        before - self.lamps.len()
    }

    /// Apply one field update. Unknown ids are ignored and report `false`.
    pub fn apply(&mut self, id: &str, update: LampUpdate) -> bool {
        let Some(lamp) = self.lamps.iter_mut().find(|l| l.id == id) else {
            return false;
        };
        match update {
            LampUpdate::Name(name) => lamp.name = name,
            LampUpdate::Position { x, y } => {
                lamp.x = x;
                lamp.y = y;
            }
            LampUpdate::Size { width, height } => {
                lamp.width = clamp_size(width);
                lamp.height = clamp_size(height);
            }
            LampUpdate::Shape(shape) => lamp.shape = shape,
            LampUpdate::Colors { on, off } => {
                lamp.on_color = on;
                lamp.off_color = off;
            }
        }
        true
    }

    pub fn move_lamp(&mut self, id: &str, x: f64, y: f64) -> bool {
        self.apply(id, LampUpdate::Position { x, y })
    }

    pub fn bring_to_front(&mut self, id: &str) -> bool {
        let Some(i) = self.index_of(id) else { return false };
        let lamp = self.lamps.remove(i);
        self.lamps.push(lamp);
        true
    }

    pub fn send_to_back(&mut self, id: &str) -> bool {
        let Some(i) = self.index_of(id) else { return false };
        let lamp = self.lamps.remove(i);
        self.lamps.insert(0, lamp);
        true
    }

    /// Topmost lamp under the point. Resize grips win over bodies of the
    /// same lamp.
    pub fn hit_test(&self, p: DVec2) -> Option<(LampId, LampPart)> {
        self.lamps.iter().rev().find_map(|l| {
            if l.handle_contains(p) {
                Some((l.id.clone(), LampPart::ResizeHandle))
            } else if l.contains_point(p) {
                Some((l.id.clone(), LampPart::Body))
            } else {
                None
            }
        })
    }

    /// Ids of lamps fully inside the box spanned by two corners, in paint order.
    pub fn lamps_within(&self, a: DVec2, b: DVec2) -> Vec<LampId> {
        let min = a.min(b);
        let max = a.max(b);
        self.lamps
            .iter()
            .filter(|l| l.is_within(min, max))
            .map(|l| l.id.clone())
            .collect()
    }
}
