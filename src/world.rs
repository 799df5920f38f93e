//! World and puzzle records
//!
//! A world is read once at puzzle-select time and never mutated. Live play
//! state is derived from a `Puzzle` by `sim::Layout`.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::WORLD_TUTORIAL;
use crate::error::WorldError;

/// Integer grid coordinate of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    /// Nearest cell to a position (positions at rest are always cell centers)
    #[inline]
    pub fn from_vec3(v: Vec3) -> Self {
        Self::new(v.x.round() as i32, v.y.round() as i32, v.z.round() as i32)
    }
}

/// Kinds of element a puzzle can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// The ship; the only element the player moves
    Sphere,
    Block,
    Goal,
    /// Declared in pairs; entering one exits through its partner
    Portal,
    Scenery,
    Sky,
    Outline,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Sphere => "sphere",
            ElementKind::Block => "block",
            ElementKind::Goal => "goal",
            ElementKind::Portal => "portal",
            ElementKind::Scenery => "scenery",
            ElementKind::Sky => "sky",
            ElementKind::Outline => "outline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sphere" => Some(ElementKind::Sphere),
            "block" => Some(ElementKind::Block),
            "goal" => Some(ElementKind::Goal),
            "portal" => Some(ElementKind::Portal),
            "scenery" => Some(ElementKind::Scenery),
            "sky" => Some(ElementKind::Sky),
            "outline" => Some(ElementKind::Outline),
            _ => None,
        }
    }

    /// Whether the element occupies a grid cell
    pub fn has_location(&self) -> bool {
        !matches!(self, ElementKind::Sky | ElementKind::Outline)
    }
}

/// A named game object as declared in the world file
///
/// The rendering attributes are opaque to the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    /// Raw kind tag; checked by [`Element::kind`]
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub shader: String,
    #[serde(default)]
    pub mesh: String,
    #[serde(default)]
    pub colour: String,
    #[serde(default)]
    pub texture: String,
    #[serde(default)]
    pub material: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Element {
    pub fn new(name: &str, kind: ElementKind, location: Location) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.as_str().to_string(),
            shader: String::new(),
            mesh: String::new(),
            colour: String::new(),
            texture: String::new(),
            material: String::new(),
            location: kind.has_location().then_some(location),
        }
    }

    /// Typed kind of this element
    pub fn kind(&self) -> Result<ElementKind, WorldError> {
        ElementKind::parse(&self.kind).ok_or_else(|| WorldError::UnknownElementKind {
            element: self.name.clone(),
            kind: self.kind.clone(),
        })
    }

    /// Location, required for every kind that occupies a cell
    pub fn cell(&self) -> Result<Location, WorldError> {
        self.location.ok_or_else(|| WorldError::MissingLocation {
            element: self.name.clone(),
        })
    }
}

/// Narrative text shown when a sphere comes to rest on its cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    pub name: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub content: Vec<String>,
}

impl Dialog {
    /// Numeric suffix of the name ("intro-3" -> 3); 0 when there is none
    ///
    /// Suffixes too long for a `u64` saturate so they still sort last.
    pub fn order(&self) -> u64 {
        let digits = self
            .name
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| &self.name[i..])
            .unwrap_or("");
        if digits.is_empty() {
            return 0;
        }
        digits.parse().unwrap_or(u64::MAX)
    }
}

/// Shader sources referenced by elements; never interpreted by the core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShaderDefinition {
    #[serde(default)]
    pub vertex: String,
    #[serde(default)]
    pub fragment: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub uniforms: Vec<String>,
}

/// One level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    /// Par move count
    pub target: u32,
    #[serde(default)]
    pub description: String,
    pub elements: Vec<Element>,
    #[serde(default)]
    pub dialogs: Vec<Dialog>,
}

impl Puzzle {
    /// Check every element kind and location, and that portals pair up
    pub fn validate(&self) -> Result<(), WorldError> {
        let mut portals = 0;
        for element in &self.elements {
            let kind = element.kind()?;
            if kind.has_location() {
                element.cell()?;
            }
            if kind == ElementKind::Portal {
                portals += 1;
            }
        }
        if portals % 2 != 0 {
            return Err(WorldError::OddPortalCount { count: portals });
        }
        Ok(())
    }

    /// BLAKE3 digest of the canonical JSON encoding, lowercase hex
    ///
    /// Solutions are stored under this key so edits to other puzzles in
    /// the same world never invalidate them.
    pub fn content_hash(&self) -> Result<String, WorldError> {
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, self)?;
        Ok(hasher.finalize().to_hex().to_string())
    }
}

/// A themed collection of puzzles sharing one grid size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub foreground_colour: String,
    #[serde(default)]
    pub background_colour: String,
    /// Edge length of the play cube in cells
    pub size: u32,
    #[serde(default)]
    pub shaders: BTreeMap<String, ShaderDefinition>,
    pub puzzles: Vec<Puzzle>,
}

impl World {
    pub fn from_json(json: &str) -> Result<Self, WorldError> {
        let world: World = serde_json::from_str(json)?;
        world.validate()?;
        log::info!(
            "Loaded world '{}' ({} puzzles, size {})",
            world.name,
            world.puzzles.len(),
            world.size
        );
        Ok(world)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, WorldError> {
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        Self::from_json(&json)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), WorldError> {
        if self.size == 0 {
            return Err(WorldError::InvalidSize);
        }
        self.puzzles.iter().try_for_each(Puzzle::validate)
    }

    /// Puzzle by player-facing number (1-based)
    pub fn puzzle(&self, number: usize) -> Result<&Puzzle, WorldError> {
        number
            .checked_sub(1)
            .and_then(|i| self.puzzles.get(i))
            .ok_or(WorldError::PuzzleIndex {
                index: number,
                count: self.puzzles.len(),
            })
    }

    pub fn puzzle_count(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_tutorial(&self) -> bool {
        self.name == WORLD_TUTORIAL
    }
}
