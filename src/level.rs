//! Parsed level geometry
//!
//! The asset loader turns the tile map's object layers into this structure;
//! the simulation never sees tiles or images. Rectangles become capsule walls
//! whose radius is half the short side.

use std::collections::HashSet;
use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, read_file};

/// Axis-aligned map rectangle (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Capsule covering the rectangle: (start, end, radius)
    pub fn to_capsule(&self) -> (DVec2, DVec2, f64) {
        let radius = self.width.min(self.height) / 2.0;
        let a = DVec2::new(self.x + radius, self.y + radius);
        let b = DVec2::new(self.x + self.width - radius, self.y + self.height - radius);
        (a, b, radius)
    }

    fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Enemy spawn point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemySpawn {
    pub pos: DVec2,
    #[serde(default)]
    pub turned_left: bool,
}

/// Electrified wall that a terminal can lift
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateSpec {
    pub id: u32,
    pub rect: Rect,
}

/// What interacting with a terminal does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalRole {
    /// Reveals the gate terminals
    Intro,
    /// Lifts a plasma gate and grants a life
    Gate { gate: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalSpec {
    pub rect: Rect,
    pub role: TerminalRole,
    /// Whether the terminal body blocks movement
    #[serde(default)]
    pub blocking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ButtonSpec {
    pub rect: Rect,
}

/// Everything the simulation needs to build a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    #[serde(default)]
    pub name: String,
    pub player_spawn: DVec2,
    #[serde(default)]
    pub walls: Vec<Rect>,
    #[serde(default)]
    pub enemies: Vec<EnemySpawn>,
    #[serde(default)]
    pub gates: Vec<GateSpec>,
    #[serde(default)]
    pub terminals: Vec<TerminalSpec>,
    #[serde(default)]
    pub buttons: Vec<ButtonSpec>,
}

impl LevelData {
    /// Parse and validate a level from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let level: Self =
            serde_json::from_str(json).map_err(|source| Error::Json { what: "level", source })?;
        level.validate()?;
        Ok(level)
    }

    /// Load and validate a level from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let level = Self::from_json(&read_file(path)?)?;
        log::info!(
            "Loaded level '{}' from {} ({} walls, {} enemies)",
            level.name,
            path.display(),
            level.walls.len(),
            level.enemies.len()
        );
        Ok(level)
    }

    /// Check cross references and geometry
    pub fn validate(&self) -> Result<()> {
        if !self.player_spawn.is_finite() {
            return Err(Error::InvalidLevel("player spawn is not finite".into()));
        }

        let rects = self
            .walls
            .iter()
            .chain(self.gates.iter().map(|g| &g.rect))
            .chain(self.terminals.iter().map(|t| &t.rect))
            .chain(self.buttons.iter().map(|b| &b.rect));
        for rect in rects {
            if !rect.is_valid() {
                return Err(Error::InvalidLevel(format!("degenerate rectangle {rect:?}")));
            }
        }

        if let Some(enemy) = self.enemies.iter().find(|e| !e.pos.is_finite()) {
            return Err(Error::InvalidLevel(format!(
                "enemy spawn is not finite: {:?}",
                enemy.pos
            )));
        }

        let mut gate_ids = HashSet::new();
        for gate in &self.gates {
            if !gate_ids.insert(gate.id) {
                return Err(Error::InvalidLevel(format!("duplicate gate id {}", gate.id)));
            }
        }
        for terminal in &self.terminals {
            if let TerminalRole::Gate { gate } = terminal.role {
                if !gate_ids.contains(&gate) {
                    return Err(Error::InvalidLevel(format!(
                        "terminal references unknown gate {gate}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Built-in test arena: a walled room split by two plasma gates, with an
    /// intro terminal near the spawn, a gate terminal on each side and two
    /// enemies facing the player.
    pub fn demo() -> Self {
        Self {
            name: "demo".to_string(),
            player_spawn: DVec2::new(120.0, 440.0),
            walls: vec![
                // Floor, ceiling, side walls
                Rect::new(0.0, 464.0, 960.0, 16.0),
                Rect::new(0.0, 0.0, 960.0, 16.0),
                Rect::new(0.0, 0.0, 16.0, 480.0),
                Rect::new(944.0, 0.0, 16.0, 480.0),
                // Floating platforms
                Rect::new(200.0, 360.0, 128.0, 16.0),
                Rect::new(600.0, 360.0, 128.0, 16.0),
            ],
            enemies: vec![
                EnemySpawn {
                    pos: DVec2::new(420.0, 440.0),
                    turned_left: true,
                },
                EnemySpawn {
                    pos: DVec2::new(860.0, 440.0),
                    turned_left: true,
                },
            ],
            gates: vec![
                GateSpec {
                    id: 0,
                    rect: Rect::new(500.0, 16.0, 16.0, 448.0),
                },
                GateSpec {
                    id: 1,
                    rect: Rect::new(780.0, 16.0, 16.0, 448.0),
                },
            ],
            terminals: vec![
                TerminalSpec {
                    rect: Rect::new(48.0, 432.0, 16.0, 32.0),
                    role: TerminalRole::Intro,
                    blocking: false,
                },
                TerminalSpec {
                    rect: Rect::new(260.0, 328.0, 16.0, 32.0),
                    role: TerminalRole::Gate { gate: 0 },
                    blocking: false,
                },
                TerminalSpec {
                    rect: Rect::new(660.0, 328.0, 16.0, 32.0),
                    role: TerminalRole::Gate { gate: 1 },
                    blocking: false,
                },
            ],
            buttons: vec![ButtonSpec {
                rect: Rect::new(900.0, 448.0, 16.0, 16.0),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_to_capsule_horizontal() {
        let (a, b, r) = Rect::new(0.0, 464.0, 960.0, 16.0).to_capsule();
        assert_eq!(r, 8.0);
        assert_eq!(a, DVec2::new(8.0, 472.0));
        assert_eq!(b, DVec2::new(952.0, 472.0));
    }

    #[test]
    fn test_rect_to_capsule_square_is_point() {
        let (a, b, r) = Rect::new(10.0, 10.0, 16.0, 16.0).to_capsule();
        assert_eq!(a, b);
        assert_eq!(r, 8.0);
    }

    #[test]
    fn test_demo_level_is_valid() {
        assert!(LevelData::demo().validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip_keeps_level() {
        let level = LevelData::demo();
        let json = serde_json::to_string(&level).unwrap();
        assert_eq!(LevelData::from_json(&json).unwrap(), level);
    }

    #[test]
    fn test_unknown_gate_rejected() {
        let mut level = LevelData::demo();
        level.terminals[1].role = TerminalRole::Gate { gate: 42 };
        assert!(matches!(level.validate(), Err(Error::InvalidLevel(_))));
    }

    #[test]
    fn test_duplicate_gate_rejected() {
        let mut level = LevelData::demo();
        level.gates[1].id = 0;
        assert!(matches!(level.validate(), Err(Error::InvalidLevel(_))));
    }

    #[test]
    fn test_degenerate_rect_rejected() {
        let mut level = LevelData::demo();
        level.walls.push(Rect::new(0.0, 0.0, 0.0, 10.0));
        assert!(matches!(level.validate(), Err(Error::InvalidLevel(_))));
    }

    #[test]
    fn test_minimal_json() {
        let level = LevelData::from_json(r#"{ "player_spawn": [10.0, 20.0] }"#).unwrap();
        assert_eq!(level.player_spawn, DVec2::new(10.0, 20.0));
        assert!(level.walls.is_empty());
    }
}
