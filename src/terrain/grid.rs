//! In-memory terrain grid with destructible structures

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::types::Vec2;
use crate::terrain::{CoverValues, Terrain};

/// Ground type of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    #[default]
    Open,
    Rough,
    Forest,
    Road,
    ShallowWater,
    DeepWater,
    Wall,
}

impl TerrainKind {
    /// Movement cost multiplier (1.0 = normal), `None` when impassable
    pub fn movement_cost(&self) -> Option<f32> {
        match self {
            TerrainKind::Open => Some(1.0),
            TerrainKind::Rough => Some(1.5),
            TerrainKind::Forest => Some(2.0),
            TerrainKind::Road => Some(0.8),
            TerrainKind::ShallowWater => Some(3.0),
            TerrainKind::DeepWater | TerrainKind::Wall => None,
        }
    }

    /// Opacity added per cell of this terrain crossed by a sight line
    pub fn opacity(&self) -> f32 {
        match self {
            TerrainKind::Forest => 0.2,
            TerrainKind::Rough => 0.02,
            _ => 0.0,
        }
    }

    pub fn blocks_vision(&self) -> bool {
        matches!(self, TerrainKind::Wall)
    }

    pub fn cover(&self) -> CoverValues {
        match self {
            TerrainKind::Open => CoverValues::new(0.0, 0.1),
            TerrainKind::Rough => CoverValues::new(0.1, 0.3),
            TerrainKind::Forest => CoverValues::new(0.3, 0.5),
            TerrainKind::Road => CoverValues::NONE,
            TerrainKind::ShallowWater => CoverValues::NONE,
            TerrainKind::DeepWater => CoverValues::NONE,
            TerrainKind::Wall => CoverValues::new(0.9, 0.9),
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(TerrainKind::Open),
            ',' => Some(TerrainKind::Rough),
            'T' => Some(TerrainKind::Forest),
            '=' => Some(TerrainKind::Road),
            '~' => Some(TerrainKind::ShallowWater),
            'W' => Some(TerrainKind::DeepWater),
            '#' => Some(TerrainKind::Wall),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    House,
    LowWall,
}

/// Something built on a cell. Destroyed structures stay as rubble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub kind: StructureKind,
    cover: CoverValues,
    opacity: f32,
    blocks_vision: bool,
    passable: bool,
    pub destroyed: bool,
}

impl Structure {
    pub fn house() -> Self {
        Self {
            kind: StructureKind::House,
            cover: CoverValues::new(0.8, 0.8),
            opacity: 1.0,
            blocks_vision: true,
            passable: false,
            destroyed: false,
        }
    }

    pub fn low_wall() -> Self {
        Self {
            kind: StructureKind::LowWall,
            cover: CoverValues::new(0.4, 0.8),
            opacity: 0.1,
            blocks_vision: false,
            passable: true,
            destroyed: false,
        }
    }

    /// Rubble keeps half its cover
    pub fn cover(&self) -> CoverValues {
        if self.destroyed {
            self.cover.halved()
        } else {
            self.cover
        }
    }

    pub fn opacity(&self) -> f32 {
        if self.destroyed {
            self.opacity * 0.5
        } else {
            self.opacity
        }
    }

    pub fn blocks_vision(&self) -> bool {
        self.blocks_vision && !self.destroyed
    }

    /// Extra movement cost, `None` when the structure cannot be entered
    pub fn movement_cost(&self) -> Option<f32> {
        if self.destroyed {
            Some(2.0)
        } else if self.passable {
            Some(1.5)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: i32,
    height: i32,
    cell_size: f32,
    cells: Vec<TerrainKind>,
    structures: BTreeMap<(i32, i32), Structure>,
}

impl TerrainGrid {
    /// Open ground of `width` x `height` cells
    pub fn open(width: i32, height: i32, cell_size: f32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cell_size,
            cells: vec![TerrainKind::Open; (width * height) as usize],
            structures: BTreeMap::new(),
        }
    }

    /// Build from rows of characters; the first row is y = 0.
    ///
    /// `.` open, `,` rough, `T` forest, `=` road, `~` shallow water,
    /// `W` deep water, `#` wall, `H` house, `n` low wall.
    pub fn from_ascii(layout: &str, cell_size: f32) -> Result<Self, ConfigError> {
        check_cell_size(cell_size)?;
        let rows: Vec<&str> = layout.lines().map(str::trim).filter(|row| !row.is_empty()).collect();
        let height = rows.len() as i32;
        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0) as i32;
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidSetting("terrain layout is empty".into()));
        }

        let mut grid = Self::open(width, height, cell_size);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() as i32 != width {
                return Err(ConfigError::InvalidSetting(format!(
                    "terrain row {} has {} cells, expected {}",
                    y,
                    row.chars().count(),
                    width
                )));
            }
            for (x, c) in row.chars().enumerate() {
                let cell = (x as i32, y as i32);
                match c {
                    'H' => grid.place_structure(cell, Structure::house()),
                    'n' => grid.place_structure(cell, Structure::low_wall()),
                    other => {
                        let kind = TerrainKind::from_char(other).ok_or_else(|| {
                            ConfigError::InvalidSetting(format!("unknown terrain character {other:?}"))
                        })?;
                        grid.set_kind(cell, kind);
                    }
                }
            }
        }
        Ok(grid)
    }

    /// Checks a simulation runs before accepting the grid. Grids built with
    /// [`TerrainGrid::open`] or deserialized skip the `from_ascii` checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_cell_size(self.cell_size)?;
        let expected = (self.width as usize) * (self.height as usize);
        if self.width <= 0 || self.height <= 0 || self.cells.len() != expected {
            return Err(ConfigError::InvalidSetting(format!(
                "terrain has {} cells, expected {}x{}",
                self.cells.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn cell_index(&self, cell: (i32, i32)) -> Option<usize> {
        let (x, y) = cell;
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    pub fn kind_at_cell(&self, cell: (i32, i32)) -> Option<TerrainKind> {
        self.cell_index(cell).map(|i| self.cells[i])
    }

    pub fn set_kind(&mut self, cell: (i32, i32), kind: TerrainKind) {
        if let Some(i) = self.cell_index(cell) {
            self.cells[i] = kind;
        }
    }

    pub fn place_structure(&mut self, cell: (i32, i32), structure: Structure) {
        if self.cell_index(cell).is_some() {
            self.structures.insert(cell, structure);
        }
    }

    pub fn structure_at(&self, cell: (i32, i32)) -> Option<&Structure> {
        self.structures.get(&cell)
    }

    /// Destroy every intact structure whose cell center lies within
    /// `radius` of `center`. Returns the affected cells in order.
    pub fn destroy_within(&mut self, center: Vec2, radius: f32) -> Vec<(i32, i32)> {
        let radius_sq = radius * radius;
        let size = self.cell_size;
        let mut destroyed = Vec::new();
        for (cell, structure) in self.structures.iter_mut() {
            let cell_center = Vec2::new((cell.0 as f32 + 0.5) * size, (cell.1 as f32 + 0.5) * size);
            if !structure.destroyed && cell_center.distance_sq(&center) <= radius_sq {
                structure.destroyed = true;
                destroyed.push(*cell);
            }
        }
        destroyed
    }
}

impl Terrain for TerrainGrid {
    fn movement_cost(&self, pos: Vec2) -> Option<f32> {
        let cell = self.cell_of(pos);
        let base = self.kind_at_cell(cell)?.movement_cost()?;
        match self.structures.get(&cell) {
            Some(structure) => structure.movement_cost().map(|extra| base.max(extra)),
            None => Some(base),
        }
    }

    fn cover_values(&self, pos: Vec2) -> CoverValues {
        let cell = self.cell_of(pos);
        let base = self.kind_at_cell(cell).map(|k| k.cover()).unwrap_or(CoverValues::NONE);
        match self.structures.get(&cell) {
            Some(structure) => base.max(&structure.cover()),
            None => base,
        }
    }

    fn blocks_vision(&self, pos: Vec2) -> bool {
        let cell = self.cell_of(pos);
        let terrain = self.kind_at_cell(cell).is_some_and(|k| k.blocks_vision());
        terrain || self.structures.get(&cell).is_some_and(|s| s.blocks_vision())
    }

    fn opacity(&self, pos: Vec2) -> f32 {
        let cell = self.cell_of(pos);
        let terrain = self.kind_at_cell(cell).map(|k| k.opacity()).unwrap_or(0.0);
        terrain + self.structures.get(&cell).map(|s| s.opacity()).unwrap_or(0.0)
    }

    fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

fn check_cell_size(cell_size: f32) -> Result<(), ConfigError> {
    if cell_size.is_finite() && cell_size > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSetting(format!(
            "terrain cell_size must be positive, got {cell_size}"
        )))
    }
}
