use std::fmt;

use serde::{Deserialize, Serialize};

/// Идентификатор меша в сцене (выдаётся рендерером)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshId(pub u64);

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

/// Тип семантического объекта плана этажа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Room,
    Wall,
    Connection,
    Stair,
    Lift,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityType::Room => "room",
            EntityType::Wall => "wall",
            EntityType::Connection => "connection",
            EntityType::Stair => "stair",
            EntityType::Lift => "lift",
        };
        f.write_str(name)
    }
}

/// Идентичность объекта: (этаж, тип, имя)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub floor_id: String,
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityKey {
    pub fn new(
        floor_id: impl Into<String>,
        entity_type: EntityType,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            floor_id: floor_id.into(),
            entity_type,
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.floor_id, self.entity_type, self.entity_id)
    }
}

/// Позиция в исходном тексте (строки и столбцы с нуля, как у парсера)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Диапазон исходного текста, в котором определён объект
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceRange {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    pub fn start(&self) -> SourcePosition {
        SourcePosition::new(self.start_line, self.start_column)
    }

    pub fn end(&self) -> SourcePosition {
        SourcePosition::new(self.end_line, self.end_column)
    }

    /// Позиция внутри диапазона (границы включительно)
    pub fn contains(&self, pos: SourcePosition) -> bool {
        self.start() <= pos && pos <= self.end()
    }

    /// Диапазон целиком лежит внутри `other`
    pub fn is_within(&self, other: &SourceRange) -> bool {
        other.start() <= self.start() && self.end() <= other.end()
    }

    /// Пересечение с полуоткрытым диапазоном `[start, end)` выделения
    pub fn overlaps(&self, start: SourcePosition, end: SourcePosition) -> bool {
        self.start() < end && start < self.end()
    }

    /// Ключ «размера» диапазона: монотонен относительно вложенности,
    /// поэтому вложенный диапазон всегда меньше объемлющего.
    pub fn extent(&self) -> (u32, i64) {
        (
            self.end_line.saturating_sub(self.start_line),
            self.end_column as i64 - self.start_column as i64,
        )
    }
}

/// Семантический объект плана (комната, стена, проход, лестница, лифт)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub floor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_range: Option<SourceRange>,
}

impl Entity {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.floor_id.clone(), self.entity_type, self.entity_id.clone())
    }
}

/// Меш, помеченный рендерером принадлежностью к объекту
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedMesh {
    pub mesh: MeshId,
    pub entity_type: EntityType,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_range: Option<SourceRange>,
}

/// Результат рендера одного этажа после успешного разбора
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FloorBatch {
    pub floor_id: String,
    pub meshes: Vec<TaggedMesh>,
}
