use glam::Vec3;
use serde::Serialize;

use crate::palette::Rgb;

/// Object category; decides geometry, material and motion rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Foliage,
    Bauble,
    Garland,
    Gift,
    Light,
    StarOrnament,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Foliage,
        Category::Bauble,
        Category::Garland,
        Category::Gift,
        Category::Light,
        Category::StarOrnament,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Foliage => "foliage",
            Category::Bauble => "bauble",
            Category::Garland => "garland",
            Category::Gift => "gift",
            Category::Light => "light",
            Category::StarOrnament => "star_ornament",
        }
    }
}

/// Immutable placement of a single object.
#[derive(Debug, Clone, Serialize)]
pub struct OrnamentRecord {
    pub id: u32,
    pub category: Category,
    pub scatter_position: Vec3,
    pub tree_position: Vec3,
    pub nominal_scale: Vec3,
    pub color: Rgb,
    pub speed: f32,
    pub phase: f32,
    /// Per-axis angular rates; for gifts `y` holds the placed yaw instead.
    pub rotation_speed: Vec3,
}

/// Record indices grouped by category, in generation order.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    foliage: Vec<usize>,
    baubles: Vec<usize>,
    garland: Vec<usize>,
    gifts: Vec<usize>,
    lights: Vec<usize>,
    star_ornaments: Vec<usize>,
}

impl CategoryIndex {
    fn from_records(records: &[OrnamentRecord]) -> Self {
        let mut index = Self::default();
        for (position, record) in records.iter().enumerate() {
            index.slot_mut(record.category).push(position);
        }
        index
    }

    fn slot_mut(&mut self, category: Category) -> &mut Vec<usize> {
        match category {
            Category::Foliage => &mut self.foliage,
            Category::Bauble => &mut self.baubles,
            Category::Garland => &mut self.garland,
            Category::Gift => &mut self.gifts,
            Category::Light => &mut self.lights,
            Category::StarOrnament => &mut self.star_ornaments,
        }
    }

    pub fn get(&self, category: Category) -> &[usize] {
        match category {
            Category::Foliage => &self.foliage,
            Category::Bauble => &self.baubles,
            Category::Garland => &self.garland,
            Category::Gift => &self.gifts,
            Category::Light => &self.lights,
            Category::StarOrnament => &self.star_ornaments,
        }
    }
}

/// The full generated record set plus its per-category index lists.
#[derive(Debug, Clone)]
pub struct Layout {
    records: Vec<OrnamentRecord>,
    index: CategoryIndex,
}

impl Layout {
    pub(crate) fn new(records: Vec<OrnamentRecord>) -> Self {
        let index = CategoryIndex::from_records(&records);
        Self { records, index }
    }

    pub fn records(&self) -> &[OrnamentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn indices(&self, category: Category) -> &[usize] {
        self.index.get(category)
    }

    pub fn count(&self, category: Category) -> usize {
        self.index.get(category).len()
    }

    pub fn iter_category(&self, category: Category) -> impl Iterator<Item = &OrnamentRecord> {
        self.index
            .get(category)
            .iter()
            .map(move |&index| &self.records[index])
    }
}
