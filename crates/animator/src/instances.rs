use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat4, Quat, Vec3};
use layout::{Category, Layout, Palette};

/// Per-instance vertex data consumed by the renderer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl InstanceRaw {
    pub fn new(transform: &Transform, color: [f32; 4]) -> Self {
        Self {
            model: transform.matrix().to_cols_array_2d(),
            color,
        }
    }
}

/// Current pose of one object.
///
/// `euler` mirrors `orientation` in XYZ order so per-axis spin can accumulate
/// without drifting through repeated decomposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub orientation: Quat,
    pub euler: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
        euler: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn set_euler(&mut self, euler: Vec3) {
        self.euler = euler;
        self.orientation = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z);
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation.normalize();
        let (x, y, z) = self.orientation.to_euler(EulerRot::XYZ);
        self.euler = Vec3::new(x, y, z);
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Names one instance buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchId {
    Category(Category),
    /// Ribbon and bow geometry that follows each gift box.
    GiftRibbon,
    /// The single star crowning the tree.
    Topper,
}

impl BatchId {
    pub const ALL: [BatchId; 8] = [
        BatchId::Category(Category::Foliage),
        BatchId::Category(Category::Bauble),
        BatchId::Category(Category::Garland),
        BatchId::Category(Category::Gift),
        BatchId::GiftRibbon,
        BatchId::Category(Category::Light),
        BatchId::Category(Category::StarOrnament),
        BatchId::Topper,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BatchId::Category(category) => category.as_str(),
            BatchId::GiftRibbon => "gift_ribbon",
            BatchId::Topper => "topper",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstanceBatch {
    raw: Vec<InstanceRaw>,
    dirty: bool,
}

impl InstanceBatch {
    fn with_colors(colors: impl Iterator<Item = [f32; 4]>) -> Self {
        let raw = colors
            .map(|color| InstanceRaw::new(&Transform::IDENTITY, color))
            .collect();
        Self { raw, dirty: true }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn instances(&self) -> &[InstanceRaw] {
        &self.raw
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn write(&mut self, slot: usize, transform: &Transform) {
        if let Some(instance) = self.raw.get_mut(slot) {
            instance.model = transform.matrix().to_cols_array_2d();
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

/// Every instance buffer in render order, colours filled in at creation.
#[derive(Debug, Clone)]
pub struct InstanceBatches {
    batches: Vec<(BatchId, InstanceBatch)>,
}

impl InstanceBatches {
    pub fn from_layout(layout: &Layout) -> Self {
        let batches = BatchId::ALL
            .iter()
            .map(|&id| {
                let batch = match id {
                    BatchId::Category(category) => InstanceBatch::with_colors(
                        layout.iter_category(category).map(|r| r.color.to_rgba()),
                    ),
                    BatchId::GiftRibbon => InstanceBatch::with_colors(
                        layout
                            .iter_category(Category::Gift)
                            .map(|_| Palette::GOLD.to_rgba()),
                    ),
                    BatchId::Topper => {
                        InstanceBatch::with_colors(std::iter::once(Palette::GOLD.to_rgba()))
                    }
                };
                (id, batch)
            })
            .collect();
        Self { batches }
    }

    pub fn get(&self, id: BatchId) -> Option<&InstanceBatch> {
        self.batches
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, batch)| batch)
    }

    pub fn get_mut(&mut self, id: BatchId) -> Option<&mut InstanceBatch> {
        self.batches
            .iter_mut()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, batch)| batch)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BatchId, &InstanceBatch)> {
        self.batches.iter().map(|(id, batch)| (*id, batch))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BatchId, &mut InstanceBatch)> {
        self.batches.iter_mut().map(|(id, batch)| (*id, batch))
    }

    pub fn dirty_count(&self) -> usize {
        self.batches.iter().filter(|(_, b)| b.is_dirty()).count()
    }
}
