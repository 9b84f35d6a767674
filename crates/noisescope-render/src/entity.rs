//! Drawable entities.

use glam::Mat4;

use crate::error::{RenderError, Result};
use crate::mesh::DrawRange;
use crate::view::Transform;

/// Largest number of entities in one [`Entities`] list.
pub const MAX_ENTITIES: usize = 1024;

/// The pipeline an entity is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Flat-coloured geometry.
    Test,
    /// Geometry sampling the display texture.
    Texture,
}

/// A mesh placed in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
    pub transform: Transform,
    pub mesh: DrawRange,
    pub pipeline: PipelineKind,
    mvp: Mat4,
}

impl Entity {
    pub fn new(transform: Transform, mesh: DrawRange, pipeline: PipelineKind) -> Self {
        Self {
            transform,
            mesh,
            pipeline,
            mvp: Mat4::IDENTITY,
        }
    }

    /// Matrix computed by the last [`Entities::update`].
    pub const fn mvp(&self) -> Mat4 {
        self.mvp
    }
}

/// Handle of an entity inside [`Entities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(usize);

/// Bounded list of entities drawn each frame, in insertion order.
#[derive(Debug, Default)]
pub struct Entities {
    entities: Vec<Entity>,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entity: Entity) -> Result<EntityId> {
        if self.entities.len() >= MAX_ENTITIES {
            return Err(RenderError::EntityLimit {
                limit: MAX_ENTITIES,
            });
        }
        self.entities.push(entity);
        Ok(EntityId(self.entities.len() - 1))
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }

    pub fn transform_mut(&mut self, id: EntityId) -> Option<&mut Transform> {
        self.entities.get_mut(id.0).map(|entity| &mut entity.transform)
    }

    /// Recompute every entity's model-view-projection matrix.
    pub fn update(&mut self, view_projection: Mat4) {
        for entity in &mut self.entities {
            entity.mvp = view_projection * entity.transform.model_matrix();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{Vec3, Vec4};

    fn range() -> DrawRange {
        DrawRange {
            index_count: 3,
            first_index: 0,
            vertex_offset: 0,
        }
    }

    #[test]
    fn push_fails_past_the_limit() {
        let mut entities = Entities::new();
        let entity = Entity::new(Transform::default(), range(), PipelineKind::Test);
        for _ in 0..MAX_ENTITIES {
            entities.push(entity).unwrap();
        }

        assert!(matches!(
            entities.push(entity),
            Err(RenderError::EntityLimit { limit: MAX_ENTITIES })
        ));
        assert_eq!(entities.len(), MAX_ENTITIES);
    }

    #[test]
    fn update_applies_model_then_view_projection() {
        let mut entities = Entities::new();
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            scale: Vec3::new(16.0, 9.0, 1.0),
            ..Transform::default()
        };
        let id = entities
            .push(Entity::new(transform, range(), PipelineKind::Texture))
            .unwrap();

        let view_projection = Mat4::from_scale(Vec3::splat(2.0));
        entities.update(view_projection);

        let corner = entities.get(id).unwrap().mvp() * Vec4::new(1.0, 1.0, 0.0, 1.0);
        assert_relative_eq!(corner.x, 34.0);
        assert_relative_eq!(corner.y, 22.0);
        assert_relative_eq!(corner.z, 6.0);
    }

    #[test]
    fn transform_edits_show_up_after_update() {
        let mut entities = Entities::new();
        let id = entities
            .push(Entity::new(Transform::default(), range(), PipelineKind::Test))
            .unwrap();

        entities.transform_mut(id).unwrap().position.x = 5.0;
        entities.update(Mat4::IDENTITY);

        assert_relative_eq!(entities.get(id).unwrap().mvp().w_axis.x, 5.0);
    }
}
