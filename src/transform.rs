//! Object transforms with lazily cached matrices.
//!
//! A [`Transform`] stores position, rotation and scale and derives its
//! model matrix (and inverse) on demand, caching the result until a
//! component changes. Transforms live in a [`TransformStore`] arena and
//! are shared between handles by [`TransformId`]; moving one transform
//! moves every placement that references it.

use glam::{Mat4, Quat, Vec3};

/// Identifier of a [`Transform`] within its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransformId(pub u32);

impl TransformId {
    /// Store creation index, used as the transform tie-breaker in the
    /// draw-list sort.
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// Position, rotation and scale with cached derived matrices.
#[derive(Debug, Clone)]
pub struct Transform {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    matrix: Option<Mat4>,
    inverse: Option<Mat4>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            matrix: None,
            inverse: None,
        }
    }
}

impl Transform {
    /// Identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translation component.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Rotation component.
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Scale component.
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Set the translation, invalidating cached matrices.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.invalidate();
    }

    /// Set the rotation, invalidating cached matrices.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.invalidate();
    }

    /// Set the scale, invalidating cached matrices.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.matrix = None;
        self.inverse = None;
    }

    /// The model matrix, computed and cached on first access after a
    /// change.
    pub fn matrix(&mut self) -> Mat4 {
        *self.matrix.get_or_insert_with(|| {
            Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
        })
    }

    /// The inverse model matrix, cached like [`matrix`](Self::matrix).
    ///
    /// Debug builds assert the matrix is invertible; a zero scale component
    /// makes it singular.
    pub fn inverse_matrix(&mut self) -> Mat4 {
        if let Some(inverse) = self.inverse {
            return inverse;
        }
        let matrix = self.matrix();
        debug_assert!(
            matrix.determinant().abs() > f32::EPSILON,
            "inverting a singular transform (zero scale?)"
        );
        let inverse = matrix.inverse();
        self.inverse = Some(inverse);
        inverse
    }

    /// Column-major matrix elements, as uniforms expect them.
    pub fn elements(&mut self) -> [f32; 16] {
        self.matrix().to_cols_array()
    }
}

/// Arena of transforms, indexed by [`TransformId`].
#[derive(Debug, Default)]
pub struct TransformStore {
    transforms: Vec<Transform>,
}

impl TransformStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transform and return its id.
    pub fn create(&mut self, transform: Transform) -> TransformId {
        let id = TransformId(self.transforms.len() as u32);
        self.transforms.push(transform);
        id
    }

    /// Look up a transform.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this store.
    pub fn get(&self, id: TransformId) -> &Transform {
        &self.transforms[id.0 as usize]
    }

    /// Look up a transform mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this store.
    pub fn get_mut(&mut self, id: TransformId) -> &mut Transform {
        &mut self.transforms[id.0 as usize]
    }

    /// Number of transforms created.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether no transforms exist.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

static_assertions::assert_impl_all!(Transform: Send, Sync);
static_assertions::assert_impl_all!(TransformStore: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_by_default() {
        let mut transform = Transform::new();
        assert_eq!(transform.matrix(), Mat4::IDENTITY);
        assert_eq!(transform.inverse_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_cache_invalidation_on_change() {
        let mut transform = Transform::new();
        let before = transform.matrix();

        transform.set_position(Vec3::new(1.0, 2.0, 3.0));
        let after = transform.matrix();
        assert_ne!(before, after);
        assert_eq!(after.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_inverse_round_trip() {
        let mut transform = Transform::new();
        transform.set_position(Vec3::new(4.0, -1.0, 0.5));
        transform.set_rotation(Quat::from_rotation_y(1.2));
        transform.set_scale(Vec3::splat(2.0));

        let product = transform.matrix() * transform.inverse_matrix();
        for (a, b) in product
            .to_cols_array()
            .iter()
            .zip(Mat4::IDENTITY.to_cols_array().iter())
        {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_elements_are_column_major() {
        let mut transform = Transform::new();
        transform.set_position(Vec3::new(7.0, 8.0, 9.0));
        let elements = transform.elements();
        assert_eq!(&elements[12..15], &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_store_hands_out_creation_ordered_ids() {
        let mut store = TransformStore::new();
        let a = store.create(Transform::new());
        let b = store.create(Transform::new());
        assert!(a.index() < b.index());
        store.get_mut(a).set_scale(Vec3::splat(3.0));
        assert_eq!(store.get(a).scale(), Vec3::splat(3.0));
    }
}
