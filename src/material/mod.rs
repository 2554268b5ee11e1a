//! Materials and shader programs.
//!
//! A [`Material`] pairs a shader program with the surface properties that
//! program consumes. Materials live in a [`MaterialStore`] arena and are
//! referenced by [`MaterialId`]; handles and draw lists never hold material
//! pointers, so a material can be edited or disabled without touching the
//! geometry that uses it.
//!
//! Shader programs are singletons: one instance per concrete program type,
//! registered once in a [`ShaderRegistry`] and shared by every material
//! that names its [`ShaderKey`]. The registry hands out creation-ordered
//! keys, which double as the tie-breaker in the draw-list sort.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::command::CommandBuffer;
use crate::mesh::layout::VertexLayout;
use crate::types::ProgramId;

/// Identifier of a [`Material`] within its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// Surface properties consumed by a shader program.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialProps {
    /// Unlit constant color.
    Solid {
        /// RGBA color.
        color: [f32; 4],
    },
    /// Textured opaque surface.
    Textured {
        /// Base color texture.
        base_texture: crate::types::TextureId,
        /// Exclude this surface from fog blending.
        no_fog: bool,
    },
    /// Alpha-blended surface, drawn after all opaque geometry.
    Translucent {
        /// Base color texture, if any.
        base_texture: Option<crate::types::TextureId>,
        /// Blend factor.
        alpha: f32,
        /// Sample the captured opaque frame (water, glass).
        refract: bool,
    },
}

impl MaterialProps {
    /// Whether surfaces with these properties are alpha-blended.
    pub fn is_translucent(&self) -> bool {
        matches!(self, MaterialProps::Translucent { .. })
    }

    /// Whether these properties sample the captured opaque frame.
    pub fn refracts(&self) -> bool {
        matches!(self, MaterialProps::Translucent { refract: true, .. })
    }

    /// The base color texture, if these properties carry one.
    pub fn base_texture(&self) -> Option<crate::types::TextureId> {
        match self {
            MaterialProps::Solid { .. } => None,
            MaterialProps::Textured { base_texture, .. } => Some(*base_texture),
            MaterialProps::Translucent { base_texture, .. } => *base_texture,
        }
    }
}

/// A shader program plus the surface properties it draws with.
#[derive(Debug, Clone)]
pub struct Material {
    program: ShaderKey,
    sort_index: u32,
    /// Disabled materials make their geometry invisible without removing it.
    pub enabled: bool,
    /// Surface properties.
    pub props: MaterialProps,
}

impl Material {
    /// The shader program this material draws with.
    pub fn program(&self) -> ShaderKey {
        self.program
    }

    /// Creation-order index, the material tie-breaker in the draw sort.
    pub fn sort_index(&self) -> u32 {
        self.sort_index
    }

    /// Whether this material is alpha-blended.
    pub fn is_translucent(&self) -> bool {
        self.props.is_translucent()
    }

    /// Whether this material samples the captured opaque frame.
    pub fn refracts(&self) -> bool {
        self.props.refracts()
    }
}

/// Arena of materials, indexed by [`MaterialId`].
#[derive(Debug, Default)]
pub struct MaterialStore {
    materials: Vec<Material>,
}

impl MaterialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a material drawing with `program`.
    ///
    /// The creation order fixes the material's sort index for the lifetime
    /// of the store.
    pub fn create(&mut self, program: ShaderKey, props: MaterialProps) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(Material {
            program,
            sort_index: id.0,
            enabled: true,
            props,
        });
        log::debug!("MaterialStore: created material {:?}", id);
        id
    }

    /// Look up a material.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this store.
    pub fn get(&self, id: MaterialId) -> &Material {
        &self.materials[id.0 as usize]
    }

    /// Look up a material mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this store.
    pub fn get_mut(&mut self, id: MaterialId) -> &mut Material {
        &mut self.materials[id.0 as usize]
    }

    /// Number of materials created.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether no materials exist.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Identifier of a registered shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderKey(u32);

impl ShaderKey {
    /// Registry creation index, the program tie-breaker in the draw sort.
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// A compiled GPU shader program that knows how to record its own state.
///
/// Implementations translate engine-level concepts (a material, a model
/// matrix, a vertex layout) into commands on the [`CommandBuffer`]. The
/// draw list calls these in a fixed cascade and never touches uniform
/// locations itself.
pub trait ShaderProgram: Send + Sync {
    /// The underlying GPU program object.
    fn program_id(&self) -> ProgramId;

    /// Coarse draw-order class. Lower draws earlier; programs sharing a
    /// class are ordered by registration. Defaults to `0`.
    fn sort_order(&self) -> i32 {
        0
    }

    /// Whether compilation and linking succeeded. Handles whose program is
    /// not compiled are filtered out at draw-list build.
    fn is_compiled(&self) -> bool;

    /// Record the program switch and per-frame state (camera matrices,
    /// fog). Called once per program per frame.
    fn buffer_setup(&self, cmd: &mut CommandBuffer);

    /// Record material-specific state (textures, colors, blend factors).
    fn buffer_material(&self, cmd: &mut CommandBuffer, material: &Material);

    /// Record the model matrix uniform.
    fn buffer_model_matrix(&self, cmd: &mut CommandBuffer, matrix: &[f32; 16]);

    /// Record enabling the attribute arrays this layout provides.
    fn buffer_enable_attributes(&self, cmd: &mut CommandBuffer, layout: &VertexLayout) {
        for attribute in &layout.attributes {
            cmd.enable_vertex_attrib(attribute.semantic.location());
        }
    }

    /// Record disabling the attribute arrays this layout provides.
    fn buffer_disable_attributes(&self, cmd: &mut CommandBuffer, layout: &VertexLayout) {
        for attribute in &layout.attributes {
            cmd.disable_vertex_attrib(attribute.semantic.location());
        }
    }
}

/// Registry of shader program singletons, one per concrete type.
#[derive(Default)]
pub struct ShaderRegistry {
    programs: Vec<Arc<dyn ShaderProgram>>,
    by_type: HashMap<TypeId, ShaderKey>,
}

impl ShaderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program singleton, or return the existing key when a
    /// program of the same type was registered before.
    pub fn register<P: ShaderProgram + 'static>(&mut self, program: P) -> ShaderKey {
        let type_id = TypeId::of::<P>();
        if let Some(key) = self.by_type.get(&type_id) {
            log::debug!("ShaderRegistry: program type already registered as {:?}", key);
            return *key;
        }
        let key = ShaderKey(self.programs.len() as u32);
        self.programs.push(Arc::new(program));
        self.by_type.insert(type_id, key);
        log::debug!("ShaderRegistry: registered program {:?}", key);
        key
    }

    /// Look up a program by key.
    ///
    /// # Panics
    ///
    /// Panics if `key` did not come from this registry.
    pub fn get(&self, key: ShaderKey) -> &Arc<dyn ShaderProgram> {
        &self.programs[key.0 as usize]
    }

    /// The key under which a program type was registered, if any.
    pub fn key_of<P: ShaderProgram + 'static>(&self) -> Option<ShaderKey> {
        self.by_type.get(&TypeId::of::<P>()).copied()
    }

    /// Number of registered programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether no programs are registered.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl std::fmt::Debug for ShaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderRegistry")
            .field("programs", &self.programs.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(Material: Send, Sync);
static_assertions::assert_impl_all!(MaterialStore: Send, Sync);
static_assertions::assert_impl_all!(ShaderRegistry: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TextureId;

    struct ProgramA;
    struct ProgramB;

    impl ShaderProgram for ProgramA {
        fn program_id(&self) -> ProgramId {
            ProgramId(1)
        }
        fn is_compiled(&self) -> bool {
            true
        }
        fn buffer_setup(&self, cmd: &mut CommandBuffer) {
            cmd.use_program(self.program_id());
        }
        fn buffer_material(&self, _cmd: &mut CommandBuffer, _material: &Material) {}
        fn buffer_model_matrix(&self, _cmd: &mut CommandBuffer, _matrix: &[f32; 16]) {}
    }

    impl ShaderProgram for ProgramB {
        fn program_id(&self) -> ProgramId {
            ProgramId(2)
        }
        fn sort_order(&self) -> i32 {
            10
        }
        fn is_compiled(&self) -> bool {
            false
        }
        fn buffer_setup(&self, cmd: &mut CommandBuffer) {
            cmd.use_program(self.program_id());
        }
        fn buffer_material(&self, _cmd: &mut CommandBuffer, _material: &Material) {}
        fn buffer_model_matrix(&self, _cmd: &mut CommandBuffer, _matrix: &[f32; 16]) {}
    }

    #[test]
    fn test_registry_is_singleton_per_type() {
        let mut registry = ShaderRegistry::new();
        let a1 = registry.register(ProgramA);
        let a2 = registry.register(ProgramA);
        let b = registry.register(ProgramB);

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.key_of::<ProgramA>(), Some(a1));
        assert_eq!(a1.index(), 0);
        assert_eq!(b.index(), 1);
    }

    #[test]
    fn test_material_sort_index_is_creation_order() {
        let mut registry = ShaderRegistry::new();
        let program = registry.register(ProgramA);

        let mut materials = MaterialStore::new();
        let m0 = materials.create(program, MaterialProps::Solid { color: [1.0; 4] });
        let m1 = materials.create(
            program,
            MaterialProps::Textured {
                base_texture: TextureId(4),
                no_fog: false,
            },
        );

        assert!(materials.get(m0).sort_index() < materials.get(m1).sort_index());
        assert!(materials.get(m0).enabled);
    }

    #[test]
    fn test_props_classification() {
        let solid = MaterialProps::Solid { color: [0.0; 4] };
        let water = MaterialProps::Translucent {
            base_texture: None,
            alpha: 0.6,
            refract: true,
        };
        let glassless = MaterialProps::Translucent {
            base_texture: Some(TextureId(2)),
            alpha: 0.4,
            refract: false,
        };

        assert!(!solid.is_translucent());
        assert!(water.is_translucent() && water.refracts());
        assert!(glassless.is_translucent() && !glassless.refracts());
        assert_eq!(glassless.base_texture(), Some(TextureId(2)));
        assert_eq!(water.base_texture(), None);
    }
}
