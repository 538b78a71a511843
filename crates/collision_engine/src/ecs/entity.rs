//! Entity implementation

/// Entity identifier
///
/// The generation distinguishes a destroyed entity from a later one that
/// reuses its slot, so stale references held by caches never alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: u32,
    generation: u32,
}

impl Entity {
    /// Create a new entity with the given ID and generation
    pub fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }

    /// Get the entity ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Get the entity generation
    pub fn generation(&self) -> u32 {
        self.generation
    }
}
