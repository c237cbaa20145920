/// Hands out the integer join keys of the output tables.
///
/// Two independent counters, each yielding its current value and then
/// incrementing. The allocator is owned by the crawl driver and only
/// touched from its single writer path, so tags are dense and never reused.
#[derive(Debug)]
pub struct TagAllocator {
    next_material: u64,
    next_concept: u64,
}

impl TagAllocator {
    /// Material tags start at `first_material_tag`: zero for a fresh run,
    /// past the rows already on disk when resuming. Concept tags continue
    /// from `first_concept_tag` so they stay unique across runs.
    pub fn new(first_material_tag: u64, first_concept_tag: u64) -> Self {
        Self {
            next_material: first_material_tag,
            next_concept: first_concept_tag,
        }
    }

    pub fn next_material_tag(&mut self) -> u64 {
        let tag = self.next_material;
        self.next_material += 1;
        tag
    }

    pub fn next_concept_tag(&mut self) -> u64 {
        let tag = self.next_concept;
        self.next_concept += 1;
        tag
    }
}
