//! Scoped ownership of intermediate engine objects.
//!
//! A guard releases its object when dropped. A program guard can be
//! committed, which hands the program to the caller instead.

use crate::engine::{GlEngine, ProgramId, ShaderId};

/// A live stage object, destroyed on drop.
pub struct StageGuard<'e, E: GlEngine + ?Sized> {
    engine: &'e E,
    id: ShaderId,
}

impl<'e, E: GlEngine + ?Sized> StageGuard<'e, E> {
    pub fn new(engine: &'e E, id: ShaderId) -> Self {
        Self { engine, id }
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }
}

impl<E: GlEngine + ?Sized> Drop for StageGuard<'_, E> {
    fn drop(&mut self) {
        self.engine.destroy_stage(self.id);
    }
}

/// A program object under construction.
///
/// Stages attached through the guard are detached again before the program
/// is destroyed or handed out, so the stage guards remain the only owners of
/// the stage objects.
pub struct ProgramGuard<'e, E: GlEngine + ?Sized> {
    engine: &'e E,
    id: ProgramId,
    attached: Vec<ShaderId>,
    committed: bool,
}

impl<'e, E: GlEngine + ?Sized> ProgramGuard<'e, E> {
    pub fn new(engine: &'e E, id: ProgramId) -> Self {
        Self {
            engine,
            id,
            attached: Vec::with_capacity(3),
            committed: false,
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Attach a stage. The stage guard must outlive this program guard.
    pub fn attach(&mut self, stage: &StageGuard<'_, E>) {
        self.engine.attach_stage(self.id, stage.id());
        self.attached.push(stage.id());
    }

    fn detach_all(&mut self) {
        for shader in self.attached.drain(..) {
            self.engine.detach_stage(self.id, shader);
        }
    }

    /// Detach every stage and give up ownership of the program.
    pub fn commit(mut self) -> ProgramId {
        self.detach_all();
        self.committed = true;
        self.id
    }
}

impl<E: GlEngine + ?Sized> Drop for ProgramGuard<'_, E> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.detach_all();
        self.engine.destroy_program(self.id);
    }
}
