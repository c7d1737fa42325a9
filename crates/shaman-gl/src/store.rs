//! Slot-addressed program store.
//!
//! A fixed grid of `tables x rows` slots, each empty or holding one live
//! program. A slot has to be discarded before it can be stored into again.

use std::path::Path;

use shaman_common::common::com_dprintf;
use shaman_common::{source, ShaderSources};

use crate::config::StoreConfig;
use crate::engine::{GlEngine, ProgramId};
use crate::error::{Result, ShamanError};
use crate::program;

/// Owns the engine and every program stored in it.
///
/// Dropping the store releases all live programs.
pub struct ProgramStore<E: GlEngine> {
    engine: E,
    config: StoreConfig,
    slots: Vec<Option<ProgramId>>,
}

impl<E: GlEngine> ProgramStore<E> {
    /// Create an empty store.
    ///
    /// # Panics
    /// If the configured grid has no tables or no rows, or its slot count
    /// overflows `usize`. [`StoreConfig::from_cvars`] never produces either.
    pub fn new(engine: E, config: StoreConfig) -> Self {
        assert!(
            config.tables > 0 && config.rows > 0,
            "program store needs at least one table and one row"
        );
        let Some(capacity) = config.capacity() else {
            panic!("program store grid {}x{} is too large", config.tables, config.rows);
        };
        let slots = vec![None; capacity];
        Self { engine, config, slots }
    }

    /// Create an empty store with the default configuration.
    pub fn with_engine(engine: E) -> Self {
        Self::new(engine, StoreConfig::default())
    }

    /// The engine every stored program belongs to.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Configuration the store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// `(tables, rows)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.config.tables, self.config.rows)
    }

    fn index(&self, table: usize, row: usize) -> Result<usize> {
        if table >= self.config.tables || row >= self.config.rows {
            return Err(ShamanError::LocationOutOfBounds {
                table,
                row,
                tables: self.config.tables,
                rows: self.config.rows,
            });
        }
        Ok(table * self.config.rows + row)
    }

    fn vacant(&self, table: usize, row: usize) -> Result<usize> {
        let idx = self.index(table, row)?;
        if self.slots[idx].is_some() {
            return Err(ShamanError::LocationNotEmpty { table, row });
        }
        Ok(idx)
    }

    fn commit(&mut self, idx: usize, sources: &ShaderSources) -> Result<ProgramId> {
        let id = program::build_program(&self.engine, sources)?;
        self.slots[idx] = Some(id);
        Ok(id)
    }

    /// Assemble `sources` into the empty slot `(table, row)`.
    ///
    /// Location checks happen before any engine work. On failure the slot
    /// stays empty.
    pub fn store(&mut self, table: usize, row: usize, sources: &ShaderSources) -> Result<ProgramId> {
        let idx = self.vacant(table, row)?;
        let id = self.commit(idx, sources)?;
        com_dprintf(&format!("stored program {} at ({}, {})\n", id, table, row));
        Ok(id)
    }

    /// Read one file per stage and assemble into the empty slot `(table, row)`.
    pub fn store_program(
        &mut self,
        table: usize,
        row: usize,
        vertex_path: &Path,
        fragment_path: &Path,
    ) -> Result<ProgramId> {
        let idx = self.vacant(table, row)?;
        let sources = source::read_distinct(vertex_path, fragment_path, None)?;
        let id = self.commit(idx, &sources)?;
        com_dprintf(&format!(
            "stored program {} at ({}, {}) from {} + {}\n",
            id,
            table,
            row,
            vertex_path.display(),
            fragment_path.display()
        ));
        Ok(id)
    }

    /// Read a combined source file and assemble into the empty slot
    /// `(table, row)`.
    pub fn store_combined(&mut self, table: usize, row: usize, path: &Path) -> Result<ProgramId> {
        let idx = self.vacant(table, row)?;
        let sources = source::read_combined(path)?;
        let id = self.commit(idx, &sources)?;
        com_dprintf(&format!("stored program {} at ({}, {}) from {}\n", id, table, row, path.display()));
        Ok(id)
    }

    /// Program held at `(table, row)`. With `activate`, it also becomes the
    /// engine's active program.
    pub fn access(&self, table: usize, row: usize, activate: bool) -> Result<ProgramId> {
        let idx = self.index(table, row)?;
        let id = self.slots[idx].ok_or(ShamanError::LocationEmpty { table, row })?;
        if activate {
            program::use_program(&self.engine, id);
        }
        Ok(id)
    }

    /// Release the program at `(table, row)`. Discarding an empty slot is a
    /// no-op.
    pub fn discard(&mut self, table: usize, row: usize) -> Result<()> {
        let idx = self.index(table, row)?;
        if let Some(id) = self.slots[idx].take() {
            self.engine.destroy_program(id);
            com_dprintf(&format!("discarded program {} at ({}, {})\n", id, table, row));
        }
        Ok(())
    }

    /// Release every program in one table. Returns how many were released.
    pub fn discard_table(&mut self, table: usize) -> Result<usize> {
        let start = self.index(table, 0)?;
        let rows = self.config.rows;
        let engine = &self.engine;
        let released = self.slots[start..start + rows]
            .iter_mut()
            .filter_map(Option::take)
            .inspect(|&id| engine.destroy_program(id))
            .count();
        Ok(released)
    }

    /// Release every program in the store. Returns how many were released.
    pub fn discard_all(&mut self) -> usize {
        let engine = &self.engine;
        self.slots
            .iter_mut()
            .filter_map(Option::take)
            .inspect(|&id| engine.destroy_program(id))
            .count()
    }

    /// Whether `(table, row)` holds a program.
    pub fn is_occupied(&self, table: usize, row: usize) -> Result<bool> {
        let idx = self.index(table, row)?;
        Ok(self.slots[idx].is_some())
    }

    /// Number of slots holding a program.
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Attribute location in the program at `(table, row)`.
    pub fn attrib_location(&self, table: usize, row: usize, name: &str) -> Result<Option<u32>> {
        let id = self.access(table, row, false)?;
        Ok(program::attrib_location(&self.engine, id, name, &self.config))
    }

    /// Uniform location in the program at `(table, row)`.
    pub fn uniform_location(&self, table: usize, row: usize, name: &str) -> Result<Option<u32>> {
        let id = self.access(table, row, false)?;
        Ok(program::uniform_location(&self.engine, id, name, &self.config))
    }
}

impl<E: GlEngine> Drop for ProgramStore<E> {
    fn drop(&mut self) {
        let released = self.discard_all();
        if released > 0 {
            com_dprintf(&format!("program store dropped, released {} programs\n", released));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditEngine, EngineCall};
    use crate::engine::Stage;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    const VERT: &str = "in vec3 a_position;\nvoid main() { gl_Position = vec4(a_position, 1.0); }\n";
    const FRAG: &str = "out vec4 color;\nvoid main() { color = vec4(0.0, 1.0, 0.0, 1.0); }\n";

    fn sources() -> ShaderSources {
        ShaderSources::new(VERT, FRAG)
    }

    fn small_store() -> (ProgramStore<AuditEngine>, AuditEngine) {
        let engine = AuditEngine::new();
        let store = ProgramStore::new(engine.clone(), StoreConfig::new(2, 3));
        (store, engine)
    }

    #[test]
    fn test_store_then_access() {
        let (mut store, engine) = small_store();
        let id = store.store(1, 2, &sources()).unwrap();
        assert_eq!(store.access(1, 2, false).unwrap(), id);
        assert_eq!(engine.active_program(), None);
        assert_eq!(store.occupied_count(), 1);
        assert!(store.is_occupied(1, 2).unwrap());
    }

    #[test]
    fn test_access_activates() {
        let (mut store, engine) = small_store();
        let id = store.store(0, 0, &sources()).unwrap();
        store.access(0, 0, true).unwrap();
        assert_eq!(engine.active_program(), Some(id.get()));
    }

    #[test]
    fn test_access_empty_slot() {
        let (store, _engine) = small_store();
        let err = store.access(0, 1, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LocationEmpty);
    }

    #[test]
    fn test_store_occupied_keeps_existing() {
        let (mut store, engine) = small_store();
        let id = store.store(0, 0, &sources()).unwrap();
        let calls_before = engine.call_count();

        let err = store.store(0, 0, &sources()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LocationNotEmpty);
        assert_eq!(engine.call_count(), calls_before);
        assert_eq!(store.access(0, 0, false).unwrap(), id);
        assert!(engine.is_live_program(id));
    }

    #[test]
    fn test_out_of_bounds_touches_nothing() {
        let (mut store, engine) = small_store();
        let checks = [
            store.store(2, 0, &sources()).unwrap_err().kind(),
            store.store(0, 3, &sources()).unwrap_err().kind(),
            store.access(5, 5, true).unwrap_err().kind(),
            store.discard(2, 0).unwrap_err().kind(),
            store.discard_table(2).unwrap_err().kind(),
            store
                .store_program(2, 0, Path::new("missing.vert"), Path::new("missing.frag"))
                .unwrap_err()
                .kind(),
            store
                .store_program(0, 3, Path::new("missing.vert"), Path::new("missing.frag"))
                .unwrap_err()
                .kind(),
            store.store_combined(2, 2, Path::new("missing.glsl")).unwrap_err().kind(),
            store.is_occupied(0, 9).unwrap_err().kind(),
            store.uniform_location(3, 0, "u_mvp").unwrap_err().kind(),
        ];
        assert!(checks.iter().all(|&k| k == ErrorKind::LocationOutOfBounds));
        assert_eq!(engine.call_count(), 0);
    }

    #[test]
    fn test_discard_is_idempotent() {
        let (mut store, engine) = small_store();
        let id = store.store(1, 0, &sources()).unwrap();

        store.discard(1, 0).unwrap();
        assert!(!engine.is_live_program(id));
        let releases = engine.release_count();

        store.discard(1, 0).unwrap();
        assert_eq!(engine.release_count(), releases);
        assert_eq!(store.access(1, 0, false).unwrap_err().kind(), ErrorKind::LocationEmpty);
        assert!(engine.is_clean());
    }

    #[test]
    fn test_slot_reusable_after_discard() {
        let (mut store, engine) = small_store();
        let first = store.store(0, 2, &sources()).unwrap();
        store.discard(0, 2).unwrap();
        let second = store.store(0, 2, &sources()).unwrap();
        assert_ne!(first, second);
        assert_eq!(engine.live_programs(), 1);
    }

    #[test]
    fn test_failed_store_leaves_slot_empty() {
        let (mut store, engine) = small_store();
        let err = store.store(0, 0, &ShaderSources::new(VERT, "}{")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StageCompileFailed(Stage::Fragment));
        assert!(!store.is_occupied(0, 0).unwrap());
        assert!(engine.is_clean());

        engine.set_fail_validate(true);
        let err = store.store(0, 0, &sources()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidateFailed);
        assert!(!store.is_occupied(0, 0).unwrap());
        assert!(engine.is_clean());
    }

    #[test]
    fn test_store_program_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let vpath = dir.path().join("a.vert");
        let fpath = dir.path().join("a.frag");
        std::fs::write(&vpath, VERT).unwrap();
        std::fs::write(&fpath, FRAG).unwrap();

        let (mut store, _engine) = small_store();
        let id = store.store_program(0, 1, &vpath, &fpath).unwrap();
        assert_eq!(store.access(0, 1, false).unwrap(), id);

        let err = store
            .store_program(0, 2, &dir.path().join("missing.vert"), &fpath)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceOpenFailed(Stage::Vertex));
        assert!(!store.is_occupied(0, 2).unwrap());

        // Occupancy is checked before the files are touched.
        let err = store
            .store_program(0, 1, &dir.path().join("missing.vert"), &fpath)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LocationNotEmpty);
    }

    #[test]
    fn test_store_combined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.glsl");
        std::fs::write(&path, format!("#shader vertex\n{}#shader fragment\n{}", VERT, FRAG)).unwrap();

        let (mut store, _engine) = small_store();
        let id = store.store_combined(1, 1, &path).unwrap();
        assert_eq!(store.access(1, 1, false).unwrap(), id);
    }

    #[test]
    fn test_discard_table_and_all() {
        let (mut store, engine) = small_store();
        for table in 0..2 {
            for row in 0..3 {
                store.store(table, row, &sources()).unwrap();
            }
        }
        assert_eq!(store.discard_table(0).unwrap(), 3);
        assert_eq!(store.occupied_count(), 3);
        assert_eq!(store.discard_table(0).unwrap(), 0);
        assert_eq!(store.discard_all(), 3);
        assert!(engine.is_clean());
    }

    #[test]
    fn test_drop_releases_everything() {
        let (mut store, engine) = small_store();
        store.store(0, 0, &sources()).unwrap();
        store.store(1, 2, &sources()).unwrap();
        drop(store);
        assert!(engine.is_clean());
        assert_eq!(
            engine
                .calls()
                .iter()
                .filter(|c| matches!(c, EngineCall::DestroyProgram(_)))
                .count(),
            2
        );
    }

    #[test]
    fn test_store_name_lookup() {
        let (mut store, _engine) = small_store();
        store.store(0, 0, &sources()).unwrap();
        assert_eq!(store.attrib_location(0, 0, "a_position").unwrap(), Some(0));
        assert_eq!(
            store.uniform_location(0, 1, "u_mvp").unwrap_err().kind(),
            ErrorKind::LocationEmpty
        );
    }

    #[test]
    fn test_store_from_hostile_cvars() {
        let mut cvars = shaman_common::cvar::CvarContext::new();
        cvars.exec_text("set sh_tables nan\nset sh_rows inf\n");
        let store = ProgramStore::new(AuditEngine::new(), StoreConfig::from_cvars(&mut cvars));
        assert_eq!(store.dimensions(), (16, 16));

        cvars.exec_text("set sh_tables 1e12\nset sh_rows -1\n");
        let store = ProgramStore::new(AuditEngine::new(), StoreConfig::from_cvars(&mut cvars));
        assert_eq!(store.dimensions(), (crate::config::MAX_DIMENSION, 1));
    }

    #[test]
    #[should_panic]
    fn test_zero_sized_store_panics() {
        let _ = ProgramStore::new(AuditEngine::new(), StoreConfig::new(0, 4));
    }

    proptest! {
        #[test]
        fn prop_store_access_round_trip(table in 0usize..16, row in 0usize..16) {
            let engine = AuditEngine::new();
            let mut store = ProgramStore::with_engine(engine.clone());
            prop_assert_eq!(store.access(table, row, false).unwrap_err().kind(), ErrorKind::LocationEmpty);
            let id = store.store(table, row, &sources()).unwrap();
            prop_assert_eq!(store.access(table, row, false).unwrap(), id);
            prop_assert_eq!(store.occupied_count(), 1);
        }

        #[test]
        fn prop_out_of_bounds_rejected(table in 0usize..64, row in 0usize..64) {
            prop_assume!(table >= 16 || row >= 16);
            let engine = AuditEngine::new();
            let mut store = ProgramStore::with_engine(engine.clone());
            prop_assert_eq!(store.store(table, row, &sources()).unwrap_err().kind(), ErrorKind::LocationOutOfBounds);
            prop_assert_eq!(store.access(table, row, true).unwrap_err().kind(), ErrorKind::LocationOutOfBounds);
            prop_assert_eq!(store.discard(table, row).unwrap_err().kind(), ErrorKind::LocationOutOfBounds);
            prop_assert_eq!(engine.call_count(), 0);
        }
    }
}
