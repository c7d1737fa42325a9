//! Program construction entry points and helpers for programs held outside
//! a store.

use std::path::Path;

use shaman_common::common::com_warnf;
use shaman_common::{source, ShaderSources};

use crate::assemble::assemble;
use crate::compile::compile_sources;
use crate::config::StoreConfig;
use crate::engine::{GlEngine, ProgramId};
use crate::error::Result;

/// Compile and assemble a program from in-memory sources.
pub fn build_program<E: GlEngine + ?Sized>(engine: &E, sources: &ShaderSources) -> Result<ProgramId> {
    let compiled = compile_sources(engine, sources)?;
    assemble(engine, compiled)
}

/// Create a program from source strings. `geometry` adds a geometry stage.
pub fn make_program_from_strings<E: GlEngine + ?Sized>(
    engine: &E,
    vertex: &str,
    fragment: &str,
    geometry: Option<&str>,
) -> Result<ProgramId> {
    let mut sources = ShaderSources::new(vertex, fragment);
    sources.geometry = geometry.map(str::to_string);
    build_program(engine, &sources)
}

/// Create a program from one source file per stage.
pub fn make_program<E: GlEngine + ?Sized>(
    engine: &E,
    vertex_path: &Path,
    fragment_path: &Path,
    geometry_path: Option<&Path>,
) -> Result<ProgramId> {
    let sources = source::read_distinct(vertex_path, fragment_path, geometry_path)?;
    build_program(engine, &sources)
}

/// Create a program from a combined `#shader <stage>` file.
pub fn make_program_combined<E: GlEngine + ?Sized>(engine: &E, path: &Path) -> Result<ProgramId> {
    let sources = source::read_combined(path)?;
    build_program(engine, &sources)
}

/// Make `program` the active program.
pub fn use_program<E: GlEngine + ?Sized>(engine: &E, program: ProgramId) {
    engine.set_active_program(Some(program));
}

/// Unbind whatever program is active.
pub fn unuse_program<E: GlEngine + ?Sized>(engine: &E) {
    engine.set_active_program(None);
}

/// Release a program that is not held by a store.
pub fn delete_program<E: GlEngine + ?Sized>(engine: &E, program: ProgramId) {
    engine.destroy_program(program);
}

/// Location of a vertex attribute, or `None` if the program has no such
/// active attribute.
pub fn attrib_location<E: GlEngine + ?Sized>(
    engine: &E,
    program: ProgramId,
    name: &str,
    config: &StoreConfig,
) -> Option<u32> {
    let location = engine.attrib_location(program, name);
    if location.is_none() && config.warn_missing_attrib {
        com_warnf(&format!("WARNING: No attrib '{}' in shader program {}\n", name, program));
    }
    location
}

/// Location of a uniform, or `None` if the program has no such active
/// uniform.
pub fn uniform_location<E: GlEngine + ?Sized>(
    engine: &E,
    program: ProgramId,
    name: &str,
    config: &StoreConfig,
) -> Option<u32> {
    let location = engine.uniform_location(program, name);
    if location.is_none() && config.warn_missing_uniform {
        com_warnf(&format!("WARNING: No uniform '{}' in shader program {}\n", name, program));
    }
    location
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEngine;
    use crate::engine::Stage;
    use crate::error::ErrorKind;
    use shaman_common::common::{com_begin_redirect, com_end_redirect};
    use std::io::Write;

    const VERT: &str = "in vec3 a_position;\nin vec4 a_color;\nuniform mat4 u_mvp;\nvoid main() { gl_Position = u_mvp * vec4(a_position, 1.0); }\n";
    const FRAG: &str = "uniform vec4 u_tint;\nout vec4 color;\nvoid main() { color = u_tint; }\n";

    #[test]
    fn test_make_program_from_strings() {
        let engine = AuditEngine::new();
        let id = make_program_from_strings(&engine, VERT, FRAG, None).unwrap();
        assert!(engine.is_live_program(id));
        delete_program(&engine, id);
        assert!(engine.is_clean());
    }

    #[test]
    fn test_make_program_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let vpath = dir.path().join("shader1.vert");
        let fpath = dir.path().join("shader1.frag");
        std::fs::write(&vpath, VERT).unwrap();
        std::fs::write(&fpath, FRAG).unwrap();

        let engine = AuditEngine::new();
        let id = make_program(&engine, &vpath, &fpath, None).unwrap();
        assert!(engine.is_live_program(id));

        let err = make_program(&engine, &vpath, &dir.path().join("nope.frag"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceOpenFailed(Stage::Fragment));
        assert_eq!(engine.live_programs(), 1);
    }

    #[test]
    fn test_make_program_combined() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "#shader vertex\n{}#shader fragment\n{}", VERT, FRAG).unwrap();

        let engine = AuditEngine::new();
        let id = make_program_combined(&engine, file.path()).unwrap();
        assert!(engine.is_live_program(id));

        let mut half = tempfile::NamedTempFile::new().unwrap();
        write!(half, "#shader vertex\n{}", VERT).unwrap();
        let err = make_program_combined(&engine, half.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceMissing(Stage::Fragment));
    }

    #[test]
    fn test_use_and_unuse() {
        let engine = AuditEngine::new();
        let id = make_program_from_strings(&engine, VERT, FRAG, None).unwrap();
        use_program(&engine, id);
        assert_eq!(engine.active_program(), Some(id.get()));
        unuse_program(&engine);
        assert_eq!(engine.active_program(), None);
    }

    #[test]
    fn test_name_lookup() {
        let engine = AuditEngine::new();
        let config = StoreConfig::default();
        let id = make_program_from_strings(&engine, VERT, FRAG, None).unwrap();

        assert_eq!(attrib_location(&engine, id, "a_position", &config), Some(0));
        assert_eq!(attrib_location(&engine, id, "a_color", &config), Some(1));
        assert_eq!(uniform_location(&engine, id, "u_mvp", &config), Some(0));
        assert_eq!(uniform_location(&engine, id, "u_tint", &config), Some(1));

        com_begin_redirect();
        let missing = uniform_location(&engine, id, "u_time", &config);
        let quiet = attrib_location(
            &engine,
            id,
            "a_normal",
            &StoreConfig {
                warn_missing_attrib: false,
                ..StoreConfig::default()
            },
        );
        let printed = com_end_redirect().unwrap_or_default();

        assert_eq!(missing, None);
        assert_eq!(quiet, None);
        assert!(printed.contains("No uniform 'u_time'"));
        assert!(!printed.contains("a_normal"));
    }
}
