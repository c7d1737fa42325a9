//! Program assembly: attach, link, validate.

use shaman_common::common::{com_dprintf, com_errorf};

use crate::compile::CompiledStages;
use crate::engine::{GlEngine, ProgramId};
use crate::error::{Result, ShamanError};
use crate::guard::ProgramGuard;

fn program_log<E: GlEngine + ?Sized>(engine: &E, program: ProgramId) -> Option<String> {
    let log = engine.program_info_log(program);
    (!log.trim().is_empty()).then_some(log)
}

/// Link the compiled stages into a program.
///
/// Steps run in order and stop at the first failure:
/// 1. a stage that failed to compile is reported (vertex, fragment, then
///    geometry) without creating a program;
/// 2. a program is created and every stage attached;
/// 3. link;
/// 4. validate against the currently bound pipeline state;
/// 5. stages are detached and the live program returned.
///
/// On every path the stage objects are destroyed before returning, and on
/// failure so is the program.
pub fn assemble<E: GlEngine + ?Sized>(
    engine: &E,
    mut compiled: CompiledStages<'_, E>,
) -> Result<ProgramId> {
    if let Some(failed) = compiled.iter_mut().find(|s| !s.is_ok()) {
        return Err(ShamanError::StageCompile {
            stage: failed.stage(),
            log: failed.take_log(),
        });
    }

    let id = engine.create_program().map_err(|msg| {
        com_errorf(&format!("ERROR: could not create program: {}\n", msg));
        ShamanError::Link { log: Some(msg) }
    })?;
    let mut program = ProgramGuard::new(engine, id);
    for stage in compiled.iter() {
        if let Some(guard) = stage.guard() {
            program.attach(guard);
        }
    }

    if !engine.link_program(id) {
        let log = program_log(engine, id);
        com_errorf(&format!("ERROR: Program link error: {}\n", log.as_deref().unwrap_or("").trim_end()));
        return Err(ShamanError::Link { log });
    }

    if !engine.validate_program(id) {
        let log = program_log(engine, id);
        com_errorf(&format!(
            "ERROR: Program validation error: {}\n",
            log.as_deref().unwrap_or("").trim_end()
        ));
        return Err(ShamanError::Validate { log });
    }

    let id = program.commit();
    com_dprintf(&format!("assembled program {}\n", id));
    Ok(id)
}
