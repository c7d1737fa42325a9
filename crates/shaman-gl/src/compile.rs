//! Stage compilation.

use shaman_common::common::{com_errorf, com_warnf};
use shaman_common::ShaderSources;

use crate::engine::{GlEngine, ShaderId, Stage};
use crate::error::Result;
use crate::guard::StageGuard;

/// Outcome of compiling one stage: a live stage object, or the driver's
/// diagnostic log.
pub struct CompiledStage<'e, E: GlEngine + ?Sized> {
    stage: Stage,
    handle: Option<StageGuard<'e, E>>,
    log: Option<String>,
}

impl<'e, E: GlEngine + ?Sized> CompiledStage<'e, E> {
    fn failed(stage: Stage, log: String) -> Self {
        let log = (!log.trim().is_empty()).then_some(log);
        Self {
            stage,
            handle: None,
            log,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_ok(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<ShaderId> {
        self.handle.as_ref().map(StageGuard::id)
    }

    pub fn guard(&self) -> Option<&StageGuard<'e, E>> {
        self.handle.as_ref()
    }

    pub fn log(&self) -> Option<&str> {
        self.log.as_deref()
    }

    pub(crate) fn take_log(&mut self) -> Option<String> {
        self.log.take()
    }
}

/// Compiled vertex and fragment stages plus an optional geometry stage.
pub struct CompiledStages<'e, E: GlEngine + ?Sized> {
    pub vertex: CompiledStage<'e, E>,
    pub fragment: CompiledStage<'e, E>,
    pub geometry: Option<CompiledStage<'e, E>>,
}

impl<'e, E: GlEngine + ?Sized> CompiledStages<'e, E> {
    pub fn is_ok(&self) -> bool {
        self.vertex.is_ok()
            && self.fragment.is_ok()
            && self.geometry.as_ref().map_or(true, CompiledStage::is_ok)
    }

    /// Stages in attach order.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledStage<'e, E>> {
        [Some(&self.vertex), Some(&self.fragment), self.geometry.as_ref()]
            .into_iter()
            .flatten()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut CompiledStage<'e, E>> {
        [Some(&mut self.vertex), Some(&mut self.fragment), self.geometry.as_mut()]
            .into_iter()
            .flatten()
    }
}

/// Compile one stage.
///
/// A failed stage object is destroyed before returning; only its log is
/// kept. Empty source fails without touching the engine.
pub fn compile_stage<'e, E: GlEngine + ?Sized>(
    engine: &'e E,
    stage: Stage,
    source: &str,
) -> CompiledStage<'e, E> {
    if source.trim().is_empty() {
        com_warnf(&format!("{} shader source is empty\n", stage));
        return CompiledStage::failed(stage, format!("empty {} shader source", stage));
    }

    let id = match engine.create_stage(stage) {
        Ok(id) => id,
        Err(msg) => {
            com_errorf(&format!("ERROR: could not create {} shader: {}\n", stage, msg));
            return CompiledStage::failed(stage, msg);
        }
    };
    let guard = StageGuard::new(engine, id);

    if !engine.compile_stage(id, source) {
        let log = engine.stage_info_log(id);
        com_errorf(&format!("ERROR: {} shader compile error: {}\n", stage, log.trim_end()));
        drop(guard);
        return CompiledStage::failed(stage, log);
    }

    CompiledStage {
        stage,
        handle: Some(guard),
        log: None,
    }
}

/// Compile every stage `sources` provides.
///
/// Vertex and fragment text are required; geometry is compiled only when
/// present. Missing required text is reported before any engine call.
pub fn compile_sources<'e, E: GlEngine + ?Sized>(
    engine: &'e E,
    sources: &ShaderSources,
) -> Result<CompiledStages<'e, E>> {
    let vertex_text = sources.require(Stage::Vertex)?;
    let fragment_text = sources.require(Stage::Fragment)?;

    let vertex = compile_stage(engine, Stage::Vertex, vertex_text);
    let fragment = compile_stage(engine, Stage::Fragment, fragment_text);
    let geometry = sources
        .get(Stage::Geometry)
        .map(|text| compile_stage(engine, Stage::Geometry, text));

    Ok(CompiledStages {
        vertex,
        fragment,
        geometry,
    })
}
