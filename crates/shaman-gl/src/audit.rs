//! In-memory recording engine for headless tests.
//!
//! `AuditEngine` implements [`GlEngine`] without a GPU. It keeps a log of
//! every call and the set of live objects so tests can check that nothing
//! leaks. Clones share state, so a clone kept outside a store still sees
//! what the store did.
//!
//! Compilation succeeds when the source contains `void main`. Link and
//! validation succeed unless scripted to fail. On link, `in` declarations
//! of the vertex stage become attributes and `uniform` declarations of any
//! stage become uniforms.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::rc::Rc;

use crate::engine::{GlEngine, ProgramId, ShaderId, Stage};

pub const COMPILE_ERROR_LOG: &str = "0:1(1): error: syntax error, unexpected end of file\n";
pub const LINK_ERROR_LOG: &str = "error: linking with uncompiled/unspecialized shader\n";
pub const VALIDATE_ERROR_LOG: &str = "validation failed: no vertex array object bound\n";

/// One recorded engine call. Object handles are raw ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    CreateStage(Stage, u32),
    CompileStage(u32),
    DestroyStage(u32),
    CreateProgram(u32),
    AttachStage(u32, u32),
    DetachStage(u32, u32),
    LinkProgram(u32),
    ValidateProgram(u32),
    DestroyProgram(u32),
    SetActiveProgram(Option<u32>),
    AttribLocation(u32, String),
    UniformLocation(u32, String),
}

impl EngineCall {
    /// Whether the call releases an engine object.
    pub fn is_release(&self) -> bool {
        matches!(self, EngineCall::DestroyStage(_) | EngineCall::DestroyProgram(_))
    }
}

struct StageObject {
    stage: Stage,
    source: String,
    log: String,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<u32>,
    attribs: Vec<String>,
    uniforms: Vec<String>,
    log: String,
}

#[derive(Default)]
struct AuditState {
    next_id: u32,
    calls: Vec<EngineCall>,
    stages: BTreeMap<u32, StageObject>,
    programs: BTreeMap<u32, ProgramObject>,
    active: Option<u32>,
    bad_releases: usize,
    fail_create_stage: Option<Stage>,
    fail_create_program: bool,
    fail_link: bool,
    fail_validate: bool,
}

impl AuditState {
    fn alloc(&mut self) -> NonZeroU32 {
        self.next_id += 1;
        NonZeroU32::new(self.next_id).unwrap_or(NonZeroU32::MIN)
    }
}

/// Recording [`GlEngine`] double.
#[derive(Clone, Default)]
pub struct AuditEngine {
    state: Rc<RefCell<AuditState>>,
}

/// Last whitespace-separated token of a declaration, without the `;` or an
/// array suffix.
fn declared_name(decl: &str) -> Option<String> {
    let decl = decl.trim().trim_end_matches(';').trim();
    let last = decl.split_whitespace().last()?;
    let name = last.split('[').next().unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}

impl AuditEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_stage` fail for `stage`. `None` clears it.
    pub fn set_fail_create_stage(&self, stage: Option<Stage>) {
        self.state.borrow_mut().fail_create_stage = stage;
    }

    pub fn set_fail_create_program(&self, fail: bool) {
        self.state.borrow_mut().fail_create_program = fail;
    }

    pub fn set_fail_link(&self, fail: bool) {
        self.state.borrow_mut().fail_link = fail;
    }

    pub fn set_fail_validate(&self, fail: bool) {
        self.state.borrow_mut().fail_validate = fail;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.borrow().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.borrow().calls.len()
    }

    /// Number of destroy calls recorded so far.
    pub fn release_count(&self) -> usize {
        self.state.borrow().calls.iter().filter(|c| c.is_release()).count()
    }

    pub fn live_stages(&self) -> usize {
        self.state.borrow().stages.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn is_live_program(&self, program: ProgramId) -> bool {
        self.state.borrow().programs.contains_key(&program.get())
    }

    /// Stages still attached to `program`.
    pub fn attached_stages(&self, program: ProgramId) -> usize {
        self.state
            .borrow()
            .programs
            .get(&program.get())
            .map_or(0, |p| p.attached.len())
    }

    pub fn active_program(&self) -> Option<u32> {
        self.state.borrow().active
    }

    /// Destroy calls on unknown objects and stage destroys while attached.
    pub fn bad_releases(&self) -> usize {
        self.state.borrow().bad_releases
    }

    /// True when no engine object is alive and no release was misplaced.
    pub fn is_clean(&self) -> bool {
        let state = self.state.borrow();
        state.stages.is_empty() && state.programs.is_empty() && state.bad_releases == 0
    }

    fn record(&self, call: EngineCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl GlEngine for AuditEngine {
    fn create_stage(&self, stage: Stage) -> Result<ShaderId, String> {
        let mut state = self.state.borrow_mut();
        if state.fail_create_stage == Some(stage) {
            return Err(format!("out of {} shader objects", stage));
        }
        let id = state.alloc();
        state.stages.insert(
            id.get(),
            StageObject {
                stage,
                source: String::new(),
                log: String::new(),
            },
        );
        state.calls.push(EngineCall::CreateStage(stage, id.get()));
        Ok(ShaderId(id))
    }

    fn compile_stage(&self, shader: ShaderId, source: &str) -> bool {
        self.record(EngineCall::CompileStage(shader.get()));
        let mut state = self.state.borrow_mut();
        let Some(obj) = state.stages.get_mut(&shader.get()) else {
            return false;
        };
        obj.source = source.to_string();
        if source.contains("void main") {
            obj.log.clear();
            true
        } else {
            obj.log = COMPILE_ERROR_LOG.to_string();
            false
        }
    }

    fn stage_info_log(&self, shader: ShaderId) -> String {
        let state = self.state.borrow();
        state
            .stages
            .get(&shader.get())
            .map(|obj| obj.log.clone())
            .unwrap_or_default()
    }

    fn destroy_stage(&self, shader: ShaderId) {
        self.record(EngineCall::DestroyStage(shader.get()));
        let mut state = self.state.borrow_mut();
        let still_attached = state
            .programs
            .values()
            .any(|p| p.attached.contains(&shader.get()));
        if state.stages.remove(&shader.get()).is_none() || still_attached {
            state.bad_releases += 1;
        }
    }

    fn create_program(&self) -> Result<ProgramId, String> {
        let mut state = self.state.borrow_mut();
        if state.fail_create_program {
            return Err("out of program objects".to_string());
        }
        let id = state.alloc();
        state.programs.insert(id.get(), ProgramObject::default());
        state.calls.push(EngineCall::CreateProgram(id.get()));
        Ok(ProgramId(id))
    }

    fn attach_stage(&self, program: ProgramId, shader: ShaderId) {
        self.record(EngineCall::AttachStage(program.get(), shader.get()));
        let mut state = self.state.borrow_mut();
        if let Some(p) = state.programs.get_mut(&program.get()) {
            p.attached.push(shader.get());
        }
    }

    fn detach_stage(&self, program: ProgramId, shader: ShaderId) {
        self.record(EngineCall::DetachStage(program.get(), shader.get()));
        let mut state = self.state.borrow_mut();
        if let Some(p) = state.programs.get_mut(&program.get()) {
            p.attached.retain(|&s| s != shader.get());
        }
    }

    fn link_program(&self, program: ProgramId) -> bool {
        self.record(EngineCall::LinkProgram(program.get()));
        let mut state = self.state.borrow_mut();
        let fail = state.fail_link;

        let mut attribs = Vec::new();
        let mut uniforms = Vec::new();
        if let Some(p) = state.programs.get(&program.get()) {
            for shader in &p.attached {
                let Some(obj) = state.stages.get(shader) else {
                    continue;
                };
                for line in obj.source.lines().map(str::trim) {
                    if let Some(decl) = line.strip_prefix("uniform ") {
                        uniforms.extend(declared_name(decl));
                    } else if obj.stage == Stage::Vertex {
                        if let Some(decl) = line.strip_prefix("in ") {
                            attribs.extend(declared_name(decl));
                        }
                    }
                }
            }
        }

        let Some(p) = state.programs.get_mut(&program.get()) else {
            return false;
        };
        if fail {
            p.log = LINK_ERROR_LOG.to_string();
            return false;
        }
        p.log.clear();
        p.attribs = attribs;
        p.uniforms = uniforms;
        true
    }

    fn validate_program(&self, program: ProgramId) -> bool {
        self.record(EngineCall::ValidateProgram(program.get()));
        let mut state = self.state.borrow_mut();
        let fail = state.fail_validate;
        let Some(p) = state.programs.get_mut(&program.get()) else {
            return false;
        };
        if fail {
            p.log = VALIDATE_ERROR_LOG.to_string();
            return false;
        }
        true
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        let state = self.state.borrow();
        state
            .programs
            .get(&program.get())
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn destroy_program(&self, program: ProgramId) {
        self.record(EngineCall::DestroyProgram(program.get()));
        let mut state = self.state.borrow_mut();
        if state.programs.remove(&program.get()).is_none() {
            state.bad_releases += 1;
        }
        if state.active == Some(program.get()) {
            state.active = None;
        }
    }

    fn set_active_program(&self, program: Option<ProgramId>) {
        self.record(EngineCall::SetActiveProgram(program.map(ProgramId::get)));
        self.state.borrow_mut().active = program.map(ProgramId::get);
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.record(EngineCall::AttribLocation(program.get(), name.to_string()));
        let state = self.state.borrow();
        let p = state.programs.get(&program.get())?;
        p.attribs.iter().position(|a| a == name).map(|i| i as u32)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.record(EngineCall::UniformLocation(program.get(), name.to_string()));
        let state = self.state.borrow();
        let p = state.programs.get(&program.get())?;
        p.uniforms.iter().position(|u| u == name).map(|i| i as u32)
    }
}
