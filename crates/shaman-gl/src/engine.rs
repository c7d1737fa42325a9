//! Capability interface to the graphics API.
//!
//! The pipeline only ever talks to the GPU through [`GlEngine`]. Object
//! handles are non-zero by construction; "no object" is `None`.

use std::fmt;
use std::num::NonZeroU32;

pub use shaman_common::Stage;

/// Engine-owned compiled stage object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub NonZeroU32);

/// Engine-owned program object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub NonZeroU32);

impl ShaderId {
    /// Raw engine name.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl ProgramId {
    /// Raw engine name.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The graphics primitives the assembly pipeline drives.
///
/// Implementations are used from the thread that owns the current context
/// only. Every method maps onto one API call; status queries return `true`
/// on success and info logs return whatever text the driver produced, which
/// may be empty.
pub trait GlEngine {
    /// Create an empty stage object. `Err` carries the driver's message.
    fn create_stage(&self, stage: Stage) -> Result<ShaderId, String>;

    /// Submit source and compile. Returns the compile status.
    fn compile_stage(&self, shader: ShaderId, source: &str) -> bool;

    /// Compiler output for a stage object.
    fn stage_info_log(&self, shader: ShaderId) -> String;

    /// Release a stage object. Safe to call while it is still attached.
    fn destroy_stage(&self, shader: ShaderId);

    /// Create an empty program object. `Err` carries the driver's message.
    fn create_program(&self) -> Result<ProgramId, String>;

    /// Attach a compiled stage to a program before linking.
    fn attach_stage(&self, program: ProgramId, shader: ShaderId);

    /// Detach a stage so it can be released independently of the program.
    fn detach_stage(&self, program: ProgramId, shader: ShaderId);

    /// Link. Returns the link status.
    fn link_program(&self, program: ProgramId) -> bool;

    /// Check the linked program against the currently bound pipeline state.
    /// Returns the validate status.
    fn validate_program(&self, program: ProgramId) -> bool;

    /// Linker or validator output for a program object.
    fn program_info_log(&self, program: ProgramId) -> String;

    /// Release a program object.
    fn destroy_program(&self, program: ProgramId);

    /// Make `program` the target of subsequent draws. `None` unbinds.
    fn set_active_program(&self, program: Option<ProgramId>);

    /// Location of an active vertex attribute, `None` if there is none by
    /// that name.
    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;

    /// Location of an active uniform, `None` if there is none by that name.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<u32>;
}
