//! OpenGL engine over the `glow` bindings.
//!
//! `glow` does not expose `glValidateProgram`, so the two entry points the
//! validate step needs are resolved through the same loader that builds the
//! `glow` context.

use std::ffi::c_void;

use glow::HasContext;

use crate::engine::{GlEngine, ProgramId, ShaderId, Stage};

const GL_VALIDATE_STATUS: u32 = 0x8B83;

type ValidateProgramFn = unsafe extern "system" fn(program: u32);
type GetProgramivFn = unsafe extern "system" fn(program: u32, pname: u32, params: *mut i32);

/// Entry points resolved outside of `glow`.
struct ValidateFns {
    validate_program: ValidateProgramFn,
    get_programiv: GetProgramivFn,
}

impl ValidateFns {
    /// Resolve the validate entry points. Fails without calling into GL when
    /// the loader has no address for either name.
    fn load<F>(loader: &mut F) -> Result<Self, String>
    where
        F: FnMut(&str) -> *const c_void,
    {
        let validate = lookup(loader, "glValidateProgram")?;
        let programiv = lookup(loader, "glGetProgramiv")?;
        // SAFETY: both pointers are non-null GL entry points with the
        // signatures declared above.
        unsafe {
            Ok(Self {
                validate_program: std::mem::transmute::<*const c_void, ValidateProgramFn>(validate),
                get_programiv: std::mem::transmute::<*const c_void, GetProgramivFn>(programiv),
            })
        }
    }
}

fn lookup<F>(loader: &mut F, name: &str) -> Result<*const c_void, String>
where
    F: FnMut(&str) -> *const c_void,
{
    let ptr = loader(name);
    if ptr.is_null() {
        Err(format!("GL loader has no entry point for {}", name))
    } else {
        Ok(ptr)
    }
}

/// [`GlEngine`] backed by a `glow` context.
///
/// The context must be current on the calling thread for every call.
pub struct GlowEngine {
    gl: glow::Context,
    validate: ValidateFns,
}

fn stage_type(stage: Stage) -> u32 {
    match stage {
        Stage::Vertex => glow::VERTEX_SHADER,
        Stage::Fragment => glow::FRAGMENT_SHADER,
        Stage::Geometry => glow::GEOMETRY_SHADER,
    }
}

fn native_shader(shader: ShaderId) -> glow::NativeShader {
    glow::NativeShader(shader.0)
}

fn native_program(program: ProgramId) -> glow::NativeProgram {
    glow::NativeProgram(program.0)
}

impl GlowEngine {
    /// Build the engine from a GL proc-address loader, such as the one a
    /// windowing library hands out for its current context.
    ///
    /// # Safety
    ///
    /// The loader must return valid entry points for a GL context that is
    /// current on this thread.
    pub unsafe fn from_loader_function<F>(mut loader: F) -> Result<Self, String>
    where
        F: FnMut(&str) -> *const c_void,
    {
        let validate = ValidateFns::load(&mut loader)?;
        let gl = glow::Context::from_loader_function(&mut loader);
        Ok(Self { gl, validate })
    }

    /// The underlying `glow` context.
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

// SAFETY (all methods): the engine is used from the thread that owns the
// current GL context, and every handle passed in was created by this context.
impl GlEngine for GlowEngine {
    fn create_stage(&self, stage: Stage) -> Result<ShaderId, String> {
        unsafe { self.gl.create_shader(stage_type(stage)).map(|s| ShaderId(s.0)) }
    }

    fn compile_stage(&self, shader: ShaderId, source: &str) -> bool {
        unsafe {
            self.gl.shader_source(native_shader(shader), source);
            self.gl.compile_shader(native_shader(shader));
            self.gl.get_shader_compile_status(native_shader(shader))
        }
    }

    fn stage_info_log(&self, shader: ShaderId) -> String {
        unsafe { self.gl.get_shader_info_log(native_shader(shader)) }
    }

    fn destroy_stage(&self, shader: ShaderId) {
        unsafe { self.gl.delete_shader(native_shader(shader)) }
    }

    fn create_program(&self) -> Result<ProgramId, String> {
        unsafe { self.gl.create_program().map(|p| ProgramId(p.0)) }
    }

    fn attach_stage(&self, program: ProgramId, shader: ShaderId) {
        unsafe { self.gl.attach_shader(native_program(program), native_shader(shader)) }
    }

    fn detach_stage(&self, program: ProgramId, shader: ShaderId) {
        unsafe { self.gl.detach_shader(native_program(program), native_shader(shader)) }
    }

    fn link_program(&self, program: ProgramId) -> bool {
        unsafe {
            self.gl.link_program(native_program(program));
            self.gl.get_program_link_status(native_program(program))
        }
    }

    fn validate_program(&self, program: ProgramId) -> bool {
        let mut status = 0;
        unsafe {
            (self.validate.validate_program)(program.get());
            (self.validate.get_programiv)(program.get(), GL_VALIDATE_STATUS, &mut status);
        }
        status != 0
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        unsafe { self.gl.get_program_info_log(native_program(program)) }
    }

    fn destroy_program(&self, program: ProgramId) {
        unsafe { self.gl.delete_program(native_program(program)) }
    }

    fn set_active_program(&self, program: Option<ProgramId>) {
        unsafe { self.gl.use_program(program.map(native_program)) }
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(native_program(program), name) }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        unsafe {
            self.gl
                .get_uniform_location(native_program(program), name)
                .map(|loc| loc.0)
        }
    }
}
