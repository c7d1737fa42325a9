//! Shared plumbing for the shaman workspace: the print layer, console-style
//! configuration variables and shader source acquisition.

pub mod common;
pub mod cvar;
pub mod source;

pub use source::{ShaderSources, SourceError, Stage};
