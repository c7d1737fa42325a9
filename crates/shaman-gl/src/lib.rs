//! Shader program assembly and a slot-addressed program store.
//!
//! Sources flow one way: [`compile`] turns source text into stage objects,
//! [`assemble`] links them into a program, and [`store::ProgramStore`] keeps
//! programs in a fixed `tables x rows` grid. All GPU work goes through the
//! [`GlEngine`] trait; every intermediate object is released on every path.
//!
//! Everything here is single-threaded: use it from the thread that owns the
//! graphics context.

pub mod assemble;
pub mod audit;
pub mod compile;
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod program;
pub mod store;

#[cfg(feature = "glow")]
mod glow_engine;

#[cfg(feature = "glow")]
pub use glow_engine::GlowEngine;

pub use assemble::assemble;
pub use compile::{compile_sources, compile_stage, CompiledStage, CompiledStages};
pub use config::StoreConfig;
pub use engine::{GlEngine, ProgramId, ShaderId, Stage};
pub use error::{ErrorKind, Result, ShamanError};
pub use program::{make_program, make_program_combined, make_program_from_strings};
pub use shaman_common::{ShaderSources, SourceError};
pub use store::ProgramStore;
