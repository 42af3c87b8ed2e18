//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod eval;
pub(crate) mod gen_config;

pub(crate) use build::BuildArgs;
pub(crate) use eval::EvalArgs;
