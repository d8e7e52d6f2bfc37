//! pipeconv Code Generation
//!
//! This crate converts legacy pipeline graphs into JavaScript controllers.
//!
//! # Pipeline Overview
//!
//! ```text
//! ┌──────────┐     ┌─────────┐     ┌───────────┐     ┌────────────┐
//! │ Document │────▶│   IR    │────▶│ Generators│────▶│ JS module  │
//! │ (YAML)   │     │ (Parse) │     │ (Registry)│     │ (Compiler) │
//! └──────────┘     └─────────┘     └───────────┘     └────────────┘
//! ```
//!
//! Compilation never fails: unknown pipelets, missing parameters and
//! unparseable expressions are left in the output as comments or verbatim
//! text, and reported as [`Diagnostic`]s next to the generated code.
//!
//! # Example
//!
//! ```rust,ignore
//! use pipeconv_codegen::{Compiler, Parser};
//!
//! let definition = Parser::new().parse_file("pipelines/Order.yaml")?;
//! let module = Compiler::new(Default::default()).compile(&definition);
//! std::fs::write("Order.js", &module.code)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analysis;
pub mod compiler;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod generators;
pub mod ir;
pub mod parser;
pub mod registry;
pub mod rewrite;

pub use compiler::{CompiledModule, Compiler};
pub use context::GeneratorContext;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use error::{Error, Result};
pub use ir::{NodeId, PipelineDefinition, PipeletNodeIR, TransitionLabel};
pub use parser::Parser;
pub use registry::{Generated, PipeletMapping, get_pipelet_mapping, is_pipelet_mapped};
pub use rewrite::{transform_expression, transform_variable};
