//! pipeconv Core Library
//!
//! This crate provides the shared foundation for pipeconv:
//! - Pipeline documents handed over by the legacy XML exporter
//! - Project configuration (`pipeconv.yaml`)
//! - The core error type
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Pipeline   │────▶│   Codegen   │────▶│ JavaScript  │
//! │  Document   │     │  (compile)  │     │ Controller  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use pipeconv_core::{Config, PipelineDocument};
//!
//! let config = Config::load("./storefront")?;
//! for doc in config.load_documents()? {
//!     println!("Pipeline: {}", doc.name);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{CodegenConfig, Config, ModuleStyle, ProjectConfig};
pub use error::{Error, Result};
pub use pipeline::{KeyBinding, NodeDocument, NodeKindDocument, PipelineDocument, TransitionDocument};
