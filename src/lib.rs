//! CellForge - compile spreadsheet workbooks into C# classes
//!
//! This library reads an `.xlsx` workbook, orders its formulas by dependency,
//! translates each one into a typed C# statement, names the results after the
//! labels found next to each cell, and lays everything out as one class.
//!
//! # Pipeline
//!
//! - Reader: every sheet's values, formulas and labels ([`excel`])
//! - Dependency graph and evaluation order ([`core`])
//! - Formula translation to typed C# expressions ([`codegen::Translator`])
//! - Identifier renaming, as a pure mapping step ([`codegen::Renamer`])
//! - Class layout ([`codegen::Structurer`])
//!
//! Each phase consumes the complete output of the one before it, and the first
//! error ends the run.
//!
//! # Example
//!
//! ```no_run
//! use cellforge::{compile, load_workbook, CompileOptions};
//! use std::path::Path;
//!
//! let workbook = load_workbook(Path::new("pricing.xlsx"))?;
//! let output = compile(&workbook, &CompileOptions::default())?;
//!
//! println!("class {}", output.class_name);
//! std::fs::write("Pricing.cs", output.source)?;
//! # Ok::<(), cellforge::error::CompileError>(())
//! ```

pub mod api;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod formula;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use config::CompileOptions;
pub use error::{CompileError, CompileResult};
pub use pipeline::{compile, evaluate_address, load_workbook, CompileOutput};
pub use types::{Cell, CellContent, CellId, Literal, Workbook};
