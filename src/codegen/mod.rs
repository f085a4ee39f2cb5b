//! C# code generation: translation, renaming and class layout.

pub mod csharp;
pub mod renamer;
pub mod runtime;
pub mod structurer;
pub mod translator;

pub use csharp::{CsExpr, ValueType};
pub use renamer::{NameMapping, Renamer};
pub use structurer::{ClassLayout, Structurer};
pub use translator::{Statement, StatementKind, Translation, Translator};
