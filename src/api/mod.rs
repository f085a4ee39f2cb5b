//! CellForge API Server module
//!
//! HTTP front end for the compiler: upload a workbook, download the class.
//! Run with `cellforge-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server};
