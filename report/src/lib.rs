//! Report pipeline: metrics snapshot in, rendered artifacts out.
//!
//! `build_report` is a pure transformation of a snapshot into a
//! `StructuredReport` (wall-clock and session id come in through the
//! context, so the same inputs give the same report). Renderers are
//! independent values behind one trait; each consumes the same immutable
//! report and produces bytes. Emission routes console output to stdout and
//! everything else to files in the configured output directory.

pub mod builder;
pub mod emit;
pub mod render;

pub use builder::{build_report, ReportContext, StructuredReport};
pub use emit::{emit_reports, ReportConfig};
pub use render::{renderer_for, ReportFormat, Renderer};
