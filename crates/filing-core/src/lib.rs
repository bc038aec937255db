//! Filing compilation pipeline
//!
//! Takes a scrutinized intake through defect resolution, the compilation
//! stepper and final packaging, then exports the package.
//!
//! - `ResolutionCoordinator`: applies translation, manual-edit and waiver
//!   strategies to defects, with per-defect serialisation and cancellation
//! - `CompilationRun` / `CompilationSession`: the `order → pagination →
//!   indexation → bookmarking → ocr` stepper
//! - `package` / `export`: final validation, PDF (lopdf) and RTF output

pub mod audit;
pub mod capability;
pub mod command;
pub mod document;
pub mod error;
pub mod export;
pub mod layout;
pub mod package;
pub mod pipeline;
pub mod resolution;
pub mod session;
pub mod stepper;

pub use capability::{CancelHandle, CancelToken, OcrEngine, Translator};
pub use command::{PipelineCommand, PipelinePlan};
pub use document::{Bookmark, CompiledDocument, IndexEntry, OcrStatus, PageRange, Section};
pub use error::{
    CapabilityError, ExportError, FilingError, OcrFailure, PackagingError, ResolutionFailure,
};
pub use export::{export, save_package, ExportFormat};
pub use layout::PaginationMode;
pub use package::{package, FilingPackage, Manifest};
pub use pipeline::FilingPipeline;
pub use resolution::{ResolutionCoordinator, ResolvedDocumentSet, RetainedOriginal};
pub use session::{CompilationSession, OcrProgress};
pub use stepper::{CompilationRun, StepSettings};
