use thiserror::Error;

/// Input bytes could not be opened as a PDF document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentLoadError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF has no pages")]
    NoPages,
}

/// Rendering or text-content retrieval failed for a single page.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("No document loaded")]
    NoDocument,

    #[error("Page {page} is out of range (1-{page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Invalid zoom factor: {0}")]
    InvalidZoom(f64),

    #[error("Rasterizer failed on page {page}: {message}")]
    RenderError { page: u32, message: String },

    #[error("Text content unavailable for page {page}: {message}")]
    TextContentError { page: u32, message: String },
}

/// Save-time failure. The session's ledger and overlays are never consumed
/// by a failed save.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error(transparent)]
    Load(#[from] DocumentLoadError),

    #[error("No document loaded")]
    NoDocument,

    #[error("Page {page} is out of range (1-{page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Invalid zoom factor: {0}")]
    InvalidZoom(f64),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Save task aborted: {0}")]
    Aborted(String),
}

/// Any error surfaced by the editing engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PdfEditError {
    #[error(transparent)]
    Load(#[from] DocumentLoadError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("No document loaded")]
    NoDocument,

    #[error("Unknown text run: {0}")]
    UnknownRun(String),

    #[error("Unknown overlay: {0}")]
    UnknownOverlay(u64),
}
