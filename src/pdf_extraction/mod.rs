// PDF extraction module
pub mod child_process;
pub mod embedded;
pub mod extraction_router;
pub mod lopdf_helper;
pub mod ocr_engine;
pub mod system_pdf_renderer;

pub use embedded::EmbeddedText;
pub use extraction_router::{extract_page_text, PageText, PageTextSource, TextStrategy};
pub use lopdf_helper::{PageHandle, SourceDocument};
pub use ocr_engine::{
    RecognizedFragment, RecognizedText, Recognizer, TesseractRecognizer, DEFAULT_RENDER_SCALE,
};
pub use system_pdf_renderer::{PdftoppmRasterizer, Rasterizer};
