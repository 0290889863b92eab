//! PDF Retouch Core Library
//!
//! Text-region editing for a PDF editor: selection and hit-testing on
//! rendered pages, formatting analysis, and masked-overwrite replacement
//! with per-page tracking of hidden regions.

pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod formatting;
pub mod geometry;
pub mod input;
pub mod metrics;
pub mod registry;
pub mod selection;
pub mod session;
pub mod text;

pub use config::{ConfigError, EditorConfig};
pub use editor::{EditOutcome, InsertionStrategy, RegionEditor, StyleOverrides};
pub use engine::memory::{InMemoryEngine, MemoryPage};
pub use engine::{
    AnnotationHandle, BuiltinFont, DocumentEngine, EngineError, EngineResult, FreeTextStyle,
};
pub use error::{CoreError, CoreResult};
pub use formatting::{
    analyze, normalize_font_name, Alignment, FormattingAnalyzer, FormattingProfile,
};
pub use geometry::{to_document, to_screen, CoordinateConverter, Point, Rect};
pub use metrics::TextDimensionEstimator;
pub use registry::{HitTarget, PageRegions, RegionRegistry, ReplacementRecord};
pub use selection::{Gesture, HitTester, Selection};
pub use session::{EditorSession, InteractionMode, PointerRelease};
pub use text::{Glyph, Rgb, StyleFlags, TextBlock, TextLine, TextSpan, Word};
