//! Paper services built on the [`Store`](crate::db::Store) abstraction

pub mod library;
pub mod processing;

pub use library::{
    authorize_owner, gallery_excerpt, parse_paper_id, GalleryEntry, PaperLibrary,
};
pub use processing::{strip_extension, PaperProcessor, ProcessedPaper, Submission, Usage};
