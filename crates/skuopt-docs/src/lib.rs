//! Document formats around generation history: PDF listing sheets, the CSV
//! history export, and decoding of uploaded files for extraction.

mod csv_export;
mod data_url;
mod error;
mod pdf_render;
mod pdf_text;

pub use csv_export::{history_csv, HISTORY_CSV_FILENAME};
pub use data_url::{parse_data_url, DataUrl};
pub use error::DocsError;
pub use pdf_render::{listing_pdf_filename, render_listing_pdf};
pub use pdf_text::pdf_text;
