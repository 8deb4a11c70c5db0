//! metal-price — fetch the MCX silver futures page and extract a typed price report.

pub mod change;
pub mod extract;
pub mod fetcher;
pub mod source;
pub mod types;

pub use change::{derive_change, Derived};
pub use extract::{extract_fields, has_primary_quote, page_text, ExtractedFields, Field, FIELD_TABLE};
pub use fetcher::{build_report, FetchConfig, FetchMode, PriceFetcher};
pub use source::{AcquisitionMethod, BrowserSource, HttpSource, Page, PageSource};
pub use types::*;
