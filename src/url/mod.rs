//! URL handling: canonicalization, internality, and file-type filtering
//!
//! Every URL that enters the crawl pipeline passes through [`normalize_url`]
//! exactly once; the canonical string is what the visited set, the page-URL
//! cache, and the `page.path` column all key on.

mod files;
mod internal;
mod normalize;

pub use files::FileTypeFilter;
pub use internal::{dewww, is_internal_host, is_internal_link};
pub use normalize::{normalize_url, site_relative_path};
