mod filter;
mod find;
mod version_order;

pub use filter::AssetFilter;
pub use find::{filter_versions, find_versions, VersionQuery};
pub use version_order::{parse_lenient, sort_versions_desc, LenientVersion};
