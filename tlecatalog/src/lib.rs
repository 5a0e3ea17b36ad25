pub use crate::catalog::{
    parse_catalog, Catalog, DiscardReason, Discarded, Layout, LayoutHint, ParseOptions,
};
pub use crate::element::{checksum, validate_element_lines, ElementLineError};
pub use crate::parser::{
    is_positional_group, parse_grouped, parse_sniffed, parse_tagged, CatalogLine, GroupCounts,
    ParseError, RawRecord,
};

pub mod catalog;
pub mod element;
pub mod parser;

/// Leading character of the first element line
pub const LINE1_TAG: char = '1';
/// Leading character of the second element line
pub const LINE2_TAG: char = '2';
/// Number of lines in a complete grouped record
pub const GROUP_RECORD_LINES: usize = 3;
