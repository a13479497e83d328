//! Value model for SQL/JSON path execution
//!
//! Items, item sequences, and the virtual datetime value.

mod datetime;
mod item;
mod sequence;

pub use datetime::{DateTimeItem, DateTimeValue};
pub use item::{ContainerRef, JsonItem, JsonType};
pub use sequence::ValueSequence;

pub(crate) use datetime::{parse_datetime_text, parse_tz_offset_name, DatetimeParseError};
pub(crate) use item::preorder_ordinal;
