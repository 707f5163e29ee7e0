mod options;
mod request;
mod time_range;

pub use options::{OrderOptions, QueryOptions, DEFAULT_LIMIT};
pub use request::{FilterKind, ListRequest};
pub use time_range::{ResolvedRange, TimeRange, DEFAULT_RECENT_SECONDS};
