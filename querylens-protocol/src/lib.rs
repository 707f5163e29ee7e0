pub mod list;
pub mod records;

pub mod prelude {
    pub use crate::list::{
        FilterKind, ListRequest, OrderOptions, QueryOptions, ResolvedRange, TimeRange,
    };
    pub use crate::records::{Record, SlowQueryRecord, StatementRecord};
}
