//! HTTP implementations of the QueryLens [`DataSource`](querylens_controller::DataSource)
//! for the slow-query and statement views.

pub mod client;
pub mod error;
mod info;
pub mod slow_query;
pub mod statement;

pub use client::{ApiClient, QueryPairs};
pub use error::ClientError;
pub use slow_query::{SlowQueryParams, SlowQuerySource};
pub use statement::{StatementParams, StatementSource};
