mod as_value;
mod condition;
mod config;
mod context;
mod driver;
mod error;
mod executor;
mod filters;
mod helper;
mod join;
mod query;
mod record;
mod registry;
mod sql_writer;
mod statement;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context as ErrorContext;
pub use as_value::*;
pub use condition::*;
pub use config::*;
pub use context::*;
pub use driver::*;
pub use error::*;
pub use executor::*;
pub use filters::*;
pub use helper::*;
pub use join::*;
pub use query::*;
pub use record::*;
pub use registry::*;
pub use sql_writer::*;
pub use statement::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;
pub use ::tokio_util::sync::CancellationToken;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
