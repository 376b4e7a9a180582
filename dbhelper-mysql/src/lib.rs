mod driver;
mod error;
mod executor;
mod pool;
mod row_wrap;
mod sql_writer;
mod transaction;
mod value_wrap;

pub use driver::*;
pub use error::*;
pub(crate) use executor::*;
pub use pool::*;
pub(crate) use row_wrap::*;
pub use sql_writer::*;
pub use transaction::*;
pub(crate) use value_wrap::*;
