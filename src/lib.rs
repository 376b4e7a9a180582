//! Data access helper for relational databases.
//!
//! Conditions are described either with the typed [`Condition`] tree or with the
//! suffix notation of [`Filters`], and rendered into parameterized statements by
//! the [`SqlWriter`] of the engine. Transactions travel inside the request
//! [`Context`]: every [`DbHelper`] operation called with a context holding a
//! transaction for its namespace runs inside it.
pub use dbhelper_core::*;
