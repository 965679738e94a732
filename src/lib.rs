//! ncdash: reporting over Non-Conformance (NC) quality tickets.
//!
//! Raw rows from a [`source::DataSource`] are normalized into
//! [`records::Ticket`]s, narrowed by a [`filter::PredicateSet`] and fanned
//! out to the aggregators in [`analytics`]. The [`dashboard`] module ties
//! the pipeline together for the CLI and the JSON API in [`web`].

pub mod analytics;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod filter;
pub mod logging;
pub mod records;
pub mod source;
pub mod utils;
pub mod web;
