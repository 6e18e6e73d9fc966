//! GDP Trends - World Bank GDP & Population Trend Analysis
//!
//! Reshapes wide GDP and population tables into long form, joins them,
//! derives GDP per capita, and produces a merged table, per-country trend
//! charts and a growth report.

pub mod charts;
pub mod config;
pub mod data;
pub mod export;
pub mod pipeline;
pub mod stats;
