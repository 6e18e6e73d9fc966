//! Stats module - trend and growth reports

mod report;

pub use report::{CountryGrowth, Report, ReportOptions, TrendReporter};
