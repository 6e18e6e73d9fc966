//! Charts module - per-country trend chart rendering

mod renderer;

pub use renderer::{Metric, Series, TrendChartRenderer};
