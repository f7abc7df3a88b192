pub mod interval;
pub mod ordered_interval_set;

pub use interval::Interval;
pub use ordered_interval_set::OrderedIntervalSet;
