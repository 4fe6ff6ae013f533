use std::fmt;

/// A statistics value for a node in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticsValue<T> {
    /// Value is exact.
    Exact(T),
    /// Value is estimated from child statistics.
    Estimated(T),
    /// Value is not known.
    Unknown,
}

impl<T: fmt::Display> fmt::Display for StatisticsValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "{v}"),
            Self::Estimated(v) => write!(f, "~{v}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
