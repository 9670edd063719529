//! The sorts a formula's variables range over.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SmtSort {
    Bool,
    Int,
}

impl SmtSort {
    pub const fn smtlib_name(self) -> &'static str {
        match self {
            SmtSort::Bool => "Bool",
            SmtSort::Int => "Int",
        }
    }

    /// Number of values of the sort, `None` when infinite.
    pub const fn cardinality(self) -> Option<u64> {
        match self {
            SmtSort::Bool => Some(2),
            SmtSort::Int => None,
        }
    }
}

impl std::fmt::Display for SmtSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.smtlib_name())
    }
}
