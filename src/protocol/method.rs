use std::fmt;

/// Logical operation names understood by the worker side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Open the database behind a slash-separated storage path.
    Connect,
    /// Close the database and release every cached statement.
    Disconnect,
    /// Run one or more SQL statements with positional parameters.
    Execute,
    /// Prepare a statement, reusing the cached handle for identical SQL.
    Prepare,
    /// Step a prepared statement once, discarding any row.
    Run,
    /// Fetch the first row of a prepared statement, or null.
    Get,
    /// Fetch every row of a prepared statement.
    All,
    /// Drop the cached handle for a prepared statement.
    Finalize,
}

impl Method {
    /// Parse a wire method name; `None` for unknown methods.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "connect" => Some(Self::Connect),
            "disconnect" => Some(Self::Disconnect),
            "execute" => Some(Self::Execute),
            "prepare" => Some(Self::Prepare),
            "run" => Some(Self::Run),
            "get" => Some(Self::Get),
            "all" => Some(Self::All),
            "finalize" => Some(Self::Finalize),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Execute => "execute",
            Self::Prepare => "prepare",
            Self::Run => "run",
            Self::Get => "get",
            Self::All => "all",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority tier governing queue drain order on the worker side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Normalize a wire tier selector; absent or out-of-range values map to
    /// [`Priority::Normal`].
    #[must_use]
    pub fn from_wire(raw: Option<i64>) -> Self {
        match raw {
            Some(1) => Self::High,
            Some(-1) => Self::Low,
            _ => Self::Normal,
        }
    }

    #[must_use]
    pub const fn to_wire(self) -> i8 {
        match self {
            Self::High => 1,
            Self::Normal => 0,
            Self::Low => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_round_trip() {
        for method in [
            Method::Connect,
            Method::Disconnect,
            Method::Execute,
            Method::Prepare,
            Method::Run,
            Method::Get,
            Method::All,
            Method::Finalize,
        ] {
            assert_eq!(Method::parse(method.as_str()), Some(method));
        }
        assert_eq!(Method::parse("vacuum"), None);
    }

    #[test]
    fn out_of_range_priority_normalizes() {
        assert_eq!(Priority::from_wire(None), Priority::Normal);
        assert_eq!(Priority::from_wire(Some(0)), Priority::Normal);
        assert_eq!(Priority::from_wire(Some(7)), Priority::Normal);
        assert_eq!(Priority::from_wire(Some(-1)), Priority::Low);
        assert_eq!(Priority::from_wire(Some(1)), Priority::High);
    }
}
