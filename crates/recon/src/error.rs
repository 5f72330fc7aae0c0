use std::fmt;

/// Which statement record set an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Holdings,
    PriorHoldings,
    Income,
    Activity,
    Summary,
    ChartOfAccounts,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Holdings => write!(f, "holdings"),
            Self::PriorHoldings => write!(f, "prior holdings"),
            Self::Income => write!(f, "income"),
            Self::Activity => write!(f, "activity"),
            Self::Summary => write!(f, "summary"),
            Self::ChartOfAccounts => write!(f, "chart of accounts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// A record set the computation depends on was not provided.
    MissingInput { kind: InputKind, detail: String },
    /// A field failed required-field parsing (non-numeric amount, bad date, ...).
    /// `row` is 1-based and counts data rows only.
    MalformedInput {
        kind: InputKind,
        row: usize,
        field: String,
        value: String,
    },
    /// Missing required column in input data.
    MissingColumn { kind: InputKind, column: String },
    /// Summary file must hold exactly one data row.
    SummaryRowCount { found: usize },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (duplicate basket, empty account name, etc.).
    ConfigValidation(String),
    /// Month outside 1..=12 or an unrepresentable date.
    InvalidPeriod { year: i32, month: u32 },
    /// IO error (file read, CSV framing, etc.).
    Io(String),
}

impl ReconError {
    pub fn malformed(kind: InputKind, row: usize, field: &str, value: &str) -> Self {
        Self::MalformedInput {
            kind,
            row,
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for errors that only mean "this record set is absent".
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingInput { .. })
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput { kind, detail } => write!(f, "missing {kind} input: {detail}"),
            Self::MalformedInput { kind, row, field, value } => {
                write!(f, "{kind} row {row}: cannot parse {field} '{value}'")
            }
            Self::MissingColumn { kind, column } => {
                write!(f, "{kind}: missing column '{column}'")
            }
            Self::SummaryRowCount { found } => {
                write!(f, "summary must contain exactly one data row, found {found}")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidPeriod { year, month } => {
                write!(f, "invalid statement period {year}-{month:02}: month must be 1-12")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<csv::Error> for ReconError {
    fn from(err: csv::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<std::io::Error> for ReconError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
