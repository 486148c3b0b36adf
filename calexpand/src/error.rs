use jiff::civil::DateTime;

/// Why a recurrence description was rejected.
///
/// The parser never substitutes a default pattern: every description either
/// yields a complete rule or one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("unknown recurrence pattern kind '{0}'")]
    UnknownPatternKind(String),

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("value of '{0}' is out of domain")]
    OutOfDomain(String),

    #[error("invalid recurrence range: {0}")]
    InvalidRange(String),

    #[error("malformed recurrence description: {0}")]
    Malformed(String),
}

impl ParseError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn out_of_domain(field: impl Into<String>) -> Self {
        Self::OutOfDomain(field.into())
    }

    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::InvalidRange(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

impl From<quick_xml::Error> for ParseError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Fatal for one master; the rest of the batch still expands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ExpandError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unbounded recurrence needs a window end or an instance cap")]
    UnboundedRangeWithoutWindow,

    #[error("anchor end {end} does not follow start {start}")]
    InvalidAnchor { start: DateTime, end: DateTime },

    #[error("date arithmetic out of range: {0}")]
    OutOfRange(String),
}

impl From<jiff::Error> for ExpandError {
    fn from(e: jiff::Error) -> Self {
        Self::OutOfRange(e.to_string())
    }
}

/// An [`ExpandError`] attached to the master it came from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("master {master_id}: {error}")]
pub struct MasterFailure {
    pub master_id: i64,
    #[source]
    pub error: ExpandError,
}

impl MasterFailure {
    pub fn new(master_id: i64, error: impl Into<ExpandError>) -> Self {
        Self {
            master_id,
            error: error.into(),
        }
    }
}

/// Non-fatal oddities found while merging exceptions. Reported alongside the
/// instances; they never fail an expansion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AnomalyWarning {
    #[error("master {master_id}: exception for {original_start} matches no occurrence")]
    OrphanedException {
        master_id: i64,
        original_start: DateTime,
    },

    #[error("exception for {original_start} refers to unknown master {master_id}")]
    UnknownMaster {
        master_id: i64,
        original_start: DateTime,
    },

    #[error("master {master_id}: replacement for {original_start} ends before it starts")]
    InvalidReplacement {
        master_id: i64,
        original_start: DateTime,
    },

    #[error("master {master_id}: more than one exception for {original_start}, keeping the last")]
    DuplicateException {
        master_id: i64,
        original_start: DateTime,
    },

    /// A replacement landed on another occurrence of its own series and was
    /// dropped.
    #[error(
        "master {master_id}: replacement for {original_start} overlaps the occurrence \
         scheduled at {conflicts_with}, dropping it"
    )]
    ConflictingReplacement {
        master_id: i64,
        original_start: DateTime,
        conflicts_with: DateTime,
    },
}

impl AnomalyWarning {
    pub fn master_id(&self) -> i64 {
        match *self {
            Self::OrphanedException { master_id, .. }
            | Self::UnknownMaster { master_id, .. }
            | Self::InvalidReplacement { master_id, .. }
            | Self::DuplicateException { master_id, .. }
            | Self::ConflictingReplacement { master_id, .. } => master_id,
        }
    }
}
