use thiserror::Error;

/// The five abstract failure kinds the pipeline can produce.
///
/// Most call sites never match on a variant directly — they propagate through
/// `anyhow::Result` with `.context()` added at each layer — but the LVM/RAID
/// classifiers specifically match `ProbeUnavailable` to fall back to `false`,
/// and the top-level runner matches on `ToolMissing` to decide whether a
/// stage's failure is fatal or merely logged.
#[derive(Debug, Error)]
pub enum RambootError {
    #[error("block-device probe unavailable for '{device}'")]
    ProbeUnavailable { device: String },

    #[error("required external tool '{tool}' is not present")]
    ToolMissing { tool: String },

    #[error("failed to parse mount-table line: '{line}'")]
    ParseFailure { line: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
