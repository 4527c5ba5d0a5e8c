use crate::transport::TransportError;

/// Hard failures of a driver operation.
///
/// Short frames, checksum mismatches and all-zero readings are not errors;
/// they are reported through [`crate::MeasureOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("read an unexpected number of status bytes: got {read}, expected 1")]
    UnexpectedStatusLength { read: usize },
    #[error("device still busy after {polls} status polls")]
    BusyTimeout { polls: u32 },
}
