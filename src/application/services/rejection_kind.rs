/// How a request-guard rejection should be surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    InvalidInput,
    PermissionDenied,
    NotFound,
}
