use thiserror::Error;

/// Lightweight error enum - only 1 byte!
/// The actual error text is stored in `RillVM::error_message` to keep
/// `Result` values small on the hot paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RillError {
    /// Malformed source - message stored in vm.error_message
    #[error("compile error")]
    Compile,
    /// Fault raised while executing a callable - message stored in
    /// vm.error_message
    #[error("runtime error")]
    Runtime,
    /// Operand stack or call stack limit exceeded
    #[error("stack overflow")]
    StackOverflow,
}

pub type RillResult<T> = Result<T, RillError>;
