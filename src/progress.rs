//! For reporting conversion progress and aborting early

/// A trait that is used to report progress and status to some consumer.
///
/// Reading and saving are two separate phases; each starts with `begin`,
/// counts with `increase` and finishes with `done`.
pub trait ProgressReporter {
    /// A phase is starting. `total` is the expected number of steps (may be a guess).
    fn begin(&mut self, _total: u64, _msg: &str) {}

    /// Called after each frame has been read or written.
    ///
    /// This method may return `false` to abort processing.
    fn increase(&mut self) -> bool;

    /// Something went wrong with one input
    #[cold]
    fn error(&mut self, _message: String) {}

    /// The current phase has finished
    fn done(&mut self, _msg: &str) {}
}

/// No-op progress reporter
pub struct NoProgress {}

impl ProgressReporter for NoProgress {
    fn increase(&mut self) -> bool {
        true
    }
}
