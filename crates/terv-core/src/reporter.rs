//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal implementation. It is always passed
//! explicitly (by reference or inside `Config`), never installed globally,
//! so tests can substitute `NullReporter` deterministically.

pub trait Reporter: Send + Sync {
    /// Display a user-facing message (version searches, download targets).
    fn display(&self, msg: &str);

    /// Display a warning (signature fallbacks, lock contention).
    fn warning(&self, msg: &str);

    /// Debug-level detail, only shown in verbose runs.
    fn debug(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn display(&self, msg: &str) {
        (**self).display(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn debug(&self, msg: &str) {
        (**self).debug(msg);
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Clone, Copy, Debug)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn display(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn debug(&self, _: &str) {}
}

/// Reporter writing to the terminal, honoring a verbose flag.
#[derive(Clone, Copy, Debug)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Reporter for ConsoleReporter {
    fn display(&self, msg: &str) {
        println!("{msg}");
    }

    fn warning(&self, msg: &str) {
        eprintln!("warning: {msg}");
    }

    fn debug(&self, msg: &str) {
        if self.verbose {
            println!("{msg}");
        }
        tracing::debug!("{msg}");
    }
}
