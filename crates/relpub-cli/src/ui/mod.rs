//! Terminal output.

pub mod output;
pub mod reporter;

pub use output::Output;
pub use reporter::ConsoleReporter;
