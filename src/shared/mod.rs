// Building blocks shared by the subcommands.
pub mod lock;
pub mod logging;
pub mod signal;
pub mod tees;
pub mod writer;
pub mod xml;
