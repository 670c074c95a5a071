// Command implementations split by subcommand for clarity.
pub mod cat;
pub mod convert;
pub mod example;
pub mod ls;

pub use cat::run_cat;
pub use convert::run_convert;
pub use example::run_example;
pub use ls::run_ls;
