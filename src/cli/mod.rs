pub mod cli_app;
pub mod repl;

pub use cli_app::{run_cli, Cli};
