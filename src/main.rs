//! storefront-search - incremental product search from the terminal
//!
//! Reads commands from stdin and prints the search view as it changes.
//! Plain lines replace the search term; `:type TEXT` simulates typing,
//! `:enter` submits, `:quit` exits. See `cli::repl` for the full list.

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    storefront_search::cli::run_cli().await
}
