//! Line-oriented command input and plain-text rendering
//!
//! Plain text replaces the search term. Lines starting with `:` are
//! commands:
//!
//! ```text
//! :type TEXT       type TEXT one keystroke at a time
//! :enter [TEXT]    submit the current (or given) term
//! :filter k=v      set a filter (category, minPrice, maxPrice, rating, inStock)
//! :clear-filters   drop every filter
//! :sort ORDER      relevance | price_asc | price_desc | newest | rating | popular
//! :page N          go to page N
//! :retry           re-run a failed search
//! :url [QUERY]     print the URL query string, or navigate to QUERY
//! :recent          list recent searches
//! :clear-recent    forget recent searches
//! :view [grid|list]
//! :show            print the current view
//! :quit
//! ```

use crate::controller::view::SearchView;
use crate::controller::SearchCommand;
use crate::query::{FilterChange, SortOrder};
use crate::types::ViewMode;
use std::fmt::Write as _;

#[derive(Debug)]
pub enum ReplInput {
    Command(SearchCommand),
    Type(String),
    ToggleView,
    ShowRecent,
    ShowUrl,
    ShowView,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplError {
    #[error("unknown command ':{0}'")]
    UnknownCommand(String),
    #[error("invalid argument for ':{command}': '{argument}'")]
    InvalidArgument { command: String, argument: String },
}

pub fn parse_line(line: &str) -> Result<ReplInput, ReplError> {
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(ReplInput::Command(SearchCommand::SetTerm(line.to_string())));
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest.trim(), ""),
    };
    let invalid = || ReplError::InvalidArgument {
        command: name.to_string(),
        argument: argument.to_string(),
    };

    let input = match name {
        "type" => ReplInput::Type(argument.to_string()),
        "enter" | "commit" if argument.is_empty() => ReplInput::Command(SearchCommand::CommitCurrent),
        "enter" | "commit" => ReplInput::Command(SearchCommand::Commit(argument.to_string())),
        "filter" => {
            let change = FilterChange::parse(argument).ok_or_else(invalid)?;
            ReplInput::Command(SearchCommand::SetFilter(change))
        }
        "clear-filters" => ReplInput::Command(SearchCommand::ClearFilters),
        "sort" => {
            let sort = SortOrder::parse(argument).ok_or_else(invalid)?;
            ReplInput::Command(SearchCommand::SetFilter(FilterChange::Sort(sort)))
        }
        "page" => {
            let page = argument.parse::<u32>().map_err(|_| invalid())?;
            ReplInput::Command(SearchCommand::GoToPage(page))
        }
        "retry" => ReplInput::Command(SearchCommand::Retry),
        "url" if argument.is_empty() => ReplInput::ShowUrl,
        "url" => ReplInput::Command(SearchCommand::Navigate(argument.to_string())),
        "recent" => ReplInput::ShowRecent,
        "clear-recent" => ReplInput::Command(SearchCommand::ClearRecent),
        "view" if argument.is_empty() => ReplInput::ToggleView,
        "view" => {
            let mode = ViewMode::parse(argument).ok_or_else(invalid)?;
            ReplInput::Command(SearchCommand::SetViewMode(mode))
        }
        "show" => ReplInput::ShowView,
        "quit" | "q" | "exit" => ReplInput::Quit,
        other => return Err(ReplError::UnknownCommand(other.to_string())),
    };
    Ok(input)
}

/// Plain-text rendering of a view
pub fn render(view: &SearchView) -> Vec<String> {
    let mut lines = Vec::new();

    let mut header = format!("> {}", view.input);
    if view.is_loading() {
        header.push_str("  (searching…)");
    }
    lines.push(header);

    if !view.suggestions.is_empty() {
        let names: Vec<&str> = view.suggestions.iter().map(|s| s.name.as_str()).collect();
        lines.push(format!("  suggestions: {}", names.join(", ")));
    }
    for product in &view.previews {
        lines.push(format!("  ~ {} ({:.2})", product.name, product.price));
    }

    if let Some(error) = &view.main.error {
        lines.push(format!("! {} (:retry)", error));
    } else if view.is_empty_result() {
        let mut empty = String::from("No products found");
        if view.can_clear_filters() {
            empty.push_str(" (:clear-filters)");
        }
        lines.push(empty);
    } else if let Some(summary) = view.summary() {
        lines.push(summary);
        for product in &view.products {
            let mut line = String::new();
            match view.view_mode {
                ViewMode::Grid => {
                    let _ = write!(line, "  [{}] {:.2}", product.name, product.price);
                }
                ViewMode::List => {
                    let _ = write!(line, "  - {} ... {:.2}", product.name, product.price);
                    if let Some(category) = &product.category {
                        let _ = write!(line, " ({})", category);
                    }
                }
            }
            lines.push(line);
        }
        if view.pages.len() > 1 {
            let pages: Vec<String> = view
                .pages
                .iter()
                .map(|slot| match slot {
                    crate::pagination::PageSlot::Page(n)
                        if Some(*n) == view.page_info.map(|p| p.current_page) =>
                    {
                        format!("[{}]", n)
                    }
                    other => other.to_string(),
                })
                .collect();
            lines.push(format!("  pages: {}", pages.join(" ")));
        }
    }
    lines
}
