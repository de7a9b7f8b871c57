//! Controller task and its handle
//!
//! The controller runs as one tokio task. Commands, timer fires and fetch
//! completions are multiplexed with `select!` and handled one at a time;
//! after each message the current view is published on a watch channel.

use crate::controller::view::SearchView;
use crate::controller::{ControllerInbox, SearchCommand, SearchController};
use crate::error::ControllerError;
use crate::query::FilterChange;
use crate::types::ViewMode;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Front-end handle to a running controller
pub struct SearchHandle {
    commands: mpsc::UnboundedSender<SearchCommand>,
    view: watch::Receiver<SearchView>,
    task: JoinHandle<()>,
}

impl SearchHandle {
    /// Spawn the controller loop. Must be called inside a tokio runtime.
    pub fn spawn(controller: SearchController, inbox: ControllerInbox) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(controller.view().clone());
        let task = tokio::spawn(run(controller, inbox, command_rx, view_tx));
        Self { commands, view, task }
    }

    pub fn send(&self, command: SearchCommand) -> Result<(), ControllerError> {
        self.commands.send(command).map_err(|_| ControllerError::Closed)
    }

    pub fn set_term(&self, text: impl Into<String>) -> Result<(), ControllerError> {
        self.send(SearchCommand::SetTerm(text.into()))
    }

    pub fn set_filter(&self, change: FilterChange) -> Result<(), ControllerError> {
        self.send(SearchCommand::SetFilter(change))
    }

    pub fn clear_filters(&self) -> Result<(), ControllerError> {
        self.send(SearchCommand::ClearFilters)
    }

    pub fn commit(&self, text: impl Into<String>) -> Result<(), ControllerError> {
        self.send(SearchCommand::Commit(text.into()))
    }

    pub fn go_to_page(&self, page: u32) -> Result<(), ControllerError> {
        self.send(SearchCommand::GoToPage(page))
    }

    pub fn retry(&self) -> Result<(), ControllerError> {
        self.send(SearchCommand::Retry)
    }

    pub fn navigate(&self, query: impl Into<String>) -> Result<(), ControllerError> {
        self.send(SearchCommand::Navigate(query.into()))
    }

    pub fn clear_recent(&self) -> Result<(), ControllerError> {
        self.send(SearchCommand::ClearRecent)
    }

    pub fn set_view_mode(&self, mode: ViewMode) -> Result<(), ControllerError> {
        self.send(SearchCommand::SetViewMode(mode))
    }

    /// View after every command sent so far has been applied
    pub async fn snapshot(&self) -> Result<SearchView, ControllerError> {
        let (reply, response) = oneshot::channel();
        self.send(SearchCommand::Snapshot(reply))?;
        response.await.map_err(|_| ControllerError::Closed)
    }

    /// Latest published view, without waiting for queued commands
    pub fn latest(&self) -> SearchView {
        self.view.borrow().clone()
    }

    /// Receiver that is notified on every published view
    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.view.clone()
    }

    /// Stop the controller and wait for its task to finish
    pub async fn shutdown(self) -> Result<(), ControllerError> {
        // Already stopped is fine
        let _ = self.commands.send(SearchCommand::Shutdown);
        self.task.await.map_err(|e| {
            log::error!("Search controller task failed: {}", e);
            ControllerError::Closed
        })
    }
}

async fn run(
    mut controller: SearchController,
    mut inbox: ControllerInbox,
    mut commands: mpsc::UnboundedReceiver<SearchCommand>,
    view: watch::Sender<SearchView>,
) {
    log::debug!("Search controller started");
    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(command) => {
                        if !controller.handle_command(command) {
                            break;
                        }
                    }
                    None => {
                        log::debug!("All search handles dropped");
                        controller.shutdown();
                        break;
                    }
                }
            }
            Some(fired) = inbox.timers.recv() => {
                controller.on_timer(fired);
            }
            Some(completion) = inbox.completions.recv() => {
                controller.on_completion(completion);
            }
        }
        view.send_replace(controller.view().clone());
    }
    log::debug!("Search controller stopped");
}
