//! Per-channel lifecycle
//!
//! Each data source (main results, suggestions, instant previews) moves
//! through `Idle → Debouncing → InFlight → {Resolved | Cancelled | Failed}`.
//! All phase changes go through [`ChannelPhase::transition`].

use std::fmt;

/// Identifier assigned by the fetch gateway to every dispatch
pub type DispatchId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Main,
    Suggest,
    Instant,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Main, Channel::Suggest, Channel::Instant];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Main => "main",
            Channel::Suggest => "suggest",
            Channel::Instant => "instant",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a dispatch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Resolved,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Input changed and the debounce timer was (re)started
    Scheduled,
    /// Input no longer qualifies for this channel
    Cleared,
    Dispatched(DispatchId),
    /// Served from cache without touching the network
    CacheHit,
    Settled(DispatchId, Settlement),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelPhase {
    #[default]
    Idle,
    Debouncing,
    InFlight(DispatchId),
    Resolved,
    Cancelled,
    Failed,
}

impl ChannelPhase {
    /// Single transition function for a channel. A settlement only moves
    /// the phase when it belongs to the dispatch currently in flight;
    /// settlements of superseded dispatches leave the phase untouched.
    pub fn transition(self, event: ChannelEvent) -> ChannelPhase {
        match (self, event) {
            (_, ChannelEvent::Scheduled) => ChannelPhase::Debouncing,
            (_, ChannelEvent::Cleared) => ChannelPhase::Idle,
            (_, ChannelEvent::Dispatched(id)) => ChannelPhase::InFlight(id),
            (_, ChannelEvent::CacheHit) => ChannelPhase::Resolved,
            (ChannelPhase::InFlight(current), ChannelEvent::Settled(id, settlement))
                if current == id =>
            {
                match settlement {
                    Settlement::Resolved => ChannelPhase::Resolved,
                    Settlement::Cancelled => ChannelPhase::Cancelled,
                    Settlement::Failed => ChannelPhase::Failed,
                }
            }
            (phase, ChannelEvent::Settled(..)) => phase,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ChannelPhase::InFlight(_))
    }
}

/// Phase, last error and counters for one channel
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelStatus {
    pub phase: ChannelPhase,
    /// Error of the latest relevant failure, cleared on the next success
    pub error: Option<String>,
    pub dispatched: u64,
    pub resolved: u64,
    pub cancelled: u64,
    pub failed: u64,
    /// Completions dropped because the query had moved on
    pub discarded: u64,
    pub cache_hits: u64,
}

impl ChannelStatus {
    pub fn apply(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Dispatched(_) => self.dispatched += 1,
            ChannelEvent::CacheHit => self.cache_hits += 1,
            ChannelEvent::Settled(_, Settlement::Resolved) => self.resolved += 1,
            ChannelEvent::Settled(_, Settlement::Cancelled) => self.cancelled += 1,
            ChannelEvent::Settled(_, Settlement::Failed) => self.failed += 1,
            ChannelEvent::Scheduled | ChannelEvent::Cleared => {}
        }
        self.phase = self.phase.transition(event);
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }
}
