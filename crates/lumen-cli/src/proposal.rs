//! Theme proposal flow — the state machine between "a signal changed"
//! and "the user kept (or dismissed) the new look".
//!
//! Generation requests are gated by an in-flight sequence number: a new
//! trigger is skipped while one is outstanding, and a reply is applied
//! only if its sequence matches the outstanding one — a stale reply
//! landing after the user moved on is discarded.

use tracing::{debug, info};

use lumen_core::error::Result;
use lumen_core::theme::GeneratedTheme;

use crate::theme_apply::{AppliedState, ThemeService};

#[derive(Debug)]
enum ProposalState {
    Idle,
    Previewing {
        candidate: GeneratedTheme,
        prior: AppliedState,
    },
}

/// Client-side proposal state machine.
pub struct ProposalFlow {
    state: ProposalState,
    in_flight: Option<u64>,
    next_seq: u64,
}

impl Default for ProposalFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl ProposalFlow {
    pub fn new() -> Self {
        Self {
            state: ProposalState::Idle,
            in_flight: None,
            next_seq: 0,
        }
    }

    /// Whether a generation request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The candidate currently being previewed, if any.
    pub fn proposed(&self) -> Option<&GeneratedTheme> {
        match &self.state {
            ProposalState::Previewing { candidate, .. } => Some(candidate),
            ProposalState::Idle => None,
        }
    }

    /// Claim the in-flight slot for a new generation request. Returns
    /// `None` while another request is outstanding — callers skip the
    /// trigger rather than racing for the single proposed slot.
    pub fn begin_generation(&mut self) -> Option<u64> {
        if self.in_flight.is_some() {
            debug!("skipping theme trigger: generation already in flight");
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight = Some(seq);
        Some(seq)
    }

    /// Release the in-flight slot after a failed generation. Prior theme
    /// state is untouched; the user may trigger again manually.
    pub fn fail_generation(&mut self, seq: u64) {
        if self.in_flight == Some(seq) {
            self.in_flight = None;
        }
    }

    /// A generated theme arrived. Applies it as a live preview and
    /// captures the state to revert to. Returns false for stale replies
    /// (sequence mismatch), which are discarded without touching the
    /// document.
    pub fn offer(
        &mut self,
        seq: u64,
        candidate: GeneratedTheme,
        service: &mut ThemeService,
    ) -> bool {
        if self.in_flight != Some(seq) {
            debug!(seq, "discarding stale theme reply");
            return false;
        }
        self.in_flight = None;

        // A leftover preview reverts first so `prior` is the real
        // pre-proposal state, not a previous candidate.
        if let ProposalState::Previewing { prior, .. } =
            std::mem::replace(&mut self.state, ProposalState::Idle)
        {
            service.restore(&prior);
        }

        let prior = service.snapshot();
        service.apply(&candidate);
        info!(theme = %candidate.name, "previewing proposed theme");
        self.state = ProposalState::Previewing { candidate, prior };
        true
    }

    /// Commit the previewed candidate: the pending revert is dropped and
    /// the theme is persisted as Active (and Favorite when opted in).
    pub fn commit(
        &mut self,
        service: &mut ThemeService,
        favorite: bool,
    ) -> Result<Option<GeneratedTheme>> {
        match std::mem::replace(&mut self.state, ProposalState::Idle) {
            ProposalState::Previewing { candidate, .. } => {
                service.persist_active(&candidate)?;
                if favorite {
                    service.persist_favorite(&candidate)?;
                }
                info!(theme = %candidate.name, "theme committed");
                Ok(Some(candidate))
            }
            ProposalState::Idle => Ok(None),
        }
    }

    /// Dismiss the previewed candidate and restore exactly the prior
    /// state. Never touches the Favorite slot.
    pub fn dismiss(&mut self, service: &mut ThemeService) -> bool {
        match std::mem::replace(&mut self.state, ProposalState::Idle) {
            ProposalState::Previewing { candidate, prior } => {
                service.restore(&prior);
                info!(theme = %candidate.name, "theme dismissed");
                true
            }
            ProposalState::Idle => false,
        }
    }
}
