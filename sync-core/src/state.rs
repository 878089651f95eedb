//! Sync session state machine.
//!
//! This module provides a pure, side-effect-free state machine for one
//! host/guest exchange. The state machine takes events as input and produces
//! a new state plus a list of actions to execute.
//!
//! The actual I/O (opening the endpoint, sending payloads, committing the
//! merge) is performed by sync-client, not by this module.
//!
//! ```text
//! Idle -> StartingPeer -> WaitingForPeer (host) -> Exchanging -> Synced
//!                      -> Connecting (guest)    ->            -> Errored
//!                                                             -> Closed
//! ```

use crate::peer::PeerId;
use std::time::Duration;

/// Delay between a successful commit and clearing tombstones.
pub const TOMBSTONE_CLEANUP_DELAY: Duration = Duration::from_secs(1);

/// Which side of the exchange this device plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Advertises an ID, waits, merges first and replies.
    Host,
    /// Connects to a host, sends its own state, merges the reply.
    Guest {
        /// The host's advertised ID.
        remote_id: PeerId,
    },
}

/// Severity of a user-facing status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress.
    Info,
    /// The exchange completed.
    Success,
    /// Recoverable, e.g. the peer left early.
    Warning,
    /// The exchange failed.
    Error,
}

/// A status message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// How important the message is.
    pub severity: Severity,
    /// Human-readable text.
    pub message: String,
}

impl Status {
    /// An informational status.
    pub fn info(message: impl Into<String>) -> Self {
        Self::with(Severity::Info, message)
    }

    /// A success status.
    pub fn success(message: impl Into<String>) -> Self {
        Self::with(Severity::Success, message)
    }

    /// A warning status.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::with(Severity::Warning, message)
    }

    /// An error status.
    pub fn error(message: impl Into<String>) -> Self {
        Self::with(Severity::Error, message)
    }

    fn with(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Session state - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing in progress.
    Idle,
    /// Local endpoint is being opened.
    StartingPeer,
    /// Host endpoint is open and advertised.
    WaitingForPeer {
        /// The ID the guest should connect to.
        local_id: String,
    },
    /// Guest is dialing the host.
    Connecting {
        /// The host being dialed.
        remote_id: PeerId,
    },
    /// Connected; payloads are being exchanged and merged.
    Exchanging,
    /// Merge committed.
    Synced,
    /// The exchange failed.
    Errored {
        /// What went wrong.
        reason: String,
    },
    /// The peer left before the exchange completed.
    Closed,
}

/// Events that can occur during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// User asked to start syncing.
    StartRequested,
    /// Local endpoint is open.
    PeerOpened {
        /// The endpoint's advertised ID.
        local_id: String,
    },
    /// A connection to the other device is established.
    ConnectionOpened,
    /// A payload arrived from the other device.
    PayloadReceived {
        /// The compressed payload text.
        payload: String,
    },
    /// The merge was computed and written to the store.
    MergeCommitted {
        /// Compressed reply to send back (host only).
        reply: Option<String>,
    },
    /// Decoding or merging the payload failed.
    MergeFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The other device hung up.
    ConnectionClosed,
    /// The connection failed.
    ConnectionError {
        /// Error message describing the failure.
        error: String,
    },
    /// The local endpoint failed.
    PeerError {
        /// Error message describing the failure.
        error: String,
    },
    /// User cancelled or dismissed the session.
    ResetRequested,
}

/// Actions to be executed by the sync-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the local endpoint.
    OpenPeer,
    /// Present the local ID (text or QR) to the user.
    ShowPeerId {
        /// The ID to show.
        local_id: String,
    },
    /// Wait for an incoming connection.
    AwaitPeer,
    /// Dial the host.
    ConnectTo {
        /// The host's ID.
        remote_id: PeerId,
    },
    /// Send this device's current, unmerged state.
    SendLocalState,
    /// Wait for the next payload.
    AwaitPayload,
    /// Decode, merge and commit a payload.
    MergeAndCommit {
        /// The compressed payload text.
        payload: String,
    },
    /// Send the merged state back.
    SendReply {
        /// The compressed reply.
        payload: String,
    },
    /// Clear tombstones after a delay.
    ScheduleTombstoneCleanup {
        /// How long to wait.
        delay: Duration,
    },
    /// Close the connection and destroy the endpoint.
    ClosePeer,
    /// Hide any pending status.
    DismissStatus,
    /// Show a status to the user.
    Emit(Status),
}

/// One sync session: a role plus its current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    role: Role,
    state: SessionState,
    cleanup_delay: Duration,
}

impl Session {
    /// A new idle host session.
    pub fn host() -> Self {
        Self::new(Role::Host)
    }

    /// A new idle guest session dialing `remote_id`.
    pub fn guest(remote_id: PeerId) -> Self {
        Self::new(Role::Guest { remote_id })
    }

    /// A new idle session.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            state: SessionState::Idle,
            cleanup_delay: TOMBSTONE_CLEANUP_DELAY,
        }
    }

    /// Override the tombstone cleanup delay.
    pub fn with_cleanup_delay(mut self, delay: Duration) -> Self {
        self.cleanup_delay = delay;
        self
    }

    /// The session's role.
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// The current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// True for the host role.
    pub fn is_host(&self) -> bool {
        matches!(self.role, Role::Host)
    }

    /// True once the session can make no further progress without a reset.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            SessionState::Synced | SessionState::Errored { .. } | SessionState::Closed
        )
    }

    /// Process an event and return the new session plus actions to execute.
    ///
    /// This is a pure function. Events that make no sense in the current
    /// state are ignored.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        let Session {
            role,
            state,
            cleanup_delay,
        } = self;

        let (state, actions) = match (state, event) {
            (_, Event::ResetRequested) => (
                SessionState::Idle,
                vec![Action::ClosePeer, Action::DismissStatus],
            ),

            (SessionState::Idle, Event::StartRequested) => (
                SessionState::StartingPeer,
                vec![
                    Action::Emit(Status::info("Starting sync")),
                    Action::OpenPeer,
                ],
            ),

            (SessionState::StartingPeer, Event::PeerOpened { local_id }) => match &role {
                Role::Host => (
                    SessionState::WaitingForPeer {
                        local_id: local_id.clone(),
                    },
                    vec![
                        Action::ShowPeerId { local_id },
                        Action::Emit(Status::info("Waiting for the other device")),
                        Action::AwaitPeer,
                    ],
                ),
                Role::Guest { remote_id } => (
                    SessionState::Connecting {
                        remote_id: remote_id.clone(),
                    },
                    vec![
                        Action::Emit(Status::info(format!("Connecting to {remote_id}"))),
                        Action::ConnectTo {
                            remote_id: remote_id.clone(),
                        },
                    ],
                ),
            },

            (SessionState::WaitingForPeer { .. }, Event::ConnectionOpened) => (
                SessionState::Exchanging,
                vec![
                    Action::Emit(Status::info("Device connected, waiting for data")),
                    Action::AwaitPayload,
                ],
            ),
            (SessionState::Connecting { .. }, Event::ConnectionOpened) => (
                SessionState::Exchanging,
                vec![
                    Action::Emit(Status::info("Connected, sending data")),
                    Action::SendLocalState,
                    Action::AwaitPayload,
                ],
            ),

            (SessionState::Exchanging, Event::PayloadReceived { payload }) => (
                SessionState::Exchanging,
                vec![
                    Action::Emit(Status::info("Merging data")),
                    Action::MergeAndCommit { payload },
                ],
            ),
            (SessionState::Exchanging, Event::MergeCommitted { reply }) => {
                let mut actions = Vec::with_capacity(3);
                if let Some(payload) = reply {
                    actions.push(Action::SendReply { payload });
                }
                actions.push(Action::Emit(Status::success("Sync complete")));
                actions.push(Action::ScheduleTombstoneCleanup {
                    delay: cleanup_delay,
                });
                (SessionState::Synced, actions)
            }
            (SessionState::Exchanging, Event::MergeFailed { error }) => fail(error),

            // A hang-up after the commit is the normal end of an exchange.
            (
                SessionState::Synced,
                Event::ConnectionClosed | Event::ConnectionError { .. },
            ) => (SessionState::Synced, vec![]),

            (state, Event::ConnectionClosed) if is_active(&state) => (
                SessionState::Closed,
                vec![
                    Action::Emit(Status::warning("Connection closed before sync completed")),
                    Action::ClosePeer,
                ],
            ),
            (state, Event::ConnectionError { error } | Event::PeerError { error })
                if is_active(&state) =>
            {
                fail(error)
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        };

        (
            Session {
                role,
                state,
                cleanup_delay,
            },
            actions,
        )
    }
}

fn is_active(state: &SessionState) -> bool {
    matches!(
        state,
        SessionState::StartingPeer
            | SessionState::WaitingForPeer { .. }
            | SessionState::Connecting { .. }
            | SessionState::Exchanging
    )
}

fn fail(reason: String) -> (SessionState, Vec<Action>) {
    (
        SessionState::Errored {
            reason: reason.clone(),
        },
        vec![
            Action::Emit(Status::error(format!("Sync failed: {reason}"))),
            Action::ClosePeer,
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> PeerId {
        PeerId::parse("host-1234").unwrap()
    }

    fn drive(mut session: Session, events: Vec<Event>) -> (Session, Vec<Action>) {
        let mut all = Vec::new();
        for event in events {
            let (next, actions) = session.on_event(event);
            session = next;
            all.extend(actions);
        }
        (session, all)
    }

    #[test]
    fn starts_idle() {
        let session = Session::host();
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(!session.is_terminal());
    }

    #[test]
    fn start_opens_peer() {
        let (session, actions) = Session::host().on_event(Event::StartRequested);
        assert_eq!(session.state(), &SessionState::StartingPeer);
        assert!(actions.contains(&Action::OpenPeer));
    }

    #[test]
    fn host_shows_id_and_waits() {
        let (session, actions) = drive(
            Session::host(),
            vec![
                Event::StartRequested,
                Event::PeerOpened {
                    local_id: "abc".into(),
                },
            ],
        );
        assert_eq!(
            session.state(),
            &SessionState::WaitingForPeer {
                local_id: "abc".into()
            }
        );
        assert!(actions.contains(&Action::ShowPeerId {
            local_id: "abc".into()
        }));
        assert!(actions.contains(&Action::AwaitPeer));
    }

    #[test]
    fn guest_dials_host() {
        let (session, actions) = drive(
            Session::guest(remote()),
            vec![
                Event::StartRequested,
                Event::PeerOpened {
                    local_id: "guest".into(),
                },
            ],
        );
        assert!(matches!(session.state(), SessionState::Connecting { .. }));
        assert!(actions.contains(&Action::ConnectTo {
            remote_id: remote()
        }));
        assert!(!actions.iter().any(|a| matches!(a, Action::ShowPeerId { .. })));
    }

    #[test]
    fn guest_sends_first_host_waits() {
        let (_, guest_actions) = drive(
            Session::guest(remote()),
            vec![
                Event::StartRequested,
                Event::PeerOpened { local_id: "g".into() },
                Event::ConnectionOpened,
            ],
        );
        assert!(guest_actions.contains(&Action::SendLocalState));

        let (_, host_actions) = drive(
            Session::host(),
            vec![
                Event::StartRequested,
                Event::PeerOpened { local_id: "h".into() },
                Event::ConnectionOpened,
            ],
        );
        assert!(!host_actions.contains(&Action::SendLocalState));
        assert!(host_actions.contains(&Action::AwaitPayload));
    }

    #[test]
    fn host_full_exchange() {
        let (session, actions) = drive(
            Session::host(),
            vec![
                Event::StartRequested,
                Event::PeerOpened { local_id: "h".into() },
                Event::ConnectionOpened,
                Event::PayloadReceived {
                    payload: "in".into(),
                },
                Event::MergeCommitted {
                    reply: Some("out".into()),
                },
            ],
        );
        assert_eq!(session.state(), &SessionState::Synced);
        assert!(session.is_terminal());
        assert!(actions.contains(&Action::MergeAndCommit {
            payload: "in".into()
        }));
        assert!(actions.contains(&Action::SendReply {
            payload: "out".into()
        }));
        assert!(actions.contains(&Action::ScheduleTombstoneCleanup {
            delay: TOMBSTONE_CLEANUP_DELAY
        }));
        assert!(actions.contains(&Action::Emit(Status::success("Sync complete"))));
    }

    #[test]
    fn guest_commit_sends_nothing() {
        let session = Session {
            role: Role::Guest {
                remote_id: remote(),
            },
            state: SessionState::Exchanging,
            cleanup_delay: TOMBSTONE_CLEANUP_DELAY,
        };
        let (session, actions) = session.on_event(Event::MergeCommitted { reply: None });
        assert_eq!(session.state(), &SessionState::Synced);
        assert!(!actions.iter().any(|a| matches!(a, Action::SendReply { .. })));
    }

    #[test]
    fn custom_cleanup_delay() {
        let session = Session::host().with_cleanup_delay(Duration::from_millis(5));
        let (session, _) = drive(
            session,
            vec![
                Event::StartRequested,
                Event::PeerOpened { local_id: "h".into() },
                Event::ConnectionOpened,
            ],
        );
        let (_, actions) = session.on_event(Event::MergeCommitted { reply: None });
        assert!(actions.contains(&Action::ScheduleTombstoneCleanup {
            delay: Duration::from_millis(5)
        }));
    }

    #[test]
    fn merge_failure_errors() {
        let (session, actions) = drive(
            Session::host(),
            vec![
                Event::StartRequested,
                Event::PeerOpened { local_id: "h".into() },
                Event::ConnectionOpened,
                Event::MergeFailed {
                    error: "bad payload".into(),
                },
            ],
        );
        assert_eq!(
            session.state(),
            &SessionState::Errored {
                reason: "bad payload".into()
            }
        );
        assert!(actions.contains(&Action::ClosePeer));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Emit(s) if s.severity == Severity::Error)));
    }

    #[test]
    fn early_hangup_closes() {
        let (session, actions) = drive(
            Session::host(),
            vec![
                Event::StartRequested,
                Event::PeerOpened { local_id: "h".into() },
                Event::ConnectionOpened,
                Event::ConnectionClosed,
            ],
        );
        assert_eq!(session.state(), &SessionState::Closed);
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Emit(s) if s.severity == Severity::Warning)));
    }

    #[test]
    fn peer_error_while_starting() {
        let (session, _) = drive(
            Session::guest(remote()),
            vec![
                Event::StartRequested,
                Event::PeerError {
                    error: "bind failed".into(),
                },
            ],
        );
        assert!(matches!(session.state(), SessionState::Errored { .. }));
    }

    #[test]
    fn hangup_after_sync_is_ignored() {
        let (session, _) = drive(
            Session::host(),
            vec![
                Event::StartRequested,
                Event::PeerOpened { local_id: "h".into() },
                Event::ConnectionOpened,
                Event::MergeCommitted { reply: None },
            ],
        );
        let (session, actions) = session.on_event(Event::ConnectionClosed);
        assert_eq!(session.state(), &SessionState::Synced);
        assert!(actions.is_empty());
    }

    #[test]
    fn reset_from_any_state() {
        for events in [
            vec![],
            vec![Event::StartRequested],
            vec![
                Event::StartRequested,
                Event::PeerOpened { local_id: "h".into() },
            ],
            vec![
                Event::StartRequested,
                Event::PeerOpened { local_id: "h".into() },
                Event::ConnectionOpened,
                Event::MergeCommitted { reply: None },
            ],
        ] {
            let (session, _) = drive(Session::host(), events);
            let (session, actions) = session.on_event(Event::ResetRequested);
            assert_eq!(session.state(), &SessionState::Idle);
            assert_eq!(actions, vec![Action::ClosePeer, Action::DismissStatus]);
        }
    }

    #[test]
    fn invalid_transition_is_noop() {
        let (session, actions) = Session::host().on_event(Event::ConnectionOpened);
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(actions.is_empty());

        let (session, actions) = Session::host().on_event(Event::PayloadReceived {
            payload: "x".into(),
        });
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(actions.is_empty());
    }
}
