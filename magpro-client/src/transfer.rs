//! Table and seat transfers
//!
//! A transfer walks a fixed set of phases: pick what to move, pick where,
//! pick how, confirm. Every phase validates before advancing and any
//! rejection aborts straight back to idle, so the floor plan can never be
//! left mid-transfer with stale intent.

use shared::{Notice, Table, GROUP_SEAT};

use crate::error::StateError;
use crate::http::Api;

/// Fully specified transfer, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferIntent {
    pub source: Table,
    /// Seat being moved; [`GROUP_SEAT`] means the whole table.
    pub source_seat: u32,
    pub destination: Table,
    /// Destination seat chosen by the operator.
    pub target_seat: u32,
}

impl TransferIntent {
    /// A whole-table transfer keeps group mode at the destination.
    pub fn is_table_move(&self) -> bool {
        self.source_seat == GROUP_SEAT && self.target_seat == GROUP_SEAT
    }
}

/// Destination billing mode offered to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationMode {
    /// Bill the destination as one group (seat 0).
    Group,
    /// Keep the moved party on an individual seat.
    Seat(u32),
}

/// Transfer phases.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TransferState {
    #[default]
    Idle,
    /// Waiting for the operator to pick which occupied seat moves.
    SelectingSeat { source: Table, seats: Vec<u32> },
    /// Waiting for a destination table tap.
    AwaitingDestination { source: Table, seat: u32 },
    /// Waiting for the group-or-seat choice at the destination.
    ChoosingDestinationMode {
        source: Table,
        seat: u32,
        destination: Table,
    },
    /// Waiting for the final confirmation.
    AwaitingConfirmation { intent: TransferIntent },
    /// Server call in progress.
    Executing,
}

impl TransferState {
    fn phase(&self) -> &'static str {
        match self {
            TransferState::Idle => "idle",
            TransferState::SelectingSeat { .. } => "selecting a seat",
            TransferState::AwaitingDestination { .. } => "awaiting a destination",
            TransferState::ChoosingDestinationMode { .. } => "choosing the destination mode",
            TransferState::AwaitingConfirmation { .. } => "awaiting confirmation",
            TransferState::Executing => "executing a transfer",
        }
    }
}

/// Final result of a confirmed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Server acknowledged; the caller should refresh the floor plan.
    Completed,
    /// Server answered but refused.
    Rejected,
    /// Transport failure.
    Failed,
}

/// Drives one transfer at a time through its phases.
#[derive(Debug, Default)]
pub struct TransferStateMachine {
    state: TransferState,
}

impl TransferStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != TransferState::Idle
    }

    /// Begin a transfer from `source`. Group-mode tables skip straight to
    /// destination selection with the group sentinel; per-seat tables first
    /// ask which seat moves.
    pub fn initiate(&mut self, source: &Table) -> Result<&TransferState, StateError> {
        if self.state != TransferState::Idle {
            return Err(StateError::InvalidTransition {
                phase: self.state.phase(),
            });
        }
        if !source.has_occupied_seats() {
            return Err(StateError::EmptyTable);
        }

        self.state = if source.is_group() {
            TransferState::AwaitingDestination {
                source: source.clone(),
                seat: GROUP_SEAT,
            }
        } else {
            TransferState::SelectingSeat {
                source: source.clone(),
                seats: source.occupied_individuals(),
            }
        };
        Ok(&self.state)
    }

    /// Pick which occupied seat moves.
    pub fn select_seat(&mut self, seat: u32) -> Result<&TransferState, StateError> {
        let source = match &self.state {
            TransferState::SelectingSeat { source, seats } => {
                if !seats.contains(&seat) {
                    return Err(StateError::SeatNotOccupied { seat });
                }
                source.clone()
            }
            _ => {
                return Err(StateError::InvalidTransition {
                    phase: self.state.phase(),
                })
            }
        };

        self.state = TransferState::AwaitingDestination { source, seat };
        Ok(&self.state)
    }

    /// Pick the destination table. Choosing the source itself or an
    /// occupied table aborts the transfer back to idle.
    pub fn select_destination(&mut self, destination: &Table) -> Result<&TransferState, StateError> {
        let (source, seat) = match &self.state {
            TransferState::AwaitingDestination { source, seat } => (source.clone(), *seat),
            _ => {
                return Err(StateError::InvalidTransition {
                    phase: self.state.phase(),
                })
            }
        };

        if destination.id == source.id {
            self.state = TransferState::Idle;
            return Err(StateError::SameTable);
        }
        if destination.has_occupied_seats() {
            self.state = TransferState::Idle;
            return Err(StateError::DestinationOccupied);
        }

        self.state = TransferState::ChoosingDestinationMode {
            source,
            seat,
            destination: destination.clone(),
        };
        Ok(&self.state)
    }

    /// Pick how the destination is billed, producing the final intent.
    pub fn choose_mode(&mut self, mode: DestinationMode) -> Result<&TransferState, StateError> {
        let (source, seat, destination) = match &self.state {
            TransferState::ChoosingDestinationMode {
                source,
                seat,
                destination,
            } => (source.clone(), *seat, destination.clone()),
            _ => {
                return Err(StateError::InvalidTransition {
                    phase: self.state.phase(),
                })
            }
        };

        let target_seat = match mode {
            DestinationMode::Group => GROUP_SEAT,
            DestinationMode::Seat(n) => n,
        };
        let intent = TransferIntent {
            source,
            source_seat: seat,
            destination,
            target_seat,
        };
        self.state = TransferState::AwaitingConfirmation { intent };
        Ok(&self.state)
    }

    /// Execute the confirmed transfer. A whole-table move (group source,
    /// group target) issues `move_table`, anything else `move_seat`. The
    /// machine returns to idle whatever happens; only the outcome differs.
    pub async fn confirm(
        &mut self,
        api: &dyn Api,
    ) -> Result<(TransferOutcome, Notice), StateError> {
        let TransferState::AwaitingConfirmation { intent } = &self.state else {
            return Err(StateError::InvalidTransition {
                phase: self.state.phase(),
            });
        };
        let intent = intent.clone();
        self.state = TransferState::Executing;

        let result = if intent.is_table_move() {
            api.move_table(intent.source.id, intent.destination.id).await
        } else {
            api.move_seat(
                intent.source.id,
                intent.source_seat,
                intent.destination.id,
                intent.target_seat,
            )
            .await
        };
        self.state = TransferState::Idle;

        match result {
            Ok(resp) if resp.is_success() => {
                tracing::info!(
                    source = intent.source.id,
                    destination = intent.destination.id,
                    "transfer completed"
                );
                Ok((
                    TransferOutcome::Completed,
                    Notice::success(format!(
                        "Transferred {} to {}.",
                        intent.source.name, intent.destination.name
                    )),
                ))
            }
            Ok(resp) => {
                let message = resp.message_or("The server refused the transfer.");
                tracing::warn!(message, "transfer rejected");
                Ok((TransferOutcome::Rejected, Notice::error(message)))
            }
            Err(err) => {
                tracing::warn!(error = %err, "transfer failed");
                Ok((TransferOutcome::Failed, err.to_notice()))
            }
        }
    }

    /// Abort the transfer. Safe in any phase; returns whether one was
    /// actually in progress.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = TransferState::Idle;
        was_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{occupied_table, table, MockApi};

    fn group_table(id: i64, name: &str) -> Table {
        occupied_table(id, name, vec![GROUP_SEAT])
    }

    #[test]
    fn empty_table_cannot_start_a_transfer() {
        let mut machine = TransferStateMachine::new();
        let err = machine.initiate(&table(1, "T1", "free")).unwrap_err();
        assert_eq!(err, StateError::EmptyTable);
        assert!(!machine.is_active());
    }

    #[test]
    fn group_table_skips_seat_selection() {
        let mut machine = TransferStateMachine::new();
        machine.initiate(&group_table(1, "T1")).unwrap();
        assert!(matches!(
            machine.state(),
            TransferState::AwaitingDestination { seat: 0, .. }
        ));
    }

    #[test]
    fn per_seat_table_asks_for_a_seat() {
        let mut machine = TransferStateMachine::new();
        machine
            .initiate(&occupied_table(1, "T1", vec![3, 1]))
            .unwrap();
        match machine.state() {
            TransferState::SelectingSeat { seats, .. } => assert_eq!(seats, &vec![1, 3]),
            other => panic!("unexpected state {other:?}"),
        }

        assert_eq!(
            machine.select_seat(4).unwrap_err(),
            StateError::SeatNotOccupied { seat: 4 }
        );
        machine.select_seat(3).unwrap();
        assert!(matches!(
            machine.state(),
            TransferState::AwaitingDestination { seat: 3, .. }
        ));
    }

    #[test]
    fn same_table_destination_aborts_to_idle() {
        let mut machine = TransferStateMachine::new();
        let source = group_table(1, "T1");
        machine.initiate(&source).unwrap();

        assert_eq!(
            machine.select_destination(&source).unwrap_err(),
            StateError::SameTable
        );
        assert!(!machine.is_active());
    }

    #[test]
    fn occupied_destination_aborts_to_idle() {
        let mut machine = TransferStateMachine::new();
        machine.initiate(&group_table(1, "T1")).unwrap();

        let busy = occupied_table(2, "T2", vec![1]);
        assert_eq!(
            machine.select_destination(&busy).unwrap_err(),
            StateError::DestinationOccupied
        );
        assert!(!machine.is_active());
    }

    #[tokio::test]
    async fn group_to_group_issues_move_table() {
        let api = MockApi::new();
        let mut machine = TransferStateMachine::new();
        machine.initiate(&group_table(1, "T1")).unwrap();
        machine.select_destination(&table(2, "T2", "free")).unwrap();
        machine.choose_mode(DestinationMode::Group).unwrap();

        let (outcome, notice) = machine.confirm(&api).await.unwrap();
        assert_eq!(outcome, TransferOutcome::Completed);
        assert!(notice.message.contains("T1"));
        assert_eq!(api.calls(), vec!["move_table(1, 2)"]);
        assert!(!machine.is_active());
    }

    #[tokio::test]
    async fn any_individual_seat_issues_move_seat() {
        let api = MockApi::new();
        let mut machine = TransferStateMachine::new();
        machine
            .initiate(&occupied_table(1, "T1", vec![2]))
            .unwrap();
        machine.select_seat(2).unwrap();
        machine.select_destination(&table(5, "T5", "free")).unwrap();
        machine.choose_mode(DestinationMode::Seat(1)).unwrap();

        machine.confirm(&api).await.unwrap();
        assert_eq!(api.calls(), vec!["move_seat(1, 2, 5, 1)"]);
    }

    #[tokio::test]
    async fn group_source_to_individual_seat_issues_move_seat() {
        let api = MockApi::new();
        let mut machine = TransferStateMachine::new();
        machine.initiate(&group_table(1, "T1")).unwrap();
        machine.select_destination(&table(2, "T2", "free")).unwrap();
        machine.choose_mode(DestinationMode::Seat(3)).unwrap();

        machine.confirm(&api).await.unwrap();
        assert_eq!(api.calls(), vec!["move_seat(1, 0, 2, 3)"]);
    }

    #[tokio::test]
    async fn rejected_transfer_returns_to_idle_with_server_message() {
        let api = MockApi::new();
        api.reject_moves("table is locked");
        let mut machine = TransferStateMachine::new();
        machine.initiate(&group_table(1, "T1")).unwrap();
        machine.select_destination(&table(2, "T2", "free")).unwrap();
        machine.choose_mode(DestinationMode::Group).unwrap();

        let (outcome, notice) = machine.confirm(&api).await.unwrap();
        assert_eq!(outcome, TransferOutcome::Rejected);
        assert_eq!(notice.message, "table is locked");
        assert!(!machine.is_active());
    }

    #[test]
    fn cancel_is_safe_from_any_phase() {
        let mut machine = TransferStateMachine::new();
        assert!(!machine.cancel());

        machine.initiate(&group_table(1, "T1")).unwrap();
        assert!(machine.cancel());
        assert!(!machine.is_active());
        assert!(!machine.cancel());
    }

    #[test]
    fn out_of_phase_operations_are_rejected() {
        let mut machine = TransferStateMachine::new();
        assert!(matches!(
            machine.select_seat(1),
            Err(StateError::InvalidTransition { .. })
        ));
        assert!(matches!(
            machine.select_destination(&table(2, "T2", "free")),
            Err(StateError::InvalidTransition { .. })
        ));
        assert!(matches!(
            machine.choose_mode(DestinationMode::Group),
            Err(StateError::InvalidTransition { .. })
        ));
    }
}
