//! Client worker
//!
//! The single logical foreground of the client. All state (snapshot, cart,
//! queue, transfer machine, session) is owned by the worker task and only
//! mutated between awaits, so no component ever observes a half-applied
//! update. The presentation layer talks to it over channels: commands in,
//! [`UiEvent`]s out.

use std::sync::Arc;
use std::time::Duration;

use shared::util::now_millis;
use shared::{CartItem, Notice, PendingOrder, Product, PushEvent, SeatMap, Table, GROUP_SEAT};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cart::{CartAggregator, CartTotals};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::Api;
use crate::push::PushSignal;
use crate::queue::{OfflineQueueManager, PendingSummary, SubmitOutcome};
use crate::session::SessionContext;
use crate::store::PersistentStore;
use crate::sync::{FetchOutcome, RefreshDiff, RefreshOutcome, RefreshTrigger, SyncEngine};
use crate::transfer::{
    DestinationMode, TransferIntent, TransferOutcome, TransferState, TransferStateMachine,
};
use crate::validation;

/// Periodic refresh interval while the tables view is active, in seconds
pub const REFRESH_INTERVAL_SECS: u64 = 5;

/// Which screen the presentation layer is showing. The worker only needs
/// this to gate the periodic refresh and cart commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Tables,
    Order,
}

/// Commands from the presentation layer.
#[derive(Debug)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    /// Operator-initiated refresh of the floor plan.
    RefreshTables,
    SetView(View),
    /// Short tap on a table: destination pick while a transfer is active,
    /// otherwise open it.
    TapTable(i64),
    /// Open the order screen for one seat of a table.
    OpenSeat { table_id: i64, seat: u32 },
    AddItem { product: Product, qty: String, note: String },
    IncrementLine(usize),
    DecrementLine(usize),
    EditNote { line: usize, note: String },
    RemoveLine(usize),
    SubmitCart,
    RemindOrder,
    /// Ask for the current offline queue contents.
    ListPending,
    /// Long press on a table starts a transfer from it.
    BeginTransfer(i64),
    SelectTransferSeat(u32),
    ChooseTransferMode(DestinationMode),
    ConfirmTransfer,
    CancelTransfer,
    Shutdown,
}

/// Transfer dialogs the presentation layer should show next.
#[derive(Debug, Clone)]
pub enum TransferPrompt {
    SelectSeat { table: Table, seats: Vec<u32> },
    ChooseMode { destination: Table },
    Confirm { intent: TransferIntent },
}

/// Events to the presentation layer.
#[derive(Debug)]
pub enum UiEvent {
    Notice(Notice),
    Tables { tables: Vec<Table>, diff: RefreshDiff },
    Products(Vec<Product>),
    Cart { items: Vec<CartItem>, totals: CartTotals },
    /// Seat picker data for a tapped table.
    SeatChoice { table: Table, map: SeatMap, cached: bool },
    PendingOrders(Vec<PendingSummary>),
    PendingCount(usize),
    Connection { online: bool },
    Transfer(TransferPrompt),
    SessionStarted { user_name: String },
    SessionEnded,
}

/// The client worker. Construct it, then hand it to a task via [`run`].
///
/// [`run`]: ClientWorker::run
pub struct ClientWorker<S: PersistentStore> {
    api: Arc<dyn Api>,
    config: ClientConfig,
    session: SessionContext,
    sync: SyncEngine<S>,
    queue: OfflineQueueManager<S>,
    transfer: TransferStateMachine,
    cart: CartAggregator,
    view: View,
    current_table: Option<i64>,
    current_seat: u32,
    events: mpsc::Sender<UiEvent>,
}

impl<S: PersistentStore> ClientWorker<S> {
    pub fn new(
        api: Arc<dyn Api>,
        config: ClientConfig,
        cache_store: S,
        queue_store: S,
        events: mpsc::Sender<UiEvent>,
    ) -> Self {
        Self {
            api,
            config,
            session: SessionContext::new(),
            sync: SyncEngine::new(cache_store),
            queue: OfflineQueueManager::new(queue_store),
            transfer: TransferStateMachine::new(),
            cart: CartAggregator::new(),
            view: View::Login,
            current_table: None,
            current_seat: GROUP_SEAT,
            events,
        }
    }

    /// Drive the worker until shutdown. Commands, push signals and the
    /// periodic refresh tick are multiplexed on one loop; handlers run to
    /// completion before the next input is taken.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut push: mpsc::Receiver<PushSignal>,
        shutdown: CancellationToken,
    ) {
        let mut tick = tokio::time::interval(Duration::from_secs(REFRESH_INTERVAL_SECS));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tick.tick().await;

        let mut push_open = true;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            break;
                        }
                    }
                    None => break,
                },
                signal = push.recv(), if push_open => match signal {
                    Some(signal) => self.handle_push(signal).await,
                    None => push_open = false,
                },
                _ = tick.tick() => self.periodic_tick().await,
            }
        }
        tracing::info!("client worker stopped");
    }

    async fn handle_command(&mut self, command: Command) -> bool {
        tracing::debug!(?command, "handling command");
        match command {
            Command::Shutdown => return false,
            Command::Login { username, password } => self.login(&username, &password).await,
            Command::Logout => self.logout().await,
            Command::RefreshTables => self.do_refresh(RefreshTrigger::Manual).await,
            Command::SetView(view) => self.view = view,
            Command::TapTable(table_id) => self.tap_table(table_id).await,
            Command::OpenSeat { table_id, seat } => self.open_seat(table_id, seat).await,
            Command::AddItem { product, qty, note } => {
                match self.cart.add_item(&product, &qty, &note) {
                    Ok(()) => self.emit_cart().await,
                    Err(err) => self.notify(err.to_notice()).await,
                }
            }
            Command::IncrementLine(line) => {
                self.cart.increment(line);
                self.emit_cart().await;
            }
            Command::DecrementLine(line) => {
                let _ = self.cart.decrement(line);
                self.emit_cart().await;
            }
            Command::EditNote { line, note } => {
                self.cart.edit_note(line, &note);
                self.emit_cart().await;
            }
            Command::RemoveLine(line) => {
                self.cart.remove(line);
                self.emit_cart().await;
            }
            Command::SubmitCart => self.submit_cart().await,
            Command::RemindOrder => self.remind().await,
            Command::ListPending => {
                let pending = self.queue.list(self.sync.cache());
                self.emit(UiEvent::PendingOrders(pending)).await;
            }
            Command::BeginTransfer(table_id) => self.begin_transfer(table_id).await,
            Command::SelectTransferSeat(seat) => {
                match self.transfer.select_seat(seat).map(|_| ()) {
                    Ok(()) => {
                        self.notify(Notice::info("Now tap the destination table.")).await;
                    }
                    Err(err) => self.notify(ClientError::State(err).to_notice()).await,
                }
            }
            Command::ChooseTransferMode(mode) => {
                match self.transfer.choose_mode(mode).map(|s| s.clone()) {
                    Ok(TransferState::AwaitingConfirmation { intent }) => {
                        self.emit(UiEvent::Transfer(TransferPrompt::Confirm { intent }))
                            .await;
                    }
                    Ok(_) => {}
                    Err(err) => self.notify(ClientError::State(err).to_notice()).await,
                }
            }
            Command::ConfirmTransfer => self.confirm_transfer().await,
            Command::CancelTransfer => {
                if self.transfer.cancel() {
                    self.notify(Notice::info("Transfer cancelled.")).await;
                }
            }
        }
        true
    }

    async fn handle_push(&mut self, signal: PushSignal) {
        match signal {
            PushSignal::Connected => {
                self.emit(UiEvent::Connection { online: true }).await;
                self.notify(Notice::success("Connected to the server.")).await;
                if self.session.is_active() {
                    self.do_refresh(RefreshTrigger::Push).await;
                }
            }
            PushSignal::Disconnected => {
                self.emit(UiEvent::Connection { online: false }).await;
                self.notify(Notice::error("Connection to the server lost.")).await;
            }
            PushSignal::Event(PushEvent::TablesUpdate) => {
                if self.session.is_active() {
                    self.do_refresh(RefreshTrigger::Push).await;
                }
            }
            PushSignal::Event(PushEvent::Unknown) => {}
        }
    }

    async fn periodic_tick(&mut self) {
        if self.session.is_active() && self.view == View::Tables && !self.sync.refresh_in_flight()
        {
            self.do_refresh(RefreshTrigger::Periodic).await;
        }
    }

    async fn login(&mut self, username: &str, password: &str) {
        let username = match validation::validate_username(username) {
            Ok(name) => name.to_string(),
            Err(err) => {
                self.notify(err.to_notice()).await;
                return;
            }
        };

        match self.api.login(&username, password).await {
            Ok(resp) if resp.is_success() => {
                let token = resp.token.clone();
                self.api.set_token(token.clone());
                self.session.begin(username.clone(), token);
                self.view = View::Tables;
                self.emit(UiEvent::SessionStarted {
                    user_name: username.clone(),
                })
                .await;
                self.notify(Notice::success(format!("Welcome, {username}."))).await;
                // Initial load, silent on failure: the cached fallback
                // already covers the offline case.
                self.do_refresh(RefreshTrigger::Periodic).await;
            }
            Ok(resp) => {
                self.notify(Notice::error(resp.message_or("Login failed."))).await;
            }
            Err(err) => self.notify(err.to_notice()).await,
        }
    }

    async fn logout(&mut self) {
        self.session.end();
        self.api.set_token(None);
        self.view = View::Login;
        self.cart.clear();
        self.transfer.cancel();
        self.current_table = None;
        self.current_seat = GROUP_SEAT;
        self.emit(UiEvent::SessionEnded).await;
    }

    /// Run a refresh and everything that hangs off a successful one:
    /// caching, queue drain, and any push trigger absorbed mid-flight.
    async fn do_refresh(&mut self, trigger: RefreshTrigger) {
        let mut trigger = trigger;
        loop {
            let (outcome, notices) = self.sync.refresh(self.api.as_ref(), trigger).await;
            for notice in notices {
                self.notify(notice).await;
            }

            match outcome {
                RefreshOutcome::Applied(diff) => {
                    let came_online = self.session.set_offline(false);
                    if came_online {
                        self.emit(UiEvent::Connection { online: true }).await;
                    }
                    self.emit(UiEvent::Tables {
                        tables: self.sync.tables(),
                        diff,
                    })
                    .await;
                    // Re-cache seat maps for occupied tables after every
                    // successful sync, so an outage never shows stale seats
                    // even when the table rows themselves did not change.
                    self.sync
                        .cache_seat_maps(self.api.as_ref(), self.config.seat_cache_timeout())
                        .await;
                    self.drain_queue().await;
                }
                RefreshOutcome::CachedFallback(diff) => {
                    if self.session.set_offline(true) {
                        self.emit(UiEvent::Connection { online: false }).await;
                    }
                    self.emit(UiEvent::Tables {
                        tables: self.sync.tables(),
                        diff,
                    })
                    .await;
                }
                RefreshOutcome::Failed => {
                    if self.session.set_offline(true) {
                        self.emit(UiEvent::Connection { online: false }).await;
                    }
                }
                RefreshOutcome::Coalesced => {}
            }

            if self.sync.take_pending_push() {
                trigger = RefreshTrigger::Push;
                continue;
            }
            break;
        }
    }

    async fn drain_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        match self.queue.drain(self.api.as_ref()).await {
            Ok(report) if report.synced > 0 => {
                let message = if report.remaining == 0 {
                    "All offline orders synchronized.".to_string()
                } else {
                    format!(
                        "Synchronized {} offline orders, {} remaining.",
                        report.synced, report.remaining
                    )
                };
                self.notify(Notice::success(message)).await;
                self.emit(UiEvent::PendingCount(self.queue.len())).await;
            }
            Ok(_) => {}
            Err(err) => self.notify(err.to_notice()).await,
        }
    }

    async fn tap_table(&mut self, table_id: i64) {
        let Some(table) = self.sync.table(table_id).cloned() else {
            self.notify(Notice::warning("Unknown table.")).await;
            return;
        };

        if self.transfer.is_active() {
            match self.transfer.select_destination(&table).map(|_| ()) {
                Ok(()) => {
                    self.emit(UiEvent::Transfer(TransferPrompt::ChooseMode {
                        destination: table,
                    }))
                    .await;
                }
                Err(err) => {
                    // The machine already aborted back to idle.
                    self.notify(ClientError::State(err).to_notice()).await;
                    self.notify(Notice::info("Transfer cancelled.")).await;
                }
            }
            return;
        }

        if table.is_group() {
            self.open_seat(table.id, GROUP_SEAT).await;
            return;
        }

        if self.session.is_offline() {
            match self.sync.cached_seat_map(table.id) {
                Some(map) => {
                    self.emit(UiEvent::SeatChoice {
                        table,
                        map,
                        cached: true,
                    })
                    .await;
                }
                None => {
                    self.notify(Notice::error("Seat data not available offline.")).await;
                }
            }
            return;
        }

        let timeout = self.config.seat_map_timeout();
        match self.sync.seat_map(self.api.as_ref(), table.id, timeout).await {
            FetchOutcome::Fresh(map) => {
                self.emit(UiEvent::SeatChoice {
                    table,
                    map,
                    cached: false,
                })
                .await;
            }
            FetchOutcome::Cached(map) => {
                self.notify(Notice::warning("Offline mode: showing saved seat data."))
                    .await;
                self.emit(UiEvent::SeatChoice {
                    table,
                    map,
                    cached: true,
                })
                .await;
            }
            FetchOutcome::Unavailable => {
                self.notify(Notice::error("Seat data not available offline.")).await;
            }
        }
    }

    async fn open_seat(&mut self, table_id: i64, seat: u32) {
        self.current_table = Some(table_id);
        self.current_seat = seat;
        self.view = View::Order;
        self.cart.clear();

        if self.session.is_offline() {
            match self.sync.cached_products() {
                Some(products) => self.emit(UiEvent::Products(products)).await,
                None => {
                    self.notify(Notice::error("Product catalog not available offline."))
                        .await;
                }
            }
            self.emit_cart().await;
            return;
        }

        match self.api.fetch_cart_details(table_id, seat).await {
            Ok(items) => self.cart.load(items),
            Err(err) => {
                tracing::warn!(table_id, seat, error = %err, "cart details unavailable, starting empty");
            }
        }

        match self.sync.products(self.api.as_ref()).await {
            FetchOutcome::Fresh(products) | FetchOutcome::Cached(products) => {
                self.emit(UiEvent::Products(products)).await;
            }
            FetchOutcome::Unavailable => {
                self.notify(Notice::error("Product catalog not available offline."))
                    .await;
            }
        }
        self.emit_cart().await;
    }

    async fn submit_cart(&mut self) {
        if self.cart.is_empty() {
            self.notify(Notice::warning("The cart is empty.")).await;
            return;
        }
        let Some(table_id) = self.current_table else {
            self.notify(Notice::warning("No table selected.")).await;
            return;
        };

        let order = PendingOrder {
            table_id,
            seat_number: self.current_seat,
            items: self.cart.take(),
            user_name: self.session.user_name().to_string(),
            timestamp: now_millis(),
        };

        let trigger = match self.queue.submit(self.api.as_ref(), order).await {
            Ok(SubmitOutcome::Sent) => {
                self.notify(Notice::success("Order sent to the kitchen.")).await;
                RefreshTrigger::Manual
            }
            Ok(SubmitOutcome::Queued(_)) => {
                self.notify(Notice::warning("Offline: order saved on this device."))
                    .await;
                self.emit(UiEvent::PendingCount(self.queue.len())).await;
                RefreshTrigger::Periodic
            }
            Err(err) => {
                // Submission failed AND the order could not be persisted.
                self.notify(err.to_notice()).await;
                return;
            }
        };

        self.view = View::Tables;
        self.emit_cart().await;
        self.do_refresh(trigger).await;
    }

    async fn remind(&mut self) {
        if self.session.is_offline() {
            self.notify(Notice::error("Reminders are unavailable offline.")).await;
            return;
        }
        let Some(table_id) = self.current_table else {
            self.notify(Notice::warning("No table selected.")).await;
            return;
        };

        match self
            .api
            .remind_order(table_id, self.current_seat, self.session.user_name())
            .await
        {
            Ok(resp) if resp.is_success() => {
                self.notify(Notice::success("Reminder sent to the kitchen.")).await;
            }
            Ok(resp) => {
                self.notify(Notice::error(resp.message_or("Reminder refused."))).await;
            }
            Err(err) => self.notify(err.to_notice()).await,
        }
    }

    async fn begin_transfer(&mut self, table_id: i64) {
        let Some(table) = self.sync.table(table_id).cloned() else {
            self.notify(Notice::warning("Unknown table.")).await;
            return;
        };

        match self.transfer.initiate(&table).map(|s| s.clone()) {
            Ok(TransferState::SelectingSeat { seats, .. }) => {
                self.emit(UiEvent::Transfer(TransferPrompt::SelectSeat {
                    table,
                    seats,
                }))
                .await;
            }
            Ok(TransferState::AwaitingDestination { .. }) => {
                self.notify(Notice::info(format!(
                    "Moving {}: tap the destination table.",
                    table.name
                )))
                .await;
            }
            Ok(_) => {}
            Err(err) => self.notify(ClientError::State(err).to_notice()).await,
        }
    }

    async fn confirm_transfer(&mut self) {
        match self.transfer.confirm(self.api.as_ref()).await {
            Ok((outcome, notice)) => {
                self.notify(notice).await;
                if outcome == TransferOutcome::Completed {
                    self.do_refresh(RefreshTrigger::Manual).await;
                }
            }
            Err(err) => self.notify(ClientError::State(err).to_notice()).await,
        }
    }

    async fn emit_cart(&self) {
        self.emit(UiEvent::Cart {
            items: self.cart.items().to_vec(),
            totals: self.cart.totals(),
        })
        .await;
    }

    async fn notify(&self, notice: Notice) {
        self.emit(UiEvent::Notice(notice)).await;
    }

    async fn emit(&self, event: UiEvent) {
        if self.events.send(event).await.is_err() {
            tracing::warn!("event receiver dropped");
        }
    }
}
