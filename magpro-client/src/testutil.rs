//! Scripted [`Api`] implementation for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use shared::{CartItem, PendingOrder, Product, SeatMap, Table, TableStatus};

use crate::error::{ClientError, TransportError};
use crate::http::{Api, StatusResponse};
use crate::ClientResult;

pub(crate) fn table(id: i64, name: &str, status: &str) -> Table {
    let status = match status {
        "occupied" => TableStatus::Occupied,
        "reserved" => TableStatus::Reserved,
        _ => TableStatus::Free,
    };
    Table {
        id,
        name: name.into(),
        status,
        chairs: 4,
        occupied_seats: vec![],
        total: None,
    }
}

pub(crate) fn occupied_table(id: i64, name: &str, seats: Vec<u32>) -> Table {
    Table {
        id,
        name: name.into(),
        status: TableStatus::Occupied,
        chairs: 6,
        occupied_seats: seats,
        total: Some(10.0),
    }
}

fn down() -> ClientError {
    ClientError::Transport(TransportError::Refused)
}

fn ok_status() -> StatusResponse {
    StatusResponse {
        status: "success".into(),
        message: None,
        token: None,
    }
}

#[derive(Default)]
struct MockState {
    tables: Vec<Table>,
    fail_tables: usize,
    seat_maps: HashMap<i64, SeatMap>,
    fail_seat_maps: usize,
    products: Vec<Product>,
    fail_products: usize,
    cart_items: Vec<CartItem>,
    fail_carts: usize,
    /// Per-submit plan: `true` fails. Empty means success.
    submit_plan: VecDeque<bool>,
    submitted: Vec<PendingOrder>,
    reject_moves: Option<String>,
    fail_logins: usize,
    reject_login: Option<String>,
    fail_reminds: usize,
    calls: Vec<String>,
}

/// Scripted server double. Defaults to a healthy server with empty data;
/// individual endpoints are scripted to fail or reject per test.
#[derive(Default)]
pub(crate) struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tables(&self, tables: Vec<Table>) {
        self.state.lock().unwrap().tables = tables;
    }

    /// Next `n` table fetches fail with a transport error.
    pub fn fail_tables(&self, n: usize) {
        self.state.lock().unwrap().fail_tables = n;
    }

    pub fn set_seat_map(&self, table_id: i64, json: &str) {
        let map: SeatMap = serde_json::from_str(json).unwrap();
        self.state.lock().unwrap().seat_maps.insert(table_id, map);
    }

    pub fn fail_seat_maps(&self, n: usize) {
        self.state.lock().unwrap().fail_seat_maps = n;
    }

    pub fn set_products(&self, products: Vec<Product>) {
        self.state.lock().unwrap().products = products;
    }

    pub fn fail_products(&self, n: usize) {
        self.state.lock().unwrap().fail_products = n;
    }

    pub fn set_cart_items(&self, items: Vec<CartItem>) {
        self.state.lock().unwrap().cart_items = items;
    }

    pub fn fail_carts(&self, n: usize) {
        self.state.lock().unwrap().fail_carts = n;
    }

    /// Next `n` order submissions fail with a transport error.
    pub fn fail_submits(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        state.submit_plan.extend(std::iter::repeat(true).take(n));
    }

    /// Next `n` submissions succeed, then one fails.
    pub fn fail_submits_after_ok(&self, n: usize) {
        let mut state = self.state.lock().unwrap();
        state.submit_plan.extend(std::iter::repeat(false).take(n));
        state.submit_plan.push_back(true);
    }

    pub fn submitted_orders(&self) -> Vec<PendingOrder> {
        self.state.lock().unwrap().submitted.clone()
    }

    /// Make move_table/move_seat answer with a server-side rejection.
    pub fn reject_moves(&self, message: &str) {
        self.state.lock().unwrap().reject_moves = Some(message.into());
    }

    pub fn fail_logins(&self, n: usize) {
        self.state.lock().unwrap().fail_logins = n;
    }

    pub fn reject_login(&self, message: &str) {
        self.state.lock().unwrap().reject_login = Some(message.into());
    }

    pub fn fail_reminds(&self, n: usize) {
        self.state.lock().unwrap().fail_reminds = n;
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.state.lock().unwrap().calls.push(call.into());
    }

    fn take_failure(counter: &mut usize) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl Api for MockApi {
    async fn login(&self, username: &str, _password: &str) -> ClientResult<StatusResponse> {
        self.record(format!("login({username})"));
        let mut state = self.state.lock().unwrap();
        if Self::take_failure(&mut state.fail_logins) {
            return Err(down());
        }
        if let Some(message) = &state.reject_login {
            return Ok(StatusResponse {
                status: "error".into(),
                message: Some(message.clone()),
                token: None,
            });
        }
        Ok(StatusResponse {
            status: "success".into(),
            message: None,
            token: Some("token-123".into()),
        })
    }

    async fn fetch_tables(&self) -> ClientResult<Vec<Table>> {
        self.record("fetch_tables");
        let mut state = self.state.lock().unwrap();
        if Self::take_failure(&mut state.fail_tables) {
            return Err(down());
        }
        Ok(state.tables.clone())
    }

    async fn fetch_table_seats(&self, table_id: i64, _timeout: Duration) -> ClientResult<SeatMap> {
        self.record(format!("fetch_table_seats({table_id})"));
        let mut state = self.state.lock().unwrap();
        if Self::take_failure(&mut state.fail_seat_maps) {
            return Err(down());
        }
        Ok(state.seat_maps.get(&table_id).cloned().unwrap_or_default())
    }

    async fn fetch_products(&self) -> ClientResult<Vec<Product>> {
        self.record("fetch_products");
        let mut state = self.state.lock().unwrap();
        if Self::take_failure(&mut state.fail_products) {
            return Err(down());
        }
        Ok(state.products.clone())
    }

    async fn fetch_cart_details(
        &self,
        table_id: i64,
        seat_number: u32,
    ) -> ClientResult<Vec<CartItem>> {
        self.record(format!("fetch_cart_details({table_id}, {seat_number})"));
        let mut state = self.state.lock().unwrap();
        if Self::take_failure(&mut state.fail_carts) {
            return Err(down());
        }
        Ok(state.cart_items.clone())
    }

    async fn submit_order(&self, order: &PendingOrder) -> ClientResult<StatusResponse> {
        self.record("submit_order");
        let mut state = self.state.lock().unwrap();
        state.submitted.push(order.clone());
        match state.submit_plan.pop_front() {
            Some(true) => Err(down()),
            _ => Ok(ok_status()),
        }
    }

    async fn remind_order(
        &self,
        table_id: i64,
        seat_number: u32,
        _user_name: &str,
    ) -> ClientResult<StatusResponse> {
        self.record(format!("remind_order({table_id}, {seat_number})"));
        let mut state = self.state.lock().unwrap();
        if Self::take_failure(&mut state.fail_reminds) {
            return Err(down());
        }
        Ok(ok_status())
    }

    async fn move_table(&self, source_id: i64, destination_id: i64) -> ClientResult<StatusResponse> {
        self.record(format!("move_table({source_id}, {destination_id})"));
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.reject_moves {
            return Ok(StatusResponse {
                status: "error".into(),
                message: Some(message.clone()),
                token: None,
            });
        }
        Ok(ok_status())
    }

    async fn move_seat(
        &self,
        table_id: i64,
        seat_number: u32,
        destination_table_id: i64,
        destination_seat: u32,
    ) -> ClientResult<StatusResponse> {
        self.record(format!(
            "move_seat({table_id}, {seat_number}, {destination_table_id}, {destination_seat})"
        ));
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.reject_moves {
            return Ok(StatusResponse {
                status: "error".into(),
                message: Some(message.clone()),
                token: None,
            });
        }
        Ok(ok_status())
    }
}
