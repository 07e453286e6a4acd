//! End-to-end offline order flow over real file-backed stores.
//!
//! Simulates a terminal losing the server mid-shift, restarting, and
//! draining its queued order once the server is back.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use magpro_client::{
    Api, ClientConfig, ClientError, ClientResult, ClientWorker, Command, JsonFileStore,
    PersistentStore, PushSignal, StatusResponse, TransportError, UiEvent,
};
use shared::{CartItem, NoticeLevel, PendingOrder, Product, SeatMap, Table, TableStatus};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Server double whose availability can be flipped mid-test.
struct FlakyServer {
    up: AtomicBool,
    submitted: Mutex<Vec<PendingOrder>>,
}

impl FlakyServer {
    fn new() -> Self {
        Self {
            up: AtomicBool::new(true),
            submitted: Mutex::new(Vec::new()),
        }
    }

    fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    fn check(&self) -> ClientResult<()> {
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::Transport(TransportError::Refused))
        }
    }

    fn ok() -> StatusResponse {
        StatusResponse {
            status: "success".into(),
            message: None,
            token: None,
        }
    }
}

#[async_trait]
impl Api for FlakyServer {
    async fn login(&self, _username: &str, _password: &str) -> ClientResult<StatusResponse> {
        self.check()?;
        Ok(StatusResponse {
            status: "success".into(),
            message: None,
            token: Some("token".into()),
        })
    }

    async fn fetch_tables(&self) -> ClientResult<Vec<Table>> {
        self.check()?;
        Ok(vec![Table {
            id: 1,
            name: "Terrace 1".into(),
            status: TableStatus::Occupied,
            chairs: 4,
            occupied_seats: vec![0],
            total: Some(12.0),
        }])
    }

    async fn fetch_table_seats(&self, _table_id: i64, _timeout: Duration) -> ClientResult<SeatMap> {
        self.check()?;
        Ok(SeatMap::default())
    }

    async fn fetch_products(&self) -> ClientResult<Vec<Product>> {
        self.check()?;
        Ok(vec![Product {
            id: 7,
            name: "Pizza".into(),
            price: Some(12.5),
            image: None,
        }])
    }

    async fn fetch_cart_details(
        &self,
        _table_id: i64,
        _seat_number: u32,
    ) -> ClientResult<Vec<CartItem>> {
        self.check()?;
        Ok(vec![])
    }

    async fn submit_order(&self, order: &PendingOrder) -> ClientResult<StatusResponse> {
        self.check()?;
        self.submitted.lock().unwrap().push(order.clone());
        Ok(Self::ok())
    }

    async fn remind_order(
        &self,
        _table_id: i64,
        _seat_number: u32,
        _user_name: &str,
    ) -> ClientResult<StatusResponse> {
        self.check()?;
        Ok(Self::ok())
    }

    async fn move_table(
        &self,
        _source_id: i64,
        _destination_id: i64,
    ) -> ClientResult<StatusResponse> {
        self.check()?;
        Ok(Self::ok())
    }

    async fn move_seat(
        &self,
        _table_id: i64,
        _seat_number: u32,
        _destination_table_id: i64,
        _destination_seat: u32,
    ) -> ClientResult<StatusResponse> {
        self.check()?;
        Ok(Self::ok())
    }
}

struct Terminal {
    commands: mpsc::Sender<Command>,
    events: mpsc::Receiver<UiEvent>,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl Terminal {
    fn start(server: Arc<FlakyServer>, cache_path: &Path, queue_path: &Path) -> Self {
        let cache = JsonFileStore::open(cache_path).unwrap();
        let queue = JsonFileStore::open(queue_path).unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (_push_tx, push_rx) = mpsc::channel::<PushSignal>(8);
        let (event_tx, event_rx) = mpsc::channel(128);
        let shutdown = CancellationToken::new();

        let worker = ClientWorker::new(
            server,
            ClientConfig::new("127.0.0.1"),
            cache,
            queue,
            event_tx,
        );
        let task = tokio::spawn(worker.run(cmd_rx, push_rx, shutdown.clone()));
        Self {
            commands: cmd_tx,
            events: event_rx,
            shutdown,
            task,
        }
    }

    async fn send(&self, command: Command) {
        self.commands.send(command).await.unwrap();
    }

    async fn wait_notice(&mut self, needle: &str) -> NoticeLevel {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match self.events.recv().await.expect("event channel closed") {
                    UiEvent::Notice(n) if n.message.contains(needle) => return n.level,
                    _ => {}
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("no notice containing {needle:?}"))
    }

    async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.task.await;
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn queued_order_survives_a_restart_and_drains_on_recovery() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("cache.json");
    let queue_path = dir.path().join("queue.json");
    let server = Arc::new(FlakyServer::new());

    // First shift: login, build an order, lose the server on submit.
    {
        let mut terminal = Terminal::start(server.clone(), &cache_path, &queue_path);
        terminal
            .send(Command::Login {
                username: "ana".into(),
                password: "pw".into(),
            })
            .await;
        terminal.wait_notice("Welcome").await;

        // Server drops before the order screen opens; the cart is built
        // locally and the submission lands in the offline queue.
        server.set_up(false);
        terminal
            .send(Command::OpenSeat {
                table_id: 1,
                seat: 0,
            })
            .await;
        terminal
            .send(Command::AddItem {
                product: Product {
                    id: 7,
                    name: "Pizza".into(),
                    price: Some(12.5),
                    image: None,
                },
                qty: "2".into(),
                note: "no olives".into(),
            })
            .await;

        terminal.send(Command::SubmitCart).await;
        let level = terminal.wait_notice("saved on this device").await;
        assert_eq!(level, NoticeLevel::Warning);
        terminal.stop().await;
    }

    // The order is on disk, not in anyone's memory.
    {
        let store = JsonFileStore::open(&queue_path).unwrap();
        assert_eq!(store.keys().len(), 1);
        assert!(store.keys()[0].starts_with("order_"));
    }

    // Second shift, server back: the first refresh drains the queue.
    server.set_up(true);
    {
        let mut terminal = Terminal::start(server.clone(), &cache_path, &queue_path);
        terminal
            .send(Command::Login {
                username: "ana".into(),
                password: "pw".into(),
            })
            .await;
        terminal.wait_notice("All offline orders synchronized.").await;
        terminal.stop().await;
    }

    let submitted = server.submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].table_id, 1);
    assert_eq!(submitted[0].items[0].qty, 2.0);
    assert_eq!(submitted[0].items[0].note, "no olives");
    assert_eq!(submitted[0].user_name, "ana");

    let store = JsonFileStore::open(&queue_path).unwrap();
    assert!(store.keys().is_empty());
}
