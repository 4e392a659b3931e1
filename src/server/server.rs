use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::SocialEvent;
use crate::domain_port::*;
use crate::infra_mysql::*;
use crate::infra_sqlite::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::Settings;
use sqlx::{MySqlPool, SqlitePool};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EVENT_CAPACITY: usize = 1024;
const CONNECTION_BACKLOG: usize = 256;

enum DatabasePool {
    Sqlite(SqlitePool),
    MySql(MySqlPool),
}

impl DatabasePool {
    async fn close(&self) {
        match self {
            DatabasePool::Sqlite(pool) => pool.close().await,
            DatabasePool::MySql(pool) => pool.close().await,
        }
    }
}

pub struct SocialServer {
    pub social_service: Arc<dyn SocialService>,
    connections: mpsc::Sender<ConnectionEvent>,
    events: Arc<BroadcastEventSink>,
    listener_handle: Mutex<Option<JoinHandle<()>>>,
    journal_handle: Mutex<Option<JoinHandle<usize>>>,
    cancel: CancellationToken,
    pool: DatabasePool,
}

impl SocialServer {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let social_config = settings.social_config()?;
        let database = &settings.database;

        let (store, pool): (Arc<dyn SocialStore>, DatabasePool) = match database.backend.as_str() {
            "sqlite" => {
                let store =
                    SqliteSocialStore::connect(&database.sqlite_path, database.max_connections)
                        .await?;
                let pool = DatabasePool::Sqlite(store.pool().clone());
                (Arc::new(store), pool)
            }
            "mysql" => {
                let store =
                    MySqlSocialStore::connect(&database.mysql_dsn, database.max_connections)
                        .await?;
                let pool = DatabasePool::MySql(store.pool().clone());
                (Arc::new(store), pool)
            }
            other => return Err(anyhow::anyhow!("Unknown database backend: {}", other)),
        };
        store.initialize().await?;

        // region runtime infra
        let cancel = CancellationToken::new();

        let scheduler: Arc<dyn Scheduler> =
            Arc::new(TokioScheduler::new(Handle::current(), cancel.child_token()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let events = Arc::new(BroadcastEventSink::new(EVENT_CAPACITY));
        let journal = EventJournal::new(events.subscribe(), cancel.clone());

        let social_service: Arc<dyn SocialService> = Arc::new(RealSocialService::new(
            store,
            scheduler,
            events.clone(),
            clock,
            social_config,
        ));

        let (connections, connection_events) = mpsc::channel(CONNECTION_BACKLOG);
        let listener =
            ConnectionListener::new(social_service.clone(), connection_events, cancel.clone());

        let listener_handle = tokio::spawn(listener.run());
        let journal_handle = tokio::spawn(journal.run());

        // endregion

        info!("server started with {} backend", database.backend);

        Ok(Self {
            social_service,
            connections,
            events,
            listener_handle: Mutex::new(Some(listener_handle)),
            journal_handle: Mutex::new(Some(journal_handle)),
            cancel,
            pool,
        })
    }

    /// Where the session layer reports connects and disconnects.
    pub fn connections(&self) -> mpsc::Sender<ConnectionEvent> {
        self.connections.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SocialEvent> {
        self.events.subscribe()
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let listener = self.listener_handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = listener {
            let r = handle.await;
            info!("connection listener dropped: {:?}", r);
        }
        let journal = self.journal_handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = journal {
            match handle.await {
                Ok(seen) => info!("event journal dropped after {} event(s)", seen),
                Err(e) => error!("event journal failed: {:?}", e),
            }
        }

        self.pool.close().await;
    }
}
