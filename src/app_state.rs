use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::oneshot;

use crate::{
    config::AppConfig, history::UserHistoryStore, snapshot::SnapshotStore, youtube::VideoFetcher,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub fetcher: Arc<VideoFetcher>,
    pub history: Arc<UserHistoryStore>,
    pub snapshots: Arc<Mutex<SnapshotStore>>,
    pub status: Arc<Mutex<Status>>,
    // Un único dibujo en curso a la vez.
    pub render_gate: Arc<tokio::sync::Mutex<()>>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Status {
    pub is_busy: bool,
    pub message: String,
    pub progress: f32, // Valor entre 0.0 y 1.0
}

impl AppState {
    pub fn new(
        config: AppConfig,
        history: UserHistoryStore,
        shutdown_sender: Option<oneshot::Sender<()>>,
    ) -> Result<Self> {
        let fetcher = VideoFetcher::from_config(&config)?;
        Ok(Self {
            config,
            fetcher: Arc::new(fetcher),
            history: Arc::new(history),
            snapshots: Arc::new(Mutex::new(SnapshotStore::default())),
            status: Arc::new(Mutex::new(Status {
                is_busy: false,
                message: "Servidor listo.".to_string(),
                progress: 0.0,
            })),
            render_gate: Arc::new(tokio::sync::Mutex::new(())),
            shutdown_sender: Arc::new(Mutex::new(shutdown_sender)),
        })
    }

    pub fn set_status(&self, is_busy: bool, message: impl Into<String>, progress: f32) {
        let mut status = self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        status.is_busy = is_busy;
        status.message = message.into();
        status.progress = progress;
    }

    pub fn status(&self) -> Status {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
