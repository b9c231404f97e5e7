use crate::status_bridge::model::StatusModel;
use log::{error, info};
use std::{
    net::SocketAddr,
    sync::{Arc, PoisonError, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::Filter;

/// Serves the latest harness status as JSON on `GET /status`.
pub struct StatusBridge {
    state: Arc<RwLock<StatusModel>>,
}

impl StatusBridge {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StatusModel::default())),
        }
    }

    pub fn serve(bind: SocketAddr) -> Self {
        let bridge = Self::new();
        let state_for_filter = bridge.state.clone();
        let state_filter = warp::any().map(move || state_for_filter.clone());

        let status_route = warp::path("status")
            .and(warp::get())
            .and(state_filter)
            .map(|state: Arc<RwLock<StatusModel>>| {
                let snapshot = state
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                warp::reply::json(&snapshot)
            });

        thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("status bridge runtime failed: {}", err);
                    return;
                }
            };
            info!("status bridge on http://{}/status", bind);
            runtime.block_on(async move {
                warp::serve(status_route).run(bind).await;
            });
        });

        bridge
    }

    pub fn publish(&self, model: StatusModel) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *guard = model;
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> StatusModel {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for StatusBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tagsimcore::link::RecordingLink;
    use tagsimcore::protocol::TagConfig;
    use tagsimcore::simulation::control_channel;
    use tagsimcore::telemetry::MetricsRecorder;
    use tagsimcore::{CommandHandler, SessionPhase};

    #[test]
    fn bridge_publishes_session_snapshot() {
        let metrics = Arc::new(MetricsRecorder::new());
        let (control, _rx) = control_channel();
        let handler = CommandHandler::new(Arc::new(RecordingLink::new()), control, metrics.clone());
        handler.on_tag_config(TagConfig {
            id: 11,
            ..Default::default()
        });

        let bridge = StatusBridge::new();
        bridge.publish(StatusModel::capture("udp-pulse", &handler, None, &metrics));

        let snapshot = bridge.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::TagsReady);
        assert_eq!(snapshot.tag.id, 11);
        assert!(!snapshot.armed);
        assert!(snapshot.last_pulse.is_none());

        let body = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(body["phase"], json!("TagsReady"));
        assert_eq!(body["metrics"]["acks_sent"], json!(0));
    }
}
