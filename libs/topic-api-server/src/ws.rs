use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use topic_engine::BatchOutcome;

use super::AppState;

// ═══════════════════════════════════════════════════════════════
//  WebSocket: /ws
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(socket, state))
}

#[derive(Debug, PartialEq, Serialize)]
struct WsBatch {
    r#type: &'static str,
    applied: usize,
    evicted: usize,
    stored: usize,
}

impl From<BatchOutcome> for WsBatch {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            r#type: "batch",
            applied: outcome.applied,
            evicted: outcome.evicted,
            stored: outcome.stored,
        }
    }
}

async fn ws_connection(mut socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::channel::<BatchOutcome>(state.ws_buffer);
    let forward = tokio::spawn(forward_batches(state.engine.subscribe(), tx));
    tracing::debug!("ws client connected");

    loop {
        tokio::select! {
            biased;

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Push-only protocol.
                    Some(Ok(_)) => continue,
                }
            }

            outcome = rx.recv() => {
                let Some(outcome) = outcome else { break };
                let Ok(json) = serde_json::to_string(&WsBatch::from(outcome)) else { continue };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    forward.abort();
    tracing::debug!("ws client disconnected");
}

/// Engine broadcast → per-client queue. A client that falls behind on
/// either side skips notifications instead of stalling the engine.
async fn forward_batches(mut batches: broadcast::Receiver<BatchOutcome>, tx: mpsc::Sender<BatchOutcome>) {
    loop {
        match batches.recv().await {
            Ok(outcome) => match tx.try_send(outcome) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!("ws client queue full, batch notification skipped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "ws client lagging, batch notifications skipped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_frame_shape() {
        let frame = WsBatch::from(BatchOutcome {
            applied: 3,
            evicted: 1,
            stored: 2,
            nodes_created: 5,
        });
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            serde_json::json!({"type": "batch", "applied": 3, "evicted": 1, "stored": 2})
        );
    }

    #[tokio::test]
    async fn forwarder_skips_when_client_queue_is_full() {
        let (btx, brx) = broadcast::channel(8);
        let (tx, mut rx) = mpsc::channel(1);
        let task = tokio::spawn(forward_batches(brx, tx));

        for applied in 1..=3 {
            btx.send(BatchOutcome {
                applied,
                ..Default::default()
            })
            .unwrap();
        }
        drop(btx);
        task.await.unwrap();

        assert_eq!(rx.recv().await.unwrap().applied, 1);
        assert!(rx.recv().await.is_none());
    }
}
