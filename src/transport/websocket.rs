// WebSocket transport
// Every binary message is one PCM frame

use futures_util::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::error::ProtocolError,
    tungstenite::{Error as WsError, Message},
};

use super::{EventSink, Transport, TransportEvent, TransportHandle};
use crate::error::Result;

/// Spawns one reader task per connection on the current tokio runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

struct WsHandle {
    close_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TransportHandle for WsHandle {
    fn close(&mut self) {
        match self.close_tx.take() {
            Some(tx) => {
                // The task may already be gone after a remote close
                if tx.send(()).is_err() {
                    self.task.abort();
                }
            }
            None => self.task.abort(),
        }
    }
}

impl Drop for WsHandle {
    fn drop(&mut self) {
        if self.close_tx.is_some() {
            self.close();
        }
    }
}

impl Transport for WsTransport {
    fn open(&mut self, endpoint: &str, events: EventSink) -> Result<Box<dyn TransportHandle>> {
        let (close_tx, close_rx) = oneshot::channel();
        let task = tokio::spawn(Self::run(endpoint.to_string(), events, close_rx));
        Ok(Box::new(WsHandle { close_tx: Some(close_tx), task }))
    }
}

impl WsTransport {
    async fn run(endpoint: String, events: EventSink, mut close_rx: oneshot::Receiver<()>) {
        log::info!("connecting to {}", endpoint);

        let connect = connect_async(endpoint.as_str());
        let mut ws = tokio::select! {
            res = connect => match res {
                Ok((ws, _)) => ws,
                Err(err) => {
                    log::error!("failed to connect to {}: {}", endpoint, err);
                    events.emit(TransportEvent::Error(err.to_string()));
                    return;
                }
            },
            _ = &mut close_rx => {
                log::debug!("connection to {} abandoned before open", endpoint);
                return;
            }
        };

        if !events.emit(TransportEvent::Open) {
            let _ = ws.close(None).await;
            return;
        }

        loop {
            tokio::select! {
                msg = ws.next() => match msg {
                    Some(Ok(Message::Binary(data))) => {
                        if !events.emit(TransportEvent::Message(data)) {
                            break;
                        }
                    }
                    // Pongs are queued by tungstenite itself
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Text(text))) => {
                        log::debug!("ignoring text message ({} bytes)", text.len());
                    }
                    Some(Ok(Message::Close(close))) => {
                        log::debug!("server closed the connection: {:?}", close);
                        events.emit(TransportEvent::Close);
                        return;
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)))
                    | Some(Err(WsError::ConnectionClosed))
                    | None => {
                        events.emit(TransportEvent::Close);
                        return;
                    }
                    Some(Err(err)) => {
                        log::error!("websocket error: {}", err);
                        events.emit(TransportEvent::Error(err.to_string()));
                        return;
                    }
                },
                _ = &mut close_rx => break,
            }
        }

        // Local close: the player has already torn the session down
        if let Err(err) = ws.close(None).await {
            log::debug!("error while closing websocket: {}", err);
        }
    }
}
