//! Server network layer: WebSocket transport and the single event loop that
//! serializes every router call and scheduler tick

use crate::client_manager::{ConnectionId, Outbound};
use crate::router::Router;
use crate::scheduler::{TickScheduler, TICK_INTERVAL};
use crate::utils::get_timestamp;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on, `host:port`
    pub addr: String,
    /// Simulation period
    pub tick_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_string(),
            tick_interval: TICK_INTERVAL,
        }
    }
}

/// Messages sent from connection tasks to the event loop
#[derive(Debug)]
pub enum NetworkEvent {
    Connected {
        id: ConnectionId,
        addr: SocketAddr,
        sender: Outbound,
    },
    Text {
        id: ConnectionId,
        text: String,
    },
    Binary {
        id: ConnectionId,
        data: Vec<u8>,
    },
    Disconnected {
        id: ConnectionId,
    },
}

/// Main server coordinating the transport and the simulation
pub struct Server {
    listener: Arc<TcpListener>,
    router: Router,
    tick_interval: Duration,

    event_tx: mpsc::UnboundedSender<NetworkEvent>,
    event_rx: mpsc::UnboundedReceiver<NetworkEvent>,
}

impl Server {
    pub async fn bind(config: &ServerConfig) -> Result<Self, BoxError> {
        let listener = Arc::new(TcpListener::bind(&config.addr).await?);
        info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            router: Router::new(),
            tick_interval: config.tick_interval,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns task that accepts TCP connections and hands each one to its
    /// own connection task
    fn spawn_acceptor(&self) {
        let listener = Arc::clone(&self.listener);
        let events = self.event_tx.clone();

        tokio::spawn(async move {
            let mut next_id: ConnectionId = 1;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let id = next_id;
                        next_id = next_id.wrapping_add(1);
                        tokio::spawn(handle_connection(id, stream, addr, events.clone()));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn handle_event(&mut self, event: NetworkEvent) {
        let now = get_timestamp();
        match event {
            NetworkEvent::Connected { id, addr, sender } => self.router.connect(id, addr, sender),
            NetworkEvent::Text { id, text } => self.router.handle_frame(id, &text, now),
            NetworkEvent::Binary { id, data } => self.router.handle_binary(id, &data, now),
            NetworkEvent::Disconnected { id } => self.router.disconnect(id),
        }
    }

    /// Main server loop. Connection events and ticks are handled strictly
    /// one after another, so sessions never see concurrent mutation.
    pub async fn run(mut self) -> Result<(), BoxError> {
        self.spawn_acceptor();
        let mut scheduler = TickScheduler::new(self.tick_interval);

        info!("Server started successfully");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                now = scheduler.next() => {
                    let ticked = self.router.tick(now);
                    scheduler.record(ticked);
                },
            }
        }

        Ok(())
    }
}

/// Performs the WebSocket handshake, then pumps frames in both directions
/// until either side goes away.
async fn handle_connection(
    id: ConnectionId,
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::UnboundedSender<NetworkEvent>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let (sender, mut outbound) = mpsc::unbounded_channel::<String>();

    if events
        .send(NetworkEvent::Connected { id, addr, sender })
        .is_err()
    {
        return;
    }

    // Ends when the router drops the sender or the peer stops accepting.
    tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if let Err(e) = write.send(Message::Text(text)).await {
                debug!("Send to connection {} failed: {}", id, e);
                break;
            }
        }
        let _ = write.close().await;
    });

    while let Some(frame) = read.next().await {
        let event = match frame {
            Ok(Message::Text(text)) => NetworkEvent::Text { id, text },
            Ok(Message::Binary(data)) => NetworkEvent::Binary { id, data },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("Connection {} read error: {}", id, e);
                break;
            }
        };

        if events.send(event).is_err() {
            break;
        }
    }

    let _ = events.send(NetworkEvent::Disconnected { id });
}
