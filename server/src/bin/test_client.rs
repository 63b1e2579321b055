use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use server::network::BoxError;
use shared::{ClientMessage, ServerMessage};
use tokio::time::{timeout, Duration, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Scripted client: joins, readies up, builds a tower, starts a wave and
/// prints the snapshots it receives.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server WebSocket URL
    #[arg(short, long, default_value = "ws://127.0.0.1:3000")]
    url: String,
    /// Player name to join as
    #[arg(short, long, default_value = "bot")]
    name: String,
    /// How long to watch the game, in seconds
    #[arg(short, long, default_value_t = 10)]
    seconds: u64,
}

fn encode(message: &ClientMessage) -> Result<Message, BoxError> {
    Ok(Message::Text(serde_json::to_string(message)?))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    println!("Connecting to {}", args.url);
    let (ws, _) = connect_async(args.url.as_str()).await?;
    let (mut write, mut read) = ws.split();

    let script = [
        ClientMessage::Join {
            player_name: args.name.clone(),
            game_id: None,
        },
        ClientMessage::Ready,
        ClientMessage::PlaceTower {
            x: 300.0,
            y: 200.0,
            tower_type: "basic".to_string(),
        },
        ClientMessage::StartWave,
    ];
    for message in &script {
        println!("Sending {:?}", message);
        write.send(encode(message)?).await?;
    }

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let mut last_seen = None;

    while let Ok(Some(frame)) = timeout(deadline.saturating_duration_since(Instant::now()), read.next()).await {
        let Message::Text(text) = frame? else {
            continue;
        };
        match serde_json::from_str::<ServerMessage>(&text) {
            Ok(ServerMessage::Joined { player_id, game_state }) => {
                println!("Joined as {} ({} players)", player_id, game_state.players.len());
            }
            Ok(ServerMessage::GameStarted) => println!("Game started"),
            Ok(ServerMessage::GameState { state }) => {
                if last_seen != Some((state.wave, state.enemies.len(), state.gold)) {
                    println!(
                        "wave {} | enemies {} | towers {} | gold {} | health {}",
                        state.wave,
                        state.enemies.len(),
                        state.towers.len(),
                        state.gold,
                        state.health
                    );
                    last_seen = Some((state.wave, state.enemies.len(), state.gold));
                }
            }
            Ok(other) => println!("Received {:?}", other),
            Err(e) => println!("Failed to decode server message: {}", e),
        }
    }

    write.send(Message::Close(None)).await?;
    println!("Test client finished");
    Ok(())
}
