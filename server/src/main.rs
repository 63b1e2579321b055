use clap::Parser;
use log::{error, info};
use server::network::{BoxError, Server, ServerConfig};
use tokio::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,
    /// Simulation tick period in milliseconds
    #[arg(short, long, default_value_t = 50)]
    tick_ms: u64,
}

impl Args {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            addr: format!("{}:{}", self.host, self.port),
            tick_interval: Duration::from_millis(self.tick_ms.max(1)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.config();

    let server = Server::bind(&config).await?;
    info!("Tower defense server running on {}", server.local_addr()?);

    let server_handle = tokio::spawn(server.run());

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Err(e)) => error!("Server stopped with error: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::try_parse_from(["server"]).unwrap();
        assert_eq!(args.tick_ms, 50);
        assert_eq!(args.host, "0.0.0.0");
    }

    #[test]
    fn test_config_from_args() {
        let args = Args::try_parse_from(["server", "-H", "127.0.0.1", "-p", "4000", "-t", "20"]).unwrap();
        let config = args.config();
        assert_eq!(config.addr, "127.0.0.1:4000");
        assert_eq!(config.tick_interval, Duration::from_millis(20));
    }
}
