//! Terminal chat client.
//!
//! Usage: `sentinel-client [name]`. Each stdin line is sent as a message;
//! `/reconnect` retries a lost connection and `/quit` exits.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sentinel_client::view::{avatar_initials, format_time};
use sentinel_client::{spawn_session, ClientConfig, SessionUpdate};
use sentinel_net::TcpConnector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,sentinel_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let name = match std::env::args().nth(1).or_else(|| config.user.clone()) {
        Some(name) => name,
        None => {
            eprint!("Name: ");
            lines.next_line().await?.unwrap_or_default()
        }
    };

    info!(addr = %config.backend_addr, "Connecting to backend");
    let (handle, mut updates, task) = spawn_session(TcpConnector::new(config.backend_addr.clone()), &config);
    handle.login(name).await?;

    let printer = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            match update {
                SessionUpdate::MessageAppended(m) => {
                    let local = chrono::Local;
                    println!(
                        "[{}] ({}) {}: {}",
                        format_time(&m.timestamp, &local),
                        avatar_initials(&m.author),
                        m.author,
                        m.text
                    );
                }
                SessionUpdate::WarningRaised(text) => eprintln!("!! {text}"),
                SessionUpdate::RosterReplaced(roster) => {
                    eprintln!("-- {} online: {}", roster.count, roster.users.join(", "));
                }
                SessionUpdate::PhaseChanged(phase) => eprintln!("-- {phase:?}"),
                SessionUpdate::TypingChanged(_) => {}
            }
        }
    });

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/reconnect" => handle.reconnect().await?,
            _ => {
                handle.input(line.clone()).await?;
                handle.send(line).await?;
            }
        }
    }

    handle.shutdown().await?;
    task.await?;
    printer.abort();
    Ok(())
}
