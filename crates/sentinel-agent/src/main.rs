//! Terminal stand-in for a monitored chat page.
//!
//! Each stdin line `author: text` is appended to the page as a message
//! element and run through the page agent. `/focus`, `/reconnect` and
//! `/quit` map to the matching page signals. Alerts the relay pushes back
//! are printed while they are on screen.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sentinel_agent::{AgentConfig, Document, PageAgent, PageSignal, NOTICE_CLASS};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sentinel_agent=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AgentConfig::from_env();
    info!(relay = %config.relay_addr, "Starting page agent");

    let doc = Arc::new(Mutex::new(Document::new()));
    let agent = PageAgent::new(doc.clone(), &config);
    let (signal_tx, signal_rx) = mpsc::channel(64);
    let mut runner = tokio::spawn(async move { agent.connect_and_run(signal_rx, &config).await });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown: Vec<String> = Vec::new();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            result = &mut runner => {
                result??;
                warn!("Page agent stopped");
                return Ok(());
            }
        };

        let signal = match line.as_deref().map(str::trim) {
            None | Some("/quit") => PageSignal::Unload,
            Some("/focus") => PageSignal::Focused,
            Some("/reconnect") => PageSignal::Reconnect,
            Some("") => continue,
            Some(entry) => {
                let (author, text) = entry.split_once(':').unwrap_or(("", entry));
                if let Ok(mut d) = doc.lock() {
                    let body = d.body();
                    d.append_element(body, "div", &[("data-author-id", author.trim())], text.trim())?;
                }
                PageSignal::Mutated
            }
        };

        let unload = signal == PageSignal::Unload;
        if signal_tx.send(signal).await.is_err() || unload {
            break;
        }

        let notices = visible_notices(&doc);
        if notices != shown {
            for notice in &notices {
                println!("!! {notice}");
            }
            shown = notices;
        }
    }

    runner.await??;
    Ok(())
}

fn visible_notices(doc: &Mutex<Document>) -> Vec<String> {
    let d = match doc.lock() {
        Ok(d) => d,
        Err(_) => return Vec::new(),
    };
    d.descendants(d.body())
        .into_iter()
        .filter(|n| d.has_class(*n, NOTICE_CLASS))
        .map(|n| d.text_content(n))
        .collect()
}
