use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

use sentinel_agent::{AgentConfig, Document, PageAgent, PageSignal, RelayLink, NOTICE_CLASS};
use sentinel_net::{write_frame, FrameReader};
use sentinel_shared::protocol::{AlertPush, ChatPayload, PresenterFrame, SurfaceFrame};

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_page_agent_against_relay_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let doc = Arc::new(Mutex::new(Document::new()));
    {
        let mut d = doc.lock().unwrap();
        let body = d.body();
        d.append_element(body, "div", &[("data-author-id", "alice")], "already here")
            .unwrap();
    }

    let agent = PageAgent::new(doc.clone(), &AgentConfig::default());
    let surface = agent.surface();
    let (signal_tx, signal_rx) = mpsc::channel(16);

    let link = RelayLink::connect(&addr).await.unwrap();
    let (socket, _) = listener.accept().await.unwrap();
    let (read_half, mut write_half) = socket.into_split();
    let mut frames = FrameReader::new(read_half);

    let runner = tokio::spawn(agent.run(signal_rx, link));

    let attach: SurfaceFrame = timeout(WAIT, frames.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(
        attach,
        SurfaceFrame::Attach {
            surface,
            focused: true
        }
    );

    let initial: SurfaceFrame = timeout(WAIT, frames.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(
        initial,
        SurfaceFrame::Extracted(ChatPayload::new("alice", "already here"))
    );

    // The observer fires three times; only one extraction comes out.
    {
        let mut d = doc.lock().unwrap();
        let body = d.body();
        let row = d
            .append_element(body, "li", &[("data-author-id", "bob")], "")
            .unwrap();
        d.append_element(row, "span", &[], "new message").unwrap();
    }
    for _ in 0..3 {
        signal_tx.send(PageSignal::Mutated).await.unwrap();
    }
    signal_tx.send(PageSignal::Focused).await.unwrap();

    let extracted: SurfaceFrame = timeout(WAIT, frames.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(
        extracted,
        SurfaceFrame::Extracted(ChatPayload::new("bob", "new message"))
    );
    let focus: SurfaceFrame = timeout(WAIT, frames.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(focus, SurfaceFrame::Focus);

    // Relay pushes an alert; it lands in the document as a notice.
    write_frame(
        &mut write_half,
        &PresenterFrame::Alert(AlertPush {
            text: "⚠️ WARNING 1/3".into(),
        }),
    )
    .await
    .unwrap();

    timeout(WAIT, async {
        loop {
            let shown = {
                let d = doc.lock().unwrap();
                let body = d.body();
                d.descendants(body)
                    .into_iter()
                    .any(|n| d.has_class(n, NOTICE_CLASS))
            };
            if shown {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    signal_tx.send(PageSignal::Unload).await.unwrap();
    let detach: SurfaceFrame = timeout(WAIT, frames.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(detach, SurfaceFrame::Detach);

    timeout(WAIT, runner).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_page_agent_stops_when_relay_hangs_up() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let doc = Arc::new(Mutex::new(Document::new()));
    let agent = PageAgent::new(doc, &AgentConfig::default());
    let (_signal_tx, signal_rx) = mpsc::channel(4);

    let link = RelayLink::connect(&addr).await.unwrap();
    let (socket, _) = listener.accept().await.unwrap();
    let runner = tokio::spawn(agent.run(signal_rx, link));

    let (read_half, _write_half) = socket.into_split();
    let mut frames = FrameReader::new(read_half);
    let _attach: SurfaceFrame = timeout(WAIT, frames.next()).await.unwrap().unwrap().unwrap();
    drop(frames);
    drop(_write_half);

    assert!(timeout(WAIT, runner).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn test_oversized_message_is_skipped_and_agent_keeps_running() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = AgentConfig {
        relay_addr: listener.local_addr().unwrap().to_string(),
        ..AgentConfig::default()
    };

    let doc = Arc::new(Mutex::new(Document::new()));
    let agent = PageAgent::new(doc.clone(), &config);
    let (signal_tx, signal_rx) = mpsc::channel(8);
    let runner = tokio::spawn(async move { agent.connect_and_run(signal_rx, &config).await });

    let (socket, _) = listener.accept().await.unwrap();
    let (read_half, _write_half) = socket.into_split();
    let mut frames = FrameReader::new(read_half);
    let attach: SurfaceFrame = timeout(WAIT, frames.next()).await.unwrap().unwrap().unwrap();
    assert!(matches!(attach, SurfaceFrame::Attach { .. }));

    {
        let mut d = doc.lock().unwrap();
        let body = d.body();
        let huge = "x".repeat(70_000);
        d.append_element(body, "div", &[("data-author-id", "spammer")], &huge)
            .unwrap();
        d.append_element(body, "div", &[("data-author-id", "alice")], "still here")
            .unwrap();
    }
    signal_tx.send(PageSignal::Mutated).await.unwrap();

    let next: SurfaceFrame = timeout(WAIT, frames.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(
        next,
        SurfaceFrame::Extracted(ChatPayload::new("alice", "still here"))
    );

    {
        let mut d = doc.lock().unwrap();
        let body = d.body();
        d.append_element(body, "div", &[("data-author-id", "bob")], "later")
            .unwrap();
    }
    signal_tx.send(PageSignal::Mutated).await.unwrap();
    let later: SurfaceFrame = timeout(WAIT, frames.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(later, SurfaceFrame::Extracted(ChatPayload::new("bob", "later")));

    signal_tx.send(PageSignal::Unload).await.unwrap();
    timeout(WAIT, runner).await.unwrap().unwrap().unwrap();
}
