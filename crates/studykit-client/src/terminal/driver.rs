//! Async driver for a [`TerminalSession`].
//!
//! One tokio task owns the session and its transport. Host input and
//! transport events are both funnelled into that task, so each stream is
//! applied strictly in arrival order.

use studykit_core::codec::encode_client_frame;
use studykit_core::messages::ClientFrame;
use studykit_core::transport::{Connector, DuplexChannel, TransportEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use super::host::TerminalHost;
use super::session::{ConnectionStatus, TerminalSession};
use super::SessionConfig;

/// Requests from the handle to the session task.
#[derive(Debug)]
enum SessionCommand {
    Input(String),
    Clear,
    Reconnect,
    Stop,
}

/// Handle to a running terminal session.
///
/// Dropping the handle aborts the session task and closes the transport.
pub struct SessionHandle<H: TerminalHost> {
    commands: mpsc::UnboundedSender<SessionCommand>,
    status: watch::Receiver<ConnectionStatus>,
    task: Option<JoinHandle<H>>,
}

impl<H: TerminalHost> SessionHandle<H> {
    /// Feed raw input (one key event or a pasted chunk).
    pub fn input(&self, data: &str) {
        self.send(SessionCommand::Input(data.to_string()));
    }

    /// Feed a single keystroke.
    pub fn key(&self, key: char) {
        let mut buf = [0u8; 4];
        self.input(key.encode_utf8(&mut buf));
    }

    /// Wipe the display and redraw the prompt.
    pub fn clear(&self) {
        self.send(SessionCommand::Clear);
    }

    /// Close the current transport (if any) and connect again after the
    /// configured delay.
    pub fn reconnect(&self) {
        self.send(SessionCommand::Reconnect);
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// A receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Stop the session: close the transport and end the task. No host
    /// callbacks fire after this returns. Gives the host back.
    pub async fn stop(mut self) -> Option<H> {
        self.send(SessionCommand::Stop);
        let task = self.task.take()?;
        match task.await {
            Ok(host) => Some(host),
            Err(e) => {
                warn!("terminal session task failed: {e}");
                None
            }
        }
    }

    fn send(&self, command: SessionCommand) {
        if self.commands.send(command).is_err() {
            debug!("terminal session task already ended");
        }
    }
}

impl<H: TerminalHost> Drop for SessionHandle<H> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Start a terminal session on the current tokio runtime.
///
/// Connects immediately. If the config has no endpoint the session goes
/// straight to `Unavailable` and waits for host commands.
pub fn spawn_session<C, H>(config: SessionConfig, connector: C, host: H) -> SessionHandle<H>
where
    C: Connector,
    H: TerminalHost,
{
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);

    let task = tokio::spawn(run_session(
        TerminalSession::new(config, host),
        connector,
        cmd_rx,
        status_tx,
    ));

    SessionHandle {
        commands: cmd_tx,
        status: status_rx,
        task: Some(task),
    }
}

async fn run_session<C, H>(
    mut session: TerminalSession<H>,
    connector: C,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    status: watch::Sender<ConnectionStatus>,
) -> H
where
    C: Connector,
    H: TerminalHost,
{
    let mut link = connect(&mut session, &connector);
    status.send_replace(session.status());

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(SessionCommand::Input(data)) => {
                        for frame in session.handle_input(&data) {
                            send_frame(link.as_ref(), &frame).await;
                        }
                    }
                    Some(SessionCommand::Clear) => session.clear(),
                    Some(SessionCommand::Reconnect) => {
                        if link.take().is_some() {
                            session.apply_event(TransportEvent::Closed);
                            status.send_replace(session.status());
                        }
                        time::sleep(session.config().reconnect_delay).await;
                        link = connect(&mut session, &connector);
                    }
                    Some(SessionCommand::Stop) | None => break,
                }
            }

            event = next_event(&mut link) => {
                // A transport that vanishes without `Closed` is treated as closed.
                let event = event.unwrap_or(TransportEvent::Closed);
                let closed = event == TransportEvent::Closed;
                session.apply_event(event);
                if closed {
                    link = None;
                }
            }
        }

        status.send_replace(session.status());
    }

    // Dropping the outgoing sender closes the transport.
    drop(link);
    debug!("terminal session task ended");
    session.into_host()
}

fn connect<C: Connector, H: TerminalHost>(
    session: &mut TerminalSession<H>,
    connector: &C,
) -> Option<DuplexChannel> {
    let endpoint = session.begin_connect()?;
    Some(connector.open(&endpoint))
}

async fn next_event(link: &mut Option<DuplexChannel>) -> Option<TransportEvent> {
    match link {
        Some(link) => link.events.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_frame(link: Option<&DuplexChannel>, frame: &ClientFrame) {
    let Some(link) = link else {
        warn!("no transport for outgoing frame");
        return;
    };

    match encode_client_frame(frame) {
        Ok(text) => {
            if link.outgoing.send(text).await.is_err() {
                warn!("terminal transport closed, frame dropped");
            }
        }
        Err(e) => warn!("failed to encode terminal frame: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::terminal::session::tests::RecordingHost;

    /// Connector that hands out in-memory duplex channels and keeps the
    /// remote ends for the test to drive.
    #[derive(Clone, Default)]
    struct MockConnector {
        remotes: Arc<Mutex<Vec<Remote>>>,
    }

    struct Remote {
        endpoint: String,
        events: mpsc::Sender<TransportEvent>,
        outgoing: mpsc::Receiver<String>,
    }

    impl Connector for MockConnector {
        fn open(&self, endpoint: &str) -> DuplexChannel {
            let (chan, events, outgoing) = DuplexChannel::pair(16);
            self.remotes.lock().unwrap().push(Remote {
                endpoint: endpoint.to_string(),
                events,
                outgoing,
            });
            chan
        }
    }

    impl MockConnector {
        fn opened(&self) -> usize {
            self.remotes.lock().unwrap().len()
        }

        fn take(&self, index: usize) -> Remote {
            let mut remotes = self.remotes.lock().unwrap();
            let placeholder = {
                let (_, events, outgoing) = DuplexChannel::pair(1);
                Remote {
                    endpoint: String::new(),
                    events,
                    outgoing,
                }
            };
            std::mem::replace(&mut remotes[index], placeholder)
        }
    }

    async fn wait_for(status: &mut watch::Receiver<ConnectionStatus>, want: ConnectionStatus) {
        time::timeout(Duration::from_secs(5), status.wait_for(|s| *s == want))
            .await
            .expect("status timeout")
            .expect("session task ended");
    }

    #[tokio::test]
    async fn command_round_trip() {
        let connector = MockConnector::default();
        let handle = spawn_session(
            SessionConfig::with_endpoint("ws://sandbox.test/term"),
            connector.clone(),
            RecordingHost::default(),
        );
        let mut status = handle.watch_status();

        while connector.opened() == 0 {
            tokio::task::yield_now().await;
        }
        let mut remote = connector.take(0);
        assert_eq!(remote.endpoint, "ws://sandbox.test/term");

        remote.events.send(TransportEvent::Open).await.unwrap();
        wait_for(&mut status, ConnectionStatus::Connected).await;

        remote
            .events
            .send(TransportEvent::Message(
                r#"{"type":"session","sessionId":"abc","sandboxType":"docker"}"#.into(),
            ))
            .await
            .unwrap();

        handle.input("ls -l");
        handle.key('\r');
        let sent = remote.outgoing.recv().await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(v, serde_json::json!({"type": "command", "data": "ls -l"}));

        handle.key('\x03');
        let sent = remote.outgoing.recv().await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(v, serde_json::json!({"type": "signal", "data": "SIGINT"}));

        remote
            .events
            .send(TransportEvent::Message(r#"{"type":"output","data":"total 0\r\n"}"#.into()))
            .await
            .unwrap();
        remote.events.send(TransportEvent::Closed).await.unwrap();
        wait_for(&mut status, ConnectionStatus::Disconnected).await;

        let host = handle.stop().await.unwrap();
        assert_eq!(host.started, vec!["abc".to_string()]);
        assert_eq!(host.ended, 1);
        assert!(host.display.contains("ls -l\r\n"));
        assert!(host.display.contains("total 0\r\n"));
    }

    #[tokio::test]
    async fn no_endpoint_never_connects() {
        let connector = MockConnector::default();
        let handle = spawn_session(
            SessionConfig::default(),
            connector.clone(),
            RecordingHost::default(),
        );
        let mut status = handle.watch_status();
        wait_for(&mut status, ConnectionStatus::Unavailable).await;
        assert_eq!(connector.opened(), 0);
        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_closes_then_reopens_after_delay() {
        let connector = MockConnector::default();
        let handle = spawn_session(
            SessionConfig::with_endpoint("ws://sandbox.test/term"),
            connector.clone(),
            RecordingHost::default(),
        );
        let mut status = handle.watch_status();

        while connector.opened() == 0 {
            tokio::task::yield_now().await;
        }
        let first = connector.take(0);
        first.events.send(TransportEvent::Open).await.unwrap();
        wait_for(&mut status, ConnectionStatus::Connected).await;

        handle.reconnect();
        wait_for(&mut status, ConnectionStatus::Disconnected).await;
        assert_eq!(connector.opened(), 1);

        // The old transport sees its outgoing side dropped.
        let mut first = first;
        assert_eq!(first.outgoing.recv().await, None);

        time::sleep(Duration::from_millis(150)).await;
        wait_for(&mut status, ConnectionStatus::Connecting).await;
        assert_eq!(connector.opened(), 2);

        let second = connector.take(1);
        second.events.send(TransportEvent::Open).await.unwrap();
        second
            .events
            .send(TransportEvent::Message(r#"{"type":"unavailable","message":"restricted"}"#.into()))
            .await
            .unwrap();
        wait_for(&mut status, ConnectionStatus::Connected).await;

        let host = handle.stop().await.unwrap();
        assert_eq!(host.ended, 1);
        assert!(host.display.contains("restricted"));
    }

    #[tokio::test]
    async fn stop_closes_transport_without_callbacks() {
        let connector = MockConnector::default();
        let handle = spawn_session(
            SessionConfig::with_endpoint("ws://sandbox.test/term"),
            connector.clone(),
            RecordingHost::default(),
        );
        let mut status = handle.watch_status();
        while connector.opened() == 0 {
            tokio::task::yield_now().await;
        }
        let mut remote = connector.take(0);
        remote.events.send(TransportEvent::Open).await.unwrap();
        wait_for(&mut status, ConnectionStatus::Connected).await;

        let host = handle.stop().await.unwrap();
        assert_eq!(host.ended, 0);
        assert_eq!(remote.outgoing.recv().await, None);
    }
}
