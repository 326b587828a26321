//! `studykit term`: interactive sandbox terminal.
//!
//! Puts the local terminal in raw mode and feeds every keystroke into a
//! terminal session; the session decides what is echoed and what is sent.
//! Ctrl+] quits, Ctrl+L clears the screen, Ctrl+R reconnects.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use studykit_client::{spawn_session, SessionConfig, WebSocketConnector};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::terminal::{RawModeGuard, StdoutHost};

/// What a local key event means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Input(String),
    Clear,
    Reconnect,
    Quit,
}

/// Run the interactive terminal until the user quits.
pub async fn run(config: SessionConfig) -> Result<()> {
    match config.endpoint.as_deref() {
        Some(endpoint) => info!(endpoint = %endpoint, "starting terminal"),
        None => warn!("no terminal endpoint configured"),
    }

    let _guard = RawModeGuard::enter().context("failed to enter raw terminal mode")?;

    let session = spawn_session(config, WebSocketConnector::new(), StdoutHost::new());
    let (tx_action, mut rx_action) = mpsc::channel::<KeyAction>(64);

    // crossterm's event reader blocks, so it gets its own thread.
    let input_handle = tokio::task::spawn_blocking(move || loop {
        match event::read() {
            Ok(Event::Key(key)) => {
                if let Some(action) = key_action(&key) {
                    let quit = action == KeyAction::Quit;
                    if tx_action.blocking_send(action).is_err() || quit {
                        break;
                    }
                }
            }
            Ok(Event::Paste(text)) => {
                if tx_action.blocking_send(KeyAction::Input(text)).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("crossterm event error: {e}");
                let _ = tx_action.blocking_send(KeyAction::Quit);
                break;
            }
        }
    });

    while let Some(action) = rx_action.recv().await {
        match action {
            KeyAction::Input(data) => session.input(&data),
            KeyAction::Clear => session.clear(),
            KeyAction::Reconnect => session.reconnect(),
            KeyAction::Quit => break,
        }
    }

    session.stop().await;
    input_handle.abort();
    eprint!("\r\nterminal closed.\r\n");
    Ok(())
}

/// Map a key event to an action. Release and repeat events are ignored.
pub fn key_action(key: &KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char(']') if ctrl => Some(KeyAction::Quit),
        KeyCode::Char('l') if ctrl => Some(KeyAction::Clear),
        KeyCode::Char('r') if ctrl => Some(KeyAction::Reconnect),
        KeyCode::Char(c) if ctrl => {
            // Ctrl+A = 0x01 ... Ctrl+Z = 0x1a
            let lower = c.to_ascii_lowercase();
            if lower.is_ascii_lowercase() {
                let code = (lower as u8) - b'a' + 1;
                Some(KeyAction::Input((code as char).to_string()))
            } else {
                None
            }
        }
        KeyCode::Char(c) => Some(KeyAction::Input(c.to_string())),
        KeyCode::Enter => Some(KeyAction::Input("\r".into())),
        KeyCode::Backspace => Some(KeyAction::Input("\x7f".into())),
        KeyCode::Tab => Some(KeyAction::Input("\t".into())),
        KeyCode::Esc => Some(KeyAction::Input("\x1b".into())),
        _ => None,
    }
}
