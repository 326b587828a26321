use super::session::ConnectionStatus;

/// The view a terminal session renders into.
///
/// `write` receives terminal bytes (including ANSI sequences) exactly as
/// they should be displayed. The callbacks default to no-ops.
pub trait TerminalHost: Send + 'static {
    /// Append text to the display surface.
    fn write(&mut self, text: &str);

    /// Wipe the display surface.
    fn clear(&mut self);

    /// The connection status changed.
    fn status_changed(&mut self, _status: ConnectionStatus) {}

    /// The server announced a new session.
    fn session_started(&mut self, _session_id: &str) {}

    /// The transport closed.
    fn session_ended(&mut self) {}
}
