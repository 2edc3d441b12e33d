//! `ctl` command handler - talks to the running session over the socket

use super::args::CtlAction;
use super::presenter::Presenter;
use super::socket::{SessionSocketClient, SocketPath, STATUS_COMMAND};

/// Handle ctl subcommand
pub async fn handle_ctl_command(action: CtlAction, presenter: &Presenter) -> Result<(), String> {
    let client = SessionSocketClient::new(SocketPath::new());

    if !client.is_session_running() {
        return Err("No session running. Start one with: voice-recorder".to_string());
    }

    let cmd = action
        .intent()
        .map(|intent| intent.command())
        .unwrap_or(STATUS_COMMAND);

    let response = client
        .send_command(cmd)
        .await
        .map_err(|e| format!("Failed to communicate with session: {}", e))?;

    report(action, response.trim(), presenter)
}

fn report(action: CtlAction, response: &str, presenter: &Presenter) -> Result<(), String> {
    if let Some(message) = response.strip_prefix("error:") {
        return Err(message.trim().to_string());
    }
    if action == CtlAction::Status {
        presenter.output(response);
    } else if let Some(reason) = response.strip_prefix("ignored:") {
        presenter.warn(&format!("Ignored: {}", reason.trim()));
    } else if let Some(applied) = response.strip_prefix("ok:") {
        presenter.success(applied.trim());
    } else {
        return Err(format!("Unexpected response: {}", response));
    }
    Ok(())
}
