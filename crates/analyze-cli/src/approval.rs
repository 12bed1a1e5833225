//! The interactive "continue past partial failure?" prompt.

use std::io::IsTerminal;

use inquire::Confirm;
use pipeline_common::{CancellationToken, PipelineError};

use crate::error::{CliError, Result};

/// Ask the user to approve continuing past `failed` failures out of `total`.
/// `y`/`yes` (case-insensitive) continues; anything else aborts.
///
/// If `assume_yes` is set, the prompt is skipped entirely. Otherwise, stdin
/// must be an interactive terminal or this fails with
/// [`CliError::NonInteractiveStdin`] rather than hanging on a read from a
/// pipe. The read itself races the governing cancellation token so a
/// cancelled run does not block on an unanswered prompt.
pub async fn confirm_continue(
    token: &CancellationToken,
    failed: usize,
    total: usize,
    assume_yes: bool,
) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveStdin);
    }

    let message = format!("failed to analyze {failed} out of {total} files. Continue?");
    let prompt = tokio::task::spawn_blocking(move || Confirm::new(&message).with_default(false).prompt());

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(CliError::Pipeline(PipelineError::Cancelled)),
        joined = prompt => match joined {
            Ok(Ok(answer)) => Ok(answer),
            _ => Err(CliError::NonInteractiveStdin),
        },
    }
}
