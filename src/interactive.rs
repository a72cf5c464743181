//! Prompt-driven input collection for `-i` / `--interactive` mode.

use dialoguer::{theme::ColorfulTheme, Confirm, Input};

use crate::error::{Error, Result};

/// The three inputs a run needs, collected from the terminal.
#[derive(Debug, Clone)]
pub struct InteractiveInputs {
    pub repo_url: String,
    pub question: String,
    pub force_reindex: bool,
}

pub fn collect() -> Result<InteractiveInputs> {
    let theme = ColorfulTheme::default();

    let repo_url: String = Input::with_theme(&theme)
        .with_prompt("Repository URL (e.g. https://github.com/owner/repo)")
        .interact_text()
        .map_err(into_io)?;

    let question: String = Input::with_theme(&theme)
        .with_prompt("Your question")
        .interact_text()
        .map_err(into_io)?;

    let force_reindex = Confirm::with_theme(&theme)
        .with_prompt("Force a reindex even if the cache looks fresh?")
        .default(false)
        .interact()
        .map_err(into_io)?;

    Ok(InteractiveInputs {
        repo_url,
        question,
        force_reindex,
    })
}

fn into_io(e: dialoguer::Error) -> Error {
    match e {
        dialoguer::Error::IO(io) => Error::Io(io),
    }
}
