#![forbid(unsafe_code)]

pub mod app;
pub mod picker;

use std::io;
use std::io::IsTerminal as _;

use crate::error::TaskboardError;

#[must_use]
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

pub fn init_terminal()
-> Result<ratatui::Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>, TaskboardError> {
    use crossterm::terminal::enable_raw_mode;
    use ratatui::backend::CrosstermBackend;

    enable_raw_mode()
        .map_err(|e| TaskboardError::Other(format!("failed to enable raw mode: {e}")))?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)
        .map_err(|e| TaskboardError::Other(format!("failed to enter alt screen: {e}")))?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = ratatui::Terminal::new(backend)
        .map_err(|e| TaskboardError::Other(format!("failed to create terminal: {e}")))?;
    Ok(terminal)
}

// Restores the terminal even on early returns and panics inside the UI loop.
pub(crate) struct TerminalGuard {
    terminal: Option<ratatui::Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>>,
}

impl TerminalGuard {
    pub(crate) fn new(
        terminal: ratatui::Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>,
    ) -> Self {
        Self {
            terminal: Some(terminal),
        }
    }

    pub(crate) fn terminal_mut(
        &mut self,
    ) -> Option<&mut ratatui::Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>> {
        self.terminal.as_mut()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Some(terminal) = self.terminal.take() {
            let _ = restore_terminal(terminal);
        }
    }
}

pub fn restore_terminal(
    mut terminal: ratatui::Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>,
) -> Result<(), TaskboardError> {
    use crossterm::terminal::disable_raw_mode;

    disable_raw_mode()
        .map_err(|e| TaskboardError::Other(format!("failed to disable raw mode: {e}")))?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )
    .map_err(|e| TaskboardError::Other(format!("failed to leave alt screen: {e}")))?;
    terminal
        .show_cursor()
        .map_err(|e| TaskboardError::Other(format!("failed to show cursor: {e}")))?;
    Ok(())
}
