//! Terminal setup, teardown and the event source.

use anyhow::Result;
use crossterm::{
    event::{self, KeyEventKind},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, time::Duration};

/// Smallest terminal the portal screens are laid out for.
const MIN_WIDTH: u16 = 100;
const MIN_HEIGHT: u16 = 35;

/// How long to wait for input before ticking.
const TICK: Duration = Duration::from_millis(33);

#[derive(Debug, Clone)]
pub enum Event {
    Input(event::Event),
    /// Nothing happened within one frame.
    Tick,
}

pub type Frame<'a> = ratatui::Frame<'a>;

pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl Tui {
    pub fn new() -> Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        Ok(Self { terminal })
    }

    pub fn init(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        io::stdout().execute(EnterAlternateScreen)?;
        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        grow_to(MIN_WIDTH, MIN_HEIGHT)?;
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        self.terminal.show_cursor()?;
        restore()
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }

    /// Waits one tick for input.
    ///
    /// Key releases are reported as ticks so every key acts once.
    pub fn next_event(&self) -> Result<Event> {
        if !event::poll(TICK)? {
            return Ok(Event::Tick);
        }
        match event::read()? {
            event::Event::Key(key) if key.kind != KeyEventKind::Press => Ok(Event::Tick),
            other => Ok(Event::Input(other)),
        }
    }
}

/// Leaves raw mode and the alternate screen.
pub fn restore() -> Result<()> {
    terminal::disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Asks the terminal to grow when it is smaller than `width` x `height`.
fn grow_to(width: u16, height: u16) -> Result<()> {
    let (columns, rows) = terminal::size()?;
    if columns < width || rows < height {
        io::stdout().execute(terminal::SetSize(columns.max(width), rows.max(height)))?;
    }
    Ok(())
}
