//! Live cache dashboard.
//!
//! Draws the stats panel, the instant-navigation badge and a key hint
//! line. Input is polled without blocking for long so the caller can
//! redraw whenever a new snapshot arrives.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};

use navcache::stats::StatsSnapshot;

use super::widgets::{BadgeHit, CacheStatsWidget};

/// User input the dashboard reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    Quit,
    /// Take a fresh snapshot now.
    Refresh,
    /// Read the next preloaded key from the cache.
    Navigate,
    /// Forget preload records.
    Reset,
}

/// Terminal dashboard. Restores the terminal when dropped.
pub struct Dashboard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Dashboard {
    /// Switch the terminal to raw mode on the alternate screen.
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }

    pub fn draw(&mut self, snapshot: &StatsSnapshot, badge: Option<&BadgeHit>) -> io::Result<()> {
        self.terminal.draw(|frame| render(frame, snapshot, badge))?;
        Ok(())
    }

    /// Wait up to `timeout` for a key press.
    pub fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<DashboardEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(None);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }

        Ok(match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(DashboardEvent::Quit),
            KeyCode::Char('r') => Some(DashboardEvent::Refresh),
            KeyCode::Char('n') => Some(DashboardEvent::Navigate),
            KeyCode::Char('x') => Some(DashboardEvent::Reset),
            _ => None,
        })
    }

    /// Restore terminal to normal state.
    pub fn restore(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

fn render(frame: &mut Frame, snapshot: &StatsSnapshot, badge: Option<&BadgeHit>) {
    let [header, body, badge_area, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(9),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" navcache v{}", navcache::VERSION),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(
                format!("  updated {}", snapshot.taken_at.format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ),
        ])),
        header,
    );
    frame.render_widget(CacheStatsWidget::new(snapshot), body);
    if let Some(hit) = badge {
        frame.render_widget(hit, badge_area);
    }
    frame.render_widget(
        Paragraph::new(Line::styled(
            " q quit  r refresh  n open next preloaded key  x reset preloads",
            Style::default().fg(Color::DarkGray),
        )),
        footer,
    );
}
