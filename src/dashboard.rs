use crate::report;
use crate::store::Offer;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

/// Next selection when moving down, wrapping to the top.
fn next_index(selected: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match selected {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    })
}

/// Previous selection when moving up, wrapping to the bottom.
fn previous_index(selected: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match selected {
        Some(0) | None => len - 1,
        Some(i) => i - 1,
    })
}

pub fn run_dashboard(offers: &[Offer]) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();
    table_state.select(next_index(None, offers.len()));

    let result = event_loop(&mut terminal, offers, &mut table_state);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    offers: &[Offer],
    table_state: &mut TableState,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui(f, offers, table_state))?;

        if event::poll(std::time::Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Down => table_state.select(next_index(table_state.selected(), offers.len())),
                    KeyCode::Up => {
                        table_state.select(previous_index(table_state.selected(), offers.len()))
                    }
                    KeyCode::Char('o') | KeyCode::Enter => {
                        if let Some(offer) = table_state.selected().and_then(|i| offers.get(i)) {
                            report::open_in_browser(&offer.url());
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

fn ui(f: &mut Frame, offers: &[Offer], table_state: &mut TableState) {
    let rects = Layout::default()
        .constraints([Constraint::Percentage(100)].as_ref())
        .margin(1)
        .split(f.size());

    let selected_style = Style::default().add_modifier(Modifier::REVERSED).fg(Color::Yellow);
    let normal_style = Style::default().fg(Color::White);
    let header_cells = ["Company", "Title", "Department", "Location", "Last seen"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells)
        .style(normal_style)
        .height(1)
        .bottom_margin(1);

    let rows = offers.iter().map(|offer| {
        let cells = vec![
            Cell::from(offer.company.clone()),
            Cell::from(offer.title.clone()),
            Cell::from(offer.department.clone().unwrap_or_default()),
            Cell::from(offer.location.clone().unwrap_or_default()),
            Cell::from(offer.last_seen.clone()),
        ];
        Row::new(cells).style(normal_style)
    });

    let col_widths = vec![
        Constraint::Min(16), // Company
        Constraint::Min(30), // Title
        Constraint::Min(16), // Department
        Constraint::Min(14), // Location
        Constraint::Min(10), // Last seen
    ];

    let title = format!("Job offers ({}) - ↑/↓ move, o open, q quit", offers.len());
    let table = Table::new(rows, col_widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(selected_style)
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, rects[0], table_state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_wraps_both_ways() {
        assert_eq!(next_index(None, 3), Some(0));
        assert_eq!(next_index(Some(1), 3), Some(2));
        assert_eq!(next_index(Some(2), 3), Some(0));
        assert_eq!(previous_index(Some(0), 3), Some(2));
        assert_eq!(previous_index(Some(2), 3), Some(1));
    }

    #[test]
    fn empty_table_has_no_selection() {
        assert_eq!(next_index(Some(0), 0), None);
        assert_eq!(previous_index(None, 0), None);
    }
}
