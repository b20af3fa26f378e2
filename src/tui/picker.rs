#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::error::TaskboardError;
use crate::tui::{self, TerminalGuard};

#[derive(Debug, Clone)]
pub struct PickerItem {
    pub title: String,
    pub preview: String,
}

pub fn pick_one(title: &str, items: &[PickerItem]) -> Result<usize, TaskboardError> {
    let res = run_picker(title, items, false)?;
    res.into_iter()
        .next()
        .ok_or_else(|| TaskboardError::Other("no selection".to_owned()))
}

pub fn pick_many(title: &str, items: &[PickerItem]) -> Result<Vec<usize>, TaskboardError> {
    run_picker(title, items, true)
}

fn run_picker(title: &str, items: &[PickerItem], multi: bool) -> Result<Vec<usize>, TaskboardError> {
    if items.is_empty() {
        return Err(TaskboardError::Other(
            "no items available for selection".to_owned(),
        ));
    }
    if !tui::is_tty() {
        return Err(TaskboardError::Other(
            "interactive selection requires a TTY".to_owned(),
        ));
    }

    let terminal = tui::init_terminal()?;
    let mut guard = TerminalGuard::new(terminal);
    let mut picker = PickerState::new(title, items, multi);

    loop {
        let terminal = guard
            .terminal_mut()
            .ok_or_else(|| TaskboardError::Other("terminal unavailable".to_owned()))?;
        terminal
            .draw(|f| picker.draw(f))
            .map_err(|e| TaskboardError::Other(format!("failed to draw picker: {e}")))?;

        if event::poll(Duration::from_millis(50))
            .map_err(|e| TaskboardError::Other(format!("event poll failed: {e}")))?
            && let Event::Key(key) =
                event::read().map_err(|e| TaskboardError::Other(format!("event read failed: {e}")))?
            && let Some(selection) = picker.handle_key(key)?
        {
            return Ok(selection);
        }
    }
}

struct PickerState<'a> {
    title: &'a str,
    items: &'a [PickerItem],
    lower_titles: Vec<String>,
    query: String,
    filtered: Vec<usize>,
    selected: usize,
    list_state: ListState,
    marked: BTreeSet<usize>,
    multi: bool,
}

impl<'a> PickerState<'a> {
    fn new(title: &'a str, items: &'a [PickerItem], multi: bool) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            title,
            items,
            lower_titles: items.iter().map(|i| i.title.to_lowercase()).collect(),
            query: String::new(),
            filtered: (0..items.len()).collect(),
            selected: 0,
            list_state,
            marked: BTreeSet::new(),
            multi,
        }
    }

    // Returns Some(selection) when accepted.
    fn handle_key(&mut self, key: KeyEvent) -> Result<Option<Vec<usize>>, TaskboardError> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
            return Err(TaskboardError::Cancelled);
        }

        match key.code {
            KeyCode::Esc => return Err(TaskboardError::Cancelled),
            KeyCode::Enter => {
                let selection = if self.multi && !self.marked.is_empty() {
                    self.marked.iter().copied().collect()
                } else {
                    vec![self.filtered.get(self.selected).copied().unwrap_or(0)]
                };
                return Ok(Some(selection));
            }
            KeyCode::Tab => {
                if self.multi
                    && let Some(&idx) = self.filtered.get(self.selected)
                    && !self.marked.insert(idx)
                {
                    self.marked.remove(&idx);
                }
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::Backspace => {
                self.query.pop();
                self.recompute_filter();
            }
            KeyCode::Char(c) => {
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT)
                {
                    self.query.push(c);
                    self.recompute_filter();
                }
            }
            _ => {}
        }

        Ok(None)
    }

    fn move_selection(&mut self, delta: i64) {
        if self.filtered.is_empty() {
            return;
        }
        let cur = i64::try_from(self.selected).unwrap_or(0);
        let max = i64::try_from(self.filtered.len().saturating_sub(1)).unwrap_or(0);
        let next = usize::try_from((cur + delta).clamp(0, max)).unwrap_or(0);
        self.selected = next;
        self.list_state.select(Some(next));
    }

    fn recompute_filter(&mut self) {
        let q = self.query.to_lowercase();
        self.filtered = if q.is_empty() {
            (0..self.lower_titles.len()).collect()
        } else {
            self.lower_titles
                .iter()
                .enumerate()
                .filter_map(|(i, t)| t.contains(&q).then_some(i))
                .collect()
        };

        if self.filtered.is_empty() {
            self.filtered = (0..self.lower_titles.len()).collect();
        }
        if self.selected >= self.filtered.len() {
            self.selected = 0;
        }
        self.list_state.select(Some(self.selected));
    }

    fn draw(&mut self, f: &mut Frame<'_>) {
        let area = f.area();
        let outer = Block::default().title(self.title).borders(Borders::ALL);
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(2)])
            .split(inner);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[0]);

        self.draw_list(f, body[0]);
        self.draw_preview(f, body[1]);
        self.draw_query_bar(f, chunks[1]);
    }

    fn draw_list(&mut self, f: &mut Frame<'_>, area: Rect) {
        let list_items: Vec<ListItem> = self
            .filtered
            .iter()
            .map(|&idx| {
                let mut line = self.items[idx].title.clone();
                if self.multi {
                    let marker = if self.marked.contains(&idx) {
                        "[x] "
                    } else {
                        "[ ] "
                    };
                    line = format!("{marker}{line}");
                }
                ListItem::new(Line::from(line))
            })
            .collect();

        let list = List::new(list_items)
            .block(Block::default().borders(Borders::ALL).title("Tasks"))
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">");
        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn draw_preview(&self, f: &mut Frame<'_>, area: Rect) {
        let preview_idx = self.filtered.get(self.selected).copied().unwrap_or(0);
        let preview = Paragraph::new(self.items[preview_idx].preview.clone())
            .block(Block::default().borders(Borders::ALL).title("Details"))
            .wrap(Wrap { trim: false });
        f.render_widget(preview, area);
    }

    fn draw_query_bar(&self, f: &mut Frame<'_>, area: Rect) {
        let help = if self.multi {
            "Type to filter • ↑/↓ move • Tab mark • Enter accept • Esc cancel"
        } else {
            "Type to filter • ↑/↓ move • Enter accept • Esc cancel"
        };
        let bottom = Paragraph::new(Line::from(vec![
            Span::styled("Filter: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(self.query.clone()),
            Span::raw("  "),
            Span::styled(help, Style::default().fg(Color::DarkGray)),
        ]));
        f.render_widget(bottom, area);
    }
}
