#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap,
};
use time::OffsetDateTime;

use crate::board::candidates::CandidatePolicy;
use crate::board::dates;
use crate::board::filter::FilterSpec;
use crate::board::model::{TaskChanges, TaskDraft, TaskRecord, TaskStatus};
use crate::board::store::TaskStore;
use crate::config;
use crate::storage::audit::{AuditAction, AuditLog};
use crate::storage::{BoardStorage as _, CsvBoard};
use crate::tui::{self, TerminalGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TabId {
    Board,
    Candidates,
    Config,
    Help,
}

impl TabId {
    const ALL: [TabId; 4] = [TabId::Board, TabId::Candidates, TabId::Config, TabId::Help];

    fn title(self) -> &'static str {
        match self {
            TabId::Board => "Board",
            TabId::Candidates => "Candidates",
            TabId::Config => "Config",
            TabId::Help => "Help",
        }
    }

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Filtering,
    TaskForm,
    Confirm,
}

#[derive(Debug, Clone)]
struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    fn new(initial: impl Into<String>) -> Self {
        let text = initial.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    fn as_str(&self) -> &str {
        &self.text
    }

    fn insert_char(&mut self, c: char) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let cur = self.cursor.min(chars.len());
        chars.insert(cur, c);
        self.text = chars.into_iter().collect();
        self.cursor = cur + 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut chars: Vec<char> = self.text.chars().collect();
        let cur = self.cursor.min(chars.len());
        if cur == 0 {
            return;
        }
        chars.remove(cur - 1);
        self.text = chars.into_iter().collect();
        self.cursor = cur - 1;
    }

    fn delete(&mut self) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let cur = self.cursor.min(chars.len());
        if cur >= chars.len() {
            return;
        }
        chars.remove(cur);
        self.text = chars.into_iter().collect();
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        let len = self.text.chars().count();
        self.cursor = (self.cursor + 1).min(len);
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    until: Instant,
}

impl Toast {
    fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            until: Instant::now() + Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone)]
struct ConfirmDialog {
    title: String,
    message: String,
    action: ConfirmAction,
}

#[derive(Debug, Clone)]
enum ConfirmAction {
    CloseTasks(Vec<String>),
    RemoveTask { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
    Description,
    Status,
    Owner,
    NextAction,
    Notes,
    Source,
}

impl FormField {
    const ALL: [FormField; 6] = [
        FormField::Description,
        FormField::Status,
        FormField::Owner,
        FormField::NextAction,
        FormField::Notes,
        FormField::Source,
    ];

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone)]
struct TaskFormDialog {
    editing: Option<String>,
    description: TextInput,
    status: TaskStatus,
    owner: TextInput,
    next_action: TextInput,
    notes: TextInput,
    source: TextInput,
    field: FormField,
    error: Option<String>,
}

impl TaskFormDialog {
    fn new_add() -> Self {
        Self {
            editing: None,
            description: TextInput::new(""),
            status: TaskStatus::InProgress,
            owner: TextInput::new(""),
            next_action: TextInput::new(""),
            notes: TextInput::new(""),
            source: TextInput::new(""),
            field: FormField::Description,
            error: None,
        }
    }

    fn new_edit(record: &TaskRecord) -> Self {
        Self {
            editing: Some(record.id.clone()),
            description: TextInput::new(record.description.clone()),
            status: record.status,
            owner: TextInput::new(record.owner.clone()),
            next_action: TextInput::new(record.next_action.clone()),
            notes: TextInput::new(record.notes.clone()),
            source: TextInput::new(record.source.clone()),
            field: FormField::Description,
            error: None,
        }
    }

    fn active_input_mut(&mut self) -> Option<&mut TextInput> {
        match self.field {
            FormField::Description => Some(&mut self.description),
            FormField::Status => None,
            FormField::Owner => Some(&mut self.owner),
            FormField::NextAction => Some(&mut self.next_action),
            FormField::Notes => Some(&mut self.notes),
            FormField::Source => Some(&mut self.source),
        }
    }
}

struct AppState {
    cfg: config::Config,
    storage: CsvBoard,
    audit: AuditLog,
    policy: CandidatePolicy,
    store: TaskStore,

    tab: TabId,
    mode: Mode,

    filter_input: TextInput,
    filter_text: String,
    status_filter: Option<TaskStatus>,

    board: Vec<TaskRecord>,
    board_state: TableState,

    candidates: Vec<TaskRecord>,
    candidate_state: TableState,
    marked: BTreeSet<String>,

    config_text: String,
    config_scroll: usize,

    form: Option<TaskFormDialog>,
    confirm: Option<ConfirmDialog>,

    toast: Option<Toast>,
    last_error: Option<String>,
    should_quit: bool,
    needs_refresh: bool,
}

impl AppState {
    fn new(cfg: config::Config, storage: CsvBoard, audit: AuditLog, store: TaskStore) -> Self {
        let policy = CandidatePolicy::from_config(&cfg.heuristic);
        let mut board_state = TableState::default();
        board_state.select(Some(0));
        let mut candidate_state = TableState::default();
        candidate_state.select(Some(0));

        Self {
            cfg,
            storage,
            audit,
            policy,
            store,
            tab: TabId::Board,
            mode: Mode::Normal,
            filter_input: TextInput::new(""),
            filter_text: String::new(),
            status_filter: None,
            board: Vec::new(),
            board_state,
            candidates: Vec::new(),
            candidate_state,
            marked: BTreeSet::new(),
            config_text: String::new(),
            config_scroll: 0,
            form: None,
            confirm: None,
            toast: None,
            last_error: None,
            should_quit: false,
            needs_refresh: true,
        }
    }

    fn filter_spec(&self) -> FilterSpec {
        FilterSpec {
            status: self.status_filter,
            contains: if self.filter_text.trim().is_empty() {
                None
            } else {
                Some(self.filter_text.clone())
            },
            ..FilterSpec::default()
        }
    }

    fn refresh_views(&mut self) {
        let spec = self.filter_spec();
        self.board = self.store.filter(&spec).cloned().collect();
        self.candidates = self
            .store
            .close_candidates(&self.policy, OffsetDateTime::now_utc())
            .into_iter()
            .cloned()
            .collect();
        self.marked.retain(|id| self.candidates.iter().any(|r| &r.id == id));
        self.clamp_selection();
        self.config_text = config::list_resolved_toml().unwrap_or_else(|e| e.to_string());
    }

    fn clamp_selection(&mut self) {
        let board_idx = self
            .board_state
            .selected()
            .unwrap_or(0)
            .min(self.board.len().saturating_sub(1));
        self.board_state.select(Some(board_idx));

        let cand_idx = self
            .candidate_state
            .selected()
            .unwrap_or(0)
            .min(self.candidates.len().saturating_sub(1));
        self.candidate_state.select(Some(cand_idx));
    }

    fn selected_board_record(&self) -> Option<&TaskRecord> {
        self.board.get(self.board_state.selected().unwrap_or(0))
    }

    fn selected_candidate(&self) -> Option<&TaskRecord> {
        self.candidates
            .get(self.candidate_state.selected().unwrap_or(0))
    }

    fn move_selection(&mut self, delta: i64) {
        let (len, state) = match self.tab {
            TabId::Candidates => (self.candidates.len(), &mut self.candidate_state),
            _ => (self.board.len(), &mut self.board_state),
        };
        if len == 0 {
            return;
        }
        let cur = i64::try_from(state.selected().unwrap_or(0)).unwrap_or(0);
        let max = i64::try_from(len - 1).unwrap_or(0);
        let next = usize::try_from((cur + delta).clamp(0, max)).unwrap_or(0);
        state.select(Some(next));
    }

    fn persist(&mut self) -> anyhow::Result<()> {
        self.storage.save(self.store.records())?;
        Ok(())
    }

    fn reload_from_disk(&mut self) {
        match self.storage.load() {
            Ok(records) => {
                self.store = TaskStore::from_records(records);
                self.toast = Some(Toast::info("Reloaded from disk"));
                self.last_error = None;
            }
            Err(e) => self.last_error = Some(e.to_string()),
        }
        self.needs_refresh = true;
    }
}

pub async fn run(cfg: config::Config) -> anyhow::Result<()> {
    let storage = CsvBoard::new(
        config::expand_path(&cfg.board.csv_path)?,
        cfg.board.save_with_time,
    );
    let audit = AuditLog::new(config::expand_path(&cfg.board.audit_path)?, cfg.audit_user());

    let loader = storage.clone();
    let records = tokio::task::spawn_blocking(move || loader.load()).await??;
    let store = TaskStore::from_records(records);

    let terminal = tui::init_terminal()?;
    let mut guard = TerminalGuard::new(terminal);
    let mut app = AppState::new(cfg, storage, audit, store);

    loop {
        if let Some(toast) = &app.toast
            && Instant::now() >= toast.until
        {
            app.toast = None;
        }

        if app.needs_refresh {
            app.refresh_views();
            app.needs_refresh = false;
        }

        {
            let Some(terminal) = guard.terminal_mut() else {
                anyhow::bail!("terminal unavailable");
            };
            terminal.draw(|f| draw(f, &mut app))?;
        }

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
        {
            handle_key(key, &mut app);
        }
    }

    Ok(())
}

fn draw(f: &mut Frame<'_>, app: &mut AppState) {
    let area = f.area();

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    draw_tabs(f, root[0], app);
    draw_body(f, root[1], app);
    draw_footer(f, root[2], app);

    match app.mode {
        Mode::Filtering => draw_filter_popup(f, app),
        Mode::TaskForm => draw_form_popup(f, app),
        Mode::Confirm => draw_confirm_popup(f, app),
        Mode::Normal => {}
    }
}

fn draw_tabs(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(40)])
        .split(area);

    let titles: Vec<Line> = TabId::ALL
        .iter()
        .map(|t| {
            let mut title = format!(" {} ", t.title());
            match t {
                TabId::Board => title = format!("{title}({})", app.board.len()),
                TabId::Candidates => title = format!("{title}({})", app.candidates.len()),
                _ => {}
            }
            Line::from(title)
        })
        .collect();

    let selected = TabId::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" | ");

    f.render_widget(tabs, chunks[0]);

    let path = Paragraph::new(Line::from(app.storage.path().display().to_string()))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Right);
    f.render_widget(path, chunks[1]);
}

fn draw_body(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    match app.tab {
        TabId::Board => draw_board_tab(f, area, app),
        TabId::Candidates => draw_candidates_tab(f, area, app),
        TabId::Config => draw_config_tab(f, area, app),
        TabId::Help => draw_help_tab(f, area),
    }
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let mut left = match app.mode {
        Mode::Normal => match app.tab {
            TabId::Board => {
                "q quit • 1-4 tabs • j/k move • a add • e edit • c close • d delete • / filter • s status-filter • r reload"
                    .to_owned()
            }
            TabId::Candidates => {
                "q quit • 1-4 tabs • j/k move • Tab mark • c close marked • r reload".to_owned()
            }
            TabId::Config => "q quit • 1-4 tabs • j/k scroll • r reload".to_owned(),
            TabId::Help => "q quit • 1-4 tabs".to_owned(),
        },
        Mode::Filtering => "Enter apply • Esc cancel".to_owned(),
        Mode::TaskForm => {
            "Enter save • Tab/↓ next field • Shift-Tab/↑ previous • Space cycles status • Esc cancel"
                .to_owned()
        }
        Mode::Confirm => "y confirm • n/Esc cancel".to_owned(),
    };

    if let Some(err) = &app.last_error {
        left = format!("Error: {err}");
    } else if let Some(toast) = &app.toast {
        left.clone_from(&toast.message);
    }

    let summary = app.store.summary(&app.policy);
    let right = format!(
        "Filter: {} • Status: {} • {} open / {} in-progress / {} closed / {} waiting",
        if app.filter_text.trim().is_empty() {
            "-"
        } else {
            app.filter_text.as_str()
        },
        app.status_filter.map_or("all", TaskStatus::as_str),
        summary.open,
        summary.in_progress,
        summary.closed,
        summary.waiting_reply,
    );

    let spans = vec![
        Span::styled(left, Style::default().fg(Color::White).bg(Color::Blue)),
        Span::raw(" "),
        Span::styled(
            right,
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::DIM),
        ),
    ];

    let p = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Blue));
    f.render_widget(p, area);
}

fn draw_board_tab(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    draw_board_table(f, layout[0], app);
    draw_board_detail(f, layout[1], app);
}

fn draw_board_table(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    let today = OffsetDateTime::now_utc().date();
    let with_time = app.cfg.board.save_with_time;
    let icons = app.cfg.ui.icons;
    let stale_after = app.cfg.ui.stale_highlight_days;
    let policy = &app.policy;

    let headers = Row::new(vec!["UPDATED", "", "STATUS", "DESCRIPTION", "OWNER"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = app.board.iter().map(|r| {
        let waiting = policy.matches_keywords(r);
        let flag = if waiting && icons { "⚑" } else { " " };

        let mut row_style = Style::default();
        if dates::staleness_days(today, r.updated_at.date()) >= stale_after {
            row_style = row_style.fg(Color::Yellow);
        }

        Row::new(vec![
            Cell::from(dates::format_stamp(r.updated_at, with_time)),
            Cell::from(flag).style(Style::default().fg(Color::LightRed)),
            Cell::from(r.status.as_str()).style(status_style(r.status)),
            Cell::from(r.description.clone()),
            Cell::from(r.owner.clone()),
        ])
        .style(row_style)
    });

    let widths = vec![
        Constraint::Length(if with_time { 19 } else { 10 }),
        Constraint::Length(1),
        Constraint::Length(11),
        Constraint::Percentage(60),
        Constraint::Percentage(15),
    ];

    let table = Table::new(rows, widths)
        .header(headers)
        .block(Block::default().borders(Borders::ALL).title("Tasks"))
        .row_highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    f.render_stateful_widget(table, area, &mut app.board_state);
}

fn draw_board_detail(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let block = Block::default().borders(Borders::ALL).title("Details");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(r) = app.selected_board_record() else {
        let p = Paragraph::new("No tasks. Press 'a' to add one.").wrap(Wrap { trim: true });
        f.render_widget(p, inner);
        return;
    };

    let with_time = app.cfg.board.save_with_time;
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(vec![Span::styled("Description: ", bold), Span::raw(&r.description)]),
        Line::from(vec![
            Span::styled("Status: ", bold),
            Span::styled(r.status.as_str(), status_style(r.status)),
        ]),
        Line::from(vec![Span::styled("Owner: ", bold), Span::raw(&r.owner)]),
        Line::from(""),
        Line::from(vec![Span::styled("Next action: ", bold), Span::raw(&r.next_action)]),
        Line::from(vec![Span::styled("Notes: ", bold), Span::raw(&r.notes)]),
        Line::from(vec![Span::styled("Source: ", bold), Span::raw(&r.source)]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Created: ", bold),
            Span::raw(dates::format_stamp(r.created_at, with_time)),
        ]),
        Line::from(vec![
            Span::styled("Updated: ", bold),
            Span::raw(dates::format_stamp(r.updated_at, with_time)),
        ]),
        Line::from(vec![Span::styled("Id: ", bold), Span::raw(&r.id)]),
    ];

    let p = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(p, inner);
}

fn draw_candidates_tab(f: &mut Frame<'_>, area: Rect, app: &mut AppState) {
    let today = OffsetDateTime::now_utc().date();
    let with_time = app.cfg.board.save_with_time;

    let headers = Row::new(vec!["", "UPDATED", "STALE", "DESCRIPTION", "OWNER"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = app.candidates.iter().map(|r| {
        let marker = if app.marked.contains(&r.id) {
            "[x]"
        } else {
            "[ ]"
        };
        let stale = dates::staleness_days(today, r.updated_at.date());
        Row::new(vec![
            Cell::from(marker),
            Cell::from(dates::format_stamp(r.updated_at, with_time)),
            Cell::from(format!("{stale}d")),
            Cell::from(r.description.clone()),
            Cell::from(r.owner.clone()),
        ])
    });

    let widths = vec![
        Constraint::Length(3),
        Constraint::Length(if with_time { 19 } else { 10 }),
        Constraint::Length(6),
        Constraint::Percentage(60),
        Constraint::Percentage(15),
    ];

    let title = format!(
        "Close candidates (in-progress + waiting keywords + updated ≥ {}d ago)",
        app.policy.stale_days
    );
    let table = Table::new(rows, widths)
        .header(headers)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    f.render_stateful_widget(table, area, &mut app.candidate_state);
}

fn draw_config_tab(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Resolved config (edit with `taskboard config set`)");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let text: String = app
        .config_text
        .lines()
        .skip(app.config_scroll)
        .collect::<Vec<_>>()
        .join("\n");
    let p = Paragraph::new(text).wrap(Wrap { trim: false });
    f.render_widget(p, inner);
}

fn draw_help_tab(f: &mut Frame<'_>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Help");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from("Board"),
        Line::from("  j/k, ↑/↓     Move selection"),
        Line::from("  a            Add a task"),
        Line::from("  e            Edit the selected task"),
        Line::from("  c            Close the selected task"),
        Line::from("  d            Delete the selected task (confirmed)"),
        Line::from("  /            Free-text filter"),
        Line::from("  s            Cycle the status filter"),
        Line::from("  r            Reload the board from disk"),
        Line::from(""),
        Line::from("Candidates"),
        Line::from("  Tab          Mark/unmark the selected candidate"),
        Line::from("  c            Close marked candidates (or the selected one)"),
        Line::from(""),
        Line::from("Global"),
        Line::from("  1-4, h/l     Switch tabs"),
        Line::from("  q, Ctrl-C    Quit"),
        Line::from(""),
        Line::from("Stale rows are highlighted; ⚑ marks waiting-for-reply tasks."),
    ];
    let p = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(p, inner);
}

fn draw_filter_popup(f: &mut Frame<'_>, app: &AppState) {
    let area = f.area();
    let popup = centered_rect_lines(60, 3, area);
    f.render_widget(Clear, popup);

    let block = Block::default().borders(Borders::ALL).title("Filter");
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let p = Paragraph::new(Line::from(vec![
        Span::styled("Contains: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(app.filter_input.as_str()),
    ]));
    f.render_widget(p, inner);

    let prefix_len = "Contains: ".chars().count();
    let x = inner.x
        + u16::try_from(prefix_len).unwrap_or(0)
        + cursor_x_for_text(app.filter_input.as_str(), app.filter_input.cursor);
    f.set_cursor_position((x, inner.y));
}

fn draw_form_popup(f: &mut Frame<'_>, app: &AppState) {
    let Some(form) = &app.form else {
        return;
    };

    let area = f.area();
    let popup = centered_rect(70, 55, area);
    f.render_widget(Clear, popup);

    let title = if form.editing.is_some() {
        "Edit task"
    } else {
        "New task"
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let active = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let label = |field: FormField, name: &'static str| {
        if form.field == field {
            Span::styled(name, active)
        } else {
            Span::styled(name, bold)
        }
    };

    let mut lines = vec![
        Line::from(vec![
            label(FormField::Description, "Description: "),
            Span::raw(form.description.as_str()),
        ]),
        Line::from(vec![
            label(FormField::Status, "Status:      "),
            Span::styled(form.status.as_str(), status_style(form.status)),
            Span::styled(
                if form.field == FormField::Status {
                    "  (space cycles)"
                } else {
                    ""
                },
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(vec![
            label(FormField::Owner, "Owner:       "),
            Span::raw(form.owner.as_str()),
        ]),
        Line::from(vec![
            label(FormField::NextAction, "Next action: "),
            Span::raw(form.next_action.as_str()),
        ]),
        Line::from(vec![
            label(FormField::Notes, "Notes:       "),
            Span::raw(form.notes.as_str()),
        ]),
        Line::from(vec![
            label(FormField::Source, "Source:      "),
            Span::raw(form.source.as_str()),
        ]),
    ];

    if !app.cfg.board.owners.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Owners: {}", app.cfg.board.owners.join(", ")),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if let Some(err) = &form.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(p, inner);

    let (line_idx, input) = match form.field {
        FormField::Description => (0u16, Some(&form.description)),
        FormField::Status => (1u16, None),
        FormField::Owner => (2u16, Some(&form.owner)),
        FormField::NextAction => (3u16, Some(&form.next_action)),
        FormField::Notes => (4u16, Some(&form.notes)),
        FormField::Source => (5u16, Some(&form.source)),
    };
    if let Some(input) = input {
        let prefix_len = "Description: ".chars().count();
        let x = inner.x
            + u16::try_from(prefix_len).unwrap_or(0)
            + cursor_x_for_text(input.as_str(), input.cursor);
        f.set_cursor_position((x, inner.y + line_idx));
    }
}

fn draw_confirm_popup(f: &mut Frame<'_>, app: &AppState) {
    let Some(confirm) = &app.confirm else {
        return;
    };

    let area = f.area();
    let popup = centered_rect(60, 30, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(confirm.title.clone());
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let lines = vec![
        Line::from(confirm.message.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "y confirm • n cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let p = Paragraph::new(lines).wrap(Wrap { trim: true });
    f.render_widget(p, inner);
}

fn status_style(status: TaskStatus) -> Style {
    match status {
        TaskStatus::Open => Style::default().fg(Color::Yellow),
        TaskStatus::InProgress => Style::default().fg(Color::Green),
        TaskStatus::Closed => Style::default().fg(Color::DarkGray),
    }
}

fn handle_key(key: KeyEvent, app: &mut AppState) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        app.should_quit = true;
        return;
    }

    // Modals take precedence.
    if app.confirm.is_some() {
        app.mode = Mode::Confirm;
        handle_confirm_key(key, app);
        return;
    }
    if app.form.is_some() {
        app.mode = Mode::TaskForm;
        handle_form_key(key, app);
        return;
    }

    if app.mode == Mode::Filtering {
        match key.code {
            KeyCode::Esc => app.mode = Mode::Normal,
            KeyCode::Enter => {
                app.filter_text = app.filter_input.as_str().trim().to_owned();
                app.mode = Mode::Normal;
                app.needs_refresh = true;
            }
            _ => handle_text_input_key(key, &mut app.filter_input),
        }
        return;
    }

    // Global keys (normal mode).
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('1') => app.tab = TabId::Board,
        KeyCode::Char('2') => app.tab = TabId::Candidates,
        KeyCode::Char('3') => app.tab = TabId::Config,
        KeyCode::Char('?' | '4') => app.tab = TabId::Help,
        KeyCode::Char('h') => app.tab = app.tab.prev(),
        KeyCode::Char('l') => app.tab = app.tab.next(),
        _ => {}
    }

    match app.tab {
        TabId::Board => handle_board_key(key, app),
        TabId::Candidates => handle_candidates_key(key, app),
        TabId::Config => handle_config_key(key, app),
        TabId::Help => {}
    }
}

fn handle_board_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::PageUp => app.move_selection(-10),
        KeyCode::PageDown => app.move_selection(10),
        KeyCode::Char('/') => {
            app.filter_input = TextInput::new(app.filter_text.clone());
            app.mode = Mode::Filtering;
        }
        KeyCode::Char('s') => {
            app.status_filter = match app.status_filter {
                None => Some(TaskStatus::Open),
                Some(TaskStatus::Open) => Some(TaskStatus::InProgress),
                Some(TaskStatus::InProgress) => Some(TaskStatus::Closed),
                Some(TaskStatus::Closed) => None,
            };
            app.needs_refresh = true;
        }
        KeyCode::Char('a') => {
            app.form = Some(TaskFormDialog::new_add());
            app.mode = Mode::TaskForm;
        }
        KeyCode::Char('e') => {
            if let Some(record) = app.selected_board_record().cloned() {
                app.form = Some(TaskFormDialog::new_edit(&record));
                app.mode = Mode::TaskForm;
            }
        }
        KeyCode::Char('c') => {
            if let Some(record) = app.selected_board_record().cloned() {
                app.confirm = Some(ConfirmDialog {
                    title: "Close task".to_owned(),
                    message: format!("Close:\n{}", record.description),
                    action: ConfirmAction::CloseTasks(vec![record.id]),
                });
            }
        }
        KeyCode::Char('d') => {
            if let Some(record) = app.selected_board_record().cloned() {
                app.confirm = Some(ConfirmDialog {
                    title: "Delete task".to_owned(),
                    message: format!("Permanently delete:\n{}", record.description),
                    action: ConfirmAction::RemoveTask { id: record.id },
                });
            }
        }
        KeyCode::Char('r') => app.reload_from_disk(),
        _ => {}
    }
}

fn handle_candidates_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Tab => {
            if let Some(record) = app.selected_candidate() {
                let id = record.id.clone();
                if !app.marked.insert(id.clone()) {
                    app.marked.remove(&id);
                }
            }
        }
        KeyCode::Char('c') | KeyCode::Enter => {
            let ids: Vec<String> = if app.marked.is_empty() {
                app.selected_candidate()
                    .map(|r| vec![r.id.clone()])
                    .unwrap_or_default()
            } else {
                app.marked.iter().cloned().collect()
            };
            if !ids.is_empty() {
                app.confirm = Some(ConfirmDialog {
                    title: "Close candidates".to_owned(),
                    message: format!("Close {} task(s)?", ids.len()),
                    action: ConfirmAction::CloseTasks(ids),
                });
            }
        }
        KeyCode::Char('r') => app.reload_from_disk(),
        _ => {}
    }
}

fn handle_config_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.config_scroll = app.config_scroll.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => {
            let max = app.config_text.lines().count().saturating_sub(1);
            app.config_scroll = (app.config_scroll + 1).min(max);
        }
        KeyCode::Char('r') => app.needs_refresh = true,
        _ => {}
    }
}

fn handle_confirm_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Char('y' | 'Y') | KeyCode::Enter => {
            let Some(confirm) = app.confirm.take() else {
                return;
            };
            app.mode = Mode::Normal;
            let result = match confirm.action {
                ConfirmAction::CloseTasks(ids) => close_tasks(app, &ids),
                ConfirmAction::RemoveTask { id } => remove_task(app, &id),
            };
            match result {
                Ok(message) => {
                    app.toast = Some(Toast::info(message));
                    app.last_error = None;
                }
                Err(e) => app.last_error = Some(e.to_string()),
            }
            app.needs_refresh = true;
        }
        KeyCode::Char('n' | 'N') | KeyCode::Esc => {
            app.confirm = None;
            app.mode = Mode::Normal;
        }
        _ => {}
    }
}

fn handle_form_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Esc => {
            app.form = None;
            app.mode = Mode::Normal;
        }
        KeyCode::Enter => submit_form(app),
        KeyCode::Tab | KeyCode::Down => {
            if let Some(form) = app.form.as_mut() {
                form.field = form.field.next();
            }
        }
        KeyCode::BackTab | KeyCode::Up => {
            if let Some(form) = app.form.as_mut() {
                form.field = form.field.prev();
            }
        }
        KeyCode::Char(' ') => {
            if let Some(form) = app.form.as_mut() {
                if form.field == FormField::Status {
                    form.status = form.status.cycle();
                } else if let Some(input) = form.active_input_mut() {
                    input.insert_char(' ');
                }
            }
        }
        _ => {
            if let Some(form) = app.form.as_mut()
                && let Some(input) = form.active_input_mut()
            {
                handle_text_input_key(key, input);
            }
        }
    }
}

fn submit_form(app: &mut AppState) {
    let Some(mut form) = app.form.take() else {
        return;
    };

    if form.description.as_str().trim().is_empty() {
        form.error = Some("description must not be empty".to_owned());
        app.form = Some(form);
        return;
    }

    let ts = OffsetDateTime::now_utc();
    let result = if let Some(id) = form.editing.clone() {
        edit_task(app, &id, &form, ts)
    } else {
        add_task(app, &form, ts)
    };

    match result {
        Ok(message) => {
            app.toast = Some(Toast::info(message));
            app.last_error = None;
            app.mode = Mode::Normal;
            app.needs_refresh = true;
        }
        Err(e) => {
            form.error = Some(e.to_string());
            app.form = Some(form);
        }
    }
}

fn add_task(app: &mut AppState, form: &TaskFormDialog, ts: OffsetDateTime) -> anyhow::Result<String> {
    let draft = TaskDraft {
        description: form.description.as_str().to_owned(),
        status: form.status,
        owner: form.owner.as_str().to_owned(),
        next_action: form.next_action.as_str().to_owned(),
        notes: form.notes.as_str().to_owned(),
        source: form.source.as_str().to_owned(),
    };
    let id = app.store.add(draft, ts)?;
    app.persist()?;
    app.audit
        .append(AuditAction::Create, &id, None, app.store.get(&id), ts)?;
    Ok(format!("Added task {id}"))
}

fn edit_task(
    app: &mut AppState,
    id: &str,
    form: &TaskFormDialog,
    ts: OffsetDateTime,
) -> anyhow::Result<String> {
    let before = app
        .store
        .get(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("task not found: {id}"))?;
    let changes = TaskChanges {
        description: Some(form.description.as_str().to_owned()),
        status: Some(form.status),
        owner: Some(form.owner.as_str().to_owned()),
        next_action: Some(form.next_action.as_str().to_owned()),
        notes: Some(form.notes.as_str().to_owned()),
        source: Some(form.source.as_str().to_owned()),
    };
    let after = app.store.update(id, changes, ts)?.clone();
    app.persist()?;
    app.audit
        .append(AuditAction::Update, id, Some(&before), Some(&after), ts)?;
    Ok(format!("Updated task {id}"))
}

fn close_tasks(app: &mut AppState, ids: &[String]) -> anyhow::Result<String> {
    let ts = OffsetDateTime::now_utc();
    let befores: Vec<TaskRecord> = ids
        .iter()
        .filter_map(|id| app.store.get(id).cloned())
        .collect();

    let closed = app.store.close_many(ids, ts)?;
    app.persist()?;
    for before in &befores {
        app.audit.append(
            AuditAction::Close,
            &before.id,
            Some(before),
            app.store.get(&before.id),
            ts,
        )?;
    }
    app.marked.clear();
    Ok(format!("Closed {closed} task(s)"))
}

fn remove_task(app: &mut AppState, id: &str) -> anyhow::Result<String> {
    let ts = OffsetDateTime::now_utc();
    let removed = app.store.remove(id)?;
    app.persist()?;
    app.audit
        .append(AuditAction::Remove, id, Some(&removed), None, ts)?;
    Ok(format!("Removed task {id}"))
}

fn handle_text_input_key(key: KeyEvent, input: &mut TextInput) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Char(c) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT)
            {
                input.insert_char(c);
            }
        }
        _ => {}
    }
}

fn cursor_x_for_text(text: &str, cursor: usize) -> u16 {
    // `Paragraph` doesn't do cursor for us; approximate by counting chars.
    let prefix: String = text.chars().take(cursor).collect();
    u16::try_from(prefix.chars().count()).unwrap_or(0)
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn centered_rect_lines(percent_x: u16, height: u16, r: Rect) -> Rect {
    let w = r.width * percent_x / 100;
    Rect {
        x: r.x + (r.width.saturating_sub(w)) / 2,
        y: r.y + 1,
        width: w,
        height: height.min(r.height),
    }
}
