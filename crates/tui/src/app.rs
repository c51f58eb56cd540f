use std::{cmp, collections::BTreeSet, io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gameshelf_core::{price, Catalog, CatalogError, Game, GameId, GameStatus};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        block::Title, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap,
    },
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_NAME_LEN: usize = 80;
const MAX_PRICE_LEN: usize = 24;
const NAME_COLUMN: usize = 36;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

impl Theme {
    fn status_color(&self, status: GameStatus) -> Color {
        match status {
            GameStatus::Paid => self.success,
            GameStatus::Unpaid => self.warning,
            GameStatus::Refunded => self.danger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Library,
    Trash,
}

impl Screen {
    fn toggle(self) -> Self {
        match self {
            Screen::Library => Screen::Trash,
            Screen::Trash => Screen::Library,
        }
    }
}

/// Single-line text field with a character cursor.
#[derive(Debug, Clone)]
struct TextInput {
    value: String,
    cursor: usize,
    max_len: usize,
}

impl TextInput {
    fn new(value: &str, max_len: usize) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
            max_len,
        }
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map_or(self.value.len(), |(idx, _)| idx)
    }

    fn move_cursor(&mut self, delta: isize) {
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, self.len() as isize) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.len();
    }

    fn insert(&mut self, ch: char) {
        if ch.is_control() || self.len() >= self.max_len {
            return;
        }
        let at = self.byte_index();
        self.value.insert(at, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index();
        self.value.remove(at);
    }

    fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index();
            self.value.remove(at);
        }
    }

    /// Apply an editing key. Returns false when the key is not an editing key.
    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_cursor(-1),
            KeyCode::Right => self.move_cursor(1),
            KeyCode::Home => self.move_home(),
            KeyCode::End => self.move_end(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.insert(ch)
            }
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
    Name,
    Price,
    Status,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Name => FormField::Price,
            FormField::Price => FormField::Status,
            FormField::Status => FormField::Name,
        }
    }

    fn previous(self) -> Self {
        match self {
            FormField::Name => FormField::Status,
            FormField::Price => FormField::Name,
            FormField::Status => FormField::Price,
        }
    }
}

/// Add/edit dialog for a game.
#[derive(Debug, Clone)]
struct GameForm {
    editing: Option<GameId>,
    name: TextInput,
    price: TextInput,
    status: GameStatus,
    focus: FormField,
}

impl GameForm {
    fn new_game() -> Self {
        Self {
            editing: None,
            name: TextInput::new("", MAX_NAME_LEN),
            price: TextInput::new("", MAX_PRICE_LEN),
            status: GameStatus::Unpaid,
            focus: FormField::Name,
        }
    }

    fn edit(game: &Game) -> Self {
        Self {
            editing: Some(game.id),
            name: TextInput::new(&game.name, MAX_NAME_LEN),
            price: TextInput::new(&game.price, MAX_PRICE_LEN),
            status: game.status,
            focus: FormField::Name,
        }
    }

    fn title(&self) -> String {
        match self.editing {
            Some(id) => format!("Edit game #{id}"),
            None => "Add game".to_string(),
        }
    }

    fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            FormField::Name => Some(&mut self.name),
            FormField::Price => Some(&mut self.price),
            FormField::Status => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfirmAction {
    Purge(Vec<GameId>),
    ClearTrash,
}

impl ConfirmAction {
    fn prompt(&self) -> String {
        match self {
            ConfirmAction::Purge(ids) if ids.len() == 1 => {
                format!("Permanently delete game #{}?", ids[0])
            }
            ConfirmAction::Purge(ids) => format!("Permanently delete {} games?", ids.len()),
            ConfirmAction::ClearTrash => "Permanently delete everything in the trash?".to_string(),
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Terminal front end over a [`Catalog`].
pub struct GameShelfApp {
    catalog: Catalog,
    state: UiState,
    form: Option<GameForm>,
    funds_prompt: Option<TextInput>,
    confirm: Option<ConfirmAction>,
    theme: Theme,
}

impl GameShelfApp {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            state: UiState::default(),
            form: None,
            funds_prompt: None,
            confirm: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.state.set_status(format!(
            "Loaded {} games from {}",
            self.catalog.active().len(),
            self.catalog.store().path().display()
        ));

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        let outcome = self.event_loop(&mut terminal, event_rx).await;
        restore_terminal(&mut terminal)?;
        info!("GameShelf closed");
        outcome
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        mut event_rx: mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        loop {
            terminal
                .draw(|frame| self.draw(frame))
                .context("failed to draw frame")?;
            if self.state.should_quit {
                return Ok(());
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) || self.state.should_quit {
                return Ok(());
            }
        }
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if let Err(err) = self.handle_key(key) {
                    error!(?err, "key handling failed");
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => true,
            None => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.confirm.is_some() {
            return self.handle_confirm_key(key);
        }
        if self.form.is_some() {
            return self.handle_form_key(key);
        }
        if self.funds_prompt.is_some() {
            return self.handle_funds_key(key);
        }
        match self.state.mode {
            Mode::Filter => self.handle_filter_key(key),
            Mode::Browse => self.handle_browse_key(key),
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.state.filter.clear();
                self.state.mode = Mode::Browse;
                self.state.reset_cursor();
                self.state.set_status("Filter cleared".to_string());
            }
            KeyCode::Enter => {
                self.state.mode = Mode::Browse;
                let count = self.row_count();
                self.state.set_status(format!("{count} games match"));
            }
            KeyCode::Backspace => {
                self.state.filter.pop();
                self.state.reset_cursor();
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.state.filter.push(ch);
                self.state.reset_cursor();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Result<()> {
        let total = self.row_count();
        match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => self.state.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.should_quit = true
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1, total),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1, total),
            KeyCode::Char('g') if key.modifiers.is_empty() => self.state.move_to(0, total),
            KeyCode::Char('G') => self.state.move_to(total.saturating_sub(1), total),
            KeyCode::Home => self.state.move_to(0, total),
            KeyCode::End => self.state.move_to(total.saturating_sub(1), total),
            KeyCode::PageDown => self.state.page(1, total),
            KeyCode::PageUp => self.state.page(-1, total),
            KeyCode::Tab => self.switch_screen(),
            KeyCode::Char(' ') => {
                if let Some(id) = self.current_id() {
                    self.state.toggle_mark(id);
                    self.state.move_cursor(1, total);
                }
            }
            KeyCode::Esc => {
                self.state.marked.clear();
                if !self.state.filter.is_empty() {
                    self.state.filter.clear();
                    self.state.reset_cursor();
                }
                self.state.set_status("Selection cleared".to_string());
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.reload();
            }
            _ => match self.state.screen {
                Screen::Library => self.handle_library_key(key)?,
                Screen::Trash => self.handle_trash_key(key)?,
            },
        }
        Ok(())
    }

    fn handle_library_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('/') => {
                self.state.mode = Mode::Filter;
                self.state.set_status("Enter filter text".to_string());
            }
            KeyCode::Char('a') => self.form = Some(GameForm::new_game()),
            KeyCode::Char('e') | KeyCode::Enter => {
                let form = self
                    .current_id()
                    .and_then(|id| self.catalog.get(id))
                    .map(GameForm::edit);
                match form {
                    Some(form) => self.form = Some(form),
                    None => self.state.set_status("No game selected".to_string()),
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                let ids = self.selection();
                if ids.is_empty() {
                    self.state.set_status("No game selected".to_string());
                    return Ok(());
                }
                let moved = self.catalog.soft_delete(&ids);
                self.after_batch();
                self.state
                    .set_status(format!("Moved {moved} game(s) to the trash"));
            }
            KeyCode::Char('f') => self.funds_prompt = Some(TextInput::new("", MAX_PRICE_LEN)),
            _ => {}
        }
        Ok(())
    }

    fn handle_trash_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('r') => {
                let ids = self.selection();
                if ids.is_empty() {
                    self.state.set_status("Trash is empty".to_string());
                    return Ok(());
                }
                let restored = self.catalog.restore(&ids);
                self.after_batch();
                self.state
                    .set_status(format!("Restored {restored} game(s)"));
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                let ids = self.selection();
                if ids.is_empty() {
                    self.state.set_status("Trash is empty".to_string());
                } else {
                    self.confirm = Some(ConfirmAction::Purge(ids));
                }
            }
            KeyCode::Char('X') => {
                if self.catalog.trashed().is_empty() {
                    self.state.set_status("Trash is empty".to_string());
                } else {
                    self.confirm = Some(ConfirmAction::ClearTrash);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(action) = self.confirm.take() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                let purged = match action {
                    ConfirmAction::Purge(ids) => self.catalog.purge(&ids),
                    ConfirmAction::ClearTrash => self.catalog.clear_trash(),
                };
                self.after_batch();
                self.state
                    .set_status(format!("Permanently deleted {purged} game(s)"));
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.state.set_status("Cancelled".to_string());
            }
            _ => self.confirm = Some(action),
        }
        Ok(())
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(form) = self.form.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.form = None;
                self.state.set_status("Edit cancelled".to_string());
            }
            KeyCode::Enter => self.submit_form(),
            KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.previous(),
            KeyCode::Left | KeyCode::Char('h') if form.focus == FormField::Status => {
                form.status = form.status.previous()
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ')
                if form.focus == FormField::Status =>
            {
                form.status = form.status.next()
            }
            _ => {
                if let Some(input) = form.focused_input() {
                    input.handle_key(&key);
                }
            }
        }
        Ok(())
    }

    fn submit_form(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let name = form.name.value.trim().to_string();
        if name.is_empty() {
            self.state.set_status("Name cannot be empty".to_string());
            return;
        }
        let raw_price = form.price.value.clone();
        let status = form.status;

        let outcome = match form.editing {
            Some(id) => self
                .catalog
                .update(id, &name, &raw_price, status)
                .map(|updated| match updated {
                    Some(game) => format!("Updated {} ({})", game.name, game.price),
                    None => format!("Game #{id} is no longer in the library"),
                }),
            None => self
                .catalog
                .create(&name, &raw_price, status)
                .map(|game| format!("Added {} as #{} ({})", game.name, game.id, game.price)),
        };

        match outcome {
            Ok(message) => {
                self.form = None;
                self.state.reset_cursor();
                self.state.set_status(message);
            }
            Err(err) => {
                debug!(%err, "form rejected");
                self.state.set_status(describe_error(&err));
            }
        }
    }

    fn handle_funds_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(prompt) = self.funds_prompt.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.funds_prompt = None;
                self.state.set_status("Cancelled".to_string());
            }
            KeyCode::Enter => {
                let raw = prompt.value.clone();
                let result = price::parse_amount(&raw)
                    .map_err(CatalogError::from)
                    .and_then(|amount| self.catalog.add_funds(amount).map(|()| amount));
                match result {
                    Ok(amount) => {
                        self.funds_prompt = None;
                        self.state.set_status(format!(
                            "Added {}; funds now {}",
                            price::format_amount(amount),
                            price::format_amount(self.catalog.funds())
                        ));
                    }
                    Err(err) => self.state.set_status(describe_error(&err)),
                }
            }
            _ => {
                prompt.handle_key(&key);
            }
        }
        Ok(())
    }

    fn switch_screen(&mut self) {
        self.state.screen = self.state.screen.toggle();
        self.state.marked.clear();
        self.state.mode = Mode::Browse;
        self.state.reset_cursor();
        let label = match self.state.screen {
            Screen::Library => "Library",
            Screen::Trash => "Trash",
        };
        self.state.set_status(label.to_string());
    }

    fn reload(&mut self) {
        let store = self.catalog.store().clone();
        self.catalog = Catalog::open(store);
        self.state.marked.clear();
        self.state.reset_cursor();
        info!(games = self.catalog.active().len(), "library reloaded");
        self.state.set_status(format!(
            "Reloaded {} games",
            self.catalog.active().len()
        ));
    }

    fn after_batch(&mut self) {
        self.state.marked.clear();
        let total = self.row_count();
        self.state.clamp_cursor(total);
    }

    fn visible_rows(&self) -> Vec<&Game> {
        match self.state.screen {
            Screen::Library => self.catalog.search(&self.state.filter),
            Screen::Trash => self.catalog.trashed().iter().collect(),
        }
    }

    fn row_count(&self) -> usize {
        self.visible_rows().len()
    }

    fn current_id(&self) -> Option<GameId> {
        self.visible_rows().get(self.state.cursor).map(|game| game.id)
    }

    /// Marked games on the current screen in list order, or the cursor row.
    fn selection(&self) -> Vec<GameId> {
        let rows = self.visible_rows();
        let marked: Vec<GameId> = rows
            .iter()
            .map(|game| game.id)
            .filter(|id| self.state.marked.contains(id))
            .collect();
        if !marked.is_empty() {
            return marked;
        }
        rows.get(self.state.cursor)
            .map(|game| vec![game.id])
            .unwrap_or_default()
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(5),
            ])
            .split(size);

        self.render_tabs(frame, chunks[0]);
        self.render_game_list(frame, chunks[1]);
        self.render_status(frame, chunks[2]);

        if let Some(form) = &self.form {
            self.render_form(frame, form);
        } else if let Some(prompt) = &self.funds_prompt {
            self.render_funds_prompt(frame, prompt);
        }
        if let Some(action) = &self.confirm {
            self.render_confirm(frame, action);
        }
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles = vec![
            format!("Library ({})", self.catalog.active().len()),
            format!("Trash ({})", self.catalog.trashed().len()),
        ];
        let selected = match self.state.screen {
            Screen::Library => 0,
            Screen::Trash => 1,
        };
        let funds = format!("Funds: {}", price::format_amount(self.catalog.funds()));
        let tabs = Tabs::new(titles)
            .select(selected)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("GameShelf")
                    .title(Title::from(funds).alignment(Alignment::Right)),
            )
            .style(Style::default().fg(self.theme.muted))
            .highlight_style(
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn render_game_list(&mut self, frame: &mut Frame, area: Rect) {
        let height = area.height.saturating_sub(2) as usize;
        self.state.list_height = height;
        let total = self.row_count();
        self.state.clamp_cursor(total);
        self.state.ensure_cursor_visible(total);

        let rows = self.visible_rows();
        let end = (self.state.offset + height).min(rows.len());
        let visible = &rows[self.state.offset.min(end)..end];

        let mut list_state = ListState::default();
        if !visible.is_empty() {
            let selected = self
                .state
                .cursor
                .saturating_sub(self.state.offset)
                .min(visible.len() - 1);
            list_state.select(Some(selected));
        }

        let items: Vec<ListItem> = visible
            .iter()
            .enumerate()
            .map(|(idx, game)| {
                let is_selected = self.state.cursor == self.state.offset + idx;
                let marker = if is_selected {
                    Span::styled(
                        "▶ ",
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                let mark = if self.state.marked.contains(&game.id) {
                    "[x] "
                } else {
                    "[ ] "
                };
                let status_color = self.theme.status_color(game.status);
                ListItem::new(Line::from(vec![
                    marker,
                    Span::styled(mark, Style::default().fg(self.theme.muted)),
                    Span::styled(format!("#{:<5}", game.id), Style::default().fg(self.theme.muted)),
                    Span::styled(
                        fit_column(&game.name, NAME_COLUMN),
                        Style::default()
                            .fg(self.theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(" {:>16}  ", game.price),
                        Style::default().fg(status_color),
                    ),
                    Span::styled(game.status.label(), Style::default().fg(status_color)),
                ]))
            })
            .collect();

        let title = match (self.state.screen, self.state.filter.is_empty()) {
            (Screen::Library, true) => "Games".to_string(),
            (Screen::Library, false) => format!("Games matching \"{}\"", self.state.filter),
            (Screen::Trash, _) => "Trash".to_string(),
        };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = if self.state.mode == Mode::Filter {
            format!("Filter: {}", self.state.filter)
        } else {
            self.state.status.clone()
        };

        let summary = self.catalog.summary();
        let saved = self
            .catalog
            .last_saved_at()
            .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "not yet".to_string());
        let totals = Line::from(vec![
            Span::raw(format!("{} games  ", summary.active)),
            Span::styled(
                format!("Paid {}", summary.paid),
                Style::default().fg(self.theme.success),
            ),
            Span::raw("  "),
            Span::styled(
                format!("Unpaid {}", summary.unpaid),
                Style::default().fg(self.theme.warning),
            ),
            Span::raw("  "),
            Span::styled(
                format!("Refunded {}", summary.refunded),
                Style::default().fg(self.theme.danger),
            ),
            Span::raw(format!(
                "  • Spent {}  • Saved {saved}",
                price::format_amount(summary.spent)
            )),
        ]);
        let help = match self.state.screen {
            Screen::Library => {
                "a add  e edit  d delete  f funds  / filter  space mark  Tab trash  q quit"
            }
            Screen::Trash => "r restore  x purge  X empty trash  space mark  Tab library  q quit",
        };
        let paragraph = Paragraph::new(vec![
            Line::from(primary),
            totals,
            Line::from(Span::styled(help, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_form(&self, frame: &mut Frame, form: &GameForm) {
        let area = centered_rect(60, 9, frame.size());
        frame.render_widget(Clear, area);

        let label = |field: FormField, text: &'static str| {
            let style = if form.focus == field {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.muted)
            };
            Span::styled(text, style)
        };
        let status_color = self.theme.status_color(form.status);
        let lines = vec![
            Line::from(vec![label(FormField::Name, "Name:   "), Span::raw(form.name.value.clone())]),
            Line::from(vec![
                label(FormField::Price, "Price:  "),
                Span::raw(form.price.value.clone()),
            ]),
            Line::from(vec![
                label(FormField::Status, "Status: "),
                Span::styled(
                    format!("◀ {} ▶", form.status.label()),
                    Style::default().fg(status_color),
                ),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" save  "),
                Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" next field  "),
                Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" cancel"),
            ]),
            Line::from(Span::styled(
                format!("Preview: {}", price::normalize(&form.price.value)),
                Style::default().fg(self.theme.muted),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(form.title()))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);

        let cursor = match form.focus {
            FormField::Name => Some((form.name.cursor, 0_u16)),
            FormField::Price => Some((form.price.cursor, 1_u16)),
            FormField::Status => None,
        };
        if let Some((column, row)) = cursor {
            let x = (area.x + 1 + 8 + column as u16).min(area.x + area.width.saturating_sub(2));
            frame.set_cursor(x, area.y + 1 + row);
        }
    }

    fn render_funds_prompt(&self, frame: &mut Frame, prompt: &TextInput) {
        let area = centered_rect(48, 6, frame.size());
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(vec![
            Line::from(vec![
                Span::styled("> ", Style::default().fg(self.theme.accent)),
                Span::raw(prompt.value.clone()),
            ]),
            Line::from(format!(
                "Current funds: {}",
                price::format_amount(self.catalog.funds())
            )),
            Line::from(vec![
                Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" add  "),
                Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" cancel"),
            ]),
        ])
        .block(Block::default().borders(Borders::ALL).title("Add funds"));
        frame.render_widget(paragraph, area);

        let x = (area.x + 3 + prompt.cursor as u16).min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(x, area.y + 1);
    }

    fn render_confirm(&self, frame: &mut Frame, action: &ConfirmAction) {
        let area = centered_rect(52, 5, frame.size());
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(vec![
            Line::from(action.prompt()),
            Line::from(vec![
                Span::styled(
                    "y",
                    Style::default()
                        .fg(self.theme.danger)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" delete  "),
                Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" keep"),
            ]),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Confirm"));
        frame.render_widget(paragraph, area);
    }
}

fn describe_error(err: &CatalogError) -> String {
    match err {
        CatalogError::Ledger(_) if err.is_insufficient_funds() => format!("Not enough funds: {err}"),
        _ => format!("Error: {err}"),
    }
}

fn fit_column(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        format!("{text}{}", " ".repeat(width - count))
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = cmp::min(width, area.width);
    let height = cmp::min(height, area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    screen: Screen,
    mode: Mode,
    cursor: usize,
    offset: usize,
    list_height: usize,
    filter: String,
    marked: BTreeSet<GameId>,
    status: String,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            screen: Screen::Library,
            mode: Mode::Browse,
            cursor: 0,
            offset: 0,
            list_height: 1,
            filter: String::new(),
            marked: BTreeSet::new(),
            status: "Ready".to_string(),
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn reset_cursor(&mut self) {
        self.cursor = 0;
        self.offset = 0;
    }

    fn toggle_mark(&mut self, id: GameId) {
        if !self.marked.remove(&id) {
            self.marked.insert(id);
        }
    }

    fn move_cursor(&mut self, delta: isize, total: usize) {
        if total == 0 {
            return;
        }
        let idx = (self.cursor as isize + delta).clamp(0, total as isize - 1);
        self.cursor = idx as usize;
        self.ensure_cursor_visible(total);
    }

    fn move_to(&mut self, index: usize, total: usize) {
        if total == 0 {
            return;
        }
        self.cursor = index.min(total - 1);
        self.ensure_cursor_visible(total);
    }

    fn page(&mut self, direction: isize, total: usize) {
        if total == 0 || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(total) as isize;
        self.move_cursor(direction * delta, total);
    }

    fn clamp_cursor(&mut self, total: usize) {
        if total == 0 {
            self.cursor = 0;
            self.offset = 0;
        } else if self.cursor >= total {
            self.cursor = total - 1;
        }
    }

    fn ensure_cursor_visible(&mut self, total: usize) {
        if total == 0 || self.list_height == 0 {
            self.offset = 0;
            return;
        }
        let height = self.list_height;
        let max_offset = total.saturating_sub(height);

        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }

        if self.offset > max_offset {
            self.offset = max_offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gameshelf_core::Store;
    use rust_decimal::Decimal;
    use tempfile::{tempdir, TempDir};

    fn press(app: &mut GameShelfApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
            .expect("key handled");
    }

    fn type_text(app: &mut GameShelfApp, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn temp_app() -> (TempDir, GameShelfApp) {
        let dir = tempdir().expect("tempdir");
        let catalog = Catalog::open(Store::new(dir.path().join("games.json")));
        (dir, GameShelfApp::new(catalog))
    }

    #[test]
    fn text_input_edits_multibyte_text() {
        let mut input = TextInput::new("não", 10);
        assert_eq!(input.cursor, 3);
        input.backspace();
        assert_eq!(input.value, "nã");
        input.move_cursor(-1);
        input.insert('x');
        assert_eq!(input.value, "nxã");
        input.move_home();
        input.delete();
        assert_eq!(input.value, "xã");
        input.move_cursor(-5);
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn text_input_respects_max_len() {
        let mut input = TextInput::new("", 3);
        for ch in "abcdef".chars() {
            input.insert(ch);
        }
        assert_eq!(input.value, "abc");
        input.insert('\n');
        assert_eq!(input.value, "abc");
    }

    #[test]
    fn cursor_stays_in_view() {
        let mut state = UiState {
            list_height: 3,
            ..UiState::default()
        };
        state.move_cursor(5, 10);
        assert_eq!(state.cursor, 5);
        assert_eq!(state.offset, 3);
        state.move_to(0, 10);
        assert_eq!(state.offset, 0);
        state.page(1, 10);
        assert_eq!(state.cursor, 3);
        state.move_cursor(100, 10);
        assert_eq!(state.cursor, 9);
        assert_eq!(state.offset, 7);
        state.clamp_cursor(4);
        assert_eq!(state.cursor, 3);
    }

    #[test]
    fn form_adds_game() {
        let (_dir, mut app) = temp_app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Chess");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "10");
        press(&mut app, KeyCode::Enter);

        assert!(app.form.is_none());
        let game = app.catalog.get(1).expect("created");
        assert_eq!(game.name, "Chess");
        assert_eq!(game.price, "R$ 10,00");
        assert_eq!(game.status, GameStatus::Unpaid);
    }

    #[test]
    fn empty_name_keeps_form_open() {
        let (_dir, mut app) = temp_app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        assert!(app.form.is_some());
        assert!(app.catalog.active().is_empty());
        assert_eq!(app.state.status, "Name cannot be empty");
    }

    #[test]
    fn paid_form_without_funds_is_rejected() {
        let (_dir, mut app) = temp_app();
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "Go");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "5");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.form.as_ref().map(|f| f.status), Some(GameStatus::Paid));
        press(&mut app, KeyCode::Enter);

        assert!(app.form.is_some());
        assert!(app.catalog.active().is_empty());
        assert!(app.state.status.starts_with("Not enough funds"));
    }

    #[test]
    fn funds_prompt_credits_ledger() {
        let (_dir, mut app) = temp_app();
        press(&mut app, KeyCode::Char('f'));
        type_text(&mut app, "12.5");
        press(&mut app, KeyCode::Enter);
        assert!(app.funds_prompt.is_none());
        assert_eq!(app.catalog.funds(), Decimal::new(125, 1));

        press(&mut app, KeyCode::Char('f'));
        type_text(&mut app, "muito");
        press(&mut app, KeyCode::Enter);
        assert!(app.funds_prompt.is_some());
        assert_eq!(app.catalog.funds(), Decimal::new(125, 1));
    }

    #[test]
    fn funds_prompt_rejects_negative_amount() {
        let (_dir, mut app) = temp_app();
        press(&mut app, KeyCode::Char('f'));
        type_text(&mut app, "-5");
        press(&mut app, KeyCode::Enter);
        assert!(app.funds_prompt.is_some());
        assert!(app.catalog.funds().is_zero());
        assert!(app.state.status.contains("negative"), "{}", app.state.status);
    }

    #[test]
    fn marked_games_move_to_trash_and_back() {
        let (_dir, mut app) = temp_app();
        for name in ["A", "B", "C"] {
            app.catalog
                .create(name, "1", GameStatus::Unpaid)
                .expect("created");
        }
        // rows: C(3), B(2), A(1)
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.selection(), vec![3, 2]);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.catalog.trashed().len(), 2);
        assert!(app.state.marked.is_empty());

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.state.screen, Screen::Trash);
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.catalog.trashed().len(), 1);
        assert_eq!(app.catalog.active()[0].id, 3);
    }

    #[test]
    fn purge_needs_confirmation() {
        let (_dir, mut app) = temp_app();
        app.catalog
            .create("A", "1", GameStatus::Unpaid)
            .expect("created");
        app.catalog.soft_delete(&[1]);
        press(&mut app, KeyCode::Tab);

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.confirm, Some(ConfirmAction::Purge(vec![1])));
        press(&mut app, KeyCode::Char('n'));
        assert!(app.confirm.is_none());
        assert_eq!(app.catalog.trashed().len(), 1);

        press(&mut app, KeyCode::Char('X'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.catalog.trashed().is_empty());
    }

    #[test]
    fn filter_narrows_library() {
        let (_dir, mut app) = temp_app();
        for name in ["Chess", "Go", "Battle Chess"] {
            app.catalog
                .create(name, "1", GameStatus::Unpaid)
                .expect("created");
        }
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "chess");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.row_count(), 2);
        assert_eq!(app.current_id(), Some(3));

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.row_count(), 3);
    }

    #[test]
    fn edit_form_prefills_current_game() {
        let (_dir, mut app) = temp_app();
        app.catalog
            .create("Chess", "10", GameStatus::Unpaid)
            .expect("created");
        press(&mut app, KeyCode::Char('e'));
        let form = app.form.as_ref().expect("form open");
        assert_eq!(form.editing, Some(1));
        assert_eq!(form.name.value, "Chess");
        assert_eq!(form.price.value, "R$ 10,00");

        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.catalog.get(1).map(|g| g.name.as_str()), Some("Ches"));
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(fit_column("abc", 5), "abc  ");
        assert_eq!(fit_column("abcdef", 4), "abc…");
    }
}
