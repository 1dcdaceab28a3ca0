use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::block::Title;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthStr;

use crate::assets::Manifest;
use crate::banner::{Banner, BannerKind};
use crate::dispatch::{self, Action, Target};
use crate::fallback::{ImageSlot, Resolver};
use crate::i18n::{self, Language};
use crate::modal::{self, Modal};
use crate::playback::{self, PlaybackEvent, Toggle};
use crate::post::{self, Post};
use crate::selection::{self, ArchiveGrouping};
use crate::storage;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_FESTIVAL: Color = Color::Rgb(250, 179, 135);

const CARD_HEIGHT: u16 = 10;
const BANNER_CLOSE_LABEL: &str = " [x] ";

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

fn grid_columns(width: u16) -> usize {
    match width {
        w if w >= 120 => 3,
        w if w >= 70 => 2,
        _ => 1,
    }
}

/// Lays out `count` cells row by row, starting at row `first_row`. Cells that
/// do not fit vertically are omitted.
fn grid_layout(area: Rect, count: usize, columns: usize, first_row: usize) -> Vec<(usize, Rect)> {
    let columns = columns.max(1);
    let cell_width = area.width / columns as u16;
    let mut cells = Vec::new();
    for index in (first_row * columns)..count {
        let row = (index / columns - first_row) as u16;
        let col = (index % columns) as u16;
        let y = area.y.saturating_add(row.saturating_mul(CARD_HEIGHT));
        if y.saturating_add(CARD_HEIGHT) > area.bottom() {
            break;
        }
        let width = if col as usize == columns - 1 {
            area.width - cell_width * col
        } else {
            cell_width
        };
        cells.push((
            index,
            Rect {
                x: area.x + cell_width * col,
                y,
                width,
                height: CARD_HEIGHT,
            },
        ));
    }
    cells
}

fn file_label(slot: &ImageSlot) -> String {
    slot.current()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

struct Card {
    post: Post,
    image: ImageSlot,
}

pub struct Options {
    pub posts: post::Store,
    pub featured_cap: usize,
    pub manifest: Manifest,
    pub resolver: Resolver,
    pub playback: playback::Handle,
    pub banner: Option<Banner>,
    pub language: Language,
    pub store: Option<storage::Store>,
    pub status_message: String,
}

pub struct Model {
    posts: post::Store,
    archive: ArchiveGrouping,
    cards: Vec<Card>,
    manifest: Manifest,
    playback: playback::Handle,
    modal: Modal,
    banner: Option<Banner>,
    language: Language,
    store: Option<storage::Store>,
    status_message: String,
    selected: usize,
    grid_offset: usize,
    columns: usize,
    needs_redraw: bool,
    grid_cells: Vec<(Rect, Target)>,
    overlay_area: Option<Rect>,
    overlay_inner: Option<Rect>,
    close_area: Option<Rect>,
    control_area: Option<Rect>,
    banner_close_area: Option<Rect>,
    language_area: Option<Rect>,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let display = selection::select(options.posts.posts(), options.featured_cap);
        let archive = selection::group(&display.archived);
        let cards = display
            .featured
            .iter()
            .map(|post| {
                let primary = options.manifest.paths_for(&post.id).infographic;
                let mut image = ImageSlot::new(post.category.clone(), primary);
                if !image.current().is_file() {
                    image.on_error(&options.resolver);
                }
                Card {
                    post: post.clone(),
                    image,
                }
            })
            .collect();
        log::info!(
            "ui: {} featured, {} archived in {} categories",
            display.featured.len(),
            archive.post_count(),
            archive.len()
        );

        Self {
            modal: Modal::new(options.playback.clone()),
            posts: options.posts,
            archive,
            cards,
            manifest: options.manifest,
            playback: options.playback,
            banner: options.banner,
            language: options.language,
            store: options.store,
            status_message: options.status_message,
            selected: 0,
            grid_offset: 0,
            columns: 1,
            needs_redraw: true,
            grid_cells: Vec::new(),
            overlay_area: None,
            overlay_inner: None,
            close_area: None,
            control_area: None,
            banner_close_area: None,
            language_area: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        self.playback.lock().stop_active();
        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let Err(err) = self.handle_mouse(mouse) {
                            self.status_message = format!("Error: {}", err);
                            self.mark_dirty();
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                self.tick(last_tick);
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn tick(&mut self, now: Instant) {
        if let Some(banner) = self.banner.as_mut() {
            if banner.tick(now) {
                self.needs_redraw = true;
            }
        }
        let events = self.playback.lock().poll();
        for event in events {
            self.report_playback(event);
        }
    }

    fn report_playback(&mut self, event: PlaybackEvent) {
        self.status_message = match event {
            PlaybackEvent::Started { owner, .. } => format!("Playing {}", self.title_of(&owner)),
            PlaybackEvent::Finished { owner } => format!("Finished {}", self.title_of(&owner)),
            PlaybackEvent::FellBack { owner } => format!(
                "Recorded audio failed for {}; reading it aloud instead",
                self.title_of(&owner)
            ),
            PlaybackEvent::Failed { owner, message } => {
                format!("Playback failed for {}: {message}", self.title_of(&owner))
            }
        };
        self.mark_dirty();
    }

    fn title_of(&self, id: &str) -> String {
        self.posts
            .get(id)
            .map(|post| post.title.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn cell_count(&self) -> usize {
        self.cards.len() + 1
    }

    fn target_at(&self, index: usize) -> Target {
        match self.cards.get(index) {
            Some(card) => Target::Card(card.post.id.clone()),
            None if index == self.cards.len() => Target::ArchiveEntry,
            None => Target::Nothing,
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let last = self.cell_count() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
        self.mark_dirty();
    }

    /// Applies a dispatched action. Only this method mutates reader state in
    /// response to input.
    pub fn apply(&mut self, action: Action) -> Result<()> {
        match action {
            Action::OpenPost(id) => match self.posts.get(&id) {
                Some(post) => {
                    let post = post.clone();
                    self.modal.open_post(&post);
                    self.status_message = post.title;
                }
                None => {
                    log::warn!("ui: no post with id {id}");
                    self.status_message = format!("Post {id} not found");
                }
            },
            Action::OpenArchiveIndex => {
                self.modal.open_archive_index(&self.archive);
                self.status_message =
                    i18n::text(self.language, "archive_title").to_string();
            }
            Action::ToggleNarration(id) => self.toggle_narration(&id),
            Action::CloseOverlay => {
                if self.modal.dismiss() {
                    self.status_message.clear();
                }
            }
            Action::DismissBanner => {
                if let Some(banner) = self.banner.as_mut() {
                    if !banner.is_dismissed() {
                        banner.dismiss();
                        self.status_message =
                            i18n::text(self.language, "banner_dismissed").to_string();
                    }
                }
            }
            Action::ToggleLanguage => {
                self.language = self.language.toggle();
                self.status_message =
                    i18n::text(self.language, "language_switched").to_string();
                if let Some(store) = self.store.as_ref() {
                    if let Err(err) = store.set_language(self.language) {
                        log::warn!("ui: failed to persist language: {err:#}");
                    }
                }
            }
            Action::None => return Ok(()),
        }
        self.mark_dirty();
        Ok(())
    }

    fn toggle_narration(&mut self, id: &str) {
        let audio = self.manifest.paths_for(id).audio;
        let result = if self.modal.current_post().is_some_and(|post| post.id == id) {
            self.modal.toggle_narration(&audio)
        } else {
            match self.posts.get(id) {
                Some(post) => Some(self.playback.lock().toggle(post, &audio)),
                None => None,
            }
        };
        self.status_message = match result {
            Some(Toggle::Started { owner, source }) => match source {
                playback::Source::Audio(_) => format!("Playing {}", self.title_of(&owner)),
                playback::Source::Narration => {
                    format!("Reading {} aloud", self.title_of(&owner))
                }
            },
            Some(Toggle::Stopped { owner }) => format!("Stopped {}", self.title_of(&owner)),
            Some(Toggle::Unavailable) => {
                i18n::text(self.language, "narration_unavailable").to_string()
            }
            None => format!("Post {id} not found"),
        };
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if matches!(code, KeyCode::Char('q')) {
            return Ok(true);
        }
        if code == KeyCode::Esc {
            return self.apply(dispatch::on_escape(self.modal.is_open())).map(|_| false);
        }
        match code {
            KeyCode::Char('b') => self.apply(dispatch::on_click(&Target::BannerClose))?,
            KeyCode::Char('L') => self.apply(dispatch::on_click(&Target::LanguageToggle))?,
            _ if self.modal.is_open() => self.handle_overlay_key(code)?,
            _ => self.handle_grid_key(code)?,
        }
        Ok(false)
    }

    fn handle_overlay_key(&mut self, code: KeyCode) -> Result<()> {
        if self.modal.showing_archive() {
            match code {
                KeyCode::Down | KeyCode::Char('j') => self.modal.archive_move(1),
                KeyCode::Up | KeyCode::Char('k') => self.modal.archive_move(-1),
                KeyCode::Enter => {
                    if let Some(post) = self.modal.archive_selected() {
                        let target = Target::ArchiveItem(post.id.clone());
                        return self.apply(dispatch::on_click(&target));
                    }
                }
                _ => return Ok(()),
            }
            self.mark_dirty();
            return Ok(());
        }

        match code {
            KeyCode::Down | KeyCode::Char('j') => self.modal.scroll_by(1),
            KeyCode::Up | KeyCode::Char('k') => self.modal.scroll_by(-1),
            KeyCode::PageDown => self.modal.scroll_by(10),
            KeyCode::PageUp => self.modal.scroll_by(-10),
            KeyCode::Char(' ') => {
                if let Some(post) = self.modal.current_post() {
                    let target = Target::NarrationToggle(post.id.clone());
                    return self.apply(dispatch::on_click(&target));
                }
            }
            _ => return Ok(()),
        }
        self.mark_dirty();
        Ok(())
    }

    fn handle_grid_key(&mut self, code: KeyCode) -> Result<()> {
        let columns = self.columns.max(1) as isize;
        match code {
            KeyCode::Left | KeyCode::Char('h') => self.move_selection(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-columns),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(columns),
            KeyCode::Enter => {
                let target = self.target_at(self.selected);
                self.apply(dispatch::on_click(&target))?;
            }
            KeyCode::Char(' ') => {
                if let Target::Card(id) = self.target_at(self.selected) {
                    self.apply(dispatch::on_click(&Target::NarrationToggle(id)))?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Result<()> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let target = self.hit_test(event.column, event.row);
                if let Target::Card(id) = &target {
                    if let Some(index) = self.cards.iter().position(|card| &card.post.id == id) {
                        self.selected = index;
                    }
                }
                self.apply(dispatch::on_click(&target))
            }
            MouseEventKind::ScrollDown if self.modal.is_open() => {
                self.handle_overlay_key(KeyCode::Down)
            }
            MouseEventKind::ScrollUp if self.modal.is_open() => {
                self.handle_overlay_key(KeyCode::Up)
            }
            _ => Ok(()),
        }
    }

    fn hit_test(&self, column: u16, row: u16) -> Target {
        let inside = |rect: Option<Rect>| {
            rect.is_some_and(|r| {
                column >= r.x && column < r.right() && row >= r.y && row < r.bottom()
            })
        };
        if inside(self.language_area) {
            return Target::LanguageToggle;
        }

        if let (true, Some(area)) = (self.modal.is_open(), self.overlay_area) {
            let target = dispatch::overlay_hit(area, self.close_area, column, row);
            if target != Target::ModalContent {
                return target;
            }
            if let Some(post) = self.modal.current_post() {
                if inside(self.control_area) {
                    return Target::NarrationToggle(post.id.clone());
                }
                return target;
            }
            let Some(inner) = self.overlay_inner else {
                return target;
            };
            if row < inner.y || row >= inner.bottom() {
                return target;
            }
            let line = usize::from(row - inner.y) + usize::from(self.modal.scroll_offset());
            if let Some(post) = self.modal.archive_post_at(line) {
                return Target::ArchiveItem(post.id.clone());
            }
            return target;
        }

        if inside(self.banner_close_area) {
            return Target::BannerClose;
        }
        dispatch::grid_hit(&self.grid_cells, column, row)
    }

    fn footer_text(&self) -> String {
        i18n::text(self.language, "help_keys").to_string()
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let banner_height = if self.banner.as_ref().and_then(Banner::current).is_some() {
            1
        } else {
            0
        };
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(banner_height),
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(full);

        self.draw_header(frame, layout[0]);
        self.draw_banner(frame, layout[1]);

        let subtitle = Paragraph::new(i18n::text(self.language, "blog_subtitle").to_string())
            .style(Style::default().fg(COLOR_TEXT_SECONDARY))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(subtitle, layout[2]);

        self.draw_grid(frame, layout[3]);

        let status = Paragraph::new(self.status_message.clone()).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status, layout[4]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[5]);

        if self.modal.is_open() {
            self.draw_overlay(frame, layout[3]);
        } else {
            self.overlay_area = None;
            self.overlay_inner = None;
            self.close_area = None;
            self.control_area = None;
        }
    }

    fn draw_header(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let toggle = format!("[ {} ]", self.language.code().to_uppercase());
        let toggle_width = UnicodeWidthStr::width(toggle.as_str()) as u16;
        let title = Paragraph::new(Line::from(Span::styled(
            i18n::text(self.language, "blog_title").to_string(),
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(title, area);

        let toggle_area = Rect {
            x: area.right().saturating_sub(toggle_width),
            y: area.y,
            width: toggle_width.min(area.width),
            height: area.height.min(1),
        };
        frame.render_widget(
            Paragraph::new(toggle).style(Style::default().fg(COLOR_TEXT_SECONDARY)),
            toggle_area,
        );
        self.language_area = Some(toggle_area);
    }

    fn draw_banner(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let Some(content) = self.banner.as_ref().and_then(Banner::current) else {
            self.banner_close_area = None;
            return;
        };
        let color = match content.kind {
            BannerKind::Festival => COLOR_FESTIVAL,
            BannerKind::Mission => COLOR_SUCCESS,
        };
        let line = Line::from(vec![
            Span::raw(format!("{} ", content.icon)),
            Span::styled(
                format!("{}: ", content.heading),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(content.text, Style::default().fg(COLOR_TEXT_PRIMARY)),
        ]);
        frame.render_widget(
            Paragraph::new(line)
                .alignment(Alignment::Center)
                .style(Style::default().bg(COLOR_PANEL_BG)),
            area,
        );

        let close_width = BANNER_CLOSE_LABEL.len() as u16;
        let close = Rect {
            x: area.right().saturating_sub(close_width),
            y: area.y,
            width: close_width.min(area.width),
            height: area.height,
        };
        frame.render_widget(
            Paragraph::new(BANNER_CLOSE_LABEL)
                .style(Style::default().fg(COLOR_TEXT_SECONDARY).bg(COLOR_PANEL_BG)),
            close,
        );
        self.banner_close_area = Some(close);
    }

    fn draw_grid(&mut self, frame: &mut Frame<'_>, area: Rect) {
        self.columns = grid_columns(area.width);
        let visible_rows = usize::from((area.height / CARD_HEIGHT).max(1));
        let selected_row = self.selected / self.columns;
        if selected_row < self.grid_offset {
            self.grid_offset = selected_row;
        } else if selected_row >= self.grid_offset + visible_rows {
            self.grid_offset = selected_row + 1 - visible_rows;
        }

        self.grid_cells.clear();
        for (index, rect) in grid_layout(area, self.cell_count(), self.columns, self.grid_offset) {
            let focused = index == self.selected;
            let text = match self.cards.get(index) {
                Some(card) => self.card_text(card),
                None => self.archive_cell_text(),
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if focused {
                    COLOR_BORDER_FOCUSED
                } else {
                    COLOR_BORDER_IDLE
                }))
                .style(Style::default().bg(if focused {
                    COLOR_PANEL_FOCUSED_BG
                } else {
                    COLOR_PANEL_BG
                }));
            frame.render_widget(
                Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
                rect,
            );
            let target = self.target_at(index);
            self.grid_cells.push((rect, target));
        }
    }

    fn card_text(&self, card: &Card) -> Text<'static> {
        let post = &card.post;
        let control = if self.playback.lock().is_playing(&post.id) {
            i18n::text(self.language, "stop")
        } else {
            i18n::text(self.language, "listen")
        };
        Text::from(vec![
            Line::from(Span::styled(
                post.category.clone(),
                Style::default().fg(COLOR_ACCENT),
            )),
            Line::from(Span::styled(
                post.title.clone(),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("📅 {}", post.date),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
            Line::from(Span::styled(
                format!("🖼 {}", file_label(&card.image)),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
            Line::from(post.excerpt.clone()),
            Line::from(vec![
                Span::styled(
                    i18n::text(self.language, "read_more").to_string(),
                    Style::default().fg(COLOR_ACCENT),
                ),
                Span::raw("  "),
                Span::styled(control.to_string(), Style::default().fg(COLOR_SUCCESS)),
            ]),
        ])
    }

    fn archive_cell_text(&self) -> Text<'static> {
        Text::from(vec![
            Line::from(Span::styled(
                format!("📚 {}", i18n::text(self.language, "archives")),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                i18n::text(self.language, "archives_hint").to_string(),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
            Line::default(),
            Line::from(format!(
                "{} / {}",
                self.archive.post_count(),
                self.archive.len()
            )),
        ])
    }

    fn draw_overlay(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let popup_area = centered_rect(80, 85, area);
        frame.render_widget(Clear, popup_area);

        let close_label = format!("[✕ {}]", i18n::text(self.language, "close"));
        let close_width = UnicodeWidthStr::width(close_label.as_str()) as u16;
        let block = Block::default()
            .title(Span::styled(
                self.modal.title(self.language),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .title(
                Title::from(Span::styled(
                    close_label,
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ))
                .alignment(Alignment::Right),
            )
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let mut content_area = inner;
        self.control_area = None;
        if let Some(header) = self.modal.header(self.language) {
            let header_height = modal::POST_HEADER_ROWS.min(inner.height);
            let header_area = Rect {
                height: header_height,
                ..inner
            };
            frame.render_widget(Paragraph::new(header), header_area);
            if modal::NARRATION_CONTROL_ROW < header_height {
                let label = self.modal.control_text(self.language);
                self.control_area = Some(Rect {
                    x: inner.x,
                    y: inner.y + modal::NARRATION_CONTROL_ROW,
                    width: (UnicodeWidthStr::width(label.as_str()) as u16).min(inner.width),
                    height: 1,
                });
            }
            content_area = Rect {
                y: inner.y + header_height,
                height: inner.height - header_height,
                ..inner
            };
        }

        let mut body = Paragraph::new(self.modal.render(self.language))
            .scroll((self.modal.scroll_offset(), 0));
        if !self.modal.showing_archive() {
            body = body.wrap(Wrap { trim: false });
        }
        frame.render_widget(body, content_area);

        self.overlay_area = Some(popup_area);
        self.overlay_inner = Some(content_area);
        self.close_area = Some(Rect {
            x: popup_area.right().saturating_sub(close_width + 1),
            y: popup_area.y,
            width: close_width,
            height: 1,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::mock::MockBackend;
    use crate::playback::{Backend, Controller};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn post(id: &str, category: &str) -> Post {
        Post {
            id: id.into(),
            title: format!("Title {id}"),
            category: category.into(),
            content: format!("<p>Body {id}</p>"),
            ..Post::default()
        }
    }

    fn model(backend: &Arc<MockBackend>, store: Option<storage::Store>) -> Model {
        let backend: Arc<dyn Backend> = backend.clone();
        let posts = post::Store::from_posts(
            vec![
                post("a", "Health"),
                post("b", "Agriculture"),
                post("c", "Health"),
                post("d", "Education"),
            ],
            true,
        );
        Model::new(Options {
            posts,
            featured_cap: 2,
            manifest: Manifest::new("/nonexistent", HashMap::new()),
            resolver: Resolver::new("/nonexistent/headers"),
            playback: Controller::shared(Some(backend)),
            banner: None,
            language: Language::En,
            store,
            status_message: String::new(),
        })
    }

    #[test]
    fn featured_cards_and_archive_cell() {
        let backend = Arc::new(MockBackend::default());
        let model = model(&backend, None);
        assert_eq!(model.cards.len(), 2);
        assert_eq!(model.target_at(0), Target::Card("a".into()));
        assert_eq!(model.target_at(2), Target::ArchiveEntry);
        assert_eq!(model.archive.post_count(), 2);
    }

    #[test]
    fn missing_infographic_swaps_to_category_header() {
        let backend = Arc::new(MockBackend::default());
        let model = model(&backend, None);
        assert!(model.cards[0].image.fell_back());
        assert_eq!(file_label(&model.cards[0].image), "health.png");
        assert_eq!(file_label(&model.cards[1].image), "agriculture.png");
    }

    #[test]
    fn enter_opens_selected_card_and_escape_closes() {
        let backend = Arc::new(MockBackend::default());
        let mut model = model(&backend, None);
        model.handle_key(KeyCode::Right).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.modal.current_post().unwrap().id, "b");
        model.handle_key(KeyCode::Esc).unwrap();
        assert!(!model.modal.is_open());
    }

    #[test]
    fn selection_is_clamped() {
        let backend = Arc::new(MockBackend::default());
        let mut model = model(&backend, None);
        model.handle_key(KeyCode::Left).unwrap();
        assert_eq!(model.selected, 0);
        for _ in 0..5 {
            model.handle_key(KeyCode::Right).unwrap();
        }
        assert_eq!(model.selected, 2);
        model.handle_key(KeyCode::Enter).unwrap();
        assert!(model.modal.showing_archive());
    }

    #[test]
    fn archive_enter_opens_selected_post() {
        let backend = Arc::new(MockBackend::default());
        let mut model = model(&backend, None);
        model.apply(Action::OpenArchiveIndex).unwrap();
        model.handle_key(KeyCode::Down).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.modal.current_post().unwrap().id, "d");
    }

    #[test]
    fn card_narration_stops_when_another_post_opens() {
        let backend = Arc::new(MockBackend::default());
        let mut model = model(&backend, None);
        model.handle_key(KeyCode::Char(' ')).unwrap();
        assert!(model.playback.lock().is_playing("a"));

        model.apply(Action::OpenPost("b".into())).unwrap();
        assert_eq!(
            backend.entries(),
            ["speak:Title a. Body a", "stop:speech:Title a. Body a"]
        );
        assert_eq!(model.modal.current_post().unwrap().id, "b");
        assert!(model.playback.lock().active_owner().is_none());
    }

    #[test]
    fn modal_narration_uses_shared_controller() {
        let backend = Arc::new(MockBackend::default());
        let mut model = model(&backend, None);
        model.apply(Action::OpenPost("a".into())).unwrap();
        model.handle_key(KeyCode::Char(' ')).unwrap();
        assert!(model.modal.is_narrating());
        assert_eq!(model.status_message, "Reading Title a aloud");
        model.handle_key(KeyCode::Char(' ')).unwrap();
        assert!(!model.modal.is_narrating());
        assert_eq!(model.status_message, "Stopped Title a");
    }

    #[test]
    fn unknown_post_reports_status() {
        let backend = Arc::new(MockBackend::default());
        let mut model = model(&backend, None);
        model.apply(Action::OpenPost("zzz".into())).unwrap();
        assert!(!model.modal.is_open());
        assert_eq!(model.status_message, "Post zzz not found");
    }

    #[test]
    fn clicks_route_through_dispatcher() {
        let backend = Arc::new(MockBackend::default());
        let mut model = model(&backend, None);
        model.grid_cells = vec![
            (Rect::new(0, 0, 20, 10), Target::Card("a".into())),
            (Rect::new(20, 0, 20, 10), Target::Card("b".into())),
        ];
        let click = |column, row| MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: crossterm::event::KeyModifiers::NONE,
        };

        model.handle_mouse(click(25, 3)).unwrap();
        assert_eq!(model.modal.current_post().unwrap().id, "b");
        assert_eq!(model.selected, 1);

        model.overlay_area = Some(Rect::new(10, 2, 40, 20));
        model.overlay_inner = Some(Rect::new(11, 8, 38, 13));
        model.close_area = Some(Rect::new(40, 2, 9, 1));
        model.control_area = Some(Rect::new(11, 6, 14, 1));

        model.handle_mouse(click(20, 12)).unwrap();
        assert!(model.modal.is_open());
        model.handle_mouse(click(12, 6)).unwrap();
        assert!(model.modal.is_narrating());
        model.handle_mouse(click(1, 1)).unwrap();
        assert!(!model.modal.is_open());
        assert!(backend.entries().iter().any(|e| e.starts_with("stop:")));
    }

    #[test]
    fn narration_control_stays_clickable_under_long_title() {
        let backend = Arc::new(MockBackend::default());
        let dyn_backend: Arc<dyn Backend> = backend.clone();
        let mut model = Model::new(Options {
            posts: post::Store::builtin(true).unwrap(),
            featured_cap: 4,
            manifest: Manifest::new("/nonexistent", HashMap::new()),
            resolver: Resolver::new("/nonexistent/headers"),
            playback: Controller::shared(Some(dyn_backend)),
            banner: None,
            language: Language::En,
            store: None,
            status_message: String::new(),
        });
        model
            .apply(Action::OpenPost("post-20251209-891".into()))
            .unwrap();

        let mut terminal = Terminal::new(ratatui::backend::TestBackend::new(80, 30)).unwrap();
        terminal.draw(|frame| model.draw(frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let popup = model.overlay_area.unwrap();
        let row_text = |y: u16| -> String {
            (popup.x..popup.right())
                .map(|x| buffer.get(x, y).symbol().to_string())
                .collect()
        };
        let listen_row = (popup.y..popup.bottom())
            .find(|&y| row_text(y).contains("Listen"))
            .unwrap();
        let title_row = (popup.y..popup.bottom())
            .find(|&y| row_text(y).contains("Empowering Her Future"))
            .unwrap();
        assert_eq!(listen_row, title_row + 2);
        let control = model.control_area.unwrap();
        assert_eq!(control.y, listen_row);

        let click = |column, row| MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: crossterm::event::KeyModifiers::NONE,
        };
        model.handle_mouse(click(control.x + 2, listen_row - 1)).unwrap();
        assert!(!model.modal.is_narrating());
        model.handle_mouse(click(control.x + 2, listen_row)).unwrap();
        assert!(model.modal.is_narrating());
        assert!(model.modal.is_open());
    }

    #[test]
    fn language_toggle_is_persisted() {
        let dir = tempdir().unwrap();
        let store = storage::Store::open(storage::Options {
            path: Some(dir.path().join("state.db")),
        })
        .unwrap();
        let backend = Arc::new(MockBackend::default());
        let mut model = model(&backend, Some(store.clone()));
        model.handle_key(KeyCode::Char('L')).unwrap();
        assert_eq!(model.language, Language::Hi);
        assert_eq!(store.language().unwrap(), Some(Language::Hi));
        assert_eq!(model.status_message, "भाषा: हिन्दी");
    }

    #[test]
    fn banner_dismissal() {
        let backend = Arc::new(MockBackend::default());
        let mut model = model(&backend, None);
        model.banner = Some(Banner::with_start(
            chrono::NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            Duration::from_secs(8),
            0,
        ));
        model.handle_key(KeyCode::Char('b')).unwrap();
        assert!(model.banner.as_ref().unwrap().current().is_none());
    }

    #[test]
    fn grid_layout_wraps_rows_and_clips() {
        let area = Rect::new(0, 0, 80, 25);
        let cells = grid_layout(area, 5, 2, 0);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[1].1, Rect::new(40, 0, 40, CARD_HEIGHT));
        assert_eq!(cells[2].1, Rect::new(0, CARD_HEIGHT, 40, CARD_HEIGHT));

        let scrolled = grid_layout(area, 5, 2, 1);
        assert_eq!(scrolled[0].0, 2);
        assert_eq!(scrolled[0].1.y, 0);
        assert_eq!(grid_columns(50), 1);
        assert_eq!(grid_columns(80), 2);
        assert_eq!(grid_columns(130), 3);
    }
}
