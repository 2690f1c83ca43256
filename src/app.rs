use crate::browser::LinkOpener;
use crate::errors::FailureKind;
use crate::history::{HistoricalEvent, RelatedLink};
use crate::history_manager::HistoryManager;
use crate::widgets::scrollable_paragraph::ScrollableParagraphState;
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, info, warn};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use ratatui::{Terminal, backend::Backend};
use std::io;
use std::sync::Arc;
use std::time::Duration;

pub const LOADING_TEXT: &str = "正在加载历史事件…";
pub const FETCH_FAILED_TEXT: &str = "获取历史上的今天信息失败，请稍后重试。";
pub const PARSE_FAILED_TEXT: &str = "数据解析失败，请稍后重试。";
pub const LINKS_PENDING_TEXT: &str = "正在获取相关链接…";
pub const NO_LINKS_TEXT: &str = "暂无相关链接。";

/// Where the consumer stands relative to the manager's queue.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DisplayState {
    /// Asked for an event and have not received one. `since_cycle` is the
    /// manager's completed-cycle count at the time of asking.
    Waiting { since_cycle: u64 },
    Showing,
    /// A cycle finished after we asked and nothing new arrived.
    Exhausted,
    Failed(FailureKind),
}

pub struct App {
    pub should_quit: bool,
    manager: Arc<HistoryManager>,
    opener: Box<dyn LinkOpener>,
    pub state: DisplayState,
    pub current: Option<Arc<HistoricalEvent>>,
    pub shown_count: usize,
    pub event_text_state: ScrollableParagraphState,
    pub links_list_state: ListState,
    // Inner area of the links panel from the last layout pass, for mouse hits.
    pub links_area: Rect,
    pub status_message: Option<String>,
}

pub fn exhausted_text(date: NaiveDate) -> String {
    format!("今天是{}月{}日，暂无更多历史事件。", date.month(), date.day())
}

impl App {
    pub fn new(manager: Arc<HistoryManager>, opener: Box<dyn LinkOpener>) -> App {
        let since_cycle: u64 = manager.completed_cycles();
        App {
            should_quit: false,
            manager,
            opener,
            state: DisplayState::Waiting { since_cycle },
            current: None,
            shown_count: 0,
            event_text_state: ScrollableParagraphState::default(),
            links_list_state: ListState::default(),
            links_area: Rect::default(),
            status_message: None,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.manager.date()
    }

    pub fn is_loading(&self) -> bool {
        self.manager.is_loading()
    }

    pub fn known_count(&self) -> usize {
        self.manager.known_count()
    }

    pub fn current_links(&self) -> &[RelatedLink] {
        self.current.as_deref().map(HistoricalEvent::related_links).unwrap_or(&[])
    }

    // ====================================== Polling ==============================================

    /// Called once per tick. Only talks to the manager while waiting; links
    /// for the shown event are picked up by re-reading it.
    pub fn on_tick(&mut self) {
        if let DisplayState::Waiting { since_cycle } = self.state {
            // Checked before polling so an exhausted queue does not trigger
            // yet another refill.
            let finished: bool = !self.manager.is_loading()
                && self.manager.completed_cycles() > since_cycle
                && self.manager.pending_count() == 0;
            if finished {
                self.state = match self.manager.last_failure() {
                    Some(kind) => DisplayState::Failed(kind),
                    None => DisplayState::Exhausted,
                };
                info!("App: stopped waiting, state is now {:?}", self.state);
            } else if let Some(event) = self.manager.get_next_event() {
                self.show_event(event);
            }
        }

        if self.links_list_state.selected().is_none() && !self.current_links().is_empty() {
            self.links_list_state.select(Some(0));
        }
        self.update_event_text();
    }

    fn show_event(&mut self, event: Arc<HistoricalEvent>) {
        debug!("App: showing event from {}", event.year());
        self.current = Some(event);
        self.shown_count += 1;
        self.state = DisplayState::Showing;
        self.status_message = None;
        self.links_list_state = ListState::default();
    }

    /// Asks for another event. Also the retry path after failure or
    /// exhaustion: an empty queue makes the manager fetch again.
    pub fn request_next_event(&mut self) {
        self.state = DisplayState::Waiting { since_cycle: self.manager.completed_cycles() };
        self.status_message = None;
        self.on_tick();
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.state, DisplayState::Waiting { .. })
    }

    /// What the event panel shows when there is no event to show, or over
    /// the last one when we ran out.
    pub fn placeholder_text(&self) -> Option<String> {
        match self.state {
            DisplayState::Showing => None,
            DisplayState::Waiting { .. } if self.current.is_none() => Some(LOADING_TEXT.to_string()),
            DisplayState::Waiting { .. } => None,
            DisplayState::Exhausted => Some(exhausted_text(self.date())),
            DisplayState::Failed(FailureKind::Network) => Some(FETCH_FAILED_TEXT.to_string()),
            DisplayState::Failed(FailureKind::Parse) => Some(PARSE_FAILED_TEXT.to_string()),
        }
    }

    fn update_event_text(&mut self) {
        let text: String = match (&self.current, self.placeholder_text()) {
            (Some(event), None) => event.content().to_string(),
            (Some(event), Some(notice)) => format!("{}\n\n{}", event.content(), notice),
            (None, Some(notice)) => notice,
            (None, None) => String::new(),
        };
        self.event_text_state.set_content(text);
    }

    // ======================================= Links ===============================================

    pub fn select_next_link(&mut self) {
        let len: usize = self.current_links().len();
        if len == 0 {
            return;
        }
        let next: usize = self.links_list_state.selected().map_or(0, |i| (i + 1) % len);
        self.links_list_state.select(Some(next));
    }

    pub fn select_prev_link(&mut self) {
        let len: usize = self.current_links().len();
        if len == 0 {
            return;
        }
        let prev: usize = self.links_list_state.selected().map_or(len - 1, |i| (i + len - 1) % len);
        self.links_list_state.select(Some(prev));
    }

    pub fn open_link_at(&mut self, index: usize) {
        let Some(url) = self.current_links().get(index).map(|l| l.url().to_string()) else {
            return;
        };
        self.links_list_state.select(Some(index));
        self.status_message = Some(match self.opener.open_link(&url) {
            Ok(()) => format!("已打开: {}", url),
            Err(e) => {
                warn!("App: could not open {}: {}", url, e);
                format!("无法打开链接: {}", e)
            }
        });
    }

    pub fn open_selected_link(&mut self) {
        if let Some(index) = self.links_list_state.selected() {
            self.open_link_at(index);
        }
    }

    /// Maps a terminal cell to a row of the links list.
    pub fn link_index_at(&self, column: u16, row: u16) -> Option<usize> {
        let area: Rect = self.links_area;
        let inside: bool = column >= area.x
            && column < area.x.saturating_add(area.width)
            && row >= area.y
            && row < area.y.saturating_add(area.height);
        if !inside {
            return None;
        }
        let index: usize = self.links_list_state.offset() + usize::from(row - area.y);
        (index < self.current_links().len()).then_some(index)
    }

    pub fn on_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(index) = self.link_index_at(mouse.column, mouse.row) {
                    self.open_link_at(index);
                }
            }
            MouseEventKind::ScrollDown => self.event_text_state.scroll_down(1),
            MouseEventKind::ScrollUp => self.event_text_state.scroll_up(1),
            _ => {}
        }
    }

    // --- Key Handler ---
    pub fn on_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('n') | KeyCode::Char(' ') | KeyCode::Right | KeyCode::Char('r') => {
                self.request_next_event()
            }
            KeyCode::Down | KeyCode::Tab => self.select_next_link(),
            KeyCode::Up | KeyCode::BackTab => self.select_prev_link(),
            KeyCode::Enter => self.open_selected_link(),
            KeyCode::Char(c @ '1'..='9') => {
                if let Some(n) = c.to_digit(10) {
                    self.open_link_at(n as usize - 1);
                }
            }
            KeyCode::PageDown => self.event_text_state.scroll_down(5),
            KeyCode::PageUp => self.event_text_state.scroll_up(5),
            _ => {}
        }
    }
}

pub fn start_ui(mut app: App, tick: Duration) -> Result<()> {
    // Set up the terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_loop(&mut terminal, &mut app, tick);

    // Restore the terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

pub fn run_app_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, tick: Duration) -> Result<()> {
    while !app.should_quit {
        app.on_tick();

        let frame_size = terminal.get_frame().size(); // Fetch once before drawing
        crate::ui::prepare_ui_layout(app, frame_size);
        terminal.draw(|f| crate::ui::ui(f, app))?;

        if event::poll(tick)? {
            match event::read()? {
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    app.on_key(key_event.code)
                }
                Event::Mouse(mouse_event) => app.on_mouse(mouse_event),
                _ => {}
            }
        }
    }

    info!("App: quitting after {} events", app.shown_count);
    Ok(())
}
