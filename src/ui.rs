// src/ui.rs
use crate::app::{App, LINKS_PENDING_TEXT, NO_LINKS_TEXT};
use crate::history::{HistoricalEvent, RelatedLink};
use chrono::Datelike;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use std::rc::Rc;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const MAX_TITLE_WIDTH: usize = 30;
const HINT_TEXT: &str =
    "[n/Space] 下一条 | [r] 刷新 | [↑/↓] 选择链接 | [Enter/1-9/点击] 打开链接 | [PgUp/PgDn] 滚动 | [q] 退出";

pub struct LayoutChunks {
    pub header_chunk: Rect,
    pub event_chunk: Rect,
    pub links_chunk: Rect,
    pub hint_chunk: Rect,
}

pub fn compute_layout(frame_size: Rect) -> LayoutChunks {
    let main_chunks: Rc<[Rect]> = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(9), // five search results plus the fallback fit without scrolling
            Constraint::Length(1),
        ])
        .split(frame_size);

    LayoutChunks {
        header_chunk: main_chunks[0],
        event_chunk: main_chunks[1],
        links_chunk: main_chunks[2],
        hint_chunk: main_chunks[3],
    }
}

fn bordered(title: String, style: Style) -> Block<'static> {
    Block::default().title(title).borders(Borders::ALL).border_style(style)
}

/// Updates the size-dependent bits of `App` outside the draw closure.
pub fn prepare_ui_layout(app: &mut App, frame_size: Rect) {
    let layout_chunks: LayoutChunks = compute_layout(frame_size);
    let event_inner: Rect = Block::default().borders(Borders::ALL).inner(layout_chunks.event_chunk);
    app.event_text_state.set_dimensions(event_inner.width, event_inner.height);
    app.links_area = Block::default().borders(Borders::ALL).inner(layout_chunks.links_chunk);
}

pub fn year_label(year: i32) -> String {
    if year < 0 { format!("公元前{}年", year.unsigned_abs()) } else { format!("{}年", year) }
}

pub fn event_title(event: &HistoricalEvent) -> String {
    format!("历史上的{}的今天", year_label(event.year()))
}

pub fn hyperlink_style() -> Style {
    Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED)
}

/// Cuts `text` to at most `max_width` terminal columns, marking the cut.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    // One column goes to the ellipsis.
    let budget: usize = max_width.saturating_sub(1);
    let mut width: usize = 0;
    let mut out: String = String::new();
    for c in text.chars() {
        let w: usize = c.width().unwrap_or(0);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// `"{n}. {title}: "` followed by the URL as a hyperlink span.
pub fn link_line(index: usize, link: &RelatedLink) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("{}. {}: ", index + 1, truncate_to_width(link.title(), MAX_TITLE_WIDTH))),
        Span::styled(link.url().to_string(), hyperlink_style()),
    ])
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let layout_chunks: LayoutChunks = compute_layout(f.size());

    let default_style: Style = Style::default().fg(Color::White);
    let accent_style: Style = Style::default().fg(Color::Cyan);
    let selected_item_style: Style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    // ====================================== Header ===============================================
    let date = app.date();
    let mut header_spans: Vec<Span> = vec![
        Span::styled(
            format!("今天是{}月{}日", date.month(), date.day()),
            Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("   已读 {} · 已知 {}", app.shown_count, app.known_count()),
            default_style,
        ),
    ];
    if app.is_loading() {
        header_spans.push(Span::styled("   ⟳ 加载中…", accent_style));
    }
    let header_widget: Paragraph = Paragraph::new(Line::from(header_spans))
        .block(bordered("历史上的今天".to_string(), Style::default().fg(Color::Green)));
    f.render_widget(header_widget, layout_chunks.header_chunk);

    // ====================================== Event ================================================
    let event_panel_title: String =
        app.current.as_deref().map(event_title).unwrap_or_else(|| "历史上的今天".to_string());
    let event_widget: Paragraph = Paragraph::new(app.event_text_state.content.clone())
        .wrap(Wrap { trim: true })
        .style(default_style)
        .block(bordered(event_panel_title, accent_style))
        .scroll((app.event_text_state.scroll_offset_vertical, 0));
    f.render_widget(event_widget, layout_chunks.event_chunk);

    // ====================================== Links ================================================
    let links_block: Block = bordered("相关链接".to_string(), default_style);
    match app.current.as_deref() {
        Some(event) if !event.related_links().is_empty() => {
            let items: Vec<ListItem> = event
                .related_links()
                .iter()
                .enumerate()
                .map(|(i, link)| ListItem::new(link_line(i, link)))
                .collect();
            let list: List = List::new(items)
                .block(links_block)
                .highlight_style(selected_item_style)
                .highlight_symbol(">> ");
            f.render_stateful_widget(list, layout_chunks.links_chunk, &mut app.links_list_state);
        }
        Some(event) => {
            let notice: &str = if event.links_resolved() { NO_LINKS_TEXT } else { LINKS_PENDING_TEXT };
            let notice_widget: Paragraph =
                Paragraph::new(notice).style(Style::default().fg(Color::DarkGray)).block(links_block);
            f.render_widget(notice_widget, layout_chunks.links_chunk);
        }
        None => f.render_widget(links_block, layout_chunks.links_chunk),
    }

    // ====================================== Hint bar =============================================
    let (hint_text, hint_style): (String, Style) = match &app.status_message {
        Some(message) => (message.clone(), Style::default().fg(Color::Yellow)),
        None => (HINT_TEXT.to_string(), Style::default().fg(Color::DarkGray)),
    };
    let hint_widget: Paragraph =
        Paragraph::new(hint_text).style(hint_style).alignment(Alignment::Center);
    f.render_widget(hint_widget, layout_chunks.hint_chunk);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::RecordingOpener;
    use crate::history_manager::HistoryManager;
    use crate::testing::{ScriptedSource, StaticLinks, raw, session_date};
    use ratatui::{Terminal, backend::TestBackend, buffer::Buffer};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn rows(buffer: &Buffer) -> Vec<String> {
        let area = buffer.area;
        (area.y..area.y + area.height)
            .map(|y| (area.x..area.x + area.width).map(|x| buffer.get(x, y).symbol()).collect::<String>())
            .collect()
    }

    #[test]
    fn test_year_label_handles_bce() {
        assert_eq!(year_label(1969), "1969年");
        assert_eq!(year_label(-44), "公元前44年");
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
        // Each CJK character is two columns wide.
        assert_eq!(truncate_to_width("历史上的今天", 7), "历史上…");
        assert_eq!(truncate_to_width("历史上的今天", 12), "历史上的今天");
    }

    #[test]
    fn test_link_line_styles_url_as_hyperlink() {
        let line = link_line(0, &RelatedLink::new("NASA", "https://nasa.gov"));
        assert_eq!(line.spans.len(), 2);
        assert_eq!(line.spans[0].content, "1. NASA: ");
        assert_eq!(line.spans[1].content, "https://nasa.gov");
        assert_eq!(line.spans[1].style, hyperlink_style());
    }

    #[test]
    fn test_layout_gives_links_panel_fixed_height() {
        let chunks = compute_layout(Rect::new(0, 0, 80, 30));
        assert_eq!(chunks.header_chunk.height, 3);
        assert_eq!(chunks.links_chunk.height, 9);
        assert_eq!(chunks.hint_chunk.height, 1);
        assert_eq!(chunks.event_chunk.height, 17);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_renders_event_and_links() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![raw(
            1969,
            "Apollo 11 lands on the Moon",
            Some("https://zh.wikipedia.org/wiki/Apollo_11"),
        )])]));
        let manager = HistoryManager::new(
            session_date(),
            source,
            Arc::new(StaticLinks::empty()),
            Handle::current(),
        );
        let mut app = App::new(manager.clone(), Box::new(Arc::new(RecordingOpener::default())));

        for _ in 0..200 {
            app.on_tick();
            if app.current.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        manager.settle().await;
        app.on_tick();

        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        prepare_ui_layout(&mut app, Rect::new(0, 0, 100, 24));
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        let screen: Vec<String> = rows(terminal.backend().buffer());
        assert!(screen.iter().any(|row| row.contains("Apollo 11 lands on the Moon")));
        assert!(screen.iter().any(|row| row.contains("https://zh.wikipedia.org/wiki/Apollo_11")));
        assert_eq!(app.links_area, Rect::new(1, 15, 98, 7));
    }
}
