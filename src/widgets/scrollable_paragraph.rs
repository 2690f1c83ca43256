use unicode_width::UnicodeWidthStr;

#[derive(Debug, Default, Clone)]
pub struct ScrollableParagraphState {
    pub content: String,
    pub scroll_offset_vertical: u16,
    // Inner size of the panel from the last layout pass.
    pub width: u16,
    pub height: u16,
}

impl ScrollableParagraphState {
    pub fn new(content: String) -> Self {
        Self { content, ..Self::default() }
    }

    /// Replaces the text. Scroll only resets when the text actually changed,
    /// so re-rendering the same event every tick keeps the reader's place.
    pub fn set_content(&mut self, content: String) {
        if content != self.content {
            self.content = content;
            self.scroll_offset_vertical = 0;
        }
    }

    pub fn set_dimensions(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.scroll_offset_vertical = self.scroll_offset_vertical.min(self.max_scroll());
    }

    /// Rough count of rows the content needs once wrapped to `width`.
    /// CJK characters are double width, so this goes by display width.
    pub fn wrapped_line_count(&self) -> u16 {
        let width: usize = usize::from(self.width.max(1));
        let rows: usize = self
            .content
            .lines()
            .map(|line| UnicodeWidthStr::width(line).div_ceil(width).max(1))
            .sum();
        u16::try_from(rows).unwrap_or(u16::MAX)
    }

    pub fn max_scroll(&self) -> u16 {
        self.wrapped_line_count().saturating_sub(self.height)
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll_offset_vertical = self.scroll_offset_vertical.saturating_sub(amount);
    }

    pub fn scroll_down(&mut self, amount: u16) {
        self.scroll_offset_vertical =
            self.scroll_offset_vertical.saturating_add(amount).min(self.max_scroll());
    }
}
