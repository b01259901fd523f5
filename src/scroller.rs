use unicode_width::UnicodeWidthStr;

/// Layout and window geometry. Owned by the presentation layer; changing it
/// means building a fresh scroller.
#[derive(Clone, Copy, Debug)]
pub struct ScrollerConfig {
    /// Height of one laid-out line in display units (pixels, rows).
    pub line_height: u32,
    /// Lines visible in the window at once.
    pub visible_lines: usize,
    /// Wrap width in display columns.
    pub max_columns: usize,
}

impl Default for ScrollerConfig {
    fn default() -> Self {
        Self {
            line_height: 40,
            visible_lines: 3,
            max_columns: 60,
        }
    }
}

/// Derived view over the word stream: wraps words into fixed-height lines and
/// maps the active word to a vertical offset that keeps its line inside the
/// window, with one line of context above once scrolling has begun. Purely
/// presentational; a wrong offset can never touch scoring.
#[derive(Debug)]
pub struct ViewportScroller {
    config: ScrollerConfig,
    /// Line index per word, filled append-only as the stream grows.
    line_of_word: Vec<usize>,
    cursor_columns: usize,
    fill_line: usize,
    active_line: usize,
    offset: u32,
}

impl ViewportScroller {
    pub fn new(config: ScrollerConfig) -> Self {
        Self {
            config,
            line_of_word: Vec::new(),
            cursor_columns: 0,
            fill_line: 0,
            active_line: 0,
            offset: 0,
        }
    }

    /// Lay out any words not seen yet. Safe to call repeatedly with the same
    /// growing slice; already-laid-out words never move.
    pub fn layout(&mut self, words: &[String]) {
        for word in words.iter().skip(self.line_of_word.len()) {
            let columns = word.width() + 1; // trailing space
            if self.cursor_columns > 0 && self.cursor_columns + columns > self.config.max_columns {
                self.fill_line += 1;
                self.cursor_columns = 0;
            }
            self.line_of_word.push(self.fill_line);
            self.cursor_columns += columns;
        }
    }

    /// Offset for the given active word. Only recomputed when the word sits
    /// on a different line than the previous call saw.
    pub fn on_word_index(&mut self, word_index: usize) -> u32 {
        let line = self
            .line_of_word
            .get(word_index)
            .or_else(|| self.line_of_word.last())
            .copied()
            .unwrap_or(0);

        if line != self.active_line {
            self.active_line = line;
            let context = self.config.visible_lines.saturating_sub(1).min(1);
            let scrolled_lines = line.saturating_sub(context);
            self.offset = scrolled_lines as u32 * self.config.line_height;
        }
        self.offset
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn line_of(&self, word_index: usize) -> Option<usize> {
        self.line_of_word.get(word_index).copied()
    }

    pub fn line_count(&self) -> usize {
        if self.line_of_word.is_empty() {
            0
        } else {
            self.fill_line + 1
        }
    }
}
