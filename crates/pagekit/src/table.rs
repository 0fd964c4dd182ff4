//! Server-paginated table widget.
//!
//! Rows are one window of a larger server-side result set. Cursor movement
//! scrolls within the loaded window; [`DataTable::page_forward`] and
//! [`DataTable::page_back`] move the window itself and the owner refetches.

use std::fmt::Write as _;

use crossterm::style::Stylize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// A table column: header title and fixed display width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub title: String,
    pub width: usize,
}

impl Column {
    #[must_use]
    pub fn new(title: impl Into<String>, width: usize) -> Self {
        Self {
            title: title.into(),
            width,
        }
    }
}

/// A single row of pre-rendered cells.
pub type Row = Vec<String>;

/// A scrollable table over one server page of rows.
#[derive(Debug, Default)]
pub struct DataTable {
    columns: Vec<Column>,
    rows: Vec<Row>,
    cursor: usize,
    scroll: usize,
    height: usize,
    focus: bool,
    loading: bool,
    total: u64,
    window_start: usize,
    window_len: usize,
}

impl DataTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            height: 10,
            window_len: 25,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    /// Body rows shown at once, excluding the header line.
    #[must_use]
    pub fn height(mut self, height: usize) -> Self {
        self.height = height.max(1);
        self
    }

    /// Server-side window length used for paging.
    #[must_use]
    pub fn window_len(mut self, len: usize) -> Self {
        self.window_len = len.max(1);
        self
    }

    /// Re-sizes the visible body on a terminal resize.
    pub fn set_height(&mut self, height: usize) {
        self.height = height.max(1);
        self.clamp_scroll();
    }

    #[must_use]
    pub fn focused(mut self, focus: bool) -> Self {
        self.focus = focus;
        self
    }

    pub fn focus(&mut self) {
        self.focus = true;
    }

    pub fn blur(&mut self) {
        self.focus = false;
    }

    /// Installs a freshly loaded window of rows. The cursor clamps to the new
    /// row count and the loading marker clears.
    pub fn set_rows(&mut self, rows: Vec<Row>, total: u64) {
        self.rows = rows;
        self.total = total;
        self.loading = false;
        if self.cursor >= self.rows.len() {
            self.cursor = self.rows.len().saturating_sub(1);
        }
        self.clamp_scroll();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.cursor)
    }

    pub fn move_up(&mut self, n: usize) {
        self.cursor = self.cursor.saturating_sub(n);
        self.clamp_scroll();
    }

    pub fn move_down(&mut self, n: usize) {
        if self.rows.is_empty() {
            return;
        }
        self.cursor = (self.cursor + n).min(self.rows.len() - 1);
        self.clamp_scroll();
    }

    pub fn goto_top(&mut self) {
        self.cursor = 0;
        self.clamp_scroll();
    }

    pub fn goto_bottom(&mut self) {
        self.cursor = self.rows.len().saturating_sub(1);
        self.clamp_scroll();
    }

    /// Moves the server window forward one page. Returns `true` when the
    /// window moved, in which case the owner should refetch.
    pub fn page_forward(&mut self) -> bool {
        let next = self.window_start + self.window_len;
        if (next as u64) < self.total {
            self.window_start = next;
            self.cursor = 0;
            self.scroll = 0;
            true
        } else {
            false
        }
    }

    /// Moves the server window back one page. Returns `true` when the window
    /// moved.
    pub fn page_back(&mut self) -> bool {
        if self.window_start == 0 {
            return false;
        }
        self.window_start = self.window_start.saturating_sub(self.window_len);
        self.cursor = 0;
        self.scroll = 0;
        true
    }

    #[must_use]
    pub const fn window_start(&self) -> usize {
        self.window_start
    }

    /// One-line summary of the loaded window.
    #[must_use]
    pub fn status_line(&self) -> String {
        if self.total == 0 {
            return if self.loading {
                "loading...".to_owned()
            } else {
                "no rows".to_owned()
            };
        }
        let first = self.window_start + 1;
        let last = self.window_start + self.rows.len();
        let mut line = format!("rows {first}-{last} of {}", self.total);
        if self.loading {
            line.push_str("  (refreshing)");
        }
        line
    }

    /// Renders the header plus the visible slice of body rows.
    #[must_use]
    pub fn view(&self) -> String {
        let mut out = String::new();
        let header = self
            .columns
            .iter()
            .map(|c| pad(&c.title, c.width))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{}", header.bold());
        for (i, row) in self
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(self.height)
        {
            let line = self
                .columns
                .iter()
                .enumerate()
                .map(|(c, col)| pad(row.get(c).map_or("", String::as_str), col.width))
                .collect::<Vec<_>>()
                .join("  ");
            if i == self.cursor && self.focus {
                let _ = writeln!(out, "{}", line.reverse());
            } else {
                let _ = writeln!(out, "{line}");
            }
        }
        out
    }

    fn clamp_scroll(&mut self) {
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + self.height {
            self.scroll = self.cursor + 1 - self.height;
        }
    }
}

/// Pads or truncates `s` to an exact display width, unicode-aware.
#[must_use]
pub fn pad(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    if w == width {
        return s.to_owned();
    }
    if w < width {
        let mut out = String::with_capacity(s.len() + (width - w));
        out.push_str(s);
        out.extend(std::iter::repeat_n(' ', width - w));
        return out;
    }
    truncate_width(s, width)
}

fn truncate_width(s: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > width.saturating_sub(1) {
            break;
        }
        used += cw;
        out.push(ch);
    }
    out.push('…');
    used += 1;
    while used < width {
        out.push(' ');
        used += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<Row> {
        (0..n).map(|i| vec![format!("row{i}"), i.to_string()]).collect()
    }

    fn table_with(n: usize, total: u64) -> DataTable {
        let mut t = DataTable::new()
            .columns(vec![Column::new("Name", 8), Column::new("N", 4)])
            .height(5)
            .window_len(25)
            .focused(true);
        t.set_rows(rows(n), total);
        t
    }

    // =========================================================================
    // Cursor and scrolling
    // =========================================================================

    #[test]
    fn cursor_clamps_when_rows_shrink() {
        let mut t = table_with(10, 10);
        t.goto_bottom();
        assert_eq!(t.cursor(), 9);
        t.set_rows(rows(3), 3);
        assert_eq!(t.cursor(), 2);
        t.set_rows(vec![], 0);
        assert_eq!(t.cursor(), 0);
        assert!(t.selected_row().is_none());
    }

    #[test]
    fn movement_stays_in_bounds() {
        let mut t = table_with(4, 4);
        t.move_up(10);
        assert_eq!(t.cursor(), 0);
        t.move_down(2);
        assert_eq!(t.cursor(), 2);
        t.move_down(10);
        assert_eq!(t.cursor(), 3);
    }

    #[test]
    fn viewport_follows_the_cursor() {
        let mut t = table_with(20, 20);
        t.move_down(9);
        let view = t.view();
        assert!(view.contains("row9"));
        assert!(!view.contains("row0 "));
        t.goto_top();
        assert!(t.view().contains("row0"));
    }

    // =========================================================================
    // Window paging
    // =========================================================================

    #[test]
    fn paging_moves_the_window_within_the_total() {
        let mut t = table_with(25, 60);
        assert!(t.page_forward());
        assert_eq!(t.window_start(), 25);
        assert!(t.page_forward());
        assert_eq!(t.window_start(), 50);
        assert!(!t.page_forward(), "past the last page");
        assert!(t.page_back());
        assert!(t.page_back());
        assert_eq!(t.window_start(), 0);
        assert!(!t.page_back());
    }

    #[test]
    fn paging_resets_the_cursor() {
        let mut t = table_with(25, 60);
        t.goto_bottom();
        t.page_forward();
        assert_eq!(t.cursor(), 0);
    }

    // =========================================================================
    // Status line
    // =========================================================================

    #[test]
    fn status_line_summarizes_the_window() {
        let mut t = table_with(25, 60);
        assert_eq!(t.status_line(), "rows 1-25 of 60");
        t.page_forward();
        t.set_rows(rows(25), 60);
        assert_eq!(t.status_line(), "rows 26-50 of 60");
        t.set_loading(true);
        assert!(t.status_line().ends_with("(refreshing)"));
    }

    #[test]
    fn empty_table_status() {
        let mut t = table_with(0, 0);
        assert_eq!(t.status_line(), "no rows");
        t.set_loading(true);
        assert_eq!(t.status_line(), "loading...");
    }

    // =========================================================================
    // Width handling
    // =========================================================================

    #[test]
    fn pad_fills_to_exact_width() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcd", 4), "abcd");
    }

    #[test]
    fn pad_truncates_with_ellipsis() {
        assert_eq!(pad("abcdef", 4), "abc…");
    }

    #[test]
    fn pad_is_unicode_width_aware() {
        // Wide characters count double.
        assert_eq!(UnicodeWidthStr::width(pad("日本語", 4).as_str()), 4);
        assert_eq!(UnicodeWidthStr::width(pad("日本語", 8).as_str()), 8);
    }

    #[test]
    fn missing_cells_render_empty() {
        let mut t = DataTable::new()
            .columns(vec![Column::new("A", 3), Column::new("B", 3)])
            .height(3);
        t.set_rows(vec![vec!["x".to_owned()]], 1);
        let view = t.view();
        assert!(view.contains("x  "));
    }
}
