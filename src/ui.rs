use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

use timer_core::{Cue, TimerState};

use crate::screen::View;

const SCRAMBLE_MAX_LINES: u16 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.x
            && row >= self.y
            && u32::from(column) < u32::from(self.x) + u32::from(self.width)
            && u32::from(row) < u32::from(self.y) + u32::from(self.height)
    }
}

/// Screen regions for a terminal of `cols` x `rows`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub cols: u16,
    pub rows: u16,
    pub scramble: Rect,
    /// Timer panel; mouse presses inside it act as the trigger.
    pub panel: Rect,
    pub footer_row: u16,
}

impl Layout {
    pub fn new(cols: u16, rows: u16) -> Self {
        let inner_width = cols.saturating_sub(4);
        let scramble = Rect {
            x: 2,
            y: 3,
            width: inner_width,
            height: SCRAMBLE_MAX_LINES,
        };
        let panel_top = scramble.y + scramble.height + 1;
        let footer_row = rows.saturating_sub(2).max(panel_top);
        let panel = Rect {
            x: 2,
            y: panel_top,
            width: inner_width,
            height: footer_row.saturating_sub(panel_top + 1).max(3),
        };
        Self {
            cols,
            rows,
            scramble,
            panel,
            footer_row,
        }
    }
}

pub fn cue_color(cue: Cue) -> Color {
    match cue {
        Cue::None => Color::Cyan,
        Cue::Ready => Color::Green,
        Cue::Running => Color::White,
    }
}

/// Column at which `len` cells are centered inside `area`.
pub fn centered(area: Rect, len: usize) -> u16 {
    let len = u16::try_from(len).unwrap_or(u16::MAX);
    area.x + area.width.saturating_sub(len) / 2
}

/// Break a scramble into lines no wider than `width`, keeping moves whole.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.len() + 2 + word.len() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push_str("  ");
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn caption(state: TimerState, trigger: &str) -> String {
    match state {
        TimerState::Idle => format!("hold {trigger}, release to start"),
        TimerState::Prepare => "release to start".to_string(),
        TimerState::Running => format!("press {trigger} to stop"),
        TimerState::Stopped => format!("press {trigger} for a new scramble"),
    }
}

fn print_at<W: Write>(out: &mut W, column: u16, row: u16, text: &str) -> io::Result<()> {
    queue!(out, MoveTo(column, row), Print(text))
}

fn draw_frame<W: Write>(out: &mut W, area: Rect) -> io::Result<()> {
    if area.width < 2 || area.height < 2 {
        return Ok(());
    }
    let horizontal = "─".repeat(usize::from(area.width - 2));
    let bottom = area.y + area.height - 1;
    let right = area.x + area.width - 1;
    print_at(out, area.x, area.y, &format!("┌{horizontal}┐"))?;
    for row in area.y + 1..bottom {
        print_at(out, area.x, row, "│")?;
        print_at(out, right, row, "│")?;
    }
    print_at(out, area.x, bottom, &format!("└{horizontal}┘"))
}

pub fn draw_timer<W: Write>(
    out: &mut W,
    layout: &Layout,
    view: &View,
    state: TimerState,
    trigger: &str,
) -> io::Result<()> {
    queue!(out, Clear(ClearType::All))?;

    // Header
    let whole = Rect {
        x: 0,
        y: 0,
        width: layout.cols,
        height: layout.rows,
    };
    let title = "CUBE TIMER";
    queue!(out, SetAttribute(Attribute::Bold))?;
    print_at(out, centered(whole, title.len()), 1, title)?;
    queue!(out, SetAttribute(Attribute::Reset))?;

    // Scramble
    let lines = wrap_words(&view.scramble, usize::from(layout.scramble.width));
    for (i, line) in lines.iter().take(usize::from(layout.scramble.height)).enumerate() {
        let row = layout.scramble.y + i as u16;
        print_at(out, centered(layout.scramble, line.len()), row, line)?;
    }

    // Time display
    let panel = layout.panel;
    draw_frame(out, panel)?;
    let time_row = panel.y + panel.height / 2;
    queue!(out, SetForegroundColor(cue_color(view.cue)))?;
    if view.cue == Cue::Running {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    print_at(out, centered(panel, view.time.len()), time_row, &view.time)?;
    queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;

    let hint = caption(state, trigger);
    if time_row + 2 < panel.y + panel.height {
        queue!(out, SetAttribute(Attribute::Dim))?;
        print_at(out, centered(panel, hint.len()), time_row + 2, &hint)?;
        queue!(out, SetAttribute(Attribute::Reset))?;
    }

    // Footer
    print_at(out, 2, layout.footer_row, "?=help  q=quit")?;

    out.flush()
}

pub fn draw_help<W: Write>(out: &mut W, layout: &Layout, help_text: &str) -> io::Result<()> {
    queue!(out, Clear(ClearType::All))?;

    let mut row = 1u16;
    for (i, line) in help_text.lines().enumerate() {
        if row + 2 >= layout.rows {
            break;
        }
        if i == 0 {
            queue!(out, SetAttribute(Attribute::Bold))?;
            print_at(out, 2, row, line)?;
            queue!(out, SetAttribute(Attribute::Reset))?;
        } else {
            print_at(out, 2, row, line)?;
        }
        row += 1;
    }

    print_at(out, 2, layout.footer_row, "Press any key to close")?;
    out.flush()
}

pub fn draw_confirm_exit<W: Write>(out: &mut W, layout: &Layout) -> io::Result<()> {
    queue!(out, Clear(ClearType::All))?;

    let whole = Rect {
        x: 0,
        y: 0,
        width: layout.cols,
        height: layout.rows,
    };
    let title = "Timer Running";
    let body = "Quit and discard this solve? (y/n)";
    let row = layout.rows / 2;
    queue!(out, SetAttribute(Attribute::Bold))?;
    print_at(out, centered(whole, title.len()), row.saturating_sub(1), title)?;
    queue!(out, SetAttribute(Attribute::Reset))?;
    print_at(out, centered(whole, body.len()), row + 1, body)?;
    out.flush()
}
