//! TUI layer using ratatui and crossterm
//!
//! Draws the change tree on the left, the aligned diff columns on the right
//! and a footer with either the commit input or status messages.

use crate::app::{App, Focus, Mode};
use crate::diff::{DiffLine, LineKind};
use crate::git::GitClient;
use crate::status::BranchInfo;
use crate::syntax::{SyntaxHighlight, TextStyle};
use crate::tree::{Node, StagedStatus};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use unicode_width::UnicodeWidthChar;

const REMOVAL_BG: Color = Color::Rgb(60, 20, 20);
const ADDITION_BG: Color = Color::Rgb(20, 50, 20);
const BLANK_BG: Color = Color::Rgb(30, 30, 30);

/// Runs the TUI application
pub fn run<G: GitClient>(mut app: App<G>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.refresh();

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app<G: GitClient>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App<G>,
) -> Result<()> {
    loop {
        let size = terminal.size()?;
        // borders of the diff block plus the footer
        app.set_page_size(size.height.saturating_sub(5) as usize);

        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui<G: GitClient>(f: &mut Frame, app: &App<G>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Tree and diff
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    let tree_width = app.config().tree_width();
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(tree_width),
            Constraint::Percentage(100 - tree_width),
        ])
        .split(chunks[0]);

    render_tree(f, app, panes[0]);
    render_diff(f, app, panes[1]);
    render_footer(f, app, chunks[1]);

    if app.show_help() {
        render_help(f);
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
}

fn status_color(status: StagedStatus) -> Color {
    match status {
        StagedStatus::FullyStaged => Color::Green,
        StagedStatus::PartiallyStaged => Color::Yellow,
        StagedStatus::Unstaged => Color::Red,
    }
}

fn render_tree<G: GitClient>(f: &mut Frame, app: &App<G>, area: Rect) {
    let navigator = app.navigator();
    let tree = navigator.tree();

    let items: Vec<ListItem> = navigator
        .visible()
        .filter_map(|(_, row)| {
            let node = tree.node(row.id)?;
            let indent = "  ".repeat(row.depth.saturating_sub(1));
            let label = match node {
                Node::Directory(dir) => {
                    let icon = if dir.expanded { "▼" } else { "▶" };
                    format!("{indent}{icon} {}", dir.name)
                }
                Node::File(file) => format!("{indent}{} {}", file.status_code(), file.display_name()),
            };
            let style = Style::default().fg(status_color(tree.staged_status(row.id)));
            Some(ListItem::new(Line::from(Span::styled(label, style))))
        })
        .collect();

    let list = List::new(items)
        .block(pane_block(" Changes ".to_string(), navigator.focused))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    state.select(navigator.visible_cursor_row());
    f.render_stateful_widget(list, area, &mut state);
}

fn render_diff<G: GitClient>(f: &mut Frame, app: &App<G>, area: Rect) {
    let focused = app.focus() == Focus::Diff;
    let title = match app.diff_path() {
        Some(path) => format!(" {} ", path),
        None => " Diff ".to_string(),
    };

    let block = pane_block(title, focused);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let diff = app.diff();
    let highlights = app.highlights();
    render_column(f, &diff.left, &highlights.left, app.diff_scroll(), columns[0]);
    render_column(f, &diff.right, &highlights.right, app.diff_scroll(), columns[1]);
}

fn render_column(
    f: &mut Frame,
    lines: &[DiffLine],
    highlights: &[Vec<SyntaxHighlight>],
    scroll: usize,
    area: Rect,
) {
    let numbers = line_numbers(lines);
    // gutter "nnnn " plus symbol and space
    let content_width = (area.width as usize).saturating_sub(7);

    let rows: Vec<Line> = lines
        .iter()
        .zip(numbers)
        .enumerate()
        .skip(scroll)
        .take(area.height as usize)
        .map(|(idx, (line, number))| {
            let row_highlights = highlights.get(idx).map(Vec::as_slice).unwrap_or(&[]);
            render_line(line, number, row_highlights, content_width)
        })
        .collect();

    f.render_widget(Paragraph::new(rows), area);
}

/// Line numbers per row; blank filler rows have none
fn line_numbers(lines: &[DiffLine]) -> Vec<Option<usize>> {
    let mut next = 0;
    lines
        .iter()
        .map(|line| {
            if line.kind == LineKind::Blank {
                None
            } else {
                next += 1;
                Some(next)
            }
        })
        .collect()
}

fn render_line(
    line: &DiffLine,
    number: Option<usize>,
    highlights: &[SyntaxHighlight],
    width: usize,
) -> Line<'static> {
    let (symbol, base) = match line.kind {
        LineKind::Removal => ("-", Style::default().fg(Color::Red).bg(REMOVAL_BG)),
        LineKind::Addition => ("+", Style::default().fg(Color::Green).bg(ADDITION_BG)),
        LineKind::Neutral => (" ", Style::default()),
        LineKind::Blank => (" ", Style::default().bg(BLANK_BG)),
    };

    let gutter = match number {
        Some(n) => format!("{:>4} ", n),
        None => "     ".to_string(),
    };

    let mut spans = vec![
        Span::styled(gutter, Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{} ", symbol), base),
    ];
    spans.extend(content_spans(&fit_to_width(&line.content, width), highlights, base));
    Line::from(spans)
}

/// Split text into spans, applying syntax colours over the base style
fn content_spans(text: &str, highlights: &[SyntaxHighlight], base: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    for h in highlights {
        let start = h.start.max(pos);
        let end = h.end.min(text.len());
        if start >= end {
            continue;
        }
        let (Some(gap), Some(segment)) = (text.get(pos..start), text.get(start..end)) else {
            continue;
        };
        if !gap.is_empty() {
            spans.push(Span::styled(gap.to_string(), base));
        }
        spans.push(Span::styled(segment.to_string(), syntax_style(base, h.style)));
        pos = end;
    }

    if let Some(rest) = text.get(pos..) {
        if !rest.is_empty() {
            spans.push(Span::styled(rest.to_string(), base));
        }
    }
    spans
}

fn syntax_style(base: Style, style: TextStyle) -> Style {
    let (r, g, b) = style.fg;
    let mut out = base.fg(Color::Rgb(r, g, b));
    if style.bold {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.italic {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.underline {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    out
}

/// Truncate or pad `text` to exactly `width` terminal columns
pub fn fit_to_width(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(width);
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.extend(std::iter::repeat(' ').take(width - used));
    out
}

fn branch_label(branch: &BranchInfo) -> String {
    let head = branch.head.as_deref().unwrap_or("(no branch)");
    match &branch.upstream {
        Some(upstream) => format!(
            " {} | {} | +{} | -{} ",
            head, upstream, branch.ahead, branch.behind
        ),
        None => format!(" {} ", head),
    }
}

fn render_footer<G: GitClient>(f: &mut Frame, app: &App<G>, area: Rect) {
    if app.mode() == Mode::Commit {
        f.render_widget(app.commit_input(), area);
        return;
    }

    let branch = branch_label(app.branch());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(branch.chars().count() as u16 + 2),
        ])
        .split(area);

    let (content, color) = match app.message() {
        Some(msg) => (format!(" {}", msg), Color::Yellow),
        None => (
            " Tab: focus | Space: stage/unstage | c: commit | r: refresh | ?: help | q: quit"
                .to_string(),
            Color::Gray,
        ),
    };

    let status = Paragraph::new(content)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, chunks[0]);

    let branch = Paragraph::new(branch)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(branch, chunks[1]);
}

fn render_help(f: &mut Frame) {
    let area = centered_rect(60, 70, f.area());

    let help_text = [
        "",
        "  Tree:",
        "    j / ↓     Move down",
        "    k / ↑     Move up",
        "    g / G     First / last entry",
        "    Enter     Expand or collapse directory",
        "    Space     Stage, or unstage if fully staged",
        "    c         Commit staged changes",
        "    r         Refresh status",
        "",
        "  Diff:",
        "    j / k     Scroll one line",
        "    PgDn/PgUp Scroll one page",
        "    g / G     Top / bottom",
        "",
        "  Other:",
        "    Tab       Switch focus",
        "    ?         Toggle this help",
        "    q         Quit",
        "",
        "  In commit mode:",
        "    Enter     Commit",
        "    Esc       Cancel",
        "",
    ];

    let help = Paragraph::new(help_text.join("\n"))
        .style(Style::default())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, area);
    f.render_widget(help, area);
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
