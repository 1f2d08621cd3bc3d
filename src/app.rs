//! Application model
//!
//! Owns the navigator, the aligned diff of the selected file and the commit
//! input, and turns key presses into git operations. Errors from git never
//! end the program: they are logged, shown in the footer, and whatever was
//! on screen before stays there.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders};
use tui_textarea::TextArea;

use crate::config::Config;
use crate::diff::{self, Diff};
use crate::git::{DiffTarget, GitClient};
use crate::navigator::Navigator;
use crate::status::{self, BranchInfo};
use crate::syntax::{SyntaxHighlight, SyntaxHighlighter};
use crate::tree::{FileTree, Node, StagedStatus};

/// Which pane receives navigation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Diff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Commit,
}

/// Syntax highlights for the two diff columns
#[derive(Debug, Clone, Default)]
pub struct DiffHighlights {
    pub left: Vec<Vec<SyntaxHighlight>>,
    pub right: Vec<Vec<SyntaxHighlight>>,
}

pub struct App<G: GitClient> {
    git: G,
    config: Config,
    navigator: Navigator,
    branch: BranchInfo,

    // Diff pane
    diff: Diff,
    diff_path: Option<String>,
    diff_scroll: usize,
    page_size: usize,
    highlighter: Option<SyntaxHighlighter>,
    highlights: DiffHighlights,

    // UI state
    focus: Focus,
    mode: Mode,
    commit_input: TextArea<'static>,
    message: Option<String>,
    show_help: bool,
}

impl<G: GitClient> App<G> {
    pub fn new(git: G, config: Config) -> Self {
        let highlighter = if config.syntax_highlighting {
            match SyntaxHighlighter::new(config.syntax_theme.as_deref()) {
                Ok(h) => Some(h),
                Err(e) => {
                    log::warn!("Syntax highlighting disabled: {e:#}");
                    None
                }
            }
        } else {
            None
        };

        Self {
            git,
            config,
            navigator: Navigator::default(),
            branch: BranchInfo::default(),
            diff: Diff::default(),
            diff_path: None,
            diff_scroll: 0,
            page_size: 20,
            highlighter,
            highlights: DiffHighlights::default(),
            focus: Focus::Tree,
            mode: Mode::Normal,
            commit_input: commit_input(),
            message: None,
            show_help: false,
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn branch(&self) -> &BranchInfo {
        &self.branch
    }

    pub fn diff(&self) -> &Diff {
        &self.diff
    }

    /// Path whose diff is currently displayed
    pub fn diff_path(&self) -> Option<&str> {
        self.diff_path.as_deref()
    }

    pub fn diff_scroll(&self) -> usize {
        self.diff_scroll
    }

    pub fn highlights(&self) -> &DiffHighlights {
        &self.highlights
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn commit_input(&self) -> &TextArea<'static> {
        &self.commit_input
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    /// Rows the diff pane can show at once
    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = rows.max(1);
        self.diff_scroll = self.diff_scroll.min(self.max_scroll());
    }

    /// Reload status, rebuild the tree and rebind the cursor.
    ///
    /// On failure the previous tree stays in place.
    pub fn refresh(&mut self) {
        let raw = match self.git.status() {
            Ok(raw) => raw,
            Err(e) => {
                self.report("Refresh failed", &e);
                return;
            }
        };

        let parsed = status::parse_status(&raw);
        log::info!("Status refreshed: {} changed paths", parsed.entries.len());

        self.branch = parsed.branch;
        self.navigator.refresh(FileTree::from_entries(&parsed.entries));
        self.load_diff();
    }

    /// Fetch the diff for the node under the cursor
    pub fn load_diff(&mut self) {
        let request = match self.navigator.selected() {
            Some((_, Node::File(file))) => Some((
                file.path.clone(),
                file.rename_from.clone(),
                DiffTarget::for_file(file),
            )),
            _ => None,
        };

        let Some((path, rename_from, target)) = request else {
            self.clear_diff();
            return;
        };

        let result = self.git.diff(&path, rename_from.as_deref(), target);
        self.apply_diff(&path, result);
    }

    /// Show a fetched diff if `path` is still the selection.
    ///
    /// Returns whether the result was applied.
    pub fn apply_diff(&mut self, path: &str, result: Result<String>) -> bool {
        if self.navigator.selected_path() != Some(path) {
            log::debug!("Discarding stale diff for {path}");
            return false;
        }

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                self.report("Diff failed", &e);
                return false;
            }
        };

        let mut aligned = diff::align(&raw);
        aligned.expand_tabs(self.config.tab_width);

        if self.diff_path.as_deref() != Some(path) {
            self.diff_scroll = 0;
        }
        self.highlights = match &self.highlighter {
            Some(h) => DiffHighlights {
                left: h.highlight_column(&aligned.left, path),
                right: h.highlight_column(&aligned.right, path),
            },
            None => DiffHighlights::default(),
        };
        self.diff = aligned;
        self.diff_path = Some(path.to_string());
        self.diff_scroll = self.diff_scroll.min(self.max_scroll());
        true
    }

    fn clear_diff(&mut self) {
        self.diff = Diff::default();
        self.diff_path = None;
        self.diff_scroll = 0;
        self.highlights = DiffHighlights::default();
    }

    /// Stage the selected node, or unstage it if it is already fully staged
    pub fn toggle_stage(&mut self) {
        let Some((node, _)) = self.navigator.selected() else {
            return;
        };
        let id = node.id;
        let tree = self.navigator.tree();
        let Some(path) = tree.node(id).map(|n| n.path().to_string()) else {
            return;
        };

        let result = if tree.staged_status(id) == StagedStatus::FullyStaged {
            let paths = tree.unstage_paths(id);
            log::info!("Unstaging {}", paths.join(" "));
            self.git.unstage(&paths)
        } else {
            log::info!("Staging {path}");
            self.git.stage(&[path])
        };

        if let Err(e) = result {
            self.report("Staging failed", &e);
            return;
        }
        self.refresh();
    }

    /// Open the commit input if anything is staged
    pub fn start_commit(&mut self) {
        if !self.navigator.tree().has_staged_changes() {
            self.message = Some("Nothing staged to commit".to_string());
            return;
        }
        self.commit_input = commit_input();
        self.mode = Mode::Commit;
    }

    /// Commit with the typed message. An empty message keeps the input open.
    pub fn submit_commit(&mut self) {
        let text = self.commit_input.lines().join("\n");
        let text = text.trim();
        if text.is_empty() {
            self.message = Some("Commit message is empty".to_string());
            return;
        }

        self.mode = Mode::Normal;
        match self.git.commit(text) {
            Ok(()) => {
                log::info!("Committed: {text}");
                self.message = Some("Committed".to_string());
                self.refresh();
            }
            Err(e) => self.report("Commit failed", &e),
        }
    }

    fn report(&mut self, what: &str, err: &anyhow::Error) {
        log::warn!("{what}: {err:#}");
        self.message = Some(format!("{what}: {err:#}"));
    }

    fn max_scroll(&self) -> usize {
        self.diff.len().saturating_sub(self.page_size)
    }

    fn scroll_by(&mut self, delta: isize) {
        let next = self.diff_scroll.saturating_add_signed(delta);
        self.diff_scroll = next.min(self.max_scroll());
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.navigator.focused = focus == Focus::Tree;
    }

    /// Handle a key press. Returns true when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        match self.mode {
            Mode::Commit => {
                self.handle_commit_key(key);
                false
            }
            Mode::Normal => {
                self.message = None;
                if self.show_help {
                    if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
                        self.show_help = false;
                    }
                    return false;
                }
                self.handle_normal_key(key)
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Tab => {
                let next = match self.focus {
                    Focus::Tree => Focus::Diff,
                    Focus::Diff => Focus::Tree,
                };
                self.set_focus(next);
            }
            _ => match self.focus {
                Focus::Tree => self.handle_tree_key(key),
                Focus::Diff => self.handle_diff_key(key),
            },
        }
        false
    }

    fn handle_tree_key(&mut self, key: KeyEvent) {
        let moved = match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.navigator.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.navigator.move_up(),
            KeyCode::Char('g') | KeyCode::Home => self.navigator.move_to_top(),
            KeyCode::Char('G') | KeyCode::End => self.navigator.move_to_bottom(),
            KeyCode::Enter => {
                self.navigator.toggle_expand();
                false
            }
            KeyCode::Char(' ') => {
                self.toggle_stage();
                false
            }
            KeyCode::Char('c') => {
                self.start_commit();
                false
            }
            KeyCode::Char('r') => {
                self.refresh();
                false
            }
            _ => false,
        };

        if moved {
            self.load_diff();
        }
    }

    fn handle_diff_key(&mut self, key: KeyEvent) {
        let page = self.page_size as isize;
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.scroll_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_by(-1),
            KeyCode::PageDown | KeyCode::Char('d') => self.scroll_by(page),
            KeyCode::PageUp | KeyCode::Char('u') => self.scroll_by(-page),
            KeyCode::Char('g') | KeyCode::Home => self.diff_scroll = 0,
            KeyCode::Char('G') | KeyCode::End => self.diff_scroll = self.max_scroll(),
            _ => {}
        }
    }

    fn handle_commit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.message = Some("Commit cancelled".to_string());
            }
            KeyCode::Enter => self.submit_commit(),
            _ => {
                self.commit_input.input(key);
            }
        }
    }
}

fn commit_input() -> TextArea<'static> {
    let mut input = TextArea::default();
    input.set_cursor_line_style(Style::default());
    input.set_placeholder_text("Commit message");
    input.set_block(Block::default().borders(Borders::ALL).title(" Commit "));
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeGit {
        status: RefCell<String>,
        diffs: RefCell<HashMap<String, String>>,
        calls: RefCell<Vec<String>>,
        fail: Cell<bool>,
    }

    impl FakeGit {
        fn check(&self, call: String) -> Result<()> {
            self.calls.borrow_mut().push(call);
            if self.fail.get() {
                anyhow::bail!("simulated failure");
            }
            Ok(())
        }
    }

    impl GitClient for FakeGit {
        fn status(&self) -> Result<String> {
            self.check("status".to_string())?;
            Ok(self.status.borrow().clone())
        }

        fn diff(&self, path: &str, rename_from: Option<&str>, target: DiffTarget) -> Result<String> {
            match rename_from {
                Some(from) => self.check(format!("diff {from} -> {path} {target:?}"))?,
                None => self.check(format!("diff {path} {target:?}"))?,
            }
            Ok(self.diffs.borrow().get(path).cloned().unwrap_or_default())
        }

        fn stage(&self, paths: &[String]) -> Result<()> {
            self.check(format!("stage {}", paths.join(" ")))
        }

        fn unstage(&self, paths: &[String]) -> Result<()> {
            self.check(format!("unstage {}", paths.join(" ")))
        }

        fn commit(&self, message: &str) -> Result<()> {
            self.check(format!("commit {message}"))
        }
    }

    const STATUS: &str = "# branch.oid 1234abcd\n\
# branch.head main\n\
1 .M N... 100644 100644 100644 aaa aaa src/lib.rs\n\
1 M. N... 100644 100644 100644 aaa bbb src/main.rs\n\
? notes.txt\n";

    const LIB_DIFF: &str = "--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1,2 +1,2 @@\n-old\n+new\n same\n";

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> App<FakeGit> {
        let git = FakeGit::default();
        *git.status.borrow_mut() = STATUS.to_string();
        git.diffs
            .borrow_mut()
            .insert("src/lib.rs".to_string(), LIB_DIFF.to_string());

        let config = Config {
            syntax_highlighting: false,
            ..Config::default()
        };
        let mut app = App::new(git, config);
        app.refresh();
        app
    }

    fn calls(app: &App<FakeGit>) -> Vec<String> {
        app.git.calls.borrow().clone()
    }

    #[test]
    fn test_refresh_builds_tree_and_branch() {
        let app = app();
        assert_eq!(app.branch().head.as_deref(), Some("main"));
        assert_eq!(app.navigator().selected_path(), Some("src"));
        assert_eq!(app.navigator().nodes().len(), 4);
        // a directory is selected, so no diff
        assert!(app.diff().is_empty());
        assert_eq!(app.diff_path(), None);
    }

    #[test]
    fn test_moving_onto_file_loads_diff() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('j')));

        assert_eq!(app.navigator().selected_path(), Some("src/lib.rs"));
        assert_eq!(app.diff_path(), Some("src/lib.rs"));
        assert_eq!(app.diff().len(), 2);
        assert!(calls(&app).contains(&"diff src/lib.rs Unstaged".to_string()));
    }

    #[test]
    fn test_diff_target_follows_file_status() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Char('j')));
        app.handle_key(key(KeyCode::Char('j')));

        let calls = calls(&app);
        assert!(calls.contains(&"diff src/main.rs Staged".to_string()));
        assert!(calls.contains(&"diff notes.txt Untracked".to_string()));
    }

    #[test]
    fn test_stale_diff_is_discarded() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('j')));
        let before = app.diff().clone();

        let applied = app.apply_diff("src/main.rs", Ok("@@ -1 +1 @@\n-x\n+y\n".to_string()));
        assert!(!applied);
        assert_eq!(app.diff(), &before);
        assert_eq!(app.diff_path(), Some("src/lib.rs"));
    }

    #[test]
    fn test_space_stages_unstaged_file() {
        let mut app = app();
        app.navigator.select_path("src/lib.rs");
        app.handle_key(key(KeyCode::Char(' ')));

        let calls = calls(&app);
        assert!(calls.contains(&"stage src/lib.rs".to_string()));
        assert_eq!(calls.last().map(String::as_str), Some("diff src/lib.rs Unstaged"));
        assert_eq!(app.navigator().selected_path(), Some("src/lib.rs"));
    }

    #[test]
    fn test_space_unstages_fully_staged_file() {
        let mut app = app();
        app.navigator.select_path("src/main.rs");
        app.handle_key(key(KeyCode::Char(' ')));

        assert!(calls(&app).contains(&"unstage src/main.rs".to_string()));
    }

    #[test]
    fn test_space_on_partial_directory_stages_it() {
        let mut app = app();
        assert_eq!(app.navigator().selected_path(), Some("src"));
        app.handle_key(key(KeyCode::Char(' ')));

        assert!(calls(&app).contains(&"stage src".to_string()));
    }

    #[test]
    fn test_staged_rename_uses_both_paths() {
        let mut app = app();
        *app.git.status.borrow_mut() =
            "2 R. N... 100644 100644 100644 aaa aaa R100 lib/new.rs\told.rs\n".to_string();
        app.refresh();
        app.navigator.select_path("lib/new.rs");
        app.load_diff();
        assert!(calls(&app).contains(&"diff old.rs -> lib/new.rs Staged".to_string()));

        app.handle_key(key(KeyCode::Char(' ')));
        assert!(calls(&app).contains(&"unstage lib/new.rs old.rs".to_string()));
    }

    #[test]
    fn test_conflicted_file_diffs_our_side() {
        let mut app = app();
        *app.git.status.borrow_mut() =
            "u UU N... 100644 100644 100644 100644 a b c both.rs\n".to_string();
        app.refresh();

        assert_eq!(app.navigator().selected_path(), Some("both.rs"));
        assert!(calls(&app).contains(&"diff both.rs Unmerged".to_string()));
    }

    #[test]
    fn test_failed_refresh_keeps_tree() {
        let mut app = app();
        app.navigator.select_path("src/lib.rs");
        app.load_diff();
        let diff = app.diff().clone();

        app.git.fail.set(true);
        app.handle_key(key(KeyCode::Char('r')));

        assert_eq!(app.navigator().nodes().len(), 4);
        assert_eq!(app.navigator().selected_path(), Some("src/lib.rs"));
        assert_eq!(app.diff(), &diff);
        assert!(app.message().is_some_and(|m| m.starts_with("Refresh failed")));
    }

    #[test]
    fn test_failed_stage_reports_and_skips_refresh() {
        let mut app = app();
        app.navigator.select_path("src/lib.rs");
        app.git.fail.set(true);
        app.git.calls.borrow_mut().clear();

        app.toggle_stage();

        assert_eq!(calls(&app), vec!["stage src/lib.rs".to_string()]);
        assert!(app.message().is_some_and(|m| m.contains("simulated failure")));
    }

    #[test]
    fn test_failed_diff_keeps_previous_diff() {
        let mut app = app();
        app.navigator.select_path("src/lib.rs");
        app.load_diff();
        let before = app.diff().clone();

        app.git.fail.set(true);
        app.load_diff();
        assert_eq!(app.diff(), &before);
        assert!(app.message().is_some_and(|m| m.starts_with("Diff failed")));
    }

    #[test]
    fn test_commit_flow() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('c')));
        assert_eq!(app.mode(), Mode::Commit);

        // empty message is refused
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode(), Mode::Commit);
        assert_eq!(app.message(), Some("Commit message is empty"));

        for c in " fix parser ".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.mode(), Mode::Normal);
        assert!(calls(&app).contains(&"commit fix parser".to_string()));
        assert_eq!(app.message(), Some("Committed"));
    }

    #[test]
    fn test_commit_requires_staged_changes() {
        let mut app = app();
        *app.git.status.borrow_mut() = "1 .M N... 100644 100644 100644 a a a.rs\n".to_string();
        app.refresh();

        app.handle_key(key(KeyCode::Char('c')));
        assert_eq!(app.mode(), Mode::Normal);
        assert_eq!(app.message(), Some("Nothing staged to commit"));
    }

    #[test]
    fn test_commit_escape_cancels() {
        let mut app = app();
        app.start_commit();
        app.handle_key(key(KeyCode::Char('x')));
        app.handle_key(key(KeyCode::Esc));

        assert_eq!(app.mode(), Mode::Normal);
        assert!(!calls(&app).iter().any(|c| c.starts_with("commit")));
    }

    #[test]
    fn test_q_in_commit_mode_is_text() {
        let mut app = app();
        app.start_commit();
        assert!(!app.handle_key(key(KeyCode::Char('q'))));
        assert_eq!(app.commit_input().lines()[0], "q");
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        assert!(app.handle_key(key(KeyCode::Char('q'))));
        assert!(app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_help_swallows_keys() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('?')));
        assert!(app.show_help());

        assert!(!app.handle_key(key(KeyCode::Char('q'))));
        assert!(!app.show_help());
        assert_eq!(app.navigator().selected_path(), Some("src"));
    }

    #[test]
    fn test_tab_switches_focus_and_scrolls_diff() {
        let mut app = app();
        let long: String = (0..50).map(|i| format!("+line {i}\n")).collect();
        app.git
            .diffs
            .borrow_mut()
            .insert("src/lib.rs".to_string(), format!("@@ -0,0 +1,50 @@\n{long}"));
        app.navigator.select_path("src/lib.rs");
        app.load_diff();
        app.set_page_size(10);

        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus(), Focus::Diff);
        assert!(!app.navigator().focused);

        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.diff_scroll(), 1);
        app.handle_key(key(KeyCode::PageDown));
        assert_eq!(app.diff_scroll(), 11);
        app.handle_key(key(KeyCode::Char('G')));
        assert_eq!(app.diff_scroll(), 40);
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.diff_scroll(), 40);
        app.handle_key(key(KeyCode::Char('g')));
        assert_eq!(app.diff_scroll(), 0);
        app.handle_key(key(KeyCode::Char('k')));
        assert_eq!(app.diff_scroll(), 0);

        // tree keys do not move the tree while the diff has focus
        assert_eq!(app.navigator().selected_path(), Some("src/lib.rs"));
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.focus(), Focus::Tree);
    }

    #[test]
    fn test_enter_collapses_directory() {
        let mut app = app();
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.navigator().selected_path(), Some("notes.txt"));
    }

    #[test]
    fn test_empty_repository_is_safe() {
        let git = FakeGit::default();
        let mut app = App::new(git, Config::default());
        app.refresh();

        for code in [
            KeyCode::Char('j'),
            KeyCode::Char('k'),
            KeyCode::Char('G'),
            KeyCode::Enter,
            KeyCode::Char(' '),
            KeyCode::Char('c'),
        ] {
            assert!(!app.handle_key(key(code)));
        }
        assert!(app.navigator().is_empty());
        assert!(app.diff().is_empty());
    }
}
