//! Side-by-side alignment of a unified diff
//!
//! Turns the unified diff of a single file into two columns of equal length.
//! Removals go to the left column, additions to the right, and context lines
//! to both. Runs of unmatched removals or additions are padded with blank
//! rows on the opposite side so that both columns stay in step.

/// Kind of a single aligned row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Removal,
    Addition,
    Neutral,
    Blank,
}

/// A single row in one column of the aligned diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub content: String,
    pub kind: LineKind,
}

impl DiffLine {
    pub fn new(content: impl Into<String>, kind: LineKind) -> Self {
        Self {
            content: content.into(),
            kind,
        }
    }

    pub fn blank() -> Self {
        Self::new("", LineKind::Blank)
    }
}

/// Two columns of equal length: old on the left, new on the right
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub left: Vec<DiffLine>,
    pub right: Vec<DiffLine>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    /// Number of aligned rows
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Replace tabs with spaces in every row, for display
    pub fn expand_tabs(&mut self, tab_width: usize) {
        let spaces = " ".repeat(tab_width);
        for line in self.left.iter_mut().chain(self.right.iter_mut()) {
            if line.content.contains('\t') {
                line.content = line.content.replace('\t', &spaces);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Preamble,
    InHunk,
}

/// Accumulates aligned rows while walking hunk bodies
#[derive(Debug, Default)]
struct Aligner {
    diff: Diff,
    /// Negative while removals wait for a right-hand partner, positive for additions
    pending: i64,
}

impl Aligner {
    fn removal(&mut self, content: &str) {
        self.diff.left.push(DiffLine::new(content, LineKind::Removal));
        self.pending -= 1;
    }

    fn addition(&mut self, content: &str) {
        self.diff.right.push(DiffLine::new(content, LineKind::Addition));
        self.pending += 1;
    }

    fn neutral(&mut self, content: &str) {
        self.flush();
        self.diff.left.push(DiffLine::new(content, LineKind::Neutral));
        self.diff.right.push(DiffLine::new(content, LineKind::Neutral));
    }

    fn flush(&mut self) {
        while self.pending < 0 {
            self.diff.right.push(DiffLine::blank());
            self.pending += 1;
        }
        while self.pending > 0 {
            self.diff.left.push(DiffLine::blank());
            self.pending -= 1;
        }
    }

    fn finish(mut self) -> Diff {
        self.flush();
        self.diff
    }
}

/// Align a unified diff for one file into left and right columns.
///
/// Everything before the first hunk header is ignored. Empty input gives an
/// empty diff.
pub fn align(raw: &str) -> Diff {
    let mut state = ParseState::Preamble;
    let mut aligner = Aligner::default();

    for line in raw.lines() {
        if is_hunk_header(line) {
            state = ParseState::InHunk;
            continue;
        }
        if state == ParseState::Preamble {
            continue;
        }

        let mut chars = line.chars();
        match chars.next() {
            Some('-') => aligner.removal(chars.as_str()),
            Some('+') => aligner.addition(chars.as_str()),
            // "\ No newline at end of file"
            Some('\\') => continue,
            Some(_) => aligner.neutral(chars.as_str()),
            None => aligner.neutral(""),
        }
    }

    aligner.finish()
}

/// A hunk header looks like `@@ -1,4 +1,5 @@` with optional trailing context.
/// Combined-diff headers (`@@@`) have two prefix columns and are not accepted.
fn is_hunk_header(line: &str) -> bool {
    line.strip_prefix("@@")
        .is_some_and(|rest| !rest.starts_with('@') && rest.contains("@@"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(lines: &[DiffLine]) -> Vec<&str> {
        lines.iter().map(|l| l.content.as_str()).collect()
    }

    fn kinds(lines: &[DiffLine]) -> Vec<LineKind> {
        lines.iter().map(|l| l.kind).collect()
    }

    const HEADER: &str = "diff --git a/f.txt b/f.txt\nindex 35b5809..4492ac6 100644\n--- a/f.txt\n+++ b/f.txt\n@@ -1,4 +1,5 @@\n";

    #[test]
    fn test_empty_input() {
        assert_eq!(align(""), Diff::default());
        assert!(align("").is_empty());
    }

    #[test]
    fn test_trailing_removal_gets_blank() {
        let diff = align(&format!("{HEADER}-only removed line\n"));

        assert_eq!(diff.left, vec![DiffLine::new("only removed line", LineKind::Removal)]);
        assert_eq!(diff.right, vec![DiffLine::blank()]);
    }

    #[test]
    fn test_trailing_addition_gets_blank() {
        let diff = align(&format!("{HEADER}+only added line\n"));

        assert_eq!(diff.left, vec![DiffLine::blank()]);
        assert_eq!(diff.right, vec![DiffLine::new("only added line", LineKind::Addition)]);
    }

    #[test]
    fn test_replacement_shares_a_row() {
        let diff = align(&format!("{HEADER} a\n-old\n+new\n b\n"));

        assert_eq!(contents(&diff.left), vec!["a", "old", "b"]);
        assert_eq!(contents(&diff.right), vec!["a", "new", "b"]);
        assert_eq!(kinds(&diff.left)[1], LineKind::Removal);
        assert_eq!(kinds(&diff.right)[1], LineKind::Addition);
    }

    #[test]
    fn test_addition_before_removal_shares_a_row() {
        let diff = align(&format!("{HEADER}+new\n-old\n"));

        assert_eq!(diff.left, vec![DiffLine::new("old", LineKind::Removal)]);
        assert_eq!(diff.right, vec![DiffLine::new("new", LineKind::Addition)]);
    }

    #[test]
    fn test_preamble_is_ignored() {
        let raw = "diff --git a/x b/x\n--- a/x\n+++ b/x\n-not a body line\n+nor this\n";
        assert_eq!(align(raw), Diff::default());
    }

    #[test]
    fn test_header_like_lines_inside_hunk_are_content() {
        let diff = align(&format!("{HEADER}--- dashes\n+++ pluses\n"));

        assert_eq!(diff.left, vec![DiffLine::new("-- dashes", LineKind::Removal)]);
        assert_eq!(diff.right, vec![DiffLine::new("++ pluses", LineKind::Addition)]);
    }

    #[test]
    fn test_hunk_header_with_function_context() {
        let raw = "--- a/x.rs\n+++ b/x.rs\n@@ -10,3 +10,3 @@ fn main() {\n ctx\n-a\n+b\n";
        let diff = align(raw);
        assert_eq!(contents(&diff.left), vec!["ctx", "a"]);
        assert_eq!(contents(&diff.right), vec!["ctx", "b"]);
    }

    #[test]
    fn test_combined_diff_is_not_aligned() {
        let raw = "diff --cc both.rs\nindex 1,2..3\n--- a/both.rs\n+++ b/both.rs\n@@@ -1,1 -1,1 +1,5 @@@\n++<<<<<<< HEAD\n +ours\n++=======\n+ theirs\n++>>>>>>> topic\n";
        assert!(align(raw).is_empty());
    }

    #[test]
    fn test_no_newline_marker_is_skipped() {
        let diff = align(&format!("{HEADER}-last\n\\ No newline at end of file\n+last\n"));
        assert_eq!(diff.left, vec![DiffLine::new("last", LineKind::Removal)]);
        assert_eq!(diff.right, vec![DiffLine::new("last", LineKind::Addition)]);
    }

    #[test]
    fn test_multiple_hunks() {
        let raw = format!("{HEADER} a\n-b\n@@ -40,2 +40,3 @@\n c\n+d\n+e\n");
        let diff = align(&raw);

        assert_eq!(contents(&diff.left), vec!["a", "b", "c", "", ""]);
        assert_eq!(contents(&diff.right), vec!["a", "", "c", "d", "e"]);
        assert_eq!(
            kinds(&diff.left),
            vec![
                LineKind::Neutral,
                LineKind::Removal,
                LineKind::Neutral,
                LineKind::Blank,
                LineKind::Blank
            ]
        );
    }

    #[test]
    fn test_full_file_diff() {
        let raw = "diff --git a/git-ui/testfile.txt b/git-ui/testfile.txt
index 35b5809..4492ac6 100644
--- a/git-ui/testfile.txt
+++ b/git-ui/testfile.txt
@@ -1,4 +1,5 @@
 This is a test file
-
 These lines are committed now
-I have added some more content
+I have added this is a change more content
+
+This is a new thing

 type model struct {
-       ldiff     string
-       rdiff     string
+       ldiff     []DiffLine
+       rdiff     []DiffLine
        lviewport viewport.Model
 }";
        let diff = align(raw);

        let expected_left = vec![
            DiffLine::new("This is a test file", LineKind::Neutral),
            DiffLine::new("", LineKind::Removal),
            DiffLine::new("These lines are committed now", LineKind::Neutral),
            DiffLine::new("I have added some more content", LineKind::Removal),
            DiffLine::blank(),
            DiffLine::blank(),
            DiffLine::new("", LineKind::Neutral),
            DiffLine::new("type model struct {", LineKind::Neutral),
            DiffLine::new("       ldiff     string", LineKind::Removal),
            DiffLine::new("       rdiff     string", LineKind::Removal),
            DiffLine::new("       lviewport viewport.Model", LineKind::Neutral),
            DiffLine::new("}", LineKind::Neutral),
        ];
        let expected_right = vec![
            DiffLine::new("This is a test file", LineKind::Neutral),
            DiffLine::blank(),
            DiffLine::new("These lines are committed now", LineKind::Neutral),
            DiffLine::new("I have added this is a change more content", LineKind::Addition),
            DiffLine::new("", LineKind::Addition),
            DiffLine::new("This is a new thing", LineKind::Addition),
            DiffLine::new("", LineKind::Neutral),
            DiffLine::new("type model struct {", LineKind::Neutral),
            DiffLine::new("       ldiff     []DiffLine", LineKind::Addition),
            DiffLine::new("       rdiff     []DiffLine", LineKind::Addition),
            DiffLine::new("       lviewport viewport.Model", LineKind::Neutral),
            DiffLine::new("}", LineKind::Neutral),
        ];

        assert_eq!(diff.left, expected_left);
        assert_eq!(diff.right, expected_right);
    }

    #[test]
    fn test_columns_always_equal_length() {
        let bodies = [
            "",
            "-a\n-b\n-c",
            "+a\n+b",
            "-a\n+b\n+c\n d\n-e",
            "+a\n-b\n-c\n-d\n e\n+f\n+g",
            " x\n\n y\n-z",
            "-\n+\n-\n+\n-",
        ];
        for body in bodies {
            let diff = align(&format!("{HEADER}{body}"));
            assert_eq!(diff.left.len(), diff.right.len(), "body: {body:?}");
        }
    }

    #[test]
    fn test_expand_tabs() {
        let mut diff = align(&format!("{HEADER} \tindented\n"));
        diff.expand_tabs(3);
        assert_eq!(diff.left[0].content, "   indented");
        assert_eq!(diff.right[0].content, "   indented");
    }
}
