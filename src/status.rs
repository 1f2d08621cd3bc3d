//! Parser for `git status --porcelain=v2 --branch` output
//!
//! Produces the branch header and a flat list of change records. Parsing is
//! best-effort: lines that don't match a known shape are skipped.

/// Status character git uses for "no change" in porcelain v2
pub const CLEAN: char = '.';

/// Synthetic status character for untracked files
pub const UNTRACKED: char = '?';

const CHANGED: char = '1';
const COPIED: char = '2';
const UNMERGED: char = 'u';
const UNTRACKED_TAG: char = '?';

/// A single changed path from the status report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub index_status: char,
    pub worktree_status: char,
    /// Original path for renames and copies
    pub rename_from: Option<String>,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, index_status: char, worktree_status: char) -> Self {
        Self {
            path: path.into(),
            index_status,
            worktree_status,
            rename_from: None,
        }
    }
}

/// Branch metadata from the `# branch.*` header lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchInfo {
    pub oid: Option<String>,
    pub head: Option<String>,
    pub upstream: Option<String>,
    pub ahead: u32,
    pub behind: u32,
}

/// Parsed status report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitStatus {
    pub branch: BranchInfo,
    pub entries: Vec<FileEntry>,
}

/// Parse a full status report
pub fn parse_status(raw: &str) -> GitStatus {
    let mut status = GitStatus::default();

    for line in raw.lines() {
        if let Some(header) = line.strip_prefix("# ") {
            parse_header(header, &mut status.branch);
            continue;
        }

        match parse_entry(line) {
            Some(entry) => status.entries.push(entry),
            None => {
                if !line.is_empty() && !line.starts_with('!') {
                    log::debug!("Skipping unrecognised status line: {line}");
                }
            }
        }
    }

    status
}

fn parse_header(header: &str, branch: &mut BranchInfo) {
    let Some((key, value)) = header.split_once(' ') else {
        return;
    };
    let value = value.trim();

    match key {
        "branch.oid" => branch.oid = Some(value.to_string()),
        "branch.head" => branch.head = Some(value.to_string()),
        "branch.upstream" => branch.upstream = Some(value.to_string()),
        "branch.ab" => {
            for part in value.split_whitespace() {
                if let Some(n) = part.strip_prefix('+') {
                    branch.ahead = n.parse().unwrap_or(0);
                } else if let Some(n) = part.strip_prefix('-') {
                    branch.behind = n.parse().unwrap_or(0);
                }
            }
        }
        _ => {}
    }
}

/// Parse one entry line, returning `None` for anything malformed
pub fn parse_entry(line: &str) -> Option<FileEntry> {
    let mut chars = line.chars();
    let tag = chars.next()?;
    if chars.next()? != ' ' {
        return None;
    }
    let rest = chars.as_str();

    match tag {
        CHANGED => {
            // XY sub mH mI mW hH hI path
            let fields: Vec<&str> = rest.splitn(8, ' ').collect();
            if fields.len() != 8 {
                return None;
            }
            let (x, y) = status_pair(fields[0])?;
            Some(FileEntry::new(unquote_path(fields[7])?, x, y))
        }
        COPIED => {
            // XY sub mH mI mW hH hI Xscore path<TAB>origPath
            let fields: Vec<&str> = rest.splitn(9, ' ').collect();
            if fields.len() != 9 {
                return None;
            }
            let (x, y) = status_pair(fields[0])?;
            let (path, from) = split_rename_paths(fields[8])?;
            Some(FileEntry {
                path: unquote_path(path)?,
                index_status: x,
                worktree_status: y,
                rename_from: Some(unquote_path(from)?),
            })
        }
        UNMERGED => {
            // XY sub m1 m2 m3 mW h1 h2 h3 path
            let fields: Vec<&str> = rest.splitn(10, ' ').collect();
            if fields.len() != 10 {
                return None;
            }
            let (x, y) = status_pair(fields[0])?;
            Some(FileEntry::new(unquote_path(fields[9])?, x, y))
        }
        UNTRACKED_TAG => Some(FileEntry::new(unquote_path(rest)?, UNTRACKED, UNTRACKED)),
        _ => None,
    }
}

fn status_pair(field: &str) -> Option<(char, char)> {
    let mut chars = field.chars();
    let x = chars.next()?;
    let y = chars.next()?;
    if chars.next().is_some() || !x.is_ascii() || !y.is_ascii() {
        return None;
    }
    Some((x, y))
}

fn split_rename_paths(field: &str) -> Option<(&str, &str)> {
    field
        .split_once('\t')
        .or_else(|| field.rsplit_once(' '))
        .filter(|(path, from)| !path.is_empty() && !from.is_empty())
}

/// Decode a path git may have C-quoted (core.quotePath)
pub fn unquote_path(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return Some(raw.to_string());
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut iter = inner.bytes().peekable();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match iter.next()? {
            b'n' => bytes.push(b'\n'),
            b't' => bytes.push(b'\t'),
            b'r' => bytes.push(b'\r'),
            b'a' => bytes.push(0x07),
            b'b' => bytes.push(0x08),
            b'f' => bytes.push(0x0c),
            b'v' => bytes.push(0x0b),
            d @ b'0'..=b'7' => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match iter.peek() {
                        Some(&o @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(o - b'0');
                            iter.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(u8::try_from(value).ok()?);
            }
            other => bytes.push(other),
        }
    }

    Some(String::from_utf8_lossy(&bytes).into_owned())
}
