//! Directory/file tree built from status entries
//!
//! Nodes live in a flat arena and refer to each other by index. Directories
//! keep their child directories and child files in two separately sorted
//! lists. The staged status of a directory is never stored; it is computed
//! from the current file states every time it is asked for.

use crate::status::{FileEntry, CLEAN, UNTRACKED};

/// Index of a node in the tree arena
pub type NodeId = usize;

/// Aggregate staged state of a file or directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedStatus {
    Unstaged,
    PartiallyStaged,
    FullyStaged,
}

#[derive(Debug, Clone)]
pub struct Directory {
    pub name: String,
    pub path: String,
    pub parent: Option<NodeId>,
    pub directories: Vec<NodeId>,
    pub files: Vec<NodeId>,
    pub expanded: bool,
}

#[derive(Debug, Clone)]
pub struct File {
    pub name: String,
    pub path: String,
    pub parent: NodeId,
    pub index_status: char,
    pub worktree_status: char,
    pub rename_from: Option<String>,
}

impl File {
    /// Staged when nothing in the worktree differs from the index
    pub fn is_staged(&self) -> bool {
        self.worktree_status == CLEAN
    }

    /// The two-character status code, e.g. `.M`
    pub fn status_code(&self) -> String {
        format!("{}{}", self.index_status, self.worktree_status)
    }

    /// Whether the index holds a change for this file
    pub fn has_index_change(&self) -> bool {
        self.index_status != CLEAN && self.index_status != UNTRACKED
    }

    pub fn is_untracked(&self) -> bool {
        self.index_status == UNTRACKED
    }

    /// Left conflicted by a merge: `UU`, `AU`, `UD`, `AA`, `DD` and so on
    pub fn is_unmerged(&self) -> bool {
        self.index_status == 'U'
            || self.worktree_status == 'U'
            || (self.index_status == self.worktree_status && matches!(self.index_status, 'A' | 'D'))
    }

    /// Name shown in the tree, `old -> new` for renames
    pub fn display_name(&self) -> String {
        let Some(from) = &self.rename_from else {
            return self.name.clone();
        };

        let own_dir = parent_path(&self.path);
        let shown = if parent_path(from) == own_dir {
            from.rsplit('/').next().unwrap_or(from)
        } else {
            from.as_str()
        };
        format!("{} -> {}", shown, self.name)
    }
}

fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

#[derive(Debug, Clone)]
pub enum Node {
    Directory(Directory),
    File(File),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Directory(d) => &d.name,
            Node::File(f) => &f.name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Node::Directory(d) => &d.path,
            Node::File(f) => &f.path,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Directory(d) => d.parent,
            Node::File(f) => Some(f.parent),
        }
    }
}

/// Arena-backed change tree. Node 0 is always the repository root.
#[derive(Debug, Clone)]
pub struct FileTree {
    nodes: Vec<Node>,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTree {
    pub const ROOT: NodeId = 0;

    /// Create a tree holding only the root directory
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Directory(Directory {
                name: String::new(),
                path: String::new(),
                parent: None,
                directories: Vec::new(),
                files: Vec::new(),
                expanded: true,
            })],
        }
    }

    /// Build a tree from parsed status entries
    pub fn from_entries(entries: &[FileEntry]) -> Self {
        let mut tree = Self::new();
        for entry in entries {
            tree.insert(entry);
        }
        tree
    }

    /// Insert one entry, creating intermediate directories as needed.
    ///
    /// A path ending in `/` only creates directories. Inserting a path that
    /// already exists updates that file in place.
    pub fn insert(&mut self, entry: &FileEntry) {
        let directory_only = entry.path.ends_with('/');
        let mut segments: Vec<&str> = entry.path.split('/').filter(|s| !s.is_empty()).collect();

        let file_name = if directory_only { None } else { segments.pop() };

        let mut current = Self::ROOT;
        for segment in segments {
            current = match self.child_directory(current, segment) {
                Some(id) => id,
                None => self.add_directory(current, segment),
            };
        }

        if let Some(name) = file_name {
            self.add_file(current, name, entry);
        }
    }

    fn child_directory(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.directory(dir)?
            .directories
            .iter()
            .copied()
            .find(|&id| self.nodes[id].name() == name)
    }

    fn add_directory(&mut self, parent: NodeId, name: &str) -> NodeId {
        let path = match self.nodes[parent].path() {
            "" => name.to_string(),
            parent_path => format!("{parent_path}/{name}"),
        };
        let id = self.nodes.len();
        self.nodes.push(Node::Directory(Directory {
            name: name.to_string(),
            path,
            parent: Some(parent),
            directories: Vec::new(),
            files: Vec::new(),
            expanded: true,
        }));

        let position = self.sorted_position(parent, name, true);
        if let Some(Node::Directory(dir)) = self.nodes.get_mut(parent) {
            dir.directories.insert(position, id);
        }
        id
    }

    fn add_file(&mut self, parent: NodeId, name: &str, entry: &FileEntry) {
        let existing = self.directory(parent).and_then(|dir| {
            dir.files
                .iter()
                .copied()
                .find(|&id| self.nodes[id].name() == name)
        });

        if let Some(id) = existing {
            if let Node::File(file) = &mut self.nodes[id] {
                file.index_status = entry.index_status;
                file.worktree_status = entry.worktree_status;
                file.rename_from = entry.rename_from.clone();
            }
            return;
        }

        let id = self.nodes.len();
        self.nodes.push(Node::File(File {
            name: name.to_string(),
            path: entry.path.clone(),
            parent,
            index_status: entry.index_status,
            worktree_status: entry.worktree_status,
            rename_from: entry.rename_from.clone(),
        }));

        let position = self.sorted_position(parent, name, false);
        if let Some(Node::Directory(dir)) = self.nodes.get_mut(parent) {
            dir.files.insert(position, id);
        }
    }

    /// Position after every sibling whose name sorts at or before `name`
    fn sorted_position(&self, parent: NodeId, name: &str, directories: bool) -> usize {
        let Some(dir) = self.directory(parent) else {
            return 0;
        };
        let siblings = if directories { &dir.directories } else { &dir.files };
        siblings.partition_point(|&id| self.nodes[id].name() <= name)
    }

    pub fn root(&self) -> Option<&Directory> {
        self.directory(Self::ROOT)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn directory(&self, id: NodeId) -> Option<&Directory> {
        match self.nodes.get(id) {
            Some(Node::Directory(dir)) => Some(dir),
            _ => None,
        }
    }

    pub fn file(&self, id: NodeId) -> Option<&File> {
        match self.nodes.get(id) {
            Some(Node::File(file)) => Some(file),
            _ => None,
        }
    }

    /// True when there are no changes at all
    pub fn is_empty(&self) -> bool {
        self.root()
            .map_or(true, |root| root.directories.is_empty() && root.files.is_empty())
    }

    /// Locate a node by its repository-relative path
    pub fn find(&self, path: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, node)| node.path() == path)
            .map(|(id, _)| id)
    }

    /// Flip the expanded flag of a directory; files are left alone
    pub fn toggle_expanded(&mut self, id: NodeId) -> bool {
        match self.nodes.get_mut(id) {
            Some(Node::Directory(dir)) if id != Self::ROOT => {
                dir.expanded = !dir.expanded;
                true
            }
            _ => false,
        }
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) {
        if let Some(Node::Directory(dir)) = self.nodes.get_mut(id) {
            dir.expanded = expanded;
        }
    }

    /// A node is visible when every ancestor directory is expanded
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = self.nodes.get(id).and_then(Node::parent);
        while let Some(parent) = current {
            match self.directory(parent) {
                Some(dir) if dir.expanded => current = dir.parent,
                _ => return false,
            }
        }
        true
    }

    /// Paths of all collapsed directories
    pub fn collapsed_paths(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Directory(dir) if !dir.expanded => Some(dir.path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether any file has a change recorded in the index
    pub fn has_staged_changes(&self) -> bool {
        self.nodes
            .iter()
            .any(|node| matches!(node, Node::File(f) if f.has_index_change()))
    }

    /// Paths that reset the index state of a node: its own path plus the
    /// source of every rename below it that lives elsewhere
    pub fn unstage_paths(&self, id: NodeId) -> Vec<String> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let own = node.path();
        let prefix = format!("{own}/");

        let mut paths = vec![own.to_string()];
        for file in self.files_under(id) {
            let Some(from) = &file.rename_from else {
                continue;
            };
            if !from.starts_with(&prefix) && !paths.contains(from) {
                paths.push(from.clone());
            }
        }
        paths
    }

    fn files_under(&self, id: NodeId) -> Vec<&File> {
        match self.nodes.get(id) {
            Some(Node::File(file)) => vec![file],
            Some(Node::Directory(dir)) => dir
                .directories
                .iter()
                .flat_map(|&sub| self.files_under(sub))
                .chain(dir.files.iter().filter_map(|&f| self.file(f)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Compute the staged status of any node
    pub fn staged_status(&self, id: NodeId) -> StagedStatus {
        match self.nodes.get(id) {
            Some(Node::File(file)) if file.is_staged() => StagedStatus::FullyStaged,
            Some(Node::File(_)) => StagedStatus::Unstaged,
            Some(Node::Directory(dir)) => self.directory_status(dir),
            None => StagedStatus::FullyStaged,
        }
    }

    fn directory_status(&self, dir: &Directory) -> StagedStatus {
        let mut has_staged = false;
        let mut has_unstaged = false;

        for &id in &dir.files {
            match self.file(id) {
                Some(file) if file.is_staged() => has_staged = true,
                Some(_) => has_unstaged = true,
                None => continue,
            }
            if has_staged && has_unstaged {
                return StagedStatus::PartiallyStaged;
            }
        }

        for &id in &dir.directories {
            let Some(sub) = self.directory(id) else {
                continue;
            };
            match self.directory_status(sub) {
                StagedStatus::PartiallyStaged => return StagedStatus::PartiallyStaged,
                StagedStatus::FullyStaged => has_staged = true,
                StagedStatus::Unstaged => has_unstaged = true,
            }
            if has_staged && has_unstaged {
                return StagedStatus::PartiallyStaged;
            }
        }

        // both flags set has already returned; no children at all is fully staged
        if has_unstaged {
            StagedStatus::Unstaged
        } else {
            StagedStatus::FullyStaged
        }
    }
}
