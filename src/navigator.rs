//! Cursor and navigation state over a flattened change tree
//!
//! The tree is flattened in pre-order (a directory, its subdirectories, then
//! its own files) with the root left out. Visibility is not baked into the
//! list; it is checked against the tree whenever the cursor moves, so
//! collapsing a directory needs no rebuild.

use crate::tree::{FileTree, Node, NodeId};

/// One row of the flattened tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeNode {
    pub id: NodeId,
    /// Distance from the root; top-level entries are at depth 1
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    tree: FileTree,
    nodes: Vec<TreeNode>,
    cursor: usize,
    selected_path: Option<String>,
    pub focused: bool,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(FileTree::new())
    }
}

impl Navigator {
    pub fn new(tree: FileTree) -> Self {
        let nodes = flatten(&tree);
        let mut navigator = Self {
            tree,
            nodes,
            cursor: 0,
            selected_path: None,
            focused: true,
        };
        navigator.remember_selection();
        navigator
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    /// Every flattened row, hidden ones included
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Raw cursor index into the flattened list
    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.nodes
            .get(index)
            .is_some_and(|node| self.tree.is_visible(node.id))
    }

    /// Visible rows paired with their index in the flattened list
    pub fn visible(&self) -> impl Iterator<Item = (usize, &TreeNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| self.tree.is_visible(node.id))
    }

    /// Position of the cursor among the visible rows
    pub fn visible_cursor_row(&self) -> Option<usize> {
        let cursor = self.clamped_cursor()?;
        self.visible().position(|(index, _)| index == cursor)
    }

    fn clamped_cursor(&self) -> Option<usize> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(self.cursor.min(self.nodes.len() - 1))
        }
    }

    /// Node under the cursor
    pub fn selected(&self) -> Option<(&TreeNode, &Node)> {
        let node = self.nodes.get(self.clamped_cursor()?)?;
        Some((node, self.tree.node(node.id)?))
    }

    /// Path of the node under the cursor, `None` for an empty tree
    pub fn selected_path(&self) -> Option<&str> {
        self.selected().map(|(_, node)| node.path())
    }

    pub fn move_down(&mut self) -> bool {
        let Some(cursor) = self.clamped_cursor() else {
            return false;
        };
        let next = (cursor + 1..self.nodes.len()).find(|&i| self.is_visible(i));
        next.is_some_and(|index| self.set_cursor(index))
    }

    pub fn move_up(&mut self) -> bool {
        let Some(cursor) = self.clamped_cursor() else {
            return false;
        };
        let previous = (0..cursor).rev().find(|&i| self.is_visible(i));
        previous.is_some_and(|index| self.set_cursor(index))
    }

    pub fn move_to_top(&mut self) -> bool {
        let first = (0..self.nodes.len()).find(|&i| self.is_visible(i));
        first.is_some_and(|index| self.set_cursor(index))
    }

    pub fn move_to_bottom(&mut self) -> bool {
        let last = (0..self.nodes.len()).rev().find(|&i| self.is_visible(i));
        last.is_some_and(|index| self.set_cursor(index))
    }

    /// Expand or collapse the directory under the cursor
    pub fn toggle_expand(&mut self) -> bool {
        let Some((node, _)) = self.selected() else {
            return false;
        };
        let id = node.id;
        self.tree.toggle_expanded(id)
    }

    /// Put the cursor on the node with `path`, if present
    pub fn select_path(&mut self, path: &str) -> bool {
        let Some(index) = self.position_of(path) else {
            return false;
        };
        self.cursor = index;
        self.reveal_cursor();
        self.remember_selection();
        true
    }

    fn position_of(&self, path: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|node| self.tree.node(node.id).is_some_and(|n| n.path() == path))
    }

    /// Replace the tree, re-anchoring the cursor on `previous_path`.
    ///
    /// Directories collapsed in the old tree stay collapsed. When the path is
    /// gone the cursor index is clamped into the new list instead.
    pub fn rebind(&mut self, mut tree: FileTree, previous_path: Option<&str>) {
        for path in self.tree.collapsed_paths() {
            if let Some(id) = tree.find(&path) {
                tree.set_expanded(id, false);
            }
        }

        self.tree = tree;
        self.nodes = flatten(&self.tree);

        self.cursor = match previous_path.and_then(|path| self.position_of(path)) {
            Some(index) => index,
            None => self.cursor.min(self.nodes.len().saturating_sub(1)),
        };

        self.reveal_cursor();
        self.remember_selection();
    }

    /// Rebind using the path remembered from the last cursor move
    pub fn refresh(&mut self, tree: FileTree) {
        let previous = self.selected_path.clone();
        self.rebind(tree, previous.as_deref());
    }

    /// Last selected path, kept across rebuilds
    #[cfg(test)]
    pub fn remembered_path(&self) -> Option<&str> {
        self.selected_path.as_deref()
    }

    fn set_cursor(&mut self, index: usize) -> bool {
        self.cursor = index;
        self.remember_selection();
        true
    }

    /// Step back to the nearest visible row if the cursor sits on a hidden one
    fn reveal_cursor(&mut self) {
        let Some(cursor) = self.clamped_cursor() else {
            return;
        };
        if self.is_visible(cursor) {
            return;
        }
        if let Some(index) = (0..cursor).rev().find(|&i| self.is_visible(i)) {
            self.cursor = index;
        } else if let Some(index) = (cursor..self.nodes.len()).find(|&i| self.is_visible(i)) {
            self.cursor = index;
        }
    }

    fn remember_selection(&mut self) {
        self.selected_path = self.selected_path().map(str::to_string);
    }
}

/// Pre-order flattening of every node below the root
pub fn flatten(tree: &FileTree) -> Vec<TreeNode> {
    let mut nodes = Vec::new();
    flatten_directory(tree, FileTree::ROOT, 0, &mut nodes);
    nodes
}

fn flatten_directory(tree: &FileTree, id: NodeId, depth: usize, out: &mut Vec<TreeNode>) {
    let Some(dir) = tree.directory(id) else {
        return;
    };
    if id != FileTree::ROOT {
        out.push(TreeNode { id, depth });
    }
    for &sub in &dir.directories {
        flatten_directory(tree, sub, depth + 1, out);
    }
    for &file in &dir.files {
        out.push(TreeNode {
            id: file,
            depth: depth + 1,
        });
    }
}
