/*!
 * Folder tree built from the flat file list
 *
 * The tree is rebuilt from scratch on every call to [`FolderTree::build`]; the
 * flattened order is folders before files, then names compared byte-wise.
 */

use std::collections::BTreeMap;

use crate::exclusion::ExclusionEngine;
use crate::types::{FileRecord, FlatItem, TreeNode};

/// File count above which trees are rendered incrementally
pub const LARGE_TREE_THRESHOLD: usize = 500;

/// Number of flattened items per incremental rendering chunk
pub const RENDER_CHUNK_SIZE: usize = 100;

/// How a tree of a given size should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Materialize every item at once
    Full,
    /// Render in chunks of `chunk_size` items
    Virtualized { total: usize, chunk_size: usize },
}

/// Hierarchical view of the project files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderTree {
    root: TreeNode,
    file_count: usize,
}

impl FolderTree {
    /// Build the tree from the file list
    pub fn build(files: &[FileRecord]) -> Self {
        Self::from_paths(files.iter().map(|f| f.relative_path.as_str()))
    }

    /// Build the tree from relative paths
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut root = TreeNode {
            name: String::new(),
            is_file: false,
            path: String::new(),
            children: BTreeMap::new(),
        };
        let mut file_count = 0;

        for path in paths {
            let segments: Vec<&str> = path.split('/').collect();
            let last = segments.len() - 1;
            let mut current = &mut root;
            let mut cumulative = String::with_capacity(path.len());

            for (idx, segment) in segments.iter().enumerate() {
                if idx > 0 {
                    cumulative.push('/');
                }
                cumulative.push_str(segment);

                current = current
                    .children
                    .entry((*segment).to_string())
                    .or_insert_with(|| {
                        if idx == last {
                            file_count += 1;
                        }
                        TreeNode {
                            name: (*segment).to_string(),
                            is_file: idx == last,
                            path: cumulative.clone(),
                            children: BTreeMap::new(),
                        }
                    });
            }
        }

        Self { root, file_count }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Depth-first list of every node below the root
    pub fn flatten(&self) -> Vec<FlatItem<'_>> {
        flatten(&self.root, 0)
    }

    /// Lazy depth-first walk in flattened order
    pub fn iter(&self) -> FlatIter<'_> {
        FlatIter::new(&self.root, 0)
    }

    /// Number of nodes below the root, counted without flattening
    pub fn node_count(&self) -> usize {
        count_nodes(&self.root)
    }

    /// Render mode for a file-count threshold
    pub fn render_mode(&self, threshold: usize) -> RenderMode {
        if self.file_count > threshold {
            RenderMode::Virtualized {
                total: self.node_count(),
                chunk_size: RENDER_CHUNK_SIZE,
            }
        } else {
            RenderMode::Full
        }
    }

    /// Render the tree as indented text lines, marking excluded entries
    /// with `[ ]` and included ones with `[x]`; lines are produced on demand
    pub fn render_lines<'a>(
        &'a self,
        engine: &'a ExclusionEngine,
    ) -> impl Iterator<Item = String> + 'a {
        self.iter().map(move |item| {
            let mark = if is_excluded(item.node, engine) {
                "[ ]"
            } else {
                "[x]"
            };
            let suffix = if item.node.is_file { "" } else { "/" };
            format!("{}{} {}{}", "  ".repeat(item.depth), mark, item.name, suffix)
        })
    }
}

fn count_nodes(node: &TreeNode) -> usize {
    node.children.values().map(|c| 1 + count_nodes(c)).sum()
}

/// A folder counts as excluded when every file below it is
fn is_excluded(node: &TreeNode, engine: &ExclusionEngine) -> bool {
    engine.should_exclude(&node.path)
        || (!node.is_file && node.children.values().all(|c| is_excluded(c, engine)))
}

/// Flatten a node's children depth-first: folders first, then by name
pub fn flatten(node: &TreeNode, depth: usize) -> Vec<FlatItem<'_>> {
    FlatIter::new(node, depth).collect()
}

/// Children of a folder: folders first, then files, each in byte order
fn sorted_children(node: &TreeNode) -> std::vec::IntoIter<(&str, &TreeNode)> {
    let mut entries: Vec<(&str, &TreeNode)> = node
        .children
        .iter()
        .map(|(name, child)| (name.as_str(), child))
        .collect();
    // BTreeMap already yields names in byte order; the stable sort keeps it
    entries.sort_by_key(|(_, child)| child.is_file);
    entries.into_iter()
}

/// Depth-first iterator over a tree; only the open folders are held
pub struct FlatIter<'a> {
    stack: Vec<(std::vec::IntoIter<(&'a str, &'a TreeNode)>, usize)>,
}

impl<'a> FlatIter<'a> {
    pub fn new(node: &'a TreeNode, depth: usize) -> Self {
        Self {
            stack: vec![(sorted_children(node), depth)],
        }
    }
}

impl<'a> Iterator for FlatIter<'a> {
    type Item = FlatItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (entries, depth) = self.stack.last_mut()?;
            let depth = *depth;
            match entries.next() {
                Some((name, child)) => {
                    if !child.is_file {
                        self.stack.push((sorted_children(child), depth + 1));
                    }
                    return Some(FlatItem {
                        name,
                        node: child,
                        depth,
                    });
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &FolderTree) -> Vec<(String, usize)> {
        tree.flatten()
            .into_iter()
            .map(|i| (i.name.to_string(), i.depth))
            .collect()
    }

    #[test]
    fn test_build_marks_files_and_paths() {
        let tree = FolderTree::from_paths(["p/src/main.rs", "p/Cargo.toml"]);
        let p = &tree.root().children["p"];
        assert!(!p.is_file);
        assert_eq!(p.path, "p");
        let main = &p.children["src"].children["main.rs"];
        assert!(main.is_file);
        assert_eq!(main.path, "p/src/main.rs");
        assert_eq!(tree.file_count(), 2);
    }

    #[test]
    fn test_build_is_idempotent() {
        let paths = ["p/b.rs", "p/a/x.rs", "p/a/y.rs"];
        assert_eq!(FolderTree::from_paths(paths), FolderTree::from_paths(paths));
    }

    #[test]
    fn test_flatten_folders_first_then_case_sensitive() {
        let tree = FolderTree::from_paths([
            "p/b.txt",
            "p/Z.txt",
            "p/a.txt",
            "p/zdir/inner.rs",
            "p/Adir/x.rs",
        ]);
        assert_eq!(
            names(&tree),
            vec![
                ("p".to_string(), 0),
                ("Adir".to_string(), 1),
                ("x.rs".to_string(), 2),
                ("zdir".to_string(), 1),
                ("inner.rs".to_string(), 2),
                ("Z.txt".to_string(), 1),
                ("a.txt".to_string(), 1),
                ("b.txt".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_render_mode_threshold() {
        let paths: Vec<String> = (0..3).map(|i| format!("p/f{}.rs", i)).collect();
        let tree = FolderTree::from_paths(paths.iter().map(String::as_str));
        assert_eq!(tree.render_mode(3), RenderMode::Full);
        assert_eq!(
            tree.render_mode(2),
            RenderMode::Virtualized {
                total: 4,
                chunk_size: RENDER_CHUNK_SIZE
            }
        );
    }

    #[test]
    fn test_render_lines_marks_exclusions() {
        let files = vec![
            FileRecord::in_memory("p/keep.rs", ""),
            FileRecord::in_memory("p/node_modules/m.js", ""),
        ];
        let mut engine = ExclusionEngine::new();
        engine.apply_auto_exclusions(&files);
        let tree = FolderTree::build(&files);
        assert_eq!(
            tree.render_lines(&engine).collect::<Vec<_>>(),
            vec!["[x] p/", "  [ ] node_modules/", "    [ ] m.js", "  [x] keep.rs"]
        );
    }

    #[test]
    fn test_large_tree_renders_first_chunk_only() {
        let paths: Vec<String> = (0..600)
            .map(|i| format!("p/d{}/f{:03}.rs", i % 7, i))
            .collect();
        let tree = FolderTree::from_paths(paths.iter().map(String::as_str));
        let engine = ExclusionEngine::new();

        let RenderMode::Virtualized { total, chunk_size } = tree.render_mode(LARGE_TREE_THRESHOLD)
        else {
            panic!("expected a virtualized tree");
        };
        assert_eq!(total, tree.flatten().len());
        assert_eq!(total, 1 + 7 + 600);

        let chunk: Vec<String> = tree.render_lines(&engine).take(chunk_size).collect();
        assert_eq!(chunk.len(), RENDER_CHUNK_SIZE);
        assert_eq!(chunk[0], "[x] p/");
        assert_eq!(chunk[1], "  [x] d0/");

        let lazy: Vec<FlatItem<'_>> = tree.iter().take(chunk_size).collect();
        assert_eq!(lazy, tree.flatten()[..chunk_size].to_vec());
    }
}
