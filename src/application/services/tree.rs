//! Content tree rendering

use termtree::Tree;

use crate::domain::{ContentNode, ContentRef};
use crate::infrastructure::traits::ContentRepository;

fn label(node: &ContentNode) -> String {
    format!("{} [{}] {}", node.name, node.type_name, node.reference)
}

fn subtree<R: ContentRepository + ?Sized>(repo: &R, node: ContentNode) -> Tree<String> {
    let leaves: Vec<Tree<String>> = repo
        .children(node.reference)
        .into_iter()
        .map(|child| subtree(repo, child))
        .collect();
    Tree::new(label(&node)).with_leaves(leaves)
}

/// Render the hierarchy below `root`, or `None` if `root` does not exist.
pub fn render_tree<R: ContentRepository + ?Sized>(repo: &R, root: ContentRef) -> Option<Tree<String>> {
    repo.get(root).map(|node| subtree(repo, node))
}
