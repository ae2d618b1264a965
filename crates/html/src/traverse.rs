use crate::Node;

/// Visits every node below `root` in document pre-order, with its path.
pub fn walk_preorder(root: &Node, mut visit: impl FnMut(&Node, &[usize])) {
    // Explicit stack of (parent, next child index) so depth is bounded by the heap.
    let mut path: Vec<usize> = Vec::new();
    let mut stack: Vec<(&Node, usize)> = vec![(root, 0)];

    while let Some(top) = stack.last_mut() {
        let (parent, index) = *top;
        let Some(child) = parent.children().get(index) else {
            stack.pop();
            path.pop();
            continue;
        };
        top.1 += 1;
        path.push(index);
        visit(child, &path);
        stack.push((child, 0));
    }
}

/// Total number of nodes below `root`.
pub fn count_descendants(root: &Node) -> usize {
    let mut count = 0;
    walk_preorder(root, |_, _| count += 1);
    count
}
