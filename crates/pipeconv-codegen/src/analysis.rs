//! Graph queries used by the compiler to rebuild structured control flow

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::ir::{NodeId, PipelineDefinition};

/// Nodes reachable from `from` (inclusive), in breadth-first order
pub(crate) fn bfs_order(definition: &PipelineDefinition, from: NodeId) -> Vec<NodeId> {
    bfs_bounded(definition, from, &HashSet::new())
}

/// Like [`bfs_order`], but nodes in `bounds` are visited without following
/// their outgoing edges
fn bfs_bounded(definition: &PipelineDefinition, from: NodeId, bounds: &HashSet<NodeId>) -> Vec<NodeId> {
    let mut seen = HashSet::from([from]);
    let mut queue = VecDeque::from([from]);
    let mut order = Vec::new();

    while let Some(id) = queue.pop_front() {
        order.push(id);
        if bounds.contains(&id) {
            continue;
        }
        for transition in definition.outgoing(id) {
            if seen.insert(transition.to) {
                queue.push_back(transition.to);
            }
        }
    }
    order
}

/// Targets of back edges found by depth-first search from `roots`.
///
/// These are the nodes where a cycle re-enters, so the compiler opens a loop
/// there.
pub(crate) fn back_edge_targets(
    definition: &PipelineDefinition,
    roots: &[NodeId],
) -> BTreeSet<NodeId> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; definition.nodes.len()];
    let mut targets = BTreeSet::new();

    for &root in roots {
        if marks[root.0] != Mark::New {
            continue;
        }
        // (node, index of the next outgoing transition to follow)
        let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
        marks[root.0] = Mark::Active;

        while let Some(&(id, next)) = stack.last() {
            match definition.outgoing(id).nth(next) {
                Some(transition) => {
                    let top = stack.len() - 1;
                    stack[top].1 += 1;
                    let to = transition.to;
                    match marks[to.0] {
                        Mark::New => {
                            marks[to.0] = Mark::Active;
                            stack.push((to, 0));
                        }
                        Mark::Active => {
                            targets.insert(to);
                        }
                        Mark::Done => {}
                    }
                }
                None => {
                    marks[id.0] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }
    targets
}

/// First node, in breadth-first order from the first branch, that every
/// branch reaches. `None` for fewer than two branches or disjoint paths.
pub(crate) fn merge_point(definition: &PipelineDefinition, branches: &[NodeId]) -> Option<NodeId> {
    merge_point_within(definition, branches, &HashSet::new())
}

/// [`merge_point`] without walking past `bounds`, such as the headers and
/// exits of the loops around the branches
pub(crate) fn merge_point_within(
    definition: &PipelineDefinition,
    branches: &[NodeId],
    bounds: &HashSet<NodeId>,
) -> Option<NodeId> {
    let (first, rest) = branches.split_first()?;
    if rest.is_empty() {
        return None;
    }

    let reach: Vec<HashSet<NodeId>> = rest
        .iter()
        .map(|&branch| bfs_bounded(definition, branch, bounds).into_iter().collect())
        .collect();

    bfs_bounded(definition, *first, bounds)
        .into_iter()
        .find(|id| reach.iter().all(|set| set.contains(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{NodeKind, TransitionLabel};

    fn label(name: &str) -> TransitionLabel {
        TransitionLabel::Named(name.to_string())
    }

    #[test]
    fn test_bfs_order_handles_cycles() {
        let mut ir = PipelineDefinition::new("P");
        let a = ir.add_node("a", NodeKind::Join);
        let b = ir.add_node("b", NodeKind::Join);
        ir.connect(a, b, TransitionLabel::Success);
        ir.connect(b, a, TransitionLabel::Success);
        assert_eq!(bfs_order(&ir, a), vec![a, b]);
    }

    #[test]
    fn test_back_edge_targets() {
        let mut ir = PipelineDefinition::new("P");
        let start = ir.add_node("s", NodeKind::Join);
        let head = ir.add_node("head", NodeKind::Join);
        let body = ir.add_node("body", NodeKind::Join);
        let exit = ir.add_node("exit", NodeKind::Stop);
        ir.connect(start, head, TransitionLabel::Success);
        ir.connect(head, body, label("do"));
        ir.connect(body, head, TransitionLabel::Success);
        ir.connect(head, exit, TransitionLabel::Success);

        let targets = back_edge_targets(&ir, &[start]);
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec![head]);
    }

    #[test]
    fn test_diamond_has_no_back_edges() {
        let mut ir = PipelineDefinition::new("P");
        let d = ir.add_node("d", NodeKind::Join);
        let y = ir.add_node("y", NodeKind::Join);
        let n = ir.add_node("n", NodeKind::Join);
        let m = ir.add_node("m", NodeKind::Stop);
        ir.connect(d, y, label("yes"));
        ir.connect(d, n, label("no"));
        ir.connect(y, m, TransitionLabel::Success);
        ir.connect(n, m, TransitionLabel::Success);

        assert!(back_edge_targets(&ir, &[d]).is_empty());
        assert_eq!(merge_point(&ir, &[y, n]), Some(m));
    }

    #[test]
    fn test_merge_point_when_one_branch_is_the_merge() {
        let mut ir = PipelineDefinition::new("P");
        let y = ir.add_node("y", NodeKind::Join);
        let m = ir.add_node("m", NodeKind::Stop);
        ir.connect(y, m, TransitionLabel::Success);

        assert_eq!(merge_point(&ir, &[y, m]), Some(m));
        assert_eq!(merge_point(&ir, &[m, y]), Some(m));
    }

    #[test]
    fn test_merge_point_within_stops_at_loop_header() {
        // head -> a -> {b, c}; b -> c -> head
        let mut ir = PipelineDefinition::new("P");
        let head = ir.add_node("head", NodeKind::Join);
        let a = ir.add_node("a", NodeKind::Join);
        let b = ir.add_node("b", NodeKind::Join);
        let c = ir.add_node("c", NodeKind::Join);
        ir.connect(head, a, TransitionLabel::Success);
        ir.connect(a, b, label("x"));
        ir.connect(a, c, label("y"));
        ir.connect(b, c, TransitionLabel::Success);
        ir.connect(c, head, TransitionLabel::Success);

        // Around the cycle, c reaches b again
        assert_eq!(merge_point(&ir, &[b, c]), Some(b));
        let bounds = HashSet::from([head]);
        assert_eq!(merge_point_within(&ir, &[b, c], &bounds), Some(c));
        assert_eq!(merge_point_within(&ir, &[head, c], &bounds), Some(head));
    }

    #[test]
    fn test_merge_point_disjoint() {
        let mut ir = PipelineDefinition::new("P");
        let a = ir.add_node("a", NodeKind::Stop);
        let b = ir.add_node("b", NodeKind::Stop);
        assert_eq!(merge_point(&ir, &[a, b]), None);
        assert_eq!(merge_point(&ir, &[a]), None);
    }
}
