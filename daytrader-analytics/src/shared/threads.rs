//! Reply-tree reconstruction from a flat post batch.
//!
//! The forest is rebuilt from scratch on every tick. Every input post appears
//! exactly once, either as a root or as a descendant of one:
//! - a post whose `reply_to` is absent, equal to its own id, or not present in
//!   the batch becomes a root
//! - reply cycles (A -> B -> A) are broken by promoting the cycle member with
//!   the smallest `(ts, id)` to a root
//!
//! All traversals use explicit work stacks so arbitrarily deep reply chains
//! cannot exhaust the call stack.

use std::collections::HashMap;

use serde::Serialize;

use super::types::{Post, PostId};

/// A post plus its ordered replies and subtree metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadNode {
    pub post: Post,
    /// Direct replies, ascending by `ts`
    pub replies: Vec<ThreadNode>,
    /// Max `ts` over this node and all descendants
    pub latest_ts: f64,
    /// Total number of descendants
    pub reply_count: usize,
}

impl ThreadNode {
    /// Depth-first pre-order walk yielding `(depth, node)`, root at depth 0
    pub fn walk(&self) -> Vec<(usize, &ThreadNode)> {
        let mut out = Vec::with_capacity(self.reply_count + 1);
        let mut stack = vec![(0usize, self)];
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            // Reverse so the earliest reply is visited first
            stack.extend(node.replies.iter().rev().map(|reply| (depth + 1, reply)));
        }
        out
    }

    /// Headline of the root post for thread summaries
    pub fn headline(&self) -> &str {
        extract_headline(&self.post.text)
    }
}

/// Total number of posts held in a forest
pub fn forest_size(forest: &[ThreadNode]) -> usize {
    forest.iter().map(|root| root.reply_count + 1).sum()
}

/// Rebuild the reply forest for one post batch, most recently active thread first.
pub fn build_threads(posts: &[Post]) -> Vec<ThreadNode> {
    if posts.is_empty() {
        return Vec::new();
    }

    // First occurrence of an id is the only valid attachment target
    let mut lookup: HashMap<PostId, usize> = HashMap::with_capacity(posts.len());
    for (index, post) in posts.iter().enumerate() {
        lookup.entry(post.id).or_insert(index);
    }

    let mut parent: Vec<Option<usize>> = posts
        .iter()
        .enumerate()
        .map(|(index, post)| {
            post.reply_to
                .filter(|reply_to| *reply_to != post.id)
                .and_then(|reply_to| lookup.get(&reply_to).copied())
                .filter(|parent_index| *parent_index != index)
        })
        .collect();

    break_cycles(posts, &mut parent);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); posts.len()];
    let mut roots = Vec::new();
    for (index, link) in parent.iter().enumerate() {
        match link {
            Some(parent_index) => children[*parent_index].push(index),
            None => roots.push(index),
        }
    }
    for replies in &mut children {
        replies.sort_by(|a, b| posts[*a].ts.total_cmp(&posts[*b].ts));
    }

    // Pre-order over the now acyclic forest; reversed, every child precedes its parent
    let mut order = Vec::with_capacity(posts.len());
    let mut stack = roots.clone();
    while let Some(index) = stack.pop() {
        order.push(index);
        stack.extend(children[index].iter().copied());
    }

    let mut built: Vec<Option<ThreadNode>> = vec![None; posts.len()];
    for &index in order.iter().rev() {
        let replies: Vec<ThreadNode> = children[index]
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        let latest_ts = replies
            .iter()
            .map(|reply| reply.latest_ts)
            .fold(posts[index].ts, f64::max);
        let reply_count = replies.iter().map(|reply| reply.reply_count + 1).sum();

        built[index] = Some(ThreadNode {
            post: posts[index].clone(),
            replies,
            latest_ts,
            reply_count,
        });
    }

    let mut forest: Vec<ThreadNode> = roots
        .into_iter()
        .filter_map(|index| built[index].take())
        .collect();
    forest.sort_by(|a, b| b.latest_ts.total_cmp(&a.latest_ts));
    forest
}

/// Detach one member of every parent-pointer cycle.
///
/// Each post has at most one parent, so every cycle is found by following
/// parent links until reaching either a root, an already resolved post, or a
/// post on the current path.
fn break_cycles(posts: &[Post], parent: &mut [Option<usize>]) {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; posts.len()];
    let mut path: Vec<usize> = Vec::new();

    for start in 0..posts.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        path.clear();
        let mut cursor = Some(start);
        while let Some(index) = cursor {
            match marks[index] {
                Mark::Done => break,
                Mark::OnPath => {
                    let cycle_start = path
                        .iter()
                        .position(|member| *member == index)
                        .unwrap_or(0);
                    let promoted = path[cycle_start..]
                        .iter()
                        .copied()
                        .min_by(|a, b| {
                            posts[*a]
                                .ts
                                .total_cmp(&posts[*b].ts)
                                .then(posts[*a].id.cmp(&posts[*b].id))
                        })
                        .unwrap_or(index);
                    parent[promoted] = None;
                    break;
                }
                Mark::Unvisited => {
                    marks[index] = Mark::OnPath;
                    path.push(index);
                    cursor = parent[index];
                }
            }
        }

        for member in &path {
            marks[*member] = Mark::Done;
        }
    }
}

/// First meaningful line of a post, without any `Headline:` prefix.
pub fn extract_headline(text: &str) -> &str {
    let Some(line) = text.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return "";
    };

    let prefix = "headline:";
    match line.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => line[prefix.len()..].trim(),
        _ => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn post(id: PostId, ts: f64, reply_to: Option<PostId>) -> Post {
        Post {
            id,
            ts,
            agent: format!("agent-{}", id % 3),
            text: format!("note {}", id),
            reply_to,
        }
    }

    fn ids(forest: &[ThreadNode]) -> Vec<PostId> {
        forest.iter().map(|node| node.post.id).collect()
    }

    /// Every post exactly once, counts and latest_ts consistent
    fn assert_forest_invariants(posts: &[Post], forest: &[ThreadNode]) {
        assert_eq!(forest_size(forest), posts.len());

        let mut seen = Vec::new();
        for root in forest {
            for (_, node) in root.walk() {
                seen.push(node.post.id);

                let descendants = node.walk().len() - 1;
                assert_eq!(node.reply_count, descendants, "reply_count of {}", node.post.id);

                let max_ts = node
                    .walk()
                    .iter()
                    .map(|(_, n)| n.post.ts)
                    .fold(f64::MIN, f64::max);
                assert_eq!(node.latest_ts, max_ts, "latest_ts of {}", node.post.id);

                for pair in node.replies.windows(2) {
                    assert!(pair[0].post.ts <= pair[1].post.ts, "replies unsorted");
                }
            }
        }
        let mut expected: Vec<PostId> = posts.iter().map(|p| p.id).collect();
        seen.sort_unstable();
        expected.sort_unstable();
        assert_eq!(seen, expected);

        for pair in forest.windows(2) {
            assert!(pair[0].latest_ts >= pair[1].latest_ts, "roots unsorted");
        }
    }

    #[test]
    fn test_empty_batch() {
        assert!(build_threads(&[]).is_empty());
    }

    #[test]
    fn test_builds_nested_threads() {
        // 1 <- 2 <- 4, 1 <- 3, 5 standalone
        let posts = vec![
            post(4, 40.0, Some(2)),
            post(1, 10.0, None),
            post(3, 30.0, Some(1)),
            post(2, 20.0, Some(1)),
            post(5, 35.0, None),
        ];

        let forest = build_threads(&posts);
        assert_forest_invariants(&posts, &forest);

        // Thread 1 is active at ts 40, thread 5 at ts 35
        assert_eq!(ids(&forest), vec![1, 5]);

        let thread = &forest[0];
        assert_eq!(thread.reply_count, 3);
        assert_eq!(thread.latest_ts, 40.0);
        assert_eq!(ids(&thread.replies), vec![2, 3]);
        assert_eq!(ids(&thread.replies[0].replies), vec![4]);
        assert_eq!(thread.replies[0].latest_ts, 40.0);
        assert_eq!(thread.replies[1].reply_count, 0);

        let walk: Vec<(usize, PostId)> = thread
            .walk()
            .into_iter()
            .map(|(depth, node)| (depth, node.post.id))
            .collect();
        assert_eq!(walk, vec![(0, 1), (1, 2), (2, 4), (1, 3)]);
    }

    #[test]
    fn test_dangling_parent_promoted_to_root() {
        let posts = vec![post(1, 10.0, None), post(2, 20.0, Some(99))];

        let forest = build_threads(&posts);
        assert_forest_invariants(&posts, &forest);
        assert_eq!(ids(&forest), vec![2, 1]);
        assert!(forest.iter().all(|root| root.reply_count == 0));
    }

    #[test]
    fn test_self_reply_is_root() {
        let posts = vec![post(7, 70.0, Some(7))];

        let forest = build_threads(&posts);
        assert_forest_invariants(&posts, &forest);
        assert_eq!(ids(&forest), vec![7]);
        assert!(forest[0].replies.is_empty());
    }

    #[test]
    fn test_two_post_cycle_broken_at_earliest() {
        let posts = vec![post(1, 20.0, Some(2)), post(2, 10.0, Some(1))];

        let forest = build_threads(&posts);
        assert_forest_invariants(&posts, &forest);
        assert_eq!(ids(&forest), vec![2]);
        assert_eq!(ids(&forest[0].replies), vec![1]);
    }

    #[test]
    fn test_cycle_with_tail() {
        // 1 -> 2 -> 3 -> 1 loop, 4 hangs off 3, 5 hangs off 4
        let posts = vec![
            post(1, 15.0, Some(3)),
            post(2, 12.0, Some(1)),
            post(3, 18.0, Some(2)),
            post(4, 30.0, Some(3)),
            post(5, 31.0, Some(4)),
        ];

        let forest = build_threads(&posts);
        assert_forest_invariants(&posts, &forest);

        // Post 2 has the smallest ts in the loop
        assert_eq!(ids(&forest), vec![2]);
        assert_eq!(forest[0].reply_count, 4);
        assert_eq!(forest[0].latest_ts, 31.0);
    }

    #[test]
    fn test_cycle_tie_broken_by_id() {
        let posts = vec![post(9, 5.0, Some(8)), post(8, 5.0, Some(9))];

        let forest = build_threads(&posts);
        assert_forest_invariants(&posts, &forest);
        assert_eq!(ids(&forest), vec![8]);
    }

    #[test]
    fn test_duplicate_ids_keep_every_post() {
        let posts = vec![
            post(1, 10.0, None),
            post(1, 11.0, None),
            post(2, 12.0, Some(1)),
        ];

        let forest = build_threads(&posts);
        assert_eq!(forest_size(&forest), 3);

        // Reply attaches to the first occurrence
        let first = forest.iter().find(|n| n.post.ts == 10.0).unwrap();
        assert_eq!(ids(&first.replies), vec![2]);
    }

    #[test]
    fn test_root_order_stable_on_rerun() {
        let posts: Vec<Post> = (0..30)
            .map(|id| post(id, (id % 4) as f64, (id % 5 == 0 && id > 0).then(|| id - 1)))
            .collect();

        let first = build_threads(&posts);
        let second = build_threads(&posts);
        assert_forest_invariants(&posts, &first);
        assert_eq!(first, second);
    }

    #[test]
    fn test_deep_chain() {
        let depth: u64 = 1_000;
        let posts: Vec<Post> = (0..depth)
            .map(|id| post(id, id as f64, id.checked_sub(1)))
            .collect();

        let forest = build_threads(&posts);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].reply_count, depth as usize - 1);
        assert_eq!(forest[0].latest_ts, (depth - 1) as f64);
    }

    #[test]
    fn test_mixed_batch_every_post_once() {
        let posts = vec![
            post(1, 1.0, None),
            post(2, 2.0, Some(1)),
            post(3, 3.0, Some(3)),
            post(4, 4.0, Some(5)),
            post(5, 5.0, Some(4)),
            post(6, 6.0, Some(404)),
            post(7, 7.0, Some(2)),
            post(8, 0.5, Some(7)),
        ];

        let forest = build_threads(&posts);
        assert_forest_invariants(&posts, &forest);

        let unique: HashSet<PostId> = forest.iter().map(|n| n.post.id).collect();
        assert_eq!(unique.len(), forest.len());
    }

    #[test]
    fn test_extract_headline() {
        struct TestCase {
            input: &'static str,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: explicit headline prefix
                input: "Headline: Gold squeezes higher\nBias: Long",
                expected: "Gold squeezes higher",
            },
            TestCase {
                // TC1: leading blank lines and case-insensitive prefix
                input: "\n   \n  HEADLINE:  Oil fades: again \nrest",
                expected: "Oil fades: again",
            },
            TestCase {
                // TC2: no prefix, first non-blank line
                input: "  watching NVDA into earnings\nBias: Neutral",
                expected: "watching NVDA into earnings",
            },
            TestCase {
                // TC3: empty
                input: "",
                expected: "",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = extract_headline(test.input);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
