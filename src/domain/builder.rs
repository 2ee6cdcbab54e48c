//! Tree builder: resolves the parent of each row from the previous row's level.
//!
//! Rows carry no parent pointers. The parent of a row follows from comparing its level with
//! the level of the row before it:
//!
//! | level                  | parent                          |
//! |------------------------|---------------------------------|
//! | `0`                    | configured root                 |
//! | same as previous       | previous row's parent           |
//! | greater than previous  | previous row's node             |
//! | less than previous     | parent of previous row's parent |

use std::cmp::Ordering;

use tracing::{debug, instrument};

use crate::domain::entities::{ContentRef, PlacedNode, RowRecord};
use crate::domain::error::{DomainError, DomainResult};

/// Resolves the parent link of a persisted node. Needed only when a row ascends.
pub trait ParentLookup {
    fn parent_of(&self, node: ContentRef) -> Option<ContentRef>;
}

/// How a row relates to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Root,
    Sibling,
    Descend,
    Ascend,
}

/// What the builder remembers about the previous row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeCursor {
    /// `-1` before the first row, never equal to a real level
    pub previous_level: i64,
    pub previous_parent: Option<ContentRef>,
    pub previous_node: Option<ContentRef>,
}

impl Default for TreeCursor {
    fn default() -> Self {
        Self::start()
    }
}

impl TreeCursor {
    pub const fn start() -> Self {
        Self {
            previous_level: -1,
            previous_parent: None,
            previous_node: None,
        }
    }

    pub fn relation(&self, level: u32) -> Relation {
        if level == 0 {
            return Relation::Root;
        }
        match i64::from(level).cmp(&self.previous_level) {
            Ordering::Equal => Relation::Sibling,
            Ordering::Greater => Relation::Descend,
            Ordering::Less => Relation::Ascend,
        }
    }

    /// Cursor for the next row, once `placed` has been persisted as `node`.
    #[must_use]
    pub fn advance(self, placed: &PlacedNode, node: ContentRef) -> Self {
        Self {
            previous_level: i64::from(placed.record.level),
            previous_parent: Some(placed.parent),
            previous_node: Some(node),
        }
    }
}

/// Places rows under their parents and hands out the running sibling order.
#[derive(Debug)]
pub struct TreeBuilder {
    root: ContentRef,
    next_order: u32,
}

impl TreeBuilder {
    pub fn new(root: ContentRef) -> Self {
        Self {
            root,
            next_order: 0,
        }
    }

    /// Number of rows placed so far.
    pub fn placed(&self) -> u32 {
        self.next_order
    }

    /// Resolve the parent of `record` from `cursor` and assign its order.
    ///
    /// Only the ascend case touches `lookup`. Fails with [`DomainError::Lookup`] when the
    /// previous parent has no parent of its own, and with [`DomainError::MalformedRow`] when a
    /// row descends with no previous node (a first row with level > 0).
    #[instrument(level = "debug", skip(self, cursor, record, lookup), fields(row = record.row, level = record.level))]
    pub fn place<L: ParentLookup + ?Sized>(
        &mut self,
        cursor: &TreeCursor,
        record: RowRecord,
        lookup: &L,
    ) -> DomainResult<PlacedNode> {
        let relation = cursor.relation(record.level);
        let parent = match relation {
            Relation::Root => self.root,
            Relation::Sibling => cursor.previous_parent.ok_or_else(|| {
                DomainError::malformed(record.row, "no previous row to share a parent with")
            })?,
            Relation::Descend => cursor.previous_node.ok_or_else(|| {
                DomainError::malformed(
                    record.row,
                    format!("level {} has no previous row to nest under", record.level),
                )
            })?,
            Relation::Ascend => {
                let previous_parent = cursor.previous_parent.ok_or_else(|| {
                    DomainError::malformed(record.row, "no previous row to ascend from")
                })?;
                lookup
                    .parent_of(previous_parent)
                    .ok_or(DomainError::Lookup(previous_parent))?
            }
        };

        let order = self.next_order;
        self.next_order += 1;
        debug!("{:?} -> parent {} order {}", relation, parent, order);

        Ok(PlacedNode {
            parent,
            record,
            order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const ROOT: ContentRef = ContentRef(1);

    /// Parent links of nodes created so far; new nodes get sequential ids.
    #[derive(Default)]
    struct Links {
        parents: HashMap<ContentRef, ContentRef>,
        next: u64,
    }

    impl ParentLookup for Links {
        fn parent_of(&self, node: ContentRef) -> Option<ContentRef> {
            self.parents.get(&node).copied()
        }
    }

    impl Links {
        fn create(&mut self, parent: ContentRef) -> ContentRef {
            self.next += 1;
            let node = ContentRef(100 + self.next);
            self.parents.insert(node, parent);
            node
        }
    }

    fn record(row: usize, level: u32) -> RowRecord {
        RowRecord {
            row,
            type_name: "Page".to_string(),
            name: format!("row{row}"),
            level,
            raw_fields: vec![],
        }
    }

    /// Runs levels through the builder, returning (parent, node, order) per row.
    fn run(levels: &[u32]) -> DomainResult<Vec<(ContentRef, ContentRef, u32)>> {
        let mut links = Links::default();
        let mut builder = TreeBuilder::new(ROOT);
        let mut cursor = TreeCursor::start();
        let mut out = Vec::new();
        for (i, level) in levels.iter().enumerate() {
            let placed = builder.place(&cursor, record(i + 1, *level), &links)?;
            let node = links.create(placed.parent);
            cursor = cursor.advance(&placed, node);
            out.push((placed.parent, node, placed.order));
        }
        Ok(out)
    }

    #[test]
    fn given_level_zero_rows_then_all_hang_under_root() {
        let placed = run(&[0, 1, 2, 0, 1, 0]).unwrap();
        for i in [0, 3, 5] {
            assert_eq!(placed[i].0, ROOT);
        }
    }

    #[test]
    fn given_equal_levels_then_siblings_share_parent() {
        let placed = run(&[0, 1, 1, 1]).unwrap();
        assert_eq!(placed[1].0, placed[0].1);
        assert_eq!(placed[2].0, placed[1].0);
        assert_eq!(placed[3].0, placed[1].0);
    }

    #[test]
    fn given_deeper_level_then_parent_is_previous_node() {
        let placed = run(&[0, 1, 2, 5]).unwrap();
        assert_eq!(placed[1].0, placed[0].1);
        assert_eq!(placed[2].0, placed[1].1);
        // jumping several levels still nests one below the previous node
        assert_eq!(placed[3].0, placed[2].1);
    }

    #[test]
    fn given_shallower_level_then_parent_is_grandparent() {
        let placed = run(&[0, 1, 2, 1]).unwrap();
        // row 4 goes under the parent of row 3's parent (row 2's parent = row 1)
        assert_eq!(placed[3].0, placed[0].1);
        assert_eq!(placed[3].0, placed[1].0);
    }

    #[test]
    fn given_drop_of_two_levels_then_ascends_only_one() {
        let placed = run(&[0, 1, 2, 3, 1]).unwrap();
        // parent of row 4's parent (row 3's node) is row 2's node
        assert_eq!(placed[4].0, placed[1].1);
    }

    #[test]
    fn given_any_structure_then_order_counts_rows() {
        let placed = run(&[0, 1, 2, 1, 0, 1, 1]).unwrap();
        let orders: Vec<u32> = placed.iter().map(|p| p.2).collect();
        assert_eq!(orders, (0..7).collect::<Vec<u32>>());
    }

    #[test]
    fn given_first_row_below_root_when_placing_then_malformed() {
        let err = run(&[1, 1]).unwrap_err();
        assert!(matches!(err, DomainError::MalformedRow { row: 1, .. }), "{err}");
    }

    #[test]
    fn given_ascend_past_root_when_placing_then_lookup_error() {
        // level 2 under a level-0 row gives parent = row 1, then level 1 looks up
        // the parent of ROOT, which is unknown to the lookup
        let links = Links::default();
        let mut builder = TreeBuilder::new(ROOT);
        let cursor = TreeCursor {
            previous_level: 2,
            previous_parent: Some(ROOT),
            previous_node: Some(ContentRef(50)),
        };
        let err = builder.place(&cursor, record(3, 1), &links).unwrap_err();
        assert!(matches!(err, DomainError::Lookup(r) if r == ROOT));
        // failed placement does not consume an order slot
        assert_eq!(builder.placed(), 0);
    }

    #[test]
    fn test_relation() {
        let cursor = TreeCursor {
            previous_level: 2,
            previous_parent: Some(ROOT),
            previous_node: Some(ContentRef(7)),
        };
        assert_eq!(cursor.relation(0), Relation::Root);
        assert_eq!(cursor.relation(2), Relation::Sibling);
        assert_eq!(cursor.relation(3), Relation::Descend);
        assert_eq!(cursor.relation(1), Relation::Ascend);
        assert_eq!(TreeCursor::start().relation(1), Relation::Descend);
    }
}
