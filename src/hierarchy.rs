//! Occupation hierarchy reconstructed from indentation levels.

use crate::cleaner::OccupationRecord;

/// Parent/child links for an ordered occupation table.
///
/// Built in one stack pass: a record's parent is the nearest preceding
/// record with a strictly smaller level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OccupationHierarchy {
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl OccupationHierarchy {
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of ancestors above `index` (roots have depth 0).
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.parent(index);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Indices from the root down to `index`, inclusive.
    pub fn path(&self, index: usize) -> Vec<usize> {
        let mut path = vec![index];
        let mut current = self.parent(index);
        while let Some(parent) = current {
            path.push(parent);
            current = self.parent(parent);
        }
        path.reverse();
        path
    }
}

pub fn build_hierarchy(records: &[OccupationRecord]) -> OccupationHierarchy {
    let mut hierarchy = OccupationHierarchy {
        parents: Vec::with_capacity(records.len()),
        children: vec![Vec::new(); records.len()],
        roots: Vec::new(),
    };
    let mut stack: Vec<usize> = Vec::new();

    for (index, record) in records.iter().enumerate() {
        while let Some(&top) = stack.last() {
            if records[top].level >= record.level {
                stack.pop();
            } else {
                break;
            }
        }

        let parent = stack.last().copied();
        match parent {
            Some(p) => hierarchy.children[p].push(index),
            None => hierarchy.roots.push(index),
        }
        hierarchy.parents.push(parent);
        stack.push(index);
    }

    hierarchy
}
