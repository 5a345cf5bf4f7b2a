// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Class hierarchy numbering for constant-time subtype tests.
//!
//! Classes are numbered in preorder over the inheritance forest. A class
//! `C` then owns the interval `[n1(C), n2(C)]`, where `n2` is the largest
//! number in its subtree, and `D` is a subclass of `C` exactly when
//! `n1(D)` falls inside that interval.

use crate::layout::ClassLayout;
use crate::table::TypeTable;
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassInterval {
    pub low: u32,
    pub high: u32,
}

impl ClassInterval {
    pub fn contains(&self, class_id: u32) -> bool {
        self.low <= class_id && class_id <= self.high
    }
}

/// Renumber every class. Ids start at 1 so that 0 never names a class.
pub(crate) fn number_classes(classes: &mut [ClassLayout]) {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); classes.len()];
    let mut roots = Vec::new();
    for (idx, class) in classes.iter().enumerate() {
        match class.parent {
            Some(parent) => children[parent.0 as usize].push(idx),
            None => roots.push(idx),
        }
    }

    let mut next = 1;
    for root in roots {
        visit(root, &children, classes, &mut next);
    }
}

fn visit(idx: usize, children: &[Vec<usize>], classes: &mut [ClassLayout], next: &mut u32) -> u32 {
    let id = *next;
    *next += 1;
    classes[idx].class_id = id;
    let mut max = id;
    for &child in &children[idx] {
        max = max.max(visit(child, children, classes, next));
    }
    classes[idx].subclass_max = max;
    max
}

/// Structural subclass test by walking parent links. Reflexive.
pub fn is_subclass(table: &TypeTable, sub: TypeId, sup: TypeId) -> bool {
    let (Some(mut cur), Some(target)) = (table.class(sub), table.class(sup)) else {
        return false;
    };
    loop {
        if cur.id == target.id {
            return true;
        }
        match cur.parent {
            Some(parent) => cur = table.class_layout(parent),
            None => return false,
        }
    }
}
