//! Points-to sets.

use std::collections::BTreeSet;

use super::heap::ObjId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointsToSet {
    objs: BTreeSet<ObjId>,
}

impl PointsToSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(obj: ObjId) -> Self {
        let mut pts = Self::new();
        pts.add_object(obj);
        pts
    }

    pub fn add_object(&mut self, obj: ObjId) -> bool {
        self.objs.insert(obj)
    }

    /// Adds every object of `other` and returns the ones that were new.
    pub fn add_all(&mut self, other: &PointsToSet) -> PointsToSet {
        let mut delta = PointsToSet::new();
        for &obj in other.objs.iter() {
            if self.objs.insert(obj) {
                delta.objs.insert(obj);
            }
        }
        delta
    }

    pub fn contains(&self, obj: ObjId) -> bool {
        self.objs.contains(&obj)
    }

    pub fn intersects(&self, other: &PointsToSet) -> bool {
        self.objs.intersection(&other.objs).next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjId> + '_ {
        self.objs.iter().copied()
    }
}

impl FromIterator<ObjId> for PointsToSet {
    fn from_iter<I: IntoIterator<Item = ObjId>>(iter: I) -> Self {
        Self {
            objs: iter.into_iter().collect(),
        }
    }
}
