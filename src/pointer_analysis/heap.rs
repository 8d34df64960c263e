//! Heap abstraction: which abstract object an allocation produces.

use std::collections::HashMap;

use crate::ir::{StmtRef, Type};

/// Index of an abstract object in its heap model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(pub(crate) usize);

impl ObjId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Obj {
    pub alloc_site: StmtRef,
    pub ty: Type,
}

pub trait HeapModel {
    /// The canonical object for the allocation at `alloc_site`.
    fn get_obj(&mut self, alloc_site: StmtRef, ty: &Type) -> ObjId;

    /// All objects created so far, indexed by `ObjId`.
    fn objs(&self) -> &[Obj];

    fn obj(&self, id: ObjId) -> &Obj {
        &self.objs()[id.0]
    }
}

/// One object per allocation site.
#[derive(Debug, Clone, Default)]
pub struct AllocationSiteBasedModel {
    objs: Vec<Obj>,
    sites: HashMap<StmtRef, ObjId>,
}

impl AllocationSiteBasedModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HeapModel for AllocationSiteBasedModel {
    fn get_obj(&mut self, alloc_site: StmtRef, ty: &Type) -> ObjId {
        let objs = &mut self.objs;
        *self.sites.entry(alloc_site).or_insert_with(|| {
            let id = ObjId(objs.len());
            objs.push(Obj {
                alloc_site,
                ty: ty.clone(),
            });
            id
        })
    }

    fn objs(&self) -> &[Obj] {
        &self.objs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::MethodId;

    #[test]
    fn test_one_object_per_site() {
        let mut heap = AllocationSiteBasedModel::new();
        let site = StmtRef::new(MethodId(0), 1);
        let o1 = heap.get_obj(site, &Type::INT);
        let o2 = heap.get_obj(site, &Type::INT);
        let o3 = heap.get_obj(StmtRef::new(MethodId(0), 2), &Type::Null);
        assert_eq!(o1, o2);
        assert_ne!(o1, o3);
        assert_eq!(heap.objs().len(), 2);
        assert_eq!(heap.obj(o3).alloc_site.index, 2);
    }
}
