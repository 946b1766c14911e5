use std::collections::BTreeMap;

/// Index of a scope in the [`Scopes`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

impl ScopeId {
    pub const MODULE: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjKind {
    /// A top-level function or alias declaration.
    Decl,
    /// A function parameter.
    Field,
}

/// What a scope object points back at. Indices are stable: functions in
/// `Module::funcs()` order, aliases in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Func(usize),
    Alias(usize),
    Param { func: usize, param: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub kind: ObjKind,
    pub name: String,
    pub node: NodeRef,
}

#[derive(Debug, Clone, Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    objects: BTreeMap<String, Object>,
}

/// Arena of lexical scopes. Scope 0 is the module scope; every chain
/// terminates there. Read-only after the semantic pass.
#[derive(Debug, Clone)]
pub struct Scopes {
    scopes: Vec<ScopeData>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            scopes: vec![ScopeData::default()],
        }
    }

    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(ScopeData {
            parent: Some(parent),
            objects: BTreeMap::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Insert an object, returning the previous binding of the same name in
    /// this scope if there was one.
    pub fn insert(&mut self, id: ScopeId, obj: Object) -> Option<Object> {
        self.scopes[id.0].objects.insert(obj.name.clone(), obj)
    }

    pub fn lookup_local(&self, id: ScopeId, name: &str) -> Option<&Object> {
        self.scopes[id.0].objects.get(name)
    }

    /// Walk the scope chain up to the module scope.
    pub fn lookup(&self, id: ScopeId, name: &str) -> Option<&Object> {
        let mut cur = Some(id);
        while let Some(s) = cur {
            if let Some(obj) = self.scopes[s.0].objects.get(name) {
                return Some(obj);
            }
            cur = self.scopes[s.0].parent;
        }
        None
    }

    /// Objects defined in this scope and its ancestors, nearest first,
    /// module scope last. Shadowed names appear once.
    pub fn defined(&self, id: ScopeId) -> Vec<&Object> {
        let mut seen = std::collections::BTreeSet::new();
        let mut out = Vec::new();
        let mut cur = Some(id);
        while let Some(s) = cur {
            for obj in self.scopes[s.0].objects.values() {
                if seen.insert(obj.name.clone()) {
                    out.push(obj);
                }
            }
            cur = self.scopes[s.0].parent;
        }
        out
    }
}
