//! Name resolution and traversal of the live component tree.
//!
//! A relative path is looked up in the referring component's namespace
//! first and then in each enclosing one. Leading `../` segments step out
//! of namespaces explicitly and turn the outward search off.

use crate::engine::DoenetCore;
use crate::graph::CellId;
use crate::instance::{qualify, Child, ComponentId};

fn parent_scope(scope: &str) -> &str {
    scope.rfind('/').map(|i| &scope[..i]).unwrap_or("")
}

impl DoenetCore {
    pub(crate) fn resolve_path(&self, path: &str, scope: &str) -> Option<ComponentId> {
        let path = path.trim();
        if path.starts_with('/') {
            return self.names.get(path).copied();
        }

        let mut scope = scope;
        let mut rest = path;
        let mut climbed = false;
        while let Some(stripped) = rest.strip_prefix("../") {
            scope = parent_scope(scope);
            rest = stripped;
            climbed = true;
        }
        if rest.is_empty() {
            return None;
        }

        loop {
            if let Some(id) = self.names.get(&qualify(scope, rest)) {
                return Some(*id);
            }
            if climbed || scope.is_empty() {
                return None;
            }
            scope = parent_scope(scope);
        }
    }

    /// Cell holding `prop` of `target`, or the value it gives its parent.
    ///
    /// A replacing composite answers with its first replacement.
    pub(crate) fn value_cell(&self, target: ComponentId, prop: Option<&str>) -> Option<CellId> {
        let instance = self.components.get(target)?;
        let var = match prop {
            Some(prop) => instance.definition.state_var(prop).map(|def| def.name),
            None => instance.definition.value_for_parent(),
        };
        if let Some(cell) = var.and_then(|var| instance.cell(var)) {
            return Some(cell);
        }
        if instance.is_replacing() {
            let first = *self.replacements(target).first()?;
            return self.value_cell(first, prop);
        }
        None
    }

    pub(crate) fn replacements(&self, id: ComponentId) -> &[ComponentId] {
        self.expansions
            .get(&id)
            .map(|record| record.replacements.as_slice())
            .unwrap_or(&[])
    }

    /// `id` itself, or what it stands for when it is a replacing composite.
    pub(crate) fn follow_replacements(&self, id: ComponentId) -> Vec<ComponentId> {
        match self.components.get(id) {
            Some(instance) if instance.is_replacing() => self
                .replacements(id)
                .iter()
                .flat_map(|r| self.follow_replacements(*r))
                .collect(),
            Some(_) => vec![id],
            None => Vec::new(),
        }
    }

    /// Children as the parent sees them: replacing composites are swapped
    /// for their replacements, and an owning composite's children are its
    /// results.
    pub(crate) fn active_children(&self, id: ComponentId) -> Vec<Child> {
        let Some(instance) = self.components.get(id) else {
            return Vec::new();
        };
        if instance.composite().is_some() && !instance.is_replacing() {
            return self
                .replacements(id)
                .iter()
                .map(|r| Child::Component(*r))
                .collect();
        }

        let mut active = Vec::new();
        for child in &instance.children {
            match child {
                Child::Text(text) => active.push(Child::Text(text.clone())),
                Child::Component(child) => active.extend(
                    self.follow_replacements(*child)
                        .into_iter()
                        .map(Child::Component),
                ),
            }
        }
        active
    }

    pub(crate) fn is_ancestor_or_self(&self, ancestor: ComponentId, id: ComponentId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.components.get(node).and_then(|c| c.parent);
        }
        false
    }

    /// End of the `extends` chain, where shared essential state lives.
    pub(crate) fn essential_root(&self, id: ComponentId) -> ComponentId {
        let mut current = id;
        while let Some(next) = self
            .components
            .get(current)
            .and_then(|c| c.extends)
            .filter(|next| self.components.contains(*next))
        {
            current = next;
        }
        current
    }

    /// Every live component under `id` (inclusive) in document order,
    /// following defining children and expansions.
    pub(crate) fn subtree(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        self.collect_subtree(id, &mut out);
        out
    }

    fn collect_subtree(&self, id: ComponentId, out: &mut Vec<ComponentId>) {
        let Some(instance) = self.components.get(id) else {
            return;
        };
        out.push(id);
        for child in &instance.children {
            if let Child::Component(child) = child {
                self.collect_subtree(*child, out);
            }
        }
        for replacement in self.replacements(id) {
            self.collect_subtree(*replacement, out);
        }
    }

    /// Components under `id` as a renderer would reach them.
    pub(crate) fn active_descendants(
        &self,
        id: ComponentId,
        skip: ComponentId,
        out: &mut Vec<ComponentId>,
    ) {
        for child in self.active_children(id) {
            if let Child::Component(child) = child {
                if child == skip || self.is_ancestor_or_self(skip, child) {
                    continue;
                }
                out.push(child);
                self.active_descendants(child, skip, out);
            }
        }
    }
}
