//! ModuleRegistry - hierarchical store of module namespaces.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: the namespace at that path, if one has been created
//! - Edges: `Contains(segment)` from a namespace to each child namespace
//!
//! Creating `app.util` also creates `app` and declares `util` as one of its
//! submodules. Namespaces created here resolve their declared members through
//! the registry first, so `app.get("util")` returns the registered child
//! without asking the external loader.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

use classkit_core::{
    EventRegistry, ModuleError, ModuleRef, NameLoader, NullLoader, Result, Value,
    is_lower_snake_case,
};

/// Edge types in the module graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleEdge {
    /// Parent namespace contains child namespace.
    /// The String is the child's simple name.
    Contains(String),
}

struct ModuleTree {
    /// The directed graph storing all namespaces.
    graph: DiGraph<Option<ModuleRef>, ModuleEdge>,
    /// The unnamed root node.
    root: NodeIndex,
    /// Qualified name -> node, for created namespaces.
    index: FxHashMap<String, NodeIndex>,
}

impl ModuleTree {
    fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(None);
        Self {
            graph,
            root,
            index: FxHashMap::default(),
        }
    }

    fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.graph
            .edges(parent)
            .find(|edge| matches!(edge.weight(), ModuleEdge::Contains(child) if child == name))
            .map(|edge| edge.target())
    }

    fn get_or_create_child(&mut self, parent: NodeIndex, name: &str) -> NodeIndex {
        if let Some(child) = self.find_child(parent, name) {
            return child;
        }
        let child = self.graph.add_node(None);
        self.graph
            .add_edge(parent, child, ModuleEdge::Contains(name.to_string()));
        child
    }

    fn module(&self, name: &str) -> Option<ModuleRef> {
        let node = *self.index.get(name)?;
        self.graph.node_weight(node).cloned().flatten()
    }
}

/// Resolves names against the tree before falling back to the external loader.
struct TreeLoader {
    tree: Weak<RefCell<ModuleTree>>,
    fallback: Rc<dyn NameLoader>,
}

impl NameLoader for TreeLoader {
    fn load(&self, name: &str) -> Result<Option<Value>> {
        let registered = self
            .tree
            .upgrade()
            .and_then(|tree| tree.borrow().module(name));
        match registered {
            Some(module) => Ok(Some(Value::Module(module))),
            None => self.fallback.load(name),
        }
    }
}

/// Shared handle to one module registry.
#[derive(Clone)]
pub struct ModuleRegistry {
    tree: Rc<RefCell<ModuleTree>>,
    loader: Rc<dyn NameLoader>,
    events: EventRegistry,
}

impl ModuleRegistry {
    /// Create an empty registry whose namespaces know only each other.
    pub fn new(events: &EventRegistry) -> Self {
        Self::with_loader(events, Rc::new(NullLoader))
    }

    /// Create an empty registry whose namespaces fall back to `loader`.
    pub fn with_loader(events: &EventRegistry, loader: Rc<dyn NameLoader>) -> Self {
        let tree = Rc::new(RefCell::new(ModuleTree::new()));
        let loader = Rc::new(TreeLoader {
            tree: Rc::downgrade(&tree),
            fallback: loader,
        });
        Self {
            tree,
            loader,
            events: events.clone(),
        }
    }

    /// Get or create the namespace at `name`, creating missing ancestors.
    ///
    /// Each newly created namespace is declared as a submodule of its parent.
    ///
    /// # Errors
    ///
    /// - [`ModuleError::NamingConvention`] unless every segment is lower_snake_case
    /// - any observer error
    pub fn module(&self, name: &str) -> Result<ModuleRef> {
        if name.is_empty() || !name.split('.').all(is_lower_snake_case) {
            return Err(ModuleError::NamingConvention {
                name: name.to_string(),
                convention: "module",
            }
            .into());
        }

        let mut parent: Option<ModuleRef> = None;
        let mut path = String::new();

        for segment in name.split('.') {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment);

            let existing = self.tree.borrow().module(&path);
            let module = match existing {
                Some(module) => module,
                None => self.create(&path, parent.as_ref(), segment)?,
            };
            parent = Some(module);
        }

        // The loop runs at least once for a non-empty name.
        parent.ok_or_else(|| {
            ModuleError::NamingConvention {
                name: name.to_string(),
                convention: "module",
            }
            .into()
        })
    }

    /// Build the namespace and declare it in its parent, then attach it to
    /// the tree. The tree is untouched if either step fails.
    fn create(&self, path: &str, parent: Option<&ModuleRef>, segment: &str) -> Result<ModuleRef> {
        let module = ModuleRef::new(path, Rc::clone(&self.loader), &self.events)?;
        if let Some(parent) = parent {
            if parent.is_declared(segment) {
                parent.forget(segment);
            } else {
                parent.declare_submodule(segment)?;
            }
        }

        let mut tree = self.tree.borrow_mut();
        let parent_node = path
            .rsplit_once('.')
            .and_then(|(parent_path, _)| tree.index.get(parent_path).copied())
            .unwrap_or(tree.root);
        let node = tree.get_or_create_child(parent_node, segment);
        if let Some(weight) = tree.graph.node_weight_mut(node) {
            *weight = Some(module.clone());
        }
        tree.index.insert(path.to_string(), node);
        tracing::debug!(module = path, "registered module");
        Ok(module)
    }

    /// Get a created namespace by qualified name.
    pub fn find(&self, name: &str) -> Option<ModuleRef> {
        self.tree.borrow().module(name)
    }

    /// Check if a namespace exists at `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.tree.borrow().index.contains_key(name)
    }

    /// Created child namespaces of `name`, sorted by simple name.
    pub fn submodules_of(&self, name: &str) -> Vec<ModuleRef> {
        let tree = self.tree.borrow();
        let Some(&node) = tree.index.get(name) else {
            return Vec::new();
        };

        let mut children: Vec<(&str, ModuleRef)> = tree
            .graph
            .edges(node)
            .filter_map(|edge| {
                let ModuleEdge::Contains(segment) = edge.weight();
                let module = tree.graph.node_weight(edge.target())?.clone()?;
                Some((segment.as_str(), module))
            })
            .collect();
        children.sort_by(|a, b| a.0.cmp(b.0));
        children.into_iter().map(|(_, module)| module).collect()
    }

    /// Qualified names of every created namespace, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tree.borrow().index.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of created namespaces.
    pub fn len(&self) -> usize {
        self.tree.borrow().index.len()
    }

    /// Check if no namespace has been created.
    pub fn is_empty(&self) -> bool {
        self.tree.borrow().index.is_empty()
    }

    /// Drop every namespace.
    ///
    /// Namespaces already handed out keep working but no longer see each other
    /// through the registry.
    pub fn clear(&self) {
        let mut tree = self.tree.borrow_mut();
        tracing::debug!(count = tree.index.len(), "cleared modules");
        *tree = ModuleTree::new();
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use classkit_core::{ClassRef, Error, Event, EventKind, NativeError};

    #[test]
    fn creates_ancestors() {
        let modules = ModuleRegistry::new(&EventRegistry::new());
        let util = modules.module("app.util").unwrap();
        assert_eq!(util.name(), "app.util");
        assert!(modules.contains("app"));
        assert!(modules.contains("app.util"));
        assert_eq!(modules.names(), vec!["app", "app.util"]);
    }

    #[test]
    fn module_is_get_or_create() {
        let modules = ModuleRegistry::new(&EventRegistry::new());
        let first = modules.module("app").unwrap();
        let second = modules.module("app").unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(modules.len(), 1);
    }

    #[test]
    fn children_are_declared_and_resolvable() {
        let modules = ModuleRegistry::new(&EventRegistry::new());
        let util = modules.module("app.util").unwrap();
        let app = modules.find("app").unwrap();

        assert!(app.is_declared("util"));
        let Value::Module(resolved) = app.get("util").unwrap() else {
            panic!("expected a module");
        };
        assert!(resolved.ptr_eq(&util));
    }

    #[test]
    fn submodules_are_sorted() {
        let modules = ModuleRegistry::new(&EventRegistry::new());
        modules.module("app.zeta").unwrap();
        modules.module("app.alpha").unwrap();
        let names: Vec<String> = modules
            .submodules_of("app")
            .iter()
            .map(ModuleRef::name)
            .collect();
        assert_eq!(names, vec!["app.alpha", "app.zeta"]);
        assert!(modules.submodules_of("missing").is_empty());
    }

    #[test]
    fn naming_convention() {
        let modules = ModuleRegistry::new(&EventRegistry::new());
        assert!(matches!(
            modules.module("App.util"),
            Err(Error::Module(ModuleError::NamingConvention { .. }))
        ));
        assert!(modules.module("").is_err());
        assert!(modules.is_empty());
    }

    #[test]
    fn events_for_created_modules() {
        let events = EventRegistry::new();
        let created = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&created);
        events.on(EventKind::ModuleInitialized, move |event| {
            if let Event::ModuleInitialized { name } = event {
                sink.borrow_mut().push(name.clone());
            }
            Ok(())
        });

        let modules = ModuleRegistry::new(&events);
        modules.module("app.util").unwrap();
        modules.module("app.util").unwrap();
        assert_eq!(*created.borrow(), vec!["app", "app.util"]);
    }

    #[test]
    fn rejected_creation_leaves_tree_untouched() {
        let events = EventRegistry::new();
        let veto = Rc::new(Cell::new(true));
        let flag = Rc::clone(&veto);
        events.on(EventKind::ModuleDeclaredSubmodule, move |_| {
            if flag.get() {
                return Err(NativeError::raised("vetoed").into());
            }
            Ok(())
        });

        let modules = ModuleRegistry::new(&events);
        assert!(modules.module("app.util").is_err());
        assert_eq!(modules.names(), vec!["app"]);
        assert!(modules.submodules_of("app").is_empty());
        assert!(!modules.find("app").unwrap().is_declared("util"));

        veto.set(false);
        let util = modules.module("app.util").unwrap();
        assert_eq!(modules.names(), vec!["app", "app.util"]);
        let children = modules.submodules_of("app");
        assert_eq!(children.len(), 1);
        assert!(children[0].ptr_eq(&util));
    }

    #[test]
    fn rejected_root_leaves_registry_empty() {
        let events = EventRegistry::new();
        let veto = Rc::new(Cell::new(true));
        let flag = Rc::clone(&veto);
        events.on(EventKind::ModuleInitialized, move |_| {
            if flag.get() {
                return Err(NativeError::raised("vetoed").into());
            }
            Ok(())
        });

        let modules = ModuleRegistry::new(&events);
        assert!(modules.module("app").is_err());
        assert!(modules.is_empty());

        veto.set(false);
        modules.module("app").unwrap();
        assert_eq!(modules.len(), 1);
    }

    #[test]
    fn created_child_replaces_failed_resolution() {
        let modules = ModuleRegistry::new(&EventRegistry::new());
        let app = modules.module("app").unwrap();
        app.declare_submodule("util").unwrap();
        assert!(matches!(
            app.get("util"),
            Err(Error::Module(ModuleError::Load { .. }))
        ));

        let util = modules.module("app.util").unwrap();
        let Value::Module(resolved) = app.get("util").unwrap() else {
            panic!("expected a module");
        };
        assert!(resolved.ptr_eq(&util));
    }

    #[test]
    fn falls_back_to_external_loader() {
        let events = EventRegistry::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let loader_events = events.clone();
        let loader = move |name: &str| -> Result<Option<Value>> {
            counter.set(counter.get() + 1);
            Ok(Some(Value::Class(ClassRef::construct(name, None, &loader_events)?)))
        };
        let modules = ModuleRegistry::with_loader(&events, Rc::new(loader));

        let app = modules.module("app").unwrap();
        app.declare_class("Widget").unwrap();
        assert_eq!(calls.get(), 0);

        let Value::Class(widget) = app.get("Widget").unwrap() else {
            panic!("expected a class");
        };
        assert_eq!(widget.name(), "app.Widget");
        app.get("Widget").unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn clear_forgets_everything() {
        let modules = ModuleRegistry::new(&EventRegistry::new());
        let app = modules.module("app").unwrap();
        modules.clear();
        assert!(modules.is_empty());
        assert!(modules.find("app").is_none());
        assert_eq!(app.name(), "app");
    }
}
