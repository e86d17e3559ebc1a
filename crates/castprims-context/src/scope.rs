use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::context::{downcast, Context, ContextKind, ContextRef, ContextSpec};
use crate::error::{Result, ScopeError};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Whether a scope forks its own context or shares its descent's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NewContext {
    /// Always create a fresh context beneath the descent's.
    Force,
    /// Share the descent's context. A scope without descent still gets a
    /// fresh one.
    Inherit,
    /// Fresh at a root, shared otherwise.
    #[default]
    Default,
}

/// Context resolution state of a [`Scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// The context has not been accessed yet.
    Unresolved,
    /// The scope created its own context.
    Own,
    /// The scope shares a context created above it.
    Inherited,
}

type SetupHook = Arc<dyn Fn(&ContextRef) + Send + Sync>;

struct TypeDef {
    name: String,
    new_context: NewContext,
    spec: Option<ContextSpec>,
    descent: Option<ScopeType>,
    setup: Option<SetupHook>,
}

/// Definition of a kind of scope: its context policy, container and the
/// type its descent must have.
///
/// Cloning is cheap; clones are the same type. The class scope lives as
/// long as some handle to the type does. Scope nodes refer back to it only
/// weakly, so a type and its class scope never keep each other alive.
#[derive(Clone)]
pub struct ScopeType {
    def: Arc<TypeDef>,
    class_scope: Arc<OnceLock<Scope>>,
}

impl ScopeType {
    pub fn builder(name: impl Into<String>) -> ScopeTypeBuilder {
        ScopeTypeBuilder {
            name: name.into(),
            new_context: NewContext::Default,
            spec: None,
            descent: None,
            setup: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn new_context(&self) -> NewContext {
        self.def.new_context
    }

    /// The type instances' descents must have, if fixed.
    pub fn descent(&self) -> Option<&ScopeType> {
        self.def.descent.as_ref()
    }

    /// Container spec declared here or inherited from the descent type.
    pub fn context_spec(&self) -> Option<&ContextSpec> {
        self.def
            .spec
            .as_ref()
            .or_else(|| self.def.descent.as_ref()?.context_spec())
    }

    /// The one class-level scope of this type.
    ///
    /// Its descent is the class scope of the descent type, so class scopes
    /// of related types form a tree mirroring the type definitions.
    pub fn class_scope(&self) -> Scope {
        self.class_scope
            .get_or_init(|| {
                let descent = self.def.descent.as_ref().map(ScopeType::class_scope);
                Scope::create(self, descent)
            })
            .clone()
    }

    /// Build an instance scope composed through `descent`.
    ///
    /// Fails before any context exists if `descent` has the wrong type or
    /// provides a conflicting container kind.
    pub fn instantiate(&self, descent: Option<&Scope>) -> Result<Scope> {
        if let (Some(expected), Some(descent)) = (&self.def.descent, descent) {
            if !Arc::ptr_eq(&descent.node.def, &expected.def) {
                return Err(ScopeError::DescentTypeMismatch {
                    scope: self.def.name.clone(),
                    expected: expected.name().to_string(),
                    found: descent.type_name().to_string(),
                });
            }
        }

        if self.def.new_context != NewContext::Force {
            if let (Some(spec), Some(descent)) = (&self.def.spec, descent) {
                check_kind(&self.def.name, spec.kind, descent.context_spec())?;
            }
        }

        Ok(Scope::create(self, descent.cloned()))
    }
}

impl PartialEq for ScopeType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.def, &other.def)
    }
}

impl Eq for ScopeType {}

impl fmt::Debug for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeType")
            .field("name", &self.def.name)
            .field("new_context", &self.def.new_context)
            .field("spec", &self.def.spec)
            .finish_non_exhaustive()
    }
}

fn check_kind(scope: &str, declared: ContextKind, inherited: Option<&ContextSpec>) -> Result<()> {
    match inherited {
        Some(spec) if spec.kind != declared => Err(ScopeError::ContextKindConflict {
            scope: scope.to_string(),
            declared,
            inherited: spec.kind,
        }),
        _ => Ok(()),
    }
}

/// Builder for [`ScopeType`].
pub struct ScopeTypeBuilder {
    name: String,
    new_context: NewContext,
    spec: Option<ContextSpec>,
    descent: Option<ScopeType>,
    setup: Option<SetupHook>,
}

impl ScopeTypeBuilder {
    pub fn new_context(mut self, policy: NewContext) -> Self {
        self.new_context = policy;
        self
    }

    /// Declare the container this type's contexts are built from.
    pub fn context(mut self, spec: ContextSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    pub fn context_kind(self, kind: ContextKind) -> Self {
        self.context(ContextSpec::new(kind))
    }

    /// Fix the descent type.
    pub fn descent(mut self, descent: &ScopeType) -> Self {
        self.descent = Some(descent.clone());
        self
    }

    /// Run `setup` once on every context this type creates.
    pub fn setup(mut self, setup: impl Fn(&ContextRef) + Send + Sync + 'static) -> Self {
        self.setup = Some(Arc::new(setup));
        self
    }

    pub fn build(self) -> Result<ScopeType> {
        if self.new_context != NewContext::Force {
            if let (Some(spec), Some(descent)) = (&self.spec, &self.descent) {
                check_kind(&self.name, spec.kind, descent.context_spec())?;
            }
        }

        debug!(
            scope = %self.name,
            policy = ?self.new_context,
            descent = self.descent.as_ref().map(ScopeType::name),
            "defined scope type"
        );

        Ok(ScopeType {
            def: Arc::new(TypeDef {
                name: self.name,
                new_context: self.new_context,
                spec: self.spec,
                descent: self.descent,
                setup: self.setup,
            }),
            class_scope: Arc::new(OnceLock::new()),
        })
    }
}

pub(crate) struct ScopeNode {
    id: u64,
    def: Arc<TypeDef>,
    class_cell: Weak<OnceLock<Scope>>,
    descent: Option<Scope>,
    owns_context: bool,
    spec: Option<ContextSpec>,
    context: OnceLock<ContextRef>,
    // Scopes that fork their own context beneath this one's. Only populated
    // on scopes that own their context.
    children: Mutex<Vec<Weak<ScopeNode>>>,
}

/// A node of the scope tree.
///
/// Cloning is cheap; clones are the same node.
#[derive(Clone)]
pub struct Scope {
    node: Arc<ScopeNode>,
}

impl Scope {
    fn create(scope_type: &ScopeType, descent: Option<Scope>) -> Self {
        let owns_context = scope_type.new_context() == NewContext::Force || descent.is_none();
        let spec = scope_type
            .def
            .spec
            .clone()
            .or_else(|| descent.as_ref()?.node.spec.clone());

        let node = Arc::new(ScopeNode {
            id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            def: Arc::clone(&scope_type.def),
            class_cell: Arc::downgrade(&scope_type.class_scope),
            descent,
            owns_context,
            spec,
            context: OnceLock::new(),
            children: Mutex::new(Vec::new()),
        });

        if owns_context {
            if let Some(descent) = &node.descent {
                let owner = descent.owner();
                let mut children = owner.node.children.lock();
                children.retain(|child| child.strong_count() > 0);
                children.push(Arc::downgrade(&node));
            }
        }

        Scope { node }
    }

    /// Process-unique id of this node.
    pub fn id(&self) -> u64 {
        self.node.id
    }

    /// The type this scope was built from.
    ///
    /// Once every handle to the type has been dropped its class scope is
    /// gone too; the returned handle then starts a fresh one.
    pub fn scope_type(&self) -> ScopeType {
        ScopeType {
            def: Arc::clone(&self.node.def),
            class_scope: self.node.class_cell.upgrade().unwrap_or_default(),
        }
    }

    fn type_name(&self) -> &str {
        &self.node.def.name
    }

    pub fn descent(&self) -> Option<&Scope> {
        self.node.descent.as_ref()
    }

    /// Whether this scope creates its own context.
    pub fn has_new_context(&self) -> bool {
        self.node.owns_context
    }

    /// Container spec the context is (or will be) built from.
    pub fn context_spec(&self) -> Option<&ContextSpec> {
        self.node.spec.as_ref()
    }

    pub fn state(&self) -> ScopeState {
        match self.node.context.get() {
            None => ScopeState::Unresolved,
            Some(_) if self.node.owns_context => ScopeState::Own,
            Some(_) => ScopeState::Inherited,
        }
    }

    /// The context of this scope, created on first access.
    pub fn context(&self) -> ContextRef {
        self.node
            .context
            .get_or_init(|| match &self.node.descent {
                Some(descent) if !self.node.owns_context => {
                    trace!(scope = %self.type_name(), id = self.node.id, "inheriting context");
                    descent.context()
                }
                _ => self.create_context(),
            })
            .clone()
    }

    /// [`Self::context`] downcast to its concrete container.
    pub fn context_as<C: Context>(&self) -> Option<Arc<C>> {
        downcast(&self.context())
    }

    /// The context one level up, `None` at a root.
    ///
    /// A scope that shares its descent's context reports the supercontext of
    /// that shared context.
    pub fn supercontext(&self) -> Option<ContextRef> {
        let descent = self.node.descent.as_ref()?;
        if self.node.owns_context {
            Some(descent.context())
        } else {
            descent.supercontext()
        }
    }

    /// Contexts forked directly beneath this scope's context, in creation
    /// order.
    pub fn subcontexts(&self) -> Vec<ContextRef> {
        let owner = self.owner();
        let children: Vec<Scope> = owner
            .node
            .children
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|node| Scope { node })
            .collect();
        children.iter().map(Scope::context).collect()
    }

    pub(crate) fn downgrade(&self) -> Weak<ScopeNode> {
        Arc::downgrade(&self.node)
    }

    // The nearest scope in the descent chain that owns the context this
    // scope resolves to.
    fn owner(&self) -> Scope {
        let mut scope = self.clone();
        while !scope.node.owns_context {
            match &scope.node.descent {
                Some(descent) => scope = descent.clone(),
                None => break,
            }
        }
        scope
    }

    fn create_context(&self) -> ContextRef {
        let context = self.node.spec.clone().unwrap_or_default().create();
        if let Some(supercontext) = self.supercontext() {
            context.bind_supercontext(&supercontext);
        }
        if let Some(setup) = &self.node.def.setup {
            setup(&context);
        }
        debug!(
            scope = %self.type_name(),
            id = self.node.id,
            kind = %context.kind(),
            "created context"
        );
        context
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Scope {}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.node.id)
            .field("type", &self.type_name())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::container::{ListContext, NestedContext, Slot, PARENT_KEY};

    fn same(a: &ContextRef, b: &ContextRef) -> bool {
        Arc::ptr_eq(a, b)
    }

    #[test]
    fn root_gets_fresh_context() {
        let root = ScopeType::builder("root").build().unwrap();
        let a = root.instantiate(None).unwrap();
        let b = root.instantiate(None).unwrap();

        assert!(a.supercontext().is_none());
        assert_eq!(a.state(), ScopeState::Unresolved);
        assert!(!same(&a.context(), &b.context()));
        assert_eq!(a.state(), ScopeState::Own);
        assert_eq!(a.context().kind(), ContextKind::Nested);
    }

    #[test]
    fn inherit_and_force() {
        let root = ScopeType::builder("root").build().unwrap();
        let inherit = ScopeType::builder("inherit")
            .new_context(NewContext::Inherit)
            .build()
            .unwrap();
        let force = ScopeType::builder("force")
            .new_context(NewContext::Force)
            .build()
            .unwrap();

        let d = root.instantiate(None).unwrap();
        let a = inherit.instantiate(Some(&d)).unwrap();
        let b = force.instantiate(Some(&a)).unwrap();

        assert!(same(&a.context(), &d.context()));
        assert_eq!(a.state(), ScopeState::Inherited);
        assert!(same(&b.supercontext().unwrap(), &a.context()));
        assert!(!same(&b.context(), &a.context()));
        assert!(a.supercontext().is_none());

        let c = inherit.instantiate(Some(&b)).unwrap();
        assert!(same(&c.context(), &b.context()));
        assert!(same(&c.supercontext().unwrap(), &d.context()));
    }

    #[test]
    fn inherit_without_descent_is_fresh() {
        let inherit = ScopeType::builder("inherit")
            .new_context(NewContext::Inherit)
            .build()
            .unwrap();
        let scope = inherit.instantiate(None).unwrap();
        assert!(scope.has_new_context());
        assert!(scope.supercontext().is_none());
    }

    #[test]
    fn class_scopes_share_and_fork() {
        let root = ScopeType::builder("root").build().unwrap();
        let left = ScopeType::builder("left").descent(&root).build().unwrap();
        let right = ScopeType::builder("right").descent(&root).build().unwrap();
        let forked = ScopeType::builder("forked")
            .descent(&left)
            .new_context(NewContext::Force)
            .build()
            .unwrap();

        let shared = root.class_scope().context();
        assert!(same(&left.class_scope().context(), &shared));
        assert!(same(&right.class_scope().context(), &shared));
        assert_eq!(left.class_scope(), left.class_scope());

        let own = forked.class_scope();
        assert!(!same(&own.context(), &shared));
        assert!(same(&own.supercontext().unwrap(), &shared));
    }

    #[test]
    fn class_scope_released_with_its_type() {
        let root = ScopeType::builder("released").build().unwrap();
        let class = root.class_scope();
        class.context();

        let node = class.downgrade();
        let cell = Arc::downgrade(&root.class_scope);
        assert_eq!(class.scope_type(), root);
        assert_eq!(class.scope_type().class_scope(), class);

        drop(class);
        drop(root);
        assert!(node.upgrade().is_none());
        assert!(cell.upgrade().is_none());
    }

    #[test]
    fn instance_outlives_its_type_handle() {
        let ty = ScopeType::builder("transient").build().unwrap();
        let scope = ty.instantiate(None).unwrap();
        let class = ty.class_scope();
        drop(ty);
        drop(class);

        let recovered = scope.scope_type();
        assert_eq!(recovered.name(), "transient");
        assert_eq!(scope.context().kind(), ContextKind::Nested);
    }

    #[test]
    fn subcontexts_are_keyed_by_context() {
        let plain = ScopeType::builder("plain").build().unwrap();
        let fork = ScopeType::builder("fork")
            .new_context(NewContext::Force)
            .build()
            .unwrap();

        let a1 = plain.instantiate(None).unwrap();
        let a2 = plain.instantiate(Some(&a1)).unwrap();
        let a3 = fork.instantiate(Some(&a2)).unwrap();
        let a4 = fork.instantiate(Some(&a1)).unwrap();

        let subs = a1.subcontexts();
        assert_eq!(subs.len(), 2);
        assert!(same(&subs[0], &a3.context()));
        assert!(same(&subs[1], &a4.context()));
        assert_eq!(a2.subcontexts().len(), 2);
        assert!(a3.subcontexts().is_empty());
    }

    #[test]
    fn dropped_children_leave_subcontexts() {
        let plain = ScopeType::builder("plain").build().unwrap();
        let fork = ScopeType::builder("fork")
            .new_context(NewContext::Force)
            .build()
            .unwrap();
        let root = plain.instantiate(None).unwrap();
        {
            let _child = fork.instantiate(Some(&root)).unwrap();
            assert_eq!(root.subcontexts().len(), 1);
        }
        assert!(root.subcontexts().is_empty());
    }

    #[test]
    fn kind_conflict_at_definition() {
        let lists = ScopeType::builder("lists")
            .context_kind(ContextKind::List)
            .build()
            .unwrap();
        let err = ScopeType::builder("maps")
            .descent(&lists)
            .context_kind(ContextKind::Mapping)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ScopeError::ContextKindConflict {
                declared: ContextKind::Mapping,
                inherited: ContextKind::List,
                ..
            }
        ));

        let forked = ScopeType::builder("forked-maps")
            .descent(&lists)
            .new_context(NewContext::Force)
            .context_kind(ContextKind::Mapping)
            .build();
        assert!(forked.is_ok());
    }

    #[test]
    fn kind_conflict_at_instantiation() {
        let lists = ScopeType::builder("lists")
            .context_kind(ContextKind::List)
            .build()
            .unwrap();
        let maps = ScopeType::builder("maps")
            .context_kind(ContextKind::Mapping)
            .build()
            .unwrap();
        let descent = lists.instantiate(None).unwrap();

        let err = maps.instantiate(Some(&descent)).unwrap_err();
        assert!(matches!(err, ScopeError::ContextKindConflict { .. }));
        assert_eq!(descent.state(), ScopeState::Unresolved);
    }

    #[test]
    fn descent_type_mismatch() {
        let parent = ScopeType::builder("parent").build().unwrap();
        let other = ScopeType::builder("other").build().unwrap();
        let child = ScopeType::builder("child").descent(&parent).build().unwrap();

        let wrong = other.instantiate(None).unwrap();
        let err = child.instantiate(Some(&wrong)).unwrap_err();
        assert_eq!(
            err,
            ScopeError::DescentTypeMismatch {
                scope: "child".into(),
                expected: "parent".into(),
                found: "other".into(),
            }
        );

        let right = parent.instantiate(None).unwrap();
        assert!(child.instantiate(Some(&right)).is_ok());
        assert!(child.instantiate(None).is_ok());
    }

    #[test]
    fn inherited_spec_builds_list() {
        let lists = ScopeType::builder("lists")
            .context_kind(ContextKind::List)
            .build()
            .unwrap();
        let forked = ScopeType::builder("forked")
            .descent(&lists)
            .new_context(NewContext::Force)
            .build()
            .unwrap();

        let scope = forked.class_scope();
        assert!(scope.context_as::<ListContext>().is_some());
    }

    #[test]
    fn setup_runs_once_per_created_context() {
        let root = ScopeType::builder("counted")
            .context_kind(ContextKind::List)
            .setup(|context| {
                if let Some(list) = downcast::<ListContext>(context) {
                    list.push(json!("seeded"));
                }
            })
            .build()
            .unwrap();

        let a = root.instantiate(None).unwrap();
        let b = root.instantiate(Some(&a)).unwrap();
        a.context();
        b.context();
        assert_eq!(a.context().snapshot(), json!(["seeded"]));
    }

    #[test]
    fn nested_context_sees_supercontext() {
        let root = ScopeType::builder("root").build().unwrap();
        let fork = ScopeType::builder("fork")
            .new_context(NewContext::Force)
            .build()
            .unwrap();

        let top = root.instantiate(None).unwrap();
        let inner = fork.instantiate(Some(&top)).unwrap();

        let nested = inner.context_as::<NestedContext>().unwrap();
        match nested.get(PARENT_KEY) {
            Some(Slot::Context(parent)) => assert!(same(&parent, &top.context())),
            other => panic!("expected supercontext, got {other:?}"),
        }
    }
}
