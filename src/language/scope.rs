//! Scope arena and the active scope chain used while parsing a translation
//! unit.
//!
//! Scopes are allocated in a [`ScopeTree`] and never freed during a parse, so
//! AST nodes can keep referring to the scope that declared a type parameter.
//! The [`ScopeChain`] is the stack of scopes that are currently open. A scope
//! leaves the chain when it is closed; its record stays in the tree.

use crate::language::{
    errors::{DiagnosticKind, ScopeFault},
    span::Span,
    types::{TypeExpr, TypeParamRef},
};
use std::{collections::HashMap, fmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) usize);

impl ScopeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    TranslationUnit,
    Polymorphic,
    FunctionBody,
    Block,
}

impl ScopeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScopeKind::TranslationUnit => "translation-unit",
            ScopeKind::Polymorphic => "polymorphic",
            ScopeKind::FunctionBody => "function-body",
            ScopeKind::Block => "block",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeParameter {
    pub name: String,
    pub span: Span,
    pub index: usize,
    /// Span of the `_For_any` keyword that introduced this parameter.
    pub specifier: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionEntity {
    pub name: String,
    pub span: Span,
    pub type_params: Vec<TypeParameter>,
    pub poly_scope: Option<ScopeId>,
    pub return_ty: TypeExpr,
    /// `None` for an unprototyped `f()` declaration.
    pub params: Option<Vec<TypeExpr>>,
    pub defined: bool,
}

/// Signature of one call site after substituting concrete type arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Instantiation {
    pub return_ty: TypeExpr,
    pub params: Option<Vec<TypeExpr>>,
}

impl FunctionEntity {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn type_parameters(&self) -> &[TypeParameter] {
        &self.type_params
    }

    pub fn check_instantiation(&self, type_args: &[TypeExpr]) -> Result<Instantiation, DiagnosticKind> {
        if type_args.len() != self.type_params.len() {
            return Err(DiagnosticKind::InstantiationArityMismatch {
                name: self.name.clone(),
                expected: self.type_params.len(),
                found: type_args.len(),
            });
        }
        let Some(scope) = self.poly_scope else {
            return Ok(Instantiation {
                return_ty: self.return_ty.clone(),
                params: self.params.clone(),
            });
        };
        let map: HashMap<usize, TypeExpr> = type_args.iter().cloned().enumerate().collect();
        Ok(Instantiation {
            return_ty: self.return_ty.substitute(scope, &map),
            params: self.params.as_ref().map(|params| {
                params
                    .iter()
                    .map(|param| param.substitute(scope, &map))
                    .collect()
            }),
        })
    }

    fn compatible_with(&self, other: &FunctionEntity) -> bool {
        if self.type_params.len() != other.type_params.len()
            || !self.return_ty.compatible_with(&other.return_ty)
        {
            return false;
        }
        match (&self.params, &other.params) {
            (Some(ours), Some(theirs)) => {
                ours.len() == theirs.len()
                    && ours.iter().zip(theirs).all(|(a, b)| a.compatible_with(b))
            }
            _ => true,
        }
    }

    /// Rewrites type parameters of `other`'s polymorphic scope into this
    /// entity's own, matching by position.
    fn rebase_from(&self, other: &FunctionEntity, ty: &TypeExpr) -> TypeExpr {
        let (Some(from), Some(to)) = (other.poly_scope, self.poly_scope) else {
            return ty.clone();
        };
        let map: HashMap<usize, TypeExpr> = self
            .type_params
            .iter()
            .map(|param| {
                let target = TypeExpr::TypeParam(TypeParamRef {
                    name: param.name.clone(),
                    scope: to,
                    index: param.index,
                });
                (param.index, target)
            })
            .collect();
        ty.substitute(from, &map)
    }

    /// Merges a compatible redeclaration. The signature types and
    /// `poly_scope` always move together.
    fn merge(&mut self, decl: &FunctionEntity) {
        if decl.defined {
            let params = match (&decl.params, &self.params) {
                (Some(params), _) => Some(params.clone()),
                (None, Some(prototyped)) => Some(
                    prototyped
                        .iter()
                        .map(|param| decl.rebase_from(self, param))
                        .collect(),
                ),
                (None, None) => None,
            };
            self.return_ty = decl.return_ty.clone();
            self.params = params;
            self.poly_scope = decl.poly_scope;
            self.type_params = decl.type_params.clone();
            self.defined = true;
        } else if self.params.is_none() {
            self.params = decl
                .params
                .as_ref()
                .map(|params| params.iter().map(|param| self.rebase_from(decl, param)).collect());
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableEntity {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Entity {
    Function(FunctionEntity),
    Variable(VariableEntity),
}

impl Entity {
    pub fn span(&self) -> Span {
        match self {
            Entity::Function(function) => function.span,
            Entity::Variable(variable) => variable.span,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionEntity> {
        match self {
            Entity::Function(function) => Some(function),
            Entity::Variable(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    type_params: Vec<TypeParameter>,
    type_param_index: HashMap<String, usize>,
    entities: HashMap<String, Entity>,
    poisoned: bool,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            type_params: Vec::new(),
            type_param_index: HashMap::new(),
            entities: HashMap::new(),
            poisoned: false,
        }
    }

    pub fn type_params(&self) -> &[TypeParameter] {
        &self.type_params
    }

    pub fn type_param(&self, name: &str) -> Option<&TypeParameter> {
        self.type_param_index
            .get(name)
            .map(|index| &self.type_params[*index])
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionEntity> {
        self.entities.get(name).and_then(Entity::as_function)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Set when the `_For_any` list that opened this scope was malformed.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

#[derive(Clone, Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::TranslationUnit, None)],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ScopeId> {
        (0..self.scopes.len()).map(ScopeId)
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).parent
    }

    pub fn is_ancestor_or_self(&self, ancestor: ScopeId, mut scope: ScopeId) -> bool {
        loop {
            if scope == ancestor {
                return true;
            }
            match self.parent(scope) {
                Some(parent) => scope = parent,
                None => return false,
            }
        }
    }

    /// Resolves `name` as a type parameter from `scope` outwards, the way the
    /// parser would have seen it with `scope` innermost.
    pub fn resolve_type_param_from(&self, scope: ScopeId, name: &str) -> Option<TypeParamRef> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let record = self.get(id);
            if let Some(param) = record.type_param(name) {
                return Some(TypeParamRef {
                    name: param.name.clone(),
                    scope: id,
                    index: param.index,
                });
            }
            if record.entities.contains_key(name) {
                return None;
            }
            cursor = record.parent;
        }
        None
    }

    pub fn lookup_from(&self, scope: ScopeId, name: &str) -> Option<&Entity> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let record = self.get(id);
            if record.type_param_index.contains_key(name) {
                return None;
            }
            if let Some(entity) = record.entities.get(name) {
                return Some(entity);
            }
            cursor = record.parent;
        }
        None
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScopeStats {
    pub opened: usize,
    pub closed: usize,
    pub polymorphic_opened: usize,
    pub polymorphic_closed: usize,
}

impl ScopeStats {
    pub fn is_balanced(&self) -> bool {
        self.opened == self.closed && self.polymorphic_opened == self.polymorphic_closed
    }
}

/// Proof that a polymorphic scope is open. Must be handed back to
/// [`ScopeChain::close_polymorphic_scope`].
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub struct PolymorphicScopeHandle {
    id: ScopeId,
}

impl PolymorphicScopeHandle {
    pub fn id(&self) -> ScopeId {
        self.id
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution<'a> {
    TypeParam(&'a TypeParameter, ScopeId),
    Entity(&'a Entity, ScopeId),
}

pub struct ScopeChain {
    tree: ScopeTree,
    active: Vec<ScopeId>,
    stats: ScopeStats,
    trace: bool,
}

impl ScopeChain {
    pub fn new(trace: bool) -> Self {
        let tree = ScopeTree::new();
        let root = tree.root();
        Self {
            tree,
            active: vec![root],
            stats: ScopeStats::default(),
            trace,
        }
    }

    pub fn tree(&self) -> &ScopeTree {
        &self.tree
    }

    pub fn stats(&self) -> ScopeStats {
        self.stats
    }

    pub fn current(&self) -> ScopeId {
        self.active.last().copied().unwrap_or(self.tree.root())
    }

    pub fn depth(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: ScopeId) -> bool {
        self.active.contains(&id)
    }

    /// Whether a malformed `_For_any` list is governing the current parse.
    pub fn in_poisoned_scope(&self) -> bool {
        self.active.iter().any(|id| self.tree.get(*id).poisoned)
    }

    pub fn open_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let parent = self.current();
        let id = ScopeId(self.tree.scopes.len());
        self.tree.scopes.push(Scope::new(kind, Some(parent)));
        self.tree.get_mut(parent).children.push(id);
        self.active.push(id);
        self.stats.opened += 1;
        if self.trace {
            eprintln!("[forany-debug] open {kind} scope {} (parent {})", id.0, parent.0);
        }
        id
    }

    pub fn close_scope(&mut self, id: ScopeId) -> Result<(), ScopeFault> {
        let top = self.current();
        if top == self.tree.root() {
            return Err(ScopeFault::RootClosed);
        }
        if top != id {
            return Err(ScopeFault::NotInnermost { scope: id, top });
        }
        self.active.pop();
        self.stats.closed += 1;
        if self.trace {
            let kind = self.tree.get(id).kind;
            eprintln!("[forany-debug] close {kind} scope {}", id.0);
        }
        Ok(())
    }

    /// Opens the scope that holds the type parameters of one `_For_any`
    /// declaration. `parent` must be the innermost active scope.
    pub fn open_polymorphic_scope(
        &mut self,
        parent: ScopeId,
        type_params: Vec<TypeParameter>,
    ) -> Result<PolymorphicScopeHandle, ScopeFault> {
        let top = self.current();
        if parent != top {
            return Err(ScopeFault::NotInnermost { scope: parent, top });
        }
        let id = self.open_scope(ScopeKind::Polymorphic);
        let scope = self.tree.get_mut(id);
        for param in type_params {
            scope.type_param_index.insert(param.name.clone(), param.index);
            scope.type_params.push(param);
        }
        self.stats.polymorphic_opened += 1;
        Ok(PolymorphicScopeHandle { id })
    }

    pub fn close_polymorphic_scope(&mut self, handle: PolymorphicScopeHandle) -> Result<(), ScopeFault> {
        let kind = self.tree.get(handle.id).kind;
        if kind != ScopeKind::Polymorphic {
            return Err(ScopeFault::WrongKind {
                scope: handle.id,
                expected: ScopeKind::Polymorphic.name(),
                found: kind.name(),
            });
        }
        self.close_scope(handle.id)?;
        self.stats.polymorphic_closed += 1;
        Ok(())
    }

    pub fn poison(&mut self, id: ScopeId) {
        self.tree.get_mut(id).poisoned = true;
    }

    /// Binds `decl` into `enclosing`, which the caller captured before opening
    /// the declaration's polymorphic scope.
    ///
    /// A compatible redeclaration merges into the existing entry. An
    /// incompatible one replaces it and yields `DuplicateDeclaration`.
    pub fn bind_function(&mut self, enclosing: ScopeId, decl: FunctionEntity) -> Result<(), DiagnosticKind> {
        if self.trace {
            eprintln!(
                "[forany-debug] bind function `{}` in scope {} ({} type parameter(s))",
                decl.name,
                enclosing.0,
                decl.type_params.len()
            );
        }
        let scope = self.tree.get_mut(enclosing);
        let conflict = match scope.entities.get_mut(&decl.name) {
            None => None,
            Some(Entity::Function(existing)) => {
                if existing.compatible_with(&decl) && !(existing.defined && decl.defined) {
                    existing.merge(&decl);
                    return Ok(());
                }
                Some(existing.span)
            }
            Some(Entity::Variable(existing)) => Some(existing.span),
        };
        let name = decl.name.clone();
        scope.entities.insert(name.clone(), Entity::Function(decl));
        match conflict {
            Some(previous) => Err(DiagnosticKind::DuplicateDeclaration { name, previous }),
            None => Ok(()),
        }
    }

    pub fn bind_variable(&mut self, scope: ScopeId, var: VariableEntity) -> Result<(), DiagnosticKind> {
        let record = self.tree.get_mut(scope);
        let previous = record.entities.get(&var.name).map(Entity::span);
        let name = var.name.clone();
        record.entities.insert(name.clone(), Entity::Variable(var));
        match previous {
            Some(previous) => Err(DiagnosticKind::DuplicateDeclaration { name, previous }),
            None => Ok(()),
        }
    }

    /// Innermost binding of `name` on the active chain. Within one scope the
    /// type-parameter map is consulted before ordinary names.
    pub fn resolve(&self, name: &str) -> Option<Resolution<'_>> {
        for id in self.active.iter().rev() {
            let scope = self.tree.get(*id);
            if let Some(param) = scope.type_param(name) {
                return Some(Resolution::TypeParam(param, *id));
            }
            if let Some(entity) = scope.entities.get(name) {
                return Some(Resolution::Entity(entity, *id));
            }
        }
        None
    }

    pub fn resolve_type_param(&self, name: &str) -> Option<TypeParamRef> {
        match self.resolve(name)? {
            Resolution::TypeParam(param, scope) => Some(TypeParamRef {
                name: param.name.clone(),
                scope,
                index: param.index,
            }),
            Resolution::Entity(..) => None,
        }
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FunctionEntity> {
        match self.resolve(name)? {
            Resolution::Entity(entity, _) => entity.as_function(),
            Resolution::TypeParam(..) => None,
        }
    }

    /// Ends the parse. Every scope except the translation unit must be closed.
    pub fn finish(self) -> Result<(ScopeTree, ScopeStats), ScopeFault> {
        let open = self.active.len().saturating_sub(1);
        if open != 0 || !self.stats.is_balanced() {
            return Err(ScopeFault::Unbalanced { open });
        }
        Ok((self.tree, self.stats))
    }
}
