use crate::language::{scope::ScopeId, span::Span};
use std::{collections::HashMap, fmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Void,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl BuiltinType {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinType::Void => "void",
            BuiltinType::Char => "char",
            BuiltinType::Short => "short",
            BuiltinType::Int => "int",
            BuiltinType::Long => "long",
            BuiltinType::Float => "float",
            BuiltinType::Double => "double",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckedPointerKind {
    Ptr,
    ArrayPtr,
    NtArrayPtr,
}

impl CheckedPointerKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            CheckedPointerKind::Ptr => "_Ptr",
            CheckedPointerKind::ArrayPtr => "_Array_ptr",
            CheckedPointerKind::NtArrayPtr => "_Nt_array_ptr",
        }
    }
}

/// Reference to a type parameter introduced by a `_For_any` specifier.
#[derive(Clone, Debug)]
pub struct TypeParamRef {
    pub name: String,
    pub scope: ScopeId,
    pub index: usize,
}

// Type parameters are positional: two signatures that differ only in the
// spelling of their type parameters describe the same function.
impl PartialEq for TypeParamRef {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeExpr {
    Builtin(BuiltinType),
    TypeParam(TypeParamRef),
    Pointer(Box<TypeExpr>),
    Checked {
        kind: CheckedPointerKind,
        pointee: Box<TypeExpr>,
    },
    /// Produced after an error was reported; compatible with everything.
    Error,
}

impl TypeExpr {
    pub fn int() -> Self {
        TypeExpr::Builtin(BuiltinType::Int)
    }

    pub fn pointer_to(self) -> Self {
        TypeExpr::Pointer(Box::new(self))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeExpr::Builtin(BuiltinType::Void))
    }

    pub fn mentions_type_param(&self) -> bool {
        match self {
            TypeExpr::TypeParam(_) => true,
            TypeExpr::Pointer(inner) => inner.mentions_type_param(),
            TypeExpr::Checked { pointee, .. } => pointee.mentions_type_param(),
            TypeExpr::Builtin(_) | TypeExpr::Error => false,
        }
    }

    /// Replaces type parameters of `scope` with the concrete types in `map`,
    /// keyed by parameter position.
    pub fn substitute(&self, scope: ScopeId, map: &HashMap<usize, TypeExpr>) -> TypeExpr {
        match self {
            TypeExpr::TypeParam(param) if param.scope == scope => map
                .get(&param.index)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeExpr::Pointer(inner) => TypeExpr::Pointer(Box::new(inner.substitute(scope, map))),
            TypeExpr::Checked { kind, pointee } => TypeExpr::Checked {
                kind: *kind,
                pointee: Box::new(pointee.substitute(scope, map)),
            },
            other => other.clone(),
        }
    }

    pub fn compatible_with(&self, other: &TypeExpr) -> bool {
        match (self, other) {
            (TypeExpr::Error, _) | (_, TypeExpr::Error) => true,
            (TypeExpr::Pointer(a), TypeExpr::Pointer(b)) => a.compatible_with(b),
            (
                TypeExpr::Checked {
                    kind: ka,
                    pointee: a,
                },
                TypeExpr::Checked {
                    kind: kb,
                    pointee: b,
                },
            ) => ka == kb && a.compatible_with(b),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Builtin(builtin) => f.write_str(builtin.name()),
            TypeExpr::TypeParam(param) => f.write_str(&param.name),
            TypeExpr::Pointer(inner) => write!(f, "{inner} *"),
            TypeExpr::Checked { kind, pointee } => write!(f, "{}<{pointee}>", kind.keyword()),
            TypeExpr::Error => f.write_str("<error>"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeAnnotation {
    pub ty: TypeExpr,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, scope: usize, index: usize) -> TypeExpr {
        TypeExpr::TypeParam(TypeParamRef {
            name: name.into(),
            scope: ScopeId(scope),
            index,
        })
    }

    fn checked(pointee: TypeExpr) -> TypeExpr {
        TypeExpr::Checked {
            kind: CheckedPointerKind::Ptr,
            pointee: Box::new(pointee),
        }
    }

    #[test]
    fn type_params_compare_by_position() {
        assert_eq!(param("T", 1, 0), param("U", 4, 0));
        assert_ne!(param("T", 1, 0), param("T", 1, 1));
    }

    #[test]
    fn substitution_only_touches_its_own_scope() {
        let ty = checked(param("T", 1, 0)).pointer_to();
        let map = HashMap::from([(0, TypeExpr::int())]);
        assert_eq!(ty.substitute(ScopeId(1), &map).to_string(), "_Ptr<int> *");
        assert_eq!(ty.substitute(ScopeId(2), &map).to_string(), "_Ptr<T> *");
    }

    #[test]
    fn error_type_is_compatible_with_anything() {
        assert!(TypeExpr::Error.compatible_with(&checked(TypeExpr::int())));
        assert!(!TypeExpr::int().compatible_with(&checked(TypeExpr::int())));
    }
}
