//! IR types.

use serde::{Deserialize, Serialize};

use super::DeclId;

/// What a simple type refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classifier {
    Class(DeclId),
    TypeParameter(DeclId),
}

/// Use-site variance of a type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variance {
    #[default]
    Invariant,
    Out,
    In,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeArgument {
    /// `*`
    Star,
    Projection {
        #[serde(default)]
        variance: Variance,
        ty: IrType,
    },
}

impl TypeArgument {
    pub fn invariant(ty: IrType) -> Self {
        TypeArgument::Projection {
            variance: Variance::Invariant,
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleType {
    pub classifier: Classifier,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub arguments: Vec<TypeArgument>,
    /// Type alias this type was written as, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrType {
    Simple(SimpleType),
    /// A type the front end could not resolve.
    Error { description: String },
}

impl IrType {
    /// Not-null class type.
    pub fn class(class: DeclId, arguments: Vec<TypeArgument>) -> Self {
        IrType::Simple(SimpleType {
            classifier: Classifier::Class(class),
            nullable: false,
            arguments,
            abbreviation: None,
        })
    }

    /// Not-null reference to a type parameter.
    pub fn type_parameter(param: DeclId) -> Self {
        IrType::Simple(SimpleType {
            classifier: Classifier::TypeParameter(param),
            nullable: false,
            arguments: Vec::new(),
            abbreviation: None,
        })
    }

    pub fn as_simple(&self) -> Option<&SimpleType> {
        match self {
            IrType::Simple(s) => Some(s),
            IrType::Error { .. } => None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, IrType::Simple(s) if s.nullable)
    }

    pub fn with_nullability(&self, nullable: bool) -> IrType {
        match self {
            IrType::Simple(s) => IrType::Simple(SimpleType {
                nullable,
                ..s.clone()
            }),
            other => other.clone(),
        }
    }

    pub fn make_nullable(&self) -> IrType {
        self.with_nullability(true)
    }

    pub fn make_not_null(&self) -> IrType {
        self.with_nullability(false)
    }

    /// Class this type refers to, if it is a class type.
    pub fn class_id(&self) -> Option<DeclId> {
        match self {
            IrType::Simple(SimpleType {
                classifier: Classifier::Class(id),
                ..
            }) => Some(*id),
            _ => None,
        }
    }
}
