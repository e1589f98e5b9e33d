//! Value-flow facts

use crate::shared::models::TokenId;

/// Reasoning steps behind a value, outermost first
pub type ErrorPath = Vec<(TokenId, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifetimeKind {
    /// `&x`
    Address,
    /// Array decaying to a pointer to its first element
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifetimeScope {
    Local,
    Argument,
}

#[derive(Debug, Clone)]
pub enum ValueData {
    Int(i64),
    Float(f64),
    /// String literal token
    Tok(TokenId),
    Uninit,
    Lifetime {
        var_id: u32,
        var_token: TokenId,
        kind: LifetimeKind,
        scope: LifetimeScope,
    },
    ContainerSize(i64),
    /// Equal to variable `var_id` plus `delta`
    Symbolic {
        var_id: u32,
        expr: TokenId,
        delta: i64,
    },
}

impl PartialEq for ValueData {
    fn eq(&self, other: &Self) -> bool {
        use ValueData::*;
        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Tok(a), Tok(b)) => a == b,
            (Uninit, Uninit) => true,
            (
                Lifetime { var_id: a, kind: ka, scope: sa, .. },
                Lifetime { var_id: b, kind: kb, scope: sb, .. },
            ) => a == b && ka == kb && sa == sb,
            (ContainerSize(a), ContainerSize(b)) => a == b,
            (Symbolic { var_id: a, delta: da, .. }, Symbolic { var_id: b, delta: db, .. }) => {
                a == b && da == db
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueKind {
    #[default]
    Known,
    Possible,
    /// The value can not occur here
    Impossible,
    Inconclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Bound {
    #[default]
    Point,
    /// The value or anything below it
    Upper,
    /// The value or anything above it
    Lower,
}

#[derive(Debug, Clone)]
pub struct Value {
    pub data: ValueData,
    pub kind: ValueKind,
    pub bound: Bound,
    /// Indirection the fact applies to (`*p` is 1 for `p`)
    pub indirect: i32,
    /// Condition the value was derived from
    pub condition: Option<TokenId>,
    pub error_path: ErrorPath,
}

impl Value {
    pub fn new(data: ValueData) -> Self {
        Self {
            data,
            kind: ValueKind::Known,
            bound: Bound::Point,
            indirect: 0,
            condition: None,
            error_path: Vec::new(),
        }
    }

    pub fn int(n: i64) -> Self {
        Self::new(ValueData::Int(n))
    }

    pub fn float(f: f64) -> Self {
        Self::new(ValueData::Float(f))
    }

    pub fn uninit() -> Self {
        Self::new(ValueData::Uninit)
    }

    pub fn container_size(n: i64) -> Self {
        Self::new(ValueData::ContainerSize(n))
    }

    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_bound(mut self, bound: Bound) -> Self {
        self.bound = bound;
        self
    }

    pub fn with_condition(mut self, condition: TokenId) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_step(mut self, token: TokenId, info: impl Into<String>) -> Self {
        self.error_path.push((token, info.into()));
        self
    }

    /// Demote a known value to possible
    pub fn possible(mut self) -> Self {
        if self.kind == ValueKind::Known {
            self.kind = ValueKind::Possible;
        }
        self
    }

    /// Identity used for deduplication on one token
    pub fn same_fact(&self, other: &Value) -> bool {
        self.data == other.data
            && self.kind == other.kind
            && self.bound == other.bound
            && self.indirect == other.indirect
    }

    pub fn is_known(&self) -> bool {
        self.kind == ValueKind::Known
    }

    pub fn is_possible(&self) -> bool {
        self.kind == ValueKind::Possible
    }

    pub fn is_impossible(&self) -> bool {
        self.kind == ValueKind::Impossible
    }

    pub fn is_inconclusive(&self) -> bool {
        self.kind == ValueKind::Inconclusive
    }

    pub fn int_value(&self) -> Option<i64> {
        match self.data {
            ValueData::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn float_value(&self) -> Option<f64> {
        match self.data {
            ValueData::Float(f) => Some(f),
            ValueData::Int(n) => Some(n as f64),
            _ => None,
        }
    }

    pub fn is_uninit(&self) -> bool {
        matches!(self.data, ValueData::Uninit)
    }

    pub fn is_lifetime(&self) -> bool {
        matches!(self.data, ValueData::Lifetime { .. })
    }

    pub fn container_size_value(&self) -> Option<i64> {
        match self.data {
            ValueData::ContainerSize(n) => Some(n),
            _ => None,
        }
    }

    /// Integer zero that may be dereferenced as a null pointer
    pub fn is_null(&self) -> bool {
        self.indirect == 0 && self.int_value() == Some(0) && self.bound == Bound::Point
    }
}
