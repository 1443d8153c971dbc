// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Interned expression DAG referenced by trace steps.
//!
//! Traces on real programs reach hundreds of thousands of steps, and the same
//! guard and sub-expression shapes recur constantly. Every node is therefore
//! hash-consed through [`internment::ArcIntern`]: structurally equal input
//! yields the identical shared allocation, and steps hold cheap handles
//! instead of owning trees.

use internment::ArcIntern;
use num::BigInt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An interned identifier. Clone and equality are pointer-cheap; ordering
/// follows string content so map iteration is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(ArcIntern<String>);

impl PartialOrd for Ident {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ident {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Ident(ArcIntern::new(name.into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Ident::new(s)
    }
}

/// A concrete value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Constant {
    Bool(bool),
    Int(BigInt),
}

impl Constant {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Constant::Bool(b) => Some(*b),
            Constant::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Constant::Int(i) => Some(i),
            Constant::Bool(_) => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Int(i) => write!(f, "{}", i),
        }
    }
}

/// An SSA-renamed program symbol together with its pre-renaming identity.
///
/// The symbolic-execution driver renames every write, so `ident` is unique per
/// definition while `original` names the source-level object. Slicing works on
/// originals; the converter works on the renamed form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    pub ident: Ident,
    pub original: Ident,
}

impl Symbol {
    pub fn new(ident: impl Into<String>, original: impl Into<String>) -> Self {
        Symbol {
            ident: Ident::new(ident),
            original: Ident::new(original),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ident)
    }
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BinOp {
    And, Or, Implies,
    Eq, Notequal, Lt, Le, Gt, Ge,
    Add, Sub, Mul, Div, Rem,
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnOp {
    Not,
    Neg,
}

/// Structural expression node. Always accessed through an [`Expr`] handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprData {
    Constant(Constant),
    Symbol(Symbol),
    BinOp { op: BinOp, lhs: Expr, rhs: Expr },
    UnOp { op: UnOp, operand: Expr },
    Ite { cond: Expr, then_expr: Expr, else_expr: Expr },
}

/// Opaque handle to an interned expression node.
///
/// Two handles built from structurally equal input compare equal and point at
/// the same allocation ([`Expr::ptr_eq`] observes this). The interner owns the
/// nodes; handles keep them alive for as long as any step references them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expr(ArcIntern<ExprData>);

impl Expr {
    pub fn intern(data: ExprData) -> Self {
        Expr(ArcIntern::new(data))
    }

    pub fn data(&self) -> &ExprData {
        &self.0
    }

    /// Whether two handles share the same interned allocation.
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        std::ptr::eq::<ExprData>(self.data(), other.data())
    }

    pub fn truth() -> Self {
        Expr::intern(ExprData::Constant(Constant::Bool(true)))
    }

    pub fn falsity() -> Self {
        Expr::intern(ExprData::Constant(Constant::Bool(false)))
    }

    pub fn boolean(b: bool) -> Self {
        if b { Expr::truth() } else { Expr::falsity() }
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        Expr::intern(ExprData::Constant(Constant::Int(value.into())))
    }

    pub fn symbol(symbol: Symbol) -> Self {
        Expr::intern(ExprData::Symbol(symbol))
    }

    pub fn binop(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::intern(ExprData::BinOp { op, lhs, rhs })
    }

    /// Conjunction, folding the neutral and absorbing constants.
    pub fn and(lhs: Expr, rhs: Expr) -> Self {
        match (lhs.as_bool_constant(), rhs.as_bool_constant()) {
            (Some(true), _) => rhs,
            (_, Some(true)) => lhs,
            (Some(false), _) | (_, Some(false)) => Expr::falsity(),
            _ => Expr::binop(BinOp::And, lhs, rhs),
        }
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Self {
        match (lhs.as_bool_constant(), rhs.as_bool_constant()) {
            (Some(false), _) => rhs,
            (_, Some(false)) => lhs,
            (Some(true), _) | (_, Some(true)) => Expr::truth(),
            _ => Expr::binop(BinOp::Or, lhs, rhs),
        }
    }

    pub fn implies(lhs: Expr, rhs: Expr) -> Self {
        match (lhs.as_bool_constant(), rhs.as_bool_constant()) {
            (Some(true), _) => rhs,
            (Some(false), _) | (_, Some(true)) => Expr::truth(),
            _ => Expr::binop(BinOp::Implies, lhs, rhs),
        }
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Expr::binop(BinOp::Eq, lhs, rhs)
    }

    pub fn not(operand: Expr) -> Self {
        match operand.as_bool_constant() {
            Some(b) => Expr::boolean(!b),
            None => Expr::intern(ExprData::UnOp { op: UnOp::Not, operand }),
        }
    }

    pub fn ite(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Expr::intern(ExprData::Ite { cond, then_expr, else_expr })
    }

    pub fn as_bool_constant(&self) -> Option<bool> {
        match self.data() {
            ExprData::Constant(Constant::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// The symbol inside, if this handle is a plain symbol reference.
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self.data() {
            ExprData::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Collect the renamed identifiers of every symbol occurring in the DAG.
    pub fn collect_idents(&self, out: &mut BTreeSet<Ident>) {
        self.walk_symbols(&mut |s| {
            out.insert(s.ident.clone());
        });
    }

    /// Collect the pre-renaming identifiers of every symbol occurring in the
    /// DAG. This is the rely analysis' view of an expression.
    pub fn collect_originals(&self, out: &mut BTreeSet<Ident>) {
        self.walk_symbols(&mut |s| {
            out.insert(s.original.clone());
        });
    }

    fn walk_symbols(&self, f: &mut impl FnMut(&Symbol)) {
        match self.data() {
            ExprData::Constant(_) => {}
            ExprData::Symbol(s) => f(s),
            ExprData::BinOp { lhs, rhs, .. } => {
                lhs.walk_symbols(f);
                rhs.walk_symbols(f);
            }
            ExprData::UnOp { operand, .. } => operand.walk_symbols(f),
            ExprData::Ite { cond, then_expr, else_expr } => {
                cond.walk_symbols(f);
                then_expr.walk_symbols(f);
                else_expr.walk_symbols(f);
            }
        }
    }

    /// Evaluate under a concrete environment keyed by renamed identifier.
    /// Returns `None` on an unbound symbol or a type mismatch.
    pub fn eval(&self, env: &Env) -> Option<Constant> {
        match self.data() {
            ExprData::Constant(c) => Some(c.clone()),
            ExprData::Symbol(s) => env.get(&s.ident).cloned(),
            ExprData::UnOp { op, operand } => {
                let v = operand.eval(env)?;
                match op {
                    UnOp::Not => Some(Constant::Bool(!v.as_bool()?)),
                    UnOp::Neg => Some(Constant::Int(-v.as_int()?.clone())),
                }
            }
            ExprData::BinOp { op, lhs, rhs } => {
                let l = lhs.eval(env)?;
                let r = rhs.eval(env)?;
                eval_binop(*op, &l, &r)
            }
            ExprData::Ite { cond, then_expr, else_expr } => {
                if cond.eval(env)?.as_bool()? {
                    then_expr.eval(env)
                } else {
                    else_expr.eval(env)
                }
            }
        }
    }
}

/// Concrete interpretation: renamed identifier -> value.
pub type Env = std::collections::BTreeMap<Ident, Constant>;

fn eval_binop(op: BinOp, l: &Constant, r: &Constant) -> Option<Constant> {
    use BinOp::*;
    match op {
        And => Some(Constant::Bool(l.as_bool()? && r.as_bool()?)),
        Or => Some(Constant::Bool(l.as_bool()? || r.as_bool()?)),
        Implies => Some(Constant::Bool(!l.as_bool()? || r.as_bool()?)),
        Eq => Some(Constant::Bool(l == r)),
        Notequal => Some(Constant::Bool(l != r)),
        Lt => Some(Constant::Bool(l.as_int()? < r.as_int()?)),
        Le => Some(Constant::Bool(l.as_int()? <= r.as_int()?)),
        Gt => Some(Constant::Bool(l.as_int()? > r.as_int()?)),
        Ge => Some(Constant::Bool(l.as_int()? >= r.as_int()?)),
        Add => Some(Constant::Int(l.as_int()? + r.as_int()?)),
        Sub => Some(Constant::Int(l.as_int()? - r.as_int()?)),
        Mul => Some(Constant::Int(l.as_int()? * r.as_int()?)),
        Div => {
            let d = r.as_int()?;
            if d == &BigInt::from(0) {
                return None;
            }
            Some(Constant::Int(l.as_int()? / d))
        }
        Rem => {
            let d = r.as_int()?;
            if d == &BigInt::from(0) {
                return None;
            }
            Some(Constant::Int(l.as_int()? % d))
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            ExprData::Constant(c) => write!(f, "{}", c),
            ExprData::Symbol(s) => write!(f, "{}", s),
            ExprData::BinOp { op, lhs, rhs } => {
                let op = match op {
                    BinOp::And => "&&",
                    BinOp::Or => "||",
                    BinOp::Implies => "=>",
                    BinOp::Eq => "==",
                    BinOp::Notequal => "!=",
                    BinOp::Lt => "<",
                    BinOp::Le => "<=",
                    BinOp::Gt => ">",
                    BinOp::Ge => ">=",
                    BinOp::Add => "+",
                    BinOp::Sub => "-",
                    BinOp::Mul => "*",
                    BinOp::Div => "/",
                    BinOp::Rem => "%",
                };
                write!(f, "({} {} {})", lhs, op, rhs)
            }
            ExprData::UnOp { op, operand } => match op {
                UnOp::Not => write!(f, "!{}", operand),
                UnOp::Neg => write!(f, "-{}", operand),
            },
            ExprData::Ite { cond, then_expr, else_expr } => {
                write!(f, "({} ? {} : {})", cond, then_expr, else_expr)
            }
        }
    }
}
