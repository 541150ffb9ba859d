use core::fmt::Display;
use core::str::FromStr;

use itertools::Itertools;

use crate::error::Error;
use crate::types::SolType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{text}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    /// `>>>=`, treated like `>>=`.
    Sar,
}

impl AssignOp {
    /// The binary operator a compound assignment applies.
    pub fn binary(self) -> Option<BinaryOp> {
        Some(match self {
            AssignOp::Assign => return None,
            AssignOp::Add => BinaryOp::Add,
            AssignOp::Sub => BinaryOp::Sub,
            AssignOp::Mul => BinaryOp::Mul,
            AssignOp::Div => BinaryOp::Div,
            AssignOp::Mod => BinaryOp::Mod,
            AssignOp::BitAnd => BinaryOp::BitAnd,
            AssignOp::BitOr => BinaryOp::BitOr,
            AssignOp::BitXor => BinaryOp::BitXor,
            AssignOp::Shl => BinaryOp::Shl,
            AssignOp::Shr | AssignOp::Sar => BinaryOp::Shr,
        })
    }
}

impl Display for AssignOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AssignOp::Assign => write!(f, "="),
            AssignOp::Sar => write!(f, ">>>="),
            op => match op.binary() {
                Some(bin) => write!(f, "{bin}="),
                None => write!(f, "="),
            },
        }
    }
}

impl FromStr for AssignOp {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Error> {
        Ok(match text {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            "/=" => AssignOp::Div,
            "%=" => AssignOp::Mod,
            "&=" => AssignOp::BitAnd,
            "|=" => AssignOp::BitOr,
            "^=" => AssignOp::BitXor,
            "<<=" => AssignOp::Shl,
            ">>=" => AssignOp::Shr,
            ">>>=" => AssignOp::Sar,
            _ => {
                return Err(Error::UnsupportedOperator {
                    op: text.to_owned(),
                    operands: "assignments".to_owned(),
                });
            }
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubDenomination {
    Wei,
    Gwei,
    Ether,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl SubDenomination {
    pub fn multiplier(self) -> u64 {
        match self {
            SubDenomination::Wei | SubDenomination::Seconds => 1,
            SubDenomination::Gwei => 1_000_000_000,
            SubDenomination::Ether => 1_000_000_000_000_000_000,
            SubDenomination::Minutes => 60,
            SubDenomination::Hours => 3_600,
            SubDenomination::Days => 86_400,
            SubDenomination::Weeks => 604_800,
        }
    }
}

impl Display for SubDenomination {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            SubDenomination::Wei => "wei",
            SubDenomination::Gwei => "gwei",
            SubDenomination::Ether => "ether",
            SubDenomination::Seconds => "seconds",
            SubDenomination::Minutes => "minutes",
            SubDenomination::Hours => "hours",
            SubDenomination::Days => "days",
            SubDenomination::Weeks => "weeks",
        };
        write!(f, "{text}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    /// Decimal, hex or scientific notation, exactly as written.
    Number(String),
    Bool(bool),
    Str(String),
    /// `hex"..."`, digits only.
    Hex(String),
}

impl Display for Literal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Literal::Number(text) => write!(f, "{text}"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Str(s) => write!(f, "\"{s}\""),
            Literal::Hex(h) => write!(f, "hex\"{h}\""),
        }
    }
}

/// An argument of a call, optionally named (`f({to: x})`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expression,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    Identifier(String),
    Literal(Literal),
    MemberAccess {
        base: Box<Expression>,
        member: String,
    },
    IndexAccess {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    TypeConversion {
        ty: SolType,
        operand: Box<Expression>,
    },
    Conditional {
        cond: Box<Expression>,
        then: Box<Expression>,
        els: Box<Expression>,
    },
    InlineArray(Vec<Expression>),
    FunctionCall {
        callee: Box<Expression>,
        args: Vec<Argument>,
    },
    /// `callee{value: v, gas: g}`, used as the callee of a call.
    FunctionCallOptions {
        callee: Box<Expression>,
        options: Vec<(String, Expression)>,
    },
    Tuple(Vec<Option<Expression>>),
    Assignment {
        op: AssignOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    SubDenomination {
        value: String,
        unit: SubDenomination,
    },
    /// `new T`, used as the callee of a call.
    New(SolType),
    /// `type(T)`.
    MetaType(SolType),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
    pub kind: ExprKind,
    pub line: u32,
}

// Builders, mostly for tests and for front ends that construct trees by hand.
impl Expression {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, line: 0 }
    }

    pub fn at(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn ident(name: &str) -> Self {
        Self::new(ExprKind::Identifier(name.to_owned()))
    }

    pub fn number(value: impl Display) -> Self {
        Self::new(ExprKind::Literal(Literal::Number(value.to_string())))
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ExprKind::Literal(Literal::Bool(value)))
    }

    pub fn string(value: &str) -> Self {
        Self::new(ExprKind::Literal(Literal::Str(value.to_owned())))
    }

    pub fn member(self, member: &str) -> Self {
        Self::new(ExprKind::MemberAccess {
            base: Box::new(self),
            member: member.to_owned(),
        })
    }

    pub fn index(self, index: Expression) -> Self {
        Self::new(ExprKind::IndexAccess {
            base: Box::new(self),
            index: Box::new(index),
        })
    }

    pub fn call(self, args: Vec<Expression>) -> Self {
        let args = args
            .into_iter()
            .map(|value| Argument { name: None, value })
            .collect();
        Self::new(ExprKind::FunctionCall {
            callee: Box::new(self),
            args,
        })
    }

    pub fn call_named(self, args: Vec<(&str, Expression)>) -> Self {
        let args = args
            .into_iter()
            .map(|(name, value)| Argument {
                name: Some(name.to_owned()),
                value,
            })
            .collect();
        Self::new(ExprKind::FunctionCall {
            callee: Box::new(self),
            args,
        })
    }

    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
        Self::new(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Self::new(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn assign(op: AssignOp, lhs: Expression, rhs: Expression) -> Self {
        Self::new(ExprKind::Assignment {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn convert(ty: SolType, operand: Expression) -> Self {
        Self::new(ExprKind::TypeConversion {
            ty,
            operand: Box::new(operand),
        })
    }

    /// The identifier an access chain starts from: `a` for `a.b[c].d`.
    pub fn root_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            ExprKind::MemberAccess { base, .. } | ExprKind::IndexAccess { base, .. } => base.root_identifier(),
            _ => None,
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            ExprKind::Identifier(name) => write!(f, "{name}"),
            ExprKind::Literal(lit) => write!(f, "{lit}"),
            ExprKind::MemberAccess { base, member } => write!(f, "{base}.{member}"),
            ExprKind::IndexAccess { base, index } => write!(f, "{base}[{index}]"),
            ExprKind::TypeConversion { ty, operand } => write!(f, "{ty}({operand})"),
            ExprKind::Conditional { cond, then, els } => write!(f, "{cond} ? {then} : {els}"),
            ExprKind::InlineArray(items) => write!(f, "[{}]", items.iter().join(", ")),
            ExprKind::FunctionCall { callee, args } => {
                let args = args.iter().map(|arg| match &arg.name {
                    Some(name) => format!("{name}: {}", arg.value),
                    None => arg.value.to_string(),
                });
                if self.has_named_args() {
                    write!(f, "{callee}({{{}}})", args.format(", "))
                } else {
                    write!(f, "{callee}({})", args.format(", "))
                }
            }
            ExprKind::FunctionCallOptions { callee, options } => write!(
                f,
                "{callee}{{{}}}",
                options.iter().map(|(name, value)| format!("{name}: {value}")).join(", ")
            ),
            ExprKind::Tuple(items) => write!(
                f,
                "({})",
                items
                    .iter()
                    .map(|item| item.as_ref().map(ToString::to_string).unwrap_or_default())
                    .join(", ")
            ),
            ExprKind::Assignment { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs}"),
            ExprKind::SubDenomination { value, unit } => write!(f, "{value} {unit}"),
            ExprKind::New(ty) => write!(f, "new {ty}"),
            ExprKind::MetaType(ty) => write!(f, "type({ty})"),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "-{operand}"),
                UnaryOp::Not => write!(f, "!{operand}"),
                UnaryOp::BitNot => write!(f, "~{operand}"),
                UnaryOp::PreInc => write!(f, "++{operand}"),
                UnaryOp::PreDec => write!(f, "--{operand}"),
                UnaryOp::PostInc => write!(f, "{operand}++"),
                UnaryOp::PostDec => write!(f, "{operand}--"),
                UnaryOp::Delete => write!(f, "delete {operand}"),
            },
            ExprKind::Binary { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs}"),
        }
    }
}

impl Expression {
    fn has_named_args(&self) -> bool {
        matches!(&self.kind, ExprKind::FunctionCall { args, .. } if args.iter().any(|a| a.name.is_some()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StmtKind {
    /// `storage` declarations alias the initializer instead of copying it.
    VariableDeclaration {
        ty: SolType,
        name: String,
        init: Option<Expression>,
        storage: bool,
    },
    Assignment {
        op: AssignOp,
        lhs: Expression,
        rhs: Expression,
    },
    /// Calls, `++`/`--`, `delete` and other expressions evaluated for their
    /// effects.
    Expression(Expression),
    Return(Option<Expression>),
    Revert,
    Break,
    Continue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    pub kind: StmtKind,
    pub line: u32,
}

impl Statement {
    pub fn new(kind: StmtKind, line: u32) -> Self {
        Self { kind, line }
    }

    pub fn declare(ty: SolType, name: &str, init: Option<Expression>, line: u32) -> Self {
        Self::new(
            StmtKind::VariableDeclaration {
                ty,
                name: name.to_owned(),
                init,
                storage: false,
            },
            line,
        )
    }

    pub fn assign(lhs: Expression, op: AssignOp, rhs: Expression, line: u32) -> Self {
        Self::new(StmtKind::Assignment { op, lhs, rhs }, line)
    }

    pub fn expr(expr: Expression, line: u32) -> Self {
        Self::new(StmtKind::Expression(expr), line)
    }

    pub fn ret(expr: Option<Expression>, line: u32) -> Self {
        Self::new(StmtKind::Return(expr), line)
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.kind {
            StmtKind::VariableDeclaration {
                ty,
                name,
                init,
                storage,
            } => {
                let location = if *storage { " storage" } else { "" };
                match init {
                    Some(init) => write!(f, "{ty}{location} {name} = {init};"),
                    None => write!(f, "{ty}{location} {name};"),
                }
            }
            StmtKind::Assignment { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs};"),
            StmtKind::Expression(expr) => write!(f, "{expr};"),
            StmtKind::Return(Some(expr)) => write!(f, "return {expr};"),
            StmtKind::Return(None) => write!(f, "return;"),
            StmtKind::Revert => write!(f, "revert();"),
            StmtKind::Break => write!(f, "break;"),
            StmtKind::Continue => write!(f, "continue;"),
        }
    }
}
