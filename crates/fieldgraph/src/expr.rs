//! Typed expression tree and fluent builder.
//!
//! Kernels are described as data, not closures: every node names what it
//! loads (buffer element, uniform, invocation index) or computes. The tree
//! is inspectable and testable without any GPU backend, and a lowering pass
//! could translate it to a compute shader without touching call sites.
//!
//! Scalars broadcast over vectors in arithmetic, mirroring shading-language
//! conventions; comparisons work on floats and yield booleans consumed by
//! `If` conditions.

use crate::store::BufferHandle;
use crate::value::{Ty, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Abs,
    Floor,
    Sqrt,
    Sin,
    Cos,
    Length,
    Normalize,
    Saturate,
    OneMinus,
    Luminance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    Pow,
    Step,
    Dot,
    Distance,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Swizzle {
    X,
    Y,
    Z,
    W,
    Xy,
    Xyz,
}

impl Swizzle {
    pub(crate) fn lanes(self) -> &'static [usize] {
        match self {
            Swizzle::X => &[0],
            Swizzle::Y => &[1],
            Swizzle::Z => &[2],
            Swizzle::W => &[3],
            Swizzle::Xy => &[0, 1],
            Swizzle::Xyz => &[0, 1, 2],
        }
    }

    pub(crate) fn ty(self) -> Ty {
        match self {
            Swizzle::X | Swizzle::Y | Swizzle::Z | Swizzle::W => Ty::Float,
            Swizzle::Xy => Ty::Vec2,
            Swizzle::Xyz => Ty::Vec3,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ExprKind {
    Literal(Value),
    /// Invocation index as a float (exact for the element counts in play).
    Index,
    /// Counter of the enclosing `Loop`, by nesting depth.
    LoopVar(u8),
    Local(usize),
    /// Current element of a buffer.
    Buffer(BufferHandle),
    /// Arbitrary element of a buffer; reads observe the pre-dispatch
    /// snapshot for elements other than the current one.
    BufferAt(BufferHandle, Box<Expr>),
    Uniform(String),
    UniformAt(String, Box<Expr>),
    Swizzle(Box<Expr>, Swizzle),
    Construct(Ty, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Clamp(Box<Expr>, Box<Expr>, Box<Expr>),
    Mix(Box<Expr>, Box<Expr>, Box<Expr>),
    /// remap(value, in_lo, in_hi, out_lo, out_hi), unclamped.
    Remap(Box<[Expr; 5]>),
    Noise(Box<Expr>),
    NoiseVec3(Box<Expr>),
    Sample(String, Box<Expr>),
}

/// One node of a kernel expression graph.
#[derive(Debug, Clone)]
pub struct Expr {
    pub(crate) kind: ExprKind,
}

impl Expr {
    pub(crate) fn new(kind: ExprKind) -> Self {
        Self { kind }
    }

    /// The per-invocation element index.
    pub fn index() -> Self {
        Self::new(ExprKind::Index)
    }

    /// Current element of `buffer`.
    pub fn element(buffer: BufferHandle) -> Self {
        Self::new(ExprKind::Buffer(buffer))
    }

    /// Element `index` of `buffer` (gather read, snapshot semantics).
    pub fn element_at(buffer: BufferHandle, index: impl Into<Expr>) -> Self {
        Self::new(ExprKind::BufferAt(buffer, Box::new(index.into())))
    }

    pub fn uniform(name: &str) -> Self {
        Self::new(ExprKind::Uniform(name.to_string()))
    }

    /// Element of an array uniform (the influence-list mirror).
    pub fn uniform_at(name: &str, index: impl Into<Expr>) -> Self {
        Self::new(ExprKind::UniformAt(name.to_string(), Box::new(index.into())))
    }

    /// Samples a named image grid at a vec2 UV.
    pub fn sample(image: &str, uv: impl Into<Expr>) -> Self {
        Self::new(ExprKind::Sample(image.to_string(), Box::new(uv.into())))
    }

    /// Scalar gradient noise of a vec3 coordinate, roughly `[-1, 1]`.
    pub fn noise(p: impl Into<Expr>) -> Self {
        Self::new(ExprKind::Noise(Box::new(p.into())))
    }

    /// Vector gradient noise of a vec3 coordinate.
    pub fn noise_vec3(p: impl Into<Expr>) -> Self {
        Self::new(ExprKind::NoiseVec3(Box::new(p.into())))
    }

    fn unary(self, op: UnaryOp) -> Self {
        Self::new(ExprKind::Unary(op, Box::new(self)))
    }

    fn binary(self, op: BinaryOp, rhs: impl Into<Expr>) -> Self {
        Self::new(ExprKind::Binary(op, Box::new(self), Box::new(rhs.into())))
    }

    pub fn abs(self) -> Self {
        self.unary(UnaryOp::Abs)
    }

    pub fn floor(self) -> Self {
        self.unary(UnaryOp::Floor)
    }

    pub fn sqrt(self) -> Self {
        self.unary(UnaryOp::Sqrt)
    }

    pub fn sin(self) -> Self {
        self.unary(UnaryOp::Sin)
    }

    pub fn cos(self) -> Self {
        self.unary(UnaryOp::Cos)
    }

    pub fn length(self) -> Self {
        self.unary(UnaryOp::Length)
    }

    /// Normalizes a vector; a zero vector stays zero instead of going NaN.
    pub fn normalize(self) -> Self {
        self.unary(UnaryOp::Normalize)
    }

    /// Clamp to `[0, 1]`.
    pub fn saturate(self) -> Self {
        self.unary(UnaryOp::Saturate)
    }

    /// `1 - self`.
    pub fn one_minus(self) -> Self {
        self.unary(UnaryOp::OneMinus)
    }

    /// Rec. 709 luminance of a vec3 color.
    pub fn luminance(self) -> Self {
        self.unary(UnaryOp::Luminance)
    }

    /// Floored modulo, defined for the non-negative index math it serves.
    pub fn modulo(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Mod, rhs)
    }

    pub fn min(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Min, rhs)
    }

    pub fn max(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Max, rhs)
    }

    pub fn pow(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Pow, rhs)
    }

    /// `self * self`.
    pub fn pow2(self) -> Self {
        self.clone().binary(BinaryOp::Mul, self)
    }

    pub fn dot(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Dot, rhs)
    }

    pub fn distance(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Distance, rhs)
    }

    pub fn less_than(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Less, rhs)
    }

    pub fn less_eq(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::LessEq, rhs)
    }

    pub fn greater_than(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Greater, rhs)
    }

    pub fn greater_eq(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::GreaterEq, rhs)
    }

    pub fn eq(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Eq, rhs)
    }

    pub fn and(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::And, rhs)
    }

    pub fn or(self, rhs: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Or, rhs)
    }

    pub fn clamp(self, lo: impl Into<Expr>, hi: impl Into<Expr>) -> Self {
        Self::new(ExprKind::Clamp(
            Box::new(self),
            Box::new(lo.into()),
            Box::new(hi.into()),
        ))
    }

    /// Linear blend toward `rhs` by factor `t`.
    pub fn mix(self, rhs: impl Into<Expr>, t: impl Into<Expr>) -> Self {
        Self::new(ExprKind::Mix(
            Box::new(self),
            Box::new(rhs.into()),
            Box::new(t.into()),
        ))
    }

    /// Linear remap from `[in_lo, in_hi]` to `[out_lo, out_hi]`, unclamped.
    pub fn remap(
        self,
        in_lo: impl Into<Expr>,
        in_hi: impl Into<Expr>,
        out_lo: impl Into<Expr>,
        out_hi: impl Into<Expr>,
    ) -> Self {
        Self::new(ExprKind::Remap(Box::new([
            self,
            in_lo.into(),
            in_hi.into(),
            out_lo.into(),
            out_hi.into(),
        ])))
    }

    /// Remap from `[in_lo, in_hi]` to `[0, 1]`, unclamped.
    pub fn remap01(self, in_lo: impl Into<Expr>, in_hi: impl Into<Expr>) -> Self {
        self.remap(in_lo, in_hi, 0.0, 1.0)
    }

    fn swizzle(self, swizzle: Swizzle) -> Self {
        Self::new(ExprKind::Swizzle(Box::new(self), swizzle))
    }

    pub fn x(self) -> Self {
        self.swizzle(Swizzle::X)
    }

    pub fn y(self) -> Self {
        self.swizzle(Swizzle::Y)
    }

    pub fn z(self) -> Self {
        self.swizzle(Swizzle::Z)
    }

    pub fn w(self) -> Self {
        self.swizzle(Swizzle::W)
    }

    pub fn xy(self) -> Self {
        self.swizzle(Swizzle::Xy)
    }

    pub fn xyz(self) -> Self {
        self.swizzle(Swizzle::Xyz)
    }
}

impl From<f32> for Expr {
    fn from(value: f32) -> Self {
        Expr::new(ExprKind::Literal(Value::Float(value)))
    }
}

impl From<u32> for Expr {
    fn from(value: u32) -> Self {
        Expr::from(value as f32)
    }
}

/// `step(edge, x)`: 0 where `x < edge`, 1 otherwise.
pub fn step(edge: impl Into<Expr>, x: impl Into<Expr>) -> Expr {
    edge.into().binary(BinaryOp::Step, x)
}

pub fn vec2(x: impl Into<Expr>, y: impl Into<Expr>) -> Expr {
    Expr::new(ExprKind::Construct(Ty::Vec2, vec![x.into(), y.into()]))
}

pub fn vec3(x: impl Into<Expr>, y: impl Into<Expr>, z: impl Into<Expr>) -> Expr {
    Expr::new(ExprKind::Construct(
        Ty::Vec3,
        vec![x.into(), y.into(), z.into()],
    ))
}

pub fn vec4(
    x: impl Into<Expr>,
    y: impl Into<Expr>,
    z: impl Into<Expr>,
    w: impl Into<Expr>,
) -> Expr {
    Expr::new(ExprKind::Construct(
        Ty::Vec4,
        vec![x.into(), y.into(), z.into(), w.into()],
    ))
}

impl<R: Into<Expr>> std::ops::Add<R> for Expr {
    type Output = Expr;
    fn add(self, rhs: R) -> Expr {
        self.binary(BinaryOp::Add, rhs)
    }
}

impl<R: Into<Expr>> std::ops::Sub<R> for Expr {
    type Output = Expr;
    fn sub(self, rhs: R) -> Expr {
        self.binary(BinaryOp::Sub, rhs)
    }
}

impl<R: Into<Expr>> std::ops::Mul<R> for Expr {
    type Output = Expr;
    fn mul(self, rhs: R) -> Expr {
        self.binary(BinaryOp::Mul, rhs)
    }
}

impl<R: Into<Expr>> std::ops::Div<R> for Expr {
    type Output = Expr;
    fn div(self, rhs: R) -> Expr {
        self.binary(BinaryOp::Div, rhs)
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.unary(UnaryOp::Neg)
    }
}
