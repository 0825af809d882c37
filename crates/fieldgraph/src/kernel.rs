//! Kernel build and dispatch.
//!
//! A [`KernelBuilder`] accumulates statements (assignments, locals,
//! conditionals, bounded loops) and validates the finished graph against the
//! store and context that the kernel will run over: unknown buffers,
//! uniforms, or images and type mismatches fail with `GraphBuildError`
//! before the kernel ever executes.
//!
//! Dispatch interprets the graph once per element. Buffers named in the
//! effect set are snapshotted at dispatch start: an invocation sees its own
//! earlier writes, while reads of *other* elements observe pre-dispatch
//! state, so the result is independent of element execution order. Scatter
//! writes do not exist; an assignment always targets the current element.

use crate::context::SimContext;
use crate::error::GraphError;
use crate::expr::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::noise::{noise3, noise3_vec3};
use crate::store::{value_from_lanes, BufferHandle, StateBufferStore};
use crate::value::{Ty, Value};
use glam::Vec3;

#[derive(Debug, Clone)]
pub(crate) enum Stmt {
    Let(usize, Expr),
    /// Write the whole element, or a single lane of it.
    Assign(BufferHandle, Option<usize>, Expr),
    If(Expr, Vec<Stmt>),
    /// Trip count is evaluated once per invocation, before the first
    /// iteration; the counter is exposed to the body as a float.
    Loop(Expr, Vec<Stmt>),
}

/// A built per-element transformation: statements, effect set, and the
/// arity it was built for.
#[derive(Debug, Clone)]
pub struct Kernel {
    name: String,
    stmts: Vec<Stmt>,
    writes: Vec<BufferHandle>,
    arity: usize,
    locals: usize,
}

impl Kernel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Buffers this kernel writes.
    pub fn effects(&self) -> &[BufferHandle] {
        &self.writes
    }

    /// Runs the kernel over every element of `store`.
    pub fn dispatch(
        &self,
        store: &mut StateBufferStore,
        ctx: &SimContext,
    ) -> Result<(), GraphError> {
        if self.arity != store.element_count() {
            return Err(GraphError::ArityMismatch {
                kernel: self.name.clone(),
                arity: self.arity,
                elements: store.element_count(),
            });
        }
        let prev: Vec<(BufferHandle, Vec<f32>)> = self
            .writes
            .iter()
            .map(|&handle| (handle, store.snapshot(handle)))
            .collect();
        let mut locals = vec![None; self.locals];
        let mut loops = Vec::new();
        for index in 0..store.element_count() {
            locals.iter_mut().for_each(|slot| *slot = None);
            exec_block(&self.stmts, index, store, &prev, ctx, &mut locals, &mut loops);
        }
        Ok(())
    }
}

/// Fluent builder for one kernel.
pub struct KernelBuilder {
    name: String,
    blocks: Vec<Vec<Stmt>>,
    locals: usize,
    loop_depth: u8,
}

impl KernelBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            blocks: vec![Vec::new()],
            locals: 0,
            loop_depth: 0,
        }
    }

    fn push(&mut self, stmt: Stmt) {
        self.blocks
            .last_mut()
            .expect("builder always has an open block")
            .push(stmt);
    }

    /// Declares a per-invocation local and returns an expression loading it.
    pub fn local(&mut self, value: impl Into<Expr>) -> Expr {
        let id = self.locals;
        self.locals += 1;
        self.push(Stmt::Let(id, value.into()));
        Expr::new(ExprKind::Local(id))
    }

    /// Overwrites the current element of `buffer`.
    pub fn assign(&mut self, buffer: BufferHandle, value: impl Into<Expr>) {
        self.push(Stmt::Assign(buffer, None, value.into()));
    }

    fn assign_lane(&mut self, buffer: BufferHandle, lane: usize, value: impl Into<Expr>) {
        self.push(Stmt::Assign(buffer, Some(lane), value.into()));
    }

    pub fn assign_x(&mut self, buffer: BufferHandle, value: impl Into<Expr>) {
        self.assign_lane(buffer, 0, value);
    }

    pub fn assign_y(&mut self, buffer: BufferHandle, value: impl Into<Expr>) {
        self.assign_lane(buffer, 1, value);
    }

    pub fn assign_z(&mut self, buffer: BufferHandle, value: impl Into<Expr>) {
        self.assign_lane(buffer, 2, value);
    }

    pub fn add_assign(&mut self, buffer: BufferHandle, value: impl Into<Expr>) {
        self.assign(buffer, Expr::element(buffer) + value.into());
    }

    pub fn sub_assign(&mut self, buffer: BufferHandle, value: impl Into<Expr>) {
        self.assign(buffer, Expr::element(buffer) - value.into());
    }

    pub fn mul_assign(&mut self, buffer: BufferHandle, value: impl Into<Expr>) {
        self.assign(buffer, Expr::element(buffer) * value.into());
    }

    /// Statements emitted inside `body` run only when `cond` holds for the
    /// element; otherwise they have no effect.
    pub fn if_then(&mut self, cond: impl Into<Expr>, body: impl FnOnce(&mut Self)) {
        self.blocks.push(Vec::new());
        body(self);
        let stmts = self.blocks.pop().expect("if block was just pushed");
        self.push(Stmt::If(cond.into(), stmts));
    }

    /// Bounded loop. `count` may reference a uniform (a dynamic trip count,
    /// re-read each invocation, not each iteration); the body receives the
    /// iteration counter as a float expression.
    pub fn repeat(&mut self, count: impl Into<Expr>, body: impl FnOnce(&mut Self, Expr)) {
        let counter = Expr::new(ExprKind::LoopVar(self.loop_depth));
        self.loop_depth += 1;
        self.blocks.push(Vec::new());
        body(self, counter);
        let stmts = self.blocks.pop().expect("loop block was just pushed");
        self.loop_depth -= 1;
        self.push(Stmt::Loop(count.into(), stmts));
    }

    /// Validates the graph against `store` and `ctx` and produces a kernel
    /// whose arity is the store's element count.
    pub fn build(
        mut self,
        store: &StateBufferStore,
        ctx: &SimContext,
    ) -> Result<Kernel, GraphError> {
        let stmts = self.blocks.pop().expect("builder always has an open block");
        if !self.blocks.is_empty() {
            return Err(GraphError::build(format!(
                "kernel '{}' has an unclosed block",
                self.name
            )));
        }
        let mut checker = Checker {
            kernel: &self.name,
            store,
            ctx,
            local_types: vec![None; self.locals],
            loop_depth: 0,
            writes: Vec::new(),
        };
        checker.check_block(&stmts)?;
        let writes = checker.writes;
        Ok(Kernel {
            name: self.name,
            stmts,
            writes,
            arity: store.element_count(),
            locals: self.locals,
        })
    }
}

struct Checker<'a> {
    kernel: &'a str,
    store: &'a StateBufferStore,
    ctx: &'a SimContext,
    local_types: Vec<Option<Ty>>,
    loop_depth: u8,
    writes: Vec<BufferHandle>,
}

impl Checker<'_> {
    fn fail(&self, message: impl std::fmt::Display) -> GraphError {
        GraphError::build(format!("kernel '{}': {message}", self.kernel))
    }

    fn check_block(&mut self, stmts: &[Stmt]) -> Result<(), GraphError> {
        // Locals declared inside a block stay out of scope after it closes;
        // a conditional initialisation must not leak.
        let visible = self.local_types.clone();
        for stmt in stmts {
            match stmt {
                Stmt::Let(id, value) => {
                    let ty = self.infer(value)?;
                    self.local_types[*id] = Some(ty);
                }
                Stmt::Assign(buffer, lane, value) => {
                    self.check_assign(*buffer, *lane, value)?;
                }
                Stmt::If(cond, body) => {
                    if self.infer(cond)? != Ty::Bool {
                        return Err(self.fail("if condition must be a bool"));
                    }
                    self.check_block(body)?;
                }
                Stmt::Loop(count, body) => {
                    if self.infer(count)? != Ty::Float {
                        return Err(self.fail("loop count must be a float"));
                    }
                    self.loop_depth += 1;
                    self.check_block(body)?;
                    self.loop_depth -= 1;
                }
            }
        }
        self.local_types = visible;
        Ok(())
    }

    fn check_assign(
        &mut self,
        buffer: BufferHandle,
        lane: Option<usize>,
        value: &Expr,
    ) -> Result<(), GraphError> {
        if !self.store.contains(buffer) {
            return Err(self.fail("assignment to a buffer outside this store"));
        }
        let width = self.store.width(buffer);
        let value_ty = self.infer(value)?;
        match lane {
            Some(lane) => {
                if lane >= width.lanes() {
                    return Err(self.fail(format!(
                        "component {lane} out of range for buffer '{}'",
                        self.store.name(buffer)
                    )));
                }
                if value_ty != Ty::Float {
                    return Err(self.fail(format!(
                        "component write to '{}' needs a float, got {value_ty}",
                        self.store.name(buffer)
                    )));
                }
            }
            None => {
                if value_ty != width.ty() {
                    return Err(self.fail(format!(
                        "buffer '{}' holds {}, cannot assign {value_ty}",
                        self.store.name(buffer),
                        width.ty()
                    )));
                }
            }
        }
        if !self.writes.contains(&buffer) {
            self.writes.push(buffer);
        }
        Ok(())
    }

    fn infer(&self, expr: &Expr) -> Result<Ty, GraphError> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.ty()),
            ExprKind::Index => Ok(Ty::Float),
            ExprKind::LoopVar(depth) => {
                if *depth >= self.loop_depth {
                    return Err(self.fail("loop counter used outside its loop"));
                }
                Ok(Ty::Float)
            }
            ExprKind::Local(id) => self.local_types[*id]
                .ok_or_else(|| self.fail("local read before initialisation")),
            ExprKind::Buffer(handle) => {
                if !self.store.contains(*handle) {
                    return Err(self.fail("load from a buffer outside this store"));
                }
                Ok(self.store.width(*handle).ty())
            }
            ExprKind::BufferAt(handle, index) => {
                if !self.store.contains(*handle) {
                    return Err(self.fail("load from a buffer outside this store"));
                }
                self.expect(index, Ty::Float, "buffer index")?;
                Ok(self.store.width(*handle).ty())
            }
            ExprKind::Uniform(name) => match self.ctx.uniform_ty(name) {
                None => Err(self.fail(format!("undeclared uniform '{name}'"))),
                Some(None) => Err(self.fail(format!(
                    "array uniform '{name}' must be loaded by element"
                ))),
                Some(Some(ty)) => Ok(ty),
            },
            ExprKind::UniformAt(name, index) => match self.ctx.uniform_ty(name) {
                None => Err(self.fail(format!("undeclared uniform '{name}'"))),
                Some(Some(_)) => Err(self.fail(format!(
                    "uniform '{name}' is not an array"
                ))),
                Some(None) => {
                    self.expect(index, Ty::Float, "array index")?;
                    Ok(Ty::Vec2)
                }
            },
            ExprKind::Swizzle(arg, swizzle) => {
                let arg_ty = self.infer(arg)?;
                let needed = swizzle.lanes().iter().max().copied().unwrap_or(0);
                if !arg_ty.is_vector() || needed >= arg_ty.lanes() {
                    return Err(self.fail(format!("cannot swizzle {arg_ty}")));
                }
                Ok(swizzle.ty())
            }
            ExprKind::Construct(ty, parts) => {
                let mut lanes = 0;
                for part in parts {
                    let part_ty = self.infer(part)?;
                    if !part_ty.is_numeric() {
                        return Err(self.fail("vector parts must be numeric"));
                    }
                    lanes += part_ty.lanes();
                }
                if lanes != ty.lanes() {
                    return Err(self.fail(format!(
                        "{ty} construction needs {} lanes, got {lanes}",
                        ty.lanes()
                    )));
                }
                Ok(*ty)
            }
            ExprKind::Unary(op, arg) => self.infer_unary(*op, arg),
            ExprKind::Binary(op, lhs, rhs) => self.infer_binary(*op, lhs, rhs),
            ExprKind::Clamp(value, lo, hi) => {
                let ty = self.numeric(value, "clamp value")?;
                self.broadcastable(lo, ty, "clamp low bound")?;
                self.broadcastable(hi, ty, "clamp high bound")?;
                Ok(ty)
            }
            ExprKind::Mix(a, b, t) => {
                let ty = self.numeric(a, "mix operand")?;
                let b_ty = self.infer(b)?;
                if b_ty != ty {
                    return Err(self.fail(format!("mix operands differ: {ty} vs {b_ty}")));
                }
                self.broadcastable(t, ty, "mix factor")?;
                Ok(ty)
            }
            ExprKind::Remap(parts) => {
                let ty = self.numeric(&parts[0], "remap value")?;
                for bound in &parts[1..] {
                    self.expect(bound, Ty::Float, "remap bound")?;
                }
                Ok(ty)
            }
            ExprKind::Noise(p) => {
                self.expect(p, Ty::Vec3, "noise coordinate")?;
                Ok(Ty::Float)
            }
            ExprKind::NoiseVec3(p) => {
                self.expect(p, Ty::Vec3, "noise coordinate")?;
                Ok(Ty::Vec3)
            }
            ExprKind::Sample(image, uv) => {
                if self.ctx.image(image).is_none() {
                    return Err(self.fail(format!("undeclared image '{image}'")));
                }
                self.expect(uv, Ty::Vec2, "sample uv")?;
                Ok(Ty::Vec4)
            }
        }
    }

    fn infer_unary(&self, op: UnaryOp, arg: &Expr) -> Result<Ty, GraphError> {
        let ty = self.infer(arg)?;
        match op {
            UnaryOp::Neg
            | UnaryOp::Abs
            | UnaryOp::Floor
            | UnaryOp::Sqrt
            | UnaryOp::Sin
            | UnaryOp::Cos
            | UnaryOp::Saturate
            | UnaryOp::OneMinus => {
                if !ty.is_numeric() {
                    return Err(self.fail(format!("cannot apply {op:?} to {ty}")));
                }
                Ok(ty)
            }
            UnaryOp::Length => {
                if !ty.is_vector() {
                    return Err(self.fail(format!("length needs a vector, got {ty}")));
                }
                Ok(Ty::Float)
            }
            UnaryOp::Normalize => {
                if !ty.is_vector() {
                    return Err(self.fail(format!("normalize needs a vector, got {ty}")));
                }
                Ok(ty)
            }
            UnaryOp::Luminance => {
                if ty != Ty::Vec3 {
                    return Err(self.fail(format!("luminance needs a vec3, got {ty}")));
                }
                Ok(Ty::Float)
            }
        }
    }

    fn infer_binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Ty, GraphError> {
        let lhs_ty = self.infer(lhs)?;
        let rhs_ty = self.infer(rhs)?;
        match op {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Min
            | BinaryOp::Max
            | BinaryOp::Pow
            | BinaryOp::Step => {
                if !lhs_ty.is_numeric() || !rhs_ty.is_numeric() {
                    return Err(self.fail(format!("cannot apply {op:?} to {lhs_ty} and {rhs_ty}")));
                }
                match (lhs_ty, rhs_ty) {
                    (a, b) if a == b => Ok(a),
                    (Ty::Float, b) => Ok(b),
                    (a, Ty::Float) => Ok(a),
                    (a, b) => Err(self.fail(format!("operand widths differ: {a} vs {b}"))),
                }
            }
            BinaryOp::Dot | BinaryOp::Distance => {
                if !lhs_ty.is_vector() || lhs_ty != rhs_ty {
                    return Err(self.fail(format!(
                        "{op:?} needs matching vectors, got {lhs_ty} and {rhs_ty}"
                    )));
                }
                Ok(Ty::Float)
            }
            BinaryOp::Less
            | BinaryOp::LessEq
            | BinaryOp::Greater
            | BinaryOp::GreaterEq
            | BinaryOp::Eq => {
                if lhs_ty != Ty::Float || rhs_ty != Ty::Float {
                    return Err(self.fail(format!(
                        "{op:?} compares floats, got {lhs_ty} and {rhs_ty}"
                    )));
                }
                Ok(Ty::Bool)
            }
            BinaryOp::And | BinaryOp::Or => {
                if lhs_ty != Ty::Bool || rhs_ty != Ty::Bool {
                    return Err(self.fail(format!(
                        "{op:?} combines bools, got {lhs_ty} and {rhs_ty}"
                    )));
                }
                Ok(Ty::Bool)
            }
        }
    }

    fn numeric(&self, expr: &Expr, what: &str) -> Result<Ty, GraphError> {
        let ty = self.infer(expr)?;
        if !ty.is_numeric() {
            return Err(self.fail(format!("{what} must be numeric, got {ty}")));
        }
        Ok(ty)
    }

    fn broadcastable(&self, expr: &Expr, target: Ty, what: &str) -> Result<(), GraphError> {
        let ty = self.infer(expr)?;
        if ty != target && ty != Ty::Float {
            return Err(self.fail(format!("{what} must be {target} or float, got {ty}")));
        }
        Ok(())
    }

    fn expect(&self, expr: &Expr, ty: Ty, what: &str) -> Result<(), GraphError> {
        let found = self.infer(expr)?;
        if found != ty {
            return Err(self.fail(format!("{what} must be {ty}, got {found}")));
        }
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn exec_block(
    stmts: &[Stmt],
    index: usize,
    store: &mut StateBufferStore,
    prev: &[(BufferHandle, Vec<f32>)],
    ctx: &SimContext,
    locals: &mut Vec<Option<Value>>,
    loops: &mut Vec<f32>,
) {
    for stmt in stmts {
        match stmt {
            Stmt::Let(id, value) => {
                locals[*id] = Some(eval(value, index, store, prev, ctx, locals, loops));
            }
            Stmt::Assign(buffer, lane, value) => {
                let value = eval(value, index, store, prev, ctx, locals, loops);
                match lane {
                    Some(lane) => store.set_lane(*buffer, index, *lane, value.as_float()),
                    None => store.set_value(*buffer, index, value),
                }
            }
            Stmt::If(cond, body) => {
                if eval(cond, index, store, prev, ctx, locals, loops).as_bool() {
                    exec_block(body, index, store, prev, ctx, locals, loops);
                }
            }
            Stmt::Loop(count, body) => {
                let trips = eval(count, index, store, prev, ctx, locals, loops)
                    .as_float()
                    .max(0.0) as usize;
                for trip in 0..trips {
                    loops.push(trip as f32);
                    exec_block(body, index, store, prev, ctx, locals, loops);
                    loops.pop();
                }
            }
        }
    }
}

fn read_element(
    handle: BufferHandle,
    element: usize,
    index: usize,
    store: &StateBufferStore,
    prev: &[(BufferHandle, Vec<f32>)],
) -> Value {
    if element != index {
        if let Some((_, snapshot)) = prev.iter().find(|(h, _)| *h == handle) {
            return value_from_lanes(snapshot, store.width(handle), element);
        }
    }
    store.value(handle, element)
}

fn eval(
    expr: &Expr,
    index: usize,
    store: &StateBufferStore,
    prev: &[(BufferHandle, Vec<f32>)],
    ctx: &SimContext,
    locals: &[Option<Value>],
    loops: &[f32],
) -> Value {
    let eval = |e: &Expr| eval(e, index, store, prev, ctx, locals, loops);
    match &expr.kind {
        ExprKind::Literal(value) => *value,
        ExprKind::Index => Value::Float(index as f32),
        ExprKind::LoopVar(depth) => Value::Float(loops[*depth as usize]),
        ExprKind::Local(id) => match locals[*id] {
            Some(value) => value,
            None => unreachable!("local read before initialisation"),
        },
        ExprKind::Buffer(handle) => store.value(*handle, index),
        ExprKind::BufferAt(handle, at) => {
            let max = store.element_count().saturating_sub(1) as f32;
            let element = eval(at).as_float().floor().clamp(0.0, max) as usize;
            read_element(*handle, element, index, store, prev)
        }
        ExprKind::Uniform(name) => ctx.uniform_value(name),
        ExprKind::UniformAt(name, at) => {
            let element = eval(at).as_float().floor().max(0.0) as usize;
            ctx.uniform_element(name, element)
        }
        ExprKind::Swizzle(arg, swizzle) => {
            let lanes = eval(arg).lanes();
            let picked: Vec<f32> = swizzle.lanes().iter().map(|&lane| lanes[lane]).collect();
            Value::from_lanes(&picked)
        }
        ExprKind::Construct(_, parts) => {
            let lanes: Vec<f32> = parts.iter().flat_map(|part| eval(part).lanes()).collect();
            Value::from_lanes(&lanes)
        }
        ExprKind::Unary(op, arg) => eval_unary(*op, eval(arg)),
        ExprKind::Binary(op, lhs, rhs) => eval_binary(*op, eval(lhs), eval(rhs)),
        ExprKind::Clamp(value, lo, hi) => eval(value)
            .zip(eval(lo), f32::max)
            .zip(eval(hi), f32::min),
        ExprKind::Mix(a, b, t) => {
            let (a, b, t) = (eval(a), eval(b), eval(t));
            let delta = b.zip(a, |b, a| b - a);
            a.zip(delta.zip(t, |d, t| d * t), |a, dt| a + dt)
        }
        ExprKind::Remap(parts) => {
            let value = eval(&parts[0]);
            let in_lo = eval(&parts[1]).as_float();
            let in_hi = eval(&parts[2]).as_float();
            let out_lo = eval(&parts[3]).as_float();
            let out_hi = eval(&parts[4]).as_float();
            value.map(|v| out_lo + (v - in_lo) / (in_hi - in_lo) * (out_hi - out_lo))
        }
        ExprKind::Noise(p) => Value::Float(noise3(eval(p).as_vec3())),
        ExprKind::NoiseVec3(p) => Value::Vec3(noise3_vec3(eval(p).as_vec3())),
        ExprKind::Sample(image, uv) => match ctx.image(image) {
            Some(grid) => Value::Vec4(grid.sample(eval(uv).as_vec2())),
            None => unreachable!("image presence checked at build"),
        },
    }
}

fn eval_unary(op: UnaryOp, arg: Value) -> Value {
    match op {
        UnaryOp::Neg => arg.map(|v| -v),
        UnaryOp::Abs => arg.map(f32::abs),
        UnaryOp::Floor => arg.map(f32::floor),
        UnaryOp::Sqrt => arg.map(f32::sqrt),
        UnaryOp::Sin => arg.map(f32::sin),
        UnaryOp::Cos => arg.map(f32::cos),
        UnaryOp::Saturate => arg.map(|v| v.clamp(0.0, 1.0)),
        UnaryOp::OneMinus => arg.map(|v| 1.0 - v),
        UnaryOp::Length => Value::Float(length_of(arg)),
        UnaryOp::Normalize => match arg {
            Value::Vec2(v) => Value::Vec2(v.normalize_or_zero()),
            Value::Vec3(v) => Value::Vec3(v.normalize_or_zero()),
            Value::Vec4(v) => Value::Vec4(v.normalize_or_zero()),
            other => unreachable!("normalize of {}", other.ty()),
        },
        UnaryOp::Luminance => {
            Value::Float(arg.as_vec3().dot(Vec3::new(0.2126, 0.7152, 0.0722)))
        }
    }
}

fn length_of(value: Value) -> f32 {
    match value {
        Value::Vec2(v) => v.length(),
        Value::Vec3(v) => v.length(),
        Value::Vec4(v) => v.length(),
        other => unreachable!("length of {}", other.ty()),
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
    match op {
        BinaryOp::Add => lhs.zip(rhs, |a, b| a + b),
        BinaryOp::Sub => lhs.zip(rhs, |a, b| a - b),
        BinaryOp::Mul => lhs.zip(rhs, |a, b| a * b),
        BinaryOp::Div => lhs.zip(rhs, |a, b| a / b),
        BinaryOp::Mod => lhs.zip(rhs, f32::rem_euclid),
        BinaryOp::Min => lhs.zip(rhs, f32::min),
        BinaryOp::Max => lhs.zip(rhs, f32::max),
        BinaryOp::Pow => lhs.zip(rhs, f32::powf),
        BinaryOp::Step => lhs.zip(rhs, |edge, x| if x < edge { 0.0 } else { 1.0 }),
        BinaryOp::Dot => match (lhs, rhs) {
            (Value::Vec2(a), Value::Vec2(b)) => Value::Float(a.dot(b)),
            (Value::Vec3(a), Value::Vec3(b)) => Value::Float(a.dot(b)),
            (Value::Vec4(a), Value::Vec4(b)) => Value::Float(a.dot(b)),
            (a, b) => unreachable!("dot of {} and {}", a.ty(), b.ty()),
        },
        BinaryOp::Distance => Value::Float(length_of(lhs.zip(rhs, |a, b| a - b))),
        BinaryOp::Less => Value::Bool(lhs.as_float() < rhs.as_float()),
        BinaryOp::LessEq => Value::Bool(lhs.as_float() <= rhs.as_float()),
        BinaryOp::Greater => Value::Bool(lhs.as_float() > rhs.as_float()),
        BinaryOp::GreaterEq => Value::Bool(lhs.as_float() >= rhs.as_float()),
        BinaryOp::Eq => Value::Bool(lhs.as_float() == rhs.as_float()),
        BinaryOp::And => Value::Bool(lhs.as_bool() && rhs.as_bool()),
        BinaryOp::Or => Value::Bool(lhs.as_bool() || rhs.as_bool()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UniformValue;
    use crate::expr::vec2;
    use crate::store::ComponentWidth;
    use glam::Vec2;

    fn store_of(count: usize) -> StateBufferStore {
        StateBufferStore::new(count)
    }

    #[test]
    fn undeclared_uniform_fails_build() {
        let mut store = store_of(4);
        let progress = store.allocate("progress", ComponentWidth::Scalar, 4).unwrap();
        let ctx = SimContext::new();
        let mut builder = KernelBuilder::new("update");
        builder.assign(progress, Expr::uniform("missing"));
        let err = builder.build(&store, &ctx).unwrap_err();
        assert!(matches!(err, GraphError::GraphBuild(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn type_mismatch_fails_build() {
        let mut store = store_of(4);
        let position = store.allocate("position", ComponentWidth::Vec3, 4).unwrap();
        let ctx = SimContext::new();
        let mut builder = KernelBuilder::new("update");
        builder.assign(position, Expr::from(1.0));
        assert!(builder.build(&store, &ctx).is_err());
    }

    #[test]
    fn dispatch_against_wrong_store_fails() {
        let mut store = store_of(4);
        let progress = store.allocate("progress", ComponentWidth::Scalar, 4).unwrap();
        let ctx = SimContext::new();
        let mut builder = KernelBuilder::new("update");
        builder.assign(progress, Expr::element(progress) + 1.0);
        let kernel = builder.build(&store, &ctx).unwrap();

        let mut other = store_of(8);
        other.allocate("progress", ComponentWidth::Scalar, 8).unwrap();
        let err = kernel.dispatch(&mut other, &ctx).unwrap_err();
        assert!(matches!(
            err,
            GraphError::ArityMismatch { arity: 4, elements: 8, .. }
        ));
    }

    #[test]
    fn effect_set_lists_written_buffers_once() {
        let mut store = store_of(2);
        let a = store.allocate("a", ComponentWidth::Scalar, 2).unwrap();
        let b = store.allocate("b", ComponentWidth::Scalar, 2).unwrap();
        let ctx = SimContext::new();
        let mut builder = KernelBuilder::new("update");
        builder.assign(a, Expr::from(1.0));
        builder.assign(a, Expr::from(2.0));
        builder.assign(b, Expr::element(a));
        let kernel = builder.build(&store, &ctx).unwrap();
        assert_eq!(kernel.effects(), &[a, b]);
    }

    #[test]
    fn gather_reads_observe_pre_dispatch_state() {
        // Each element reads its right neighbour while every element is
        // being overwritten: the read must see the snapshot, so the result
        // is order-independent.
        let mut store = store_of(3);
        let value = store.allocate("value", ComponentWidth::Scalar, 3).unwrap();
        store.seed(value, &[10.0, 20.0, 30.0]).unwrap();
        let ctx = SimContext::new();
        let mut builder = KernelBuilder::new("shift");
        let neighbour = Expr::element_at(value, Expr::index() + 1.0);
        builder.assign(value, neighbour);
        let kernel = builder.build(&store, &ctx).unwrap();
        kernel.dispatch(&mut store, &ctx).unwrap();
        // Last element clamps to itself and must see its own old value.
        assert_eq!(store.attribute_view(value), &[20.0, 30.0, 30.0]);
    }

    #[test]
    fn invocation_sees_its_own_writes() {
        let mut store = store_of(2);
        let value = store.allocate("value", ComponentWidth::Scalar, 2).unwrap();
        let ctx = SimContext::new();
        let mut builder = KernelBuilder::new("twice");
        builder.assign(value, Expr::from(5.0));
        builder.add_assign(value, 2.0);
        let kernel = builder.build(&store, &ctx).unwrap();
        kernel.dispatch(&mut store, &ctx).unwrap();
        assert_eq!(store.attribute_view(value), &[7.0, 7.0]);
    }

    #[test]
    fn if_without_match_has_no_effect() {
        let mut store = store_of(2);
        let value = store.allocate("value", ComponentWidth::Scalar, 2).unwrap();
        store.seed(value, &[1.0, 2.0]).unwrap();
        let ctx = SimContext::new();
        let mut builder = KernelBuilder::new("gate");
        builder.if_then(Expr::index().greater_than(10.0), |b| {
            b.assign(value, Expr::from(99.0));
        });
        let kernel = builder.build(&store, &ctx).unwrap();
        kernel.dispatch(&mut store, &ctx).unwrap();
        assert_eq!(store.attribute_view(value), &[1.0, 2.0]);
    }

    #[test]
    fn loop_trip_count_comes_from_uniform() {
        let mut store = store_of(1);
        let total = store.allocate("total", ComponentWidth::Scalar, 1).unwrap();
        let mut ctx = SimContext::new();
        ctx.declare("count", UniformValue::Float(3.0));
        ctx.declare(
            "events",
            UniformValue::Vec2Array(vec![
                Vec2::new(1.0, 0.0),
                Vec2::new(2.0, 0.0),
                Vec2::new(4.0, 0.0),
                Vec2::new(100.0, 0.0),
            ]),
        );
        let mut builder = KernelBuilder::new("scan");
        builder.repeat(Expr::uniform("count"), |b, i| {
            let event = b.local(Expr::uniform_at("events", i));
            b.add_assign(total, event.x());
        });
        let kernel = builder.build(&store, &ctx).unwrap();
        kernel.dispatch(&mut store, &ctx).unwrap();
        // Only the first three slots are scanned.
        assert_eq!(store.attribute_view(total), &[7.0]);

        ctx.set_float("count", 4.0).unwrap();
        store.seed(total, &[0.0]).unwrap();
        kernel.dispatch(&mut store, &ctx).unwrap();
        assert_eq!(store.attribute_view(total), &[107.0]);
    }

    #[test]
    fn loop_counter_outside_loop_fails_build() {
        let mut store = store_of(1);
        let total = store.allocate("total", ComponentWidth::Scalar, 1).unwrap();
        let ctx = SimContext::new();
        let mut builder = KernelBuilder::new("bad");
        let mut leaked = None;
        builder.repeat(Expr::from(2.0), |_, i| {
            leaked = Some(i);
        });
        builder.assign(total, leaked.take().unwrap());
        assert!(builder.build(&store, &ctx).is_err());
    }

    #[test]
    fn component_write_touches_one_lane() {
        let mut store = store_of(2);
        let position = store.allocate("position", ComponentWidth::Vec3, 2).unwrap();
        store.seed(position, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let ctx = SimContext::new();
        let mut builder = KernelBuilder::new("lift");
        builder.assign_z(position, Expr::from(9.0));
        let kernel = builder.build(&store, &ctx).unwrap();
        kernel.dispatch(&mut store, &ctx).unwrap();
        assert_eq!(store.attribute_view(position), &[1.0, 2.0, 9.0, 4.0, 5.0, 9.0]);
    }

    #[test]
    fn sample_reads_image_grid() {
        let mut store = store_of(1);
        let color = store.allocate("color", ComponentWidth::Vec4, 1).unwrap();
        let mut ctx = SimContext::new();
        ctx.declare_image(
            "image",
            crate::context::ImageGrid::from_fn(4, 4, |uv| glam::Vec4::new(uv.x, uv.y, 0.0, 1.0)),
        );
        let mut builder = KernelBuilder::new("paint");
        builder.assign(color, Expr::sample("image", vec2(0.9, 0.1)));
        let kernel = builder.build(&store, &ctx).unwrap();
        kernel.dispatch(&mut store, &ctx).unwrap();
        assert_eq!(store.attribute_view(color), &[0.875, 0.125, 0.0, 1.0]);
    }
}
