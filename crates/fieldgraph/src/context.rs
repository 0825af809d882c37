//! Simulation context: named uniform slots and image grids.
//!
//! Replaces ambient global uniform objects with one explicit struct passed
//! to kernel build and dispatch. Uniforms are shared by every element within
//! a frame and mutated only by the host (controls, scheduler clock, probe);
//! kernels read them through `Expr::uniform` / `Expr::uniform_at`.

use std::collections::HashMap;

use glam::{Vec2, Vec3, Vec4};

use crate::error::GraphError;
use crate::value::{Ty, Value};

/// One uniform slot. `Vec2Array` is the mirror of the influence ring buffer
/// (fixed capacity, element access only).
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Vec2Array(Vec<Vec2>),
}

impl UniformValue {
    fn ty(&self) -> Option<Ty> {
        match self {
            UniformValue::Float(_) => Some(Ty::Float),
            UniformValue::Vec2(_) => Some(Ty::Vec2),
            UniformValue::Vec3(_) => Some(Ty::Vec3),
            UniformValue::Vec4(_) => Some(Ty::Vec4),
            UniformValue::Vec2Array(_) => None,
        }
    }
}

/// CPU-side sampleable image, the image-loader collaborator's output.
/// Sampling is nearest-texel with clamped UVs.
#[derive(Debug, Clone)]
pub struct ImageGrid {
    width: usize,
    height: usize,
    texels: Vec<Vec4>,
}

impl ImageGrid {
    pub fn new(width: usize, height: usize, texels: Vec<Vec4>) -> Result<Self, GraphError> {
        if texels.len() != width * height {
            return Err(GraphError::build(format!(
                "image grid {width}x{height} expects {} texels, got {}",
                width * height,
                texels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Builds a grid by evaluating `f` at every texel's UV center.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(Vec2) -> Vec4) -> Self {
        let mut texels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let uv = Vec2::new(
                    (x as f32 + 0.5) / width as f32,
                    (y as f32 + 0.5) / height as f32,
                );
                texels.push(f(uv));
            }
        }
        Self {
            width,
            height,
            texels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let x = ((uv.x.clamp(0.0, 1.0) * self.width as f32) as usize).min(self.width - 1);
        let y = ((uv.y.clamp(0.0, 1.0) * self.height as f32) as usize).min(self.height - 1);
        self.texels[y * self.width + x]
    }
}

/// Named uniform slots plus named image grids for one simulation.
#[derive(Debug, Default)]
pub struct SimContext {
    uniforms: HashMap<String, UniformValue>,
    images: HashMap<String, ImageGrid>,
}

impl SimContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a slot. Kernel build only accepts uniforms declared before
    /// the kernel is built.
    pub fn declare(&mut self, name: &str, value: UniformValue) -> &mut Self {
        self.uniforms.insert(name.to_string(), value);
        self
    }

    pub fn declare_image(&mut self, name: &str, image: ImageGrid) -> &mut Self {
        self.images.insert(name.to_string(), image);
        self
    }

    /// Replaces a slot's value, keeping its type. This is the whole
    /// control-panel binder surface.
    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<(), GraphError> {
        match self.uniforms.get_mut(name) {
            Some(slot) if std::mem::discriminant(slot) == std::mem::discriminant(&value) => {
                *slot = value;
                Ok(())
            }
            Some(slot) => Err(GraphError::build(format!(
                "uniform '{name}' cannot change type (holds {:?})",
                slot.ty()
            ))),
            None => Err(GraphError::build(format!("unknown uniform '{name}'"))),
        }
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<(), GraphError> {
        self.set(name, UniformValue::Float(value))
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) -> Result<(), GraphError> {
        self.set(name, UniformValue::Vec4(value))
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.uniforms.get(name) {
            Some(UniformValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn image(&self, name: &str) -> Option<&ImageGrid> {
        self.images.get(name)
    }

    /// Scalar/vector slot type for kernel type checking; `None` for arrays.
    pub(crate) fn uniform_ty(&self, name: &str) -> Option<Option<Ty>> {
        self.uniforms.get(name).map(UniformValue::ty)
    }

    pub(crate) fn uniform_value(&self, name: &str) -> Value {
        match &self.uniforms[name] {
            UniformValue::Float(v) => Value::Float(*v),
            UniformValue::Vec2(v) => Value::Vec2(*v),
            UniformValue::Vec3(v) => Value::Vec3(*v),
            UniformValue::Vec4(v) => Value::Vec4(*v),
            UniformValue::Vec2Array(_) => {
                unreachable!("array uniforms load through uniform_at")
            }
        }
    }

    pub(crate) fn uniform_element(&self, name: &str, index: usize) -> Value {
        match &self.uniforms[name] {
            UniformValue::Vec2Array(values) => values
                .get(index)
                .copied()
                .map(Value::Vec2)
                .unwrap_or(Value::Vec2(Vec2::ZERO)),
            _ => unreachable!("scalar uniforms load through uniform"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_preserves_slot_type() {
        let mut ctx = SimContext::new();
        ctx.declare("damping", UniformValue::Float(0.94));
        ctx.set_float("damping", 0.9).unwrap();
        assert_eq!(ctx.get_float("damping"), Some(0.9));
        let err = ctx.set("damping", UniformValue::Vec3(Vec3::ZERO)).unwrap_err();
        assert!(matches!(err, GraphError::GraphBuild(_)));
    }

    #[test]
    fn set_unknown_uniform_fails() {
        let mut ctx = SimContext::new();
        assert!(ctx.set_float("missing", 1.0).is_err());
    }

    #[test]
    fn image_sampling_is_nearest_with_clamp() {
        let image = ImageGrid::from_fn(2, 2, |uv| Vec4::new(uv.x, uv.y, 0.0, 1.0));
        let texel = image.sample(Vec2::new(0.1, 0.9));
        assert_eq!(texel, Vec4::new(0.25, 0.75, 0.0, 1.0));
        // Out-of-range UVs clamp to the border texel.
        assert_eq!(image.sample(Vec2::new(-4.0, 2.0)), image.sample(Vec2::new(0.0, 1.0)));
    }
}
