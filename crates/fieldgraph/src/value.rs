use glam::{Vec2, Vec3, Vec4};

/// Static type of an expression or runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ty {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Bool,
}

impl Ty {
    /// Number of float lanes, zero for booleans.
    pub fn lanes(self) -> usize {
        match self {
            Ty::Float => 1,
            Ty::Vec2 => 2,
            Ty::Vec3 => 3,
            Ty::Vec4 => 4,
            Ty::Bool => 0,
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Ty::Bool)
    }

    pub fn is_vector(self) -> bool {
        matches!(self, Ty::Vec2 | Ty::Vec3 | Ty::Vec4)
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Ty::Float => "float",
            Ty::Vec2 => "vec2",
            Ty::Vec3 => "vec3",
            Ty::Vec4 => "vec4",
            Ty::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Runtime value flowing through the interpreter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Bool(bool),
}

impl Value {
    pub fn ty(self) -> Ty {
        match self {
            Value::Float(_) => Ty::Float,
            Value::Vec2(_) => Ty::Vec2,
            Value::Vec3(_) => Ty::Vec3,
            Value::Vec4(_) => Ty::Vec4,
            Value::Bool(_) => Ty::Bool,
        }
    }

    pub fn zero(ty: Ty) -> Self {
        match ty {
            Ty::Float => Value::Float(0.0),
            Ty::Vec2 => Value::Vec2(Vec2::ZERO),
            Ty::Vec3 => Value::Vec3(Vec3::ZERO),
            Ty::Vec4 => Value::Vec4(Vec4::ZERO),
            Ty::Bool => Value::Bool(false),
        }
    }

    /// Flattens into float lanes; booleans become 0/1.
    pub fn lanes(self) -> Vec<f32> {
        match self {
            Value::Float(v) => vec![v],
            Value::Vec2(v) => v.to_array().to_vec(),
            Value::Vec3(v) => v.to_array().to_vec(),
            Value::Vec4(v) => v.to_array().to_vec(),
            Value::Bool(v) => vec![if v { 1.0 } else { 0.0 }],
        }
    }

    pub fn from_lanes(lanes: &[f32]) -> Self {
        match lanes {
            [x] => Value::Float(*x),
            [x, y] => Value::Vec2(Vec2::new(*x, *y)),
            [x, y, z] => Value::Vec3(Vec3::new(*x, *y, *z)),
            [x, y, z, w] => Value::Vec4(Vec4::new(*x, *y, *z, *w)),
            other => unreachable!("value must have 1-4 lanes, got {}", other.len()),
        }
    }

    pub fn as_float(self) -> f32 {
        match self {
            Value::Float(v) => v,
            other => unreachable!("expected float, got {}", other.ty()),
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Value::Bool(v) => v,
            other => unreachable!("expected bool, got {}", other.ty()),
        }
    }

    pub fn as_vec2(self) -> Vec2 {
        match self {
            Value::Vec2(v) => v,
            other => unreachable!("expected vec2, got {}", other.ty()),
        }
    }

    pub fn as_vec3(self) -> Vec3 {
        match self {
            Value::Vec3(v) => v,
            other => unreachable!("expected vec3, got {}", other.ty()),
        }
    }

    pub fn as_vec4(self) -> Vec4 {
        match self {
            Value::Vec4(v) => v,
            other => unreachable!("expected vec4, got {}", other.ty()),
        }
    }

    /// Applies `f` lane-wise, broadcasting a scalar operand over the other
    /// side's lanes. Both operands numeric; type agreement is checked at
    /// kernel build time.
    pub fn zip(self, other: Value, f: impl Fn(f32, f32) -> f32) -> Value {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => Value::Float(f(a, b)),
            (Value::Float(a), b) => {
                let lanes: Vec<f32> = b.lanes().iter().map(|&x| f(a, x)).collect();
                Value::from_lanes(&lanes)
            }
            (a, Value::Float(b)) => {
                let lanes: Vec<f32> = a.lanes().iter().map(|&x| f(x, b)).collect();
                Value::from_lanes(&lanes)
            }
            (a, b) => {
                let lanes: Vec<f32> = a
                    .lanes()
                    .iter()
                    .zip(b.lanes().iter())
                    .map(|(&x, &y)| f(x, y))
                    .collect();
                Value::from_lanes(&lanes)
            }
        }
    }

    /// Applies `f` to every lane.
    pub fn map(self, f: impl Fn(f32) -> f32) -> Value {
        let lanes: Vec<f32> = self.lanes().iter().map(|&x| f(x)).collect();
        Value::from_lanes(&lanes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_broadcasts_over_vector() {
        let v = Value::Vec3(Vec3::new(1.0, 2.0, 3.0));
        let doubled = Value::Float(2.0).zip(v, |a, b| a * b);
        assert_eq!(doubled, Value::Vec3(Vec3::new(2.0, 4.0, 6.0)));
    }

    #[test]
    fn lanes_round_trip() {
        let v = Value::Vec4(Vec4::new(0.5, -1.0, 2.0, 9.0));
        assert_eq!(Value::from_lanes(&v.lanes()), v);
    }
}
