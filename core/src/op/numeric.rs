//! The numeric tower.
//!
//! Every numeric kind has a rank in `Int < Long < Single < Double`. A binary
//! operation widens both operands to the higher rank and computes once, in
//! one generic routine, so the promotion rule and the division/modulus rules
//! exist in a single place for all four representations.

use std::cmp::Ordering;

use crate::rt::{ExecContext, Outcome};
use crate::val::{TypeTag, Value};

use super::{BinOp, UnaryOp};

/// Promotion rank of a numeric kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericClass {
    Int,
    Long,
    Single,
    Double,
}

pub struct NumericTower;

impl NumericTower {
    /// Classify a value into the tower if it is numeric. Lazy values must be
    /// forced by the caller.
    pub fn classify(value: &Value) -> Option<NumericClass> {
        match value {
            Value::Int(_) => Some(NumericClass::Int),
            Value::Long(_) => Some(NumericClass::Long),
            Value::Single(_) => Some(NumericClass::Single),
            Value::Double(_) => Some(NumericClass::Double),
            _ => None,
        }
    }

    pub fn classify_tag(tag: TypeTag) -> Option<NumericClass> {
        match tag {
            TypeTag::Int => Some(NumericClass::Int),
            TypeTag::Long => Some(NumericClass::Long),
            TypeTag::Single => Some(NumericClass::Single),
            TypeTag::Double => Some(NumericClass::Double),
            _ => None,
        }
    }

    /// Class both operands are computed in.
    #[inline]
    pub fn result(lhs: NumericClass, rhs: NumericClass) -> NumericClass {
        lhs.max(rhs)
    }

    pub fn to_tag(class: NumericClass) -> TypeTag {
        match class {
            NumericClass::Int => TypeTag::Int,
            NumericClass::Long => TypeTag::Long,
            NumericClass::Single => TypeTag::Single,
            NumericClass::Double => TypeTag::Double,
        }
    }

    #[inline]
    pub fn is_integral(class: NumericClass) -> bool {
        matches!(class, NumericClass::Int | NumericClass::Long)
    }
}

/// Unboxed numeric operand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Num {
    Int(i32),
    Long(i64),
    Single(f32),
    Double(f64),
}

impl Num {
    #[inline]
    pub(crate) fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Int(x) => Some(Num::Int(*x)),
            Value::Long(x) => Some(Num::Long(*x)),
            Value::Single(x) => Some(Num::Single(*x)),
            Value::Double(x) => Some(Num::Double(*x)),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn class(self) -> NumericClass {
        match self {
            Num::Int(_) => NumericClass::Int,
            Num::Long(_) => NumericClass::Long,
            Num::Single(_) => NumericClass::Single,
            Num::Double(_) => NumericClass::Double,
        }
    }

    /// Widens to `to`. Narrowing requests leave the operand unchanged.
    pub(crate) fn widen(self, to: NumericClass) -> Num {
        match (self, to) {
            (Num::Int(x), NumericClass::Long) => Num::Long(x as i64),
            (Num::Int(x), NumericClass::Single) => Num::Single(x as f32),
            (Num::Int(x), NumericClass::Double) => Num::Double(x as f64),
            (Num::Long(x), NumericClass::Single) => Num::Single(x as f32),
            (Num::Long(x), NumericClass::Double) => Num::Double(x as f64),
            (Num::Single(x), NumericClass::Double) => Num::Double(x as f64),
            (same, _) => same,
        }
    }

    #[inline]
    pub(crate) fn into_value(self) -> Value {
        match self {
            Num::Int(x) => Value::Int(x),
            Num::Long(x) => Value::Long(x),
            Num::Single(x) => Value::Single(x),
            Num::Double(x) => Value::Double(x),
        }
    }

    #[inline]
    pub(crate) fn is_zero(self) -> bool {
        match self {
            Num::Int(x) => x == 0,
            Num::Long(x) => x == 0,
            Num::Single(x) => x == 0.0,
            Num::Double(x) => x == 0.0,
        }
    }
}

/// Widens both operands to their common class.
#[inline]
pub(crate) fn promote(lhs: Num, rhs: Num) -> (Num, Num) {
    let class = NumericTower::result(lhs.class(), rhs.class());
    if lhs.class() != rhs.class() {
        tracing::trace!(
            target: "fen::op::slowpath",
            lhs = ?lhs.class(),
            rhs = ?rhs.class(),
            to = ?class,
            "numeric promotion"
        );
    }
    (lhs.widen(class), rhs.widen(class))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Mod,
    Pow,
}

impl ArithOp {
    fn from_bin(op: BinOp) -> Option<Self> {
        Some(match op {
            BinOp::Add => ArithOp::Add,
            BinOp::Sub => ArithOp::Sub,
            BinOp::Mul => ArithOp::Mul,
            BinOp::Div => ArithOp::Div,
            BinOp::Rem => ArithOp::Rem,
            BinOp::Mod => ArithOp::Mod,
            BinOp::Pow => ArithOp::Pow,
            _ => return None,
        })
    }

    #[inline]
    fn divides(self) -> bool {
        matches!(self, ArithOp::Div | ArithOp::Rem | ArithOp::Mod)
    }
}

/// Arithmetic of one numeric representation. Integer forms wrap on overflow.
pub(crate) trait Arith: Copy + PartialOrd {
    const ZERO: Self;
    const ONE: Self;
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Self;
    fn rem(self, rhs: Self) -> Self;
    fn pow(self, rhs: Self) -> Self;
    fn neg(self) -> Self;
}

macro_rules! impl_int_arith {
    ($($t:ty),*) => {$(
        impl Arith for $t {
            const ZERO: Self = 0;
            const ONE: Self = 1;
            #[inline] fn add(self, rhs: Self) -> Self { self.wrapping_add(rhs) }
            #[inline] fn sub(self, rhs: Self) -> Self { self.wrapping_sub(rhs) }
            #[inline] fn mul(self, rhs: Self) -> Self { self.wrapping_mul(rhs) }
            #[inline] fn div(self, rhs: Self) -> Self { self.wrapping_div(rhs) }
            #[inline] fn rem(self, rhs: Self) -> Self { self.wrapping_rem(rhs) }
            #[inline]
            fn pow(self, rhs: Self) -> Self {
                match u32::try_from(rhs) {
                    Ok(exp) => self.wrapping_pow(exp),
                    // exponent beyond u32 (only reachable for Long): saturate
                    Err(_) if rhs > 0 => self.wrapping_pow(u32::MAX),
                    // negative exponent: compute the reciprocal and truncate
                    Err(_) => (self as f64).powf(rhs as f64) as $t,
                }
            }
            #[inline] fn neg(self) -> Self { self.wrapping_neg() }
        }
    )*};
}

macro_rules! impl_float_arith {
    ($($t:ty),*) => {$(
        impl Arith for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
            #[inline] fn add(self, rhs: Self) -> Self { self + rhs }
            #[inline] fn sub(self, rhs: Self) -> Self { self - rhs }
            #[inline] fn mul(self, rhs: Self) -> Self { self * rhs }
            #[inline] fn div(self, rhs: Self) -> Self { self / rhs }
            #[inline] fn rem(self, rhs: Self) -> Self { self % rhs }
            #[inline] fn pow(self, rhs: Self) -> Self { self.powf(rhs) }
            #[inline] fn neg(self) -> Self { -self }
        }
    )*};
}

impl_int_arith!(i32, i64);
impl_float_arith!(f32, f64);

/// Floored modulus: the result takes the sign of the divisor.
#[inline]
pub(crate) fn floored_mod<T: Arith>(x: T, y: T) -> T {
    let r = x.rem(y);
    let signs_differ = (x < T::ZERO && y > T::ZERO) || (x > T::ZERO && y < T::ZERO);
    if signs_differ && r != T::ZERO { r.add(y) } else { r }
}

#[inline]
fn apply<T: Arith>(op: ArithOp, x: T, y: T) -> T {
    match op {
        ArithOp::Add => x.add(y),
        ArithOp::Sub => x.sub(y),
        ArithOp::Mul => x.mul(y),
        ArithOp::Div => x.div(y),
        ArithOp::Rem => x.rem(y),
        ArithOp::Mod => floored_mod(x, y),
        ArithOp::Pow => x.pow(y),
    }
}

/// Add, Subtract, Multiply, Divide, Remainder, Modulus, Power.
/// Operands must already be forced.
pub(crate) fn arithmetic(op: BinOp, lhs: &Value, rhs: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    let (Some(arith), Some(l), Some(r)) = (ArithOp::from_bin(op), Num::of(lhs), Num::of(rhs)) else {
        return Err(ctx.invalid_operand(op.name(), lhs, rhs));
    };
    let (l, r) = promote(l, r);
    // the divisor is checked after promotion and before any division runs
    if arith.divides() && r.is_zero() {
        return Err(ctx.divide_by_zero(op.name(), lhs));
    }
    let out = match (l, r) {
        (Num::Int(x), Num::Int(y)) => Num::Int(apply(arith, x, y)),
        (Num::Long(x), Num::Long(y)) => Num::Long(apply(arith, x, y)),
        (Num::Single(x), Num::Single(y)) => Num::Single(apply(arith, x, y)),
        (Num::Double(x), Num::Double(y)) => Num::Double(apply(arith, x, y)),
        _ => return Err(ctx.invalid_operand(op.name(), lhs, rhs)),
    };
    Ok(out.into_value())
}

pub(crate) trait Bits: Copy {
    fn and(self, rhs: Self) -> Self;
    fn or(self, rhs: Self) -> Self;
    fn xor(self, rhs: Self) -> Self;
    fn shl(self, rhs: Self) -> Self;
    fn shr(self, rhs: Self) -> Self;
    fn not(self) -> Self;
}

macro_rules! impl_bits {
    ($($t:ty),*) => {$(
        impl Bits for $t {
            #[inline] fn and(self, rhs: Self) -> Self { self & rhs }
            #[inline] fn or(self, rhs: Self) -> Self { self | rhs }
            #[inline] fn xor(self, rhs: Self) -> Self { self ^ rhs }
            // shift counts are masked to the bit width
            #[inline] fn shl(self, rhs: Self) -> Self { self.wrapping_shl(rhs as u32) }
            #[inline] fn shr(self, rhs: Self) -> Self { self.wrapping_shr(rhs as u32) }
            #[inline] fn not(self) -> Self { !self }
        }
    )*};
}

impl_bits!(i32, i64);

fn apply_bits<T: Bits>(op: BinOp, x: T, y: T) -> Option<T> {
    Some(match op {
        BinOp::BitAnd => x.and(y),
        BinOp::BitOr => x.or(y),
        BinOp::BitXor => x.xor(y),
        BinOp::Shl => x.shl(y),
        BinOp::Shr => x.shr(y),
        _ => return None,
    })
}

/// Bitwise And/Or/Xor and shifts, defined on the integral classes only.
pub(crate) fn bitwise(op: BinOp, lhs: &Value, rhs: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    let (Some(l), Some(r)) = (Num::of(lhs), Num::of(rhs)) else {
        return Err(ctx.invalid_operand(op.name(), lhs, rhs));
    };
    let out = match promote(l, r) {
        (Num::Int(x), Num::Int(y)) => apply_bits(op, x, y).map(Value::Int),
        (Num::Long(x), Num::Long(y)) => apply_bits(op, x, y).map(Value::Long),
        _ => None,
    };
    out.ok_or_else(|| ctx.invalid_operand(op.name(), lhs, rhs))
}

/// Ordering after promotion; `None` when a NaN is involved.
pub(crate) fn compare(lhs: Num, rhs: Num) -> Option<Ordering> {
    match promote(lhs, rhs) {
        (Num::Int(x), Num::Int(y)) => Some(x.cmp(&y)),
        (Num::Long(x), Num::Long(y)) => Some(x.cmp(&y)),
        (Num::Single(x), Num::Single(y)) => x.partial_cmp(&y),
        (Num::Double(x), Num::Double(y)) => x.partial_cmp(&y),
        _ => None,
    }
}

/// Negate, Successor, Predecessor and BitwiseNot on numeric operands.
pub(crate) fn unary(op: UnaryOp, value: &Value, ctx: &mut ExecContext) -> Outcome<Value> {
    let Some(num) = Num::of(value) else {
        return Err(ctx.invalid_unary(op.name(), value));
    };
    fn step<T: Arith>(op: UnaryOp, x: T) -> Option<T> {
        match op {
            UnaryOp::Neg => Some(x.neg()),
            UnaryOp::Succ => Some(x.add(T::ONE)),
            UnaryOp::Pred => Some(x.sub(T::ONE)),
            _ => None,
        }
    }
    let out = match (op, num) {
        (UnaryOp::BitNot, Num::Int(x)) => Some(Num::Int(x.not())),
        (UnaryOp::BitNot, Num::Long(x)) => Some(Num::Long(x.not())),
        (UnaryOp::BitNot, _) => None,
        (_, Num::Int(x)) => step(op, x).map(Num::Int),
        (_, Num::Long(x)) => step(op, x).map(Num::Long),
        (_, Num::Single(x)) => step(op, x).map(Num::Single),
        (_, Num::Double(x)) => step(op, x).map(Num::Double),
    };
    out.map(Num::into_value).ok_or_else(|| ctx.invalid_unary(op.name(), value))
}
