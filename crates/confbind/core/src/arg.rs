//! Typed argument boxes.
//!
//! An [`Arg`] wraps one scalar configuration field: a live [`Slot`] into the
//! bound struct, the default taken from the field's tag, a description, and
//! the has-been-set flag that enforces first-writer-wins during merge.

use crate::error::ConfError;
use crate::lens::{Bound, Lens};
use crate::value::Value;
use std::fmt;

/// Scalar family an argument belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Bool,
    Int,
    Uint,
    Float,
    Str,
    /// Ad hoc key created by [`Binder::set`](crate::Binder::set), not backed by a struct.
    Untyped,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgKind::Bool => "bool",
            ArgKind::Int => "int",
            ArgKind::Uint => "uint",
            ArgKind::Float => "float",
            ArgKind::Str => "string",
            ArgKind::Untyped => "untyped",
        })
    }
}

/// A live storage location holding a value of widened type `W`.
pub trait Place<W> {
    fn get(&self) -> W;

    /// Store `value`, failing without writing if it does not fit the field.
    fn set(&self, value: W) -> Result<(), ConfError>;
}

/// Field types that can back an argument.
///
/// Every integer width widens to `i64`/`u64` and every float width to `f64`;
/// narrowing back is range-checked.
pub trait Scalar: Sized + 'static {
    type Wide;
    const KIND: ArgKind;

    fn widen(&self) -> Self::Wide;
    fn narrow(wide: Self::Wide) -> Option<Self>;
    fn into_slot(place: Box<dyn Place<Self::Wide>>) -> Slot;
}

struct FieldPlace<R, V> {
    root: Bound<R>,
    lens: Lens<R, V>,
}

impl<R: 'static, V: Scalar> Place<V::Wide> for FieldPlace<R, V>
where
    V::Wide: fmt::Display + Clone,
{
    fn get(&self) -> V::Wide {
        self.lens.get(&self.root.borrow()).widen()
    }

    fn set(&self, value: V::Wide) -> Result<(), ConfError> {
        let narrowed = V::narrow(value.clone()).ok_or_else(|| {
            ConfError::invalid_value(
                V::KIND,
                &value,
                format!("out of range for {}", std::any::type_name::<V>()),
            )
        })?;
        *self.lens.get_mut(&mut self.root.borrow_mut()) = narrowed;
        Ok(())
    }
}

/// Bind the field `lens` points at inside `root` to a slot.
pub fn bind_field<R: 'static, V>(root: &Bound<R>, lens: &Lens<R, V>) -> Slot
where
    V: Scalar,
    V::Wide: fmt::Display + Clone,
{
    V::into_slot(Box::new(FieldPlace {
        root: root.clone(),
        lens: lens.clone(),
    }))
}

macro_rules! scalar_impl {
    ($kind:ident, $wide:ty, $variant:ident: $($t:ty),*) => {
        $(
            impl Scalar for $t {
                type Wide = $wide;
                const KIND: ArgKind = ArgKind::$kind;

                fn widen(&self) -> $wide {
                    <$wide>::from(*self)
                }

                fn narrow(wide: $wide) -> Option<Self> {
                    <$t>::try_from(wide).ok()
                }

                fn into_slot(place: Box<dyn Place<$wide>>) -> Slot {
                    Slot::$variant(place)
                }
            }
        )*
    };
}

scalar_impl!(Int, i64, Int: i8, i16, i32, i64);
scalar_impl!(Uint, u64, Uint: u8, u16, u32, u64);

impl Scalar for isize {
    type Wide = i64;
    const KIND: ArgKind = ArgKind::Int;

    fn widen(&self) -> i64 {
        i64::try_from(*self).unwrap_or(i64::MAX)
    }

    fn narrow(wide: i64) -> Option<Self> {
        isize::try_from(wide).ok()
    }

    fn into_slot(place: Box<dyn Place<i64>>) -> Slot {
        Slot::Int(place)
    }
}

impl Scalar for usize {
    type Wide = u64;
    const KIND: ArgKind = ArgKind::Uint;

    fn widen(&self) -> u64 {
        u64::try_from(*self).unwrap_or(u64::MAX)
    }

    fn narrow(wide: u64) -> Option<Self> {
        usize::try_from(wide).ok()
    }

    fn into_slot(place: Box<dyn Place<u64>>) -> Slot {
        Slot::Uint(place)
    }
}

impl Scalar for f64 {
    type Wide = f64;
    const KIND: ArgKind = ArgKind::Float;

    fn widen(&self) -> f64 {
        *self
    }

    fn narrow(wide: f64) -> Option<Self> {
        Some(wide)
    }

    fn into_slot(place: Box<dyn Place<f64>>) -> Slot {
        Slot::Float(place)
    }
}

impl Scalar for f32 {
    type Wide = f64;
    const KIND: ArgKind = ArgKind::Float;

    fn widen(&self) -> f64 {
        f64::from(*self)
    }

    fn narrow(wide: f64) -> Option<Self> {
        // NaN and infinities survive; finite values must fit the f32 range.
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return None;
        }
        Some(wide as f32)
    }

    fn into_slot(place: Box<dyn Place<f64>>) -> Slot {
        Slot::Float(place)
    }
}

impl Scalar for bool {
    type Wide = bool;
    const KIND: ArgKind = ArgKind::Bool;

    fn widen(&self) -> bool {
        *self
    }

    fn narrow(wide: bool) -> Option<Self> {
        Some(wide)
    }

    fn into_slot(place: Box<dyn Place<bool>>) -> Slot {
        Slot::Bool(place)
    }
}

impl Scalar for String {
    type Wide = String;
    const KIND: ArgKind = ArgKind::Str;

    fn widen(&self) -> String {
        self.clone()
    }

    fn narrow(wide: String) -> Option<Self> {
        Some(wide)
    }

    fn into_slot(place: Box<dyn Place<String>>) -> Slot {
        Slot::Str(place)
    }
}

/// Where an argument's value lives.
pub enum Slot {
    Bool(Box<dyn Place<bool>>),
    Int(Box<dyn Place<i64>>),
    Uint(Box<dyn Place<u64>>),
    Float(Box<dyn Place<f64>>),
    Str(Box<dyn Place<String>>),
    Untyped(Value),
}

impl Slot {
    pub fn kind(&self) -> ArgKind {
        match self {
            Slot::Bool(_) => ArgKind::Bool,
            Slot::Int(_) => ArgKind::Int,
            Slot::Uint(_) => ArgKind::Uint,
            Slot::Float(_) => ArgKind::Float,
            Slot::Str(_) => ArgKind::Str,
            Slot::Untyped(_) => ArgKind::Untyped,
        }
    }

    /// Read the live value.
    pub fn get(&self) -> Value {
        match self {
            Slot::Bool(p) => Value::Bool(p.get()),
            Slot::Int(p) => Value::Int(p.get()),
            Slot::Uint(p) => Value::Uint(p.get()),
            Slot::Float(p) => Value::Float(p.get()),
            Slot::Str(p) => Value::Str(p.get()),
            Slot::Untyped(v) => v.clone(),
        }
    }

    /// Coerce `value` into this slot's type and store it.
    ///
    /// Accepts the slot's native value family or its textual encoding. On
    /// failure the storage is left unchanged.
    pub fn set(&mut self, value: Value) -> Result<(), ConfError> {
        let kind = self.kind();
        match self {
            Slot::Bool(p) => match value {
                Value::Bool(b) => p.set(b),
                Value::Str(s) => match s.as_str() {
                    "true" => p.set(true),
                    "false" => p.set(false),
                    _ => Err(ConfError::invalid_value(kind, s, "expected `true` or `false`")),
                },
                other => Err(mismatch(kind, &other)),
            },
            Slot::Int(p) => match value {
                Value::Int(i) => p.set(i),
                Value::Uint(u) => {
                    let i = i64::try_from(u)
                        .map_err(|e| ConfError::invalid_value(kind, u, e))?;
                    p.set(i)
                }
                Value::Str(s) => {
                    let i = s
                        .parse::<i64>()
                        .map_err(|e| ConfError::invalid_value(kind, &s, e))?;
                    p.set(i)
                }
                other => Err(mismatch(kind, &other)),
            },
            Slot::Uint(p) => match value {
                Value::Uint(u) => p.set(u),
                Value::Int(i) => {
                    let u = u64::try_from(i)
                        .map_err(|e| ConfError::invalid_value(kind, i, e))?;
                    p.set(u)
                }
                Value::Str(s) => {
                    let u = s
                        .parse::<u64>()
                        .map_err(|e| ConfError::invalid_value(kind, &s, e))?;
                    p.set(u)
                }
                other => Err(mismatch(kind, &other)),
            },
            Slot::Float(p) => match value {
                Value::Float(f) => p.set(f),
                Value::Str(s) => {
                    let f = s
                        .parse::<f64>()
                        .map_err(|e| ConfError::invalid_value(kind, &s, e))?;
                    p.set(f)
                }
                other => Err(mismatch(kind, &other)),
            },
            Slot::Str(p) => match value {
                Value::Str(s) => p.set(s),
                other => Err(mismatch(kind, &other)),
            },
            Slot::Untyped(v) => {
                *v = value;
                Ok(())
            }
        }
    }
}

fn mismatch(kind: ArgKind, value: &Value) -> ConfError {
    ConfError::invalid_value(kind, value, "value type does not match argument")
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("kind", &self.kind())
            .field("value", &self.get())
            .finish()
    }
}

/// One configuration argument.
#[derive(Debug)]
pub struct Arg {
    slot: Slot,
    default: String,
    description: String,
    has_set: bool,
}

impl Arg {
    pub fn new(slot: Slot) -> Self {
        Self {
            slot,
            default: String::new(),
            description: String::new(),
            has_set: false,
        }
    }

    /// An argument with no struct backing, holding `value` as-is.
    pub fn untyped(value: Value) -> Self {
        Self::new(Slot::Untyped(value))
    }

    pub fn kind(&self) -> ArgKind {
        self.slot.kind()
    }

    pub fn value(&self) -> Value {
        self.slot.get()
    }

    pub fn set_value(&mut self, value: Value) -> Result<(), ConfError> {
        self.slot.set(value)
    }

    pub fn default_value(&self) -> &str {
        &self.default
    }

    pub fn set_default_value(&mut self, default: impl Into<String>) {
        self.default = default.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn has_set(&self) -> bool {
        self.has_set
    }

    pub fn mark_set(&mut self) {
        self.has_set = true;
    }
}
