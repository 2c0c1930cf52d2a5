//! Shared ownership of registered structs and projections into their fields.
//!
//! A registered configuration struct is owned by a [`Bound`] handle that both
//! the caller and the binder hold. Each scalar argument reaches its field
//! through a [`Lens`] composed from the struct root down through every nested
//! struct, so reads and writes always hit the live field.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Shared handle to a registered configuration struct.
///
/// Cloning the handle is cheap; all clones see the same struct. The binder is
/// single-threaded, so the handle is neither `Send` nor `Sync`.
pub struct Bound<T>(Rc<RefCell<T>>);

impl<T> Bound<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Borrow the struct.
    ///
    /// # Panics
    /// Panics if the struct is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutably borrow the struct.
    ///
    /// # Panics
    /// Panics if the struct is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Recover the struct if this is the last handle.
    pub fn try_unwrap(self) -> Result<T, Self> {
        Rc::try_unwrap(self.0)
            .map(RefCell::into_inner)
            .map_err(Self)
    }
}

impl<T: Clone> Bound<T> {
    /// Clone the current state of the struct out of the handle.
    pub fn snapshot(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T> Clone for Bound<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> From<T> for Bound<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Bound").field(&self.0.borrow()).finish()
    }
}

type Get<R, V> = Rc<dyn Fn(&R) -> &V>;
type GetMut<R, V> = Rc<dyn Fn(&mut R) -> &mut V>;

/// Projection from a root struct `R` to one of its (possibly nested) fields `V`.
pub struct Lens<R, V> {
    get: Get<R, V>,
    get_mut: GetMut<R, V>,
}

impl<R: 'static, V: 'static> Lens<R, V> {
    pub fn new(
        get: impl Fn(&R) -> &V + 'static,
        get_mut: impl Fn(&mut R) -> &mut V + 'static,
    ) -> Self {
        Self {
            get: Rc::new(get),
            get_mut: Rc::new(get_mut),
        }
    }

    /// Compose with a lens that starts where this one ends.
    pub fn then<W: 'static>(&self, inner: Lens<V, W>) -> Lens<R, W> {
        let outer_get = Rc::clone(&self.get);
        let outer_mut = Rc::clone(&self.get_mut);
        let Lens {
            get: inner_get,
            get_mut: inner_mut,
        } = inner;
        Lens::<R, W>::new(
            move |r: &R| inner_get(outer_get(r)),
            move |r: &mut R| inner_mut(outer_mut(r)),
        )
    }

    pub fn get<'a>(&self, root: &'a R) -> &'a V {
        (self.get)(root)
    }

    pub fn get_mut<'a>(&self, root: &'a mut R) -> &'a mut V {
        (self.get_mut)(root)
    }
}

impl<R: 'static> Lens<R, R> {
    /// The lens that projects a root onto itself.
    pub fn identity() -> Self {
        Self::new(|r: &R| r, |r: &mut R| r)
    }
}

impl<R, V> Clone for Lens<R, V> {
    fn clone(&self) -> Self {
        Self {
            get: Rc::clone(&self.get),
            get_mut: Rc::clone(&self.get_mut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Inner {
        port: u16,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Outer {
        inner: Inner,
        name: String,
    }

    #[test]
    fn test_composed_lens_reaches_nested_field() {
        let to_inner = Lens::new(|o: &Outer| &o.inner, |o: &mut Outer| &mut o.inner);
        let to_port = Lens::new(|i: &Inner| &i.port, |i: &mut Inner| &mut i.port);
        let lens = Lens::<Outer, Outer>::identity().then(to_inner).then(to_port);

        let mut outer = Outer::default();
        *lens.get_mut(&mut outer) = 8080;
        assert_eq!(outer.inner.port, 8080);
        assert_eq!(*lens.get(&outer), 8080);
    }

    #[test]
    fn test_bound_clones_share_state() {
        let a = Bound::new(Outer::default());
        let b = a.clone();
        b.borrow_mut().name = "shared".into();
        assert_eq!(a.borrow().name, "shared");

        drop(b);
        let outer = a.try_unwrap().unwrap();
        assert_eq!(outer.name, "shared");
    }
}
