//! Type registration
//!
//! A type enters the capability graph through its [`Implements`] impl, which
//! is almost always generated:
//!
//! ```
//! use void_object::{implements, SharedPtr};
//!
//! trait Shape: Send + Sync {
//!     fn area(&self) -> f32;
//! }
//!
//! struct Square(f32);
//!
//! impl Shape for Square {
//!     fn area(&self) -> f32 {
//!         self.0 * self.0
//!     }
//! }
//!
//! implements!(Square: dyn Shape);
//!
//! let square = SharedPtr::make(Square(2.0));
//! assert_eq!(square.cast::<dyn Shape>().area(), 4.0);
//! ```
//!
//! Registration is explicit ([`Implements::register`], or a plugin's
//! `register_classes`) or happens on first [`SharedPtr::make`]. There is no
//! unregister; registering again replaces the previous class.

use std::sync::Arc;

use crate::class::Class;
use crate::manager::ClassManager;

/// A type with a declared capability set
pub trait Implements: Send + Sync + 'static {
    /// Describe the type; does not touch any registry
    fn build_class() -> Class;

    /// Install the class in the global manager, replacing any previous one
    fn register() -> Arc<Class> {
        ClassManager::global().install::<Self>()
    }

    /// The registered class, registering it first if needed
    fn class() -> Arc<Class> {
        ClassManager::global().ensure::<Self>()
    }
}

/// Declare the interfaces of a type
///
/// `implements!(Node: dyn Shape, dyn Renderable)` implements [`Implements`]
/// for `Node` with one direct coercion per interface, in the given order.
/// Interfaces can be composed the same way: with `trait Shape: Bounded`,
/// `implements!(dyn Shape: dyn Bounded)` lets every `Shape` be cast on to
/// `Bounded`. Register such interface classes before they are queried.
#[macro_export]
macro_rules! implements {
    ($ty:ty : $($iface:ty),+ $(,)?) => {
        impl $crate::Implements for $ty {
            fn build_class() -> $crate::Class {
                $crate::ClassBuilder::<$ty>::new()
                    $(
                        .implements::<$iface>(
                            |p: ::std::sync::Arc<$ty>| -> ::std::sync::Arc<$iface> { p }
                        )
                    )+
                    .build()
            }
        }
    };
    ($ty:ty) => {
        impl $crate::Implements for $ty {
            fn build_class() -> $crate::Class {
                $crate::ClassBuilder::<$ty>::new().build()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{SharedPtr, Type};

    trait Wheel: Send + Sync {
        fn radius(&self) -> f32;
    }

    struct Cart;

    impl Wheel for Cart {
        fn radius(&self) -> f32 {
            0.5
        }
    }

    struct Barrel;

    crate::implements!(Cart: dyn Wheel);
    crate::implements!(Barrel);

    #[test]
    fn test_generated_class() {
        use super::Implements;

        let class = Cart::build_class();
        assert_eq!(class.name(), "Cart");
        assert_eq!(class.interfaces(), &[Type::<dyn Wheel>::id()]);

        let bare = Barrel::build_class();
        assert!(bare.interfaces().is_empty());
        assert!(!bare.is_anonymous());
    }

    #[test]
    fn test_make_registers_lazily() {
        let cart = SharedPtr::make(Cart);
        assert!(cart.is::<dyn Wheel>());
        assert_eq!(cart.cast::<dyn Wheel>().radius(), 0.5);
    }
}
