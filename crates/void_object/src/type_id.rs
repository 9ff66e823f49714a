//! Stable per-run type identifiers
//!
//! A [`TypeId`] is derived from the compiler-provided type name with FNV-1a,
//! so obtaining one costs no registration. Identifiers for `Vec<T>` are
//! derived from the element's identifier with [`TypeId::to_vector`], which
//! lets tables keep "many of T" next to "one T" without a second type.

use core::fmt;
use core::marker::PhantomData;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;
const VECTOR_SALT: u64 = 0x9e3779b97f4a7c15;
const VEC_PREFIX: &str = "alloc::vec::Vec<";

/// Opaque type identifier, stable for the lifetime of the process
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId {
    bits: u64,
}

impl TypeId {
    /// Identifier carried by a null [`Boxed`](crate::Boxed)
    pub const NULL: TypeId = TypeId { bits: 0 };

    /// Create from raw bits
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    /// Get the raw bits
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.bits
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.bits == 0
    }

    /// Identifier of `Vec<T>` given the identifier of `T`
    #[inline]
    pub const fn to_vector(self) -> TypeId {
        let mixed = (self.bits ^ VECTOR_SALT).wrapping_mul(FNV_PRIME);
        TypeId { bits: mixed.rotate_left(29) }
    }

    /// Hash a type name, folding `Vec<..>` wrappers through [`TypeId::to_vector`]
    pub fn from_type_name(name: &str) -> Self {
        match name.strip_prefix(VEC_PREFIX).and_then(|inner| inner.strip_suffix('>')) {
            Some(element) => Self::from_type_name(element).to_vector(),
            None => Self { bits: fnv1a(name) },
        }
    }
}

fn fnv1a(name: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in name.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "TypeId(null)")
        } else {
            write!(f, "TypeId({:#018x})", self.bits)
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.bits)
    }
}

impl Default for TypeId {
    fn default() -> Self {
        Self::NULL
    }
}

/// Type-level accessor: `Type::<T>::id()`
///
/// Works for unsized types, so interfaces are addressed as `Type::<dyn Shape>`.
pub struct Type<T: ?Sized>(PhantomData<fn() -> *const T>);

impl<T: ?Sized + 'static> Type<T> {
    /// Identifier of `T`
    #[inline]
    pub fn id() -> TypeId {
        TypeId::from_type_name(Self::name())
    }

    /// Full compiler-provided type name
    #[inline]
    pub fn name() -> &'static str {
        core::any::type_name::<T>()
    }

    /// Last path segment of the type name, `dyn` stripped and generics kept
    pub fn short_name() -> String {
        short_name(Self::name())
    }
}

/// Reduce `a::b::Foo<c::Bar>` to `Foo<Bar>` and `dyn a::Shape` to `Shape`
pub fn short_name(full: &str) -> String {
    let full = full.strip_prefix("dyn ").unwrap_or(full);
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        match ch {
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                out.push_str(last_segment(&segment));
                segment.clear();
                out.push(ch);
            }
            _ => segment.push(ch),
        }
    }
    out.push_str(last_segment(&segment));
    out.replace("dyn ", "")
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
