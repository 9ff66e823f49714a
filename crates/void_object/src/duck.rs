//! Structural fallback for capabilities outside the declared graph
//!
//! An object that cannot declare `T` (its type comes from a script, or `T`
//! was defined after the type was compiled) can still be turned into a `T`
//! by a [`Duck<T>`]: either the object's class declares `dyn Duck<T>`, or a
//! duck is attached to the instance. [`Boxed::cast`](crate::Boxed::cast)
//! consults ducks only after the declared interfaces and the attachments.

use crate::shared_ptr::SharedPtr;

/// Synthesizes a `T` on demand
pub trait Duck<T: ?Sized>: Send + Sync {
    /// Produce the capability, or a null pointer if it cannot be provided
    fn to(&self) -> SharedPtr<T>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    trait Speak: Send + Sync {
        fn speak(&self) -> String;
    }

    struct Parrot {
        word: String,
    }

    impl Speak for Parrot {
        fn speak(&self) -> String {
            self.word.clone()
        }
    }

    /// Stands in for a script object that only knows the word it repeats
    struct ScriptedParrot {
        word: &'static str,
    }

    impl Duck<dyn Speak> for ScriptedParrot {
        fn to(&self) -> SharedPtr<dyn Speak> {
            SharedPtr::new(Parrot { word: self.word.to_string() })
                .upcast(|p: Arc<Parrot>| -> Arc<dyn Speak> { p })
        }
    }

    struct Statue;

    #[test]
    fn test_attached_duck_provides_capability() {
        let statue = SharedPtr::new(Statue);
        assert!(statue.cast::<dyn Speak>().is_null());

        let duck = SharedPtr::new(ScriptedParrot { word: "hello" })
            .upcast(|p: Arc<ScriptedParrot>| -> Arc<dyn Duck<dyn Speak>> { p });
        statue.attach(&duck);

        let speaker = statue.cast::<dyn Speak>();
        assert_eq!(speaker.speak(), "hello");
    }
}
