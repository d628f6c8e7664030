use super::Interface;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Casts a type-erased instance into an `Arc<dyn Any>` wrapping an `Arc<dyn Trait>`.
type CasterFn =
    Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> Option<Arc<dyn Any + Send + Sync>> + Send + Sync>;

/// An interface implemented by a component, with the cast that exposes it
#[derive(Clone)]
pub struct Capability {
    name: &'static str,
    interface: TypeId,
    caster: CasterFn,
}

impl Capability {
    /// Declare that `T` can be used as `I` through `cast`
    pub fn new<I, T, F>(cast: F) -> Self
    where
        I: ?Sized + Interface + Send + Sync,
        T: Any + Send + Sync,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let caster: CasterFn = Arc::new(move |instance: Arc<dyn Any + Send + Sync>| {
            let concrete = instance.downcast::<T>().ok()?;
            let trait_obj: Arc<I> = cast(concrete);
            Some(Arc::new(trait_obj) as Arc<dyn Any + Send + Sync>)
        });

        Self {
            name: I::NAME,
            interface: TypeId::of::<I>(),
            caster,
        }
    }

    /// Interface name, as declared by [`Interface::NAME`]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<I: ?Sized + Interface>(&self) -> bool {
        self.interface == TypeId::of::<I>()
    }

    pub(crate) fn cast<I>(&self, instance: &Arc<dyn Any + Send + Sync>) -> Option<Arc<I>>
    where
        I: ?Sized + Interface + Send + Sync,
    {
        if !self.is::<I>() {
            return None;
        }

        // The caster returns an Arc<dyn Any> holding an Arc<I>.
        let wrapper = (self.caster)(instance.clone())?;
        let wrapper = wrapper.downcast::<Arc<I>>().ok()?;
        Some(wrapper.as_ref().clone())
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capability").field(&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn area(&self) -> f64;
    }
    trait Named: Send + Sync {}
    crate::interface!(Shape, Named);

    struct Square(f64);

    impl Shape for Square {
        fn area(&self) -> f64 {
            self.0 * self.0
        }
    }

    #[test]
    fn casts_to_the_declared_interface() {
        let capability = crate::capability!(dyn Shape => Square);
        let erased: Arc<dyn Any + Send + Sync> = Arc::new(Square(3.0));

        let shape = capability.cast::<dyn Shape>(&erased).unwrap();
        assert_eq!(shape.area(), 9.0);
        assert_eq!(capability.name(), "Shape");
    }

    #[test]
    fn refuses_other_interfaces_and_other_types() {
        let capability = crate::capability!(dyn Shape => Square);
        let erased: Arc<dyn Any + Send + Sync> = Arc::new(Square(1.0));
        assert!(capability.cast::<dyn Named>(&erased).is_none());

        let wrong: Arc<dyn Any + Send + Sync> = Arc::new(42_u32);
        assert!(capability.cast::<dyn Shape>(&wrong).is_none());
    }
}
