//! Typed descriptor sources
//!
//! Components declare up front what a reflective container would discover at
//! runtime: their constructor parameters, the interfaces they implement, their
//! abstract ancestors and, for subscribers, the queries they depend on.

mod capability;

pub use capability::Capability;

use crate::di::TagBuilder;
use crate::error::Result;
use crate::service::{Arguments, Dependency};
use std::any::Any;

/// Marker for trait objects that can be injected through their interface tag
///
/// Implemented for `dyn Trait` types, usually through the [`interface!`](crate::interface)
/// macro. `NAME` is turned into the tag name the implementors are registered under.
///
/// ```
/// use meshwire::Interface;
///
/// trait Mailer: Send + Sync {}
/// meshwire::interface!(Mailer => "MailerInterface");
///
/// assert_eq!(<dyn Mailer as Interface>::NAME, "MailerInterface");
/// ```
pub trait Interface: 'static {
    const NAME: &'static str;
}

/// A type the container knows how to build
///
/// Usually derived with `#[derive(Component)]`; implement it by hand when the
/// constructor needs more than field-by-field injection.
pub trait Component: Any + Send + Sync + Sized {
    /// Identifier the component is registered and referenced under
    fn identifier() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Constructor parameters, in declaration order
    fn dependencies() -> Vec<Dependency> {
        Vec::new()
    }

    /// Interfaces this component can be cast to
    fn capabilities() -> Vec<Capability> {
        Vec::new()
    }

    /// Abstract ancestors, each one turned into a class-derived tag
    fn ancestors() -> Vec<&'static str> {
        Vec::new()
    }

    /// Tags this component is the default implementation for.
    ///
    /// `Some(vec![])` marks it as the default for every tag it carries.
    fn default_for() -> Option<Vec<&'static str>> {
        None
    }

    /// Queries a subscriber depends on; `None` for regular components
    fn subscribed_services(_tags: &TagBuilder) -> Option<Vec<String>> {
        None
    }

    fn construct(args: &Arguments) -> Result<Self>;
}

/// Implement [`Interface`] for one or more trait objects
///
/// ```
/// trait Logger: Send + Sync {}
/// trait Clock: Send + Sync {}
///
/// meshwire::interface!(Logger, Clock);
/// ```
#[macro_export]
macro_rules! interface {
    ($trait:ident => $name:expr) => {
        impl $crate::Interface for dyn $trait {
            const NAME: &'static str = $name;
        }
    };
    ($($trait:ident),+ $(,)?) => {
        $(
            impl $crate::Interface for dyn $trait {
                const NAME: &'static str = stringify!($trait);
            }
        )+
    };
}

/// Build a [`Capability`] casting `$concrete` to `$iface`
///
/// ```
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {}
/// meshwire::interface!(Logger);
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {}
///
/// let capability = meshwire::capability!(dyn Logger => ConsoleLogger);
/// assert_eq!(capability.name(), "Logger");
/// ```
#[macro_export]
macro_rules! capability {
    ($iface:ty => $concrete:ty) => {
        $crate::Capability::new::<$iface, $concrete, _>(
            |instance: ::std::sync::Arc<$concrete>| -> ::std::sync::Arc<$iface> { instance },
        )
    };
}
