//! Helper for components holding a [`ServiceStack`]
//!
//! A subscriber declares the queries it depends on through
//! [`Component::subscribed_services`](crate::Component::subscribed_services)
//! and receives a stack restricted to the matching services. Implementing
//! [`Subscriber`] on top of that gives context-driven selection over the
//! stack.

use crate::component::Interface;
use crate::di::ServiceStack;
use crate::error::Result;
use crate::service::Instance;
use std::sync::Arc;

pub trait Subscriber {
    /// Data `pick` and `transform` decide on
    type Context: ?Sized;

    fn service_stack(&self) -> &ServiceStack;

    /// Whether `instance` takes part in `provide`; every instance by default
    fn pick(&self, _instance: &Instance, _ctx: &Self::Context) -> bool {
        true
    }

    fn transform(&self, instance: Instance, _ctx: &Self::Context) -> Instance {
        instance
    }

    /// Picked instances of the stack, in stack order, after `transform`
    fn provide(&self, ctx: &Self::Context) -> Result<Vec<Instance>> {
        let instances = self.service_stack().instances()?;
        Ok(instances
            .into_iter()
            .filter(|instance| self.pick(instance, ctx))
            .map(|instance| self.transform(instance, ctx))
            .collect())
    }

    /// Like [`provide`](Self::provide), keeping the instances implementing `I`
    fn provide_as<I: ?Sized + Interface + Send + Sync>(
        &self,
        ctx: &Self::Context,
    ) -> Result<Vec<Arc<I>>> {
        Ok(self
            .provide(ctx)?
            .iter()
            .filter_map(Instance::cast::<I>)
            .collect())
    }
}
