use proc_macro::TokenStream;

mod component;

/// Derive macro implementing `meshwire::Component` for a struct
///
/// Every field becomes a constructor parameter named after it:
///
/// - `Arc<dyn Trait>` is resolved through the interface tag of `Trait`
/// - `Arc<T>` is the singleton of the component `T`
/// - `ServiceStack`, `Container` and `Arc<dyn ServiceLocator>` receive a container
/// - `Option<..>` makes the parameter nullable
/// - anything else is a value, read from the environment when the name starts with `_`
///
/// # Example
/// ```ignore
/// use meshwire::prelude::*;
///
/// #[derive(Component)]
/// #[component(id = "Mailer", implements(Transport), default)]
/// pub struct Mailer {
///     logger: Arc<dyn Logger>,
///     #[component(default = "localhost")]
///     host: String,
///     _timeout: Option<u64>,
/// }
/// ```
#[proc_macro_derive(Component, attributes(component))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    component::derive_component(input)
}
