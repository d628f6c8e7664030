use meshwire::prelude::*;
use meshwire::{Argument, WireError};
use rayon::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Barrier, Once, mpsc};
use std::time::Duration;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub trait Sender: Send + Sync {
    fn send(&self) -> &'static str;
}
meshwire::interface!(Sender => "SenderInterface");

struct Sms;
impl Sender for Sms {
    fn send(&self) -> &'static str {
        "sms"
    }
}

struct Plain;

fn sms() -> Service {
    Service::new("Sms", |_: &Arguments| Ok(Sms))
        .with_capabilities(vec![meshwire::capability!(dyn Sender => Sms)])
}

fn tagged(id: &'static str, priority: Option<i64>) -> Service {
    let tag = match priority {
        Some(priority) => ServiceTag::new("channel").with_priority(priority),
        None => ServiceTag::new("channel"),
    };
    Service::new(id, move |_: &Arguments| Ok(id)).with_tag(tag)
}

#[test]
fn resolves_the_same_instance_twice() {
    init_tracing();
    let container = Container::new();
    container.register("Plain", Service::new("Plain", |_: &Arguments| Ok(Plain)));

    let first = container.instance_of("Plain").unwrap();
    let second = container.instance_of("Plain").unwrap();
    assert!(first.ptr_eq(&second));
}

#[test]
fn tag_lookup_groups_by_priority() {
    init_tracing();
    let container = Container::new();
    container.register("A", tagged("A", None));
    container.register("B", tagged("B", Some(2)));
    container.register("C", tagged("C", Some(0)));

    let ids: Vec<_> = container
        .get("#channel")
        .unwrap()
        .into_instances()
        .unwrap()
        .iter()
        .map(|instance| *instance.downcast::<&'static str>().unwrap())
        .collect();
    assert_eq!(ids, ["B", "A", "C"]);
}

#[test]
fn unregistered_tag_is_empty() {
    let container = Container::new();
    assert!(container.get("#nothing").unwrap().into_instances().unwrap().is_empty());
    assert!(container
        .get("@service_of_#nothing")
        .unwrap()
        .into_descriptors()
        .unwrap()
        .is_empty());
}

#[test]
fn missing_scalar_is_argument_not_found() {
    let container = Container::new();
    container.register(
        "Greeter",
        Service::new("Greeter", |args: &Arguments| args.value::<String>("name"))
            .with_dependencies(vec![Dependency::scalar("name")]),
    );

    let err = container.get("Greeter").unwrap_err();
    assert_eq!(err.to_string(), "Missing argument name for Greeter class");
}

fn api_client() -> Service {
    Service::new("Client", |args: &Arguments| args.value::<String>("_api_key"))
        .with_dependencies(vec![Dependency::scalar("_api_key")])
}

#[test]
fn missing_environment_variable() {
    let container = ContainerBuilder::new().service(api_client()).build().unwrap();
    assert!(matches!(
        container.get("Client"),
        Err(WireError::EnvironmentVariableNotFound { .. })
    ));

    let container = ContainerBuilder::new()
        .context("API_KEY", "secret")
        .service(api_client())
        .build()
        .unwrap();
    let client = container.instance_of("Client").unwrap();
    assert_eq!(*client.downcast::<String>().unwrap(), "secret");
}

#[test]
fn interface_override_must_implement_the_interface() {
    let container = Container::new();
    container.register("Sms", sms());
    container.register("Plain", Service::new("Plain", |_: &Arguments| Ok(Plain)));
    container.register(
        "Notifier",
        Service::new("Notifier", |args: &Arguments| args.interface::<dyn Sender>("sender"))
            .with_dependencies(vec![Dependency::interface::<dyn Sender>("sender")])
            .with_given_arg("sender", "Plain"),
    );

    assert!(matches!(
        container.get("Notifier"),
        Err(WireError::DataType { .. })
    ));
}

#[test]
fn interface_override_selects_the_implementation() {
    let container = Container::new();
    container.register("Sms", sms());
    container.register(
        "Notifier",
        Service::new("Notifier", |args: &Arguments| args.interface::<dyn Sender>("sender"))
            .with_dependencies(vec![Dependency::interface::<dyn Sender>("sender")])
            .with_given_arg("sender", "Sms"),
    );

    let notifier = container.instance_of("Notifier").unwrap();
    let sender = notifier.downcast::<std::sync::Arc<dyn Sender>>().unwrap();
    assert_eq!(sender.send(), "sms");
}

#[test]
fn missing_service_is_absorbed_only_when_optional() {
    let container = Container::new();
    container.register(
        "Strict",
        Service::new("Strict", |args: &Arguments| args.instance("cache").map(|_| ()))
            .with_dependencies(vec![Dependency::service("cache", "Cache")]),
    );
    container.register(
        "Lenient",
        Service::new("Lenient", |args: &Arguments| {
            Ok(args.optional_instance("cache")?.is_none())
        })
        .with_dependencies(vec![Dependency::service("cache", "Cache").nullable()]),
    );

    assert!(container.get("Strict").unwrap_err().is_missing("Cache"));
    let lenient = container.instance_of("Lenient").unwrap();
    assert!(*lenient.downcast::<bool>().unwrap());
}

#[test]
fn deeper_failures_are_not_absorbed() {
    let container = Container::new();
    container.register(
        "Cache",
        Service::new("Cache", |args: &Arguments| args.instance("redis").map(|_| ()))
            .with_dependencies(vec![Dependency::service("redis", "Redis")]),
    );
    container.register(
        "Lenient",
        Service::new("Lenient", |args: &Arguments| {
            Ok(args.optional_instance("cache")?.is_none())
        })
        .with_dependencies(vec![Dependency::service("cache", "Cache").nullable()]),
    );

    let err = container.get("Lenient").unwrap_err();
    assert!(err.is_missing("Redis"));
}

#[test]
fn cycles_are_reported() {
    init_tracing();
    let container = Container::new();
    container.register(
        "A",
        Service::new("A", |args: &Arguments| args.instance("b").map(|_| ()))
            .with_dependencies(vec![Dependency::service("b", "B")]),
    );
    container.register(
        "B",
        Service::new("B", |args: &Arguments| args.instance("a").map(|_| ()))
            .with_dependencies(vec![Dependency::service("a", "A")]),
    );

    match container.get("A") {
        Err(WireError::CircularDependency { chain }) => assert_eq!(chain, "A -> B -> A"),
        other => panic!("expected a cycle, got {other:?}"),
    }
    assert!(!container.descriptor("A").unwrap().is_materialized());
}

fn gate(id: &'static str, barrier: Arc<Barrier>) -> Service {
    Service::new(id, move |_: &Arguments| {
        barrier.wait();
        Ok(())
    })
}

fn depends_on(id: &'static str, gate: &'static str, other: &'static str) -> Service {
    Service::new(id, |args: &Arguments| args.instance("other").map(|_| ()))
        .with_dependencies(vec![
            Dependency::service("gate", gate),
            Dependency::service("other", other),
        ])
}

#[test]
fn cycles_split_across_threads_are_reported() {
    init_tracing();
    let barrier = Arc::new(Barrier::new(2));
    let container = Container::new();
    container.register("GateA", gate("GateA", barrier.clone()));
    container.register("GateB", gate("GateB", barrier));
    container.register("A", depends_on("A", "GateA", "B"));
    container.register("B", depends_on("B", "GateB", "A"));

    let (sender, receiver) = mpsc::channel();
    for id in ["A", "B"] {
        let container = container.clone();
        let sender = sender.clone();
        std::thread::spawn(move || {
            let _ = sender.send(container.get(id).map(|_| ()));
        });
    }

    for _ in 0..2 {
        let outcome = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("cyclic resolution should fail instead of blocking");
        assert!(
            matches!(outcome, Err(WireError::CircularDependency { .. })),
            "expected a cycle, got {outcome:?}"
        );
    }
    assert!(!container.descriptor("A").unwrap().is_materialized());
    assert!(!container.descriptor("B").unwrap().is_materialized());
}

#[test]
fn failed_construction_is_retried() {
    let container = Container::new();
    let attempts = std::sync::Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    container.register(
        "Flaky",
        Service::new("Flaky", move |_: &Arguments| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(WireError::construction("Flaky", anyhow::anyhow!("not ready")))
            } else {
                Ok(Plain)
            }
        }),
    );

    assert!(matches!(
        container.get("Flaky"),
        Err(WireError::Construction { .. })
    ));
    assert!(container.get("Flaky").is_ok());
    assert!(container.get("Flaky").is_ok());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn concurrent_first_access_builds_once() {
    init_tracing();
    let container = Container::new();
    let builds = std::sync::Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    container.register(
        "Pool",
        Service::new("Pool", move |_: &Arguments| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(Plain)
        }),
    );

    let instances: Vec<_> = (0..32)
        .into_par_iter()
        .map(|_| container.instance_of("Pool").unwrap())
        .collect();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|pair| pair[0].ptr_eq(&pair[1])));
}

#[test]
fn resolved_arguments_are_kept_on_the_descriptor() {
    let container = ContainerBuilder::new()
        .context("TIMEOUT", 10)
        .service(
            Service::new("Client", |args: &Arguments| args.value::<u64>("_timeout"))
                .with_dependencies(vec![
                    Dependency::scalar("_timeout").with_default(30),
                    Dependency::scalar("retries").with_default(3),
                ]),
        )
        .build()
        .unwrap();

    container.get("Client").unwrap();
    let descriptor = container.descriptor("Client").unwrap();
    let args: Vec<_> = descriptor
        .args()
        .unwrap()
        .iter()
        .map(|(name, argument)| (name.to_string(), argument.as_value().cloned()))
        .collect();
    assert_eq!(
        args,
        [
            ("_timeout".to_string(), Some(json!(10))),
            ("retries".to_string(), Some(json!(3))),
        ]
    );
    assert!(matches!(
        descriptor.args().unwrap().get("retries"),
        Some(Argument::Value(_))
    ));
}

#[test]
fn all_services_lists_descriptors_in_registration_order() {
    let container = Container::new();
    container.register("B", Service::new("B", |_: &Arguments| Ok(Plain)));
    container.register("A", Service::new("A", |_: &Arguments| Ok(Plain)));

    let all = container.get("@all_services").unwrap().into_descriptors().unwrap();
    let ids: Vec<_> = all.iter().map(|service| service.identifier()).collect();
    assert_eq!(ids, ["B", "A"]);
    assert!(all.iter().all(|service| !service.is_materialized()));
}
