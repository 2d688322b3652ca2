//! End-to-end composition scenarios: several independently-developed
//! modules wired together through a single application root.

use canopy_core::{
    json, ActionHandler, Canopy, CompositionError, Config, Event, InvokeError, MethodCall, Module,
    Value,
};
use canopy_testkit::{counting_module, init_tracing, test_app, test_config, EventProbe};

fn math_module() -> Module {
    Module::named("math", |ns, _config| {
        ns.define_action(
            "math.square",
            ActionHandler::sync(|call| {
                let n = call.arg(0).and_then(Value::as_i64).unwrap_or(0);
                Ok(json!(n * n))
            }),
        )?
        .define_action(
            "math.sum",
            ActionHandler::sync(|call| {
                let total: i64 = call.args().iter().filter_map(Value::as_i64).sum();
                Ok(json!(total))
            }),
        )?;
        Ok(())
    })
}

fn store_module() -> Module {
    Module::named("store", |ns, config| {
        let capacity = config.get("capacity").and_then(Value::as_u64).unwrap_or(64);
        ns.share("capacity", capacity);
        ns.register_error("NotFound")?;
        ns.define_action(
            "store.get",
            ActionHandler::future(|call| async move {
                let key = call
                    .arg(0)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                match call.context().value(&key) {
                    Some(value) => Ok(value),
                    None => {
                        let err = call
                            .context()
                            .new_error("NotFound", &[json!(format!("no entry for '{key}'"))])
                            .ok_or_else(|| InvokeError::failure("NotFound is not registered"))?;
                        Err(err.into())
                    }
                }
            }),
        )?;
        Ok(())
    })
}

#[tokio::test]
async fn modules_compose_through_a_single_root() {
    init_tracing(&test_config());
    let canopy = test_app();
    canopy
        .load_module(&math_module())
        .expect("load math")
        .load_module(&store_module())
        .expect("load store");

    let math = canopy.namespace("math").expect("math exists");
    assert_eq!(math.call("square", vec![json!(4)]).await, Ok(json!(16)));
    assert_eq!(
        canopy.call("math.sum", vec![json!(1), json!(2), json!(3)]).await,
        Ok(json!(6))
    );

    // The store module's registrations are visible tree-wide.
    assert_eq!(math.shared::<u64>("capacity").as_deref(), Some(&64));
    assert!(math.error_kind("NotFound").is_some());
}

#[tokio::test]
async fn handler_failures_surface_as_registered_errors() {
    let canopy = test_app();
    canopy.load_module(&store_module()).expect("load store");

    let result = canopy.call("store.get", vec![json!("missing_key")]).await;
    match result {
        Err(InvokeError::Registered(err)) => {
            assert_eq!(err.name(), "NotFound");
            assert_eq!(err.message(), "no entry for 'missing_key'");
        }
        other => panic!("expected a registered NotFound error, got {other:?}"),
    }

    // Data attached to the action's context is found by the handler.
    let context = canopy.action("store.get").expect("action").context().clone();
    context.attach("greeting", json!("hello")).expect("attach");
    assert_eq!(
        canopy.call("store.get", vec![json!("greeting")]).await,
        Ok(json!("hello"))
    );
}

#[tokio::test]
async fn extension_scenario_logs_and_delegates() {
    let canopy = test_app();
    canopy.define_default("resolve_label", |call: MethodCall| async move {
        Ok(json!(format!(
            "{}:{}",
            call.context().path(),
            call.arg(0).and_then(Value::as_str).unwrap_or("")
        )))
    });

    let svc = canopy.namespace("svc").expect("svc");
    svc.extend("resolve_label", |call: MethodCall| async move {
        // Log through the builtin default, then run the prior implementation.
        call.context()
            .invoke("log", vec![json!("resolving"), call.arg(0).cloned().unwrap_or(Value::Null)])
            .await?;
        call.call_super(call.args().to_vec()).await
    })
    .expect("extend");

    assert_eq!(
        svc.invoke("resolve_label", vec![json!("widget")]).await,
        Ok(json!("canopy.svc:widget"))
    );
    // Sibling subtrees still run the default.
    let other = canopy.namespace("other").expect("other");
    assert_eq!(
        other.invoke("resolve_label", vec![json!("widget")]).await,
        Ok(json!("canopy.other:widget"))
    );
}

#[test]
fn named_modules_load_once_and_events_record_lifecycle() {
    let canopy = test_app();
    let mut probe = EventProbe::attach(&canopy);

    let (module, count) = counting_module("plugin");
    canopy.load_module(&module).expect("first");
    canopy.load_module(&module).expect("second");
    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);

    canopy.register_error("Boom").expect("register");
    canopy.share("dep", "v1".to_string());
    canopy.share("dep", "v2".to_string());

    let events = probe.drain();
    assert_eq!(
        events,
        vec![
            Event::ModuleLoaded {
                name: Some("plugin".into())
            },
            Event::ErrorRegistered { name: "Boom".into() },
            Event::DependencyShared { name: "dep".into() },
            Event::DependencyRejected { name: "dep".into() },
        ]
    );
    assert_eq!(canopy.shared::<String>("dep").as_deref(), Some(&"v1".to_string()));
}

#[tokio::test]
async fn action_overwrite_replaces_the_callable() {
    let canopy = test_app();
    let mut probe = EventProbe::attach(&canopy);
    canopy
        .define_action("svc.ping", ActionHandler::sync(|_| Ok(json!("one"))))
        .expect("first");
    canopy
        .define_action("svc.ping", ActionHandler::sync(|_| Ok(json!("two"))))
        .expect("overwrite");
    assert_eq!(canopy.call("svc.ping", vec![]).await, Ok(json!("two")));
    assert!(probe
        .drain()
        .contains(&Event::ActionOverwritten {
            path: "canopy.svc.ping".into()
        }));
}

#[test]
fn setup_errors_propagate_to_the_top() {
    let canopy = test_app();
    let module = Module::anonymous(|ns, _| {
        ns.namespace("db")?;
        // "db" is now a namespace, so an action cannot take the name.
        ns.define_action("db", ActionHandler::sync(|_| Ok(Value::Null)))?;
        Ok(())
    });
    match canopy.load_module(&module) {
        Err(CompositionError::IllegalNamespace { name, .. }) => assert_eq!(name, "db"),
        other => panic!("expected an illegal-namespace conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn config_reaches_module_bodies_and_handlers() {
    let canopy = Canopy::new(Config::named("acme").with("capacity", json!(128)));
    canopy.load_module(&store_module()).expect("load store");
    assert_eq!(canopy.shared::<u64>("capacity").as_deref(), Some(&128));
    let action = canopy.action("store.get").expect("action");
    assert_eq!(action.context().path(), "acme.store.get");
}
