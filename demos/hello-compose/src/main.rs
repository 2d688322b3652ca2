//! # Hello Compose Example
//!
//! A minimal demonstration of wiring independently-developed modules
//! through a single application root:
//!
//! - a math module registering plain and sequence actions
//! - an errors module declaring custom error kinds, one with an
//!   initializer that populates extra attributes
//! - a requires module sharing dependencies tree-wide, first writer wins
//! - a node-local `log` extension that prefixes everything under `math`
//!
//! Run with: `cargo run -p hello-compose`

use anyhow::Result;
use canopy_core::util::{validate_arg, ValueKind};
use canopy_core::{json, ActionHandler, Canopy, Config, InvokeError, MethodCall, Module, Value};

fn math_module() -> Module {
    Module::named("math", |ns, _config| {
        ns.define_action(
            "math.square",
            ActionHandler::sync(|call| {
                let n = call.arg(0).and_then(Value::as_f64).unwrap_or(0.0);
                Ok(json!(n * n))
            }),
        )?
        .define_action(
            "math.divide",
            ActionHandler::future(|call| async move {
                let numerator = call.arg(0).cloned().unwrap_or(Value::Null);
                let denominator = call.arg(1).cloned().unwrap_or(Value::Null);
                validate_arg("math.divide", "numerator", &numerator, &[ValueKind::Number])?;
                validate_arg("math.divide", "denominator", &denominator, &[ValueKind::Number])?;
                let numerator = numerator.as_f64().unwrap_or(0.0);
                let denominator = denominator.as_f64().unwrap_or(0.0);
                if denominator == 0.0 {
                    let err = call
                        .context()
                        .new_error("DivideByZero", &[json!(numerator)])
                        .ok_or_else(|| InvokeError::failure("DivideByZero is not registered"))?;
                    return Err(err.into());
                }
                Ok(json!(numerator / denominator))
            }),
        )?
        .define_action(
            // Normalize a list of numbers: sum, then scale each by the sum.
            "math.normalize",
            ActionHandler::sequence([
                ActionHandler::step(|_, input| async move {
                    let numbers: Vec<f64> = input
                        .as_array()
                        .and_then(|args| args.first())
                        .and_then(Value::as_array)
                        .map(|xs| xs.iter().filter_map(Value::as_f64).collect())
                        .unwrap_or_default();
                    let total: f64 = numbers.iter().sum();
                    Ok(json!({ "numbers": numbers, "total": total }))
                }),
                ActionHandler::step(|_, input| async move {
                    let total = input["total"].as_f64().unwrap_or(0.0);
                    if total == 0.0 {
                        return Err(InvokeError::failure("cannot normalize an empty list"));
                    }
                    let scaled: Vec<f64> = input["numbers"]
                        .as_array()
                        .map(|xs| xs.iter().filter_map(Value::as_f64).map(|x| x / total).collect())
                        .unwrap_or_default();
                    Ok(json!(scaled))
                }),
            ]),
        )?;
        Ok(())
    })
}

fn errors_module() -> Module {
    Module::named("errors", |ns, _config| {
        ns.register_error("NotFound")?
            .register_error_with("DivideByZero", |err, args| {
                let number = args.first().cloned().unwrap_or(Value::Null);
                err.set_message(format!("cannot divide {number} by zero"));
                err.set_field("failing_number", number);
            })?;
        Ok(())
    })
}

fn requires_module() -> Module {
    Module::named("requires", |ns, config| {
        let greeting = config
            .get("greeting")
            .and_then(Value::as_str)
            .unwrap_or("hello")
            .to_string();
        ns.share("greeting", greeting);
        // A second writer is a logged no-op; the first registration wins.
        ns.share("greeting", "ignored".to_string());
        ns.share("version", env!("CARGO_PKG_VERSION").to_string());
        Ok(())
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::named("hello").with("greeting", json!("hi there"));
    tracing_subscriber::fmt()
        .with_env_filter(config.log.level.clone())
        .init();

    let canopy = Canopy::new(config);
    canopy
        .load_module(&errors_module())?
        .load_module(&math_module())?
        .load_module(&requires_module())?;

    // Everything under math logs with a prefix; the rest of the tree is
    // untouched.
    let math = canopy.namespace("math")?;
    math.extend("log", |call: MethodCall| async move {
        let mut args = call.args().to_vec();
        args.insert(0, json!("[math]"));
        call.call_super(args).await
    })?;
    math.invoke("log", vec![json!("module ready")]).await?;

    let squared = math.call("square", vec![json!(4)]).await?;
    println!("square(4) = {squared}");

    let normalized = canopy
        .call("math.normalize", vec![json!([1.0, 3.0, 4.0])])
        .await?;
    println!("normalize([1, 3, 4]) = {normalized}");

    match canopy.call("math.divide", vec![json!(5), json!(0)]).await {
        Err(InvokeError::Registered(err)) => {
            println!(
                "divide(5, 0) failed as expected: {} (failing_number = {})",
                err,
                err.field("failing_number").unwrap_or(&Value::Null)
            );
        }
        other => println!("unexpected divide outcome: {other:?}"),
    }

    let greeting = canopy
        .shared::<String>("greeting")
        .unwrap_or_else(|| std::sync::Arc::new("missing".to_string()));
    println!("shared greeting = {greeting}");

    Ok(())
}
