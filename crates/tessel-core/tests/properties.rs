//! Property Engine Tests
//!
//! Tests validate:
//! - Layer precedence (user > theme > computed > init)
//! - Type and nullable checks in both validation modes
//! - `apply` runs before the change event
//! - Generated accessors
//! - Batch operations are all-or-nothing on unknown names
//! - Refined init values
//!
//! # Running Tests
//! ```bash
//! cargo test --test properties
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use tessel_core::{
    ClassDescriptor, ClassKind, PropertyCheck, PropertyDescriptor, Runtime, RuntimeError,
    RuntimeOptions, Value,
};

type Log = Arc<Mutex<Vec<String>>>;

fn define_button(rt: &Runtime, log: &Log) {
    let apply_log = log.clone();
    rt.define(
        "ui.Button",
        ClassDescriptor::new()
            .kind(ClassKind::Normal)
            .property(
                "label",
                PropertyDescriptor::new()
                    .check(PropertyCheck::String)
                    .init("OK")
                    .apply("applyLabel")
                    .event("changeLabel"),
            )
            .property(
                "color",
                PropertyDescriptor::new()
                    .check(PropertyCheck::String)
                    .nullable(true)
                    .themeable(true)
                    .init("gray"),
            )
            .property(
                "enabled",
                PropertyDescriptor::new().check(PropertyCheck::Boolean).init(true),
            )
            .property("width", PropertyDescriptor::new().check(PropertyCheck::Integer))
            .event("changeLabel", "ui.DataEvent")
            .method("applyLabel", move |_, args| {
                let new = args[0].as_str().unwrap_or_default().to_string();
                apply_log.lock().push(format!("apply:{}", new));
                Ok(Value::Null)
            }),
    )
    .unwrap();
}

fn button(validation: RuntimeOptions) -> (Runtime, Log) {
    let rt = Runtime::new(validation);
    let log: Log = Arc::default();
    define_button(&rt, &log);
    (rt, log)
}

// ===== Layers =====

#[test]
fn test_init_value_is_visible() {
    let (rt, _) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();
    assert_eq!(b.get("label"), Some(Value::from("OK")));
    assert_eq!(b.get("width"), None);
    assert_eq!(b.get_property("width").unwrap(), None);
}

#[test]
fn test_theme_and_user_layers() {
    let (rt, _) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();

    b.style_property("color", "blue").unwrap();
    assert_eq!(b.get("color"), Some(Value::from("blue")));

    b.set_property("color", "red").unwrap();
    assert_eq!(b.get("color"), Some(Value::from("red")));

    // user layer shadows new theme values
    b.style_property("color", "green").unwrap();
    assert_eq!(b.get("color"), Some(Value::from("red")));

    b.reset("color").unwrap();
    assert_eq!(b.get("color"), Some(Value::from("green")));

    b.unstyle_property("color").unwrap();
    assert_eq!(b.get("color"), Some(Value::from("gray")));
}

#[test]
fn test_style_on_plain_property_falls_back() {
    let (rt, _) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();
    b.style_property("label", "Go").unwrap();
    assert_eq!(b.get("label"), Some(Value::from("Go")));
    b.unstyle_property("label").unwrap();
    assert_eq!(b.get("label"), Some(Value::from("OK")));
}

#[test]
fn test_computed_layer() {
    let rt = Runtime::new(RuntimeOptions::checked());
    rt.define(
        "geo.Rect",
        ClassDescriptor::new()
            .kind(ClassKind::Normal)
            .property("side", PropertyDescriptor::new().init(3))
            .property(
                "area",
                PropertyDescriptor::new()
                    .check(PropertyCheck::Integer)
                    .init(0)
                    .compute("computeArea"),
            )
            .method("computeArea", |inv, _| {
                let side = inv.this().get("side").and_then(|v| v.as_i64()).unwrap_or(0);
                Ok(Value::from(side * side))
            }),
    )
    .unwrap();

    let rect = rt.create("geo.Rect").unwrap();
    assert_eq!(rect.get("area"), Some(Value::from(0)));
    assert_eq!(rect.compute("area").unwrap(), Some(Value::from(9)));

    rect.set_property("area", 1).unwrap();
    assert_eq!(rect.get("area"), Some(Value::from(1)));
    rect.reset("area").unwrap();
    assert_eq!(rect.get("area"), Some(Value::from(9)));

    assert!(matches!(
        rect.compute("side"),
        Err(RuntimeError::UnknownMember { ref member, .. }) if member == "computeSide"
    ));
}

// ===== Validation =====

#[test]
fn test_type_check_rejects_and_keeps_value() {
    let (rt, log) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();
    b.set_property("width", 10).unwrap();

    let err = b.set_property("width", "wide").unwrap_err();
    assert!(matches!(err, RuntimeError::PropertyType { ref property, .. } if property == "width"));
    assert_eq!(b.get("width"), Some(Value::from(10)));

    assert!(b.set_property("label", Value::Null).is_err());
    assert_eq!(b.get("label"), Some(Value::from("OK")));
    assert!(log.lock().is_empty());

    b.set_property("color", Value::Null).unwrap();
    assert_eq!(b.get("color"), Some(Value::Null));
}

#[test]
fn test_unchecked_skips_type_check() {
    let (rt, _) = button(RuntimeOptions::unchecked());
    let b = rt.create("ui.Button").unwrap();
    b.set_property("width", "wide").unwrap();
    assert_eq!(b.get("width"), Some(Value::from("wide")));
}

#[test]
fn test_bad_init_fails_definition() {
    let rt = Runtime::new(RuntimeOptions::checked());
    let err = rt
        .define(
            "ui.Broken",
            ClassDescriptor::new()
                .kind(ClassKind::Normal)
                .property("size", PropertyDescriptor::new().check(PropertyCheck::Integer).init("big")),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::PropertyType { .. }));
    assert!(!rt.is_defined("ui.Broken"));
}

#[test]
fn test_unknown_property() {
    let (rt, _) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();
    assert!(matches!(
        b.set_property("height", 1),
        Err(RuntimeError::UnknownProperty { ref property, .. }) if property == "height"
    ));
    assert_eq!(b.get("height"), None);
}

// ===== Apply and events =====

#[test]
fn test_apply_runs_before_event() {
    let (rt, log) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();

    let event_log = log.clone();
    b.add_listener("changeLabel", move |event| {
        let new = event.value().and_then(Value::as_str).unwrap_or_default();
        let old = event.old_value().and_then(Value::as_str).unwrap_or_default();
        event_log.lock().push(format!("event:{}<-{}", new, old));
    })
    .unwrap();

    b.set_property("label", "Save").unwrap();
    assert_eq!(*log.lock(), vec!["apply:Save", "event:Save<-OK"]);

    // same effective value: no notification
    b.set_property("label", "Save").unwrap();
    assert_eq!(log.lock().len(), 2);
}

#[test]
fn test_failing_apply_keeps_new_value() {
    let rt = Runtime::new(RuntimeOptions::checked());
    rt.define(
        "ui.Strict",
        ClassDescriptor::new()
            .kind(ClassKind::Normal)
            .property("level", PropertyDescriptor::new().init(0).apply("applyLevel"))
            .method("applyLevel", |_, _| Err(RuntimeError::callback("rejected"))),
    )
    .unwrap();

    let strict = rt.create("ui.Strict").unwrap();
    assert!(matches!(
        strict.set_property("level", 5),
        Err(RuntimeError::Callback(_))
    ));
    assert_eq!(strict.get("level"), Some(Value::from(5)));
}

#[test]
fn test_init_property_notifies() {
    let (rt, log) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();
    assert!(log.lock().is_empty());

    assert_eq!(b.init_property("label").unwrap(), Some(Value::from("OK")));
    assert_eq!(*log.lock(), vec!["apply:OK"]);
}

#[test]
fn test_listener_requires_declared_event() {
    let (rt, _) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();
    assert!(matches!(
        b.add_listener("click", |_| {}),
        Err(RuntimeError::UnknownEvent { .. })
    ));

    let (lenient, _) = button(RuntimeOptions::unchecked());
    let b = lenient.create("ui.Button").unwrap();
    let hits = Arc::new(Mutex::new(0));
    let counter = hits.clone();
    let id = b.add_listener("click", move |_| *counter.lock() += 1).unwrap();
    b.fire_event("click").unwrap();
    assert_eq!(*hits.lock(), 1);
    assert!(b.remove_listener(id));
    b.fire_event("click").unwrap();
    assert_eq!(*hits.lock(), 1);
}

// ===== Accessors =====

#[test]
fn test_generated_accessors() {
    let (rt, _) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();

    assert_eq!(b.call("getLabel", &[]).unwrap(), Value::from("OK"));
    assert_eq!(
        b.call("setLabel", &[Value::from("Next")]).unwrap(),
        Value::from("Next")
    );
    b.call("resetLabel", &[]).unwrap();
    assert_eq!(b.get("label"), Some(Value::from("OK")));

    b.call("styleColor", &[Value::from("black")]).unwrap();
    assert_eq!(b.get("color"), Some(Value::from("black")));

    assert_eq!(b.call("toggleEnabled", &[]).unwrap(), Value::from(false));
    assert!(b.toggle("enabled").unwrap());

    assert!(matches!(
        b.call("styleLabel", &[Value::from("x")]),
        Err(RuntimeError::UnknownMember { .. })
    ));
    assert!(matches!(
        b.call("toggleLabel", &[]),
        Err(RuntimeError::UnknownMember { .. })
    ));
}

#[test]
fn test_accessors_for_uppercase_property() {
    let rt = Runtime::new(RuntimeOptions::checked());
    rt.define(
        "net.Link",
        ClassDescriptor::new()
            .kind(ClassKind::Normal)
            .property("URL", PropertyDescriptor::new().check(PropertyCheck::String).init("x")),
    )
    .unwrap();

    let link = rt.create("net.Link").unwrap();
    assert_eq!(link.get("URL"), Some(Value::from("x")));
    assert_eq!(link.call("getURL", &[]).unwrap(), Value::from("x"));
    link.call("setURL", &[Value::from("y")]).unwrap();
    assert_eq!(link.get("URL"), Some(Value::from("y")));
    assert!(matches!(
        link.call("getUrl", &[]),
        Err(RuntimeError::UnknownMember { .. })
    ));
}

// ===== Batch operations =====

#[test]
fn test_batch_set_is_all_or_nothing() {
    let (rt, _) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();

    b.set([("label", Value::from("Apply")), ("width", Value::from(40))])
        .unwrap();
    assert_eq!(b.get("label"), Some(Value::from("Apply")));
    assert_eq!(b.get("width"), Some(Value::from(40)));

    let err = b
        .set([("label", Value::from("Cancel")), ("height", Value::from(1))])
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownProperty { .. }));
    assert_eq!(b.get("label"), Some(Value::from("Apply")));
}

#[test]
fn test_batch_style_and_unstyle() {
    let (rt, _) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();
    b.style([("color", "white")]).unwrap();
    assert_eq!(b.get("color"), Some(Value::from("white")));
    b.unstyle(["color"]).unwrap();
    assert_eq!(b.get("color"), Some(Value::from("gray")));
    assert!(b.unstyle(["color", "shadow"]).is_err());
}

// ===== Inheritance =====

#[test]
fn test_refined_init() {
    let (rt, _) = button(RuntimeOptions::checked());
    rt.define(
        "ui.DangerButton",
        ClassDescriptor::new()
            .extend("ui.Button")
            .property("color", PropertyDescriptor::refine_init("red"))
            .construct(|inv, args| {
                let color = inv.this().get("color").unwrap_or_default();
                inv.this().set_field("initial", color)?;
                inv.base(args).map(|_| ())
            }),
    )
    .unwrap();

    let danger = rt.create("ui.DangerButton").unwrap();
    assert_eq!(danger.get("color"), Some(Value::from("red")));
    assert_eq!(danger.field("initial"), Some(Value::from("red")));
    assert_eq!(danger.get("label"), Some(Value::from("OK")));

    let plain = rt.create("ui.Button").unwrap();
    assert_eq!(plain.get("color"), Some(Value::from("gray")));

    let err = rt
        .define(
            "ui.BadRefine",
            ClassDescriptor::new()
                .extend("ui.Button")
                .property("width", PropertyDescriptor::refine_init("wide")),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::PropertyType { .. }));
}

#[test]
fn test_disposed_object_rejects_writes() {
    let (rt, _) = button(RuntimeOptions::checked());
    let b = rt.create("ui.Button").unwrap();
    b.dispose().unwrap();
    assert!(matches!(
        b.set_property("label", "x"),
        Err(RuntimeError::ObjectDisposed { .. })
    ));
    assert!(matches!(
        b.call("getLabel", &[]),
        Err(RuntimeError::ObjectDisposed { .. })
    ));
    assert_eq!(b.get("label"), Some(Value::from("OK")));
}
