//! Class Definition Tests
//!
//! Covers the class registry and inheritance builder:
//! - Kinds (normal, abstract, singleton, static)
//! - Constructors and `base` dispatch
//! - Member overrides
//! - Statics, settings and `defer`
//! - JSON descriptors
//!
//! # Running Tests
//! ```bash
//! cargo test --test class_definition
//! ```

use serde_json::json;
use tessel_core::{
    ClassDescriptor, ClassKind, Member, PropertyCheck, PropertyDescriptor, Runtime, RuntimeError,
    RuntimeOptions, Static, Value,
};

fn checked() -> Runtime {
    Runtime::new(RuntimeOptions::checked())
}

fn define_zoo(rt: &Runtime) {
    rt.define(
        "zoo.Animal",
        ClassDescriptor::new().kind(ClassKind::Abstract).property(
            "name",
            PropertyDescriptor::new().check(PropertyCheck::String).init("?"),
        ),
    )
    .unwrap();
    rt.define(
        "zoo.Dog",
        ClassDescriptor::new()
            .extend("zoo.Animal")
            .method("speak", |_, _| Ok(Value::from("Woof"))),
    )
    .unwrap();
}

// ===== Kinds =====

#[test]
fn test_animal_and_dog() {
    let rt = checked();
    define_zoo(&rt);

    let err = rt.create("zoo.Animal").unwrap_err();
    assert!(matches!(err, RuntimeError::AbstractInstantiation(ref name) if name == "zoo.Animal"));

    let dog = rt.create("zoo.Dog").unwrap();
    assert_eq!(dog.get("name"), Some(Value::from("?")));
    assert_eq!(dog.call("speak", &[]).unwrap(), Value::from("Woof"));
    assert_eq!(dog.call("getName", &[]).unwrap(), Value::from("?"));

    dog.dispose().unwrap();
    dog.dispose().unwrap();
    assert!(dog.is_disposed());
}

#[test]
fn test_singleton() {
    let rt = checked();
    rt.define(
        "app.Registry",
        ClassDescriptor::new()
            .kind(ClassKind::Singleton)
            .property("size", PropertyDescriptor::new().init(0)),
    )
    .unwrap();

    assert!(matches!(
        rt.create("app.Registry"),
        Err(RuntimeError::SingletonViolation(_))
    ));
    let first = rt.get_instance("app.Registry").unwrap();
    first.set_property("size", 3).unwrap();
    let second = rt.get_instance("app.Registry").unwrap();
    assert_eq!(first, second);
    assert_eq!(second.get("size"), Some(Value::from(3)));
}

#[test]
fn test_get_instance_requires_singleton() {
    let rt = checked();
    define_zoo(&rt);
    assert!(matches!(
        rt.get_instance("zoo.Dog"),
        Err(RuntimeError::Configuration { .. })
    ));
    assert!(matches!(
        rt.get_instance("zoo.Cat"),
        Err(RuntimeError::UnknownClass(_))
    ));
}

#[test]
fn test_static_class() {
    let rt = checked();
    rt.define(
        "util.Strings",
        ClassDescriptor::new()
            .static_value("EMPTY", "")
            .static_fn("shout", |_, args| {
                let text = args.first().and_then(Value::as_str).unwrap_or_default();
                Ok(Value::from(text.to_uppercase()))
            }),
    )
    .unwrap();

    assert_eq!(rt.kind_of("util.Strings"), Some(ClassKind::Static));
    assert_eq!(
        rt.call_static("util.Strings", "shout", &[Value::from("hi")]).unwrap(),
        Value::from("HI")
    );
    assert!(rt.create("util.Strings").is_err());
}

#[test]
fn test_static_class_rejects_instance_keys() {
    let rt = checked();
    let err = rt
        .define(
            "util.Bad",
            ClassDescriptor::new()
                .kind(ClassKind::Static)
                .method("run", |_, _| Ok(Value::Null)),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Configuration { .. }));
    assert!(!rt.is_defined("util.Bad"));
}

#[test]
fn test_root_class_with_properties_needs_kind() {
    let rt = checked();
    let err = rt
        .define(
            "app.Plain",
            ClassDescriptor::new().property("name", PropertyDescriptor::new()),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Configuration { .. }));

    rt.define(
        "app.Animal",
        ClassDescriptor::new().kind(ClassKind::Normal).property(
            "name",
            PropertyDescriptor::new().check(PropertyCheck::String).init("unknown"),
        ),
    )
    .unwrap();
    let animal = rt.create("app.Animal").unwrap();
    animal.set_property("name", "Rex").unwrap();
    assert_eq!(animal.get("name"), Some(Value::from("Rex")));
}

// ===== Registry =====

#[test]
fn test_duplicate_class() {
    let rt = checked();
    define_zoo(&rt);
    let err = rt
        .define("zoo.Dog", ClassDescriptor::new().kind(ClassKind::Normal))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::DuplicateDefinition { kind: "class", .. }));
    assert_eq!(rt.get_count(), 2);
}

#[test]
fn test_unknown_superclass() {
    let rt = checked();
    let err = rt
        .define("zoo.Cat", ClassDescriptor::new().extend("zoo.Missing"))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownClass(ref name) if name == "zoo.Missing"));
}

#[test]
fn test_handle_names() {
    let rt = checked();
    define_zoo(&rt);
    let handle = rt.get_by_name("zoo.Dog").unwrap();
    assert_eq!(handle.name(), "zoo.Dog");
    assert_eq!(handle.namespace(), "zoo");
    assert_eq!(handle.basename(), "Dog");
    assert_eq!(handle.to_string(), "zoo.Dog");

    let dog = rt.create(&handle).unwrap();
    assert_eq!(dog.class_handle(), &handle);
    assert_eq!(dog.to_string(), "[object zoo.Dog]");
}

// ===== Constructors and dispatch =====

#[test]
fn test_constructor_chain() {
    let rt = checked();
    rt.define(
        "geo.Shape",
        ClassDescriptor::new()
            .kind(ClassKind::Normal)
            .construct(|inv, args| {
                let label = args.first().cloned().unwrap_or_else(|| Value::from("shape"));
                inv.this().set_field("label", label)?;
                inv.this().set_field("trace", "shape")
            }),
    )
    .unwrap();
    rt.define(
        "geo.Circle",
        ClassDescriptor::new()
            .extend("geo.Shape")
            .construct(|inv, args| {
                inv.base(&args[..1])?;
                let trace = inv.this().field("trace").unwrap_or_default();
                let trace = trace.as_str().unwrap_or_default();
                inv.this().set_field("trace", format!("{}>circle", trace))?;
                inv.this().set_field("radius", args.get(1).cloned().unwrap_or_default())
            }),
    )
    .unwrap();
    rt.define("geo.Ring", ClassDescriptor::new().extend("geo.Circle"))
        .unwrap();

    let ring = rt
        .instantiate("geo.Ring", &[Value::from("ring"), Value::from(4)])
        .unwrap();
    assert_eq!(ring.field("label"), Some(Value::from("ring")));
    assert_eq!(ring.field("trace"), Some(Value::from("shape>circle")));
    assert_eq!(ring.field("radius"), Some(Value::from(4)));
}

#[test]
fn test_base_member_dispatch() {
    let rt = checked();
    define_zoo(&rt);
    rt.define(
        "zoo.Puppy",
        ClassDescriptor::new()
            .extend("zoo.Dog")
            .method("speak", |inv, args| {
                let parent = inv.base(args)?;
                Ok(Value::from(format!("{}!", parent.as_str().unwrap_or_default())))
            })
            .method("sleep", |inv, args| inv.base(args)),
    )
    .unwrap();

    let puppy = rt.create("zoo.Puppy").unwrap();
    assert_eq!(puppy.call("speak", &[]).unwrap(), Value::from("Woof!"));
    assert!(matches!(
        puppy.call("sleep", &[]),
        Err(RuntimeError::MissingBaseMember { ref member, .. }) if member == "sleep"
    ));
    assert!(matches!(
        puppy.call("fly", &[]),
        Err(RuntimeError::UnknownMember { .. })
    ));
}

#[test]
fn test_self_class_statics() {
    let rt = checked();
    rt.define(
        "app.Base",
        ClassDescriptor::new()
            .kind(ClassKind::Normal)
            .static_value("LABEL", "base")
            .method("label", |inv, _| Ok(inv.statics("LABEL").unwrap_or_default())),
    )
    .unwrap();
    rt.define(
        "app.Derived",
        ClassDescriptor::new()
            .extend("app.Base")
            .static_value("LABEL", "derived"),
    )
    .unwrap();

    let derived = rt.create("app.Derived").unwrap();
    assert_eq!(derived.call("label", &[]).unwrap(), Value::from("base"));
    assert_eq!(rt.static_value("app.Derived", "LABEL"), Some(Value::from("derived")));
}

#[test]
fn test_constructor_failure_disposes() {
    let rt = checked();
    rt.define(
        "app.Fragile",
        ClassDescriptor::new()
            .kind(ClassKind::Normal)
            .construct(|_, _| Err(RuntimeError::callback("no resources"))),
    )
    .unwrap();

    let err = rt.create("app.Fragile").unwrap_err();
    assert!(matches!(err, RuntimeError::Callback(ref msg) if msg == "no resources"));
    assert_eq!(rt.db_stats().live, 0);
}

// ===== Statics, settings and defer =====

#[test]
fn test_defer_adds_members() {
    let rt = checked();
    rt.define(
        "app.Widget",
        ClassDescriptor::new()
            .kind(ClassKind::Normal)
            .method("render", |_, _| Ok(Value::from("<widget>")))
            .defer(|scope| {
                scope.alias_member("draw", "render")?;
                scope.set_static("DEFERRED", Static::Value(Value::from(true)));
                if !scope.has_member("hide") {
                    scope.add_member("hide", Member::method(|_, _| Ok(Value::from(false))));
                }
                Ok(())
            }),
    )
    .unwrap();

    let widget = rt.create("app.Widget").unwrap();
    assert_eq!(widget.call("draw", &[]).unwrap(), Value::from("<widget>"));
    assert_eq!(widget.call("hide", &[]).unwrap(), Value::from(false));
    assert_eq!(rt.static_value("app.Widget", "DEFERRED"), Some(Value::from(true)));
}

#[test]
fn test_defer_failure_registers_nothing() {
    let rt = checked();
    let err = rt
        .define(
            "app.Broken",
            ClassDescriptor::new()
                .kind(ClassKind::Normal)
                .defer(|scope| scope.alias_member("draw", "missing")),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownMember { .. }));
    assert!(!rt.is_defined("app.Broken"));
}

#[test]
fn test_settings() {
    let rt = checked();
    rt.define(
        "app.Theme",
        ClassDescriptor::new()
            .setting("app.color", "blue")
            .setting("app.size", 12),
    )
    .unwrap();
    assert_eq!(rt.setting("app.color"), Some(Value::from("blue")));
    assert_eq!(rt.setting("app.size"), Some(Value::from(12)));
    assert_eq!(rt.setting("app.missing"), None);

    let err = rt
        .define("app.Skin", ClassDescriptor::new().setting("other.color", "red"))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Configuration { .. }));
}

// ===== JSON descriptors =====

#[test]
fn test_define_json() {
    let rt = checked();
    rt.define_json(
        "app.Label",
        &json!({
            "type": "normal",
            "statics": { "DEFAULT_TEXT": "label" },
            "properties": {
                "text": { "check": "String", "init": "" },
                "rich": { "check": "Boolean", "init": false, "event": "changeRich" }
            },
            "events": { "changeRich": "app.DataEvent" },
            "autoDispose": false
        }),
    )
    .unwrap();

    assert_eq!(rt.kind_of("app.Label"), Some(ClassKind::Normal));
    assert!(rt.has_property("app.Label", "rich"));
    assert_eq!(rt.static_value("app.Label", "DEFAULT_TEXT"), Some(Value::from("label")));

    let label = rt.create("app.Label").unwrap();
    assert!(label.toggle("rich").unwrap());
    assert_eq!(label.get("text"), Some(Value::from("")));
    assert!(label.db_key().is_none());
}

#[test]
fn test_define_json_unknown_key() {
    let rt = checked();
    let err = rt
        .define_json("app.Label", &json!({ "type": "normal", "colour": "red" }))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Configuration { .. }));

    let lenient = Runtime::new(RuntimeOptions::unchecked());
    lenient
        .define_json("app.Label", &json!({ "type": "normal", "colour": "red" }))
        .unwrap();
    assert!(lenient.is_defined("app.Label"));
}

#[test]
fn test_define_json_bad_type() {
    let rt = checked();
    let err = rt
        .define_json("app.Label", &json!({ "type": "plain" }))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Configuration { .. }));
}
