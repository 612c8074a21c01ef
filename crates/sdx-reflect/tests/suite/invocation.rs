use std::any::Any;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sdx_reflect::{Lookup, LookupMode, ReflectionError, Reflector};
use sdx_types::{
    take_arg, ClassDef, ClassId, ClassKind, FieldDef, MethodDef, NativeGetter, NativeMethod,
    NativeSetter, Outcome, PrimitiveType, Thrown, Type, TypeStore, Value, ACC_FINAL, ACC_PRIVATE,
    ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC, ACC_VARARGS,
};

use super::fixtures::{test_lookup, INVOKE};

#[derive(Debug, Default, PartialEq)]
struct Fields {
    public: bool,
    protected: bool,
    package: bool,
    private: bool,
    constant: i32,
}

struct Greeter {
    greeting: String,
}

fn field(
    name: &str,
    access_flags: u16,
    get: fn(&Fields) -> bool,
    set: fn(&mut Fields, bool),
) -> FieldDef {
    FieldDef {
        getter: Some(NativeGetter::typed(get)),
        setter: Some(NativeSetter::typed(set)),
        ..FieldDef::new(name, Type::Primitive(PrimitiveType::Boolean), access_flags)
    }
}

fn next_arg<T: Any>(args: &mut impl Iterator<Item = Value>, what: &str) -> Outcome<T> {
    let value = args.next().ok_or_else(|| Thrown::mismatch::<T>(what))?;
    take_arg(value, what)
}

fn method(name: &str, params: Vec<Type>, access_flags: u16, body: NativeMethod) -> MethodDef {
    MethodDef {
        name: name.to_string(),
        params,
        return_type: None,
        access_flags,
        body: Some(body),
    }
}

struct Members {
    store: Arc<TypeStore>,
    fields: ClassId,
    greeter: ClassId,
    string: Type,
}

fn members() -> Members {
    let mut store = TypeStore::default();
    let string = Type::raw(store.add_class(ClassDef::new("java.lang.String", ClassKind::Class)));
    let strings = Type::Array(Box::new(string.clone()));

    let fields = store.add_class(ClassDef {
        fields: vec![
            field("publicField", ACC_PUBLIC, |f| f.public, |f, v| f.public = v),
            field("protectedField", ACC_PROTECTED, |f| f.protected, |f, v| f.protected = v),
            field("packageField", 0, |f| f.package, |f, v| f.package = v),
            field("privateField", ACC_PRIVATE, |f| f.private, |f, v| f.private = v),
            FieldDef {
                getter: Some(NativeGetter::typed(|f: &Fields| f.constant)),
                setter: Some(NativeSetter::typed(|f: &mut Fields, v: i32| f.constant = v)),
                ..FieldDef::new(
                    "constant",
                    Type::Primitive(PrimitiveType::Int),
                    ACC_PUBLIC | ACC_FINAL,
                )
            },
        ],
        ..ClassDef::new(format!("{INVOKE}.Fields"), ClassKind::Class)
    });
    store.bind_native::<Fields>(fields);
    store.add_class(ClassDef {
        super_class: Some(Type::raw(fields)),
        ..ClassDef::new("com.example.elsewhere.SubFields", ClassKind::Class)
    });

    let greeter = store.add_class(ClassDef {
        methods: vec![
            method(
                "greet",
                vec![string.clone()],
                ACC_PUBLIC,
                NativeMethod::instance(|g: &mut Greeter, args| {
                    let name: String = next_arg(&mut args.into_iter(), "name")?;
                    Ok(format!("{}, {name}", g.greeting))
                }),
            ),
            method(
                "greetAll",
                vec![string.clone(), strings],
                ACC_PUBLIC | ACC_VARARGS,
                NativeMethod::instance(|g: &mut Greeter, args| {
                    let mut args = args.into_iter();
                    let separator: String = next_arg(&mut args, "separator")?;
                    let names: Vec<Value> = next_arg(&mut args, "names")?;
                    let names = names
                        .into_iter()
                        .map(|name| take_arg::<String>(name, "name"))
                        .collect::<Outcome<Vec<_>>>()?;
                    Ok(format!("{}, {}", g.greeting, names.join(&separator)))
                }),
            ),
            method(
                "rename",
                vec![string.clone()],
                ACC_PUBLIC,
                NativeMethod::instance(|g: &mut Greeter, args| {
                    g.greeting = next_arg(&mut args.into_iter(), "greeting")?;
                    Ok(())
                }),
            ),
            method(
                "fail",
                vec![],
                ACC_PUBLIC,
                NativeMethod::instance(|_: &mut Greeter, _| -> Outcome<()> {
                    Err(Thrown::unchecked("greeting rejected"))
                }),
            ),
            method(
                "load",
                vec![],
                ACC_PUBLIC,
                NativeMethod::instance(|_: &mut Greeter, _| -> Outcome<()> {
                    Err(Thrown::checked("greetings file is missing"))
                }),
            ),
            method(
                "secret",
                vec![],
                ACC_PRIVATE,
                NativeMethod::instance(|_: &mut Greeter, _| Ok(42)),
            ),
            method(
                "defaultGreeting",
                vec![],
                ACC_PUBLIC | ACC_STATIC,
                NativeMethod::static_fn(|_| Ok("Hello".to_string())),
            ),
        ],
        ..ClassDef::new(format!("{INVOKE}.Greeter"), ClassKind::Class)
    });
    store.bind_native::<Greeter>(greeter);

    Members {
        store: Arc::new(store),
        fields,
        greeter,
        string,
    }
}

fn reflector() -> (Reflector, Members) {
    let members = members();
    let reflector = Reflector::with_store_loader(Arc::clone(&members.store));
    reflector.set_lookup(test_lookup());
    (reflector, members)
}

fn greeter() -> Greeter {
    Greeter {
        greeting: "Hi".to_string(),
    }
}

fn denied(member: &str, lookup: &Lookup) -> ReflectionError {
    ReflectionError::Access {
        member: member.to_string(),
        lookup: lookup.to_string(),
    }
}

#[test]
fn getters_and_setters_round_trip() {
    let (reflector, m) = reflector();
    let field = m.store.declared_field(m.fields, "publicField").unwrap();
    let getter = reflector.unreflect_getter(&field).unwrap();
    let setter = reflector.unreflect_setter(&field).unwrap();

    let mut instance = Fields::default();
    reflector
        .invoke_setter(&setter, &mut instance, Box::new(true))
        .unwrap();
    assert!(instance.public);

    let value = reflector.invoke_getter(&getter, &instance).unwrap();
    assert!(reflector.unchecked_cast::<bool>(value).unwrap());
}

#[test]
fn field_access_follows_the_lookup() {
    let (reflector, m) = reflector();
    let field = |name: &str| m.store.declared_field(m.fields, name).unwrap();
    let name = |simple: &str| format!("{INVOKE}.Fields.{simple}");

    let lookup = test_lookup();
    assert!(reflector.unreflect_getter(&field("publicField")).is_ok());
    for (simple, keyword) in [
        ("protectedField", "protected"),
        ("packageField", "package-private"),
        ("privateField", "private"),
    ] {
        assert_eq!(
            reflector.unreflect_getter(&field(simple)).unwrap_err(),
            denied(&format!("{keyword} field {}", name(simple)), &lookup)
        );
    }

    reflector.set_lookup(Lookup::in_class(format!("{INVOKE}.Neighbor")));
    assert!(reflector.unreflect_getter(&field("protectedField")).is_ok());
    assert!(reflector.unreflect_getter(&field("packageField")).is_ok());
    assert!(reflector.unreflect_getter(&field("privateField")).is_err());

    reflector.set_lookup(Lookup::in_class(format!("{INVOKE}.Fields$Helper")));
    assert!(reflector.unreflect_setter(&field("privateField")).is_ok());

    let subclass = Lookup::in_class("com.example.elsewhere.SubFields");
    reflector.set_lookup(subclass.clone());
    assert!(reflector.unreflect_getter(&field("protectedField")).is_ok());
    assert!(reflector.unreflect_getter(&field("packageField")).is_err());
    reflector.set_lookup(subclass.with_mode(LookupMode::Package));
    assert!(reflector.unreflect_getter(&field("protectedField")).is_err());

    reflector.set_lookup(Lookup::public());
    assert!(reflector.unreflect_getter(&field("publicField")).is_ok());
    assert!(reflector.unreflect_getter(&field("packageField")).is_err());
}

#[test]
fn accessible_fields_skip_access_checks() {
    let (reflector, m) = reflector();
    let mut private = m.store.declared_field(m.fields, "privateField").unwrap();
    private.set_accessible(true);

    let setter = reflector.unreflect_setter(&private).unwrap();
    let getter = reflector.unreflect_getter(&private).unwrap();
    let mut instance = Fields::default();
    reflector
        .invoke_setter(&setter, &mut instance, Box::new(true))
        .unwrap();
    assert_eq!(
        instance,
        Fields {
            private: true,
            ..Fields::default()
        }
    );
    let value = reflector.invoke_getter(&getter, &instance).unwrap();
    assert!(reflector.unchecked_cast::<bool>(value).unwrap());

    // The flag belongs to the object it was set on.
    let fresh = m.store.declared_field(m.fields, "privateField").unwrap();
    assert!(reflector.unreflect_getter(&fresh).is_err());
}

#[test]
fn final_fields_need_an_accessible_field_to_be_written() {
    let (reflector, m) = reflector();
    let mut constant = m.store.declared_field(m.fields, "constant").unwrap();

    assert!(reflector.unreflect_getter(&constant).is_ok());
    assert_eq!(
        reflector.unreflect_setter(&constant).unwrap_err(),
        denied(&format!("final field {INVOKE}.Fields.constant"), &test_lookup())
    );

    constant.set_accessible(true);
    let setter = reflector.unreflect_setter(&constant).unwrap();
    let mut instance = Fields::default();
    reflector
        .invoke_setter(&setter, &mut instance, Box::new(7))
        .unwrap();
    assert_eq!(instance.constant, 7);
}

#[test]
fn wrong_receivers_and_values_are_internal_failures() {
    let (reflector, m) = reflector();
    let field = m.store.declared_field(m.fields, "publicField").unwrap();
    let getter = reflector.unreflect_getter(&field).unwrap();
    let setter = reflector.unreflect_setter(&field).unwrap();

    let err = reflector.invoke_getter(&getter, &greeter()).unwrap_err();
    assert!(matches!(err, ReflectionError::InternalInvocation(_)), "{err:?}");

    let err = reflector
        .invoke_setter(&setter, &mut Fields::default(), Box::new("yes"))
        .unwrap_err();
    assert!(matches!(err, ReflectionError::InternalInvocation(_)), "{err:?}");
}

#[test]
fn instance_methods_see_their_receiver() {
    let (reflector, m) = reflector();
    let greet = m
        .store
        .declared_method(m.greeter, "greet", &[m.string.clone()])
        .unwrap();
    let rename = m
        .store
        .declared_method(m.greeter, "rename", &[m.string.clone()])
        .unwrap();
    let greet = reflector.unreflect(&greet).unwrap();
    let rename = reflector.unreflect(&rename).unwrap();
    assert_eq!(greet.arity(), 1);
    assert!(!greet.is_static());

    let mut receiver = greeter();
    let value = reflector
        .invoke(&greet, &mut receiver, vec![Box::new("Ada".to_string())])
        .unwrap();
    assert_eq!(reflector.unchecked_cast::<String>(value).unwrap(), "Hi, Ada");

    reflector
        .invoke(&rename, &mut receiver, vec![Box::new("Hello".to_string())])
        .unwrap();
    assert_eq!(receiver.greeting, "Hello");

    let err = reflector.invoke(&greet, &mut receiver, vec![]).unwrap_err();
    assert!(matches!(err, ReflectionError::InternalInvocation(_)), "{err:?}");
    let err = reflector
        .invoke(&greet, &mut Fields::default(), vec![Box::new("Ada".to_string())])
        .unwrap_err();
    assert!(matches!(err, ReflectionError::InternalInvocation(_)), "{err:?}");
}

#[test]
fn static_and_instance_handles_are_not_interchangeable() {
    let (reflector, m) = reflector();
    let default = m
        .store
        .declared_method(m.greeter, "defaultGreeting", &[])
        .unwrap();
    let default = reflector.unreflect(&default).unwrap();
    assert!(default.is_static());

    let value = reflector.invoke_static(&default, vec![]).unwrap();
    assert_eq!(reflector.unchecked_cast::<String>(value).unwrap(), "Hello");
    let err = reflector.invoke(&default, &mut greeter(), vec![]).unwrap_err();
    assert!(matches!(err, ReflectionError::InternalInvocation(_)), "{err:?}");

    let fail = m.store.declared_method(m.greeter, "fail", &[]).unwrap();
    let fail = reflector.unreflect(&fail).unwrap();
    let err = reflector.invoke_static(&fail, vec![]).unwrap_err();
    assert!(matches!(err, ReflectionError::InternalInvocation(_)), "{err:?}");
}

#[test]
fn varargs_methods_collect_trailing_arguments() {
    let (reflector, m) = reflector();
    let params = [m.string.clone(), Type::Array(Box::new(m.string.clone()))];
    let greet_all = m
        .store
        .declared_method(m.greeter, "greetAll", &params)
        .unwrap();
    let greet_all = reflector.unreflect(&greet_all).unwrap();
    assert!(greet_all.is_varargs());

    let mut receiver = greeter();
    let names = |names: &[&str]| -> Vec<Value> {
        names
            .iter()
            .map(|name| Box::new(name.to_string()) as Value)
            .collect()
    };
    let call = |receiver: &mut Greeter, args: Vec<Value>| {
        let value = reflector
            .invoke_with_arguments(&greet_all, receiver, args)
            .unwrap();
        reflector.unchecked_cast::<String>(value).unwrap()
    };

    let mut args = names(&[" & "]);
    args.extend(names(&["Ada", "Grace", "Edsger"]));
    assert_eq!(call(&mut receiver, args), "Hi, Ada & Grace & Edsger");
    assert_eq!(call(&mut receiver, names(&[" & "])), "Hi, ");

    let prepared: Vec<Value> = vec![
        Box::new(", ".to_string()),
        Box::new(names(&["Ada", "Alan"])),
    ];
    assert_eq!(call(&mut receiver, prepared), "Hi, Ada, Alan");

    // Plain invoke does not collect anything.
    let err = reflector
        .invoke(&greet_all, &mut receiver, names(&[" ", "Ada", "Alan"]))
        .unwrap_err();
    assert!(matches!(err, ReflectionError::InternalInvocation(_)), "{err:?}");
}

#[test]
fn failures_raised_by_bodies_are_classified() {
    let (reflector, m) = reflector();
    let handle = |name: &str| {
        let method = m.store.declared_method(m.greeter, name, &[]).unwrap();
        reflector.unreflect(&method).unwrap()
    };

    let err = reflector
        .invoke(&handle("fail"), &mut greeter(), vec![])
        .unwrap_err();
    assert_eq!(err, ReflectionError::Runtime("greeting rejected".to_string()));

    let err = reflector
        .invoke(&handle("load"), &mut greeter(), vec![])
        .unwrap_err();
    assert_eq!(
        err,
        ReflectionError::InternalInvocation(format!(
            "{INVOKE}.Greeter.load: greetings file is missing"
        ))
    );
}

#[test]
fn private_methods_need_an_accessible_method_or_a_nestmate_lookup() {
    let (reflector, m) = reflector();
    let mut secret = m.store.declared_method(m.greeter, "secret", &[]).unwrap();

    assert_eq!(
        reflector.unreflect(&secret).unwrap_err(),
        denied(&format!("private method {INVOKE}.Greeter.secret"), &test_lookup())
    );

    reflector.set_lookup(Lookup::in_class(format!("{INVOKE}.Greeter")));
    assert!(reflector.unreflect(&secret).is_ok());

    reflector.set_lookup(test_lookup());
    secret.set_accessible(true);
    let handle = reflector.unreflect(&secret).unwrap();
    let value = reflector.invoke(&handle, &mut greeter(), vec![]).unwrap();
    assert_eq!(reflector.unchecked_cast::<i32>(value).unwrap(), 42);
}
