//! What converter and parser factories built on top of the reflector rely on.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sdx_reflect::{ReflectionError, Reflector};
use sdx_types::{
    take_arg, ClassDef, ClassId, ClassKind, ConstructorDef, MethodDef, NativeConstructor,
    NativeMethod, Thrown, Type, TypeStore, ACC_PUBLIC, ACC_STATIC,
};

struct StringToLength;

#[derive(Debug, PartialEq)]
struct Port(u16);

struct Registry {
    store: Arc<TypeStore>,
    string: ClassId,
    integer: ClassId,
    converter: ClassId,
    string_to_length: ClassId,
    port: ClassId,
}

fn registry() -> Registry {
    let mut store = TypeStore::default();
    let string = store.add_class(ClassDef::new("java.lang.String", ClassKind::Class));
    let integer = store.add_class(ClassDef::new("java.lang.Integer", ClassKind::Class));

    let source = store.add_type_param("S", vec![]);
    let target = store.add_type_param("T", vec![]);
    let converter = store.add_class(ClassDef {
        type_params: vec![source, target],
        ..ClassDef::new("com.example.convert.Converter", ClassKind::Interface)
    });
    let string_to_length = store.add_class(ClassDef {
        interfaces: vec![Type::class(
            converter,
            vec![Type::raw(string), Type::raw(integer)],
        )],
        constructors: vec![ConstructorDef {
            params: vec![],
            access_flags: ACC_PUBLIC,
            body: Some(NativeConstructor::nullary(|| StringToLength)),
        }],
        ..ClassDef::new("com.example.convert.StringToLength", ClassKind::Class)
    });
    store.bind_native::<StringToLength>(string_to_length);

    let port = store.add_class(ClassDef {
        methods: vec![MethodDef {
            name: "valueOf".to_string(),
            params: vec![Type::raw(string)],
            return_type: None,
            access_flags: ACC_PUBLIC | ACC_STATIC,
            body: Some(NativeMethod::static_fn(|args| {
                let text = args
                    .into_iter()
                    .next()
                    .ok_or_else(|| Thrown::mismatch::<String>("port text"))?;
                let text: String = take_arg(text, "port text")?;
                text.parse()
                    .map(Port)
                    .map_err(|err| Thrown::unchecked(format!("invalid port {text:?}: {err}")))
            })),
        }],
        ..ClassDef::new("com.example.parse.Port", ClassKind::Class)
    });
    store.bind_native::<Port>(port);

    Registry {
        store: Arc::new(store),
        string,
        integer,
        converter,
        string_to_length,
        port,
    }
}

#[test]
fn converters_are_created_and_report_their_endpoints() {
    let r = registry();
    let reflector = Reflector::with_store_loader(Arc::clone(&r.store));

    let creator = reflector.get_creator(r.string_to_length).unwrap();
    let converter = reflector.invoke_creator(&creator, vec![]).unwrap();

    assert_eq!(
        reflector.resolve_binding(&*converter, r.converter, 0),
        Ok(Type::raw(r.string))
    );
    assert_eq!(
        reflector.resolve_binding_named(&*converter, "com.example.convert.Converter", 1),
        Ok(Type::raw(r.integer))
    );
    assert!(reflector
        .unchecked_cast::<StringToLength>(converter)
        .is_ok());

    let found: Vec<_> = reflector
        .scan_instantiable_subtypes("com.example.convert", r.converter)
        .collect();
    assert_eq!(found, vec![r.string_to_length]);
}

#[test]
fn parsers_call_static_factories() {
    let r = registry();
    let reflector = Reflector::with_store_loader(Arc::clone(&r.store));
    let value_of = r
        .store
        .declared_method(r.port, "valueOf", &[Type::raw(r.string)])
        .unwrap();
    let value_of = reflector.unreflect(&value_of).unwrap();

    let port = reflector
        .invoke_static(&value_of, vec![Box::new("8080".to_string())])
        .unwrap();
    assert_eq!(reflector.types().class_of(&*port), Some(r.port));
    assert_eq!(reflector.unchecked_cast::<Port>(port).unwrap(), Port(8080));

    let err = reflector
        .invoke_static(&value_of, vec![Box::new("http".to_string())])
        .unwrap_err();
    assert_eq!(
        err,
        ReflectionError::Runtime(
            "invalid port \"http\": invalid digit found in string".to_string()
        )
    );
}
