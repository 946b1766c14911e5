use hlblang::ast::{ObjType, OptionNs};
use hlblang::builtin::Registry;

#[test]
fn every_allowed_name_has_a_signature() {
    let reg = Registry::get();
    for first in [true, false] {
        for typ in [ObjType::Fs, ObjType::Str] {
            for name in reg.allowed_names(typ, first) {
                // string blocks share the fs op namespace for non-first
                // calls; those names sign under fs
                let sig = reg
                    .signature(typ, name)
                    .or_else(|| reg.signature(ObjType::Fs, name));
                assert!(sig.is_some(), "{typ} op {name} has no signature");
            }
        }
    }
}

#[test]
fn every_namespace_member_has_a_signature_and_vice_versa() {
    let reg = Registry::get();
    for ns in OptionNs::ALL {
        let members = reg.namespace_members(ns);
        for name in &members {
            assert!(
                reg.signature(ObjType::Option(Some(ns)), name).is_some(),
                "option::{} member {name} has no signature",
                ns.as_str()
            );
        }
    }
    for (ns, table) in reg.option_tables() {
        let members = reg.namespace_members(ns);
        for name in table.keys() {
            assert!(
                members.contains(name),
                "option::{} signature {name} not a member",
                ns.as_str()
            );
        }
    }
}

#[test]
fn sources_and_ops_are_disjoint() {
    let reg = Registry::get();
    for src in reg.sources(ObjType::Fs) {
        assert!(!reg.ops().contains(src), "{src} is both source and op");
    }
}

#[test]
fn common_options_are_in_every_namespace() {
    let reg = Registry::get();
    for ns in OptionNs::ALL {
        assert!(
            reg.namespace_members(ns).contains(&"no-cache"),
            "option::{} lacks no-cache",
            ns.as_str()
        );
    }
}

#[test]
fn known_signatures() {
    let reg = Registry::get();
    let image = reg.signature(ObjType::Fs, "image").unwrap();
    assert_eq!(image.len(), 1);
    assert_eq!(image[0].typ, ObjType::Str);

    let mkfile = reg.signature(ObjType::Fs, "mkfile").unwrap();
    assert_eq!(mkfile.len(), 3);
    assert_eq!(mkfile[1].typ, ObjType::Int);

    let format = reg.signature(ObjType::Str, "format").unwrap();
    assert!(format[1].variadic);

    let mount = reg
        .signature(ObjType::Option(Some(OptionNs::Run)), "mount")
        .unwrap();
    assert_eq!(mount[0].typ, ObjType::Fs);
}

#[test]
fn enum_keyword_sets() {
    let reg = Registry::get();
    assert_eq!(reg.enum_values("network").unwrap(), ["unset", "host", "none"]);
    assert_eq!(reg.enum_values("security").unwrap(), ["sandbox", "insecure"]);
    assert_eq!(
        reg.enum_values("cache").unwrap(),
        ["shared", "private", "locked"]
    );
    assert!(reg.enum_values("nope").is_none());
}

#[test]
fn breakpoint_is_a_debug_builtin() {
    let reg = Registry::get();
    assert!(reg.is_debug("breakpoint"));
    assert!(!reg.is_source(ObjType::Fs, "breakpoint"));
}
