//! Port-signature enforcement (§8 property 8): `module.connect` rejects a
//! request/service pair whose argument/return/handshake shape doesn't
//! match, grounded on [`vulsim_engine::module::ModuleLibrary::connect`]'s
//! `PortSignature::matches` check.

use vulsim_engine::operation::{Dispatcher, OperationRegistry};
use vulsim_engine::project::Project;

use crate::common::request;

fn sig(args: &str, rets: &str, handshake: bool) -> String {
    format!(r#"{{"args":{args},"rets":{rets},"handshake":{handshake}}}"#)
}

fn setup_two_modules() -> Project {
    let registry = OperationRegistry::with_builtins();
    let dispatcher = Dispatcher::new(&registry);
    let mut project = Project::new("p".into(), vec![]);
    let resp = dispatcher.do_operation(&mut project, &request("module.add", &[("name", "Top")]));
    assert_eq!(resp.code, 0);
    let resp = dispatcher.do_operation(&mut project, &request("module.add", &[("name", "Leaf")]));
    assert_eq!(resp.code, 0);
    let resp = dispatcher.do_operation(
        &mut project,
        &request("module.instance.set", &[("owner", "Top"), ("instance_name", "leaf"), ("module_name", "Leaf")]),
    );
    assert_eq!(resp.code, 0);
    project
}

#[test]
fn matching_signatures_connect() {
    let registry = OperationRegistry::with_builtins();
    let dispatcher = Dispatcher::new(&registry);
    let mut project = setup_two_modules();

    let args = r#"[["a","u32"]]"#;
    let resp = dispatcher.do_operation(
        &mut project,
        &request(
            "module.reqserv.add",
            &[("owner", "Top"), ("kind", "request"), ("name", "req"), ("signature", &sig(args, "[]", false))],
        ),
    );
    assert_eq!(resp.code, 0);
    let resp = dispatcher.do_operation(
        &mut project,
        &request(
            "module.reqserv.add",
            &[("owner", "Leaf"), ("kind", "service"), ("name", "serv"), ("signature", &sig(args, "[]", false))],
        ),
    );
    assert_eq!(resp.code, 0);

    let resp = dispatcher.do_operation(
        &mut project,
        &request(
            "module.connect",
            &[
                ("owner", "Top"),
                ("src_instance", "__top__"),
                ("src_port", "req"),
                ("dst_instance", "leaf"),
                ("dst_port", "serv"),
            ],
        ),
    );
    assert_eq!(resp.code, 0, "identical signatures must be allowed to connect");
}

#[test]
fn mismatched_signatures_rejected() {
    let registry = OperationRegistry::with_builtins();
    let dispatcher = Dispatcher::new(&registry);
    let mut project = setup_two_modules();

    let resp = dispatcher.do_operation(
        &mut project,
        &request(
            "module.reqserv.add",
            &[
                ("owner", "Top"),
                ("kind", "request"),
                ("name", "req"),
                ("signature", &sig(r#"[["a","u32"]]"#, "[]", false)),
            ],
        ),
    );
    assert_eq!(resp.code, 0);
    let resp = dispatcher.do_operation(
        &mut project,
        &request(
            "module.reqserv.add",
            &[("owner", "Leaf"), ("kind", "service"), ("name", "serv"), ("signature", &sig("[]", "[]", false))],
        ),
    );
    assert_eq!(resp.code, 0);

    let resp = dispatcher.do_operation(
        &mut project,
        &request(
            "module.connect",
            &[
                ("owner", "Top"),
                ("src_instance", "__top__"),
                ("src_port", "req"),
                ("dst_instance", "leaf"),
                ("dst_port", "serv"),
            ],
        ),
    );
    assert_ne!(resp.code, 0, "a request expecting an arg must not connect to a service taking none");
}
