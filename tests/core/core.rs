use std::fs;
use tempfile::tempdir;
use tidepool::core::config::AgentConfig;
use tidepool::core::context::ExecutionContext;
use tidepool::core::dispatcher::Dispatcher;
use tidepool::core::error::{AgentError, ErrorClass, TaskError};
use tidepool::core::external_action::ExternalActionRule;
use tidepool::core::params::{ParamValue, ResolvedParams};
use tidepool::core::registry::{Capability, OperationDescriptor, Outcome, Registry, no_params};
use tidepool::core::sandbox::Sandbox;

fn dispatcher_for(root: &std::path::Path) -> Dispatcher {
    Dispatcher::new(AgentConfig::for_data_dir(root)).expect("dispatcher")
}

#[test]
fn sandbox_accepts_every_root_spelling() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    let sb = Sandbox::new(root, "data").expect("sandbox");

    let physical = root.join("x.txt");
    for raw in [
        "/data/x.txt",
        "./data/x.txt",
        "data/x.txt",
        "x.txt",
        "/data/sub/../x.txt",
        physical.to_str().expect("utf8 path"),
    ] {
        let p = sb.resolve(raw).unwrap_or_else(|e| panic!("{} rejected: {}", raw, e));
        assert_eq!(p.relative(), "x.txt", "{}", raw);
        assert!(p.as_path().starts_with(sb.root()));
    }
}

#[test]
fn sandbox_rejects_escapes() {
    let tmp = tempdir().expect("tempdir");
    let sb = Sandbox::new(tmp.path(), "data").expect("sandbox");

    for raw in [
        "/etc/passwd",
        "/data/../etc/passwd",
        "../secret.txt",
        "./data/../../x",
        "/database/x.txt",
        "",
    ] {
        assert!(sb.resolve(raw).is_err(), "{} should be rejected", raw);
    }
}

#[test]
fn unrecognized_task_is_client_input() {
    let tmp = tempdir().expect("tempdir");
    let d = dispatcher_for(tmp.path());
    let err = d.run("please water the plants").unwrap_err();
    assert!(matches!(err, AgentError::UnrecognizedTask));
    assert_eq!(err.class(), ErrorClass::ClientInput);
    assert_eq!(err.class().http_status(), 400);
}

#[test]
fn gold_ticket_task_beats_generic_sql() {
    let tmp = tempdir().expect("tempdir");
    let d = dispatcher_for(tmp.path());
    let plan = d
        .plan("Run a SQL query on ticket-sales.db to total Gold ticket sales")
        .expect("plan");
    assert_eq!(plan.operation_id, "A10");
    assert!(plan.shadowed.contains(&"B5"));
}

#[test]
fn datagen_plan_carries_exact_email_only() {
    let tmp = tempdir().expect("tempdir");
    let d = dispatcher_for(tmp.path());
    let plan = d
        .plan(
            "Install uv (if required) and run https://raw.githubusercontent.com/x/y/main/datagen.py \
             with `Jane.Doe@Example.com` as the only argument",
        )
        .expect("plan");
    assert_eq!(plan.operation_id, "A1");
    assert_eq!(plan.params.len(), 1);
    assert_eq!(
        plan.params.get("email"),
        Some(&ParamValue::Text("Jane.Doe@Example.com".to_string()))
    );
    assert_eq!(plan.capabilities, vec!["subprocess"]);
}

#[test]
fn datagen_without_email_is_extraction_error() {
    let tmp = tempdir().expect("tempdir");
    let d = dispatcher_for(tmp.path());
    let err = d.run("run datagen.py please").unwrap_err();
    assert!(matches!(err, AgentError::ExtractionError { ref operation_id, .. } if operation_id == "A1"));
}

#[cfg(unix)]
#[test]
fn datagen_runs_allowlisted_interpreter() {
    let tmp = tempdir().expect("tempdir");
    let project = tmp.path().join("project");
    let data = project.join("data");
    fs::create_dir_all(&data).expect("mkdir");
    fs::write(project.join("datagen.py"), "echo \"$1\" > data/requested-by.txt\n").expect("script");

    let mut config = AgentConfig::for_data_dir(&data);
    config.project_dir = project.clone();
    config.tools.python = "sh".to_string();
    config.tools.rules = vec![ExternalActionRule {
        capability: "script_exec".to_string(),
        allowed_bins: vec!["sh".to_string()],
    }];
    let d = Dispatcher::new(config).expect("dispatcher");
    d.run("Run datagen.py with `ops@example.com` as the only argument")
        .expect("run");
    assert_eq!(
        fs::read_to_string(data.join("requested-by.txt")).expect("output"),
        "ops@example.com\n"
    );
}

#[test]
fn datagen_interpreter_outside_allowlist_fails() {
    let tmp = tempdir().expect("tempdir");
    let project = tmp.path().to_path_buf();
    fs::write(project.join("datagen.py"), "print('hi')\n").expect("script");

    let mut config = AgentConfig::for_data_dir(project.join("data"));
    config.project_dir = project;
    config.tools.python = "perl".to_string();
    let d = Dispatcher::new(config).expect("dispatcher");
    let err = d
        .run("run datagen.py with `a@b.co`")
        .unwrap_err();
    assert!(matches!(err, AgentError::OperationFailed { .. }), "{:?}", err);
}

/// Install an executable `git` stand-in that logs its arguments to `log`.
#[cfg(unix)]
fn fake_git(bin_dir: &std::path::Path, log: &std::path::Path, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;
    fs::create_dir_all(bin_dir).expect("mkdir");
    let git = bin_dir.join("git");
    fs::write(
        &git,
        format!("#!/bin/sh\necho \"$*\" >> '{}'\n{}", log.display(), body),
    )
    .expect("script");
    fs::set_permissions(&git, fs::Permissions::from_mode(0o755)).expect("chmod");
    git
}

#[cfg(unix)]
#[test]
fn clone_wipes_only_repo_temp_and_commits_new_file() {
    let tmp = tempdir().expect("tempdir");
    let data = tmp.path().join("data");
    fs::create_dir_all(data.join("repo_temp")).expect("mkdir");
    fs::write(data.join("repo_temp/stale.txt"), "old clone").expect("write");
    fs::write(data.join("keep.txt"), "sibling").expect("write");
    let log = tmp.path().join("git.log");
    let git = fake_git(
        &tmp.path().join("bin"),
        &log,
        "if [ \"$1\" = clone ]; then mkdir -p \"$4\" && echo seed > \"$4/README\"; fi\n",
    );

    let mut config = AgentConfig::for_data_dir(&data);
    config.tools.git = git.display().to_string();
    let d = Dispatcher::new(config).expect("dispatcher");
    let plan = d
        .plan(r#"Clone the git repo https://example.com/acme/notes.git and commit with "Add notes""#)
        .expect("plan");
    assert_eq!(plan.operation_id, "B4");
    assert!(plan.capabilities.contains(&"network"));

    d.run(r#"Clone the git repo https://example.com/acme/notes.git and commit with "Add notes""#)
        .expect("run");

    assert!(!data.join("repo_temp/stale.txt").exists());
    assert!(data.join("repo_temp/README").exists());
    assert_eq!(
        fs::read_to_string(data.join("repo_temp/new_file.txt")).expect("new file"),
        "This is a new file.\n"
    );
    assert_eq!(fs::read_to_string(data.join("keep.txt")).expect("sibling"), "sibling");

    let calls: Vec<String> = fs::read_to_string(&log)
        .expect("git log")
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(calls.len(), 3, "{:?}", calls);
    assert_eq!(
        calls[0],
        format!("clone -- https://example.com/acme/notes.git {}", data.join("repo_temp").display())
    );
    assert_eq!(calls[1], "add new_file.txt");
    assert!(calls[2].ends_with("commit -m Add notes"), "{}", calls[2]);
}

#[cfg(unix)]
#[test]
fn hung_clone_is_killed_at_tool_deadline() {
    let tmp = tempdir().expect("tempdir");
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).expect("mkdir");
    let git = fake_git(&tmp.path().join("bin"), &tmp.path().join("git.log"), "exec sleep 30\n");

    let mut config = AgentConfig::for_data_dir(&data);
    config.tools.git = git.display().to_string();
    config.tools.timeout_secs = 1;
    let d = Dispatcher::new(config).expect("dispatcher");
    let started = std::time::Instant::now();
    let err = d
        .run("clone the repo https://example.com/slow.git")
        .unwrap_err();
    match &err {
        AgentError::OperationFailed { operation_id, cause } => {
            assert_eq!(operation_id, "B4");
            assert!(cause.contains("timed out"), "{}", cause);
        }
        other => panic!("expected OperationFailed, got {:?}", other),
    }
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
    assert!(!data.join("repo_temp/new_file.txt").exists());
}

#[test]
fn missing_input_is_missing_resource() {
    let tmp = tempdir().expect("tempdir");
    let d = dispatcher_for(tmp.path());
    let err = d.run("Sort the array of contacts in /data/contacts.json").unwrap_err();
    assert!(matches!(err, AgentError::MissingResource(_)), "{:?}", err);
    assert_eq!(err.class().exit_code(), 3);
}

#[test]
fn out_of_sandbox_parameter_is_rejected_before_execution() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("notes.md"), "# hi\n").expect("write");
    let d = dispatcher_for(tmp.path());
    let err = d
        .run("Convert the markdown in /data/notes.md to HTML and save it to /etc/notes.html")
        .unwrap_err();
    assert!(matches!(err, AgentError::PathViolation(_)), "{:?}", err);
    assert!(!std::path::Path::new("/etc/notes.html").exists());
}

#[test]
fn read_interface_distinguishes_violation_from_missing() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("hello.txt"), "hello").expect("write");
    fs::write(tmp.path().join("blob.bin"), [0xff, 0xfe, 0x00]).expect("write");
    let d = dispatcher_for(tmp.path());

    assert_eq!(d.read("/data/hello.txt").expect("read"), "hello");
    assert_eq!(d.read("hello.txt").expect("read"), "hello");
    assert!(matches!(d.read("/etc/passwd"), Err(AgentError::PathViolation(_))));
    assert!(matches!(d.read("/data/missing.txt"), Err(AgentError::MissingResource(_))));
    assert!(matches!(d.read("/data"), Err(AgentError::MissingResource(_))));
    assert!(matches!(d.read("/data/blob.bin"), Err(AgentError::OperationFailed { .. })));
}

fn exploding(_ctx: &ExecutionContext<'_>, _p: &ResolvedParams) -> Result<Outcome, TaskError> {
    panic!("handler blew up")
}

fn sneaky_writer(ctx: &ExecutionContext<'_>, _p: &ResolvedParams) -> Result<Outcome, TaskError> {
    let target = ctx.path("sneaky.txt")?;
    ctx.write_output(&target, b"nope")?;
    Ok(Outcome::new("wrote"))
}

fn custom_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(OperationDescriptor {
            id: "T1",
            summary: "panics",
            matches: |t| t.contains("explode"),
            extract: no_params,
            handler: exploding,
            capabilities: &[Capability::Read],
        })
        .expect("register");
    registry
        .register(OperationDescriptor {
            id: "T2",
            summary: "writes without declaring it",
            matches: |t| t.contains("sneak"),
            extract: no_params,
            handler: sneaky_writer,
            capabilities: &[Capability::Read],
        })
        .expect("register");
    registry
}

#[test]
fn handler_panic_becomes_internal_error() {
    let tmp = tempdir().expect("tempdir");
    let d = Dispatcher::with_registry(AgentConfig::for_data_dir(tmp.path()), custom_registry())
        .expect("dispatcher");
    let err = d.run("explode now").unwrap_err();
    match &err {
        AgentError::InternalError { cause } => assert!(cause.contains("handler blew up")),
        other => panic!("expected InternalError, got {:?}", other),
    }
    assert_eq!(err.to_string(), "Internal error");
    assert_eq!(err.class().http_status(), 500);
}

#[test]
fn undeclared_capability_is_denied() {
    let tmp = tempdir().expect("tempdir");
    let d = Dispatcher::with_registry(AgentConfig::for_data_dir(tmp.path()), custom_registry())
        .expect("dispatcher");
    let err = d.run("sneak a file in").unwrap_err();
    match err {
        AgentError::OperationFailed { operation_id, cause } => {
            assert_eq!(operation_id, "T2");
            assert!(cause.contains("write"), "{}", cause);
        }
        other => panic!("expected OperationFailed, got {:?}", other),
    }
    assert!(!tmp.path().join("sneaky.txt").exists());
}

#[test]
fn builtin_catalog_order_is_precedence() {
    let registry = Registry::builtin();
    let ids: Vec<_> = registry.all().iter().map(|d| d.id).collect();
    assert_eq!(
        ids,
        vec![
            "A1", "A2", "A3", "A4", "A5", "A6", "A7", "A8", "A9", "A10", "B3", "B4", "B5", "B6",
            "B7"
        ]
    );
}

#[test]
fn config_file_and_env_overlay() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("tidepool.toml");
    fs::write(
        &path,
        "mount = \"data\"\ndate_parsing = \"strict\"\n[remote]\ntimeout_secs = 5\n",
    )
    .expect("write");
    let mut config = AgentConfig::load(Some(&path)).expect("load");
    config.apply_env_from(|key| match key {
        "TIDEPOOL_DATA_DIR" => Some(tmp.path().display().to_string()),
        "AIPROXY_TOKEN" => Some("secret-token".to_string()),
        _ => None,
    });
    assert_eq!(config.remote.timeout_secs, 5);
    assert_eq!(config.data_dir.as_deref(), Some(tmp.path()));
    assert!(!format!("{:?}", config).contains("secret-token"));
}
