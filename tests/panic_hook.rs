use std::process::Command;

use topokit::{install_panic_hook, ErrorBoundary};

const CHILD_ENV: &str = "TOPOKIT_PANIC_HOOK_CHILD";

/// Re-run one test of this binary in a child process with the hook installed
fn run_child(test: &str) -> std::process::ExitStatus {
    Command::new(std::env::current_exe().unwrap())
        .args([test, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .status()
        .unwrap()
}

#[test]
fn test_panic_in_spawned_task_terminates() {
    if std::env::var_os(CHILD_ENV).is_some() {
        install_panic_hook();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let task = tokio::spawn(async { panic!("render loop failed") });
            let _ = task.await;
            // Reached only if the hook let the process live
            std::process::exit(0);
        });
        return;
    }

    let status = run_child("test_panic_in_spawned_task_terminates");
    assert_eq!(status.code(), Some(101));
}

#[test]
fn test_panic_inside_boundary_is_survived() {
    if std::env::var_os(CHILD_ENV).is_some() {
        install_panic_hook();
        let mut boundary = ErrorBoundary::new();
        let rendered = boundary.render(|| panic!("bad chart data"));
        assert!(boundary.has_error());
        assert!(rendered.contains("[Retry]"));
        return;
    }

    let status = run_child("test_panic_inside_boundary_is_survived");
    assert!(status.success());
}
