use std::{
    ffi::OsStr,
    fs, io,
    os::unix::fs::PermissionsExt,
    sync::{Arc, Mutex},
};

use level_launcher::{
    cli::{self, CliOutput},
    launcher::{parse_level, LaunchPolicy, Launcher, ALLOWED_LEVELS},
    lib::errors::{ElevationStep, LaunchError, LaunchFailure, UntrustedFile},
};

use crate::common::{policy_for, FakeRoot, ScriptFixture};

#[tokio::test]
async fn default_level_runs_script_and_mirrors_exit_code() {
    let fixture = ScriptFixture::new("exit 7", 0o755);
    let launcher = Launcher::new(fixture.policy(), FakeRoot::succeeding());

    let request = parse_level(None).expect("default level");
    let outcome = launcher.run(request).await.expect("launch succeeds");

    assert_eq!(outcome.exit_code, 7);
    assert_eq!(outcome.status.code(), Some(7));
    assert_eq!(fixture.recorded_args(), vec!["3".to_string()]);
    assert_eq!(launcher.backend().calls(), 3, "groups, gid and uid each set once");
}

#[tokio::test]
async fn every_allowed_level_reaches_the_script_verbatim() {
    for level in ALLOWED_LEVELS {
        let fixture = ScriptFixture::new("exit 0", 0o755);
        let launcher = Launcher::new(fixture.policy(), FakeRoot::succeeding());

        let request = parse_level(Some(OsStr::new(level))).expect("allowed level");
        let outcome = launcher.run(request).await.expect("launch succeeds");

        assert_eq!(outcome.exit_code, 0);
        assert_eq!(fixture.recorded_args(), vec![level.to_string()]);
    }
}

#[tokio::test]
async fn injection_attempt_never_elevates_or_spawns() {
    let fixture = ScriptFixture::new("exit 0", 0o755);
    let backend = FakeRoot::succeeding();

    let exit = cli::run(["level-launcher", "; rm -rf /"], || {
        Ok(Launcher::new(fixture.policy(), &backend))
    })
    .await
    .expect_err("must be rejected");

    assert_eq!(exit.exit_code(), 65);
    let report = exit.error_report().expect("launcher failures carry a report");
    assert_eq!(report.code, "invalid_level");
    assert!(report.before_privileged_action);
    assert_eq!(backend.calls(), 0);
    assert!(!fixture.was_invoked());
}

#[tokio::test]
async fn cli_run_launches_an_allowed_level() {
    let fixture = ScriptFixture::new("exit 4", 0o755);
    let backend = FakeRoot::succeeding();

    let output = cli::run(["level-launcher", "4"], || {
        Ok(Launcher::new(fixture.policy(), &backend))
    })
    .await
    .expect("launch succeeds");

    assert!(matches!(output, CliOutput::Child(_)));
    assert_eq!(output.exit_code(), 4);
    assert_eq!(backend.calls(), 3);
    assert_eq!(fixture.recorded_args(), vec!["4".to_string()]);
}

#[tokio::test]
async fn denied_elevation_never_spawns() {
    let fixture = ScriptFixture::new("exit 0", 0o755);
    let launcher = Launcher::new(fixture.policy(), FakeRoot::denied());

    let request = parse_level(Some(OsStr::new("2"))).expect("allowed level");
    let err = launcher.run(request).await.expect_err("elevation is denied");

    assert!(matches!(
        err,
        LaunchError::PrivilegeEscalationFailed {
            step: ElevationStep::DropGroups,
            ..
        }
    ));
    assert_eq!(err.exit_code(), 77);
    assert!(!fixture.was_invoked());
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer lock")).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn execution_events_carry_the_launch_id() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let fixture = ScriptFixture::new("exit 3", 0o755);
    let launcher = Launcher::new(fixture.policy(), FakeRoot::succeeding());
    let request = parse_level(None).expect("default level");
    let outcome = launcher.run(request).await.expect("launch succeeds");

    let text = logs.text();
    let launch_id = outcome.launch_id.to_string();
    for message in ["Executing target script", "Target script exited unsuccessfully"] {
        let line = text
            .lines()
            .find(|line| line.contains(message))
            .unwrap_or_else(|| panic!("missing {message:?} in logs: {text}"));
        assert!(line.contains(&launch_id), "event outside the launch span: {line}");
    }
}

#[tokio::test]
async fn child_receives_only_the_explicit_environment() {
    let fixture = ScriptFixture::new("exit 0", 0o755);
    let launcher = Launcher::new(fixture.policy(), FakeRoot::succeeding());

    let request = parse_level(None).expect("default level");
    launcher.run(request).await.expect("launch succeeds");

    let env = fixture.recorded_env();
    assert!(env.iter().any(|line| line == "LC_ALL=C"), "env: {env:?}");
    assert!(env.iter().any(|line| line == "HOME=/root"), "env: {env:?}");
    assert!(
        env.iter().any(|line| line.starts_with("PATH=/usr/local/sbin:")),
        "env: {env:?}"
    );
    assert!(
        !env.iter()
            .any(|line| line.starts_with("CARGO_") || line.starts_with("LD_")),
        "ambient variables leaked into the child: {env:?}"
    );
}

#[tokio::test]
async fn missing_target_is_launch_failed_not_found() {
    let dir = tempfile::tempdir().expect("can create temporary directory");
    let policy = policy_for(&dir.path().join("absent.sh"));
    let launcher = Launcher::new(policy, FakeRoot::succeeding());

    let request = parse_level(None).expect("default level");
    let err = launcher.run(request).await.expect_err("target is missing");

    assert!(matches!(
        err,
        LaunchError::LaunchFailed {
            reason: LaunchFailure::NotFound,
            ..
        }
    ));
    assert_eq!(err.exit_code(), 127);
}

#[tokio::test]
async fn non_executable_target_is_refused() {
    let fixture = ScriptFixture::new("exit 0", 0o644);
    let launcher = Launcher::new(fixture.policy(), FakeRoot::succeeding());

    let request = parse_level(None).expect("default level");
    let err = launcher.run(request).await.expect_err("no execute bit");

    assert!(matches!(
        err,
        LaunchError::LaunchFailed {
            reason: LaunchFailure::NotExecutable(_),
            ..
        }
    ));
    assert_eq!(err.exit_code(), 126);
    assert!(!fixture.was_invoked());
}

#[tokio::test]
async fn group_writable_target_is_refused() {
    let fixture = ScriptFixture::new("exit 0", 0o775);
    let launcher = Launcher::new(fixture.policy(), FakeRoot::succeeding());

    let request = parse_level(None).expect("default level");
    let err = launcher.run(request).await.expect_err("writable by group");

    assert!(matches!(
        err,
        LaunchError::LaunchFailed {
            reason: LaunchFailure::Untrusted(_),
            ..
        }
    ));
    assert!(!fixture.was_invoked());
}

#[tokio::test]
async fn target_in_group_writable_directory_is_refused() {
    let fixture = ScriptFixture::new("exit 0", 0o755);
    fs::set_permissions(fixture.dir.path(), fs::Permissions::from_mode(0o775))
        .expect("can chmod fixture directory");
    let launcher = Launcher::new(fixture.policy(), FakeRoot::succeeding());

    let request = parse_level(None).expect("default level");
    let err = launcher.run(request).await.expect_err("directory writable by group");

    assert!(matches!(
        err,
        LaunchError::LaunchFailed {
            reason: LaunchFailure::Untrusted(UntrustedFile::WritableDirectory { .. }),
            ..
        }
    ));
    assert_eq!(err.exit_code(), 126);
    assert!(!fixture.was_invoked());
}

#[tokio::test]
async fn child_killed_by_signal_maps_above_128() {
    let fixture = ScriptFixture::new("kill -TERM $$", 0o755);
    let launcher = Launcher::new(fixture.policy(), FakeRoot::succeeding());

    let request = parse_level(None).expect("default level");
    let outcome = launcher.run(request).await.expect("launch succeeds");

    assert_eq!(outcome.exit_code, 128 + libc::SIGTERM as u8);
    assert!(outcome.status.code().is_none());
}

#[test]
fn policy_rejects_relative_target() {
    let err = LaunchPolicy::new(
        "start.sh".into(),
        level_launcher::launcher::Identity::ROOT,
        Default::default(),
    )
    .expect_err("relative path");
    assert_eq!(err.exit_code(), 126);
}
