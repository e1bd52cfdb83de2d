// tests/service_hooks.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::path::PathBuf;

use driverwatch::service::{DriverService, HostConfig, LOG_FILE_NAME, ServiceOptions};

type TestResult = Result<(), Box<dyn Error>>;

#[cfg(not(windows))]
#[tokio::test]
async fn on_prepare_is_a_noop_off_windows() -> TestResult {
    init_tracing();

    let mut service = DriverService::new(ServiceOptions::default());
    service.on_prepare(&HostConfig::default(), &[]).await?;

    assert!(
        service.supervisor_mut().is_none(),
        "nothing must be spawned on an unsupported platform"
    );

    // on_complete without a session, twice, is fine.
    service.on_complete();
    service.on_complete();
    Ok(())
}

#[test]
fn log_dir_prefers_service_options_over_host_output_dir() {
    init_tracing();

    let mut options = ServiceOptions::default();
    options.log_dir = Some(PathBuf::from("explicit"));
    let service = DriverService::new(options);

    let host = HostConfig {
        output_dir: Some(PathBuf::from("host-out")),
    };
    assert_eq!(service.resolve_log_dir(&host), Some(PathBuf::from("explicit")));
}

#[test]
fn log_dir_falls_back_to_host_output_dir() {
    init_tracing();

    let service = DriverService::new(ServiceOptions::default());
    let host = HostConfig {
        output_dir: Some(PathBuf::from("host-out")),
    };
    assert_eq!(service.resolve_log_dir(&host), Some(PathBuf::from("host-out")));

    assert_eq!(service.resolve_log_dir(&HostConfig::default()), None);
}

#[cfg(unix)]
mod sessions {
    use super::*;

    use driverwatch::errors::{DriverwatchError, StartError};
    use driverwatch::supervisor::SupervisorState;
    use driverwatch_test_utils::fake_driver;

    #[tokio::test]
    async fn prepare_session_starts_driver_and_creates_log() -> TestResult {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let log_dir = dir.path().join("session-logs");

        let options = ServiceOptions {
            supervisor: fake_driver::ready_driver(dir.path()),
            log_dir: Some(log_dir.clone()),
        };
        let mut service = DriverService::new(options);

        service.prepare_session(Some(log_dir.clone())).await?;

        let log_file = log_dir.join(LOG_FILE_NAME);
        assert!(log_file.is_file(), "the fixed-name log file must exist");

        let supervisor = service.supervisor_mut().expect("session holds a supervisor");
        assert_eq!(supervisor.state(), SupervisorState::Running);

        service.on_complete();
        let supervisor = service.supervisor_mut().expect("supervisor is retained");
        assert_eq!(supervisor.state(), SupervisorState::Stopped);

        service.on_complete();
        Ok(())
    }

    #[tokio::test]
    async fn prepare_session_surfaces_start_failures() -> TestResult {
        init_tracing();
        let dir = tempfile::tempdir()?;

        let options = ServiceOptions {
            supervisor: fake_driver::exiting_driver(dir.path(), 2),
            log_dir: None,
        };
        let mut service = DriverService::new(options);

        let err = service
            .prepare_session(None)
            .await
            .expect_err("a driver that dies during startup aborts the session");
        assert!(
            matches!(
                err,
                DriverwatchError::StartError(StartError::ExitedBeforeReady(2))
            ),
            "got {err:?}"
        );
        assert!(service.supervisor_mut().is_none());

        service.on_complete();
        Ok(())
    }
}
