//! Engine behaviour against a recording backend:
//! build caching, failure semantics, exit status passthrough and
//! contract verification.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use picopypi_common::error::{PicopypiError, Result};
use picopypi_image::ImageDefinition;
use picopypi_image::registry::ImageCatalog;
use picopypi_runtime::backend::{BuildRequest, ContainerBackend, ProbeRequest};
use picopypi_runtime::engine::{BuildOutcome, Engine};
use picopypi_runtime::inspect::ImageInspection;
use picopypi_runtime::process::CommandOutput;
use picopypi_runtime::run::RunSpec;

#[derive(Default)]
struct Recorded {
    builds: Vec<BuildRequest>,
    runs: Vec<RunSpec>,
    probes: Vec<ProbeRequest>,
}

struct RecordingBackend {
    recorded: Arc<Mutex<Recorded>>,
    fail_build: bool,
    image_missing: bool,
    exit_code: i32,
    user: &'static str,
}

impl RecordingBackend {
    fn new(recorded: Arc<Mutex<Recorded>>) -> Self {
        Self {
            recorded,
            fail_build: false,
            image_missing: false,
            exit_code: 0,
            user: "builder",
        }
    }
}

impl ContainerBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn build(&self, request: &BuildRequest) -> Result<()> {
        self.recorded.lock().unwrap().builds.push(request.clone());
        if self.fail_build {
            return Err(PicopypiError::CommandFailed {
                program: "recording".into(),
                code: 1,
            });
        }
        Ok(())
    }

    fn run(&self, spec: &RunSpec) -> Result<i32> {
        self.recorded.lock().unwrap().runs.push(spec.clone());
        Ok(self.exit_code)
    }

    fn inspect(&self, tag: &str) -> Result<ImageInspection> {
        if self.image_missing {
            return Err(PicopypiError::NotFound {
                kind: "image",
                id: tag.to_string(),
            });
        }
        let fingerprint = self
            .recorded
            .lock()
            .unwrap()
            .builds
            .last()
            .map(|b| b.fingerprint.clone())
            .unwrap_or_default();
        let json = format!(
            r#"[{{"Id": "sha256:feed", "Os": "linux", "Architecture": "arm", "Variant": "v7",
                "Config": {{
                    "User": "{}",
                    "Env": ["DEBIAN_FRONTEND=noninteractive", "CI=1"],
                    "WorkingDir": "/home/builder",
                    "Entrypoint": ["/usr/bin/python3", "/entrypoint.py"],
                    "Volumes": {{"/home/builder/repos": {{}}}},
                    "Labels": {{
                        "org.opencontainers.image.base.name": "quay.io/pypa/manylinux_2_31_armv7l",
                        "org.opencontainers.image.base.digest": "sha256:3d1bb16c69d0acafcb90fdbaa5e1b9a2d6634089006d76e2427ca6cdae136be0",
                        "io.picopypi.definition.sha256": "{}"
                    }}
                }}}}]"#,
            self.user, fingerprint
        );
        ImageInspection::from_json(&json)
    }

    fn probe(&self, request: &ProbeRequest) -> Result<CommandOutput> {
        self.recorded.lock().unwrap().probes.push(request.clone());
        Ok(CommandOutput {
            stdout: format!("{0}\n/home/builder\nbuilder:builder 755\nbuilder:builder\n", self.user),
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

fn setup(dir: &Path, backend: RecordingBackend) -> (Engine, ImageDefinition) {
    let script = dir.join("build_armv7l.py");
    std::fs::write(&script, "print('build')\n").expect("write script");
    let definition = ImageDefinition::armv7l(&script).expect("definition");
    let catalog = ImageCatalog::open(&dir.join("data")).expect("catalog");
    (Engine::with_backend(Box::new(backend), catalog), definition)
}

#[test]
fn build_registers_image_and_sends_context() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let (engine, def) = setup(dir.path(), RecordingBackend::new(recorded.clone()));

    let outcome = engine.build(&def, "picopypi-builder:armv7l", false).expect("build");
    assert!(matches!(outcome, BuildOutcome::Built(_)));

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.builds.len(), 1);
    assert_eq!(recorded.builds[0].platform, "linux/arm/v7");
    assert!(!recorded.builds[0].context.is_empty());
    assert!(engine
        .catalog()
        .find("picopypi-builder:armv7l")
        .expect("find")
        .is_some());
}

#[test]
fn unchanged_definition_is_not_rebuilt() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let (engine, def) = setup(dir.path(), RecordingBackend::new(recorded.clone()));

    let _ = engine.build(&def, "img", false).expect("first");
    let second = engine.build(&def, "img", false).expect("second");
    assert!(matches!(second, BuildOutcome::UpToDate(_)));

    let _ = engine.build(&def, "img", true).expect("forced");
    assert_eq!(recorded.lock().unwrap().builds.len(), 2);
}

#[test]
fn image_missing_from_engine_is_rebuilt() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let backend = RecordingBackend {
        image_missing: true,
        ..RecordingBackend::new(recorded.clone())
    };
    let (engine, def) = setup(dir.path(), backend);

    let _ = engine.build(&def, "img", false).expect("first");
    let second = engine.build(&def, "img", false).expect("second");
    assert!(matches!(second, BuildOutcome::Built(_)));
    assert_eq!(recorded.lock().unwrap().builds.len(), 2);
}

#[test]
fn changed_script_is_rebuilt() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let (engine, def) = setup(dir.path(), RecordingBackend::new(recorded.clone()));

    let first = engine.build(&def, "img", false).expect("first");
    std::fs::write(dir.path().join("build_armv7l.py"), "print('changed')\n").expect("rewrite");
    let second = engine.build(&def, "img", false).expect("second");

    assert!(matches!(second, BuildOutcome::Built(_)));
    assert_ne!(first.entry().fingerprint, second.entry().fingerprint);
    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.builds.len(), 2);
    assert_eq!(recorded.builds[1].fingerprint, second.entry().fingerprint);
}

#[test]
fn failed_build_registers_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let backend = RecordingBackend {
        fail_build: true,
        ..RecordingBackend::new(recorded)
    };
    let (engine, def) = setup(dir.path(), backend);

    assert!(engine.build(&def, "img", false).is_err());
    assert!(engine.catalog().list().expect("list").is_empty());
}

#[test]
fn missing_script_fails_before_engine() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let (engine, _) = setup(dir.path(), RecordingBackend::new(recorded.clone()));
    let def = ImageDefinition::armv7l(dir.path().join("absent.py")).expect("definition");

    assert!(matches!(
        engine.build(&def, "img", false),
        Err(PicopypiError::NotFound { .. })
    ));
    assert!(recorded.lock().unwrap().builds.is_empty());
}

#[test]
fn run_returns_entrypoint_exit_status() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let backend = RecordingBackend {
        exit_code: 42,
        ..RecordingBackend::new(recorded.clone())
    };
    let (engine, def) = setup(dir.path(), backend);

    let spec = RunSpec::new("img", def.platform(), def.repos_dir()).with_args(["--help"]);
    assert_eq!(engine.run(&spec).expect("run"), 42);
    assert_eq!(recorded.lock().unwrap().runs[0].args, ["--help"]);
}

#[test]
fn run_without_volume_still_launches() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let (engine, def) = setup(dir.path(), RecordingBackend::new(recorded.clone()));

    let spec = RunSpec::new("img", def.platform(), def.repos_dir());
    assert_eq!(engine.run(&spec).expect("run"), 0);
    assert!(recorded.lock().unwrap().runs[0].host_repos.is_none());
}

#[test]
fn verify_passes_for_conforming_image() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let (engine, def) = setup(dir.path(), RecordingBackend::new(recorded.clone()));

    let report = engine.verify(&def, "img", true).expect("verify");
    assert!(report.passed(), "{:?}", report.failures().collect::<Vec<_>>());
    assert_eq!(recorded.lock().unwrap().probes.len(), 1);
}

#[test]
fn verify_flags_root_identity() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let backend = RecordingBackend {
        user: "root",
        ..RecordingBackend::new(recorded)
    };
    let (engine, def) = setup(dir.path(), backend);

    let report = engine.verify(&def, "img", true).expect("verify");
    let failed: Vec<_> = report.failures().map(|c| c.property.as_str()).collect();
    assert_eq!(failed, ["user", "runtime user"]);
}
