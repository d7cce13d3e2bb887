//! Driver runs against a temporary database layout.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde_json::json;
use tempfile::TempDir;
use trapgen::config::{ConfigOverrides, ExtractorConfig};
use trapgen::driver::{Driver, FileResult, TrapOutcome};
use trapgen::error::DriverError;
use trapgen_core::output::relative_to_root;
use trapgen_core::Program;

const SOURCE: &str = "package app\nfun helper() {}\n";

/// A source file on disk plus the database directories around it.
struct Fixture {
    dir: TempDir,
    source: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("src/app/Main.kt");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, SOURCE).unwrap();
        fs::create_dir_all(dir.path().join("db")).unwrap();
        Fixture { dir, source }
    }

    /// `fun helper(): lib.Helper {}` in package `app`, where `lib.Helper`
    /// comes from a dependency.
    fn program(&self) -> Program {
        let document = json!({
            "files": [{
                "path": self.source.to_string_lossy(),
                "package": "app",
                "declarations": [2],
                "lines": [0, 12]
            }],
            "declarations": [
                {"parent": {"package": "kotlin"}, "origin": "external_stub",
                 "kind": {"class": {"name": "Unit"}}},
                {"parent": {"package": "lib"}, "origin": "external_stub",
                 "kind": {"class": {"name": "Helper"}}},
                {"parent": {"file": 0}, "span": {"start": 12, "end": 27},
                 "kind": {"function": {
                    "name": "helper",
                    "return_type": {"simple": {"classifier": {"class": 1}}},
                    "body": {"span": {"start": 25, "end": 27}, "statements": []}
                 }}}
            ]
        });
        Program::from_json_str(&document.to_string()).unwrap()
    }

    fn config(&self, check_trap_identical: bool) -> ExtractorConfig {
        let overrides = ConfigOverrides {
            invocation_trap: Some(self.invocation_trap()),
            trap_dir: Some(self.trap_dir()),
            source_archive_dir: Some(self.dir.path().join("db/src")),
            check_trap_identical,
            ..Default::default()
        };
        ExtractorConfig::resolve_with(overrides, |_| None).unwrap()
    }

    fn invocation_trap(&self) -> PathBuf {
        self.dir.path().join("db/invocation.trap")
    }

    fn trap_dir(&self) -> PathBuf {
        self.dir.path().join("db/trap")
    }

    fn relative_source(&self) -> PathBuf {
        relative_to_root(&self.source.to_string_lossy())
    }

    fn trap_path(&self) -> PathBuf {
        let mut path = self.trap_dir().join(self.relative_source()).into_os_string();
        path.push(".trap");
        PathBuf::from(path)
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn read_gz(path: &Path) -> String {
    let mut text = String::new();
    GzDecoder::new(fs::File::open(path).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    text
}

// ============================================================================
// First extraction
// ============================================================================

#[test]
fn test_run_writes_trap_archive_and_invocation() {
    let fx = Fixture::new();
    let program = fx.program();
    let config = fx.config(false);
    let summary = Driver::new(&config, &program).run().unwrap();

    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.files[0].result, FileResult::Ok);
    assert_eq!(summary.files[0].outcome, Some(TrapOutcome::Written));
    assert_eq!(summary.failed_files(), 0);

    let trap = fs::read_to_string(fx.trap_path()).unwrap();
    assert!(trap.starts_with("// Generated by trapgen "));
    assert!(trap.contains("// Part of invocation "));
    assert!(trap.contains("=@\"class;app.MainKt\""));
    assert!(trap.contains(",\"helper\",\"helper()\","));

    let archived = fs::read_to_string(fx.dir.path().join("db/src").join(fx.relative_source()));
    assert_eq!(archived.unwrap(), SOURCE);

    let invocation = fs::read_to_string(fx.invocation_trap()).unwrap();
    assert!(invocation.contains("compilation_started(#compilation)\n"));
    let compiling = invocation
        .lines()
        .find(|l| l.starts_with("compilation_compiling_files(#compilation,0,#"))
        .unwrap();
    let file_label = compiling.trim_end_matches(')').rsplit(',').next().unwrap();
    let files_fact = format!(
        "files({},\"{}\",\"Main\",\"kt\",0)",
        file_label,
        fx.source.to_string_lossy()
    );
    assert!(invocation.contains(&files_fact));
    assert!(invocation.contains("containerparent("));
    assert!(invocation.contains("compilation_compiling_files_completed(#compilation,0,0)\n"));
    assert!(invocation.contains("compilation_compiler_times(#compilation,-1.0,"));
    assert!(invocation.contains("compilation_finished(#compilation,-1.0,"));

    let class_trap = fx.trap_dir().join("classes/lib/Helper.members.trap.gz");
    assert!(read_gz(&class_trap).contains("\"Helper\""));
    assert_eq!(summary.files[0].external.failed, 0);
    assert!(summary.files[0].external.extracted >= 1);

    // Only the trap and its set file remain next to each other.
    let trap_dir = fx.trap_path().parent().unwrap().to_path_buf();
    assert_eq!(file_names(&trap_dir), vec!["Main.kt.set", "Main.kt.trap"]);
    let set = fs::read_to_string(trap_dir.join("Main.kt.set")).unwrap();
    assert!(set.contains("Helper.members.trap.gz"));
}

#[test]
fn test_missing_source_is_not_archived() {
    let fx = Fixture::new();
    fs::remove_file(&fx.source).unwrap();
    let program = fx.program();
    let config = fx.config(false);
    let summary = Driver::new(&config, &program).run().unwrap();

    assert_eq!(summary.files[0].outcome, Some(TrapOutcome::Written));
    assert!(fx.trap_path().exists());
    assert!(!fx.dir.path().join("db/src").join(fx.relative_source()).exists());
}

#[test]
fn test_unwritable_invocation_trap_is_fatal() {
    let fx = Fixture::new();
    let program = fx.program();
    let mut config = fx.config(false);
    config.invocation_trap = fx.dir.path().join("missing/dir/invocation.trap");
    let err = Driver::new(&config, &program).run().unwrap_err();
    assert!(matches!(err, DriverError::Io { .. }));
    assert!(!fx.trap_path().exists());
}

// ============================================================================
// Re-extraction
// ============================================================================

#[test]
fn test_existing_trap_is_kept_without_check() {
    let fx = Fixture::new();
    let program = fx.program();
    let config = fx.config(false);
    Driver::new(&config, &program).run().unwrap();
    fs::write(fx.trap_path(), "// sentinel\n").unwrap();

    let summary = Driver::new(&config, &program).run().unwrap();
    assert_eq!(summary.files[0].outcome, Some(TrapOutcome::Kept));
    assert_eq!(fs::read_to_string(fx.trap_path()).unwrap(), "// sentinel\n");

    let invocation = fs::read_to_string(fx.invocation_trap()).unwrap();
    assert_eq!(invocation.matches("compilation_started(#compilation)").count(), 2);
}

#[test]
fn test_check_discards_identical_trap() {
    let fx = Fixture::new();
    let program = fx.program();
    Driver::new(&fx.config(false), &program).run().unwrap();
    let before = fs::read_to_string(fx.trap_path()).unwrap();

    let summary = Driver::new(&fx.config(true), &program).run().unwrap();
    assert_eq!(summary.files[0].outcome, Some(TrapOutcome::Identical));
    assert_eq!(fs::read_to_string(fx.trap_path()).unwrap(), before);
    let trap_dir = fx.trap_path().parent().unwrap().to_path_buf();
    assert!(file_names(&trap_dir).iter().all(|n| !n.ends_with(".different")));

    // The dependency class was current and not extracted again.
    assert_eq!(summary.files[0].external.extracted, 0);
    assert!(summary.files[0].external.up_to_date >= 1);
}

#[test]
fn test_check_keeps_different_trap() {
    let fx = Fixture::new();
    let program = fx.program();
    Driver::new(&fx.config(false), &program).run().unwrap();
    let mut changed = fs::read_to_string(fx.trap_path()).unwrap();
    changed.push_str("extra(#1)\n");
    fs::write(fx.trap_path(), &changed).unwrap();

    let summary = Driver::new(&fx.config(true), &program).run().unwrap();
    let Some(TrapOutcome::Different(different)) = &summary.files[0].outcome else {
        panic!("expected a differing trap, got {:?}", summary.files[0].outcome);
    };
    let name = different.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("Main.kt.trap."));
    assert!(name.ends_with(".trap.different"));
    assert!(!fs::read_to_string(different).unwrap().contains("extra(#1)"));
    assert_eq!(fs::read_to_string(fx.trap_path()).unwrap(), changed);
}
