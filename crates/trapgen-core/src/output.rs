//! Where trap files and their sidecars live on disk.
//!
//! Class traps are stored under the trap directory as
//! `classes/<binary/name>.members.trap.gz`, next to two sidecars:
//!
//! - `.dep`: the class traps this one refers to, one relative path per line
//! - `.metadata`: `fingerprint,<sha256>` of the class declaration, used to
//!   decide whether an existing trap is still current
//!
//! A `.set` file per source file lists every trap created while draining
//! that source's external classes.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{ExtractError, ExtractResult};
use crate::ir::{DeclId, Program};
use crate::trap::TrapWriter;
use crate::VERSION;

/// Directory prefix of binary paths for classes with no known origin.
pub const UNKNOWN_BINARY_LOCATION: &str = "/!unknown-binary-location/";

const CLASS_TRAP_SUFFIX: &str = ".members.trap.gz";

/// Path of the binary class file `class` was loaded from.
pub fn class_binary_path(program: &Program, class: DeclId) -> String {
    if let Some(path) = program.class(class).and_then(|c| c.binary_path.clone()) {
        return path;
    }
    let binary_name = program
        .binary_name(class)
        .unwrap_or_else(|| class.to_string());
    format!(
        "{}{}.class",
        UNKNOWN_BINARY_LOCATION,
        binary_name.replace('.', "/")
    )
}

/// `path` with its root and any `.`/`..` components dropped, so it can be
/// joined under an output directory.
pub fn relative_to_root(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

/// The two comment lines every trap starts with.
pub fn write_trap_header<W: Write>(tw: &mut TrapWriter<W>, invocation: &str) {
    tw.write_comment(&format!("Generated by trapgen {}", VERSION));
    tw.write_comment(&format!("Part of invocation {}", invocation));
}

// ============================================================================
// Class traps
// ============================================================================

/// Paths and identity of one class trap about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTrap {
    pub class: DeclId,
    pub trap_path: PathBuf,
    pub dep_path: PathBuf,
    pub metadata_path: PathBuf,
    pub fingerprint: String,
    /// Binary path the trap's file label is keyed on.
    pub binary_path: String,
}

/// Whether a class trap needs writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassPlan {
    UpToDate,
    Write(ClassTrap),
}

/// The trap directory of one run, and the traps created in it.
#[derive(Debug)]
pub struct TrapOutput {
    trap_dir: PathBuf,
    created: Vec<PathBuf>,
}

impl TrapOutput {
    pub fn new(trap_dir: impl Into<PathBuf>) -> Self {
        TrapOutput {
            trap_dir: trap_dir.into(),
            created: Vec::new(),
        }
    }

    pub fn trap_dir(&self) -> &Path {
        &self.trap_dir
    }

    /// Class traps written since the last [`TrapOutput::write_trap_set`].
    pub fn created(&self) -> &[PathBuf] {
        &self.created
    }

    /// `classes/a/b/C$D.members.trap.gz` for binary name `a.b.C$D`.
    pub fn class_trap_relative_path(binary_name: &str) -> PathBuf {
        let mut path = PathBuf::from("classes");
        path.push(format!("{}{}", binary_name.replace('.', "/"), CLASS_TRAP_SUFFIX));
        path
    }

    /// Stable digest of the class declaration and its members.
    pub fn fingerprint(program: &Program, class: DeclId) -> ExtractResult<String> {
        let decl = program
            .decl(class)
            .ok_or(ExtractError::DanglingDecl(class))?;
        let mut hasher = Sha256::new();
        hasher.update(program.binary_name(class).unwrap_or_default().as_bytes());
        hasher.update(b"\x00");
        hasher.update(serde_json::to_vec(decl)?);
        if let Some(c) = program.class(class) {
            for member in &c.declarations {
                if let Some(member_decl) = program.decl(*member) {
                    hasher.update(b"\x00");
                    hasher.update(serde_json::to_vec(member_decl)?);
                }
            }
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Decide whether `class` needs a fresh trap. A stale trap and its
    /// sidecars are removed.
    pub fn plan_class(&self, program: &Program, class: DeclId) -> ExtractResult<ClassPlan> {
        let binary_name = program
            .binary_name(class)
            .ok_or_else(|| ExtractError::invalid_ir(format!("{} is not a class", class)))?;
        let trap_path = self
            .trap_dir
            .join(Self::class_trap_relative_path(&binary_name));
        let dep_path = sidecar_path(&trap_path, ".dep");
        let metadata_path = sidecar_path(&trap_path, ".metadata");
        let fingerprint = Self::fingerprint(program, class)?;
        let expected = format!("fingerprint,{}", fingerprint);

        if trap_path.exists() {
            match fs::read_to_string(&metadata_path) {
                Ok(existing) if existing.trim_end() == expected => {
                    return Ok(ClassPlan::UpToDate);
                }
                Ok(_) => {
                    tracing::debug!("Class trap {} is stale", trap_path.display());
                    for stale in [&trap_path, &dep_path, &metadata_path] {
                        remove_if_exists(stale)?;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!(
                        "Class trap {} has no metadata; rewriting",
                        trap_path.display()
                    );
                }
                Err(e) => return Err(ExtractError::io(&metadata_path, e)),
            }
        }

        Ok(ClassPlan::Write(ClassTrap {
            class,
            trap_path,
            dep_path,
            metadata_path,
            fingerprint,
            binary_path: class_binary_path(program, class),
        }))
    }

    /// Record a fully written class trap: its `.dep` and `.metadata`
    /// sidecars, and its place in the current set.
    pub fn commit(
        &mut self,
        program: &Program,
        trap: &ClassTrap,
        dependencies: &[DeclId],
    ) -> ExtractResult<()> {
        let mut deps = String::new();
        for dep in dependencies {
            if *dep == trap.class {
                continue;
            }
            if let Some(name) = program.binary_name(*dep) {
                deps.push_str(&Self::class_trap_relative_path(&name).to_string_lossy());
                deps.push('\n');
            }
        }
        atomic_write(&trap.dep_path, deps.as_bytes())
            .map_err(|e| ExtractError::io(&trap.dep_path, e))?;
        let metadata = format!("fingerprint,{}\n", trap.fingerprint);
        atomic_write(&trap.metadata_path, metadata.as_bytes())
            .map_err(|e| ExtractError::io(&trap.metadata_path, e))?;
        self.created.push(trap.trap_path.clone());
        Ok(())
    }

    /// Write `<trap_dir>/<source>.set` listing the traps created since the
    /// previous set, and start a new one.
    pub fn write_trap_set(&mut self, source_path: &str) -> ExtractResult<PathBuf> {
        let mut path = self.trap_dir.join(relative_to_root(source_path));
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".set");
        path.set_file_name(name);

        let mut content = String::new();
        for created in std::mem::take(&mut self.created) {
            content.push_str(&created.to_string_lossy());
            content.push('\n');
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
        }
        atomic_write(&path, content.as_bytes()).map_err(|e| ExtractError::io(&path, e))?;
        Ok(path)
    }
}

/// `C.members.trap.gz` → `C.members<suffix>`.
fn sidecar_path(trap_path: &Path, suffix: &str) -> PathBuf {
    let text = trap_path.to_string_lossy();
    let base = text.strip_suffix(".trap.gz").unwrap_or(&text);
    PathBuf::from(format!("{}{}", base, suffix))
}

fn remove_if_exists(path: &Path) -> ExtractResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ExtractError::io(path, e)),
    }
}

/// Write content to a file atomically using temp + rename, so readers see
/// either the old or the new content.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(content)?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_support::*;
    use crate::ir::*;
    use tempfile::TempDir;

    fn program_with_external() -> (Program, DeclId) {
        let mut b = ProgramBuilder::new("A.kt", "p", "");
        let lib = b.external_class("lib.util", "Helper");
        (b.build(), lib)
    }

    #[test]
    fn test_class_trap_relative_path() {
        assert_eq!(
            TrapOutput::class_trap_relative_path("a.b.C$D"),
            PathBuf::from("classes/a/b/C$D.members.trap.gz")
        );
    }

    #[test]
    fn test_relative_to_root() {
        assert_eq!(relative_to_root("/home/u/src/A.kt"), PathBuf::from("home/u/src/A.kt"));
        assert_eq!(relative_to_root("../x/./A.kt"), PathBuf::from("x/A.kt"));
    }

    #[test]
    fn test_unknown_binary_location() {
        let (program, lib) = program_with_external();
        assert_eq!(
            class_binary_path(&program, lib),
            "/!unknown-binary-location/lib/util/Helper.class"
        );
    }

    #[test]
    fn test_header() {
        let mut tw = TrapWriter::new(Vec::new());
        write_trap_header(&mut tw, "/tmp/inv.trap");
        let out = String::from_utf8(tw.into_inner().unwrap()).unwrap();
        assert!(out.starts_with("// Generated by trapgen "));
        assert!(out.ends_with("// Part of invocation /tmp/inv.trap\n"));
    }

    #[test]
    fn test_plan_commit_and_up_to_date() {
        let dir = TempDir::new().unwrap();
        let (program, lib) = program_with_external();
        let mut output = TrapOutput::new(dir.path());

        let ClassPlan::Write(trap) = output.plan_class(&program, lib).unwrap() else {
            panic!("fresh class should be written");
        };
        assert_eq!(
            trap.trap_path,
            dir.path().join("classes/lib/util/Helper.members.trap.gz")
        );
        assert_eq!(trap.dep_path, dir.path().join("classes/lib/util/Helper.members.dep"));

        fs::create_dir_all(trap.trap_path.parent().unwrap()).unwrap();
        fs::write(&trap.trap_path, b"").unwrap();
        output.commit(&program, &trap, &[lib]).unwrap();
        assert_eq!(output.created(), &[trap.trap_path.clone()]);
        assert_eq!(fs::read_to_string(&trap.dep_path).unwrap(), "");
        let metadata = fs::read_to_string(&trap.metadata_path).unwrap();
        assert_eq!(metadata, format!("fingerprint,{}\n", trap.fingerprint));

        assert_eq!(output.plan_class(&program, lib).unwrap(), ClassPlan::UpToDate);
    }

    #[test]
    fn test_changed_fingerprint_removes_stale_trap() {
        let dir = TempDir::new().unwrap();
        let (program, lib) = program_with_external();
        let output = TrapOutput::new(dir.path());
        let ClassPlan::Write(trap) = output.plan_class(&program, lib).unwrap() else {
            panic!("fresh class should be written");
        };
        fs::create_dir_all(trap.trap_path.parent().unwrap()).unwrap();
        fs::write(&trap.trap_path, b"old").unwrap();
        fs::write(&trap.metadata_path, "fingerprint,0000\n").unwrap();

        assert!(matches!(
            output.plan_class(&program, lib).unwrap(),
            ClassPlan::Write(_)
        ));
        assert!(!trap.trap_path.exists());
        assert!(!trap.metadata_path.exists());
    }

    #[test]
    fn test_trap_set_lists_created_traps() {
        let dir = TempDir::new().unwrap();
        let (program, lib) = program_with_external();
        let mut output = TrapOutput::new(dir.path());
        let ClassPlan::Write(trap) = output.plan_class(&program, lib).unwrap() else {
            panic!("fresh class should be written");
        };
        fs::create_dir_all(trap.trap_path.parent().unwrap()).unwrap();
        output.commit(&program, &trap, &[]).unwrap();

        let set = output.write_trap_set("/src/p/A.kt").unwrap();
        assert_eq!(set, dir.path().join("src/p/A.kt.set"));
        let listed = fs::read_to_string(&set).unwrap();
        assert_eq!(listed, format!("{}\n", trap.trap_path.display()));
        assert!(output.created().is_empty());
    }
}
