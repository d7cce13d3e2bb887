//! Trap fact writer.
//!
//! A trap file is a sequence of lines:
//!
//! ```text
//! // comment
//! #100=@"class;pkg.C"
//! #101=*
//! classes(#100,"C",#102,#100)
//! ```
//!
//! [`TrapWriter`] owns the [`LabelManager`] for the file it writes, so label
//! definitions and facts always land in the same store. Writes never return
//! errors to the extraction code: the first I/O error is remembered and
//! reported by [`TrapWriter::flush`], which lets extractors keep returning
//! labels instead of threading `Result` through every traversal step.
//!
//! Typed relation writers (`write_classes`, `write_exprs`, ...) live in
//! [`crate::schema`].

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::ir::location::{LineTable, Span};
use crate::label::{Label, LabelManager, Lookup};

/// Quote-double a literal for use inside a trap string.
pub fn escape_trap_string(s: &str) -> String {
    s.replace('"', "\"\"")
}

// ============================================================================
// Arguments
// ============================================================================

/// A value that can appear as a fact argument.
pub trait TrapArg {
    fn fmt_arg(&self, out: &mut String);
}

impl TrapArg for Label {
    fn fmt_arg(&self, out: &mut String) {
        let _ = write!(out, "{}", self);
    }
}

impl TrapArg for str {
    fn fmt_arg(&self, out: &mut String) {
        out.push('"');
        out.push_str(&escape_trap_string(self));
        out.push('"');
    }
}

impl TrapArg for String {
    fn fmt_arg(&self, out: &mut String) {
        self.as_str().fmt_arg(out)
    }
}

macro_rules! numeric_trap_arg {
    ($($t:ty),*) => {
        $(
            impl TrapArg for $t {
                fn fmt_arg(&self, out: &mut String) {
                    let _ = write!(out, "{}", self);
                }
            }
        )*
    };
}

numeric_trap_arg!(i32, i64, u32, usize);

impl TrapArg for f64 {
    fn fmt_arg(&self, out: &mut String) {
        // Debug keeps the fractional part: `-1.0`, not `-1`.
        let _ = write!(out, "{:?}", self);
    }
}

impl<T: TrapArg + ?Sized> TrapArg for &T {
    fn fmt_arg(&self, out: &mut String) {
        (**self).fmt_arg(out)
    }
}

// ============================================================================
// TrapWriter
// ============================================================================

/// Writes facts and label definitions to one trap sink.
pub struct TrapWriter<W: Write> {
    labels: LabelManager,
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> TrapWriter<W> {
    pub fn new(out: W) -> Self {
        Self::with_labels(LabelManager::new(), out)
    }

    pub fn with_labels(labels: LabelManager, out: W) -> Self {
        TrapWriter {
            labels,
            out,
            error: None,
        }
    }

    fn write_line(&mut self, line: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self
            .out
            .write_all(line.as_bytes())
            .and_then(|_| self.out.write_all(b"\n"))
        {
            tracing::error!("trap write failed: {}", e);
            self.error = Some(e);
        }
    }

    /// Append `// text`.
    pub fn write_comment(&mut self, text: &str) {
        self.write_line(&format!("// {}", text));
    }

    /// Append `relation(arg, ...)`.
    pub fn write_fact(&mut self, relation: &str, args: &[&dyn TrapArg]) {
        let mut line = String::with_capacity(relation.len() + 2 + args.len() * 8);
        line.push_str(relation);
        line.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            arg.fmt_arg(&mut line);
        }
        line.push(')');
        self.write_line(&line);
    }

    /// Label for `key`, writing `#N=@"key"` the first time it is seen.
    pub fn label_for(&mut self, key: &str) -> Label {
        self.lookup_label(key).into_label()
    }

    /// Like [`TrapWriter::label_for`] but tells the caller whether the label
    /// was just created, so defining facts can be written exactly once.
    pub fn lookup_label(&mut self, key: &str) -> Lookup {
        let lookup = self.labels.lookup_or_create(key);
        if let Lookup::Created(label) = &lookup {
            let line = format!("{}=@\"{}\"", label, key);
            self.write_line(&line);
        }
        lookup
    }

    /// Label for `key` if it has already been defined in this store.
    pub fn existing_label_for(&self, key: &str) -> Option<Label> {
        self.labels.existing(key)
    }

    /// Label for the source file `path`, writing its `files` and folder
    /// facts the first time it is seen.
    pub fn source_file_label(&mut self, path: &str) -> Label {
        make_file_label(self, path, true)
    }

    /// Allocate an undeduplicated label and write `#N=*`.
    pub fn fresh_label(&mut self) -> Label {
        let label = self.labels.fresh_label();
        let line = format!("{}=*", label);
        self.write_line(&line);
        label
    }

    /// Flush the sink, reporting the first error seen by any earlier write.
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()
    }

    /// Flush and hand back the sink.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.out)
    }

    /// Whether an earlier write failed.
    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }
}

// ============================================================================
// FileTrapWriter
// ============================================================================

/// The file that locations are currently attributed to.
#[derive(Debug, Clone)]
pub struct TrapTarget {
    path: String,
    file_label: Label,
    /// `None` for binary class files, which have no line information.
    lines: Option<LineTable>,
}

impl TrapTarget {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn file_label(&self) -> &Label {
        &self.file_label
    }

    pub fn is_class_file(&self) -> bool {
        self.lines.is_none()
    }
}

/// A [`TrapWriter`] bound to a target file, able to produce locations.
///
/// Dereferences to the underlying [`TrapWriter`], so every relation writer
/// is available directly.
pub struct FileTrapWriter<W: Write> {
    tw: TrapWriter<W>,
    target: TrapTarget,
}

impl<W: Write> Deref for FileTrapWriter<W> {
    type Target = TrapWriter<W>;

    fn deref(&self) -> &Self::Target {
        &self.tw
    }
}

impl<W: Write> DerefMut for FileTrapWriter<W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tw
    }
}

impl<W: Write> FileTrapWriter<W> {
    /// Writer targeting a source file with known line starts. File tables
    /// (`files`, `folders`, `containerparent`) are populated.
    pub fn source(tw: TrapWriter<W>, path: &str, lines: LineTable) -> Self {
        Self::with_target(tw, path, Some(lines), true)
    }

    /// Writer targeting a binary class file; every location is whole-file.
    pub fn class_file(tw: TrapWriter<W>, path: &str) -> Self {
        Self::with_target(tw, path, None, true)
    }

    fn with_target(
        mut tw: TrapWriter<W>,
        path: &str,
        lines: Option<LineTable>,
        populate_file_tables: bool,
    ) -> Self {
        let file_label = make_file_label(&mut tw, path, populate_file_tables);
        FileTrapWriter {
            tw,
            target: TrapTarget {
                path: path.to_string(),
                file_label,
                lines,
            },
        }
    }

    pub fn target(&self) -> &TrapTarget {
        &self.target
    }

    pub fn file_label(&self) -> Label {
        self.target.file_label.clone()
    }

    /// Attribute subsequent locations to another file, returning the current
    /// target so the caller can [`FileTrapWriter::restore`] it.
    pub fn retarget(
        &mut self,
        path: &str,
        lines: Option<LineTable>,
        populate_file_tables: bool,
    ) -> TrapTarget {
        let file_label = make_file_label(&mut self.tw, path, populate_file_tables);
        std::mem::replace(
            &mut self.target,
            TrapTarget {
                path: path.to_string(),
                file_label,
                lines,
            },
        )
    }

    pub fn restore(&mut self, target: TrapTarget) {
        self.target = target;
    }

    /// Location keyed `@"loc,{file},sl,sc,el,ec"`.
    pub fn location_in(
        &mut self,
        file: &Label,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Label {
        let key = format!(
            "loc,{{{}}},{},{},{},{}",
            file, start_line, start_column, end_line, end_column
        );
        let lookup = self.tw.lookup_label(&key);
        if let Lookup::Created(id) = &lookup {
            self.tw.write_locations_default(
                id,
                file,
                start_line,
                start_column,
                end_line,
                end_column,
            );
        }
        lookup.into_label()
    }

    /// `0,0,0,0` location in the target file.
    pub fn whole_file_location(&mut self) -> Label {
        let file = self.target.file_label.clone();
        self.location_in(&file, 0, 0, 0, 0)
    }

    /// Location in the anonymous unknown file.
    pub fn unknown_location(&mut self) -> Label {
        let lookup = self.tw.lookup_label(";sourcefile");
        if let Lookup::Created(id) = &lookup {
            self.tw.write_files(id, "", "", "", 0);
        }
        let file = lookup.into_label();
        self.location_in(&file, 0, 0, 0, 0)
    }

    /// Location of `span` in the target file.
    ///
    /// Start line/column and end line are 1-based; the end column is the
    /// 0-based column of the exclusive end offset, i.e. the 1-based column of
    /// the last character.
    pub fn location(&mut self, span: Span) -> Label {
        let Some(lines) = &self.target.lines else {
            return self.whole_file_location();
        };
        if span.is_undefined() {
            return self.unknown_location();
        }
        let start = span.start.max(0) as u32;
        let end = span.end.max(span.start).max(0) as u32;
        let (sl, sc) = (lines.line_of(start) + 1, lines.column_of(start) + 1);
        let (el, ec) = (lines.line_of(end) + 1, lines.column_of(end));
        let file = self.target.file_label.clone();
        self.location_in(&file, sl, sc, el, ec)
    }

    /// Attach the location of `span` to `entity`.
    pub fn write_span_location(&mut self, entity: &Label, span: Span) -> Label {
        let loc = self.location(span);
        self.tw.write_has_location(entity, &loc);
        loc
    }

    pub fn into_inner(self) -> TrapWriter<W> {
        self.tw
    }
}

/// Label for `path` as a source file, writing its file and folder facts
/// the first time when requested.
fn make_file_label<W: Write>(tw: &mut TrapWriter<W>, path: &str, populate: bool) -> Label {
    let lookup = tw.lookup_label(&format!("{};sourcefile", path));
    if let (Lookup::Created(id), true) = (&lookup, populate) {
        let p = Path::new(path);
        let stem = p
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = p
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        tw.write_files(id, path, &stem, &ext, 0);
        populate_folders(tw, id, p);
    }
    lookup.into_label()
}

fn populate_folders<W: Write>(tw: &mut TrapWriter<W>, file: &Label, path: &Path) {
    let mut child = file.clone();
    for dir in path.ancestors().skip(1) {
        let dir_str = dir.to_string_lossy();
        if dir_str.is_empty() {
            break;
        }
        let lookup = tw.lookup_label(&format!("{};folder", dir_str));
        let created = lookup.is_created();
        let folder = lookup.into_label();
        if created {
            tw.write_folders(&folder, &dir_str);
        }
        tw.write_containerparent(&folder, &child);
        if !created {
            break;
        }
        child = folder;
    }
}

// ============================================================================
// Equivalence
// ============================================================================

/// Compare two traps line by line. Lines may differ only when both are
/// comments; a differing number of lines is never equivalent.
pub fn equivalent_trap<A: BufRead, B: BufRead>(a: A, b: B) -> io::Result<bool> {
    let mut lines_a = a.lines();
    let mut lines_b = b.lines();
    loop {
        match (lines_a.next().transpose()?, lines_b.next().transpose()?) {
            (None, None) => return Ok(true),
            (Some(_), None) | (None, Some(_)) => return Ok(false),
            (Some(la), Some(lb)) => {
                if la != lb && !(la.starts_with("//") && lb.starts_with("//")) {
                    return Ok(false);
                }
            }
        }
    }
}

/// [`equivalent_trap`] over two files on disk.
pub fn equivalent_trap_files(a: &Path, b: &Path) -> io::Result<bool> {
    let fa = io::BufReader::new(std::fs::File::open(a)?);
    let fb = io::BufReader::new(std::fs::File::open(b)?);
    equivalent_trap(fa, fb)
}
