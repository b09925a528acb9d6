//! Collision-free output naming for one batch run.
//!
//! The first unit asking for `<stem>.<ext>` gets it unchanged. Later units that
//! collide get `<stem>.conflicting_name.NNNN.<ext>` with a per-base counter
//! running from 0001 to 9999. Names are compared case-insensitively so the plan
//! behaves the same on case-folding filesystems.

use crate::error::UnitError;
use crate::formats::TargetFormat;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const CONFLICT_MARKER: &str = "conflicting_name";
pub const MAX_CONFLICT_SUFFIX: u32 = 9999;

#[derive(Debug)]
pub struct OutputNamePlan {
    output_dir: PathBuf,
    check_disk: bool,
    counters: HashMap<String, u32>,
    taken: HashSet<String>,
}

impl OutputNamePlan {
    /// With `check_disk`, names already present in `output_dir` count as taken.
    pub fn new(output_dir: &Path, check_disk: bool) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            check_disk,
            counters: HashMap::new(),
            taken: HashSet::new(),
        }
    }

    /// Marks input files that live in the output directory as taken, so no
    /// unit can ever write over an input.
    pub fn reserve_inputs<'a, I>(&mut self, inputs: I)
    where
        I: IntoIterator<Item = &'a PathBuf>,
    {
        for input in inputs {
            if input.parent() == Some(self.output_dir.as_path()) {
                if let Some(name) = input.file_name() {
                    self.taken.insert(name.to_string_lossy().to_lowercase());
                }
            }
        }
    }

    /// Current suffix counter of a base name, 0 when it never collided.
    pub fn counter(&self, base: &str) -> u32 {
        self.counters.get(&base.to_lowercase()).copied().unwrap_or(0)
    }

    pub fn resolve(&mut self, input: &Path, format: TargetFormat) -> Result<PathBuf, UnitError> {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let ext = format.extension();
        let base = format!("{}.{}", stem, ext);

        if !self.is_taken(&base) {
            return Ok(self.claim(base));
        }

        let key = base.to_lowercase();
        let mut counter = self.counters.get(&key).copied().unwrap_or(0);
        let candidate = loop {
            counter += 1;
            if counter > MAX_CONFLICT_SUFFIX {
                self.counters.insert(key, MAX_CONFLICT_SUFFIX);
                return Err(UnitError::NameSpaceExhausted { base });
            }
            let candidate = format!("{}.{}.{:04}.{}", stem, CONFLICT_MARKER, counter, ext);
            if !self.is_taken(&candidate) {
                break candidate;
            }
        };

        tracing::debug!(base = %base, resolved = %candidate, "Output name conflict resolved");
        self.counters.insert(key, counter);
        Ok(self.claim(candidate))
    }

    fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(&name.to_lowercase())
            || (self.check_disk && self.output_dir.join(name).exists())
    }

    fn claim(&mut self, name: String) -> PathBuf {
        let path = self.output_dir.join(&name);
        self.taken.insert(name.to_lowercase());
        path
    }
}
