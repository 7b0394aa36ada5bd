use tracing::{debug, error, warn};

use crate::backend::{Backend, ProgramId};
use crate::error::StereoError;
use crate::mode::Mode;
use crate::template::{ghostbust_token, ProgramTemplate};

/// Identity of one compiled composition program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub mode: Mode,
    pub ghostbust: bool,
}

impl ProgramKey {
    pub fn new(mode: Mode, ghostbust: bool) -> Self {
        Self { mode, ghostbust }
    }

    pub fn label(&self) -> String {
        format!(
            "{} / {}",
            self.mode.shader_token(),
            ghostbust_token(self.ghostbust)
        )
    }
}

/// Compiled composition programs keyed by (mode, ghostbust).
///
/// Entries are kept in least-recently-used order. With the default capacity of
/// one, switching keys recompiles on every switch. The evicted program is only
/// destroyed after its replacement compiled. A failed compile or link is
/// terminal: every later request reports [`StereoError::Unavailable`] with the
/// captured log and nothing is retried.
#[derive(Debug)]
pub struct ShaderVariantCache {
    template: ProgramTemplate,
    capacity: usize,
    entries: Vec<(ProgramKey, ProgramId)>,
    compiles: u64,
    failure: Option<String>,
}

impl ShaderVariantCache {
    pub fn new(template: ProgramTemplate, capacity: usize) -> Self {
        Self {
            template,
            capacity: capacity.max(1),
            entries: Vec::new(),
            compiles: 0,
            failure: None,
        }
    }

    pub fn template(&self) -> &ProgramTemplate {
        &self.template
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of successful compilations performed by this cache.
    pub fn compile_count(&self) -> u64 {
        self.compiles
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_resident(&self, key: ProgramKey) -> bool {
        self.entries.iter().any(|(resident, _)| *resident == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get<B: Backend>(
        &mut self,
        backend: &mut B,
        key: ProgramKey,
    ) -> Result<ProgramId, StereoError> {
        if let Some(log) = &self.failure {
            return Err(StereoError::Unavailable { log: log.clone() });
        }

        if let Some(position) = self.entries.iter().position(|(resident, _)| *resident == key) {
            let entry = self.entries.remove(position);
            self.entries.push(entry);
            return Ok(entry.1);
        }

        let label = key.label();
        debug!(program = %label, resident = self.entries.len(), "compiling composition program");
        let source = self.template.instantiate(key.mode, key.ghostbust);
        let compiled = match backend.compile_program(&label, &source) {
            Ok(compiled) => compiled,
            Err(err) => {
                let log = err.shader_log().unwrap_or_default().to_string();
                error!(
                    program = %label,
                    error = %err,
                    "composition program failed; stereo output disabled"
                );
                self.failure = Some(log);
                return Err(err);
            }
        };
        if let Some(diagnostic) = compiled.diagnostic.as_deref() {
            warn!(program = %label, %diagnostic, "composition program compiled with warnings");
        }

        self.compiles += 1;
        self.entries.push((key, compiled.id));
        while self.entries.len() > self.capacity {
            let (evicted, program) = self.entries.remove(0);
            debug!(program = %evicted.label(), "evicting composition program");
            backend.destroy_program(program);
        }
        Ok(compiled.id)
    }

    /// Changes the number of resident programs, evicting the least recently
    /// used ones beyond the new capacity.
    pub fn set_capacity<B: Backend>(&mut self, backend: &mut B, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            let (_, program) = self.entries.remove(0);
            backend.destroy_program(program);
        }
    }

    pub fn release<B: Backend>(&mut self, backend: &mut B) {
        for (_, program) in self.entries.drain(..) {
            backend.destroy_program(program);
        }
    }
}
