//! Ordered application of options with joined failure reporting.

use tracing::{debug, debug_span};

use crate::errors::{ValidationErrors, ValidationResult};
use crate::options::BoxedOption;
use crate::validator::Validator;

/// Applies every option to `target` in order.
///
/// Nothing short-circuits: each option runs and all of their failures are
/// returned together. `None` entries are skipped. Options that change the
/// registration (the clock override) only affect the options after them.
pub fn validate(target: &mut dyn Validator, opts: &[Option<BoxedOption>]) -> ValidationResult {
    let variant = target.variant();
    let _span = debug_span!("validate", variant).entered();
    let mut errors = ValidationErrors::new();
    let mut applied = 0usize;

    for opt in opts.iter().flatten() {
        applied += 1;
        if let Err(failures) = opt.validate(target) {
            debug!(
                variant,
                option = %opt,
                failures = failures.len(),
                "validation option failed"
            );
            errors.extend(failures);
        }
    }

    debug!(
        variant,
        options = applied,
        failures = errors.len(),
        "validation finished"
    );
    errors.into_result()
}

/// A reusable, ordered option list.
///
/// Built once (typically from a [`crate::config::ValidatorConfig`]) and then
/// applied to any number of registrations. A pipeline holds no per-run
/// state, so it can be shared between threads; a single registration must
/// not be validated by two runs at once.
#[derive(Default)]
pub struct Pipeline {
    options: Vec<Option<BoxedOption>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `opt` and returns the pipeline.
    pub fn with(mut self, opt: BoxedOption) -> Self {
        self.options.push(Some(opt));
        self
    }

    pub fn push(&mut self, opt: BoxedOption) {
        self.options.push(Some(opt));
    }

    /// Appends a slot that may be empty; empty slots are skipped.
    pub fn push_slot(&mut self, opt: Option<BoxedOption>) {
        self.options.push(opt);
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn apply(&self, target: &mut dyn Validator) -> ValidationResult {
        validate(target, &self.options)
    }

    /// Descriptions of the populated slots, in order.
    pub fn describe(&self) -> Vec<String> {
        self.options
            .iter()
            .flatten()
            .map(|opt| opt.describe())
            .collect()
    }
}

impl From<Vec<BoxedOption>> for Pipeline {
    fn from(options: Vec<BoxedOption>) -> Self {
        options.into_iter().collect()
    }
}

impl From<Vec<Option<BoxedOption>>> for Pipeline {
    fn from(options: Vec<Option<BoxedOption>>) -> Self {
        Self { options }
    }
}

impl FromIterator<BoxedOption> for Pipeline {
    fn from_iter<T: IntoIterator<Item = BoxedOption>>(iter: T) -> Self {
        Self {
            options: iter.into_iter().map(Some).collect(),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}
