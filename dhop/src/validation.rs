// SPDX-License-Identifier: AGPL-3.0-only

//! Validation harness for the kernel binaries.
//!
//! Validation binaries:
//!   - compare every backend against the generic reference on fixed seeds
//!   - apply thresholds from [`crate::tolerances`], never inline numbers
//!   - exit 0 when all checks pass, 1 otherwise
//!   - print a human summary and, on request, a JSON report
//!
//! Checks are grouped into sections so the summary reads like the run.

use crate::error::DhopError;
use crate::lattice::scalar::Real;
use crate::lattice::spinor::FermionField;
use serde::Serialize;
use std::process;

/// How a check compares `observed` with `bound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// |observed − expected| < tolerance
    Absolute,
    /// |observed − expected| / |expected| < tolerance
    Relative,
    /// observed < bound
    UpperBound,
    /// observed > bound
    LowerBound,
    Boolean,
}

impl std::fmt::Display for CheckMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute => write!(f, "abs"),
            Self::Relative => write!(f, "rel"),
            Self::UpperBound => write!(f, "<"),
            Self::LowerBound => write!(f, ">"),
            Self::Boolean => write!(f, "bool"),
        }
    }
}

/// One recorded check.
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub section: String,
    pub label: String,
    pub passed: bool,
    pub observed: f64,
    /// Expected value, or the bound for one-sided checks.
    pub expected: f64,
    pub tolerance: f64,
    pub mode: CheckMode,
}

/// Serializable outcome of a validation run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport<'a> {
    pub name: &'a str,
    pub passed: usize,
    pub total: usize,
    pub checks: &'a [Check],
}

/// Accumulates checks and turns them into a summary and an exit code.
#[derive(Debug, Default)]
#[must_use]
pub struct ValidationHarness {
    pub name: String,
    section: String,
    pub checks: Vec<Check>,
}

impl ValidationHarness {
    #[must_use = "validation harness must be used to run checks"]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            section: String::new(),
            checks: Vec::new(),
        }
    }

    /// Start a titled group of checks.
    pub fn section(&mut self, title: &str) {
        println!();
        println!("── {title} ──");
        self.section = title.to_string();
    }

    fn push(&mut self, label: &str, passed: bool, observed: f64, expected: f64, tolerance: f64, mode: CheckMode) {
        let icon = if passed { "✓" } else { "✗" };
        println!("  {icon} {label}: {observed:.3e} ({mode} {tolerance:.1e})");
        self.checks.push(Check {
            section: self.section.clone(),
            label: label.to_string(),
            passed,
            observed,
            expected,
            tolerance,
            mode,
        });
    }

    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = (observed - expected).abs() < tolerance;
        self.push(label, passed, observed, expected, tolerance, CheckMode::Absolute);
    }

    /// Relative check; falls back to absolute when `expected` is near zero.
    pub fn check_rel(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = if expected.abs() > crate::tolerances::NEAR_ZERO_EXPECTED {
            ((observed - expected) / expected).abs() < tolerance
        } else {
            observed.abs() < tolerance
        };
        self.push(label, passed, observed, expected, tolerance, CheckMode::Relative);
    }

    pub fn check_upper(&mut self, label: &str, observed: f64, bound: f64) {
        self.push(label, observed < bound, observed, bound, bound, CheckMode::UpperBound);
    }

    pub fn check_lower(&mut self, label: &str, observed: f64, bound: f64) {
        self.push(label, observed > bound, observed, bound, bound, CheckMode::LowerBound);
    }

    pub fn check_bool(&mut self, label: &str, passed: bool) {
        let observed = f64::from(u8::from(passed));
        self.push(label, passed, observed, 1.0, 0.0, CheckMode::Boolean);
    }

    /// Relative distance of two fields, bounded by `tolerance`.
    pub fn check_fields<T: Real, const N: usize>(
        &mut self,
        label: &str,
        observed: &FermionField<T, N>,
        reference: &FermionField<T, N>,
        tolerance: f64,
    ) {
        let shapes_agree = observed.nsite == reference.nsite
            && observed.ls == reference.ls
            && observed.data.len() == reference.data.len();
        let distance = if shapes_agree {
            observed.relative_distance(reference)
        } else {
            f64::INFINITY
        };
        self.check_upper(label, distance, tolerance);
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    #[must_use]
    pub const fn total_count(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Labels of failed checks, prefixed with their section.
    #[must_use]
    pub fn failed_labels(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| {
                if c.section.is_empty() {
                    c.label.clone()
                } else {
                    format!("{}/{}", c.section, c.label)
                }
            })
            .collect()
    }

    #[must_use]
    pub fn report(&self) -> ValidationReport<'_> {
        ValidationReport {
            name: &self.name,
            passed: self.passed_count(),
            total: self.total_count(),
            checks: &self.checks,
        }
    }

    /// # Errors
    ///
    /// [`DhopError::Config`] if serialization fails.
    pub fn to_json(&self) -> Result<String, DhopError> {
        serde_json::to_string_pretty(&self.report()).map_err(|e| DhopError::Config(e.to_string()))
    }

    /// Summary line plus failures, as printed by [`Self::finish`].
    #[must_use]
    pub fn format_summary(&self) -> String {
        use std::fmt::Write;
        let mut s = String::new();
        let _ = writeln!(
            s,
            "═══ {} validation: {}/{} checks passed ═══",
            self.name,
            self.passed_count(),
            self.total_count()
        );
        if self.all_passed() {
            let _ = writeln!(s, "ALL CHECKS PASSED");
        } else {
            let _ = writeln!(s, "FAILED CHECKS: {}", self.failed_labels().join(", "));
        }
        s
    }

    /// Print the summary and exit 0 if every check passed, 1 otherwise.
    pub fn finish(&self) -> ! {
        println!();
        print!("{}", self.format_summary());
        process::exit(i32::from(!self.all_passed()));
    }
}
