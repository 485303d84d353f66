//! Report scope: which records a report covers, and the matrices built over
//! that scope.

use crate::cache::{MatrixCache, MatrixKey, SourceId};
use crate::matrix::MarginMatrix;
use crate::model::SalesRecord;
use crate::policy::ideal_margin_matrix;
use crate::stats::{build_actual_matrix, count_matrix};
use std::collections::BTreeSet;
use std::fmt;

pub const ALL_SUPPLIERS: &str = "ALL";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SupplierFilter {
    All,
    Supplier(String),
}

impl SupplierFilter {
    pub fn label(&self) -> &str {
        match self {
            SupplierFilter::All => ALL_SUPPLIERS,
            SupplierFilter::Supplier(name) => name,
        }
    }

    pub fn matches(&self, rec: &SalesRecord) -> bool {
        match self {
            SupplierFilter::All => true,
            SupplierFilter::Supplier(name) => &rec.supplier_name == name,
        }
    }
}

impl fmt::Display for SupplierFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Discount groups starting or ending with `Z` are miscellaneous buckets.
pub fn is_misc_group(group: &str) -> bool {
    group.starts_with('Z') || group.ends_with('Z')
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportScope {
    pub supplier: SupplierFilter,
    pub exclude_misc: bool,
}

impl ReportScope {
    pub fn new(supplier: SupplierFilter, exclude_misc: bool) -> Self {
        Self { supplier, exclude_misc }
    }

    pub fn includes(&self, rec: &SalesRecord) -> bool {
        if self.exclude_misc && is_misc_group(&rec.discount_group) {
            return false;
        }
        self.supplier.matches(rec)
    }

    pub fn apply<'a>(&self, records: &'a [SalesRecord]) -> Vec<&'a SalesRecord> {
        records.iter().filter(|r| self.includes(r)).collect()
    }

    /// Group views and the PDF are only produced for a single supplier.
    pub fn has_group_breakdown(&self) -> bool {
        matches!(self.supplier, SupplierFilter::Supplier(_))
    }
}

/// Distinct non-empty supplier names, sorted. `SupplierFilter::All` is offered
/// separately, so a supplier that is itself called `ALL` stays selectable.
pub fn supplier_choices(records: &[SalesRecord]) -> Vec<String> {
    let names: BTreeSet<&str> = records
        .iter()
        .map(|r| r.supplier_name.as_str())
        .filter(|n| !n.is_empty())
        .collect();
    names.into_iter().map(str::to_string).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    Actual,
    Ideal,
    Difference,
}

impl MatrixKind {
    pub const ALL: [MatrixKind; 3] = [MatrixKind::Actual, MatrixKind::Ideal, MatrixKind::Difference];

    pub fn label(self) -> &'static str {
        match self {
            MatrixKind::Actual => "Actual",
            MatrixKind::Ideal => "Ideal",
            MatrixKind::Difference => "Difference",
        }
    }
}

/// Actual, ideal and difference matrices for one slice of the data.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSet {
    /// `None` for the summary set.
    pub group: Option<String>,
    pub actual: MarginMatrix,
    pub ideal: MarginMatrix,
    pub difference: MarginMatrix,
    pub counts: [[usize; 5]; 5],
}

impl MatrixSet {
    pub fn build<'a>(group: Option<String>, actual: MarginMatrix, records: impl IntoIterator<Item = &'a SalesRecord>) -> Self {
        let ideal = ideal_margin_matrix();
        let difference = actual.difference(&ideal);
        Self {
            group,
            actual,
            ideal,
            difference,
            counts: count_matrix(records),
        }
    }

    pub fn matrix(&self, kind: MatrixKind) -> &MarginMatrix {
        match kind {
            MatrixKind::Actual => &self.actual,
            MatrixKind::Ideal => &self.ideal,
            MatrixKind::Difference => &self.difference,
        }
    }

    pub fn title(&self, kind: MatrixKind, supplier: &SupplierFilter) -> String {
        match &self.group {
            None => format!("SUMMARY: {} Margins - {}", kind.label(), supplier),
            Some(group) => format!("{} Margins - {} | Group {}", kind.label(), supplier, group),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// Nothing left after filtering.
    Empty,
    Ready(ScopeReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeReport {
    pub scope: ReportScope,
    pub record_count: usize,
    pub summary: MatrixSet,
    /// Sorted by group name; empty when every supplier is selected.
    pub groups: Vec<MatrixSet>,
}

impl ScopeReport {
    pub fn heading(&self) -> &'static str {
        match self.scope.supplier {
            SupplierFilter::All => "Global-Level Summary Heatmaps",
            SupplierFilter::Supplier(_) => "Supplier-Level Summary Heatmaps",
        }
    }

    /// Every (title, matrix) in page order: summary first, then each group.
    pub fn pages(&self) -> Vec<(String, &MarginMatrix)> {
        std::iter::once(&self.summary)
            .chain(self.groups.iter())
            .flat_map(|set| {
                MatrixKind::ALL
                    .into_iter()
                    .map(move |kind| (set.title(kind, &self.scope.supplier), set.matrix(kind)))
            })
            .collect()
    }
}

/// Filters `records` to `scope` and builds the summary and, for a single
/// supplier, one matrix set per discount group. Actual matrices go through
/// `cache`.
pub fn build_report(
    source: &SourceId,
    records: &[SalesRecord],
    scope: &ReportScope,
    cache: &mut MatrixCache,
) -> ReportOutcome {
    let data = scope.apply(records);
    if data.is_empty() {
        return ReportOutcome::Empty;
    }

    let summary_key = MatrixKey::new(source, scope, None);
    let actual = cache.get_or_insert_with(summary_key, || build_actual_matrix(data.iter().copied()));
    let summary = MatrixSet::build(None, actual, data.iter().copied());

    let mut groups = Vec::new();
    if scope.has_group_breakdown() {
        let names: BTreeSet<&str> = data.iter().map(|r| r.discount_group.as_str()).collect();
        for name in names {
            let sub: Vec<&SalesRecord> = data
                .iter()
                .copied()
                .filter(|r| r.discount_group == name)
                .collect();
            let key = MatrixKey::new(source, scope, Some(name));
            let actual = cache.get_or_insert_with(key, || build_actual_matrix(sub.iter().copied()));
            groups.push(MatrixSet::build(Some(name.to_string()), actual, sub.iter().copied()));
        }
    }

    ReportOutcome::Ready(ScopeReport {
        scope: scope.clone(),
        record_count: data.len(),
        summary,
        groups,
    })
}
