//! Inclusion filters over declarations.
//!
//! Every filter maps a declaration to a `Verdict`. Verdicts are totally
//! ordered, so combining filters is a fold with `min` or `max` starting
//! from that reduction's identity element. Both folds are associative
//! and commutative; the order in which filters are listed never changes
//! the combined verdict.

use std::path::PathBuf;

use tracing::trace;

use crate::ast::{Decl, TranslationUnit};
use crate::specs::SpecTable;

/// How much of a declaration ends up in the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verdict {
    Exclude,
    /// The filter has no opinion. Still below the inclusion threshold.
    Unspecified,
    /// Emit the signature only.
    Declaration,
    /// Emit the full definition.
    Definition,
}

impl Verdict {
    /// Lowest verdict that puts a declaration into the module.
    pub const INCLUDE: Verdict = Verdict::Declaration;

    pub fn is_included(self) -> bool {
        self >= Self::INCLUDE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Most conservative: any exclusion wins.
    Min,
    /// Most permissive: any inclusion wins.
    Max,
}

impl Reduction {
    pub fn identity(self) -> Verdict {
        match self {
            Reduction::Min => Verdict::Definition,
            Reduction::Max => Verdict::Exclude,
        }
    }

    pub fn reduce(self, left: Verdict, right: Verdict) -> Verdict {
        match self {
            Reduction::Min => left.min(right),
            Reduction::Max => left.max(right),
        }
    }

    pub fn fold(self, verdicts: impl IntoIterator<Item = Verdict>) -> Verdict {
        verdicts
            .into_iter()
            .fold(self.identity(), |acc, verdict| self.reduce(acc, verdict))
    }
}

/// What a filter may look at besides the declaration itself.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub unit: &'a TranslationUnit,
    pub specs: &'a SpecTable,
}

pub type FilterFn = fn(&Decl, &FilterContext<'_>) -> Verdict;

#[derive(Debug, Clone)]
pub enum Filter {
    /// Same verdict for every declaration.
    Everything(Verdict),
    /// Excludes declarations located in system headers.
    NoSystemHeaders { extra_roots: Vec<PathBuf> },
    /// Excludes declarations without the `@key` annotation.
    RequiresAnnotation { key: String },
    Custom(FilterFn),
    Combine {
        reduction: Reduction,
        filters: Vec<Filter>,
    },
}

impl Filter {
    /// Base filter for the one-off single declaration paths.
    pub fn definitions() -> Self {
        Filter::Everything(Verdict::Definition)
    }

    pub fn min(filters: Vec<Filter>) -> Self {
        Filter::Combine {
            reduction: Reduction::Min,
            filters,
        }
    }

    pub fn max(filters: Vec<Filter>) -> Self {
        Filter::Combine {
            reduction: Reduction::Max,
            filters,
        }
    }

    pub fn verdict(&self, decl: &Decl, cx: &FilterContext<'_>) -> Verdict {
        let verdict = match self {
            Filter::Everything(verdict) => *verdict,
            Filter::NoSystemHeaders { extra_roots } => match &decl.location {
                None => Verdict::Unspecified,
                Some(location) if cx.unit.is_system_location(location, extra_roots) => {
                    Verdict::Exclude
                }
                Some(_) => Verdict::Definition,
            },
            Filter::RequiresAnnotation { key } => {
                if cx.specs.has(decl.id, key) {
                    Verdict::Definition
                } else {
                    Verdict::Exclude
                }
            }
            Filter::Custom(filter) => filter(decl, cx),
            Filter::Combine { reduction, filters } => {
                reduction.fold(filters.iter().map(|filter| filter.verdict(decl, cx)))
            }
        };
        trace!(decl = %decl.id, ?verdict, filter = self.label(), "filter verdict");
        verdict
    }

    fn label(&self) -> &'static str {
        match self {
            Filter::Everything(_) => "everything",
            Filter::NoSystemHeaders { .. } => "no-system-headers",
            Filter::RequiresAnnotation { .. } => "requires-annotation",
            Filter::Custom(_) => "custom",
            Filter::Combine {
                reduction: Reduction::Min,
                ..
            } => "combine-min",
            Filter::Combine {
                reduction: Reduction::Max,
                ..
            } => "combine-max",
        }
    }
}
