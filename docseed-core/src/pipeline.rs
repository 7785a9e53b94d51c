//! Aggregation pipelines.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s applied left to right, each
//! stage consuming the previous stage's output.
//!
//! ```ignore
//! use docseed::{pipeline::Pipeline, query::{Filter, SortDirection}};
//!
//! let total = Pipeline::new()
//!     .filter(Filter::lt("editeur_id", -3))
//!     .group_sum("FirstAgregate", "sumId", "editeur_id");
//!
//! let top_two = Pipeline::new()
//!     .sort("editeur_id", SortDirection::Desc)
//!     .limit(2);
//! ```

use bson::Bson;

use crate::query::{Expr, Sort, SortDirection};

/// What a [`Stage::GroupSum`] partitions on.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// Every input record lands in one partition labelled with this value.
    Literal(Bson),
    /// Partition by the value of a field path (missing fields group under null).
    Field(String),
}

impl From<&str> for GroupKey {
    fn from(label: &str) -> Self {
        GroupKey::Literal(Bson::String(label.to_string()))
    }
}

/// A single aggregation stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keeps records matching the filter.
    Match(Expr),
    /// Emits `{ _id: <key>, <output>: <sum of field> }` per partition.
    ///
    /// Non-numeric and missing values contribute nothing to the sum.
    GroupSum {
        key: GroupKey,
        output: String,
        field: String,
    },
    /// Stable sort on one field.
    Sort(Sort),
    /// Keeps at most `n` records.
    Limit(usize),
    /// Drops the first `n` records.
    Skip(usize),
}

/// An ordered aggregation pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn filter(self, expr: Expr) -> Self {
        self.stage(Stage::Match(expr))
    }

    pub fn group_sum(
        self,
        key: impl Into<GroupKey>,
        output: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.stage(Stage::GroupSum {
            key: key.into(),
            output: output.into(),
            field: field.into(),
        })
    }

    pub fn sort(self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.stage(Stage::Sort(Sort { field: field.into(), direction }))
    }

    pub fn limit(self, n: usize) -> Self {
        self.stage(Stage::Limit(n))
    }

    pub fn skip(self, n: usize) -> Self {
        self.stage(Stage::Skip(n))
    }
}

impl From<Vec<Stage>> for Pipeline {
    fn from(stages: Vec<Stage>) -> Self {
        Self { stages }
    }
}
