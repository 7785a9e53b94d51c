//! Aggregation pipeline execution over in-memory documents.

use bson::{Bson, Document as BsonDocument, doc};

use docseed_core::{
    document::{ID_FIELD, lookup},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{GroupKey, Pipeline, Stage},
    update::{add_numbers, is_numeric},
};

use crate::evaluator::{Comparable, DocumentEvaluator, sort_documents};

/// Runs every stage of `pipeline` left to right over `documents`.
pub(crate) fn run(
    mut documents: Vec<BsonDocument>,
    pipeline: &Pipeline,
) -> DocumentStoreResult<Vec<BsonDocument>> {
    for stage in pipeline.stages() {
        documents = match stage {
            Stage::Match(expr) => DocumentEvaluator::filter_documents(&documents, expr)?,
            Stage::GroupSum { key, output, field } => group_sum(&documents, key, output, field),
            Stage::Sort(sort) => {
                sort_documents(&mut documents, sort);
                documents
            },
            Stage::Limit(0) => {
                return Err(DocumentStoreError::InvalidOperation(
                    "limit stage must be positive".to_string(),
                ));
            },
            Stage::Limit(n) => {
                documents.truncate(*n);
                documents
            },
            Stage::Skip(n) => documents
                .into_iter()
                .skip(*n)
                .collect(),
        };
    }

    Ok(documents)
}

fn group_sum(
    documents: &[BsonDocument],
    key: &GroupKey,
    output: &str,
    field: &str,
) -> Vec<BsonDocument> {
    // Partitions in order of first appearance.
    let mut groups: Vec<(Bson, Bson)> = Vec::new();

    for document in documents {
        let group = match key {
            GroupKey::Literal(value) => value.clone(),
            GroupKey::Field(path) => lookup(document, path)
                .cloned()
                .unwrap_or(Bson::Null),
        };

        let position = match groups
            .iter()
            .position(|(existing, _)| Comparable::from(existing) == Comparable::from(&group))
        {
            Some(position) => position,
            None => {
                groups.push((group, Bson::Int32(0)));
                groups.len() - 1
            },
        };

        if let Some(value) = lookup(document, field).filter(|value| is_numeric(value)) {
            let total = &groups[position].1;
            let sum = add_numbers(total, value)
                .unwrap_or_else(|| Bson::Double(as_f64(total) + as_f64(value)));

            groups[position].1 = sum;
        }
    }

    groups
        .into_iter()
        .map(|(group, total)| doc! { ID_FIELD: group, output: total })
        .collect()
}

fn as_f64(value: &Bson) -> f64 {
    match value {
        Bson::Int32(n) => *n as f64,
        Bson::Int64(n) => *n as f64,
        Bson::Double(n) => *n,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docseed_core::query::{Filter, SortDirection};

    fn publishers() -> Vec<BsonDocument> {
        vec![
            doc! { "editeur_id": -5_i64, "pays": "France" },
            doc! { "editeur_id": -4_i64, "pays": "Royaume-Uni" },
            doc! { "editeur_id": -3_i64, "pays": "France" },
        ]
    }

    #[test]
    fn match_then_group_sums_into_one_record() {
        let pipeline = Pipeline::new()
            .filter(Filter::lt("editeur_id", -3))
            .group_sum("FirstAgregate", "sumId", "editeur_id");

        let result = run(publishers(), &pipeline).unwrap();

        assert_eq!(result, vec![doc! { "_id": "FirstAgregate", "sumId": -9_i64 }]);
    }

    #[test]
    fn group_by_field_keeps_first_appearance_order() {
        let pipeline = Pipeline::new()
            .group_sum(GroupKey::Field("pays".to_string()), "total", "editeur_id");

        let result = run(publishers(), &pipeline).unwrap();

        assert_eq!(
            result,
            vec![
                doc! { "_id": "France", "total": -8_i64 },
                doc! { "_id": "Royaume-Uni", "total": -4_i64 },
            ]
        );
    }

    #[test]
    fn group_over_nothing_emits_nothing() {
        let pipeline = Pipeline::new()
            .filter(Filter::gt("editeur_id", 100))
            .group_sum("none", "sum", "editeur_id");

        assert!(run(publishers(), &pipeline).unwrap().is_empty());
    }

    #[test]
    fn non_numeric_values_do_not_contribute() {
        let documents = vec![doc! { "n": "x" }, doc! { "m": 1 }];
        let pipeline = Pipeline::new().group_sum("all", "sum", "n");

        assert_eq!(run(documents, &pipeline).unwrap(), vec![doc! { "_id": "all", "sum": 0 }]);
    }

    #[test]
    fn sort_skip_and_limit_compose() {
        let pipeline = Pipeline::new()
            .sort("editeur_id", SortDirection::Desc)
            .skip(1)
            .limit(5);

        let ids = run(publishers(), &pipeline)
            .unwrap()
            .into_iter()
            .map(|document| document.get_i64("editeur_id").unwrap())
            .collect::<Vec<_>>();

        assert_eq!(ids, vec![-4, -5]);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let result = run(publishers(), &Pipeline::new().limit(0));

        assert!(matches!(result, Err(DocumentStoreError::InvalidOperation(_))));
    }
}
