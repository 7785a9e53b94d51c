//! Aggregation pipeline translation.

use bson::{Bson, Document, doc};

use docseed_core::{
    document::ID_FIELD,
    error::DocumentStoreResult,
    pipeline::{GroupKey, Pipeline, Stage},
};

use crate::query::{MongoQueryTranslator, sort_document};

/// Renders every stage of `pipeline` as a MongoDB aggregation stage.
pub(crate) fn translate(pipeline: &Pipeline) -> DocumentStoreResult<Vec<Document>> {
    pipeline
        .stages()
        .iter()
        .map(translate_stage)
        .collect()
}

fn translate_stage(stage: &Stage) -> DocumentStoreResult<Document> {
    Ok(match stage {
        Stage::Match(expr) => doc! { "$match": MongoQueryTranslator::filter(Some(expr))? },
        Stage::GroupSum { key, output, field } => doc! {
            "$group": {
                ID_FIELD: group_key(key),
                output.clone(): { "$sum": format!("${field}") },
            }
        },
        Stage::Sort(sort) => doc! { "$sort": sort_document(sort) },
        Stage::Limit(n) => doc! { "$limit": *n as i64 },
        Stage::Skip(n) => doc! { "$skip": *n as i64 },
    })
}

fn group_key(key: &GroupKey) -> Bson {
    match key {
        GroupKey::Field(path) => Bson::String(format!("${path}")),
        // A string starting with `$` would be read as a field path.
        GroupKey::Literal(Bson::String(label)) if label.starts_with('$') => {
            Bson::Document(doc! { "$literal": label.clone() })
        },
        GroupKey::Literal(value) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docseed_core::query::{Filter, SortDirection};

    #[test]
    fn match_and_group_sum() {
        let pipeline = Pipeline::new()
            .filter(Filter::lt("editeur_id", -3))
            .group_sum("FirstAgregate", "sumId", "editeur_id");

        assert_eq!(
            translate(&pipeline).unwrap(),
            vec![
                doc! { "$match": { "editeur_id": { "$lt": -3 } } },
                doc! { "$group": { "_id": "FirstAgregate", "sumId": { "$sum": "$editeur_id" } } },
            ]
        );
    }

    #[test]
    fn sort_skip_limit() {
        let pipeline = Pipeline::new()
            .sort("editeur_id", SortDirection::Desc)
            .skip(1)
            .limit(2);

        assert_eq!(
            translate(&pipeline).unwrap(),
            vec![
                doc! { "$sort": { "editeur_id": -1, "_id": 1 } },
                doc! { "$skip": 1_i64 },
                doc! { "$limit": 2_i64 },
            ]
        );
    }

    #[test]
    fn group_keys() {
        assert_eq!(group_key(&GroupKey::Field("pays".into())), Bson::String("$pays".into()));
        assert_eq!(
            group_key(&"$total".into()),
            Bson::Document(doc! { "$literal": "$total" })
        );
    }
}
