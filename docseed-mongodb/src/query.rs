//! Query translation from docseed expressions to MongoDB query syntax.
//!
//! This module translates filter expressions, sorts and update operators into
//! the BSON documents the MongoDB server executes.

use bson::{Document, Bson, doc};

use docseed_core::{
    document::ID_FIELD,
    query::{QueryVisitor, Expr, FieldOp, Sort, SortDirection},
    update::Update,
    error::DocumentStoreError,
};


/// Translates docseed query expressions into MongoDB query documents.
///
/// This struct implements the [`QueryVisitor`] trait to convert abstract
/// query expressions into MongoDB's native BSON query syntax.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter; `None` matches every document.
    pub fn filter(filter: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    // `$not` only applies to operator expressions; `$nor` negates a whole filter.
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::AnyOf | FieldOp::NoneOf if !matches!(value, Bson::Array(_)) => {
                    return Err(DocumentStoreError::InvalidOperation(
                        "membership filters need an array of values".to_string(),
                    ));
                },
                FieldOp::AnyOf => doc! { "$in": value },
                FieldOp::NoneOf => doc! { "$nin": value },
            }
        })
    }
}

/// Renders a sort. Ties fall back to `_id`, which follows insertion order for
/// store-assigned ObjectIds, since the server's sort is not stable.
pub(crate) fn sort_document(sort: &Sort) -> Document {
    let mut rendered = doc! {
        sort.field.clone(): match sort.direction {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    };

    if sort.field != ID_FIELD {
        rendered.insert(ID_FIELD, 1);
    }

    rendered
}

/// Renders an update as a MongoDB update document.
pub(crate) fn update_document(update: &Update) -> Document {
    match update {
        Update::Increment { field, delta } => doc! { "$inc": { field.clone(): delta.clone() } },
        Update::Rename { from, to } => doc! { "$rename": { from.clone(): to.clone() } },
        Update::Set { field, value } => doc! { "$set": { field.clone(): value.clone() } },
        Update::Unset { field } => doc! { "$unset": { field.clone(): "" } },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docseed_core::query::Filter;

    fn translate(expr: Expr) -> Document {
        MongoQueryTranslator::filter(Some(&expr)).unwrap()
    }

    #[test]
    fn field_operators() {
        assert_eq!(translate(Filter::lt("editeur_id", -3)), doc! { "editeur_id": { "$lt": -3 } });
        assert_eq!(
            translate(Filter::any_of("categorie_id", [11, 12])),
            doc! { "categorie_id": { "$in": [11, 12] } }
        );
        assert_eq!(translate(Filter::not_exists("isbn")), doc! { "isbn": { "$exists": false } });
    }

    #[test]
    fn logical_operators() {
        assert_eq!(
            translate(Filter::eq("nom", "Gallimard").or(Filter::gt("editeur_id", 0))),
            doc! { "$or": [{ "nom": { "$eq": "Gallimard" } }, { "editeur_id": { "$gt": 0 } }] }
        );
        assert_eq!(
            translate(Filter::eq("nom", "Gallimard").not()),
            doc! { "$nor": [{ "nom": { "$eq": "Gallimard" } }] }
        );
    }

    #[test]
    fn missing_filter_matches_everything() {
        assert_eq!(MongoQueryTranslator::filter(None).unwrap(), doc! {});
    }

    #[test]
    fn updates_and_sorts() {
        assert_eq!(
            update_document(&Update::increment("editeur_id", -5_i64)),
            doc! { "$inc": { "editeur_id": -5_i64 } }
        );
        assert_eq!(update_document(&Update::rename("nom", "name")), doc! { "$rename": { "nom": "name" } });
        assert_eq!(update_document(&Update::unset("adresse")), doc! { "$unset": { "adresse": "" } });
        assert_eq!(
            sort_document(&Sort::desc("editeur_id")).keys().collect::<Vec<_>>(),
            vec!["editeur_id", "_id"]
        );
        assert_eq!(sort_document(&Sort::desc("editeur_id")), doc! { "editeur_id": -1, "_id": 1 });
        assert_eq!(sort_document(&Sort::desc("_id")), doc! { "_id": -1 });
    }
}
