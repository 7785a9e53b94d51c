//! Query expression evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for filter expressions and the
//! ordering used by sorts, following MongoDB's comparison rules closely enough
//! for the operations docseed issues.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document as BsonDocument, datetime::DateTime, oid::ObjectId};

use docseed_core::{
    document::lookup,
    query::{QueryVisitor, Expr, FieldOp, Sort, SortDirection},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Type-erased, comparable representation of BSON values.
///
/// Int32, int64 and double values form one numeric domain: integers compare
/// exactly, doubles against integers by value. A missing field is
/// represented as `Null`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Number(f64),
    Decimal([u8; 16]),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(*value as i64),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::Decimal128(value) => Comparable::Decimal(value.bytes()),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> Comparable<'a> {
    /// Reads a field path, treating a missing field as null.
    pub(crate) fn field(document: &'a BsonDocument, path: &str) -> Self {
        lookup(document, path)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null)
    }

    /// Position of the value's type in the BSON cross-type sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Int(_) | Comparable::Number(_) | Comparable::Decimal(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Total order used for sorting: values of different types order by type
    /// rank, values of the same type by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(_) | Comparable::Number(_), Comparable::Int(_) | Comparable::Number(_)) => {
                self.partial_cmp(other) == Some(Ordering::Equal)
            }
            (Comparable::Decimal(a), Comparable::Decimal(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

/// Comparison within one type class; values of different types are unordered.
impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Number(b)) => int_cmp_double(*a, *b),
            (Comparable::Number(a), Comparable::Int(b)) => int_cmp_double(*b, *a).map(Ordering::reverse),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Compares an integer with a double without rounding the integer.
fn int_cmp_double(int: i64, double: f64) -> Option<Ordering> {
    // 2^63, the first double above i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if double.is_nan() {
        return None;
    }
    if double >= LIMIT {
        return Some(Ordering::Less);
    }
    if double < -LIMIT {
        return Some(Ordering::Greater);
    }

    let whole = double.trunc();

    match int.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(double - whole)),
        ordering => Some(ordering),
    }
}

/// Stable in-place sort of documents on one field.
pub(crate) fn sort_documents(documents: &mut [BsonDocument], sort: &Sort) {
    documents.sort_by(|a, b| {
        let left = Comparable::field(a, &sort.field);
        let right = Comparable::field(b, &sort.field);

        match sort.direction {
            SortDirection::Asc => left.sort_cmp(&right),
            SortDirection::Desc => right.sort_cmp(&left),
        }
    });
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a BsonDocument,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a BsonDocument) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns `true` when `filter` is absent or matches `document`.
    pub fn matches(document: &BsonDocument, filter: Option<&Expr>) -> DocumentStoreResult<bool> {
        match filter {
            Some(expr) => DocumentEvaluator::new(document).evaluate(expr),
            None => Ok(true),
        }
    }

    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a BsonDocument>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<BsonDocument>> {
        let mut matched = Vec::new();

        for doc in documents {
            if DocumentEvaluator::new(doc).evaluate(expr)? {
                matched.push(doc.clone());
            }
        }

        Ok(matched)
    }
}

fn membership(field_value: &Comparable<'_>, values: &Bson) -> DocumentStoreResult<bool> {
    let Bson::Array(values) = values else {
        return Err(DocumentStoreError::InvalidOperation(
            "membership filters need an array of values".to_string(),
        ));
    };

    Ok(values.iter().any(|candidate| {
        let candidate = Comparable::from(candidate);

        match field_value {
            Comparable::Array(items) => items.iter().any(|item| item == &candidate),
            single => single == &candidate,
        }
    }))
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        // A missing field compares as null, so `eq(null)` and `ne(x)` match it.
        let field_value = Comparable::field(self.document, field);

        match op {
            FieldOp::Eq => Ok(field_value == Comparable::from(value)),
            FieldOp::Ne => Ok(field_value != Comparable::from(value)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                if lookup(self.document, field).is_none() {
                    return Ok(false);
                }

                match field_value.partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => Ok(match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        FieldOp::Lte => ordering != Ordering::Greater,
                        _ => unreachable!(),
                    }),
                    None => Ok(false),
                }
            },
            FieldOp::AnyOf => membership(&field_value, value),
            FieldOp::NoneOf => Ok(!membership(&field_value, value)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docseed_core::query::Filter;

    fn eval(document: &BsonDocument, expr: Expr) -> bool {
        DocumentEvaluator::new(document).evaluate(&expr).unwrap()
    }

    #[test]
    fn numbers_compare_across_representations() {
        let document = doc! { "editeur_id": -5_i64 };

        assert!(eval(&document, Filter::lt("editeur_id", -3)));
        assert!(eval(&document, Filter::eq("editeur_id", -5.0)));
        assert!(!eval(&document, Filter::lt("editeur_id", "-3")));
    }

    #[test]
    fn large_integers_compare_exactly() {
        let document = doc! { "isbn": 9_007_199_254_740_993_i64 };

        assert!(!eval(&document, Filter::eq("isbn", 9_007_199_254_740_992_i64)));
        assert!(eval(&document, Filter::gt("isbn", 9_007_199_254_740_992_i64)));
        assert!(eval(&document, Filter::gt("isbn", 9_007_199_254_740_992.0)));
        assert!(eval(&document, Filter::lt("isbn", 9_007_199_254_740_993.5)));
        assert!(eval(&doc! { "n": 3 }, Filter::eq("n", 3.0)));
        assert!(eval(&doc! { "n": -2 }, Filter::lt("n", -1.5)));
        assert!(eval(&doc! { "n": i64::MAX }, Filter::lt("n", 1e19)));
    }

    #[test]
    fn missing_fields_behave_like_null() {
        let document = doc! { "nom": "Gallimard" };

        assert!(eval(&document, Filter::eq("adresse", Bson::Null)));
        assert!(eval(&document, Filter::ne("adresse", "Paris")));
        assert!(!eval(&document, Filter::gt("adresse", "A")));
        assert!(eval(&document, Filter::not_exists("adresse")));
    }

    #[test]
    fn membership_and_logic() {
        let document = doc! { "categorie_id": 12, "tags": ["roman", "aventure"] };

        assert!(eval(&document, Filter::any_of("categorie_id", [11, 12])));
        assert!(eval(&document, Filter::any_of("tags", ["aventure"])));
        assert!(eval(&document, Filter::none_of("categorie_id", [1, 2])));
        assert!(eval(&document, Filter::eq("categorie_id", 12).and(Filter::exists("tags"))));
        assert!(!eval(&document, Filter::eq("categorie_id", 12).not()));
    }

    #[test]
    fn sort_orders_types_then_values() {
        let mut documents = vec![
            doc! { "k": "b" },
            doc! { "k": 3 },
            doc! { "x": 0 },
            doc! { "k": 1_i64 },
        ];

        sort_documents(&mut documents, &Sort::asc("k"));

        assert_eq!(
            documents,
            vec![doc! { "x": 0 }, doc! { "k": 1_i64 }, doc! { "k": 3 }, doc! { "k": "b" }]
        );
    }
}
