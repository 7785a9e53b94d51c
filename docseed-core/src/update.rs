//! Bulk update operators applied to every document matching a filter.

use bson::{Bson, Document as BsonDocument};

use crate::{
    document::{ID_FIELD, parent_mut},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// A field-level mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Adds `delta` to a numeric field. A missing field is created with `delta`.
    Increment { field: String, delta: Bson },
    /// Moves a field's value under a new name. Documents without the field are untouched.
    Rename { from: String, to: String },
    /// Sets a field to a value, creating it if needed.
    Set { field: String, value: Bson },
    /// Removes a field.
    Unset { field: String },
}

impl Update {
    pub fn increment(field: impl Into<String>, delta: impl Into<Bson>) -> Self {
        Update::Increment { field: field.into(), delta: delta.into() }
    }

    pub fn rename(from: impl Into<String>, to: impl Into<String>) -> Self {
        Update::Rename { from: from.into(), to: to.into() }
    }

    pub fn set(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Update::Set { field: field.into(), value: value.into() }
    }

    pub fn unset(field: impl Into<String>) -> Self {
        Update::Unset { field: field.into() }
    }

    /// Rejects operators that can never apply, before any document is touched.
    pub fn check(&self) -> DocumentStoreResult<()> {
        match self {
            Update::Increment { delta, .. } if !is_numeric(delta) => Err(
                DocumentStoreError::InvalidOperation(format!("cannot increment by non-numeric value {delta}")),
            ),
            Update::Rename { from, to }
                if from == to
                    || !is_updatable(from)
                    || !is_updatable(to)
                    || to.starts_with(&format!("{from}."))
                    || from.starts_with(&format!("{to}.")) =>
            {
                Err(DocumentStoreError::InvalidOperation(format!("cannot rename {from} to {to}")))
            }
            Update::Increment { field, .. } | Update::Set { field, .. } | Update::Unset { field }
                if !is_updatable(field) =>
            {
                Err(DocumentStoreError::InvalidOperation(format!("field {field:?} cannot be updated")))
            }
            _ => Ok(()),
        }
    }

    /// Applies the operator to `document`. Dotted paths reach into embedded
    /// documents; `Increment` and `Set` create missing intermediate documents.
    ///
    /// Returns whether the document changed.
    pub fn apply(&self, document: &mut BsonDocument) -> DocumentStoreResult<bool> {
        match self {
            Update::Increment { field, delta } => {
                let (parent, leaf) = parent_or_create(document, field)?;
                let next = match parent.get(leaf) {
                    Some(current) => add_numbers(current, delta).ok_or_else(|| {
                        DocumentStoreError::InvalidOperation(format!(
                            "cannot increment non-numeric field {field} ({current})"
                        ))
                    })?,
                    None => delta.clone(),
                };
                let changed = parent.get(leaf) != Some(&next);
                parent.insert(leaf, next);
                Ok(changed)
            }
            Update::Rename { from, to } => {
                let Some((source, from_leaf)) = parent_mut(document, from) else {
                    return Ok(false);
                };
                if !source.contains_key(from_leaf) {
                    return Ok(false);
                }

                // Same parent: the field keeps its position.
                if let Some(to_leaf) = sibling(from, to) {
                    rename_in_place(source, from_leaf, to_leaf);
                    return Ok(true);
                }

                let Some(value) = source.remove(from_leaf) else {
                    return Ok(false);
                };
                let (target, to_leaf) = parent_or_create(document, to)?;
                target.insert(to_leaf, value);
                Ok(true)
            }
            Update::Set { field, value } => {
                let (parent, leaf) = parent_or_create(document, field)?;
                let changed = parent.get(leaf) != Some(value);
                parent.insert(leaf, value.clone());
                Ok(changed)
            }
            Update::Unset { field } => Ok(
                parent_mut(document, field).is_some_and(|(parent, leaf)| parent.remove(leaf).is_some())
            ),
        }
    }
}

/// The store owns `_id`; paths with empty segments address nothing.
fn is_updatable(path: &str) -> bool {
    path != ID_FIELD
        && !path.starts_with(&format!("{ID_FIELD}."))
        && !path.split('.').any(str::is_empty)
}

/// Last segment of `to` when both paths share a parent.
fn sibling<'p>(from: &str, to: &'p str) -> Option<&'p str> {
    match (from.rsplit_once('.'), to.rsplit_once('.')) {
        (None, None) => Some(to),
        (Some((from_parent, _)), Some((to_parent, leaf))) if from_parent == to_parent => Some(leaf),
        _ => None,
    }
}

/// Renames a key without moving it. An existing `to` key is replaced.
fn rename_in_place(document: &mut BsonDocument, from: &str, to: &str) {
    *document = std::mem::take(document)
        .into_iter()
        .filter(|(key, _)| key != to)
        .map(|(key, value)| if key == from { (to.to_string(), value) } else { (key, value) })
        .collect();
}

/// Like [`parent_mut`], creating missing intermediate documents.
fn parent_or_create<'a, 'p>(
    document: &'a mut BsonDocument,
    path: &'p str,
) -> DocumentStoreResult<(&'a mut BsonDocument, &'p str)> {
    let Some((parents, leaf)) = path.rsplit_once('.') else {
        return Ok((document, path));
    };

    let mut current = document;

    for segment in parents.split('.') {
        if !current.contains_key(segment) {
            current.insert(segment, BsonDocument::new());
        }

        current = match current.get_mut(segment) {
            Some(Bson::Document(inner)) => inner,
            _ => {
                return Err(DocumentStoreError::InvalidOperation(format!(
                    "cannot create field {leaf} of {path}: {segment} is not a document"
                )));
            }
        };
    }

    Ok((current, leaf))
}

pub fn is_numeric(value: &Bson) -> bool {
    matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

/// Adds two numeric BSON values using MongoDB's widening rules: int32 widens
/// to int64 on overflow, any double operand yields a double.
///
/// Returns `None` when either operand is not numeric or int64 overflows.
pub fn add_numbers(left: &Bson, right: &Bson) -> Option<Bson> {
    match (left, right) {
        (Bson::Int32(a), Bson::Int32(b)) => Some(
            a.checked_add(*b)
                .map(Bson::Int32)
                .unwrap_or(Bson::Int64(*a as i64 + *b as i64)),
        ),
        (Bson::Int32(a), Bson::Int64(b)) => (*a as i64).checked_add(*b).map(Bson::Int64),
        (Bson::Int64(a), Bson::Int32(b)) => a.checked_add(*b as i64).map(Bson::Int64),
        (Bson::Int64(a), Bson::Int64(b)) => a.checked_add(*b).map(Bson::Int64),
        (Bson::Double(a), other) | (other, Bson::Double(a)) => match other {
            Bson::Double(b) => Some(Bson::Double(a + b)),
            Bson::Int32(b) => Some(Bson::Double(a + *b as f64)),
            Bson::Int64(b) => Some(Bson::Double(a + *b as f64)),
            _ => None,
        },
        _ => None,
    }
}
