//! Collection schema definitions: type validators, index specifications and
//! collection metadata.
//!
//! A [`Validator`] is a list of `{field: type}` constraints combined either
//! disjunctively ([`Validator::AnyOf`], a document passes when at least one
//! listed field has the listed type) or conjunctively ([`Validator::AllOf`]).
//! Validators render to the `$type` query form understood by MongoDB so the
//! same definition can be installed on a server or evaluated in memory.

use bson::{Bson, Document as BsonDocument, doc};

use crate::{
    document::lookup,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Prefix of store-internal collections that user operations never touch.
pub const SYSTEM_PREFIX: &str = "system.";

/// Returns `true` for store-internal collection names.
pub fn is_system_collection(name: &str) -> bool {
    name.starts_with(SYSTEM_PREFIX)
}

/// BSON type classes usable in a field constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Any numeric type (32/64-bit integer, double, decimal).
    Number,
    Int,
    Long,
    Double,
    String,
    Bool,
    Date,
    Object,
    Array,
    ObjectId,
    Null,
}

impl FieldType {
    /// The `$type` alias for this type class.
    pub fn alias(&self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Bool => "bool",
            FieldType::Date => "date",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::ObjectId => "objectId",
            FieldType::Null => "null",
        }
    }

    /// Returns `true` when `value` belongs to this type class.
    pub fn matches(&self, value: &Bson) -> bool {
        match (self, value) {
            (FieldType::Number, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_)) => true,
            (FieldType::Int, Bson::Int32(_)) => true,
            (FieldType::Long, Bson::Int64(_)) => true,
            (FieldType::Double, Bson::Double(_)) => true,
            (FieldType::String, Bson::String(_)) => true,
            (FieldType::Bool, Bson::Boolean(_)) => true,
            (FieldType::Date, Bson::DateTime(_)) => true,
            (FieldType::Object, Bson::Document(_)) => true,
            (FieldType::Array, Bson::Array(_)) => true,
            (FieldType::ObjectId, Bson::ObjectId(_)) => true,
            (FieldType::Null, Bson::Null) => true,
            _ => false,
        }
    }
}

/// A single `{field: type}` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConstraint {
    pub field: String,
    pub expected: FieldType,
}

impl FieldConstraint {
    pub fn new(field: impl Into<String>, expected: FieldType) -> Self {
        Self { field: field.into(), expected }
    }

    /// A missing field never satisfies its constraint.
    pub fn is_satisfied_by(&self, document: &BsonDocument) -> bool {
        lookup(document, &self.field)
            .map(|value| self.expected.matches(value))
            .unwrap_or(false)
    }

    fn to_document(&self) -> BsonDocument {
        doc! { self.field.clone(): { "$type": self.expected.alias() } }
    }
}

/// A collection validator evaluated on every insert and update.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// Passes when at least one constraint is satisfied.
    AnyOf(Vec<FieldConstraint>),
    /// Passes when every constraint is satisfied.
    AllOf(Vec<FieldConstraint>),
}

impl Validator {
    /// Builds a disjunctive validator from `(field, type)` pairs.
    pub fn any_of<S: Into<String>>(constraints: impl IntoIterator<Item = (S, FieldType)>) -> Self {
        Validator::AnyOf(
            constraints
                .into_iter()
                .map(|(field, expected)| FieldConstraint::new(field, expected))
                .collect(),
        )
    }

    /// Builds a conjunctive validator from `(field, type)` pairs.
    pub fn all_of<S: Into<String>>(constraints: impl IntoIterator<Item = (S, FieldType)>) -> Self {
        Validator::AllOf(
            constraints
                .into_iter()
                .map(|(field, expected)| FieldConstraint::new(field, expected))
                .collect(),
        )
    }

    pub fn constraints(&self) -> &[FieldConstraint] {
        match self {
            Validator::AnyOf(constraints) | Validator::AllOf(constraints) => constraints,
        }
    }

    /// Evaluates the validator against a document.
    pub fn matches(&self, document: &BsonDocument) -> bool {
        match self {
            Validator::AnyOf(constraints) => constraints
                .iter()
                .any(|constraint| constraint.is_satisfied_by(document)),
            Validator::AllOf(constraints) => constraints
                .iter()
                .all(|constraint| constraint.is_satisfied_by(document)),
        }
    }

    /// Renders the validator as a `$or` / `$and` query document.
    pub fn to_document(&self) -> BsonDocument {
        let operator = match self {
            Validator::AnyOf(_) => "$or",
            Validator::AllOf(_) => "$and",
        };

        doc! {
            operator: self
                .constraints()
                .iter()
                .map(|constraint| Bson::Document(constraint.to_document()))
                .collect::<Vec<_>>(),
        }
    }
}

/// An index on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub field: String,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(field: impl Into<String>, unique: bool) -> Self {
        Self { field: field.into(), unique }
    }

    pub fn unique(field: impl Into<String>) -> Self {
        Self::new(field, true)
    }

    /// Default index name, `<field>_1`, as assigned by MongoDB for an ascending key.
    pub fn name(&self) -> String {
        format!("{}_1", self.field)
    }
}

/// Full definition of one collection: validator plus indexes.
///
/// # Example
///
/// ```ignore
/// use docseed::schema::{CollectionSchema, FieldType};
///
/// let publishers = CollectionSchema::new("Editeurs")
///     .any_of([("editeur_id", FieldType::Number), ("nom", FieldType::String)])
///     .unique_index("editeur_id");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSchema {
    pub name: String,
    pub validator: Option<Validator>,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), validator: None, indexes: Vec::new() }
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Installs a disjunctive validator over `(field, type)` pairs.
    pub fn any_of<S: Into<String>>(self, constraints: impl IntoIterator<Item = (S, FieldType)>) -> Self {
        self.validator(Validator::any_of(constraints))
    }

    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn unique_index(self, field: impl Into<String>) -> Self {
        self.index(IndexSpec::unique(field))
    }

    /// Declared collection options, as reported by collection metadata.
    pub fn options(&self) -> BsonDocument {
        let mut options = BsonDocument::new();

        if let Some(validator) = &self.validator {
            options.insert("validator", validator.to_document());
        }

        options
    }

    /// Rejects definitions that no store could install.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidSchema`] for an empty or reserved
    /// name, a validator without constraints, or one field indexed twice with
    /// different uniqueness.
    pub fn check(&self) -> DocumentStoreResult<()> {
        let invalid = |reason: &str| DocumentStoreError::InvalidSchema {
            collection: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() || self.name.contains('$') || self.name.contains('\0') {
            return Err(invalid("collection names must be non-empty and free of '$' and NUL"));
        }
        if is_system_collection(&self.name) {
            return Err(invalid("the system. prefix is reserved"));
        }
        if let Some(validator) = &self.validator {
            if validator.constraints().is_empty() {
                return Err(invalid("validator has no constraints"));
            }
        }
        for (position, index) in self.indexes.iter().enumerate() {
            if self.indexes[..position]
                .iter()
                .any(|other| other.field == index.field && other.unique != index.unique)
            {
                return Err(invalid(&format!("field {} is indexed twice with different uniqueness", index.field)));
            }
        }

        Ok(())
    }
}

/// Kind of a collection as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionKind {
    Collection,
    View,
    Timeseries,
    Other(String),
}

impl CollectionKind {
    pub fn as_str(&self) -> &str {
        match self {
            CollectionKind::Collection => "collection",
            CollectionKind::View => "view",
            CollectionKind::Timeseries => "timeseries",
            CollectionKind::Other(kind) => kind,
        }
    }
}

/// Descriptive information about one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    pub kind: CollectionKind,
    /// Options declared when the collection was created (validator, ...).
    pub options: BsonDocument,
}

impl CollectionInfo {
    pub fn to_document(&self) -> BsonDocument {
        doc! {
            "name": &self.name,
            "type": self.kind.as_str(),
            "options": self.options.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publishers() -> Validator {
        Validator::any_of([
            ("editeur_id", FieldType::Number),
            ("nom", FieldType::String),
            ("adresse", FieldType::String),
        ])
    }

    #[test]
    fn disjunctive_validator_needs_a_single_matching_pair() {
        let validator = publishers();

        assert!(validator.matches(&doc! { "editeur_id": 0_i64, "nom": 12, "adresse": false }));
        assert!(validator.matches(&doc! { "editeur_id": "zero", "nom": "Gallimard" }));
        assert!(!validator.matches(&doc! { "editeur_id": "zero", "nom": 12 }));
        assert!(!validator.matches(&doc! { "titre": "Voyage au centre de la Terre" }));
    }

    #[test]
    fn conjunctive_validator_needs_every_pair() {
        let validator = Validator::all_of([("editeur_id", FieldType::Number), ("nom", FieldType::String)]);

        assert!(validator.matches(&doc! { "editeur_id": 1, "nom": "Penguin" }));
        assert!(!validator.matches(&doc! { "editeur_id": 1 }));
    }

    #[test]
    fn validator_renders_type_query() {
        assert_eq!(
            publishers().to_document(),
            doc! {
                "$or": [
                    { "editeur_id": { "$type": "number" } },
                    { "nom": { "$type": "string" } },
                    { "adresse": { "$type": "string" } },
                ]
            }
        );
    }

    #[test]
    fn number_covers_every_numeric_representation() {
        for value in [Bson::Int32(1), Bson::Int64(1), Bson::Double(1.5)] {
            assert!(FieldType::Number.matches(&value));
        }
        assert!(!FieldType::Number.matches(&Bson::String("1".into())));
        assert!(!FieldType::Int.matches(&Bson::Int64(1)));
    }

    #[test]
    fn check_rejects_unusable_definitions() {
        assert!(CollectionSchema::new("Editeurs").any_of([("editeur_id", FieldType::Number)]).check().is_ok());
        assert!(CollectionSchema::new("").check().is_err());
        assert!(CollectionSchema::new("system.views").check().is_err());
        assert!(
            CollectionSchema::new("Editeurs")
                .validator(Validator::AnyOf(vec![]))
                .check()
                .is_err()
        );
        assert!(
            CollectionSchema::new("Editeurs")
                .unique_index("editeur_id")
                .index(IndexSpec::new("editeur_id", false))
                .check()
                .is_err()
        );
    }
}
