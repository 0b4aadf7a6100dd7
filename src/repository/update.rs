use mongodb::bson::{Bson, DateTime, Document};

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

const SET: &str = "$set";
const SET_ON_INSERT: &str = "$setOnInsert";

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// `$set`: fields written on every matched or inserted document.
    Set(Document),
    /// `$setOnInsert`: fields written only when an upsert inserts.
    SetOnInsert(Document),
    /// Any other operator, forwarded as-is.
    Raw { operator: String, value: Bson },
}

impl UpdateOperation {
    fn classify(operator: String, value: Bson) -> Self {
        match value {
            Bson::Document(fields) if operator == SET => Self::Set(fields),
            Bson::Document(fields) if operator == SET_ON_INSERT => Self::SetOnInsert(fields),
            value => Self::Raw { operator, value },
        }
    }

    fn into_entry(self) -> (String, Bson) {
        match self {
            Self::Set(fields) => (SET.to_string(), Bson::Document(fields)),
            Self::SetOnInsert(fields) => (SET_ON_INSERT.to_string(), Bson::Document(fields)),
            Self::Raw { operator, value } => (operator, value),
        }
    }
}

/// An update expressed as a list of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDocument {
    operations: Vec<UpdateOperation>,
}

impl UpdateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, fields: Document) -> Self {
        self.operations.push(UpdateOperation::Set(fields));
        self
    }

    #[must_use]
    pub fn set_on_insert(mut self, fields: Document) -> Self {
        self.operations.push(UpdateOperation::SetOnInsert(fields));
        self
    }

    /// Appends any operator. `$set` and `$setOnInsert` given this way are
    /// recognised as such and take part in timestamp bookkeeping.
    #[must_use]
    pub fn raw(mut self, operator: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.operations
            .push(UpdateOperation::classify(operator.into(), value.into()));
        self
    }

    pub fn operations(&self) -> &[UpdateOperation] {
        &self.operations
    }

    pub fn has_set(&self) -> bool {
        self.operations
            .iter()
            .any(|op| matches!(op, UpdateOperation::Set(_)))
    }

    pub fn has_set_on_insert(&self) -> bool {
        self.operations
            .iter()
            .any(|op| matches!(op, UpdateOperation::SetOnInsert(_)))
    }

    /// Applies timestamp bookkeeping.
    ///
    /// Only updates carrying a `$set` are touched. An upsert that also has a
    /// `$setOnInsert` gets both timestamps on the insert-only clause so an
    /// existing document keeps its `createdAt`; everything else gets
    /// `updatedAt` on the `$set` clause.
    #[must_use]
    pub fn stamped(mut self, upsert: bool, now: DateTime) -> Self {
        if !self.has_set() {
            return self;
        }

        if upsert && self.has_set_on_insert() {
            for op in &mut self.operations {
                if let UpdateOperation::SetOnInsert(fields) = op {
                    fields.insert(CREATED_AT, now);
                    fields.insert(UPDATED_AT, now);
                    break;
                }
            }
        } else {
            for op in &mut self.operations {
                if let UpdateOperation::Set(fields) = op {
                    fields.insert(UPDATED_AT, now);
                    break;
                }
            }
        }

        self
    }

    /// Renders the wire form. Repeated operators are merged, later fields
    /// winning.
    pub fn into_document(self) -> Document {
        let mut doc = Document::new();

        for op in self.operations {
            let (key, value) = op.into_entry();
            match value {
                Bson::Document(fields) if matches!(doc.get(&key), Some(Bson::Document(_))) => {
                    if let Some(Bson::Document(existing)) = doc.get_mut(&key) {
                        existing.extend(fields);
                    }
                }
                value => {
                    doc.insert(key, value);
                }
            }
        }

        doc
    }
}

impl From<Document> for UpdateDocument {
    fn from(doc: Document) -> Self {
        let operations = doc
            .into_iter()
            .map(|(key, value)| UpdateOperation::classify(key, value))
            .collect();

        Self { operations }
    }
}

impl From<UpdateDocument> for Document {
    fn from(update: UpdateDocument) -> Self {
        update.into_document()
    }
}
