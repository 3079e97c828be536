use serde::{Deserialize, Serialize};

/// A catalog entry. `id == 0` means the book has not been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub author: String,
    pub title: String,
    pub description: String,
    /// Stored as given; the format is not validated.
    pub isbn: String,
    /// Assigned by the store on creation
    #[serde(default)]
    pub id: i64,
}

impl Book {
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }
}

/// Request model for creating a new book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBook {
    pub author: String,
    pub title: String,
    pub description: String,
    pub isbn: String,
}

impl From<NewBook> for Book {
    fn from(new: NewBook) -> Self {
        Self {
            author: new.author,
            title: new.title,
            description: new.description,
            isbn: new.isbn,
            id: 0,
        }
    }
}
