use serde::Serialize;

///
/// EntityModel
/// Minimal runtime model for one aggregate type.
///

#[derive(Debug, Eq, PartialEq, Serialize)]
pub struct EntityModel {
    /// Fully-qualified type identity (e.g. `Blog.Post`).
    pub path: &'static str,
    /// Default storage source used when querying this type.
    pub source: &'static str,
    /// Primary key field, if the type declares one.
    pub primary_key: Option<&'static str>,
    /// Declared field set (authoritative for key validation).
    pub fields: &'static [&'static str],
}

impl EntityModel {
    #[must_use]
    pub const fn new(
        path: &'static str,
        source: &'static str,
        primary_key: Option<&'static str>,
        fields: &'static [&'static str],
    ) -> Self {
        Self {
            path,
            source,
            primary_key,
            fields,
        }
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains(&name)
    }

    /// Last segment of the type identity (`Blog.Post` → `Post`).
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.path.rsplit(['.', ':']).next().unwrap_or(self.path)
    }
}

///
/// TESTS
///
