use crate::{
    db::{
        association::AssociationOptions,
        changeset::{Action, ChangeSet},
        entity::Entity,
        repo::{Repo, RepoResult},
        schema::{Schema, SchemaBuilder},
    },
    model::EntityModel,
    value::Value,
};
use std::cell::{Cell, RefCell};

pub static POST: EntityModel = EntityModel::new(
    "Blog.Post",
    "posts",
    Some("id"),
    &["id", "title", "author_id"],
);
pub static COMMENT: EntityModel = EntityModel::new(
    "Blog.Comment",
    "comments",
    Some("id"),
    &["id", "body", "post_id"],
);
pub static LIKE: EntityModel =
    EntityModel::new("Blog.Like", "likes", Some("id"), &["id", "comment_id"]);
pub static AUTHOR: EntityModel =
    EntityModel::new("Blog.Author", "authors", Some("id"), &["id", "name"]);
pub static PROFILE: EntityModel =
    EntityModel::new("Blog.Profile", "profiles", Some("id"), &["id", "post_id"]);

/// Keyless model, for reference-key derivation failures.
pub static TAG: EntityModel = EntityModel::new("Blog.Tag", "tags", None, &["name"]);

///
/// blog_schema
///
/// Post  has_many   comments        (Comment.post_id)
/// Post  has_one    profile         (Profile.post_id, on_replace delete)
/// Post  belongs_to author          (Post.author_id, on_replace nilify)
/// Post  has_many   comment_likes   through [comments, likes]
/// Comment has_many likes           (Like.comment_id)
/// Author has_many  posts           (Post.author_id)
/// Author has_many  post_comments   through [posts, comments]
/// Author has_many  post_likes      through [post_comments, likes]
///

pub fn blog_schema() -> Schema {
    blog_builder().build()
}

/// Builder with the blog declarations applied, for tests that add more.
pub fn blog_builder() -> SchemaBuilder {
    let mut builder = Schema::builder();
    declare_blog(&mut builder).expect("blog schema should build");

    builder
}

fn declare_blog(b: &mut SchemaBuilder) -> Result<(), crate::error::InternalError> {
    b.entity(&LIKE)
        .has_many(&COMMENT, "likes", AssociationOptions::many().queryable(&LIKE))?
        .has_many(&POST, "comments", AssociationOptions::many().queryable(&COMMENT))?
        .has_one(
            &POST,
            "profile",
            AssociationOptions::one()
                .queryable(&PROFILE)
                .on_replace("delete"),
        )?
        .belongs_to(
            &POST,
            "author",
            AssociationOptions::one()
                .queryable(&AUTHOR)
                .on_replace("nilify"),
        )?
        .has_many(
            &POST,
            "comment_likes",
            AssociationOptions::many().through(["comments", "likes"]),
        )?
        .has_many(
            &AUTHOR,
            "posts",
            AssociationOptions::many()
                .queryable(&POST)
                .foreign_key("author_id"),
        )?
        .has_many(
            &AUTHOR,
            "post_comments",
            AssociationOptions::many().through(["posts", "comments"]),
        )?
        .has_many(
            &AUTHOR,
            "post_likes",
            AssociationOptions::many().through(["post_comments", "likes"]),
        )?;

    Ok(())
}

pub fn post(id: i64) -> Entity {
    Entity::loaded(&POST, [("id", Value::from(id)), ("title", Value::from("hello"))])
}

pub fn comment(id: i64, post_id: i64) -> Entity {
    Entity::loaded(&COMMENT, [("id", id), ("post_id", post_id)])
}

pub fn author(id: i64) -> Entity {
    Entity::loaded(&AUTHOR, [("id", Value::from(id)), ("name", Value::from("ana"))])
}

pub fn profile(id: i64, post_id: i64) -> Entity {
    Entity::loaded(&PROFILE, [("id", id), ("post_id", post_id)])
}

///
/// MockRepo
///
/// Recording repo. Every dispatched change set is kept in call order;
/// inserts without a primary key get sequential ids from 100.
///

pub struct MockRepo {
    calls: RefCell<Vec<ChangeSet>>,
    rejects: Vec<(String, Value)>,
    next_id: Cell<i64>,
}

impl MockRepo {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            rejects: Vec::new(),
            next_id: Cell::new(100),
        }
    }

    /// Reject any change set whose resulting `field` equals `value`.
    pub fn reject_when(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.rejects.push((field.to_string(), value.into()));
        self
    }

    pub fn calls(&self) -> Vec<ChangeSet> {
        self.calls.borrow().clone()
    }

    /// (action, type path, identity) per call.
    pub fn log(&self) -> Vec<(Action, &'static str, Value)> {
        self.calls
            .borrow()
            .iter()
            .map(|c| (c.action, c.data.model().path, c.field_value(pk(c)).clone()))
            .collect()
    }

    fn store(&self, change: ChangeSet) -> RepoResult {
        self.calls.borrow_mut().push(change.clone());

        for (field, value) in &self.rejects {
            if change.field_value(field) == value {
                let mut rejected = change;
                rejected.add_error(field.clone(), "is invalid");
                return Err(rejected);
            }
        }

        let mut entity = change.apply_changes();
        if change.action == Action::Insert && entity.identity().is_null() {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            entity.put(pk(&change), id);
        }

        Ok(entity)
    }
}

fn pk(change: &ChangeSet) -> &'static str {
    change.data.model().primary_key.unwrap_or("id")
}

impl Repo for MockRepo {
    fn insert(&self, change: ChangeSet) -> RepoResult {
        self.store(change)
    }

    fn update(&self, change: ChangeSet) -> RepoResult {
        self.store(change)
    }

    fn delete(&self, change: ChangeSet) -> RepoResult {
        self.store(change)
    }
}
