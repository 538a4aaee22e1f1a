use super::*;
use crate::{
    db::{
        changeset::ChangeSet,
        entity::EntityState,
        query::{Expr, FieldRef, Join, JoinQual, Source},
        schema::Schema,
    },
    error::{ErrorClass, ErrorDetail, ErrorOrigin},
    obs::sink::{MetricsSink, with_metrics_sink},
    test_fixtures::{
        AUTHOR, COMMENT, LIKE, MockRepo, POST, PROFILE, TAG, blog_builder, blog_schema, comment,
        post,
    },
};
use std::{cell::RefCell, rc::Rc};

fn assoc<'a>(schema: &'a Schema, owner: &EntityModel, field: &str) -> &'a Association {
    schema
        .association(owner.path, field)
        .expect("association should be registered")
}

fn declare_err(
    f: impl FnOnce(&mut crate::db::schema::SchemaBuilder) -> Result<(), InternalError>,
) -> AssociationError {
    let mut builder = Schema::builder();
    let err = f(&mut builder).expect_err("declaration should fail");
    assert_eq!(err.class, ErrorClass::Configuration);

    match err.detail {
        Some(ErrorDetail::Association(err)) => err,
        None => panic!("configuration error should carry association detail"),
    }
}

// ─────────────────────────────────────────────
// Descriptor builder
// ─────────────────────────────────────────────

#[test]
fn association_key_snake_cases_last_segment() {
    assert_eq!(association_key(&POST, "id"), "post_id");

    static BLOG_POST: EntityModel = EntityModel::new("app::BlogPost", "blog_posts", None, &[]);
    assert_eq!(association_key(&BLOG_POST, "uuid"), "blog_post_uuid");
}

#[test]
fn has_many_derives_keys_from_owner() {
    let schema = blog_schema();
    let Association::DirectChild(has) = assoc(&schema, &POST, "comments") else {
        panic!("comments should be a direct child");
    };

    assert_eq!(has.cardinality, Cardinality::Many);
    assert_eq!(has.owner_key, "id");
    assert_eq!(has.related_key, "post_id");
    assert_eq!(has.related, &COMMENT);
    assert_eq!(has.on_delete, OnDelete::Nothing);
    assert_eq!(has.on_replace, OnReplace::Raise);
    assert_eq!(
        assoc(&schema, &POST, "comments").relationship(),
        Relationship::Child
    );
}

#[test]
fn belongs_to_derives_keys_from_parent() {
    let schema = blog_schema();
    let Association::DirectParent(parent) = assoc(&schema, &POST, "author") else {
        panic!("author should be a direct parent");
    };

    assert_eq!(parent.owner_key, "author_id");
    assert_eq!(parent.related_key, "id");
    assert_eq!(parent.on_replace, OnReplace::Nilify);
    assert_eq!(
        assoc(&schema, &POST, "author").relationship(),
        Relationship::Parent
    );
}

#[test]
fn keyless_owner_requires_references() {
    let err = declare_err(|b| {
        b.has_many(&TAG, "comments", AssociationOptions::many().queryable(&COMMENT))?;
        Ok(())
    });

    assert!(matches!(err, AssociationError::MissingReferences { .. }));
}

#[test]
fn explicit_reference_must_be_declared() {
    let err = declare_err(|b| {
        b.has_many(
            &POST,
            "comments",
            AssociationOptions::many()
                .queryable(&COMMENT)
                .references("uuid"),
        )?;
        Ok(())
    });

    assert_eq!(
        err,
        AssociationError::UnknownReference {
            owner: "Blog.Post".to_string(),
            field: "comments".to_string(),
            reference: "uuid".to_string(),
        }
    );
}

#[test]
fn invalid_on_delete_lists_valid_values() {
    let err = declare_err(|b| {
        b.has_many(
            &POST,
            "comments",
            AssociationOptions::many()
                .queryable(&COMMENT)
                .on_delete("cascade"),
        )?;
        Ok(())
    });

    assert!(matches!(err, AssociationError::InvalidOnDelete { .. }));
    assert!(
        err.to_string()
            .contains("`nothing`, `clear_references`, `delete_all`")
    );
}

#[test]
fn invalid_on_replace_lists_valid_values() {
    let err = declare_err(|b| {
        b.has_one(
            &POST,
            "profile",
            AssociationOptions::one()
                .queryable(&PROFILE)
                .on_replace("update"),
        )?;
        Ok(())
    });

    assert!(matches!(err, AssociationError::InvalidOnReplace { .. }));
    assert!(
        err.to_string()
            .contains("`raise`, `mark_invalid`, `delete`, `nilify`")
    );
}

#[test]
fn belongs_to_rejects_undeclared_foreign_key() {
    let err = declare_err(|b| {
        b.belongs_to(&COMMENT, "author", AssociationOptions::one().queryable(&AUTHOR))?;
        Ok(())
    });

    assert!(matches!(
        err,
        AssociationError::UnknownForeignKey { ref key, .. } if key == "author_id"
    ));
}

#[test]
fn belongs_to_rejects_on_delete() {
    let err = declare_err(|b| {
        b.belongs_to(
            &POST,
            "author",
            AssociationOptions::one()
                .queryable(&AUTHOR)
                .on_delete("delete_all"),
        )?;
        Ok(())
    });

    assert!(matches!(
        err,
        AssociationError::InvalidOption {
            option: "on_delete",
            ..
        }
    ));
}

#[test]
fn direct_association_requires_queryable() {
    let err = declare_err(|b| {
        b.has_many(&POST, "comments", AssociationOptions::many())?;
        Ok(())
    });

    assert!(matches!(err, AssociationError::MissingQueryable { .. }));
}

#[test]
fn through_chain_must_have_two_hops() {
    let err = declare_err(|b| {
        b.has_many(&POST, "comments", AssociationOptions::many().queryable(&COMMENT))?
            .has_many(
                &POST,
                "likes",
                AssociationOptions::many().through(["comments"]),
            )?;
        Ok(())
    });

    assert!(matches!(err, AssociationError::ThroughTooShort { len: 1, .. }));
}

#[test]
fn through_first_hop_must_exist() {
    let err = declare_err(|b| {
        b.has_many(
            &POST,
            "comment_likes",
            AssociationOptions::many().through(["comments", "likes"]),
        )?;
        Ok(())
    });

    assert!(matches!(
        err,
        AssociationError::UnknownThroughHop { ref hop, .. } if hop == "comments"
    ));
}

#[test]
fn through_rejects_queryable() {
    let err = declare_err(|b| {
        b.has_many(&POST, "comments", AssociationOptions::many().queryable(&COMMENT))?
            .has_many(
                &POST,
                "comment_likes",
                AssociationOptions::many()
                    .through(["comments", "likes"])
                    .queryable(&LIKE),
            )?;
        Ok(())
    });

    assert!(matches!(err, AssociationError::QueryableWithThrough { .. }));
}

#[test]
fn through_rejects_direct_only_options() {
    let err = declare_err(|b| {
        b.has_many(&POST, "comments", AssociationOptions::many().queryable(&COMMENT))?
            .has_many(
                &POST,
                "comment_likes",
                AssociationOptions::many()
                    .through(["comments", "likes"])
                    .on_replace("delete"),
            )?;
        Ok(())
    });

    assert!(matches!(
        err,
        AssociationError::InvalidOption {
            kind: "through",
            option: "on_replace",
            ..
        }
    ));
}

#[test]
fn duplicate_field_is_a_schema_error() {
    let mut builder = Schema::builder();
    builder
        .has_many(&POST, "comments", AssociationOptions::many().queryable(&COMMENT))
        .expect("first declaration should succeed");
    let err = builder
        .has_one(&POST, "comments", AssociationOptions::one().queryable(&COMMENT))
        .expect_err("duplicate should fail");

    assert_eq!(err.origin, ErrorOrigin::Schema);
    assert!(matches!(
        err.detail,
        Some(ErrorDetail::Association(
            AssociationError::DuplicateAssociation { .. }
        ))
    ));
}

// ─────────────────────────────────────────────
// Query synthesis
// ─────────────────────────────────────────────

#[test]
fn direct_joins_query_links_related_to_owner() {
    let schema = blog_schema();
    let query = assoc(&schema, &POST, "comments")
        .joins_query(&schema)
        .expect("joins query");

    assert_eq!(query.from, Source::of(&POST));
    assert_eq!(
        query.joins,
        vec![Join {
            qual: JoinQual::Inner,
            ix: 1,
            source: Source::of(&COMMENT),
            on: Filter::fields_eq(1, "post_id", 0, "id"),
        }]
    );
    assert!(query.filters.is_empty());
}

#[test]
fn direct_assoc_query_filters_on_related_key() {
    let schema = blog_schema();
    let query = assoc(&schema, &POST, "comments")
        .assoc_query(&schema, None, vec![Value::from(1), Value::from(2)])
        .expect("assoc query");

    assert_eq!(query.from, Source::of(&COMMENT));
    assert!(query.joins.is_empty());
    assert!(!query.distinct);

    let [filter] = query.filters.as_slice() else {
        panic!("expected exactly one filter");
    };
    assert_eq!(
        filter.expr,
        Expr::in_(Expr::field(0, "post_id"), Expr::Param(0))
    );
    assert_eq!(filter.params[0].value, Value::from(vec![1, 2]));
    assert_eq!(filter.params[0].cast, Some(FieldRef::new(0, "post_id")));
}

#[test]
fn assoc_query_reads_overridden_source() {
    let mut builder = Schema::builder();
    builder
        .has_many(
            &POST,
            "archived",
            AssociationOptions::many()
                .queryable(&COMMENT)
                .source("archived_comments"),
        )
        .expect("declaration");
    let schema = builder.build();

    let query = assoc(&schema, &POST, "archived")
        .assoc_query(&schema, None, vec![Value::from(1)])
        .expect("assoc query");

    assert_eq!(query.from, Source::new("Blog.Comment", "archived_comments"));
}

#[test]
fn assoc_query_composes_onto_caller_query() {
    let schema = blog_schema();
    let outer = Query::from_source(Source::of(&COMMENT)).filter(Filter::new(Expr::IsNull(
        Box::new(Expr::field(0, "body")),
    )));

    let query = assoc(&schema, &POST, "comments")
        .assoc_query(&schema, Some(outer), vec![Value::from(3)])
        .expect("assoc query");

    assert_eq!(query.filters.len(), 2);
    assert_eq!(query.filters[1], Filter::field_in(0, "post_id", vec![Value::from(3)]));
}

#[test]
fn assoc_query_for_dedups_owner_keys() {
    let schema = blog_schema();
    let owners = vec![
        post(2),
        post(1),
        post(2),
        Entity::loaded(&POST, [("title", "draft")]),
    ];

    let query = assoc(&schema, &POST, "comments")
        .assoc_query_for(&schema, &owners)
        .expect("assoc query");

    assert_eq!(
        query.filters[0].params[0].value,
        Value::from(vec![2, 1])
    );
}

#[test]
fn through_resolves_keys_from_first_and_last_hop() {
    let schema = blog_schema();
    let through = assoc(&schema, &POST, "comment_likes");

    assert!(through.is_through());
    assert_eq!(through.owner_key(&schema).expect("owner key"), "id");
    assert_eq!(through.related_key(&schema).expect("related key"), "comment_id");
    assert_eq!(through.related_model(&schema).expect("related"), &LIKE);
    assert_eq!(through.relationship(), Relationship::Child);
}

#[test]
fn through_joins_query_threads_positions() {
    let schema = blog_schema();
    let query = assoc(&schema, &POST, "comment_likes")
        .joins_query(&schema)
        .expect("joins query");

    assert_eq!(query.from, Source::of(&POST));
    assert_eq!(
        query.joins,
        vec![
            Join {
                qual: JoinQual::Inner,
                ix: 1,
                source: Source::of(&COMMENT),
                on: Filter::fields_eq(1, "post_id", 0, "id"),
            },
            Join {
                qual: JoinQual::Inner,
                ix: 2,
                source: Source::of(&LIKE),
                on: Filter::fields_eq(2, "comment_id", 1, "id"),
            },
        ]
    );
}

#[test]
fn through_assoc_query_folds_last_hop_into_root_binding() {
    let schema = blog_schema();
    let query = assoc(&schema, &POST, "comment_likes")
        .assoc_query(&schema, None, vec![Value::from(1)])
        .expect("assoc query");

    assert_eq!(query.from, Source::of(&LIKE));
    assert!(query.distinct);
    assert_eq!(
        query.joins,
        vec![Join {
            qual: JoinQual::Inner,
            ix: 1,
            source: Source::of(&COMMENT),
            on: Filter::field_in(1, "post_id", vec![Value::from(1)]),
        }]
    );
    assert_eq!(
        query.filters,
        vec![Filter::fields_eq(0, "comment_id", 1, "id")]
    );

    // No reference to the popped join's position survives.
    assert_eq!(query.max_binding(), 1);
}

#[test]
fn through_of_through_expands_nested_first_hop() {
    let schema = blog_schema();
    let query = assoc(&schema, &AUTHOR, "post_likes")
        .assoc_query(&schema, None, vec![Value::from(7)])
        .expect("assoc query");

    assert_eq!(query.from, Source::of(&LIKE));
    assert!(query.distinct);

    let sources: Vec<_> = query.joins.iter().map(|j| (j.ix, j.source.entity)).collect();
    assert_eq!(sources, vec![(1, "Blog.Post"), (2, "Blog.Comment")]);
    assert_eq!(
        query.joins[0].on,
        Filter::field_in(1, "author_id", vec![Value::from(7)])
    );
    assert_eq!(query.joins[1].on, Filter::fields_eq(2, "post_id", 1, "id"));
    assert_eq!(
        query.filters,
        vec![Filter::fields_eq(0, "comment_id", 2, "id")]
    );
}

// Author has_many post_comment_likes through [posts, comment_likes]
fn nested_last_hop_schema() -> Schema {
    let mut builder = blog_builder();
    builder
        .has_many(
            &AUTHOR,
            "post_comment_likes",
            AssociationOptions::many().through(["posts", "comment_likes"]),
        )
        .expect("declaration");

    builder.build()
}

#[test]
fn through_of_through_expands_nested_last_hop() {
    let schema = nested_last_hop_schema();
    let query = assoc(&schema, &AUTHOR, "post_comment_likes")
        .assoc_query(&schema, None, vec![Value::from(7)])
        .expect("assoc query");

    assert_eq!(query.from, Source::of(&LIKE));
    assert!(query.distinct);
    assert_eq!(
        query.joins,
        vec![
            Join {
                qual: JoinQual::Inner,
                ix: 1,
                source: Source::of(&POST),
                on: Filter::field_in(1, "author_id", vec![Value::from(7)]),
            },
            Join {
                qual: JoinQual::Inner,
                ix: 2,
                source: Source::of(&COMMENT),
                on: Filter::fields_eq(2, "post_id", 1, "id"),
            },
        ]
    );
    assert_eq!(
        query.filters,
        vec![Filter::fields_eq(0, "comment_id", 2, "id")]
    );
}

#[test]
fn through_joins_query_expands_nested_last_hop() {
    let schema = nested_last_hop_schema();
    let query = assoc(&schema, &AUTHOR, "post_comment_likes")
        .joins_query(&schema)
        .expect("joins query");

    assert_eq!(query.from, Source::of(&AUTHOR));
    let joins: Vec<_> = query
        .joins
        .iter()
        .map(|j| (j.ix, j.source.entity, j.on.clone()))
        .collect();
    assert_eq!(
        joins,
        vec![
            (1, POST.path, Filter::fields_eq(1, "author_id", 0, "id")),
            (2, COMMENT.path, Filter::fields_eq(2, "post_id", 1, "id")),
            (3, LIKE.path, Filter::fields_eq(3, "comment_id", 2, "id")),
        ]
    );
}

#[test]
fn through_assoc_query_offsets_caller_joins() {
    let schema = blog_schema();
    let caller_join = Filter::fields_eq(1, "id", 0, "comment_id");
    let outer = Query::from_source(Source::of(&LIKE))
        .inner_join(Source::of(&COMMENT), caller_join.clone());

    let query = assoc(&schema, &POST, "comment_likes")
        .assoc_query(&schema, Some(outer), vec![Value::from(1)])
        .expect("assoc query");

    assert_eq!(
        query.joins,
        vec![
            Join {
                qual: JoinQual::Inner,
                ix: 1,
                source: Source::of(&COMMENT),
                on: caller_join,
            },
            Join {
                qual: JoinQual::Inner,
                ix: 2,
                source: Source::of(&COMMENT),
                on: Filter::field_in(2, "post_id", vec![Value::from(1)]),
            },
        ]
    );
    assert_eq!(
        query.filters,
        vec![Filter::fields_eq(0, "comment_id", 2, "id")]
    );
    assert_eq!(query.max_binding(), 2);
}

#[test]
fn through_assoc_query_keeps_caller_source() {
    let schema = blog_schema();
    let archived = Source::new(LIKE.path, "archived_likes");
    let outer = Query::from_source(archived.clone());

    let query = assoc(&schema, &POST, "comment_likes")
        .assoc_query(&schema, Some(outer), vec![Value::from(1)])
        .expect("assoc query");

    assert_eq!(query.from, archived);
}

#[test]
fn through_first_hop_may_be_belongs_to() {
    let mut builder = blog_builder();
    builder
        .belongs_to(&COMMENT, "post", AssociationOptions::one().queryable(&POST))
        .and_then(|b| {
            b.has_one(
                &COMMENT,
                "post_profile",
                AssociationOptions::one().through(["post", "profile"]),
            )
        })
        .expect("declaration");
    let schema = builder.build();
    let through = assoc(&schema, &COMMENT, "post_profile");

    assert_eq!(through.owner_key(&schema).expect("owner key"), "post_id");
    assert_eq!(through.related_key(&schema).expect("related key"), "post_id");

    let query = through
        .assoc_query(&schema, None, vec![Value::from(3)])
        .expect("assoc query");

    assert_eq!(query.from, Source::of(&PROFILE));
    assert_eq!(
        query.joins,
        vec![Join {
            qual: JoinQual::Inner,
            ix: 1,
            source: Source::of(&POST),
            on: Filter::field_in(1, "id", vec![Value::from(3)]),
        }]
    );
    assert_eq!(
        query.filters,
        vec![Filter::fields_eq(0, "post_id", 1, "id")]
    );
}

#[test]
fn through_with_unresolvable_hop_fails_lazily() {
    let mut builder = Schema::builder();
    builder
        .has_many(&POST, "comments", AssociationOptions::many().queryable(&COMMENT))
        .and_then(|b| {
            b.has_many(
                &POST,
                "dangling",
                AssociationOptions::many().through(["comments", "missing"]),
            )
        })
        .expect("only the first hop is checked at declaration");
    let schema = builder.build();

    let err = assoc(&schema, &POST, "dangling")
        .assoc_query(&schema, None, vec![Value::from(1)])
        .expect_err("second hop does not exist");

    assert_eq!(err.class, ErrorClass::Configuration);
    assert_eq!(err.origin, ErrorOrigin::Query);
    assert!(err.message.contains("`missing`"));
    assert!(err.message.contains("through association `dangling`"));

    let err = assoc(&schema, &POST, "dangling")
        .related_key(&schema)
        .expect_err("key resolution walks the same chain");
    assert!(err.message.contains("through association `dangling`"));
}

#[test]
fn through_assoc_query_rejects_outer_query_of_other_type() {
    let schema = blog_schema();
    let outer = Query::from_source(Source::of(&COMMENT));
    let err = assoc(&schema, &POST, "comment_likes")
        .assoc_query(&schema, Some(outer), vec![Value::from(1)])
        .expect_err("outer query selects the wrong type");

    assert_eq!(err.class, ErrorClass::Configuration);
    assert_eq!(err.origin, ErrorOrigin::Query);
}

#[test]
fn synthesized_queries_are_reported_to_the_sink() {
    #[derive(Default)]
    struct Recording(RefCell<Vec<String>>);

    impl MetricsSink for Recording {
        fn record(&self, event: crate::obs::MetricsEvent<'_>) {
            self.0.borrow_mut().push(format!("{event:?}"));
        }
    }

    let schema = blog_schema();
    let sink = Rc::new(Recording::default());
    with_metrics_sink(sink.clone(), || {
        assoc(&schema, &POST, "comments")
            .joins_query(&schema)
            .expect("joins query");
    });

    let events = sink.0.borrow();
    assert_eq!(events.len(), 1);
    assert!(events[0].contains("Joins"));
}

#[test]
fn query_shapes_serialize() {
    let schema = blog_schema();
    let query = assoc(&schema, &POST, "comment_likes")
        .assoc_query(&schema, None, vec![Value::from(1)])
        .expect("assoc query");

    let json = serde_json::to_value(&query).expect("serialize");
    assert_eq!(json["distinct"], serde_json::Value::Bool(true));
    assert_eq!(json["from"]["source"], "likes");
}

// ─────────────────────────────────────────────
// Hooks
// ─────────────────────────────────────────────

#[test]
fn has_build_applies_defaults_then_key_then_attributes() {
    let has = build_has(
        &POST,
        "comments",
        &AssociationOptions::many()
            .queryable(&COMMENT)
            .default_value("body", "(empty)")
            .default_value("post_id", 99),
    )
    .expect("descriptor");

    let built = has
        .build(&post(5), &[("body".to_string(), Value::from("first"))])
        .expect("build");

    assert_eq!(built.state(), EntityState::Built);
    assert_eq!(built.get("post_id"), &Value::from(5));
    assert_eq!(built.get("body"), &Value::from("first"));
}

#[test]
fn belongs_to_build_ignores_owner() {
    let schema = blog_schema();
    let built = assoc(&schema, &POST, "author")
        .build(&post(5), &[("name".to_string(), Value::from("bo"))])
        .expect("build");

    assert_eq!(built.model(), &AUTHOR);
    assert_eq!(built.get("name"), &Value::from("bo"));
    assert!(built.get("id").is_null());
}

#[test]
fn through_is_read_only() {
    let schema = blog_schema();
    let through = assoc(&schema, &POST, "comment_likes");
    let repo = MockRepo::new();
    let parent = ChangeSet::update(post(1));
    let like = Entity::loaded(&LIKE, [("id", 1)]);

    let err = through.build(&post(1), &[]).expect_err("build");
    assert!(err.is_misuse());

    let err = through
        .persist(&parent, ChangeSet::insert(like.clone()), &repo)
        .expect_err("persist");
    assert!(err.is_misuse());

    let err = through
        .on_replace(ReplaceAction::Delete, &like, &parent, &repo)
        .expect_err("replace");
    assert!(err.is_misuse());
    assert!(repo.calls().is_empty());
}

#[test]
fn preload_info_per_variant() {
    let schema = blog_schema();

    assert_eq!(
        assoc(&schema, &POST, "comments").preload_info(),
        PreloadInfo::Assoc {
            related_key: "post_id".to_string()
        }
    );
    assert_eq!(
        assoc(&schema, &POST, "comment_likes").preload_info(),
        PreloadInfo::Through {
            chain: vec!["comments".to_string(), "likes".to_string()]
        }
    );
}

#[test]
fn on_delete_plan_per_policy() {
    let plan = |policy: &str| {
        build_has(
            &POST,
            "comments",
            &AssociationOptions::many()
                .queryable(&COMMENT)
                .on_delete(policy),
        )
        .expect("descriptor")
        .on_delete_plan(&post(4))
    };

    assert_eq!(plan("nothing"), None);

    let Some(OnDeletePlan::DeleteAll(query)) = plan("delete_all") else {
        panic!("delete_all should plan a delete");
    };
    assert_eq!(
        query.filters,
        vec![Filter::field_in(0, "post_id", vec![Value::from(4)])]
    );

    let Some(OnDeletePlan::UpdateAll(update)) = plan("clear_references") else {
        panic!("clear_references should plan an update");
    };
    assert_eq!(update.set, vec![("post_id".to_string(), Value::Null)]);
}

#[test]
fn has_persist_sets_and_restores_foreign_key() {
    let schema = blog_schema();
    let comments = assoc(&schema, &POST, "comments");
    let repo = MockRepo::new().reject_when("body", "");
    let parent = ChangeSet::update(post(3));

    let ok = comments
        .persist(
            &parent,
            ChangeSet::insert(Entity::built(&COMMENT)).with_change("body", "hi"),
            &repo,
        )
        .expect("persist")
        .expect("accepted");
    assert_eq!(ok.change.changes.value("post_id"), Some(&Value::from(3)));
    assert_eq!(
        ok.entity.expect("inserted").get("post_id"),
        &Value::from(3)
    );

    let rejected = comments
        .persist(
            &parent,
            ChangeSet::insert(Entity::built(&COMMENT))
                .with_change("body", "")
                .with_change("post_id", 42),
            &repo,
        )
        .expect("persist")
        .expect_err("rejected");
    assert_eq!(rejected.changes.value("post_id"), Some(&Value::from(42)));
    assert!(!rejected.valid);

    // The repo still saw the owner's key.
    assert_eq!(repo.calls()[1].changes.value("post_id"), Some(&Value::from(3)));
}

#[test]
fn nested_delete_reports_no_entity() {
    let schema = blog_schema();
    let repo = MockRepo::new();
    let parent = ChangeSet::update(post(3));

    let persisted = assoc(&schema, &POST, "comments")
        .persist(
            &parent,
            ChangeSet::delete(comment(9, 3)),
            &repo,
        )
        .expect("persist")
        .expect("accepted");

    assert_eq!(persisted.entity, None);
    assert_eq!(persisted.change.changes.value("post_id"), None);
}
