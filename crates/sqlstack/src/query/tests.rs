use super::render;
use super::stack::{ClauseData, WhereClause};
use super::*;
use crate::condition::{Logic, Op, QueryParams};
use crate::database::FallbackPlan;
use crate::error::SqlError;
use crate::ident::Sql;
use crate::test_util::MockDb;
use crate::value::Value;

fn pg() -> Query<MockDb> {
    Query::new(MockDb::new("pgsql"))
}

fn mysql() -> Query<MockDb> {
    Query::new(MockDb::new("mysql"))
}

fn sqlite() -> Query<MockDb> {
    Query::new(MockDb::new("sqlite"))
}

// ==================== End-to-end scenarios ====================

#[test]
fn select_where_map_limit() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("users")
        .unwrap()
        .where_map([("id", 1)])
        .unwrap()
        .limit(1);
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM \"users\" WHERE (\"id\" = 1) LIMIT 1"
    );
}

#[test]
fn delete_with_where() {
    let q = pg()
        .from("users")
        .unwrap()
        .where_eq("id", 5)
        .unwrap()
        .delete();
    assert_eq!(
        q.to_sql().unwrap(),
        "DELETE FROM \"users\" WHERE (\"id\" = 5)"
    );
}

#[test]
fn insert_with_returning() {
    let q = pg()
        .table("users")
        .unwrap()
        .insert([("name", Value::from("Kerem")), ("age", Value::from(30))])
        .unwrap()
        .returning("id")
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "INSERT INTO \"users\" (\"name\", \"age\") VALUES ('Kerem', 30) RETURNING \"id\""
    );
}

#[test]
fn update_with_returning_and_where() {
    let q = pg()
        .table("users")
        .unwrap()
        .update([("active", false)])
        .unwrap()
        .returning("id, active")
        .unwrap()
        .where_params("id = ?", &[1.into()])
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "UPDATE \"users\" SET \"active\" = false WHERE (\"id\" = 1) RETURNING \"id\", \"active\""
    );
}

#[test]
fn where_map_group_with_or() {
    let q = pg()
        .from("t")
        .unwrap()
        .select("id")
        .unwrap()
        .where_map([("a", 1), ("b!", 2)])
        .unwrap()
        .or_()
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT \"id\" FROM \"t\" WHERE (\"a\" = 1 OR \"b\" != 2)"
    );
}

#[test]
fn conflict_update_all_mysql() {
    let q = mysql()
        .table("u")
        .unwrap()
        .insert([("k", 1), ("v", 2)])
        .unwrap()
        .conflict_update_all("k")
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "INSERT INTO `u` (`k`, `v`) VALUES (1, 2) \
         ON DUPLICATE KEY UPDATE `k` = VALUES(`k`), `v` = VALUES(`v`)"
    );
}

#[test]
fn with_clause_precedes_select() {
    let db = MockDb::new("pgsql");
    let sub = Query::new(std::sync::Arc::clone(&db))
        .select("*")
        .unwrap()
        .from("users")
        .unwrap();
    let q = Query::new(db)
        .with_query("t", &sub, None)
        .unwrap()
        .from("t")
        .unwrap()
        .select("*")
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "WITH \"t\" AS (SELECT * FROM \"users\") SELECT * FROM \"t\""
    );
}

// ==================== Invariants ====================

#[test]
fn render_is_pure() {
    let q = pg()
        .select("id")
        .unwrap()
        .from("t")
        .unwrap()
        .where_eq("a", 1)
        .unwrap();
    assert_eq!(q.to_sql().unwrap(), q.to_sql().unwrap());
}

#[test]
fn clone_renders_identically_and_fresh_is_empty() {
    let q = pg().select("id").unwrap().from("t").unwrap();
    assert_eq!(q.clone().to_sql().unwrap(), q.to_sql().unwrap());
    assert!(matches!(q.fresh().to_sql(), Err(SqlError::NoQueryReady)));
}

#[test]
fn insert_batch_arity_checked_before_render() {
    let err = pg()
        .table("t")
        .unwrap()
        .insert_batch(&["a", "b"], &[vec![1.into()]])
        .unwrap_err();
    assert!(matches!(
        err,
        SqlError::InsertArity {
            row: 0,
            expected: 2,
            got: 1
        }
    ));
}

#[test]
fn update_and_delete_require_where() {
    let upd = pg().table("t").unwrap().update([("a", 1)]).unwrap();
    assert!(matches!(upd.to_sql(), Err(SqlError::MissingWhere("UPDATE"))));

    let del = pg().table("t").unwrap().delete();
    assert!(matches!(del.to_sql(), Err(SqlError::MissingWhere("DELETE"))));

    // explicit opt-out
    let all = pg().table("t").unwrap().delete().where_("1=1").unwrap();
    assert_eq!(all.to_sql().unwrap(), "DELETE FROM \"t\" WHERE (1=1)");
}

#[test]
fn or_and_rewrite_only_the_last_element() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .where_eq("a", 1)
        .unwrap()
        .where_eq("b", 2)
        .unwrap()
        .or_()
        .unwrap()
        .and_()
        .unwrap()
        .or_()
        .unwrap();
    match q.pick(ClauseKey::Where) {
        Some(ClauseData::Wheres(items)) => {
            assert_eq!(items[0].logic, Logic::And);
            assert_eq!(items[1].logic, Logic::Or);
        }
        other => panic!("unexpected where payload: {other:?}"),
    }
}

#[test]
fn or_flows_into_the_next_element() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .where_eq("a", 1)
        .unwrap()
        .or_()
        .unwrap()
        .where_eq("b", 2)
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM \"t\" WHERE (\"a\" = 1) OR (\"b\" = 2)"
    );
}

#[test]
fn logic_change_opens_nested_group() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .where_eq("a", 1)
        .unwrap()
        .where_eq("b", 2)
        .unwrap()
        .or_()
        .unwrap()
        .where_eq("c", 3)
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM \"t\" WHERE (\"a\" = 1) AND ((\"b\" = 2) OR (\"c\" = 3))"
    );
}

#[test]
fn drop_and_pull_clear_keys() {
    let mut q = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .where_eq("a", 1)
        .unwrap();

    let picked = q.pick(ClauseKey::Where);
    let pulled = q.pull(ClauseKey::Where);
    assert_eq!(picked, pulled);
    assert!(!q.has(ClauseKey::Where));

    let q = q.drop_clause(ClauseKey::Select);
    assert!(!q.has(ClauseKey::Select));
    assert!(q.has(ClauseKey::From));
}

#[test]
fn merge_into_fresh_is_identity_on_rendering() {
    let q = pg()
        .select("id")
        .unwrap()
        .from("t")
        .unwrap()
        .where_eq("a", 1)
        .unwrap()
        .limit(3);
    let merged = q.fresh().merge(&q);
    assert_eq!(merged.to_sql().unwrap(), q.to_sql().unwrap());
}

#[test]
fn hash_matches_for_equivalent_builders() {
    let a = pg().select("id").unwrap().from("t").unwrap();
    let b = pg().from("t").unwrap().select("id").unwrap();
    assert_eq!(a.to_hash().unwrap(), b.to_hash().unwrap());

    let c = pg().select("other").unwrap().from("t").unwrap();
    assert_ne!(a.to_hash().unwrap(), c.to_hash().unwrap());
}

// ==================== Boundaries ====================

#[test]
fn select_star_stays_literal() {
    let q = pg().select("*").unwrap().from("t").unwrap();
    assert_eq!(q.to_sql().unwrap(), "SELECT * FROM \"t\"");
}

#[test]
fn order_by_accepts_numeric_and_string_directions() {
    let by_num = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .order_by("id", -1)
        .unwrap();
    let by_str = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .order_by("id", "DESC")
        .unwrap();
    assert_eq!(by_num.to_sql().unwrap(), by_str.to_sql().unwrap());
    assert!(by_num.to_sql().unwrap().ends_with("ORDER BY \"id\" DESC"));

    let err = pg().order_by("id", 2).unwrap_err();
    assert!(matches!(err, SqlError::InvalidOp(_)));
}

#[test]
fn empty_where_in_is_an_error() {
    let err = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .where_in("id", Vec::<i64>::new())
        .unwrap_err();
    assert!(matches!(err, SqlError::EmptyInput(_)));
}

#[test]
fn offset_requires_limit() {
    assert!(matches!(
        pg().select("*").unwrap().from("t").unwrap().offset(5),
        Err(SqlError::OffsetWithoutLimit)
    ));

    let q = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .limit(10)
        .offset(5)
        .unwrap();
    assert!(q.to_sql().unwrap().ends_with("LIMIT 10 OFFSET 5"));
}

#[test]
fn flow_ops_need_a_preceding_clause() {
    assert!(matches!(
        pg().or_(),
        Err(SqlError::NoPrecedingClause("where"))
    ));
    assert!(matches!(
        pg().on("a = b", &[]),
        Err(SqlError::NoPrecedingClause("join"))
    ));
    assert!(matches!(
        pg().conflict_where("a = 1", &[]),
        Err(SqlError::NoPrecedingClause("conflict"))
    ));
}

// ==================== Clause rendering ====================

#[test]
fn join_with_on_and_using() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("users")
        .unwrap()
        .join("orders")
        .unwrap()
        .on("@users.id = @orders.user_id", &[])
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM \"users\" INNER JOIN \"orders\" \
         ON (\"users\".\"id\" = \"orders\".\"user_id\")"
    );

    let q = pg()
        .select("*")
        .unwrap()
        .from("a")
        .unwrap()
        .left_join("b")
        .unwrap()
        .using("id")
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM \"a\" LEFT JOIN \"b\" USING (\"id\")"
    );
}

#[test]
fn join_without_context_fails_at_render() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("a")
        .unwrap()
        .join("b")
        .unwrap();
    assert!(matches!(q.to_sql(), Err(SqlError::JoinContextMissing(_))));
}

#[test]
fn group_having_order_render_in_order() {
    let q = pg()
        .select("kind")
        .unwrap()
        .select_count("*", Some("total"))
        .unwrap()
        .from("events")
        .unwrap()
        .group_by("kind")
        .unwrap()
        .having("count(*) > ?", &[5.into()])
        .unwrap()
        .desc("total")
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT \"kind\", count(*) AS \"total\" FROM \"events\" \
         GROUP BY \"kind\" HAVING count(*) > 5 ORDER BY \"total\" DESC"
    );
}

#[test]
fn group_by_rollup_lowering() {
    let q = pg()
        .select("a")
        .unwrap()
        .from("t")
        .unwrap()
        .group_by_rollup("a, b")
        .unwrap();
    assert!(q.to_sql().unwrap().contains("GROUP BY ROLLUP (\"a\", \"b\")"));

    let q = mysql()
        .select("a")
        .unwrap()
        .from("t")
        .unwrap()
        .group_by_rollup("a")
        .unwrap();
    assert!(q.to_sql().unwrap().contains("GROUP BY `a` WITH ROLLUP"));
}

#[test]
fn union_renders_after_where() {
    let db = MockDb::new("pgsql");
    let other = Query::new(std::sync::Arc::clone(&db))
        .select("id")
        .unwrap()
        .from("b")
        .unwrap();
    let q = Query::new(db)
        .select("id")
        .unwrap()
        .from("a")
        .unwrap()
        .where_eq("x", 1)
        .unwrap()
        .union_all(&other)
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT \"id\" FROM \"a\" WHERE (\"x\" = 1) UNION ALL SELECT \"id\" FROM \"b\""
    );
}

#[test]
fn with_recursive_and_fields() {
    let db = MockDb::new("pgsql");
    let sub = Query::new(std::sync::Arc::clone(&db))
        .select("id")
        .unwrap()
        .from("nodes")
        .unwrap();
    let q = Query::new(db)
        .with_recursive("tree", &sub, Some("id"))
        .unwrap()
        .select("*")
        .unwrap()
        .from("tree")
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "WITH RECURSIVE \"tree\" (\"id\") AS (SELECT \"id\" FROM \"nodes\") \
         SELECT * FROM \"tree\""
    );
}

#[test]
fn append_fragment_precedes_statement() {
    let q = pg()
        .append("/* planner hint */")
        .unwrap()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap();
    assert_eq!(q.to_sql().unwrap(), "/* planner hint */ SELECT * FROM \"t\"");
}

#[test]
fn indented_render_uses_newlines() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .limit(1);
    assert_eq!(q.to_sql_indented(1).unwrap(), "SELECT *\nFROM \"t\"\nLIMIT 1");
    assert_eq!(
        q.to_sql_indented(2).unwrap(),
        "SELECT *\n\tFROM \"t\"\n\tLIMIT 1"
    );
}

#[test]
fn raw_sql_values_bypass_escaping() {
    let q = pg()
        .table("t")
        .unwrap()
        .update([("seen_at", Value::from(Sql::new("NOW()").unwrap()))])
        .unwrap()
        .where_("1=1")
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "UPDATE \"t\" SET \"seen_at\" = NOW() WHERE (1=1)"
    );
}

#[test]
fn update_raw_keeps_expressions() {
    let q = pg()
        .table("t")
        .unwrap()
        .update_raw([("count", "count + 1")])
        .unwrap()
        .where_eq("id", 1)
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "UPDATE \"t\" SET \"count\" = count + 1 WHERE (\"id\" = 1)"
    );
}

// ==================== WHERE family ====================

#[test]
fn where_shortcuts_render() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .where_between("age", 18, 65)
        .unwrap()
        .where_not_null("email")
        .unwrap()
        .where_is("deleted", Value::Null)
        .unwrap()
        .where_lt("score", 100)
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM \"t\" WHERE (\"age\" BETWEEN 18 AND 65) AND (\"email\" IS NOT NULL) \
         AND (\"deleted\" IS NULL) AND (\"score\" < 100)"
    );
}

#[test]
fn where_eq_lowers_lists_and_null() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .where_eq("id", vec![1, 2])
        .unwrap()
        .where_ne("kind", Value::Null)
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM \"t\" WHERE (\"id\" IN (1, 2)) AND (\"kind\" IS NOT NULL)"
    );
}

#[test]
fn where_subquery_forms() {
    let db = MockDb::new("pgsql");
    let sub = Query::new(std::sync::Arc::clone(&db))
        .select("user_id")
        .unwrap()
        .from("orders")
        .unwrap();
    let q = Query::new(db)
        .select("*")
        .unwrap()
        .from("users")
        .unwrap()
        .where_in_query("id", &sub)
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM \"users\" WHERE (\"id\" IN (SELECT \"user_id\" FROM \"orders\"))"
    );
}

#[test]
fn where_exists_wraps_subquery() {
    let db = MockDb::new("pgsql");
    let sub = Query::new(std::sync::Arc::clone(&db))
        .select("1")
        .unwrap()
        .from("orders")
        .unwrap();
    let q = Query::new(db)
        .select("*")
        .unwrap()
        .from("users")
        .unwrap()
        .where_not_exists(&sub)
        .unwrap();
    assert!(q
        .to_sql()
        .unwrap()
        .contains("WHERE (NOT EXISTS (SELECT \"1\" FROM \"orders\"))"));
}

#[test]
fn where_like_family_lowering() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .where_ilike("name", "ker%")
        .unwrap();
    assert!(q.to_sql().unwrap().contains("\"name\" ILIKE 'ker%'"));

    let q = mysql()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .where_ilike("name", "ker%")
        .unwrap();
    assert!(q
        .to_sql()
        .unwrap()
        .contains("lower(`name`) LIKE lower('ker%')"));
}

#[test]
fn where_random_uses_platform_function() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .where_random(0.1);
    assert!(q.to_sql().unwrap().contains("random() < 0.1"));
}

#[test]
fn where_query_params_keep_per_item_logic() {
    let params = QueryParams::new()
        .add("status", Op::eq("active"))
        .add_or("role", Op::in_list(["admin", "root"]));
    let q = pg()
        .select("*")
        .unwrap()
        .from("users")
        .unwrap()
        .where_query_params(&params)
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT * FROM \"users\" WHERE (\"status\" = 'active') AND (\"role\" IN ('admin', 'root'))"
    );
    match q.pick(ClauseKey::Where) {
        Some(ClauseData::Wheres(items)) => assert_eq!(items[1].logic, Logic::Or),
        other => panic!("unexpected where payload: {other:?}"),
    }
}

#[test]
fn id_shortcut() {
    let q = pg().select("*").unwrap().from("t").unwrap().id(7).unwrap();
    assert!(q.to_sql().unwrap().ends_with("WHERE (\"id\" = 7)"));
}

// ==================== Aggregates & JSON ====================

#[test]
fn aggregate_suffix_family() {
    let q = pg()
        .select("kind")
        .unwrap()
        .aggregate("array", "id", Some("ids"), &AggregateOptions::default())
        .unwrap()
        .from("t")
        .unwrap()
        .group_by("kind")
        .unwrap();
    assert!(q.to_sql().unwrap().contains("array_agg(\"id\") AS \"ids\""));
}

#[test]
fn aggregate_options_render() {
    let opts = AggregateOptions {
        distinct: true,
        order: Some("id".into()),
        params: None,
    };
    let q = pg()
        .aggregate("json", "id", None, &opts)
        .unwrap()
        .from("t")
        .unwrap();
    assert!(q
        .to_sql()
        .unwrap()
        .contains("json_agg(DISTINCT \"id\" ORDER BY \"id\")"));
}

#[test]
fn unknown_aggregate_rejected() {
    let err = pg()
        .aggregate("median", "x", None, &AggregateOptions::default())
        .unwrap_err();
    assert!(matches!(err, SqlError::UnknownAggregate(f) if f == "median"));
}

#[test]
fn select_json_object_per_dialect() {
    let q = pg()
        .select_json_object(&[("id", "id"), ("name", "name")], Some("obj"))
        .unwrap()
        .from("users")
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT json_build_object('id', \"id\", 'name', \"name\") AS \"obj\" FROM \"users\""
    );

    let q = mysql()
        .select_json_array(&["id", "name"], None)
        .unwrap()
        .from("users")
        .unwrap();
    assert_eq!(
        q.to_sql().unwrap(),
        "SELECT json_array(`id`, `name`) FROM `users`"
    );
}

#[test]
fn select_json_requires_capable_dialect() {
    let err = sqlite()
        .select_json_array(&["id"], None)
        .unwrap_err();
    assert!(matches!(err, SqlError::UnsupportedDialect { .. }));
}

// ==================== Conflict clause ====================

#[test]
fn conflict_nothing_pgsql() {
    let q = pg()
        .table("u")
        .unwrap()
        .insert([("k", 1)])
        .unwrap()
        .conflict_nothing("k")
        .unwrap();
    assert!(q
        .to_sql()
        .unwrap()
        .ends_with("ON CONFLICT (\"k\") DO NOTHING"));
}

#[test]
fn conflict_update_with_excluded_passthrough() {
    let q = pg()
        .table("u")
        .unwrap()
        .insert([("k", Value::from(1)), ("v", Value::from(2))])
        .unwrap()
        .conflict_update("k", [("v", Value::from("EXCLUDED.v"))])
        .unwrap()
        .conflict_where("u.k > ?", &[0.into()])
        .unwrap();
    assert!(q.to_sql().unwrap().ends_with(
        "ON CONFLICT (\"k\") DO UPDATE SET \"v\" = EXCLUDED.\"v\" WHERE \"u\".\"k\" > 0"
    ));
}

#[test]
fn conflict_unsupported_dialect_fails_at_render() {
    let q = sqlite()
        .table("u")
        .unwrap()
        .insert([("k", 1)])
        .unwrap()
        .conflict_nothing("k")
        .unwrap();
    assert!(matches!(
        q.to_sql(),
        Err(SqlError::UnsupportedDialect { .. })
    ));
}

// ==================== Introspection ====================

#[test]
fn to_array_lists_fragments() {
    let q = pg()
        .select("id")
        .unwrap()
        .from("t")
        .unwrap()
        .limit(2);
    let entries = q.to_array(false);
    assert_eq!(
        entries,
        vec![
            ("from", "\"t\"".to_string()),
            ("select", "\"id\"".to_string()),
            ("limit", "LIMIT 2".to_string()),
        ]
    );

    let sorted = q.to_array(true);
    let keys: Vec<&str> = sorted.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec!["from", "limit", "select"]);
}

#[test]
fn reset_clears_everything() {
    let q = pg().select("*").unwrap().from("t").unwrap().reset();
    assert!(matches!(q.to_sql(), Err(SqlError::NoQueryReady)));
}

// ==================== RETURNING fallback ====================

#[test]
fn returning_omitted_without_native_support() {
    let q = mysql()
        .table("t")
        .unwrap()
        .insert([("a", 1)])
        .unwrap()
        .returning("id")
        .unwrap();
    assert_eq!(q.to_sql().unwrap(), "INSERT INTO `t` (`a`) VALUES (1)");
}

#[test]
fn fallback_plan_snapshots_update_where() {
    let q = mysql()
        .table("t")
        .unwrap()
        .update([("a", 1)])
        .unwrap()
        .returning("id")
        .unwrap()
        .where_eq("id", 9)
        .unwrap();
    let plan = render::fallback_plan(q.stack(), q.platform()).unwrap();
    match plan {
        FallbackPlan::Update {
            table, where_sql, ..
        } => {
            assert_eq!(table, "`t`");
            assert_eq!(where_sql.as_deref(), Some("(`id` = 9)"));
        }
        other => panic!("unexpected plan: {other:?}"),
    }

    // native RETURNING dialects carry no plan
    let q = pg()
        .table("t")
        .unwrap()
        .update([("a", 1)])
        .unwrap()
        .returning("id")
        .unwrap()
        .where_eq("id", 9)
        .unwrap();
    assert!(render::fallback_plan(q.stack(), q.platform()).is_none());
}

#[tokio::test]
async fn delete_fallback_recovers_rows_before_delete() {
    let db = MockDb::new("mysql");
    let doomed: crate::EntryData = [("id", Value::Int(4))].into_iter().collect();
    db.push_rows(vec![doomed]);
    db.push_rows(vec![]);

    let q = Query::new(std::sync::Arc::clone(&db))
        .table("t")
        .unwrap()
        .delete()
        .where_eq("id", 4)
        .unwrap()
        .returning("id")
        .unwrap();
    let result = q.run().await.unwrap();

    let log = db.log();
    assert_eq!(log[0], "SELECT `id` FROM `t` WHERE (`id` = 4)");
    assert_eq!(log[1], "DELETE FROM `t` WHERE (`id` = 4)");
    assert_eq!(result.fallback_rows().unwrap().len(), 1);
}

// ==================== Execution ====================

#[tokio::test]
async fn get_returns_first_row() {
    let db = MockDb::new("pgsql");
    let row: crate::EntryData = [("id", Value::Int(1))].into_iter().collect();
    db.push_rows(vec![row]);

    let q = Query::new(db)
        .select("*")
        .unwrap()
        .from("t")
        .unwrap();
    let first = q.get().await.unwrap().unwrap();
    assert_eq!(first.get("id"), Some(&Value::Int(1)));
}

#[tokio::test]
async fn get_ids_collects_id_column() {
    let db = MockDb::new("pgsql");
    let rows: Vec<crate::EntryData> = [3i64, 5]
        .iter()
        .map(|id| [("id", Value::Int(*id))].into_iter().collect())
        .collect();
    db.push_rows(rows);

    let q = Query::new(db).select("id").unwrap().from("t").unwrap();
    assert_eq!(q.get_ids().await.unwrap(), vec![3, 5]);
}

#[tokio::test]
async fn count_wraps_statement() {
    let db = MockDb::new("pgsql");
    let row: crate::EntryData = [("c", Value::Int(9))].into_iter().collect();
    db.push_rows(vec![row]);

    let q = Query::new(std::sync::Arc::clone(&db))
        .select("*")
        .unwrap()
        .from("t")
        .unwrap();
    assert_eq!(q.count().await.unwrap(), 9);
    assert_eq!(
        db.log()[0],
        "SELECT COUNT(*) AS c FROM (SELECT * FROM \"t\") AS c_t"
    );
}

#[tokio::test]
async fn commit_retains_target_for_chaining() {
    let db = MockDb::new("pgsql");
    db.push_rows(vec![]);

    let mut q = Query::new(db)
        .table("t")
        .unwrap()
        .insert([("a", 1)])
        .unwrap();
    q.commit().await.unwrap();

    assert!(q.has(ClauseKey::Table));
    assert!(!q.has(ClauseKey::Insert));

    let q = q.select("*").unwrap();
    assert_eq!(q.to_sql().unwrap(), "SELECT * FROM \"t\"");
}

#[tokio::test]
async fn paginate_fetch_counts_and_slices() {
    let db = MockDb::new("pgsql");
    let count_row: crate::EntryData = [("c", Value::Int(42))].into_iter().collect();
    db.push_rows(vec![count_row]);
    db.push_rows(vec![]);

    let q = Query::new(std::sync::Arc::clone(&db))
        .select("*")
        .unwrap()
        .from("t")
        .unwrap();
    let mut pager = crate::Paginator::new(3, 10);
    q.paginate_fetch(&mut pager).await.unwrap();

    assert_eq!(pager.total(), Some(42));
    assert_eq!(pager.pages(), Some(5));
    assert!(db.log()[1].ends_with("LIMIT 10 OFFSET 20"));
}

#[test]
fn paginate_builder_sets_limit_and_offset() {
    let q = pg()
        .select("*")
        .unwrap()
        .from("t")
        .unwrap()
        .paginate(2, 25);
    assert!(q.to_sql().unwrap().ends_with("LIMIT 25 OFFSET 25"));
}

// ==================== Where element model ====================

#[test]
fn where_clause_group_parts_share_logic() {
    let clause = WhereClause::group(vec!["a = 1".into(), "b = 2".into()]);
    assert_eq!(clause.logic, Logic::And);
    assert_eq!(render::render_where(&[clause]), "(a = 1 AND b = 2)");
}
