//! Rendering pipeline.
//!
//! Serializes a [`Stack`] into dialect-correct SQL. The walk order is fixed:
//! `with` fragments, then `append` fragments, then exactly one of
//! `insert | update | delete | select`. All user input was escaped when it
//! entered the stack; this module only assembles and branches per dialect.

use crate::database::FallbackPlan;
use crate::error::{SqlError, SqlResult};
use crate::platform::Platform;
use crate::query::stack::{
    ClauseData, ClauseKey, ConflictAction, ConflictUpdate, InsertData, Stack, WhereClause,
};

/// Render the full statement.
pub(crate) fn render(stack: &Stack, platform: &Platform, indent: usize) -> SqlResult<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(ClauseData::Withs(withs)) = stack.get(ClauseKey::With) {
        parts.push(render_with(withs));
    }
    if let Some(appends) = stack.texts(ClauseKey::Append) {
        parts.extend(appends.iter().cloned());
    }

    let statement = stack.statement_key().ok_or(SqlError::NoQueryReady)?;
    match statement {
        ClauseKey::Insert => render_insert(stack, platform, &mut parts)?,
        ClauseKey::Update => render_update(stack, platform, &mut parts)?,
        ClauseKey::Delete => render_delete(stack, platform, &mut parts)?,
        ClauseKey::Select => render_select(stack, &mut parts)?,
        _ => unreachable!(),
    }

    let sep = if indent == 0 {
        " ".to_string()
    } else {
        format!("\n{}", "\t".repeat(indent - 1))
    };
    Ok(parts.join(&sep))
}

/// Render the fragment a single clause key contributes, for introspection.
pub(crate) fn render_fragment(stack: &Stack, platform: &Platform, key: ClauseKey) -> Option<String> {
    match key {
        ClauseKey::Table | ClauseKey::From | ClauseKey::Into => {
            stack.text(key).map(str::to_string)
        }
        ClauseKey::Select => stack.texts(key).map(|items| items.join(", ")),
        ClauseKey::Update => stack
            .texts(key)
            .map(|items| format!("SET {}", items.join(", "))),
        ClauseKey::Delete => stack.has(key).then(|| "1".to_string()),
        ClauseKey::Insert => stack.insert_data().map(|data| {
            format!("({}) VALUES {}", data.fields.join(", "), join_rows(&data.rows))
        }),
        ClauseKey::Where => stack.wheres().map(|w| format!("WHERE {}", render_where(w))),
        ClauseKey::Join => match stack.get(key) {
            Some(ClauseData::Joins(joins)) => Some(
                joins
                    .iter()
                    .map(|j| match &j.context {
                        Some(ctx) => format!("{} {}", j.content, ctx),
                        None => j.content.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        },
        ClauseKey::Group => stack
            .texts(key)
            .map(|items| format!("GROUP BY {}", items.join(", "))),
        ClauseKey::Having => stack.text(key).map(|t| format!("HAVING {t}")),
        ClauseKey::Order => stack
            .texts(key)
            .map(|items| format!("ORDER BY {}", items.join(", "))),
        ClauseKey::Limit => stack.uint(key).map(|n| format!("LIMIT {n}")),
        ClauseKey::Offset => stack.uint(key).map(|n| format!("OFFSET {n}")),
        ClauseKey::Union => match stack.get(key) {
            Some(ClauseData::Unions(unions)) => Some(
                unions
                    .iter()
                    .map(|u| {
                        if u.all {
                            format!("UNION ALL {}", u.sql)
                        } else {
                            format!("UNION {}", u.sql)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        },
        ClauseKey::With => match stack.get(key) {
            Some(ClauseData::Withs(withs)) => Some(render_with(withs)),
            _ => None,
        },
        ClauseKey::Return => stack
            .return_data()
            .map(|r| format!("RETURNING {}", r.fields)),
        ClauseKey::Conflict => stack
            .conflict_data()
            .and_then(|_| render_conflict(stack, platform).ok()),
        ClauseKey::Append => stack.texts(key).map(|items| items.join(" ")),
    }
}

// ==================== Statements ====================

fn render_select(stack: &Stack, parts: &mut Vec<String>) -> SqlResult<()> {
    let items = stack.texts(ClauseKey::Select).unwrap_or(&[]);
    let select = if items.is_empty() {
        "*".to_string()
    } else {
        items.join(", ")
    };
    parts.push(format!("SELECT {select}"));
    parts.push(format!("FROM {}", target(stack)?));

    push_joins(stack, parts)?;
    push_where(stack, parts);

    if let Some(ClauseData::Unions(unions)) = stack.get(ClauseKey::Union) {
        for u in unions {
            if u.all {
                parts.push(format!("UNION ALL {}", u.sql));
            } else {
                parts.push(format!("UNION {}", u.sql));
            }
        }
    }

    if let Some(groups) = stack.texts(ClauseKey::Group) {
        parts.push(format!("GROUP BY {}", groups.join(", ")));
    }
    if let Some(having) = stack.text(ClauseKey::Having) {
        parts.push(format!("HAVING {having}"));
    }
    push_order_limit(stack, parts);
    Ok(())
}

fn render_insert(stack: &Stack, platform: &Platform, parts: &mut Vec<String>) -> SqlResult<()> {
    let data = stack.insert_data().ok_or(SqlError::NoQueryReady)?;
    let table = target(stack)?;

    if data.fields.is_empty() {
        parts.push(format!("INSERT INTO {table} DEFAULT VALUES"));
    } else {
        parts.push(format!(
            "INSERT INTO {table} ({}) VALUES {}",
            data.fields.join(", "),
            join_rows(&data.rows)
        ));
    }

    if stack.has(ClauseKey::Conflict) {
        parts.push(render_conflict(stack, platform)?);
    }
    push_returning(stack, platform, parts);
    Ok(())
}

fn render_update(stack: &Stack, platform: &Platform, parts: &mut Vec<String>) -> SqlResult<()> {
    let assignments = stack.texts(ClauseKey::Update).unwrap_or(&[]);
    parts.push(format!(
        "UPDATE {} SET {}",
        target(stack)?,
        assignments.join(", ")
    ));

    let wheres = stack.wheres().filter(|w| !w.is_empty());
    match wheres {
        Some(w) => parts.push(format!("WHERE {}", render_where(w))),
        None => return Err(SqlError::MissingWhere("UPDATE")),
    }

    push_order_limit(stack, parts);
    push_returning(stack, platform, parts);
    Ok(())
}

fn render_delete(stack: &Stack, platform: &Platform, parts: &mut Vec<String>) -> SqlResult<()> {
    parts.push(format!("DELETE FROM {}", target(stack)?));

    let wheres = stack.wheres().filter(|w| !w.is_empty());
    match wheres {
        Some(w) => parts.push(format!("WHERE {}", render_where(w))),
        None => return Err(SqlError::MissingWhere("DELETE")),
    }

    push_order_limit(stack, parts);
    push_returning(stack, platform, parts);
    Ok(())
}

// ==================== Clause pieces ====================

fn target(stack: &Stack) -> SqlResult<&str> {
    stack
        .target()
        .ok_or_else(|| SqlError::empty("statement target (table/from/into)"))
}

fn push_joins(stack: &Stack, parts: &mut Vec<String>) -> SqlResult<()> {
    if let Some(joins) = stack.joins() {
        for join in joins {
            let ctx = join
                .context
                .as_ref()
                .ok_or_else(|| SqlError::JoinContextMissing(join.content.clone()))?;
            parts.push(format!("{} {}", join.content, ctx));
        }
    }
    Ok(())
}

fn push_where(stack: &Stack, parts: &mut Vec<String>) {
    if let Some(wheres) = stack.wheres() {
        if !wheres.is_empty() {
            parts.push(format!("WHERE {}", render_where(wheres)));
        }
    }
}

/// Render WHERE elements.
///
/// Every element renders parenthesized with its parts joined by its own
/// logic; the same logic joins the element to its successor. A logic change
/// with at least two elements remaining opens a nested group; every opened
/// group closes at the end.
pub(crate) fn render_where(wheres: &[WhereClause]) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for (i, clause) in wheres.iter().enumerate() {
        let joiner = format!(" {} ", clause.logic.as_str());
        out.push('(');
        out.push_str(&clause.parts.join(&joiner));
        out.push(')');
        if i + 1 < wheres.len() {
            out.push_str(&joiner);
            if wheres[i + 1].logic != clause.logic && i + 2 < wheres.len() {
                out.push('(');
                depth += 1;
            }
        }
    }
    out.push_str(&")".repeat(depth));
    out
}

fn push_order_limit(stack: &Stack, parts: &mut Vec<String>) {
    if let Some(orders) = stack.texts(ClauseKey::Order) {
        parts.push(format!("ORDER BY {}", orders.join(", ")));
    }
    if let Some(limit) = stack.uint(ClauseKey::Limit) {
        parts.push(format!("LIMIT {limit}"));
        if let Some(offset) = stack.uint(ClauseKey::Offset) {
            parts.push(format!("OFFSET {offset}"));
        }
    }
}

fn push_returning(stack: &Stack, platform: &Platform, parts: &mut Vec<String>) {
    if let Some(ret) = stack.return_data() {
        if platform.supports_returning() {
            parts.push(format!("RETURNING {}", ret.fields));
        }
    }
}

fn render_with(withs: &[crate::query::stack::WithClause]) -> String {
    let recursive = withs.iter().any(|w| w.recursive);
    let items = withs
        .iter()
        .map(|w| {
            let mut item = w.name.clone();
            if let Some(fields) = &w.fields {
                item.push_str(&format!(" ({fields})"));
            }
            item.push_str(" AS ");
            match w.materialized {
                Some(true) => item.push_str("MATERIALIZED "),
                Some(false) => item.push_str("NOT MATERIALIZED "),
                None => {}
            }
            item.push_str(&format!("({})", w.sql));
            item
        })
        .collect::<Vec<_>>()
        .join(", ");
    if recursive {
        format!("WITH RECURSIVE {items}")
    } else {
        format!("WITH {items}")
    }
}

fn render_conflict(stack: &Stack, platform: &Platform) -> SqlResult<String> {
    let data = stack.conflict_data().ok_or(SqlError::NoQueryReady)?;
    let dialect = platform.name();

    if !platform.supports_conflict() {
        return Err(SqlError::unsupported(dialect, "conflict clause"));
    }

    let assignments = |update: &ConflictUpdate| -> Vec<String> {
        match update {
            ConflictUpdate::Pairs(pairs) => pairs
                .iter()
                .map(|(field, value)| format!("{field} = {value}"))
                .collect(),
            ConflictUpdate::All => {
                let fields = stack
                    .insert_data()
                    .map(|d: &InsertData| d.fields.clone())
                    .unwrap_or_default();
                fields
                    .iter()
                    .map(|f| {
                        if platform.is("mysql") {
                            format!("{f} = VALUES({f})")
                        } else {
                            format!("{f} = EXCLUDED.{f}")
                        }
                    })
                    .collect()
            }
        }
    };

    if platform.is("mysql") {
        let sets = match (&data.action, &data.update) {
            (ConflictAction::Update, Some(update)) => assignments(update),
            // MySQL has no DO NOTHING; reassign the first conflict field.
            _ => {
                let field = data
                    .fields
                    .split(',')
                    .next()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string();
                vec![format!("{field} = {field}")]
            }
        };
        return Ok(format!("ON DUPLICATE KEY UPDATE {}", sets.join(", ")));
    }

    // pgsql
    let mut out = format!("ON CONFLICT ({}) DO ", data.fields);
    match (&data.action, &data.update) {
        (ConflictAction::Nothing, _) => out.push_str("NOTHING"),
        (ConflictAction::Update, Some(update)) => {
            out.push_str("UPDATE SET ");
            out.push_str(&assignments(update).join(", "));
            if let Some(where_sql) = &data.where_sql {
                out.push_str(&format!(" WHERE {where_sql}"));
            }
        }
        (ConflictAction::Update, None) => {
            return Err(SqlError::empty("conflict update data"));
        }
    }
    Ok(out)
}

fn join_rows(rows: &[String]) -> String {
    rows.iter()
        .map(|r| format!("({r})"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ==================== RETURNING fallback ====================

/// Build the fallback plan carried to the driver for INSERT/UPDATE on
/// dialects without native `RETURNING`.
pub(crate) fn fallback_plan(stack: &Stack, platform: &Platform) -> Option<FallbackPlan> {
    if platform.supports_returning() {
        return None;
    }
    let ret = stack.return_data()?;
    let table = stack.target()?.to_string();
    let fetch = ret.fetch.unwrap_or_default();
    match stack.statement_key()? {
        ClauseKey::Insert => Some(FallbackPlan::Insert {
            table,
            fields: ret.fields.clone(),
            fetch,
        }),
        ClauseKey::Update => Some(FallbackPlan::Update {
            table,
            where_sql: stack.wheres().map(render_where),
            fields: ret.fields.clone(),
            fetch,
        }),
        _ => None,
    }
}

/// Build the eager recovery SELECT run before a DELETE on dialects without
/// native `RETURNING`.
pub(crate) fn fallback_delete_select(stack: &Stack, platform: &Platform) -> Option<String> {
    if platform.supports_returning() || stack.statement_key() != Some(ClauseKey::Delete) {
        return None;
    }
    let ret = stack.return_data()?;
    let table = stack.target()?;
    let mut sql = format!("SELECT {} FROM {table}", ret.fields);
    if let Some(wheres) = stack.wheres() {
        if !wheres.is_empty() {
            sql.push_str(&format!(" WHERE {}", render_where(wheres)));
        }
    }
    Some(sql)
}
