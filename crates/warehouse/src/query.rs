//! Read-only analytics over the session table and the flattened view.

use duckdb::{params, Connection};
use funnel_core::{
    ConversionRow, FunnelStep, Result, RevenueRow, SessionWeek, StepUsersRow, StepValueUsersRow,
    AMOUNT_KEY, PRODUCT_KEY, STEP_KEY,
};
use tracing::debug;

use crate::query_error;
use crate::schema::{sql_literal, WEEK_EXPR};

/// Purchases and revenue per product and week, ordered by (week, product).
pub fn revenue_per_product_week(conn: &Connection, session_table: &str) -> Result<Vec<RevenueRow>> {
    let sql = format!(
        r#"
        SELECT product, week, count(*) AS purchases, CAST(sum(amount) AS BIGINT) AS revenue
        FROM {session_table}
        WHERE product IS NOT NULL
        GROUP BY product, week
        ORDER BY week, product
        "#
    );

    let mut stmt = conn.prepare(&sql).map_err(query_error(session_table))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RevenueRow {
                product: row.get(0)?,
                week: row.get(1)?,
                purchases: row.get(2)?,
                revenue: row.get(3)?,
            })
        })
        .map_err(query_error(session_table))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(query_error(session_table))?;

    debug!(rows = rows.len(), "Computed revenue per product/week");
    Ok(rows)
}

/// Sessions reaching each funnel step, one row per (year, week).
pub fn users_per_step_week(conn: &Connection, session_table: &str) -> Result<Vec<StepUsersRow>> {
    let step_columns = FunnelStep::ALL
        .iter()
        .map(|step| {
            format!(
                "count(*) FILTER (WHERE list_contains(steps, {})) AS {}",
                sql_literal(step.as_str()),
                step.column()
            )
        })
        .collect::<Vec<_>>()
        .join(",\n            ");

    let sql = format!(
        r#"
        SELECT
            year,
            week,
            {step_columns}
        FROM {session_table}
        GROUP BY year, week
        ORDER BY year, week
        "#
    );

    let mut stmt = conn.prepare(&sql).map_err(query_error(session_table))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StepUsersRow {
                year: row.get(0)?,
                week: row.get(1)?,
                landing: row.get(2)?,
                checkout: row.get(3)?,
                login_options: row.get(4)?,
                sign_up: row.get(5)?,
                purchase: row.get(6)?,
            })
        })
        .map_err(query_error(session_table))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(query_error(session_table))?;

    debug!(rows = rows.len(), "Computed users per step/week");
    Ok(rows)
}

/// Distinct step values seen in the flattened view, sorted.
pub fn distinct_steps(conn: &Connection, flat_view: &str) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT DISTINCT string_value FROM {flat_view} \
         WHERE key = {} AND string_value IS NOT NULL ORDER BY string_value",
        sql_literal(STEP_KEY)
    );

    let mut stmt = conn.prepare(&sql).map_err(query_error(flat_view))?;
    let steps = stmt
        .query_map([], |row| row.get(0))
        .map_err(query_error(flat_view))?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(query_error(flat_view))?;
    Ok(steps)
}

/// Conversion rate of a single step per (year, week).
///
/// Weeks where no session reached the step are skipped, so the rate is
/// never a division by zero.
pub fn conversion_rate_for_step(
    conn: &Connection,
    session_table: &str,
    step: &str,
) -> Result<Vec<ConversionRow>> {
    let sql = format!(
        r#"
        SELECT
            total,
            dropped,
            round((total - dropped)::DOUBLE / total::DOUBLE * 100, 2) AS conversion_rate,
            week,
            year
        FROM (
            SELECT
                year,
                week,
                count(*) FILTER (WHERE list_contains(steps, ?)) AS total,
                count(*) FILTER (WHERE steps[-1] = ?) AS dropped
            FROM {session_table}
            GROUP BY year, week
        )
        WHERE total > 0
        ORDER BY year, week
        "#
    );

    let mut stmt = conn.prepare(&sql).map_err(query_error(session_table))?;
    let rows = stmt
        .query_map(params![step, step], |row| {
            Ok(ConversionRow {
                total: row.get(0)?,
                dropped: row.get(1)?,
                conversion_rate: row.get(2)?,
                step: step.to_string(),
                week: row.get(3)?,
                year: row.get(4)?,
            })
        })
        .map_err(query_error(session_table))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(query_error(session_table))?;
    Ok(rows)
}

/// Conversion rate of every observed step per (year, week).
///
/// Steps come from [`distinct_steps`]; results are concatenated in step order.
pub fn conversion_rate_per_step_week(
    conn: &Connection,
    session_table: &str,
    flat_view: &str,
) -> Result<Vec<ConversionRow>> {
    let mut rows = Vec::new();
    for step in distinct_steps(conn, flat_view)? {
        rows.extend(conversion_rate_for_step(conn, session_table, &step)?);
    }

    debug!(rows = rows.len(), "Computed conversion rate per step/week");
    Ok(rows)
}

/// Reads the session table back as typed records, ordered by session and week.
pub fn session_rows(conn: &Connection, session_table: &str) -> Result<Vec<SessionWeek>> {
    let sql = format!(
        r#"
        SELECT session_id, user_pseudo_id, week, year, to_json(steps)::VARCHAR,
               product, amount, currency
        FROM {session_table}
        ORDER BY session_id, year, week
        "#
    );

    let mut stmt = conn.prepare(&sql).map_err(query_error(session_table))?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<i64>>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })
        .map_err(query_error(session_table))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(query_error(session_table))?;

    raw.into_iter()
        .map(
            |(session_id, user_pseudo_id, week, year, steps, product, amount, currency)| {
                let steps = match steps {
                    Some(json) => serde_json::from_str(&json)?,
                    None => Vec::new(),
                };
                Ok(SessionWeek {
                    session_id,
                    user_pseudo_id,
                    week,
                    year,
                    steps,
                    product,
                    amount,
                    currency,
                })
            },
        )
        .collect()
}

/// Revenue per product and week joined straight off the flattened view,
/// without the session table. Used to cross-check it.
pub fn view_revenue_per_product_week(conn: &Connection, flat_view: &str) -> Result<Vec<RevenueRow>> {
    let sql = format!(
        r#"
        SELECT
            t2.product,
            {week} AS week,
            count(t2.session_id) AS purchases,
            CAST(sum(t1.int_value) AS BIGINT) AS revenue
        FROM {flat_view} AS t1
        JOIN (
            SELECT session_id, string_value AS product
            FROM {flat_view}
            WHERE key = {product_key}
        ) AS t2 ON t1.session_id = t2.session_id
        WHERE t1.key = {amount_key}
        GROUP BY t2.product, week
        ORDER BY week, t2.product
        "#,
        week = WEEK_EXPR.replace("event_timestamp", "t1.event_timestamp"),
        product_key = sql_literal(PRODUCT_KEY),
        amount_key = sql_literal(AMOUNT_KEY),
    );

    let mut stmt = conn.prepare(&sql).map_err(query_error(flat_view))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RevenueRow {
                product: row.get(0)?,
                week: row.get(1)?,
                purchases: row.get(2)?,
                revenue: row.get(3)?,
            })
        })
        .map_err(query_error(flat_view))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(query_error(flat_view))?;
    Ok(rows)
}

/// Distinct users per raw step value and week, from the flattened view.
pub fn users_per_step_value_week(
    conn: &Connection,
    flat_view: &str,
) -> Result<Vec<StepValueUsersRow>> {
    let sql = format!(
        r#"
        SELECT string_value, count(DISTINCT user_pseudo_id) AS users, {WEEK_EXPR} AS week
        FROM {flat_view}
        WHERE key = {}
        GROUP BY string_value, week
        ORDER BY week, string_value
        "#,
        sql_literal(STEP_KEY)
    );

    let mut stmt = conn.prepare(&sql).map_err(query_error(flat_view))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StepValueUsersRow {
                step: row.get(0)?,
                users: row.get(1)?,
                week: row.get(2)?,
            })
        })
        .map_err(query_error(flat_view))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(query_error(flat_view))?;
    Ok(rows)
}
