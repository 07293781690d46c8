use anyhow::Result;
use log::debug;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};

use crate::db::sql::{Select, Update, Value};
use crate::db::types::{CreatePostParams, PostQuery, UpdatePostParams};
use crate::types::post::Post;

use super::convert_values;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS post (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    text TEXT NOT NULL,
    owner TEXT NOT NULL,
    create_time INTEGER NOT NULL,
    update_time INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_post_owner ON post(owner);
"#;

const POST_FIELDS: [&str; 6] = ["id", "title", "text", "owner", "create_time", "update_time"];

pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLE_SQL)?;
    Ok(())
}

pub fn create(tx: &Transaction, params: CreatePostParams) -> Result<()> {
    let sql = r#"
    INSERT INTO post (id, title, text, owner, create_time, update_time)
    VALUES (?, ?, ?, ?, ?, ?)
    "#;
    debug!("Database create_post: {sql}, {params:?}");
    tx.execute(
        sql,
        params![
            params.id,
            params.title,
            params.text,
            params.owner,
            params.create_time,
            params.create_time,
        ],
    )?;
    Ok(())
}

pub fn update(tx: &Transaction, params: UpdatePostParams) -> Result<()> {
    let mut update = Update::new("post");

    if let Some(title) = params.title {
        update.add_field("title", Value::Text(title));
    }

    if let Some(text) = params.text {
        update.add_field("text", Value::Text(text));
    }

    update.add_field("update_time", Value::Integer(params.update_time));

    update.add_where("id = ?", Value::Text(params.id));

    let (sql, values) = update.build();
    let values = convert_values(values);

    debug!("Database update_post: {sql}, {values:?}");
    tx.execute(&sql, params_from_iter(values.iter()))?;

    Ok(())
}

pub fn delete(tx: &Transaction, id: &str) -> Result<()> {
    let sql = "DELETE FROM post WHERE id = ?";
    debug!("Database delete_post: {sql}, {id}");
    tx.execute(sql, params![id])?;
    Ok(())
}

pub fn has(tx: &Transaction, id: &str) -> Result<bool> {
    let mut select = Select::count("post");
    select.add_where("id = ?", Value::Text(id.to_string()));

    let (sql, values) = select.build();
    debug!("Database has_post: {sql}, {values:?}");
    let values = convert_values(values);

    let count: i64 = tx.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
    Ok(count > 0)
}

pub fn get(tx: &Transaction, id: &str) -> Result<Option<Post>> {
    let mut select = Select::new(POST_FIELDS.to_vec(), "post");
    select.add_where("id = ?", Value::Text(id.to_string()));

    let (sql, values) = select.build();
    debug!("Database get_post: {sql}, {values:?}");
    let values = convert_values(values);

    let post = tx
        .query_row(&sql, params_from_iter(values.iter()), parse_row)
        .optional()?;
    Ok(post)
}

pub fn get_owner(tx: &Transaction, id: &str) -> Result<Option<String>> {
    let mut select = Select::new(vec!["owner"], "post");
    select.add_where("id = ?", Value::Text(id.to_string()));

    let (sql, values) = select.build();
    debug!("Database get_post_owner: {sql}, {values:?}");
    let values = convert_values(values);

    let owner = tx
        .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))
        .optional()?;
    Ok(owner)
}

pub fn list(tx: &Transaction, query: PostQuery) -> Result<Vec<Post>> {
    let mut select = Select::new(POST_FIELDS.to_vec(), "post");
    select.add_order_by("create_time DESC");
    select.add_order_by("id DESC");
    select.set_limit(query.limit, query.offset);

    let (sql, values) = select.build();
    debug!("Database list_posts: {sql}, {values:?}");
    let values = convert_values(values);

    let mut stmt = tx.prepare(&sql)?;
    let posts = stmt
        .query_map(params_from_iter(values.iter()), parse_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(posts)
}

pub fn count(tx: &Transaction) -> Result<u64> {
    let (sql, _) = Select::count("post").build();
    debug!("Database count_posts: {sql}");

    let count: i64 = tx.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as u64)
}

fn parse_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        owner: row.get(3)?,
        create_time: row.get(4)?,
        update_time: row.get(5)?,
    })
}
