use anyhow::{Context, Result};
use log::debug;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};

use crate::db::sql::{Select, Update, Value};
use crate::db::types::{CreateUserParams, UpdateUserParams, UserPassword};
use crate::types::user::{Role, RoleSet, User};

use super::convert_values;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS user (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    salt TEXT NOT NULL,
    create_time INTEGER NOT NULL,
    update_time INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS user_role (
    user_id TEXT NOT NULL,
    role TEXT NOT NULL,
    PRIMARY KEY (user_id, role)
);
"#;

pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLE_SQL)?;
    Ok(())
}

pub fn create(tx: &Transaction, params: CreateUserParams) -> Result<()> {
    let sql = r#"
    INSERT INTO user (id, name, email, password, salt, create_time, update_time)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    "#;
    debug!(
        "Database create_user: {sql}, id={}, name={}, email={}",
        params.id, params.name, params.email
    );
    tx.execute(
        sql,
        params![
            params.id,
            params.name,
            params.email,
            params.password,
            params.salt,
            params.create_time,
            params.create_time,
        ],
    )?;

    set_roles(tx, &params.id, &params.roles)
}

pub fn update(tx: &Transaction, params: UpdateUserParams) -> Result<()> {
    let mut update = Update::new("user");

    if let Some(name) = params.name {
        update.add_field("name", Value::Text(name));
    }

    if let Some(email) = params.email {
        update.add_field("email", Value::Text(email));
    }

    if let Some((password, salt)) = params.password {
        update.add_field("password", Value::Text(password));
        update.add_field("salt", Value::Text(salt));
    }

    update.add_field("update_time", Value::Integer(params.update_time));

    update.add_where("id = ?", Value::Text(params.id));

    let (sql, values) = update.build();
    debug!("Database update_user: {sql}");
    let values = convert_values(values);
    tx.execute(&sql, params_from_iter(values.iter()))?;

    Ok(())
}

pub fn delete(tx: &Transaction, id: &str) -> Result<()> {
    let sql = "DELETE FROM user_role WHERE user_id = ?";
    debug!("Database delete_user_roles: {sql}, {id}");
    tx.execute(sql, params![id])?;

    let sql = "DELETE FROM user WHERE id = ?";
    debug!("Database delete_user: {sql}, {id}");
    tx.execute(sql, params![id])?;
    Ok(())
}

pub fn has(tx: &Transaction, id: &str) -> Result<bool> {
    let mut select = Select::count("user");
    select.add_where("id = ?", Value::Text(id.to_string()));

    let (sql, values) = select.build();
    debug!("Database has_user: {sql}, {values:?}");
    let values = convert_values(values);

    let count: i64 = tx.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
    Ok(count > 0)
}

pub fn get(tx: &Transaction, id: &str) -> Result<Option<User>> {
    let mut select = Select::new(
        vec!["id", "name", "email", "create_time", "update_time"],
        "user",
    );
    select.add_where("id = ?", Value::Text(id.to_string()));

    let (sql, values) = select.build();
    debug!("Database get_user: {sql}, {values:?}");
    let values = convert_values(values);

    let user = tx
        .query_row(&sql, params_from_iter(values.iter()), |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                roles: RoleSet::new(),
                create_time: row.get(3)?,
                update_time: row.get(4)?,
            })
        })
        .optional()?;

    match user {
        Some(mut user) => {
            user.roles = list_roles(tx, id)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

pub fn get_id_by_email(tx: &Transaction, email: &str) -> Result<Option<String>> {
    let mut select = Select::new(vec!["id"], "user");
    select.add_where("email = ?", Value::Text(email.to_string()));

    let (sql, values) = select.build();
    debug!("Database get_user_id_by_email: {sql}, {values:?}");
    let values = convert_values(values);

    let id = tx
        .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))
        .optional()?;
    Ok(id)
}

pub fn get_password(tx: &Transaction, email: &str) -> Result<Option<UserPassword>> {
    let mut select = Select::new(vec!["id", "password", "salt"], "user");
    select.add_where("email = ?", Value::Text(email.to_string()));

    let (sql, values) = select.build();
    debug!("Database get_user_password: {sql}, {values:?}");
    let values = convert_values(values);

    let up = tx
        .query_row(&sql, params_from_iter(values.iter()), |row| {
            Ok(UserPassword {
                id: row.get(0)?,
                password: row.get(1)?,
                salt: row.get(2)?,
            })
        })
        .optional()?;
    Ok(up)
}

pub fn get_roles(tx: &Transaction, id: &str) -> Result<Option<RoleSet>> {
    if !has(tx, id)? {
        return Ok(None);
    }
    list_roles(tx, id).map(Some)
}

pub fn set_roles(tx: &Transaction, id: &str, roles: &RoleSet) -> Result<()> {
    let sql = "DELETE FROM user_role WHERE user_id = ?";
    debug!("Database clear_user_roles: {sql}, {id}");
    tx.execute(sql, params![id])?;

    let sql = "INSERT INTO user_role (user_id, role) VALUES (?, ?)";
    for role in roles.iter() {
        debug!("Database add_user_role: {sql}, {id}, {role}");
        tx.execute(sql, params![id, role.as_str()])?;
    }
    Ok(())
}

fn list_roles(tx: &Transaction, id: &str) -> Result<RoleSet> {
    let sql = "SELECT role FROM user_role WHERE user_id = ?";
    debug!("Database list_user_roles: {sql}, {id}");

    let mut stmt = tx.prepare(sql)?;
    let names = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    names
        .iter()
        .map(|name| {
            name.parse::<Role>()
                .with_context(|| format!("parse stored role of user '{id}'"))
        })
        .collect()
}
