use crate::db::types::{CreateUserParams, UpdateUserParams};
use crate::db::Database;
use crate::types::user::{Role, RoleSet, User};

use super::{BLACK_ID, WHITE_ID};

pub fn run_user_tests(db: &Database) {
    test_create(db);
    test_get(db);
    test_update(db);
    test_roles(db);
    test_delete(db);
}

fn test_create(db: &Database) {
    let users = [
        CreateUserParams {
            id: String::from(WHITE_ID),
            name: String::from("white"),
            email: String::from("white@example.com"),
            password: String::from("white_hash"),
            salt: String::from("white_salt"),
            roles: RoleSet::from_iter([Role::User, Role::Admin]),
            create_time: 50,
        },
        CreateUserParams {
            id: String::from(BLACK_ID),
            name: String::from("black"),
            email: String::from("black@example.com"),
            password: String::from("black_hash"),
            salt: String::from("black_salt"),
            roles: RoleSet::from_iter([Role::User]),
            create_time: 100,
        },
    ];

    db.with_transaction(|tx| {
        for user in users {
            tx.create_user(user)?;
        }
        Ok(())
    })
    .unwrap();

    // Emails are unique.
    let result = db.with_transaction(|tx| {
        tx.create_user(CreateUserParams {
            id: String::from("eeeeeeeeeeeeeeeeeeeeeeee"),
            name: String::from("copy"),
            email: String::from("white@example.com"),
            password: String::from("hash"),
            salt: String::from("salt"),
            roles: RoleSet::new(),
            create_time: 120,
        })
    });
    assert!(result.is_err());
}

fn test_get(db: &Database) {
    let white_user = User {
        id: String::from(WHITE_ID),
        name: String::from("white"),
        email: String::from("white@example.com"),
        roles: RoleSet::from_iter([Role::User, Role::Admin]),
        create_time: 50,
        update_time: 50,
    };

    db.with_transaction(|tx| {
        assert_eq!(tx.get_user(WHITE_ID)?, Some(white_user));
        assert!(tx.get_user("000000000000000000000000")?.is_none());

        assert!(tx.has_user(BLACK_ID)?);
        assert!(!tx.has_user("000000000000000000000000")?);

        assert_eq!(
            tx.get_user_id_by_email("black@example.com")?.as_deref(),
            Some(BLACK_ID)
        );

        let up = tx.get_user_password("black@example.com")?.unwrap();
        assert_eq!(up.id, BLACK_ID);
        assert_eq!(up.password, "black_hash");
        assert_eq!(up.salt, "black_salt");
        assert!(tx.get_user_password("nobody@example.com")?.is_none());
        Ok(())
    })
    .unwrap();
}

fn test_update(db: &Database) {
    db.with_transaction(|tx| {
        tx.update_user(UpdateUserParams {
            id: String::from(BLACK_ID),
            name: Some(String::from("dark")),
            password: Some((String::from("new_hash"), String::from("new_salt"))),
            update_time: 200,
            ..Default::default()
        })?;

        let user = tx.get_user(BLACK_ID)?.unwrap();
        assert_eq!(user.name, "dark");
        assert_eq!(user.email, "black@example.com");
        assert_eq!(user.create_time, 100);
        assert_eq!(user.update_time, 200);

        let up = tx.get_user_password("black@example.com")?.unwrap();
        assert_eq!(up.password, "new_hash");
        assert_eq!(up.salt, "new_salt");
        Ok(())
    })
    .unwrap();
}

fn test_roles(db: &Database) {
    db.with_transaction(|tx| {
        let roles = tx.get_user_roles(BLACK_ID)?.unwrap();
        assert!(!roles.is_admin());

        tx.set_user_roles(BLACK_ID, &RoleSet::from_iter([Role::Admin]))?;
        let roles = tx.get_user_roles(BLACK_ID)?.unwrap();
        assert!(roles.is_admin());
        assert!(!roles.contains(Role::User));

        tx.set_user_roles(BLACK_ID, &RoleSet::from_iter([Role::User]))?;

        assert!(tx.get_user_roles("000000000000000000000000")?.is_none());
        Ok(())
    })
    .unwrap();
}

fn test_delete(db: &Database) {
    db.with_transaction(|tx| {
        tx.delete_user(BLACK_ID)?;
        assert!(!tx.has_user(BLACK_ID)?);
        assert!(tx.get_user_roles(BLACK_ID)?.is_none());

        // Deleting a missing user is a no-op.
        tx.delete_user(BLACK_ID)?;
        assert!(tx.has_user(WHITE_ID)?);
        Ok(())
    })
    .unwrap();
}
