mod user;

use anyhow::{bail, Result};

use super::types::CreateUserParams;
use super::Database;
use crate::types::user::{Role, RoleSet};

pub const WHITE_ID: &str = "65a1b2c3d4e5f60718293a4b";
pub const BLACK_ID: &str = "65a1b2c3d4e5f60718293a4c";

pub fn run_tests(db: &Database) {
    user::run_user_tests(db);
    post::run_post_tests(db);

    test_rollback(db);
}

#[test]
fn test_sqlite() {
    let db = Database::memory().unwrap();
    run_tests(&db);
}

fn test_rollback(db: &Database) {
    let result: Result<()> = db.with_transaction(|tx| {
        tx.create_user(CreateUserParams {
            id: String::from("ffffffffffffffffffffffff"),
            name: String::from("none"),
            email: String::from("none@example.com"),
            password: String::from("test123"),
            salt: String::from("test_salt"),
            roles: RoleSet::from_iter([Role::User]),
            create_time: 50,
        })
        .unwrap();

        bail!("rollback");
    });
    assert!(result.is_err());

    db.with_transaction(|tx| {
        assert!(!tx.has_user("ffffffffffffffffffffffff")?);
        assert!(tx.get_user_id_by_email("none@example.com")?.is_none());
        Ok(())
    })
    .unwrap();
}
