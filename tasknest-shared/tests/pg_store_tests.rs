/// Integration tests for the PostgreSQL resource store
///
/// Skipped when `DATABASE_URL` is not set. Every test works with freshly
/// named users so runs do not interfere with each other.

use std::env;
use tasknest_shared::auth::authorization::{Action, AuthzError};
use tasknest_shared::auth::middleware::AuthContext;
use tasknest_shared::db::migrations::{ensure_database_exists, run_migrations};
use tasknest_shared::db::pool::{create_pool, DatabaseConfig};
use tasknest_shared::images::StoredImage;
use tasknest_shared::models::profile_image::CreateProfileImage;
use tasknest_shared::models::task::{CreateTask, TaskFilter, UpdateTask};
use tasknest_shared::models::user::CreateUser;
use tasknest_shared::store::{PgStore, ResourceStore, StoreError};
use uuid::Uuid;

async fn store() -> Option<PgStore> {
    let url = env::var("DATABASE_URL").ok().filter(|u| !u.is_empty())?;

    ensure_database_exists(&url)
        .await
        .expect("Failed to create database");
    let pool = create_pool(DatabaseConfig {
        url,
        ..Default::default()
    })
    .await
    .expect("Failed to create pool");
    run_migrations(&pool).await.expect("Migrations failed");

    Some(PgStore::new(pool))
}

async fn user(store: &PgStore, prefix: &str) -> AuthContext {
    let username = format!("{}-{}", prefix, Uuid::new_v4().simple());
    let user = store
        .create_user(CreateUser {
            username: username.clone(),
            password_hash: "not-a-real-hash".to_string(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
        })
        .await
        .expect("Failed to create user");
    AuthContext::new(user.id, username)
}

fn image(name: &str) -> StoredImage {
    StoredImage {
        secure_url: format!("https://images.test/profile_images/{}.png", name),
        public_id: format!("profile_images/{}", name),
    }
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let Some(store) = store().await else { return };
    let alice = user(&store, "alice").await;

    let result = store
        .create_user(CreateUser {
            username: alice.username.clone(),
            password_hash: "x".to_string(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
        })
        .await;

    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn test_task_ownership_is_enforced() {
    let Some(store) = store().await else { return };
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;

    let task = store
        .create_task(&alice, CreateTask::titled("write report"))
        .await
        .unwrap();

    assert!(matches!(
        store.get_task(&bob, task.id).await,
        Err(StoreError::NotFound("Task"))
    ));

    let update = store
        .update_task(
            &bob,
            task.id,
            UpdateTask {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await;
    match update {
        Err(StoreError::Forbidden(err)) => assert_eq!(err.action(), Action::UpdateTask),
        other => panic!("expected forbidden, got {:?}", other),
    }

    assert!(matches!(
        store.delete_task(&bob, task.id).await,
        Err(StoreError::Forbidden(AuthzError::NotOwner {
            action: Action::DeleteTask
        }))
    ));

    let unchanged = store.get_task(&alice, task.id).await.unwrap();
    assert!(!unchanged.completed);
    assert_eq!(unchanged.updated_at, task.updated_at);

    store.delete_task(&alice, task.id).await.unwrap();
    assert!(store
        .list_tasks(&alice, &TaskFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_list_order_and_paging() {
    let Some(store) = store().await else { return };
    let alice = user(&store, "alice").await;

    for i in 0..4 {
        store
            .create_task(&alice, CreateTask::titled(format!("t{}", i)))
            .await
            .unwrap();
    }

    let page = store
        .list_tasks(&alice, &TaskFilter::new(None, Some(2), Some(1)))
        .await
        .unwrap();
    let titles: Vec<_> = page.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["t2", "t1"]);

    // no limit means a NULL LIMIT, i.e. every row
    let all = store
        .list_tasks(&alice, &TaskFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_profile_image_lifecycle() {
    let Some(store) = store().await else { return };
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;

    let record = store
        .create_profile_image(
            &alice,
            CreateProfileImage {
                student_id: alice.user_id,
                image: image("first"),
            },
        )
        .await
        .unwrap();

    let second = store
        .create_profile_image(
            &alice,
            CreateProfileImage {
                student_id: alice.user_id,
                image: image("second"),
            },
        )
        .await;
    assert!(matches!(second, Err(StoreError::Conflict(_))));

    assert!(matches!(
        store.replace_profile_image(&bob, record.id, image("evil")).await,
        Err(StoreError::Forbidden(_))
    ));

    let replaced = store
        .replace_profile_image(&alice, record.id, image("third"))
        .await
        .unwrap();
    assert_eq!(replaced.previous_object.as_deref(), Some("profile_images/first"));
    assert_eq!(
        replaced.record.public_id.as_deref(),
        Some("profile_images/third")
    );

    // deleting with the object the replace already swapped out keeps the row
    assert!(matches!(
        store
            .delete_profile_image(&alice, record.id, Some("profile_images/first"))
            .await,
        Err(StoreError::Conflict(_))
    ));
    assert!(store.get_profile_image(record.id).await.is_ok());

    let removed = store
        .delete_profile_image(&alice, record.id, Some("profile_images/third"))
        .await
        .unwrap();
    assert_eq!(removed.id, record.id);
    assert!(store
        .find_profile_image_by_student(alice.user_id)
        .await
        .unwrap()
        .is_none());
}
