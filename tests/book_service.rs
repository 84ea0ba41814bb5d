mod common;

use std::time::Duration;

use shelf_app::modules::books::{BookError, BookForm, BookService};
use shelf_authz::{Principal, Role};

fn admin() -> Principal {
    Principal::new("admin", Role::Admin)
}

fn user() -> Principal {
    Principal::new("user", Role::User)
}

fn form(title: &str, author: &str, version: i64) -> BookForm {
    BookForm {
        title: title.to_string(),
        author: author.to_string(),
        version,
        ..BookForm::default()
    }
}

async fn service() -> BookService {
    BookService::new(common::pool().await)
}

#[tokio::test]
async fn init_form_is_blank_with_listing() {
    let service = service().await;
    service.create_book(&admin(), &form("A", "x", 0)).await.unwrap();

    let form = service.init_form().await.unwrap();
    assert!(form.new_book);
    assert!(form.title.is_empty());
    assert_eq!(form.books.len(), 1);
}

#[tokio::test]
async fn created_book_starts_at_version_zero_with_audit_fields() {
    let service = service().await;
    let book = service
        .create_book(&admin(), &form("Dune", "Herbert", 7))
        .await
        .unwrap();

    assert_eq!(book.version, 0);
    assert_eq!(book.created_user, "admin");
    assert_eq!(book.updated_user, "admin");
    assert!(book.id.is_some());
}

#[tokio::test]
async fn read_one_book_fills_form_for_editing() {
    let service = service().await;
    let book = service
        .create_book(&admin(), &form("Dune", "Herbert", 0))
        .await
        .unwrap();

    let form = service.read_one_book(book.id.unwrap()).await.unwrap();
    assert!(!form.new_book);
    assert_eq!(form.title, "Dune");
    assert_eq!(form.author, "Herbert");
    assert_eq!(form.version, 0);
    assert_eq!(form.books.len(), 1);
}

#[tokio::test]
async fn update_at_current_version_bumps_it_and_keeps_creation_audit() {
    let service = service().await;
    let created = service
        .create_book(&admin(), &form("Dune", "Herbert", 0))
        .await
        .unwrap();
    let id = created.id.unwrap();

    let updated = service
        .update_book(&user(), id, &form("Dune Messiah", "Herbert", 0))
        .await
        .unwrap();
    assert_eq!(updated.version, 1);
    assert_eq!(updated.title, "Dune Messiah");
    assert_eq!(updated.updated_user, "user");
    assert_eq!(updated.created_user, "admin");
    assert_eq!(updated.created_date_time, created.created_date_time);

    let again = service
        .update_book(&admin(), id, &form("Children of Dune", "Herbert", 1))
        .await
        .unwrap();
    assert_eq!(again.version, 2);
}

#[tokio::test]
async fn stale_versions_fail_repeatedly_without_changing_the_book() {
    let service = service().await;
    let id = service
        .create_book(&admin(), &form("Kept", "Author", 0))
        .await
        .unwrap()
        .id
        .unwrap();
    service
        .update_book(&admin(), id, &form("Kept", "Author", 0))
        .await
        .unwrap();

    // Current version is 1 now; both neighbours are stale.
    for stale in [0, 2, 0] {
        let error = service
            .update_book(&user(), id, &form("Lost", "Nobody", stale))
            .await
            .unwrap_err();
        assert!(matches!(error, BookError::OptimisticLock { .. }));
    }

    let stored = service.read_one_book(id).await.unwrap();
    assert_eq!(stored.title, "Kept");
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn missing_books_are_reported_as_not_found() {
    let service = service().await;

    assert!(matches!(
        service.read_one_book(42).await,
        Err(BookError::NotFound { id: 42 })
    ));
    assert!(matches!(
        service.update_book(&admin(), 42, &form("t", "a", 0)).await,
        Err(BookError::NotFound { id: 42 })
    ));
    assert!(matches!(
        service.delete_book(42).await,
        Err(BookError::NotFound { id: 42 })
    ));
}

#[tokio::test]
async fn deleted_book_no_longer_exists() {
    let service = service().await;
    let id = service
        .create_book(&admin(), &form("Gone", "Soon", 0))
        .await
        .unwrap()
        .id
        .unwrap();
    assert!(service.exists(id).await.unwrap());

    service.delete_book(id).await.unwrap();
    assert!(!service.exists(id).await.unwrap());
    assert!(matches!(
        service.delete_book(id).await,
        Err(BookError::NotFound { .. })
    ));
}

#[tokio::test]
async fn update_refreshes_update_audit_fields() {
    let service = service().await;
    let created = service
        .create_book(&admin(), &form("Emma", "Austen", 0))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let updated = service
        .update_book(&user(), created.id.unwrap(), &form("Emma", "J. Austen", 0))
        .await
        .unwrap();
    assert_eq!(updated.updated_user, "user");
    assert!(updated.updated_date_time > created.updated_date_time);
    assert_eq!(updated.created_date_time, created.created_date_time);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_updates_at_one_version_let_exactly_one_win() {
    let (pool, path) = common::file_pool("concurrent-updates").await;
    let service = BookService::new(pool.clone());

    for round in 0..10 {
        let id = service
            .create_book(&admin(), &form(&format!("Book {round}"), "Author", 0))
            .await
            .unwrap()
            .id
            .unwrap();

        let writers: Vec<_> = (0..5)
            .map(|writer| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .update_book(&user(), id, &form(&format!("Writer {writer}"), "Author", 0))
                        .await
                })
            })
            .collect();

        let mut won = 0;
        for writer in writers {
            match writer.await.unwrap() {
                Ok(book) => {
                    won += 1;
                    assert_eq!(book.version, 1);
                }
                Err(BookError::OptimisticLock { id: conflicted }) => assert_eq!(conflicted, id),
                Err(other) => panic!("round {round}: unexpected failure {other:?}"),
            }
        }
        assert_eq!(won, 1, "round {round}");

        let stored = service.read_one_book(id).await.unwrap();
        assert_eq!(stored.version, 1);
    }

    pool.close().await;
    common::remove_database(&path);
}
