use chrono::Duration;
use speech_core::model::ExerciseId;
use speech_core::time::fixed_now;
use storage::repository::{CompletionRecord, CompletionRepository, Storage, StorageError};
use storage::sqlite::SqliteRepository;

#[tokio::test]
async fn sqlite_roundtrip_keeps_first_completion() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_completions?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let id = ExerciseId::new("consonant-practice");
    let first = CompletionRecord::new(id.clone(), fixed_now());
    let repeat = CompletionRecord::new(id.clone(), fixed_now() + Duration::hours(2));

    assert!(repo.record_completion(&first).await.unwrap());
    assert!(!repo.record_completion(&repeat).await.unwrap());

    let stored = repo.get_completion(&id).await.expect("fetch");
    assert_eq!(stored.exercise_id, id);
    assert_eq!(stored.completed_at, fixed_now());
}

#[tokio::test]
async fn sqlite_lists_completions_oldest_first() {
    let storage = Storage::sqlite("sqlite:file:memdb_listing?mode=memory&cache=shared")
        .await
        .expect("storage");

    let later = CompletionRecord::new(
        ExerciseId::new("vowel-sounds"),
        fixed_now() + Duration::days(1),
    );
    let earlier = CompletionRecord::new(ExerciseId::new("tongue-twisters"), fixed_now());
    storage.completions.record_completion(&later).await.unwrap();
    storage.completions.record_completion(&earlier).await.unwrap();

    let listed = storage.completions.list_completions().await.unwrap();
    assert_eq!(listed, vec![earlier, later]);
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate_twice?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    let err = repo
        .get_completion(&ExerciseId::new("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_lists_rows_whose_id_is_not_a_slug() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_odd_ids?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    sqlx::query("INSERT INTO exercise_completions (exercise_id, completed_at) VALUES (?1, ?2)")
        .bind("word repetition")
        .bind(fixed_now())
        .execute(repo.pool())
        .await
        .expect("raw insert");

    let listed = repo.list_completions().await.expect("list");
    assert_eq!(
        listed,
        vec![CompletionRecord::new(
            ExerciseId::new("word repetition"),
            fixed_now()
        )]
    );
}
