mod common;

use account_engine::models::{Account, AccountStatus, TransactionRecord, TransactionResult, TransactionType};
use account_engine::repositories::{
    AccountRepository, AccountStore, TransactionRepository, TransactionStore,
};

// Runs as one test: the cleanup would race with a parallel test on the same database.
#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_postgres_repositories() {
    let pool = common::setup_test_db().await;
    common::cleanup_test_data(&pool).await;

    let accounts = AccountRepository::new(pool.clone());
    let transactions = TransactionRepository::new(pool.clone());

    // Users
    let user = accounts.create_user("Pobi").await.expect("Failed to create user");
    let found_user = accounts
        .find_user(user.id)
        .await
        .expect("Failed to find user")
        .expect("User not found");
    assert_eq!(found_user.name, "Pobi");
    assert!(accounts.find_user(user.id + 1_000).await.unwrap().is_none());

    // Accounts
    assert!(accounts.last_account_number().await.unwrap().is_none());
    let created = accounts
        .insert_account(&Account::new(user.id, "1000000000".to_string(), 10_000))
        .await
        .expect("Failed to insert account");
    assert!(created.id > 0);
    assert_eq!(created.status, AccountStatus::InUse);
    assert_eq!(
        accounts.last_account_number().await.unwrap().as_deref(),
        Some("1000000000")
    );
    assert_eq!(accounts.count_accounts_by_user(user.id).await.unwrap(), 1);

    // Applying a transaction writes the record and the balance together.
    let tx = TransactionRecord::success("1000000000", TransactionType::Use, 500, 9_500);
    let saved = accounts
        .apply_transaction(&tx)
        .await
        .expect("Failed to apply transaction")
        .expect("Account not found");
    assert_eq!(saved.transaction_id, tx.transaction_id);
    assert_eq!(saved.result, TransactionResult::Success);
    let found = accounts.find_account("1000000000").await.unwrap().unwrap();
    assert_eq!(found.balance, 9_500);

    let orphan = TransactionRecord::success("1999999999", TransactionType::Use, 500, 1);
    assert!(accounts.apply_transaction(&orphan).await.unwrap().is_none());
    assert!(transactions.find_by_id(&orphan.transaction_id).await.unwrap().is_none());

    // A rejected balance write leaves no record behind.
    let negative = TransactionRecord::success("1000000000", TransactionType::Use, 10_000, -500);
    assert!(accounts.apply_transaction(&negative).await.is_err());
    assert!(transactions.find_by_id(&negative.transaction_id).await.unwrap().is_none());
    assert_eq!(
        accounts.find_account("1000000000").await.unwrap().unwrap().balance,
        9_500
    );

    let failed = TransactionRecord::failure("1000000000", TransactionType::Cancel, 700, 9_500);
    transactions.save(&failed).await.unwrap();

    let loaded = transactions
        .find_by_id(&failed.transaction_id)
        .await
        .unwrap()
        .expect("Transaction not found");
    assert_eq!(loaded.transaction_type, TransactionType::Cancel);
    assert_eq!(loaded.result, TransactionResult::Fail);
    assert!(transactions.find_by_id("missing").await.unwrap().is_none());

    let history = transactions.find_by_account("1000000000", 10).await.unwrap();
    assert_eq!(history.len(), 2);

    // Unregister
    let mut to_close = accounts.find_account("1000000000").await.unwrap().unwrap();
    to_close.unregister();
    let closed = accounts
        .unregister_account(&to_close)
        .await
        .unwrap()
        .expect("Account not found");
    assert_eq!(closed.status, AccountStatus::Unregistered);
    assert!(closed.unregistered_at.is_some());

    let listed = accounts.find_accounts_by_user(user.id).await.unwrap();
    assert_eq!(listed.len(), 1);

    common::cleanup_test_data(&pool).await;
}
