//! Property tests for the transaction processor.

use loyalty_shared::types::{CustomerId, PageRequest};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::test_support::Fixture;
use super::types::PostTransaction;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (-500i64..=500)
        .prop_filter("non-zero", |v| *v != 0)
        .prop_map(Decimal::from)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// With negative balances disallowed no sequence of postings goes
    /// below zero, and every rejection leaves the balance untouched.
    #[test]
    fn prop_balance_never_negative_under_policy(amounts in prop::collection::vec(amount_strategy(), 1..40)) {
        block_on(async {
            let fixture = Fixture::new();
            let processor = fixture.processor();
            let key = fixture.key(CustomerId::new());
            processor.open_account(key, None).await.unwrap();

            for amount in amounts {
                let before = processor.get_account(&key).await.unwrap().balance;
                match processor.post_transaction(PostTransaction::new(key, fixture.earn, amount)).await {
                    Ok(posted) => assert_eq!(posted.balance_after, before + amount),
                    Err(LedgerError::InsufficientBalance { current_balance, requested_amount }) => {
                        assert_eq!(current_balance, before);
                        assert_eq!(requested_amount, -amount);
                        assert_eq!(processor.get_account(&key).await.unwrap().balance, before);
                    }
                    Err(other) => panic!("unexpected {other:?}"),
                }

                let after = processor.get_account(&key).await.unwrap().balance;
                assert!(after >= Decimal::ZERO);
            }
        });
    }

    /// Balance equals the sum of committed effective deltas and the cached
    /// tier matches recomputation.
    #[test]
    fn prop_balance_is_sum_of_effective_deltas(amounts in prop::collection::vec(amount_strategy(), 1..40)) {
        block_on(async {
            let fixture = Fixture::new();
            let processor = fixture.processor();
            let key = fixture.key(CustomerId::new());
            processor.open_account(key, None).await.unwrap();

            for amount in &amounts {
                processor
                    .post_transaction(PostTransaction::new(key, fixture.adjust, *amount))
                    .await
                    .unwrap();
            }

            let page = processor
                .list_transactions(&key, PageRequest { page: 1, per_page: 100 })
                .await
                .unwrap();
            let sum: Decimal = page.data.iter().map(|t| t.effective_delta).sum();
            let account = processor.get_account(&key).await.unwrap();

            assert_eq!(page.data.len(), amounts.len());
            assert_eq!(account.balance, sum);
            assert_eq!(account.tier, processor.tiers().tier_of(account.balance));
        });
    }
}
