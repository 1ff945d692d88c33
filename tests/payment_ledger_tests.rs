//! End-to-end ledger scenarios against PostgreSQL
//!
//! Run with `TEST_DATABASE_URL` pointing at a scratch database and `--ignored`.

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde::Serialize;
    use serde_json::Value;
    use sqlx::PgPool;
    use uuid::Uuid;

    use loanbook_server::db;
    use loanbook_server::ledger::LedgerError;
    use loanbook_server::loan::{CreateLoanRequest, Loan, LoanService, LoanStatus, UpdateLoanRequest};
    use loanbook_server::payment::{
        CreatePaymentRequest, PaymentMethod, PaymentService, UpdatePaymentRequest,
    };
    use loanbook_server::person::CreatePersonRequest;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    /// Field as it appears in the JSON response
    fn wire<T: Serialize>(value: &T, field: &str) -> Value {
        serde_json::to_value(value).unwrap()[field].clone()
    }

    /// Helper to create a migrated test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/loanbook_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(4)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    async fn issue_loan(pool: &PgPool, total: &str) -> Loan {
        LoanService::new(pool.clone())
            .issue_loan(CreateLoanRequest {
                person_id: None,
                borrower: Some(CreatePersonRequest {
                    name: format!("Borrower {}", Uuid::new_v4()),
                    surname: None,
                    national_id: None,
                    phone: None,
                    email: None,
                    notes: None,
                    active: None,
                }),
                total_amount: d(total),
                interest_rate: None,
                loan_type: None,
                description: None,
                due_date: None,
                installments: None,
            })
            .await
            .expect("Failed to issue loan")
    }

    fn payment(loan_id: Uuid, amount: &str) -> CreatePaymentRequest {
        CreatePaymentRequest {
            loan_id,
            amount: d(amount),
            capital_amount: None,
            interest_amount: None,
            late_fee_amount: None,
            method: None,
            reference: None,
            description: None,
            scheduled_date: None,
            is_installment: None,
            installment_number: None,
            paid_at: None,
        }
    }

    async fn payment_count(pool: &PgPool, loan_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE loan_id = $1")
            .bind(loan_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_pay_complete_and_reopen() {
        let pool = setup_test_db().await;
        let payments = PaymentService::new(pool.clone());
        let loans = LoanService::new(pool.clone());
        let loan = issue_loan(&pool, "1000.00").await;

        assert_eq!(wire(&loan, "paid_amount"), "0.00");
        assert_eq!(wire(&loan, "remaining_amount"), "1000.00");

        let first = payments.create_payment(payment(loan.id, "400.00")).await.unwrap();
        assert_eq!(first.loan.paid_amount, d("400.00"));
        assert_eq!(first.loan.remaining_amount, d("600.00"));
        assert!(!first.loan.completed);

        let second = payments.create_payment(payment(loan.id, "600.00")).await.unwrap();
        assert_eq!(second.loan.paid_amount, d("1000.00"));
        assert_eq!(second.loan.remaining_amount, d("0.00"));
        assert_eq!(wire(&second.loan, "remaining_amount"), "0.00");
        assert_eq!(wire(&second.loan, "paid_amount"), "1000.00");
        assert!(second.loan.completed);
        assert!(second.loan.completed_at.is_some());
        assert_eq!(second.loan.status, LoanStatus::Completed);

        // a completed loan takes no more payments
        let err = payments
            .create_payment(payment(loan.id, "50.00"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyCompleted(_)));
        assert_eq!(payment_count(&pool, loan.id).await, 2);

        payments.delete_payment(second.payment.id).await.unwrap();
        let reopened = loans.get_loan(loan.id).await.unwrap();
        assert_eq!(reopened.paid_amount, d("400.00"));
        assert_eq!(reopened.remaining_amount, d("600.00"));
        assert!(!reopened.completed);
        assert!(reopened.completed_at.is_none());
        assert_eq!(reopened.status, LoanStatus::Active);

        let recalculated = loans.recalculate_loan_totals(loan.id).await.unwrap();
        assert_eq!(recalculated.paid_amount, reopened.paid_amount);
        assert_eq!(recalculated.remaining_amount, reopened.remaining_amount);
        assert_eq!(recalculated.status, reopened.status);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_overpayment_leaves_no_row() {
        let pool = setup_test_db().await;
        let payments = PaymentService::new(pool.clone());
        let loan = issue_loan(&pool, "1000.00").await;

        payments.create_payment(payment(loan.id, "400.00")).await.unwrap();
        let err = payments
            .create_payment(payment(loan.id, "600.01"))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::PaymentExceedsDebt { .. }));
        assert_eq!(payment_count(&pool, loan.id).await, 1);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_component_split_checked() {
        let pool = setup_test_db().await;
        let payments = PaymentService::new(pool.clone());
        let loan = issue_loan(&pool, "1000.00").await;

        let mut split = payment(loan.id, "40.00");
        split.capital_amount = Some(d("30"));
        split.interest_amount = Some(d("10"));
        split.late_fee_amount = Some(d("0"));
        let receipt = payments.create_payment(split.clone()).await.unwrap();
        assert_eq!(receipt.payment.capital_amount, Some(d("30.00")));

        split.amount = d("45.00");
        let err = payments.create_payment(split).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(payment_count(&pool, loan.id).await, 1);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_amount_edit_reconciles_loan() {
        let pool = setup_test_db().await;
        let payments = PaymentService::new(pool.clone());
        let loans = LoanService::new(pool.clone());
        let loan = issue_loan(&pool, "500.00").await;

        let receipt = payments.create_payment(payment(loan.id, "500.00")).await.unwrap();
        assert!(receipt.loan.completed);

        let updated = payments
            .update_payment(
                receipt.payment.id,
                UpdatePaymentRequest {
                    amount: Some(d("200.00")),
                    is_installment: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.amount, d("200.00"));

        let loan = loans.get_loan(loan.id).await.unwrap();
        assert_eq!(loan.paid_amount, d("200.00"));
        assert_eq!(loan.remaining_amount, d("300.00"));
        assert_eq!(loan.installments_paid, 1);
        assert_eq!(loan.status, LoanStatus::Active);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_total_change_recalculates() {
        let pool = setup_test_db().await;
        let payments = PaymentService::new(pool.clone());
        let loans = LoanService::new(pool.clone());
        let loan = issue_loan(&pool, "1000.00").await;

        payments.create_payment(payment(loan.id, "400.00")).await.unwrap();

        let loan = loans
            .update_loan(
                loan.id,
                UpdateLoanRequest {
                    total_amount: Some(d("400.00")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(loan.completed);
        assert_eq!(loan.remaining_amount, d("0.00"));
        assert_eq!(wire(&loan, "remaining_amount"), "0.00");
        assert_eq!(loan.status, LoanStatus::Completed);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_missing_rows_are_not_found() {
        let pool = setup_test_db().await;
        let payments = PaymentService::new(pool.clone());

        let err = payments
            .create_payment(payment(Uuid::new_v4(), "10.00"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::LoanNotFound(_)));

        let err = payments.delete_payment(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, LedgerError::PaymentNotFound(_)));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_metadata_edit_leaves_loan_untouched() {
        let pool = setup_test_db().await;
        let payments = PaymentService::new(pool.clone());
        let loans = LoanService::new(pool.clone());
        let loan = issue_loan(&pool, "1000.00").await;

        let receipt = payments.create_payment(payment(loan.id, "250.00")).await.unwrap();
        let before = loans.get_loan(loan.id).await.unwrap();

        let updated = payments
            .update_payment(
                receipt.payment.id,
                UpdatePaymentRequest {
                    method: Some(PaymentMethod::Transfer),
                    description: Some("moved to bank transfer".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.method, PaymentMethod::Transfer);
        assert_eq!(updated.amount, d("250.00"));

        let after = loans.get_loan(loan.id).await.unwrap();
        assert_eq!(after.updated_at, before.updated_at);
        assert_eq!(after.paid_amount, before.paid_amount);
        assert_eq!(after.remaining_amount, before.remaining_amount);
        assert_eq!(after.installments_paid, before.installments_paid);
        assert_eq!(after.status, before.status);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_recorded_totals_match_full_recalculation() {
        let pool = setup_test_db().await;
        let payments = PaymentService::new(pool.clone());
        let loans = LoanService::new(pool.clone());
        let loan = issue_loan(&pool, "1000.00").await;

        let mut last = None;
        for (amount, is_installment) in [("333.33", true), ("0.01", false), ("333.33", true), ("10.50", false)] {
            let mut request = payment(loan.id, amount);
            request.is_installment = Some(is_installment);
            last = Some(payments.create_payment(request).await.unwrap().loan);
        }
        let incremental = last.unwrap();
        assert_eq!(incremental.paid_amount, d("677.17"));
        assert_eq!(incremental.installments_paid, 2);

        let first = loans.recalculate_loan_totals(loan.id).await.unwrap();
        let second = loans.recalculate_loan_totals(loan.id).await.unwrap();

        for recalculated in [&first, &second] {
            assert_eq!(recalculated.paid_amount, incremental.paid_amount);
            assert_eq!(recalculated.remaining_amount, incremental.remaining_amount);
            assert_eq!(recalculated.completed, incremental.completed);
            assert_eq!(recalculated.installments_paid, incremental.installments_paid);
            assert_eq!(recalculated.status, incremental.status);
            assert_eq!(recalculated.completed_at, incremental.completed_at);
            assert_eq!(recalculated.total_amount, incremental.total_amount);
        }
        assert_eq!(
            serde_json::to_value(&first).unwrap()["remaining_amount"],
            serde_json::to_value(&second).unwrap()["remaining_amount"]
        );
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_sub_cent_total_is_a_validation_error() {
        let pool = setup_test_db().await;
        let loans = LoanService::new(pool.clone());
        let loan = issue_loan(&pool, "100.00").await;

        let err = loans
            .update_loan(
                loan.id,
                UpdateLoanRequest {
                    total_amount: Some(d("0.001")),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let unchanged = loans.get_loan(loan.id).await.unwrap();
        assert_eq!(unchanged.total_amount, d("100.00"));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_concurrent_payments_serialize_on_loan() {
        let pool = setup_test_db().await;
        let payments = std::sync::Arc::new(PaymentService::new(pool.clone()));
        let loan_id = issue_loan(&pool, "1000.00").await.id;

        let a = {
            let payments = payments.clone();
            tokio::spawn(async move { payments.create_payment(payment(loan_id, "600.00")).await })
        };
        let b = {
            let payments = payments.clone();
            tokio::spawn(async move { payments.create_payment(payment(loan_id, "600.00")).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let accepted = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::PaymentExceedsDebt { .. })))
            .count();

        assert_eq!(accepted, 1);
        assert_eq!(rejected, 1);

        let loan = LoanService::new(pool.clone()).get_loan(loan_id).await.unwrap();
        assert_eq!(loan.paid_amount, d("600.00"));
        assert_eq!(loan.remaining_amount, d("400.00"));
    }
}
