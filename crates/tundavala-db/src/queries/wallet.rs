use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use tundavala_types::models::{
    BankAccount, Kwanza, LedgerEntry, LedgerKind, WalletBalance, WithdrawalRequest,
    WithdrawalStatus,
};

use crate::models::{parsed_col, ts_col, uuid_col};
use crate::{Database, StoreError};

impl Database {
    pub fn get_wallet_balance(&self, guide_id: Uuid) -> Result<Option<WalletBalance>> {
        self.with_conn(|conn| read_wallet(conn, guide_id))
    }

    /// Wallets are created lazily: the first access inserts a zeroed row.
    pub fn get_or_create_wallet(&self, guide_id: Uuid) -> Result<WalletBalance> {
        self.with_tx(|tx| ensure_wallet(tx, guide_id))
    }

    /// Request a payout. One transaction: insert the request as `pending`,
    /// move `amount` from the available balance into `pending_withdrawal`,
    /// and append the debit to the ledger. The wallet conservation invariant
    /// holds on commit; nothing is visible on failure.
    pub fn create_withdrawal_request(
        &self,
        guide_id: Uuid,
        amount: Kwanza,
        bank: &BankAccount,
    ) -> Result<(WithdrawalRequest, WalletBalance)> {
        self.with_tx(|tx| {
            let wallet = ensure_wallet(tx, guide_id)?;
            if amount <= 0 || amount > wallet.current_balance {
                return Err(StoreError::InsufficientBalance.into());
            }

            let now = Utc::now();
            let request = WithdrawalRequest {
                id: Uuid::new_v4(),
                guide_id,
                amount,
                bank_account_id: bank.id,
                bank_name: bank.bank_name.clone(),
                account_number: bank.account_number.clone(),
                account_holder: bank.account_holder.clone(),
                status: WithdrawalStatus::Pending,
                created_at: now,
                updated_at: now,
            };

            tx.execute(
                "INSERT INTO withdrawal_requests
                    (id, guide_id, amount, bank_account_id, bank_name,
                     account_number, account_holder, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    request.id.to_string(),
                    guide_id.to_string(),
                    amount,
                    request.bank_account_id.to_string(),
                    request.bank_name,
                    request.account_number,
                    request.account_holder,
                    request.status.as_str(),
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )?;

            let updated = WalletBalance {
                current_balance: wallet.current_balance - amount,
                pending_withdrawal: wallet.pending_withdrawal + amount,
                ..wallet
            };
            write_wallet(tx, &updated)?;

            append_ledger(
                tx,
                guide_id,
                LedgerKind::Withdrawal,
                -amount,
                &format!("Withdrawal request {}", request.id),
                wallet.current_balance,
                updated.current_balance,
            )?;

            Ok((request, updated))
        })
    }

    /// Guide cancels their own pending request: status to `rejected`, funds
    /// returned to the available balance, reversing ledger entry. One
    /// transaction.
    pub fn cancel_withdrawal_request(
        &self,
        id: Uuid,
        guide_id: Uuid,
    ) -> Result<(WithdrawalRequest, WalletBalance)> {
        self.with_tx(|tx| {
            let request = read_withdrawal(tx, id)?.ok_or(StoreError::NotFound)?;
            if request.guide_id != guide_id {
                return Err(StoreError::NotFound.into());
            }
            if request.status != WithdrawalStatus::Pending {
                return Err(StoreError::InvalidTransition.into());
            }
            refund_withdrawal(tx, request, "cancelled by guide")
        })
    }

    /// Admin moves a request along pending -> approved -> processing ->
    /// completed, or rejects a pending one. Completion shifts the amount from
    /// `pending_withdrawal` to `total_withdrawn`; rejection refunds like a
    /// guide cancel. Returns the wallet when it changed.
    pub fn transition_withdrawal(
        &self,
        id: Uuid,
        next: WithdrawalStatus,
    ) -> Result<(WithdrawalRequest, Option<WalletBalance>)> {
        self.with_tx(|tx| {
            let request = read_withdrawal(tx, id)?.ok_or(StoreError::NotFound)?;
            if !request.status.can_transition_to(next) {
                return Err(StoreError::InvalidTransition.into());
            }

            match next {
                WithdrawalStatus::Rejected => {
                    let (request, wallet) =
                        refund_withdrawal(tx, request, "rejected by admin")?;
                    Ok((request, Some(wallet)))
                }
                WithdrawalStatus::Completed => {
                    let wallet = ensure_wallet(tx, request.guide_id)?;
                    let updated = WalletBalance {
                        pending_withdrawal: (wallet.pending_withdrawal - request.amount).max(0),
                        total_withdrawn: wallet.total_withdrawn + request.amount,
                        ..wallet
                    };
                    write_wallet(tx, &updated)?;
                    let request = set_withdrawal_status(tx, request, next)?;
                    Ok((request, Some(updated)))
                }
                _ => {
                    let request = set_withdrawal_status(tx, request, next)?;
                    Ok((request, None))
                }
            }
        })
    }

    pub fn get_withdrawal(&self, id: Uuid) -> Result<Option<WithdrawalRequest>> {
        self.with_conn(|conn| read_withdrawal(conn, id))
    }

    pub fn list_withdrawals_for_guide(&self, guide_id: Uuid) -> Result<Vec<WithdrawalRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE guide_id = ?1 ORDER BY created_at DESC",
                SELECT_WITHDRAWAL
            ))?;
            let requests = stmt
                .query_map([guide_id.to_string()], map_withdrawal)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(requests)
        })
    }

    /// Admin queue, oldest first.
    pub fn list_withdrawals_by_status(
        &self,
        status: WithdrawalStatus,
    ) -> Result<Vec<WithdrawalRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE status = ?1 ORDER BY created_at ASC",
                SELECT_WITHDRAWAL
            ))?;
            let requests = stmt
                .query_map([status.as_str()], map_withdrawal)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(requests)
        })
    }

    /// Manual correction by an admin. Positive amounts grant funds, negative
    /// amounts claw them back (bounded by the available balance). Earnings
    /// move by the same signed amount so the conservation invariant holds.
    pub fn record_admin_adjustment(
        &self,
        guide_id: Uuid,
        amount: Kwanza,
        description: &str,
    ) -> Result<(WalletBalance, LedgerEntry)> {
        self.with_tx(|tx| {
            let wallet = ensure_wallet(tx, guide_id)?;
            if amount < 0 && -amount > wallet.current_balance {
                return Err(StoreError::InsufficientBalance.into());
            }

            let updated = WalletBalance {
                current_balance: wallet.current_balance + amount,
                total_earnings: wallet.total_earnings + amount,
                ..wallet
            };
            write_wallet(tx, &updated)?;

            let entry = append_ledger(
                tx,
                guide_id,
                LedgerKind::AdminAdjustment,
                amount,
                description,
                wallet.current_balance,
                updated.current_balance,
            )?;

            Ok((updated, entry))
        })
    }

    /// Audit trail, newest first.
    pub fn list_transactions_for_guide(
        &self,
        guide_id: Uuid,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, guide_id, kind, amount, description,
                        balance_before, balance_after, created_at
                 FROM transactions
                 WHERE guide_id = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2",
            )?;
            let entries = stmt
                .query_map(params![guide_id.to_string(), limit], map_ledger_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
    }
}

/// Credit a completed booking's price to the guide: earnings and available
/// balance both grow by `amount`, with an `earning` ledger entry. Runs on the
/// caller's transaction so booking completion stays atomic.
pub(crate) fn credit_earning_tx(
    conn: &Connection,
    guide_id: Uuid,
    amount: Kwanza,
    description: &str,
) -> Result<(WalletBalance, LedgerEntry)> {
    let wallet = ensure_wallet(conn, guide_id)?;
    let updated = WalletBalance {
        total_earnings: wallet.total_earnings + amount,
        current_balance: wallet.current_balance + amount,
        ..wallet
    };
    write_wallet(conn, &updated)?;

    let entry = append_ledger(
        conn,
        guide_id,
        LedgerKind::Earning,
        amount,
        description,
        wallet.current_balance,
        updated.current_balance,
    )?;

    Ok((updated, entry))
}

fn refund_withdrawal(
    conn: &Connection,
    request: WithdrawalRequest,
    reason: &str,
) -> Result<(WithdrawalRequest, WalletBalance)> {
    let wallet = ensure_wallet(conn, request.guide_id)?;
    let updated = WalletBalance {
        current_balance: wallet.current_balance + request.amount,
        pending_withdrawal: (wallet.pending_withdrawal - request.amount).max(0),
        ..wallet
    };
    write_wallet(conn, &updated)?;

    append_ledger(
        conn,
        request.guide_id,
        LedgerKind::Withdrawal,
        request.amount,
        &format!("Withdrawal request {} {}", request.id, reason),
        wallet.current_balance,
        updated.current_balance,
    )?;

    let request = set_withdrawal_status(conn, request, WithdrawalStatus::Rejected)?;
    Ok((request, updated))
}

fn set_withdrawal_status(
    conn: &Connection,
    request: WithdrawalRequest,
    next: WithdrawalStatus,
) -> Result<WithdrawalRequest> {
    let now = Utc::now();
    conn.execute(
        "UPDATE withdrawal_requests SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![request.id.to_string(), next.as_str(), now.to_rfc3339()],
    )?;
    Ok(WithdrawalRequest {
        status: next,
        updated_at: now,
        ..request
    })
}

fn read_wallet(conn: &Connection, guide_id: Uuid) -> Result<Option<WalletBalance>> {
    let mut stmt = conn.prepare(
        "SELECT guide_id, total_earnings, current_balance, total_withdrawn, pending_withdrawal
         FROM wallet_balances WHERE guide_id = ?1",
    )?;
    let wallet = stmt
        .query_row([guide_id.to_string()], map_wallet)
        .optional()?;
    Ok(wallet)
}

fn ensure_wallet(conn: &Connection, guide_id: Uuid) -> Result<WalletBalance> {
    if let Some(wallet) = read_wallet(conn, guide_id)? {
        return Ok(wallet);
    }
    conn.execute(
        "INSERT INTO wallet_balances
            (guide_id, total_earnings, current_balance, total_withdrawn, pending_withdrawal)
         VALUES (?1, 0, 0, 0, 0)",
        [guide_id.to_string()],
    )?;
    Ok(WalletBalance {
        guide_id,
        total_earnings: 0,
        current_balance: 0,
        total_withdrawn: 0,
        pending_withdrawal: 0,
    })
}

fn write_wallet(conn: &Connection, wallet: &WalletBalance) -> Result<()> {
    conn.execute(
        "UPDATE wallet_balances SET
            total_earnings = ?2,
            current_balance = ?3,
            total_withdrawn = ?4,
            pending_withdrawal = ?5
         WHERE guide_id = ?1",
        params![
            wallet.guide_id.to_string(),
            wallet.total_earnings,
            wallet.current_balance,
            wallet.total_withdrawn,
            wallet.pending_withdrawal,
        ],
    )?;
    Ok(())
}

fn append_ledger(
    conn: &Connection,
    guide_id: Uuid,
    kind: LedgerKind,
    amount: Kwanza,
    description: &str,
    balance_before: Kwanza,
    balance_after: Kwanza,
) -> Result<LedgerEntry> {
    let entry = LedgerEntry {
        id: Uuid::new_v4(),
        guide_id,
        kind,
        amount,
        description: description.to_string(),
        balance_before,
        balance_after,
        created_at: Utc::now(),
    };
    conn.execute(
        "INSERT INTO transactions
            (id, guide_id, kind, amount, description,
             balance_before, balance_after, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.id.to_string(),
            guide_id.to_string(),
            kind.as_str(),
            amount,
            entry.description,
            balance_before,
            balance_after,
            entry.created_at.to_rfc3339(),
        ],
    )?;
    Ok(entry)
}

fn map_ledger_entry(row: &Row) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: uuid_col(row, 0)?,
        guide_id: uuid_col(row, 1)?,
        kind: parsed_col(row, 2, LedgerKind::parse)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        balance_before: row.get(5)?,
        balance_after: row.get(6)?,
        created_at: ts_col(row, 7)?,
    })
}

const SELECT_WITHDRAWAL: &str = "SELECT id, guide_id, amount, bank_account_id, bank_name,
        account_number, account_holder, status, created_at, updated_at
 FROM withdrawal_requests";

fn map_withdrawal(row: &Row) -> rusqlite::Result<WithdrawalRequest> {
    Ok(WithdrawalRequest {
        id: uuid_col(row, 0)?,
        guide_id: uuid_col(row, 1)?,
        amount: row.get(2)?,
        bank_account_id: uuid_col(row, 3)?,
        bank_name: row.get(4)?,
        account_number: row.get(5)?,
        account_holder: row.get(6)?,
        status: parsed_col(row, 7, WithdrawalStatus::parse)?,
        created_at: ts_col(row, 8)?,
        updated_at: ts_col(row, 9)?,
    })
}

fn read_withdrawal(conn: &Connection, id: Uuid) -> Result<Option<WithdrawalRequest>> {
    let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_WITHDRAWAL))?;
    let request = stmt.query_row([id.to_string()], map_withdrawal).optional()?;
    Ok(request)
}

fn map_wallet(row: &Row) -> rusqlite::Result<WalletBalance> {
    Ok(WalletBalance {
        guide_id: uuid_col(row, 0)?,
        total_earnings: row.get(1)?,
        current_balance: row.get(2)?,
        total_withdrawn: row.get(3)?,
        pending_withdrawal: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use tundavala_types::models::{BookingStatus, LedgerKind, WalletBalance, WithdrawalStatus};

    use crate::test_support::{bank_account, booking, guide, tourist};
    use crate::{Database, StoreError};

    fn conserved(w: &WalletBalance) -> bool {
        w.current_balance + w.pending_withdrawal + w.total_withdrawn == w.total_earnings
    }

    /// Complete a fresh booking so the guide has `amount` available.
    fn fund_guide(db: &Database, guide_id: uuid::Uuid, amount: i64) {
        let t = tourist(db, "Ana");
        let b = booking(db, t, guide_id, amount);
        db.update_booking_status(b.id, BookingStatus::Confirmed).unwrap();
        db.update_booking_status(b.id, BookingStatus::Completed).unwrap();
    }

    #[test]
    fn wallet_is_lazily_created() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");

        assert!(db.get_wallet_balance(g).unwrap().is_none());
        let wallet = db.get_or_create_wallet(g).unwrap();
        assert_eq!(wallet.total_earnings, 0);
        assert!(db.get_wallet_balance(g).unwrap().is_some());
    }

    #[test]
    fn booking_completion_credits_earnings() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");
        fund_guide(&db, g, 10_000);

        let wallet = db.get_wallet_balance(g).unwrap().unwrap();
        assert_eq!(wallet.total_earnings, 10_000);
        assert_eq!(wallet.current_balance, 10_000);
        assert!(conserved(&wallet));

        let ledger = db.list_transactions_for_guide(g, 10).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, LedgerKind::Earning);
        assert_eq!(ledger[0].amount, 10_000);
        assert_eq!(ledger[0].balance_before, 0);
        assert_eq!(ledger[0].balance_after, 10_000);
    }

    #[test]
    fn withdrawal_moves_balance_to_pending() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");
        fund_guide(&db, g, 10_000);
        let account = bank_account(&db, g);

        let (request, wallet) = db.create_withdrawal_request(g, 4_000, &account).unwrap();
        assert_eq!(request.status, WithdrawalStatus::Pending);
        assert_eq!(request.bank_name, account.bank_name);
        assert_eq!(wallet.current_balance, 6_000);
        assert_eq!(wallet.pending_withdrawal, 4_000);
        assert!(conserved(&wallet));

        let ledger = db.list_transactions_for_guide(g, 10).unwrap();
        assert_eq!(ledger[0].kind, LedgerKind::Withdrawal);
        assert_eq!(ledger[0].amount, -4_000);
        assert_eq!(ledger[0].balance_before, 10_000);
        assert_eq!(ledger[0].balance_after, 6_000);
    }

    #[test]
    fn withdrawal_rejects_excessive_amounts() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");
        fund_guide(&db, g, 1_000);
        let account = bank_account(&db, g);

        for amount in [0, -50, 2_000] {
            let err = db
                .create_withdrawal_request(g, amount, &account)
                .unwrap_err();
            assert_eq!(
                err.downcast_ref::<StoreError>(),
                Some(&StoreError::InsufficientBalance)
            );
        }

        // Nothing leaked out of the rolled-back transactions
        let wallet = db.get_wallet_balance(g).unwrap().unwrap();
        assert_eq!(wallet.current_balance, 1_000);
        assert!(db.list_withdrawals_for_guide(g).unwrap().is_empty());
        assert_eq!(db.list_transactions_for_guide(g, 10).unwrap().len(), 1);
    }

    #[test]
    fn cancellation_restores_balance() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");
        fund_guide(&db, g, 10_000);
        let account = bank_account(&db, g);

        let (request, _) = db.create_withdrawal_request(g, 4_000, &account).unwrap();
        let (request, wallet) = db.cancel_withdrawal_request(request.id, g).unwrap();

        assert_eq!(request.status, WithdrawalStatus::Rejected);
        assert_eq!(wallet.current_balance, 10_000);
        assert_eq!(wallet.pending_withdrawal, 0);
        assert!(conserved(&wallet));

        // Reversing entry on top of the original debit
        let ledger = db.list_transactions_for_guide(g, 10).unwrap();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger[0].amount, 4_000);
    }

    #[test]
    fn cancel_requires_owner_and_pending() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");
        let other = guide(&db, "Madalena");
        fund_guide(&db, g, 10_000);
        let account = bank_account(&db, g);
        let (request, _) = db.create_withdrawal_request(g, 4_000, &account).unwrap();

        let err = db.cancel_withdrawal_request(request.id, other).unwrap_err();
        assert_eq!(err.downcast_ref::<StoreError>(), Some(&StoreError::NotFound));

        db.transition_withdrawal(request.id, WithdrawalStatus::Approved)
            .unwrap();
        let err = db.cancel_withdrawal_request(request.id, g).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::InvalidTransition)
        );
    }

    #[test]
    fn completion_moves_pending_to_withdrawn() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");
        fund_guide(&db, g, 10_000);
        let account = bank_account(&db, g);
        let (request, _) = db.create_withdrawal_request(g, 4_000, &account).unwrap();

        let (request, wallet) = db
            .transition_withdrawal(request.id, WithdrawalStatus::Approved)
            .unwrap();
        assert_eq!(request.status, WithdrawalStatus::Approved);
        assert!(wallet.is_none());

        let (request, wallet) = db
            .transition_withdrawal(request.id, WithdrawalStatus::Completed)
            .unwrap();
        assert_eq!(request.status, WithdrawalStatus::Completed);
        let wallet = wallet.unwrap();
        assert_eq!(wallet.current_balance, 6_000);
        assert_eq!(wallet.pending_withdrawal, 0);
        assert_eq!(wallet.total_withdrawn, 4_000);
        assert!(conserved(&wallet));
    }

    #[test]
    fn invalid_admin_transitions_fail() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");
        fund_guide(&db, g, 10_000);
        let account = bank_account(&db, g);
        let (request, _) = db.create_withdrawal_request(g, 4_000, &account).unwrap();

        let err = db
            .transition_withdrawal(request.id, WithdrawalStatus::Processing)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::InvalidTransition)
        );
    }

    #[test]
    fn admin_adjustment_keeps_invariant() {
        let db = Database::open_in_memory().unwrap();
        let g = guide(&db, "Zeferino");
        fund_guide(&db, g, 5_000);

        let (wallet, entry) = db
            .record_admin_adjustment(g, 2_000, "Goodwill credit")
            .unwrap();
        assert_eq!(wallet.current_balance, 7_000);
        assert_eq!(wallet.total_earnings, 7_000);
        assert!(conserved(&wallet));
        assert_eq!(entry.kind, LedgerKind::AdminAdjustment);

        let err = db
            .record_admin_adjustment(g, -10_000, "Too deep")
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::InsufficientBalance)
        );
    }
}
