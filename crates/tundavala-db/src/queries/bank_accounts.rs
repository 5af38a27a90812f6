use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use tundavala_types::models::BankAccount;

use crate::Database;
use crate::models::{ts_col, uuid_col};

impl Database {
    pub fn create_bank_account(&self, account: &BankAccount) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO bank_accounts
                    (id, guide_id, bank_name, account_number, account_holder, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    account.id.to_string(),
                    account.guide_id.to_string(),
                    account.bank_name,
                    account.account_number,
                    account.account_holder,
                    account.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_bank_account(&self, id: Uuid) -> Result<Option<BankAccount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_ACCOUNT))?;
            let account = stmt
                .query_row([id.to_string()], map_bank_account)
                .optional()?;
            Ok(account)
        })
    }

    pub fn list_bank_accounts_for_guide(&self, guide_id: Uuid) -> Result<Vec<BankAccount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE guide_id = ?1 ORDER BY created_at DESC",
                SELECT_ACCOUNT
            ))?;
            let accounts = stmt
                .query_map([guide_id.to_string()], map_bank_account)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(accounts)
        })
    }

    pub fn delete_bank_account(&self, id: Uuid, guide_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM bank_accounts WHERE id = ?1 AND guide_id = ?2",
                params![id.to_string(), guide_id.to_string()],
            )?;
            Ok(removed > 0)
        })
    }
}

const SELECT_ACCOUNT: &str = "SELECT id, guide_id, bank_name, account_number, account_holder, created_at
 FROM bank_accounts";

fn map_bank_account(row: &Row) -> rusqlite::Result<BankAccount> {
    Ok(BankAccount {
        id: uuid_col(row, 0)?,
        guide_id: uuid_col(row, 1)?,
        bank_name: row.get(2)?,
        account_number: row.get(3)?,
        account_holder: row.get(4)?,
        created_at: ts_col(row, 5)?,
    })
}
