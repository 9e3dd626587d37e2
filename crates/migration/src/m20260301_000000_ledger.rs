//! Local ledger schema.
//!
//! - `accounts`: cash accounts with their cached balance
//! - `transactions`: deposits/withdrawals against an account
//! - `recurring_rules`: schedules materialized into transactions
//! - `recurring_history`: local-only execution log of recurring rules
//! - `credit_cards`: cards with their cached balance
//! - `cc_transactions`: card charges and payments
//!
//! References between tables are plain indexed columns, not foreign keys:
//! records arrive from other devices one by one and a merge must be able to
//! store a child whose parent is not (or no longer) present locally.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Name,
    Description,
    Color,
    Icon,
    BalanceMinor,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    AccountId,
    Kind,
    AmountMinor,
    Description,
    Category,
    Date,
    Notes,
    RecurringId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum RecurringRules {
    Table,
    Id,
    AccountId,
    Kind,
    AmountMinor,
    Description,
    Category,
    Frequency,
    NextDate,
    IsActive,
    LastExecuted,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum RecurringHistory {
    Table,
    Id,
    RecurringId,
    TransactionId,
    ExecutedAt,
    AmountMinor,
}

#[derive(Iden)]
enum CreditCards {
    Table,
    Id,
    Name,
    CardNumber,
    MaxLimitMinor,
    CurrentBalanceMinor,
    BillingDay,
    Color,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum CcTransactions {
    Table,
    Id,
    CreditCardId,
    Kind,
    AmountMinor,
    Description,
    Category,
    Date,
    AccountId,
    LinkedTransactionId,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Description).string())
                    .col(ColumnDef::new(Accounts::Color).string())
                    .col(ColumnDef::new(Accounts::Icon).string())
                    .col(
                        ColumnDef::new(Accounts::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::AccountId).string().not_null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::Category).string())
                    .col(ColumnDef::new(Transactions::Date).date().not_null())
                    .col(ColumnDef::new(Transactions::Notes).string())
                    .col(ColumnDef::new(Transactions::RecurringId).string())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::UpdatedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-account_id-date")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RecurringRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringRules::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RecurringRules::AccountId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringRules::Kind).string().not_null())
                    .col(
                        ColumnDef::new(RecurringRules::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringRules::Description).string())
                    .col(ColumnDef::new(RecurringRules::Category).string())
                    .col(
                        ColumnDef::new(RecurringRules::Frequency)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringRules::NextDate).date().not_null())
                    .col(
                        ColumnDef::new(RecurringRules::IsActive)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringRules::LastExecuted).timestamp())
                    .col(
                        ColumnDef::new(RecurringRules::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringRules::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_rules-next_date")
                    .table(RecurringRules::Table)
                    .col(RecurringRules::IsActive)
                    .col(RecurringRules::NextDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RecurringHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringHistory::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RecurringHistory::RecurringId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringHistory::TransactionId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringHistory::ExecutedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringHistory::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_history-recurring_id")
                    .table(RecurringHistory::Table)
                    .col(RecurringHistory::RecurringId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CreditCards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditCards::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CreditCards::Name).string().not_null())
                    .col(ColumnDef::new(CreditCards::CardNumber).string())
                    .col(
                        ColumnDef::new(CreditCards::MaxLimitMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditCards::CurrentBalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditCards::BillingDay).integer().not_null())
                    .col(ColumnDef::new(CreditCards::Color).string().not_null())
                    .col(ColumnDef::new(CreditCards::Notes).string())
                    .col(
                        ColumnDef::new(CreditCards::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CreditCards::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CcTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CcTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CcTransactions::CreditCardId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CcTransactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(CcTransactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CcTransactions::Description).string())
                    .col(ColumnDef::new(CcTransactions::Category).string().not_null())
                    .col(ColumnDef::new(CcTransactions::Date).date().not_null())
                    .col(ColumnDef::new(CcTransactions::AccountId).string())
                    .col(ColumnDef::new(CcTransactions::LinkedTransactionId).string())
                    .col(ColumnDef::new(CcTransactions::Notes).string())
                    .col(
                        ColumnDef::new(CcTransactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CcTransactions::UpdatedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cc_transactions-credit_card_id")
                    .table(CcTransactions::Table)
                    .col(CcTransactions::CreditCardId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CcTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CreditCards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringRules::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
