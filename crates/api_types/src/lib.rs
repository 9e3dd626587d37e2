use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Common view over every record carried by a wallet snapshot.
///
/// Ids are stable across devices, and the modification time is the only
/// input of the last-write-wins merge.
pub trait SyncRecord {
    fn id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> Option<DateTime<Utc>>;

    /// `updatedAt` when present, `createdAt` otherwise.
    fn modified_at(&self) -> DateTime<Utc> {
        self.updated_at().unwrap_or_else(|| self.created_at())
    }
}

macro_rules! sync_record {
    ($ty:ty, updated: required) => {
        impl SyncRecord for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
            fn updated_at(&self) -> Option<DateTime<Utc>> {
                Some(self.updated_at)
            }
        }
    };
    ($ty:ty, updated: optional) => {
        impl SyncRecord for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
            fn updated_at(&self) -> Option<DateTime<Utc>> {
                self.updated_at
            }
        }
    };
}

pub mod ledger {
    use super::*;

    /// A cash account. `balance_minor` is a cached aggregate of its
    /// transactions, maintained on write and never recomputed on read.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Account {
        pub id: String,
        pub name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub color: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub icon: Option<String>,
        pub balance_minor: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionType {
        Deposit,
        Withdraw,
    }

    impl TransactionType {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Deposit => "deposit",
                Self::Withdraw => "withdraw",
            }
        }

        /// Effect of an amount of this type on the account balance.
        pub fn signed(self, amount_minor: i64) -> i64 {
            match self {
                Self::Deposit => amount_minor,
                Self::Withdraw => -amount_minor,
            }
        }
    }

    impl TryFrom<&str> for TransactionType {
        type Error = String;

        fn try_from(value: &str) -> Result<Self, Self::Error> {
            match value {
                "deposit" => Ok(Self::Deposit),
                "withdraw" => Ok(Self::Withdraw),
                other => Err(format!("invalid transaction type: {other}")),
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Transaction {
        pub id: String,
        pub account_id: String,
        #[serde(rename = "type")]
        pub kind: TransactionType,
        pub amount_minor: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category: Option<String>,
        pub date: NaiveDate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub notes: Option<String>,
        /// Set when the transaction was materialized from a recurring rule.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub recurring_id: Option<String>,
        pub created_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub updated_at: Option<DateTime<Utc>>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Frequency {
        Daily,
        Weekly,
        Biweekly,
        Monthly,
        Quarterly,
        Yearly,
    }

    impl Frequency {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Daily => "daily",
                Self::Weekly => "weekly",
                Self::Biweekly => "biweekly",
                Self::Monthly => "monthly",
                Self::Quarterly => "quarterly",
                Self::Yearly => "yearly",
            }
        }
    }

    impl TryFrom<&str> for Frequency {
        type Error = String;

        fn try_from(value: &str) -> Result<Self, Self::Error> {
            match value {
                "daily" => Ok(Self::Daily),
                "weekly" => Ok(Self::Weekly),
                "biweekly" => Ok(Self::Biweekly),
                "monthly" => Ok(Self::Monthly),
                "quarterly" => Ok(Self::Quarterly),
                "yearly" => Ok(Self::Yearly),
                other => Err(format!("invalid frequency: {other}")),
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RecurringRule {
        pub id: String,
        pub account_id: String,
        #[serde(rename = "type")]
        pub kind: TransactionType,
        pub amount_minor: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category: Option<String>,
        pub frequency: Frequency,
        pub next_date: NaiveDate,
        pub is_active: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub last_executed: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreditCard {
        pub id: String,
        pub name: String,
        /// Last four digits, display only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub card_number: Option<String>,
        pub max_limit_minor: i64,
        pub current_balance_minor: i64,
        pub billing_day: i32,
        pub color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub notes: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CcTransactionType {
        Charge,
        Payment,
    }

    impl CcTransactionType {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Charge => "charge",
                Self::Payment => "payment",
            }
        }

        /// Effect of an amount of this type on the card balance.
        pub fn signed(self, amount_minor: i64) -> i64 {
            match self {
                Self::Charge => amount_minor,
                Self::Payment => -amount_minor,
            }
        }
    }

    impl TryFrom<&str> for CcTransactionType {
        type Error = String;

        fn try_from(value: &str) -> Result<Self, Self::Error> {
            match value {
                "charge" => Ok(Self::Charge),
                "payment" => Ok(Self::Payment),
                other => Err(format!("invalid credit card transaction type: {other}")),
            }
        }
    }

    /// A credit card ledger entry.
    ///
    /// A `Payment` with an `account_id` owns the withdrawal it created on that
    /// account, referenced by `linked_transaction_id`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CcTransaction {
        pub id: String,
        pub credit_card_id: String,
        #[serde(rename = "type")]
        pub kind: CcTransactionType,
        pub amount_minor: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        pub category: String,
        pub date: NaiveDate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub account_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub linked_transaction_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub notes: Option<String>,
        pub created_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub updated_at: Option<DateTime<Utc>>,
    }

    sync_record!(Account, updated: required);
    sync_record!(Transaction, updated: optional);
    sync_record!(RecurringRule, updated: required);
    sync_record!(CreditCard, updated: required);
    sync_record!(CcTransaction, updated: optional);
}

pub mod wallet {
    use super::*;
    use ledger::{Account, CcTransaction, CreditCard, RecurringRule, Transaction};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EntityKind {
        Account,
        Transaction,
        RecurringRule,
        CreditCard,
        CcTransaction,
    }

    impl EntityKind {
        /// Name of the snapshot array holding this kind.
        pub fn collection(self) -> &'static str {
            match self {
                Self::Account => "accounts",
                Self::Transaction => "transactions",
                Self::RecurringRule => "recurring",
                Self::CreditCard => "creditCards",
                Self::CcTransaction => "ccTransactions",
            }
        }
    }

    /// Full contents of every entity collection, pushed and pulled as one
    /// document.
    ///
    /// `created_at`/`updated_at` are stamped by the wallet store on the
    /// document itself and are unrelated to the per-record timestamps.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Snapshot {
        #[serde(default)]
        pub accounts: Vec<Account>,
        #[serde(default)]
        pub transactions: Vec<Transaction>,
        #[serde(default)]
        pub recurring: Vec<RecurringRule>,
        #[serde(default)]
        pub credit_cards: Vec<CreditCard>,
        #[serde(default)]
        pub cc_transactions: Vec<CcTransaction>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub created_at: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub updated_at: Option<DateTime<Utc>>,
    }

    impl Snapshot {
        pub fn len(&self) -> usize {
            self.accounts.len()
                + self.transactions.len()
                + self.recurring.len()
                + self.credit_cards.len()
                + self.cc_transactions.len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        pub fn push(&mut self, record: SnapshotRecord) {
            match record {
                SnapshotRecord::Account(r) => self.accounts.push(r),
                SnapshotRecord::Transaction(r) => self.transactions.push(r),
                SnapshotRecord::RecurringRule(r) => self.recurring.push(r),
                SnapshotRecord::CreditCard(r) => self.credit_cards.push(r),
                SnapshotRecord::CcTransaction(r) => self.cc_transactions.push(r),
            }
        }

        /// Flatten into records, parents before the records referencing them.
        pub fn into_records(self) -> Vec<SnapshotRecord> {
            let mut out = Vec::with_capacity(self.len());
            out.extend(self.accounts.into_iter().map(SnapshotRecord::Account));
            out.extend(self.credit_cards.into_iter().map(SnapshotRecord::CreditCard));
            out.extend(self.transactions.into_iter().map(SnapshotRecord::Transaction));
            out.extend(self.recurring.into_iter().map(SnapshotRecord::RecurringRule));
            out.extend(
                self.cc_transactions
                    .into_iter()
                    .map(SnapshotRecord::CcTransaction),
            );
            out
        }
    }

    /// One record of any synchronized entity.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum SnapshotRecord {
        Account(Account),
        Transaction(Transaction),
        RecurringRule(RecurringRule),
        CreditCard(CreditCard),
        CcTransaction(CcTransaction),
    }

    impl SnapshotRecord {
        pub fn kind(&self) -> EntityKind {
            match self {
                Self::Account(_) => EntityKind::Account,
                Self::Transaction(_) => EntityKind::Transaction,
                Self::RecurringRule(_) => EntityKind::RecurringRule,
                Self::CreditCard(_) => EntityKind::CreditCard,
                Self::CcTransaction(_) => EntityKind::CcTransaction,
            }
        }

        fn as_sync_record(&self) -> &dyn SyncRecord {
            match self {
                Self::Account(r) => r,
                Self::Transaction(r) => r,
                Self::RecurringRule(r) => r,
                Self::CreditCard(r) => r,
                Self::CcTransaction(r) => r,
            }
        }
    }

    impl SyncRecord for SnapshotRecord {
        fn id(&self) -> &str {
            self.as_sync_record().id()
        }
        fn created_at(&self) -> DateTime<Utc> {
            self.as_sync_record().created_at()
        }
        fn updated_at(&self) -> Option<DateTime<Utc>> {
            self.as_sync_record().updated_at()
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WalletCreated {
        pub wallet_id: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WalletReplaced {
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WalletDeleted {
        pub wallet_id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Health {
        pub status: String,
        pub timestamp: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorResponse {
        pub error: String,
    }
}

pub mod backup {
    use super::*;
    use wallet::Snapshot;

    pub const BACKUP_VERSION: u32 = 1;

    /// Local export of the whole ledger.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Backup {
        pub version: u32,
        pub export_date: DateTime<Utc>,
        #[serde(flatten)]
        pub snapshot: Snapshot,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ImportMode {
        /// Drop the local ledger first.
        Replace,
        /// Keep local records, add the unknown ones.
        Merge,
    }
}
