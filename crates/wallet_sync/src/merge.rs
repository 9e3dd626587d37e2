//! Last-write-wins merge of a remote snapshot into the local one.
//!
//! Records are matched by entity kind and id and compared whole: the side
//! with the later modification time wins every field. Equal times keep the
//! local record. Nothing is ever deleted.

use std::collections::HashMap;

use api_types::{
    SyncRecord,
    wallet::{EntityKind, Snapshot, SnapshotRecord},
};
use chrono::{DateTime, Utc};

/// Whether a remote record should overwrite the local one, given the local
/// modification time (`None` when the id is unknown locally).
pub fn adopt_remote(local: Option<DateTime<Utc>>, remote: DateTime<Utc>) -> bool {
    match local {
        None => true,
        Some(local) => remote > local,
    }
}

/// The remote records to write locally, parents first.
pub fn plan(local: &Snapshot, remote: Snapshot) -> Vec<SnapshotRecord> {
    let mut seen = index(local);
    let mut out = Vec::new();
    for record in remote.into_records() {
        let key = (record.kind(), record.id().to_string());
        let remote_at = record.modified_at();
        if adopt_remote(seen.get(&key).copied(), remote_at) {
            seen.insert(key, remote_at);
            out.push(record);
        }
    }
    out
}

type Index = HashMap<(EntityKind, String), DateTime<Utc>>;

fn index(snapshot: &Snapshot) -> Index {
    fn add<T: SyncRecord>(index: &mut Index, kind: EntityKind, records: &[T]) {
        for record in records {
            index.insert((kind, record.id().to_string()), record.modified_at());
        }
    }

    let mut index = HashMap::with_capacity(snapshot.len());
    add(&mut index, EntityKind::Account, &snapshot.accounts);
    add(&mut index, EntityKind::Transaction, &snapshot.transactions);
    add(&mut index, EntityKind::RecurringRule, &snapshot.recurring);
    add(&mut index, EntityKind::CreditCard, &snapshot.credit_cards);
    add(&mut index, EntityKind::CcTransaction, &snapshot.cc_transactions);
    index
}

#[cfg(test)]
mod tests {
    use api_types::ledger::{Account, Transaction, TransactionType};
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn account(id: &str, name: &str, balance_minor: i64, updated: i64) -> Account {
        Account {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            color: None,
            icon: None,
            balance_minor,
            created_at: at(0),
            updated_at: at(updated),
        }
    }

    fn transaction(id: &str, created: i64, updated: Option<i64>) -> Transaction {
        Transaction {
            id: id.to_string(),
            account_id: "acc-1".to_string(),
            kind: TransactionType::Deposit,
            amount_minor: 500,
            description: None,
            category: None,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            notes: None,
            recurring_id: None,
            created_at: at(created),
            updated_at: updated.map(at),
        }
    }

    fn apply(local: &mut Snapshot, records: Vec<SnapshotRecord>) {
        for record in records {
            match record {
                SnapshotRecord::Account(r) => {
                    local.accounts.retain(|a| a.id != r.id);
                    local.accounts.push(r);
                }
                SnapshotRecord::Transaction(r) => {
                    local.transactions.retain(|t| t.id != r.id);
                    local.transactions.push(r);
                }
                other => local.push(other),
            }
        }
    }

    #[test]
    fn newer_remote_record_wins_whole() {
        // a rename on one device and a balance change on the other: the
        // later write carries every field
        let local = Snapshot {
            accounts: vec![account("acc-1", "Wallet", 1_500, 200)],
            ..Default::default()
        };
        let remote = Snapshot {
            accounts: vec![account("acc-1", "Cash", 1_000, 300)],
            ..Default::default()
        };

        let planned = plan(&local, remote);
        assert_eq!(
            planned,
            vec![SnapshotRecord::Account(account("acc-1", "Cash", 1_000, 300))]
        );
    }

    #[test]
    fn ties_and_older_remote_records_keep_local() {
        let local = Snapshot {
            accounts: vec![account("acc-1", "Local", 0, 200)],
            transactions: vec![transaction("tx-1", 100, Some(400))],
            ..Default::default()
        };
        let remote = Snapshot {
            accounts: vec![account("acc-1", "Remote", 0, 200)],
            transactions: vec![transaction("tx-1", 100, Some(300))],
            ..Default::default()
        };

        assert!(plan(&local, remote).is_empty());
    }

    #[test]
    fn created_at_stands_in_for_missing_updated_at() {
        let local = Snapshot {
            transactions: vec![transaction("tx-1", 100, None)],
            ..Default::default()
        };
        let remote = Snapshot {
            transactions: vec![transaction("tx-1", 100, Some(150))],
            ..Default::default()
        };
        assert_eq!(plan(&local, remote).len(), 1);
    }

    #[test]
    fn unknown_ids_are_added_and_local_only_ids_survive() {
        let mut local = Snapshot {
            accounts: vec![account("acc-local", "Mine", 0, 10)],
            ..Default::default()
        };
        let remote = Snapshot {
            accounts: vec![account("acc-remote", "Theirs", 0, 5)],
            ..Default::default()
        };

        let planned = plan(&local, remote.clone());
        assert_eq!(planned.len(), 1);
        apply(&mut local, planned);
        assert_eq!(local.accounts.len(), 2);

        // merging the same remote again changes nothing
        assert!(plan(&local, remote).is_empty());
    }

    #[test]
    fn duplicate_remote_ids_keep_the_newest() {
        let local = Snapshot::default();
        let remote = Snapshot {
            accounts: vec![
                account("acc-1", "Old", 0, 10),
                account("acc-1", "New", 0, 20),
                account("acc-1", "Stale", 0, 15),
            ],
            ..Default::default()
        };

        let planned = plan(&local, remote);
        let names: Vec<_> = planned
            .iter()
            .map(|record| match record {
                SnapshotRecord::Account(a) => a.name.as_str(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, vec!["Old", "New"]);
    }

    #[test]
    fn parents_come_before_children() {
        let remote = Snapshot {
            accounts: vec![account("acc-1", "Cash", 0, 10)],
            transactions: vec![transaction("tx-1", 10, None)],
            ..Default::default()
        };
        let kinds: Vec<_> = plan(&Snapshot::default(), remote)
            .iter()
            .map(SnapshotRecord::kind)
            .collect();
        assert_eq!(kinds, vec![EntityKind::Account, EntityKind::Transaction]);
    }
}
