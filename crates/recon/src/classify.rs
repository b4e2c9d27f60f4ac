use std::collections::BTreeSet;

use log::debug;

use crate::config::{CategoryRules, KeywordGroup};
use crate::model::{
    BankTransaction, Category, ClaimSide, Classification, ClassifiedTransaction, MatchRecord,
};

/// Bank transactions confirmed, at a financial level, to be the money side of
/// a customer reimbursement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReimbursementIndex {
    txn_ids: BTreeSet<String>,
}

impl ReimbursementIndex {
    /// Collect reimbursement transactions from the receipt↔bank pass (every
    /// financial match) and the payment↔bank pass (financial matches on the
    /// refund side of a claim, batches included).
    pub fn from_passes(receipt_bank: &[MatchRecord], payment_bank: &[MatchRecord]) -> Self {
        let mut txn_ids = BTreeSet::new();
        for r in receipt_bank.iter().filter(|r| r.is_financial()) {
            if let Some(t) = &r.target_id {
                txn_ids.insert(t.clone());
            }
        }
        for r in payment_bank
            .iter()
            .filter(|r| r.is_financial() && r.side == Some(ClaimSide::Refund))
        {
            if let Some(t) = &r.target_id {
                txn_ids.insert(t.clone());
            }
        }
        Self { txn_ids }
    }

    pub fn insert(&mut self, txn_id: impl Into<String>) {
        self.txn_ids.insert(txn_id.into());
    }

    pub fn contains(&self, txn_id: &str) -> bool {
        self.txn_ids.contains(txn_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.txn_ids.len()
    }
}

fn first_group<'a>(groups: &'a [KeywordGroup], upper: &str) -> Option<&'a KeywordGroup> {
    groups.iter().find(|g| g.matches_upper(upper))
}

/// Categorise one bank transaction. First rule that fires wins:
/// confirmed reimbursement, deposit, business keywords, financial keywords,
/// personal keywords, then personal-uncategorised.
pub fn classify(
    txn: &BankTransaction,
    reimbursements: &ReimbursementIndex,
    rules: &CategoryRules,
) -> Classification {
    if reimbursements.contains(&txn.id) {
        return Classification {
            category: Category::CustomerReimbursement,
            subcategory: None,
        };
    }
    if txn.is_deposit() {
        return Classification {
            category: Category::Deposit,
            subcategory: None,
        };
    }

    let upper = txn.description.to_uppercase();
    for (category, groups) in [
        (Category::BusinessExpense, &rules.business),
        (Category::FinancialTransfer, &rules.financial),
        (Category::Personal, &rules.personal),
    ] {
        if let Some(group) = first_group(groups, &upper) {
            return Classification {
                category,
                subcategory: Some(group.name.clone()),
            };
        }
    }

    Classification {
        category: Category::PersonalUncategorized,
        subcategory: None,
    }
}

pub fn classify_all(
    txns: &[BankTransaction],
    reimbursements: &ReimbursementIndex,
    rules: &CategoryRules,
) -> Vec<ClassifiedTransaction> {
    let out: Vec<ClassifiedTransaction> = txns
        .iter()
        .map(|txn| {
            let c = classify(txn, reimbursements, rules);
            ClassifiedTransaction {
                txn_id: txn.id.clone(),
                date: txn.date,
                description: txn.description.clone(),
                amount_cents: txn.amount_cents,
                category: c.category,
                subcategory: c.subcategory,
            }
        })
        .collect();
    debug!(
        "classified {} transaction(s), {} reimbursement id(s) known",
        out.len(),
        reimbursements.len()
    );
    out
}
