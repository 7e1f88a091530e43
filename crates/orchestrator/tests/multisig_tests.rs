//! Step-level properties: signature combination against the ledger's quorum
//! check, sequence allocation and trust-line idempotence.

mod support;

use chains::xrpl::{combine, sign_partial, Wallet};
use common::{
    Asset, CurrencyCode, Drops, IssuedValue, LedgerError, SignerEntry, SignerList, StepOutcome,
    TxTemplate,
};
use orchestrator::multisig::{collect_signatures, resolve_signers, submit_multisigned};
use orchestrator::signer_list::{configure_signer_list, ensure_signer_list};
use orchestrator::trust_line::{ensure_trust_line, setup_trust_line};
use orchestrator::StaticSigners;

use support::*;

struct Wallets {
    vault: Wallet,
    signer_a: Wallet,
    signer_b: Wallet,
}

fn wallets() -> Wallets {
    Wallets {
        vault: Wallet::from_secret(VAULT_SEED).unwrap(),
        signer_a: Wallet::from_secret(SIGNER_SEED).unwrap(),
        signer_b: Wallet::from_secret(ISSUER_SEED).unwrap(),
    }
}

fn two_of_two(w: &Wallets) -> SignerList {
    SignerList::new(
        2,
        vec![
            SignerEntry {
                account: w.signer_a.address().clone(),
                signer_weight: 1,
            },
            SignerEntry {
                account: w.signer_b.address().clone(),
                signer_weight: 1,
            },
        ],
    )
}

fn payment(w: &Wallets) -> TxTemplate {
    TxTemplate::payment(
        w.vault.address().clone(),
        address(DESTINATION),
        Drops::new(1_000).unwrap(),
    )
}

#[tokio::test]
async fn test_two_signers_meet_quorum() {
    let ledger = funded_ledger();
    let w = wallets();
    let mut session = test_gateway(&ledger).connect().await.unwrap();

    configure_signer_list(&mut session, &w.vault, &two_of_two(&w))
        .await
        .unwrap();

    let prepared = session.prepare(payment(&w), 2).await.unwrap();
    let partials = vec![
        sign_partial(&w.signer_b, &prepared).unwrap(),
        sign_partial(&w.signer_a, &prepared).unwrap(),
    ];
    let combined = combine(&prepared, partials).unwrap();
    let result = session.submit_multisigned(combined).await.unwrap();

    assert_eq!(result.result_code, "tesSUCCESS");
    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_one_signer_rejected_by_ledger() {
    let ledger = funded_ledger();
    let w = wallets();
    let mut session = test_gateway(&ledger).connect().await.unwrap();

    configure_signer_list(&mut session, &w.vault, &two_of_two(&w))
        .await
        .unwrap();

    // Bypass the local quorum check and let the ledger judge.
    let prepared = session.prepare(payment(&w), 1).await.unwrap();
    let partial = sign_partial(&w.signer_a, &prepared).unwrap();
    let combined = combine(&prepared, vec![partial]).unwrap();
    let err = session.submit_multisigned(combined).await.unwrap_err();

    assert_eq!(err.result_code(), Some("tefBAD_QUORUM"));
    assert!(ledger.account(&address(DESTINATION)).is_none());
    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_one_signer_refused_locally() {
    let ledger = funded_ledger();
    let w = wallets();
    let mut session = test_gateway(&ledger).connect().await.unwrap();

    configure_signer_list(&mut session, &w.vault, &two_of_two(&w))
        .await
        .unwrap();

    let source = StaticSigners::new([w.signer_a.clone()]);
    let err = submit_multisigned(&mut session, payment(&w), &source)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LedgerError::InsufficientSignatures {
            collected: 1,
            quorum: 2
        }
    ));
    assert_eq!(ledger.submitted_types(), vec!["SignerListSet"]);
    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_vault_key_is_not_a_signer() {
    let ledger = funded_ledger();
    let w = wallets();
    let mut session = test_gateway(&ledger).connect().await.unwrap();

    configure_signer_list(&mut session, &w.vault, &two_of_two(&w))
        .await
        .unwrap();

    // Only accounts on the active list count; the vault's own key adds nothing.
    let source = StaticSigners::new([w.vault.clone(), w.signer_a.clone()]);
    let active = session.signer_list(w.vault.address()).await.unwrap().unwrap();
    let err = resolve_signers(&active, &source).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientSignatures { .. }));
    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_collected_signatures_submit() {
    let ledger = funded_ledger();
    let w = wallets();
    let mut session = test_gateway(&ledger).connect().await.unwrap();

    configure_signer_list(&mut session, &w.vault, &two_of_two(&w))
        .await
        .unwrap();

    let source = StaticSigners::new([w.signer_a.clone(), w.signer_b.clone()]);
    let active = session.signer_list(w.vault.address()).await.unwrap().unwrap();
    let available = resolve_signers(&active, &source).await.unwrap();
    assert_eq!(available.len(), 2);

    let prepared = session.prepare(payment(&w), 2).await.unwrap();
    let set = collect_signatures(prepared, &available).unwrap();
    assert_eq!(set.weight(), 2);

    let combined = set.combine().unwrap();
    let hash = combined.hash().to_string();
    let result = session.submit_multisigned(combined).await.unwrap();
    assert_eq!(result.hash, hash);
    assert_eq!(ledger.account(&address(DESTINATION)).unwrap().balance, 1_000);
    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_multisigned_lost_reply_reports_applied_hash() {
    let ledger = funded_ledger();
    let w = wallets();
    let mut session = test_gateway(&ledger).connect().await.unwrap();

    configure_signer_list(&mut session, &w.vault, &two_of_two(&w))
        .await
        .unwrap();
    ledger.with_state(|s| s.drop_submit_reply = true);

    let source = StaticSigners::new([w.signer_a.clone(), w.signer_b.clone()]);
    let err = submit_multisigned(&mut session, payment(&w), &source)
        .await
        .unwrap_err();

    // The payment went through; the hash is enough to find it.
    let hash = match err {
        LedgerError::SubmitTimeout { hash } => hash,
        other => panic!("unexpected {:?}", other),
    };
    assert!(ledger.result(&hash).unwrap().validated);
    assert_eq!(ledger.account(&address(DESTINATION)).unwrap().balance, 1_000);
    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_multisigned_without_list() {
    let ledger = funded_ledger();
    let w = wallets();
    let mut session = test_gateway(&ledger).connect().await.unwrap();

    let source = StaticSigners::new([w.signer_a.clone(), w.signer_b.clone()]);
    assert!(matches!(
        submit_multisigned(&mut session, payment(&w), &source).await,
        Err(LedgerError::InvalidSignerList(_))
    ));
    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_self_referencing_list_refused() {
    let ledger = funded_ledger();
    let w = wallets();
    let mut session = test_gateway(&ledger).connect().await.unwrap();

    let list = SignerList::new(
        1,
        vec![SignerEntry {
            account: w.vault.address().clone(),
            signer_weight: 1,
        }],
    );
    assert!(matches!(
        ensure_signer_list(&mut session, &w.vault, &list).await,
        Err(LedgerError::InvalidSignerList(_))
    ));
    assert!(ledger.submitted_types().is_empty());
    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_sequences_never_repeat() {
    let ledger = funded_ledger();
    let w = wallets();
    let mut session = test_gateway(&ledger).connect().await.unwrap();

    let mut sequences = Vec::new();
    for _ in 0..3 {
        let prepared = session.prepare(payment(&w), 0).await.unwrap();
        sequences.push(prepared.sequence());
    }
    assert_eq!(sequences, vec![1, 2, 3]);

    // Once the ledger has moved past a prepared-but-unsubmitted sequence,
    // allocation continues from whichever is higher.
    ledger.with_state(|s| {
        if let Some(vault) = s.accounts.get_mut(VAULT_ADDRESS) {
            vault.sequence = 10;
        }
    });
    let prepared = session.prepare(payment(&w), 0).await.unwrap();
    assert_eq!(prepared.sequence(), 10);
    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_trust_line_idempotent() {
    let ledger = funded_ledger();
    let w = wallets();
    let asset = Asset {
        currency: CurrencyCode::parse("RLUSD").unwrap(),
        issuer: address(ISSUER_ADDRESS),
    };
    let limit = IssuedValue::parse("1000").unwrap();
    let larger = IssuedValue::parse("5000").unwrap();
    let mut session = test_gateway(&ledger).connect().await.unwrap();

    setup_trust_line(&mut session, &w.vault, &asset, &limit)
        .await
        .unwrap();
    // Setting the same limit again is a plain success.
    setup_trust_line(&mut session, &w.vault, &asset, &limit)
        .await
        .unwrap();

    assert_eq!(
        ensure_trust_line(&mut session, &w.vault, &asset, &limit)
            .await
            .unwrap(),
        StepOutcome::Unchanged
    );
    assert!(ensure_trust_line(&mut session, &w.vault, &asset, &larger)
        .await
        .unwrap()
        .was_submitted());
    // A smaller request never lowers the effective limit.
    assert_eq!(
        ensure_trust_line(&mut session, &w.vault, &asset, &limit)
            .await
            .unwrap(),
        StepOutcome::Unchanged
    );

    let line = ledger
        .line(&address(VAULT_ADDRESS), &address(ISSUER_ADDRESS), RLUSD_HEX)
        .unwrap();
    assert_eq!(line.limit, "5000");
    session.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_issuer_cannot_trust_itself() {
    let ledger = funded_ledger();
    let w = wallets();
    let asset = Asset {
        currency: CurrencyCode::parse("RLUSD").unwrap(),
        issuer: address(ISSUER_ADDRESS),
    };
    let mut session = test_gateway(&ledger).connect().await.unwrap();

    let limit = IssuedValue::parse("1").unwrap();
    assert!(matches!(
        setup_trust_line(&mut session, &w.signer_b, &asset, &limit).await,
        Err(LedgerError::InvalidAddress(_))
    ));
    session.disconnect().await.unwrap();
}
