//! CLI commands for the co-signing client
//!
//! Implements all command handlers for the CLI interface.

use std::path::Path;

use crate::broadcast::{BroadcastOutcome, BroadcastSequencer};
use crate::chain::{ChainClient, CommitmentLevel, Pubkey, RpcChainClient};
use crate::config::{AppConfig, BroadcastConfig, GatewayConfig};
use crate::cosign::{assemble_signed_transaction, match_approvals, AssemblyPolicy};
use crate::crypto::KeyPair;
use crate::gateway::{GatewayClient, TransactionResponse};
use crate::mint::MintPlan;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Options for the end-to-end `run` flow
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub decimals: u8,
    /// Owner of the token account to create; a fresh key when absent
    pub recipient: Option<Pubkey>,
}

/// Load the admin signer from a base58 secret, or generate a throwaway one
pub fn load_admin_signer(secret: Option<&str>) -> CliResult<KeyPair> {
    match secret.map(str::trim).filter(|s| !s.is_empty()) {
        Some(secret) => Ok(KeyPair::from_base58_secret(secret)?),
        None => {
            log::warn!("WALLET_SECRET_KEY not set, using a generated admin signer");
            Ok(KeyPair::generate())
        }
    }
}

/// Block explorer link for a transaction, with the cluster taken from the RPC URL
pub fn explorer_url(signature: &str, rpc_url: &str) -> String {
    let cluster = ["devnet", "testnet"]
        .into_iter()
        .find(|cluster| rpc_url.contains(cluster));
    match cluster {
        Some(cluster) => format!(
            "https://explorer.solana.com/tx/{}?cluster={}",
            signature, cluster
        ),
        None => format!("https://explorer.solana.com/tx/{}", signature),
    }
}

/// Generate a key pair and print or save it
pub fn cmd_keygen(outfile: Option<&Path>) -> CliResult<()> {
    let key_pair = KeyPair::generate();

    println!("🔐 New key pair generated!");
    println!("   📍 Public key: {}", key_pair.pubkey());
    match outfile {
        Some(path) => {
            key_pair.write_to_file(path)?;
            println!("   💾 Saved to: {:?}", path);
        }
        None => {
            println!("   🔑 Secret key: {}", key_pair.to_base58_secret());
            println!("\n   ⚠️  Set WALLET_SECRET_KEY to this value to reuse it as admin signer.");
        }
    }

    Ok(())
}

/// Create a smart wallet administered by `admin`
pub async fn cmd_wallet_create(config: &GatewayConfig, admin: &KeyPair) -> CliResult<()> {
    let gateway = GatewayClient::new(config.clone())?;

    println!("🆕 Creating smart wallet...");
    let wallet = gateway.create_wallet(&admin.pubkey()).await?;

    println!("✅ Smart wallet created!");
    println!("   ├─ Address: {}", wallet.address);
    println!("   ├─ Type: {}", wallet.wallet_type);
    println!("   └─ Admin signer: {}", wallet.config.admin_signer.address);
    println!("\n   ⚠️  Fund the wallet with SOL before submitting transactions.");

    Ok(())
}

/// Show a wallet by id or address
pub async fn cmd_wallet_show(config: &GatewayConfig, wallet_id: &str) -> CliResult<()> {
    let gateway = GatewayClient::new(config.clone())?;
    let wallet = gateway.get_wallet(wallet_id).await?;

    println!("👛 Wallet {}", wallet.address);
    println!("   ├─ Type: {}", wallet.wallet_type);
    if let Some(chain) = &wallet.chain_type {
        println!("   ├─ Chain: {}", chain);
    }
    if let Some(created) = wallet.created_at {
        println!("   ├─ Created: {}", created.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!(
        "   └─ Admin signer: {} ({})",
        wallet.config.admin_signer.address, wallet.config.admin_signer.signer_type
    );

    Ok(())
}

/// Show a submitted transaction and its approvals
pub async fn cmd_tx_show(
    config: &GatewayConfig,
    wallet_address: &str,
    transaction_id: &str,
) -> CliResult<()> {
    let gateway = GatewayClient::new(config.clone())?;
    let response = gateway
        .get_transaction(wallet_address, transaction_id)
        .await?;

    print_transaction(&response);
    Ok(())
}

fn print_transaction(response: &TransactionResponse) {
    println!(
        "📄 Transaction {}",
        response.id.as_deref().unwrap_or("(no id)")
    );
    println!(
        "   ├─ Status: {}",
        response.status.as_deref().unwrap_or("unknown")
    );

    let pending = response.pending_approvals();
    println!("   ├─ Pending approvals: {}", pending.len());
    for approval in pending {
        println!("   │    • {}", approval.signer);
    }

    match response.wrapped_transaction() {
        Ok(wrapped) => {
            println!(
                "   ├─ Required signers: {}",
                wrapped.required_signers().len()
            );
            for (i, key) in wrapped.required_signers().iter().enumerate() {
                let signed = wrapped
                    .transaction
                    .signatures
                    .get(i)
                    .map_or(false, |s| !s.is_placeholder());
                println!(
                    "   │    {} {}",
                    if signed { "✅" } else { "⏳" },
                    key
                );
            }
            println!(
                "   └─ Last valid block height: {}",
                wrapped.last_valid_block_height
            );
        }
        Err(e) => println!("   └─ No on-chain payload ({})", e),
    }
}

/// Answer the pending approvals with `signers`, attach the signatures to the
/// wrapped transaction and broadcast it
///
/// Returns `None` without touching the chain when nothing is pending.
pub async fn cosign_and_broadcast<C: ChainClient>(
    chain: &C,
    response: &TransactionResponse,
    signers: &[KeyPair],
    config: &BroadcastConfig,
    commitment: CommitmentLevel,
) -> CliResult<Option<BroadcastOutcome>> {
    let pending = response.pending_approvals();
    if pending.is_empty() {
        println!("\n📭 No pending approvals, nothing to sign.");
        return Ok(None);
    }

    println!("\n✍️  Step 4: Approving {} request(s)...", pending.len());
    let approvals = match_approvals(pending, signers)?;
    for approval in &approvals {
        println!("   ├─ Signed for {}", approval.signer);
    }

    let wrapped = response.wrapped_transaction()?;
    println!(
        "   └─ Wrapped transaction needs {} signature(s)",
        wrapped.required_signers().len()
    );

    let signed = assemble_signed_transaction(&wrapped, &approvals, config.policy)?;
    if config.policy == AssemblyPolicy::PartialFill {
        println!("   ⚠️  Partial fill: {} slot(s) written", signed.filled.len());
    }
    println!("✅ Signatures attached");

    println!("\n📡 Step 5: Broadcasting...");
    let outcome = BroadcastSequencer::new(chain, config.clone())
        .with_commitment(commitment)
        .broadcast(&signed)
        .await?;
    Ok(Some(outcome))
}

/// Create a wallet, mint a token through it, co-sign and broadcast
pub async fn cmd_run(config: &AppConfig, admin: &KeyPair, options: &RunOptions) -> CliResult<()> {
    let gateway = GatewayClient::new(config.gateway.clone())?;
    let chain = RpcChainClient::new(config.chain.clone())?;

    println!("=== Solana Token Creation ===\n");

    println!("🆕 Step 1: Creating smart wallet...");
    let wallet = gateway.create_wallet(&admin.pubkey()).await?;
    println!("   └─ Wallet: {}", wallet.address);

    println!("\n🔨 Step 2: Building mint transaction...");
    let mint = KeyPair::generate();
    let recipient = options
        .recipient
        .unwrap_or_else(|| KeyPair::generate().pubkey());
    let plan = MintPlan::prepare(
        &chain,
        &wallet.address,
        &mint.pubkey(),
        &recipient,
        options.decimals,
    )
    .await?;
    println!("   ├─ Payer: {}", plan.payer);
    println!("   ├─ Mint: {}", plan.mint);
    println!("   ├─ Decimals: {}", plan.decimals);
    println!("   └─ Recipient token account: {}", plan.recipient_token_account);

    println!("\n📤 Step 3: Submitting to wallet service...");
    let response = gateway
        .submit_transaction(
            &wallet.address.to_string(),
            &plan.to_base58()?,
            &plan.external_signers(),
        )
        .await?;
    if let Some(id) = &response.id {
        println!("   └─ Transaction id: {}", id);
    }

    let outcome = cosign_and_broadcast(
        &chain,
        &response,
        &[mint, admin.clone()],
        &config.broadcast,
        config.chain.commitment,
    )
    .await?;
    let outcome = match outcome {
        Some(outcome) => outcome,
        None => return Ok(()),
    };

    let signature = outcome.signature.to_string();
    println!("✅ Transaction confirmed!");
    println!("   ├─ Signature: {}", signature);
    println!("   ├─ Slot: {}", outcome.slot);
    println!(
        "   └─ Explorer: {}",
        explorer_url(&signature, &config.chain.rpc_url)
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use crate::chain::{Hash, SignatureStatus};
    use crate::cosign::CosignError;
    use crate::testing::FakeChain;

    fn pending_for(signers: &[&KeyPair], plan: &MintPlan) -> serde_json::Value {
        let message = bs58::encode(plan.transaction.message_data().unwrap()).into_string();
        signers
            .iter()
            .map(|kp| {
                json!({
                    "message": message,
                    "signer": format!("external-wallet:{}", kp.pubkey()),
                })
            })
            .collect()
    }

    fn mint_response(plan: &MintPlan, pending: serde_json::Value) -> TransactionResponse {
        serde_json::from_value(json!({
            "id": "tx-1",
            "status": "awaiting-approval",
            "approvals": { "pending": pending, "submitted": [] },
            "onChain": {
                "transaction": plan.to_base58().unwrap(),
                "lastValidBlockHeight": 100
            }
        }))
        .unwrap()
    }

    fn mint_plan(payer: &KeyPair, mint: &KeyPair) -> MintPlan {
        MintPlan::build(
            &payer.pubkey(),
            &mint.pubkey(),
            &KeyPair::generate().pubkey(),
            9,
            1_461_600,
            Hash::new([1; 32]),
        )
        .unwrap()
    }

    fn confirming_chain() -> FakeChain {
        FakeChain {
            statuses: Mutex::new(vec![Some(SignatureStatus {
                slot: 77,
                confirmations: Some(1),
                err: None,
                confirmation_status: Some(CommitmentLevel::Confirmed),
            })]),
            heights: Mutex::new(vec![10]),
            ..FakeChain::default()
        }
    }

    fn fast_config(policy: AssemblyPolicy) -> BroadcastConfig {
        BroadcastConfig {
            policy,
            poll_interval: Duration::from_millis(1),
            ..BroadcastConfig::default()
        }
    }

    #[tokio::test]
    async fn test_cosign_and_broadcast_confirms() {
        let (admin, mint) = (KeyPair::generate(), KeyPair::generate());
        let plan = mint_plan(&admin, &mint);
        let response = mint_response(&plan, pending_for(&[&mint, &admin], &plan));
        let chain = confirming_chain();

        let outcome = cosign_and_broadcast(
            &chain,
            &response,
            &[mint, admin],
            &fast_config(AssemblyPolicy::Strict),
            CommitmentLevel::Confirmed,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(outcome.slot, 77);

        let sent = chain.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.signatures[0], outcome.signature);
        assert!(sent[0].0.unverified_signers().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cosign_strict_missing_signer_sends_nothing() {
        let (admin, mint) = (KeyPair::generate(), KeyPair::generate());
        let plan = mint_plan(&admin, &mint);
        let response = mint_response(&plan, pending_for(&[&mint], &plan));
        let chain = confirming_chain();

        let err = cosign_and_broadcast(
            &chain,
            &response,
            &[mint],
            &fast_config(AssemblyPolicy::Strict),
            CommitmentLevel::Confirmed,
        )
        .await
        .unwrap_err();

        match err.downcast_ref::<CosignError>() {
            Some(CosignError::MissingSignatures(keys)) => assert_eq!(keys, &vec![admin.pubkey()]),
            other => panic!("expected MissingSignatures, got {:?}", other),
        }
        assert!(chain.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cosign_partial_fill_still_sends() {
        let (admin, mint) = (KeyPair::generate(), KeyPair::generate());
        let plan = mint_plan(&admin, &mint);
        let response = mint_response(&plan, pending_for(&[&mint], &plan));
        let chain = confirming_chain();

        cosign_and_broadcast(
            &chain,
            &response,
            &[mint],
            &fast_config(AssemblyPolicy::PartialFill),
            CommitmentLevel::Confirmed,
        )
        .await
        .unwrap();

        let sent = chain.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.unverified_signers().unwrap(), vec![admin.pubkey()]);
    }

    #[tokio::test]
    async fn test_cosign_without_pending_approvals() {
        let (admin, mint) = (KeyPair::generate(), KeyPair::generate());
        let plan = mint_plan(&admin, &mint);
        let response = mint_response(&plan, json!([]));
        let chain = confirming_chain();

        let outcome = cosign_and_broadcast(
            &chain,
            &response,
            &[mint, admin],
            &fast_config(AssemblyPolicy::Strict),
            CommitmentLevel::Confirmed,
        )
        .await
        .unwrap();

        assert!(outcome.is_none());
        assert!(chain.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_explorer_url_cluster() {
        assert_eq!(
            explorer_url("abc", "https://api.devnet.solana.com"),
            "https://explorer.solana.com/tx/abc?cluster=devnet"
        );
        assert_eq!(
            explorer_url("abc", "https://api.mainnet-beta.solana.com"),
            "https://explorer.solana.com/tx/abc"
        );
    }

    #[test]
    fn test_load_admin_signer() {
        let kp = KeyPair::generate();
        let loaded = load_admin_signer(Some(&kp.to_base58_secret())).unwrap();
        assert_eq!(loaded.pubkey(), kp.pubkey());

        // absent or blank means generate
        assert!(load_admin_signer(None).is_ok());
        assert!(load_admin_signer(Some("  ")).is_ok());
        assert!(load_admin_signer(Some("not-a-key")).is_err());
    }

    #[test]
    fn test_keygen_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.json");
        cmd_keygen(Some(&path)).unwrap();
        assert!(KeyPair::read_from_file(&path).is_ok());
    }
}
