//! Swap engine: entry and exit execution.
//!
//! Both sides follow the same pipeline: quote through Jupiter, receive a
//! pre-built transaction, sign it locally as the fee payer, send it over
//! JSON-RPC and poll for confirmation. The exit side additionally verifies
//! the wallet's on-chain balance against the tracked position before
//! quoting, so a drifted position aborts instead of selling a mismatched
//! amount.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::VersionedTransaction;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use raysnipe_core::{Address, TxSignature};
use raysnipe_position::{ExitReceipt, ExitSwap, ExitSwapError, ExitTrigger, Position};
use raysnipe_rpc::RpcClient;

use crate::config::ExecutorConfig;
use crate::entry::EntryDetails;
use crate::error::{ExecutorError, ExecutorResult};
use crate::jupiter::JupiterClient;
use crate::wallet::TradingWallet;

/// Entry and exit swap execution against Jupiter and the RPC node.
pub struct SwapEngine {
    config: ExecutorConfig,
    jupiter: JupiterClient,
    rpc: RpcClient,
    wallet: TradingWallet,
}

impl SwapEngine {
    pub fn new(
        config: ExecutorConfig,
        rpc: RpcClient,
        wallet: TradingWallet,
    ) -> ExecutorResult<Self> {
        let jupiter = JupiterClient::new(config.clone())?;
        Ok(Self {
            config,
            jupiter,
            rpc,
            wallet,
        })
    }

    pub fn wallet(&self) -> &TradingWallet {
        &self.wallet
    }

    /// Buy the configured SOL amount's worth of `token_mint`.
    ///
    /// Returns the confirmed entry signature; an unconfirmed send is an
    /// error, not a position.
    pub async fn buy(
        &self,
        sol_mint: &Address,
        token_mint: &Address,
    ) -> ExecutorResult<TxSignature> {
        info!(
            token = %token_mint,
            lamports = self.config.buy_amount_lamports,
            "Requesting entry swap"
        );

        let quote = self
            .jupiter
            .quote(
                sol_mint,
                token_mint,
                u128::from(self.config.buy_amount_lamports),
                self.config.buy_slippage_bps,
            )
            .await?;

        let unsigned = self
            .jupiter
            .swap_transaction(
                &quote,
                &self.wallet.pubkey().to_string(),
                self.config.buy_priority_fee_max_lamports,
            )
            .await?;

        let signed = sign_transaction(&unsigned, self.wallet.keypair())?;
        let signature = self.rpc.send_transaction(&signed).await?;
        info!(signature = %signature, "Entry swap sent");

        self.confirm(&signature).await?;
        info!(signature = %signature, token = %token_mint, "Entry swap confirmed");

        Ok(signature)
    }

    /// Fetch the confirmed entry transaction and derive the cost basis.
    ///
    /// The SOL/USD price is fetched here, once; every PnL computation on
    /// this position reuses it.
    pub async fn entry_details(
        &self,
        signature: &TxSignature,
        token_mint: &Address,
        sol_mint: &Address,
    ) -> ExecutorResult<EntryDetails> {
        let tx = self
            .rpc
            .get_transaction(signature)
            .await?
            .ok_or_else(|| {
                ExecutorError::CostBasis(format!("entry transaction {signature} not found"))
            })?;

        let sol_price_usd = self.jupiter.sol_price_usd(sol_mint).await?;
        let wsol_ata = self.wallet.associated_token_account(sol_mint)?;

        let details = EntryDetails::from_transaction(
            &tx,
            token_mint,
            &self.wallet.address(),
            &wsol_ata,
            sol_price_usd,
        )?;

        info!(
            token = %token_mint,
            sol_spent = %details.sol_spent,
            tokens = %details.tokens_received,
            price_usd = %details.purchase_price_usd,
            sol_price_usd = %details.sol_price_usd,
            "Entry cost basis extracted"
        );

        Ok(details)
    }

    /// Sell the whole position back to SOL.
    ///
    /// The wallet's current raw balance must equal the tracked amount
    /// exactly; zero or drifted balances abort with no swap attempted.
    pub async fn sell(&self, position: &Position) -> ExecutorResult<TxSignature> {
        let found = self
            .rpc
            .token_balance_by_owner(&self.wallet.address(), &position.token_mint)
            .await?;

        if found != position.token_balance_raw {
            warn!(
                token = %position.token_mint,
                expected = position.token_balance_raw,
                found,
                "On-chain balance differs from tracked position, aborting exit"
            );
            return Err(ExecutorError::BalanceMismatch {
                expected: position.token_balance_raw,
                found,
            });
        }

        let quote = self
            .jupiter
            .quote(
                &position.token_mint,
                &position.sol_mint,
                position.token_balance_raw,
                self.config.sell_slippage_bps,
            )
            .await?;

        let unsigned = self
            .jupiter
            .swap_transaction(
                &quote,
                &self.wallet.pubkey().to_string(),
                self.config.sell_priority_fee_max_lamports,
            )
            .await?;

        let signed = sign_transaction(&unsigned, self.wallet.keypair())?;
        let signature = self.rpc.send_transaction(&signed).await?;
        info!(signature = %signature, "Exit swap sent");

        self.confirm(&signature).await?;
        Ok(signature)
    }

    /// Poll for confirmation a fixed number of times. Status-fetch failures
    /// count as unconfirmed attempts rather than aborting the poll.
    async fn confirm(&self, signature: &TxSignature) -> ExecutorResult<()> {
        for attempt in 1..=self.config.confirm_max_attempts {
            match self.rpc.is_confirmed(signature).await {
                Ok(true) => return Ok(()),
                Ok(false) => debug!(
                    attempt,
                    max = self.config.confirm_max_attempts,
                    signature = %signature,
                    "Transaction not confirmed yet"
                ),
                Err(e) => warn!(attempt, error = %e, "Confirmation status fetch failed"),
            }

            if attempt < self.config.confirm_max_attempts {
                sleep(Duration::from_millis(self.config.confirm_delay_ms)).await;
            }
        }

        Err(ExecutorError::Unconfirmed(signature.to_string()))
    }
}

impl ExitSwap for SwapEngine {
    async fn execute_exit(
        &self,
        position: &Position,
        trigger: ExitTrigger,
    ) -> Result<ExitReceipt, ExitSwapError> {
        info!(
            token = %position.token_mint,
            trigger = %trigger,
            raw_amount = position.token_balance_raw,
            "Executing exit swap"
        );

        match self.sell(position).await {
            Ok(signature) => Ok(ExitReceipt { signature }),
            Err(e @ ExecutorError::BalanceMismatch { .. }) => {
                Err(ExitSwapError::BalanceMismatch(e.to_string()))
            }
            Err(e) => Err(ExitSwapError::Failed(e.to_string())),
        }
    }
}

/// Sign a base64-encoded transaction as the fee payer and re-encode it for
/// sending.
fn sign_transaction(tx_base64: &str, keypair: &Keypair) -> ExecutorResult<String> {
    let bytes = BASE64
        .decode(tx_base64)
        .map_err(|e| ExecutorError::Signing(format!("not base64: {e}")))?;

    let mut tx: VersionedTransaction = bincode::deserialize(&bytes)
        .map_err(|e| ExecutorError::Signing(format!("not a versioned transaction: {e}")))?;

    // Fee payer holds signature slot 0.
    let signature = keypair.sign_message(&tx.message.serialize());
    if tx.signatures.is_empty() {
        tx.signatures.push(signature);
    } else {
        tx.signatures[0] = signature;
    }

    let raw = bincode::serialize(&tx)
        .map_err(|e| ExecutorError::Signing(format!("re-serialization failed: {e}")))?;

    Ok(BASE64.encode(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::message::{Message, VersionedMessage};
    use solana_sdk::signature::Signature;
    use solana_sdk::signer::Signer;

    fn unsigned_transaction(payer: &Keypair) -> String {
        let message = Message::new(&[], Some(&payer.pubkey()));
        let tx = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::Legacy(message),
        };
        BASE64.encode(bincode::serialize(&tx).unwrap())
    }

    #[test]
    fn test_sign_transaction_sets_fee_payer_signature() {
        let payer = Keypair::new();
        let signed_b64 = sign_transaction(&unsigned_transaction(&payer), &payer).unwrap();

        let signed: VersionedTransaction =
            bincode::deserialize(&BASE64.decode(signed_b64).unwrap()).unwrap();
        assert_eq!(signed.signatures.len(), 1);
        assert!(signed.signatures[0]
            .verify(payer.pubkey().as_ref(), &signed.message.serialize()));
    }

    #[test]
    fn test_sign_transaction_pushes_when_no_signature_slot() {
        let payer = Keypair::new();
        let message = Message::new(&[], Some(&payer.pubkey()));
        let tx = VersionedTransaction {
            signatures: Vec::new(),
            message: VersionedMessage::Legacy(message),
        };
        let encoded = BASE64.encode(bincode::serialize(&tx).unwrap());

        let signed_b64 = sign_transaction(&encoded, &payer).unwrap();
        let signed: VersionedTransaction =
            bincode::deserialize(&BASE64.decode(signed_b64).unwrap()).unwrap();
        assert_eq!(signed.signatures.len(), 1);
    }

    #[test]
    fn test_sign_transaction_rejects_garbage() {
        let payer = Keypair::new();

        assert!(matches!(
            sign_transaction("not-base64!!!", &payer),
            Err(ExecutorError::Signing(_))
        ));
        assert!(matches!(
            sign_transaction(&BASE64.encode(b"not a transaction"), &payer),
            Err(ExecutorError::Signing(_))
        ));
    }
}
