//! Trading wallet: keypair handling and token-account derivation.

use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

use raysnipe_core::Address;

use crate::error::{ExecutorError, ExecutorResult};

const TOKEN_PROGRAM: Pubkey = solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
const ASSOCIATED_TOKEN_PROGRAM: Pubkey =
    solana_sdk::pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// The signing wallet for entry and exit swaps.
pub struct TradingWallet {
    keypair: Keypair,
    pubkey: Pubkey,
}

impl TradingWallet {
    /// Build a wallet from a base58-encoded 64-byte secret key. The base58
    /// form of such a key is always 87 or 88 characters; anything else is
    /// rejected before decoding.
    pub fn from_base58_key(secret: &str) -> ExecutorResult<Self> {
        if !(87..=88).contains(&secret.len()) {
            return Err(ExecutorError::InvalidWalletKey(format!(
                "expected 87-88 base58 characters, got {}",
                secret.len()
            )));
        }

        let bytes = bs58::decode(secret)
            .into_vec()
            .map_err(|e| ExecutorError::InvalidWalletKey(format!("not base58: {e}")))?;

        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| ExecutorError::InvalidWalletKey(format!("not a keypair: {e}")))?;
        let pubkey = keypair.pubkey();

        Ok(Self { keypair, pubkey })
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn pubkey(&self) -> &Pubkey {
        &self.pubkey
    }

    /// The wallet's address in the opaque form the RPC layer carries.
    pub fn address(&self) -> Address {
        Address::new(self.pubkey.to_string())
    }

    /// Derive the wallet's associated token account for a mint.
    pub fn associated_token_account(&self, mint: &Address) -> ExecutorResult<Address> {
        let mint_pk = Pubkey::from_str(mint.as_str())
            .map_err(|e| ExecutorError::InvalidAddress(format!("{mint}: {e}")))?;

        let seeds = &[
            self.pubkey.as_ref(),
            TOKEN_PROGRAM.as_ref(),
            mint_pk.as_ref(),
        ];
        let (address, _bump) = Pubkey::find_program_address(seeds, &ASSOCIATED_TOKEN_PROGRAM);

        Ok(Address::new(address.to_string()))
    }
}

impl std::fmt::Debug for TradingWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the secret key in debug output.
        f.debug_struct("TradingWallet")
            .field("pubkey", &self.pubkey)
            .finish()
    }
}
