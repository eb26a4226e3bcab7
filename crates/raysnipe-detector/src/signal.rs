//! Pool-creation log filter.
//!
//! Raydium's AMM emits a distinctive program log line when a pool is
//! initialized; the detection feed matches on it and hands the transaction
//! signature to the lifecycle controller.

use raysnipe_core::TxSignature;
use raysnipe_rpc::LogsNotification;
use tracing::debug;

/// Log line emitted by the AMM's pool-initialization instruction.
const POOL_INIT_MARKER: &str = "Program log: initialize2: InitializeInstruction2";

/// Return the transaction signature if this notification announces a new
/// pool, `None` otherwise.
///
/// Failed transactions are skipped: a reverted initialize leaves nothing to
/// trade against.
pub fn pool_creation_signature(notice: &LogsNotification) -> Option<TxSignature> {
    if notice.value.err.is_some() {
        debug!(
            signature = %notice.value.signature,
            "Skipping failed transaction in log stream"
        );
        return None;
    }

    if notice.value.signature.is_empty() {
        return None;
    }

    let is_pool_init = notice
        .value
        .logs
        .iter()
        .any(|line| line.contains(POOL_INIT_MARKER));

    if !is_pool_init {
        return None;
    }

    Some(TxSignature::new(notice.value.signature.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notice(logs: Vec<&str>, err: Option<serde_json::Value>) -> LogsNotification {
        serde_json::from_value(json!({
            "context": {"slot": 1000},
            "value": {
                "signature": "5h6xBEauJ3PK6SWCZ1PGjBvj8vDdWG3KpwATGy1ARAXF",
                "err": err,
                "logs": logs,
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_pool_init_log_matches() {
        let n = notice(
            vec![
                "Program 675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8 invoke [1]",
                "Program log: initialize2: InitializeInstruction2 {...}",
            ],
            None,
        );

        let signature = pool_creation_signature(&n).unwrap();
        assert_eq!(signature.as_str(), "5h6xBEauJ3PK6SWCZ1PGjBvj8vDdWG3KpwATGy1ARAXF");
    }

    #[test]
    fn test_swap_logs_do_not_match() {
        let n = notice(
            vec![
                "Program 675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8 invoke [1]",
                "Program log: ray_log: A4vH...",
            ],
            None,
        );

        assert!(pool_creation_signature(&n).is_none());
    }

    #[test]
    fn test_failed_transaction_is_skipped() {
        let n = notice(
            vec!["Program log: initialize2: InitializeInstruction2"],
            Some(json!({"InstructionError": [2, {"Custom": 30}]})),
        );

        assert!(pool_creation_signature(&n).is_none());
    }

    #[test]
    fn test_empty_logs_do_not_match() {
        let n = notice(vec![], None);
        assert!(pool_creation_signature(&n).is_none());
    }
}
