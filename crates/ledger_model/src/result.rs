//! Engine result codes and messages.

/// Numeric code and human-readable message for a transaction result token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultInfo {
    pub code: i32,
    pub message: &'static str,
}

/// Look up the engine result for a result token. Unknown tokens get a
/// generic entry rather than failing the publication.
pub fn result_info(token: &str) -> ResultInfo {
    let (code, message) = match token {
        "tesSUCCESS" => (
            0,
            "The transaction was applied. Only final in a validated ledger.",
        ),
        "tecCLAIM" => (100, "Fee claimed. Sequence used. No action."),
        "tecPATH_PARTIAL" => (101, "Path could not send full amount."),
        "tecUNFUNDED_OFFER" => (103, "Offer is unfunded."),
        "tecUNFUNDED_PAYMENT" => (104, "Insufficient XRP balance to send."),
        "tecINSUF_RESERVE_OFFER" => (123, "Insufficient reserve to create offer."),
        "tecNO_DST" => (124, "Destination does not exist. Send XRP to create it."),
        "tecNO_DST_INSUF_XRP" => (
            125,
            "Destination does not exist. Too little XRP sent to create it.",
        ),
        "tecPATH_DRY" => (128, "Path could not send partial amount."),
        "tecNO_LINE" => (135, "No such line."),
        "tecEXPIRED" => (148, "Expiration time is passed."),
        "tecKILLED" => (150, "The order was killed on entry."),
        _ => (-1, "Unknown transaction result."),
    };
    ResultInfo { code, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_code_zero() {
        let info = result_info("tesSUCCESS");
        assert_eq!(info.code, 0);
        assert_eq!(
            info.message,
            "The transaction was applied. Only final in a validated ledger."
        );
    }

    #[test]
    fn unknown_tokens_do_not_panic() {
        assert_eq!(result_info("tefWEIRD").code, -1);
    }
}
