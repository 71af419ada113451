pub const API_BASE_URL: &str = "http://127.0.0.1:3000";
pub const RESOLVE_ENDPOINT: &str = "/spin/resolve";

pub const NO_FUNDS_MOVED_NOTICE: &str = "No funds were moved.";
pub const TRANSFER_UNCERTAIN_NOTICE: &str =
    "The transfer may or may not have gone through. Check your wallet history before trying again.";
pub const OUTCOME_PENDING_NOTICE: &str =
    "Payment received, outcome pending. Contact support with your transaction id and do not spin again for this payment.";
pub const INSUFFICIENT_FUNDS_ERROR: &str = "Insufficient balance for this bet";
pub const INVALID_AMOUNT_ERROR: &str = "Please enter a valid positive amount";
pub const NETWORK_ERROR: &str = "Network error. Please try again";
pub const WALLET_REJECTED_ERROR: &str = "The transfer was rejected in your wallet";

pub const SPIN_TIPS: &[&str] = &[
    "The outcome is decided by the server once your payment confirms.",
    "Every spin lands on the segment the server declared.",
    "Keep your transaction id until the result is shown.",
    "Bets are only placed after your balance is checked.",
];
